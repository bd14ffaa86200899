//! Structured parsing of generated address lines.
//!
//! Address lines arrive in generic-locale order, `{number} {street name}
//! {street type}`, optionally followed by `{unit kind} {unit number}`. The
//! German guide needs the parts individually: it attaches one structured
//! extension per part and recomposes the display line in local order, with
//! the house number after the street. Street names may themselves contain
//! spaces ("Alte Allee Weg"), so the name group is matched lazily and the
//! street type anchors the split.

use std::sync::LazyLock;

use regex::Regex;

use crate::{GuideError, GuideResult};

static GENERIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<number>\d+) (?P<name>.+?) (?P<type>Straße|Str\.|Allee|Weg|Platz)(?: (?P<kind>Unit|Apt|Suite|Apartment|Appartement|Stockwerk) (?P<unit>\d+))?$",
    )
    .unwrap()
});

/// One address line, split into its structured parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressComponents {
    pub house_number: String,
    pub street_name: String,
    pub street_type: String,
    pub unit: Option<UnitComponent>,
}

/// The unit/apartment tail of an address line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitComponent {
    pub kind: String,
    pub number: String,
}

impl UnitComponent {
    /// The unit tail as display text, `{kind} {number}`.
    pub fn display(&self) -> String {
        format!("{} {}", self.kind, self.number)
    }
}

impl AddressComponents {
    /// The street as a single token, name and type run together:
    /// "Example" + "Allee" is "ExampleAllee".
    pub fn street(&self) -> String {
        format!("{}{}", self.street_name, self.street_type)
    }

    /// The display line in local order: street, house number, then the
    /// unit tail when present.
    pub fn display_line(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} {}, {}", self.street(), self.house_number, unit.display()),
            None => format!("{} {}", self.street(), self.house_number),
        }
    }
}

/// Parse an address line in generic-locale order. Lines whose street type
/// is not recognised cannot be decomposed and are rejected.
pub fn parse_line(line: &str) -> GuideResult<AddressComponents> {
    let captures = GENERIC_LINE
        .captures(line)
        .ok_or_else(|| GuideError::AddressFormat {
            line: line.to_string(),
        })?;

    Ok(AddressComponents {
        house_number: captures["number"].to_string(),
        street_name: captures["name"].to_string(),
        street_type: captures["type"].to_string(),
        unit: captures.name("kind").map(|kind| UnitComponent {
            kind: kind.as_str().to_string(),
            number: captures["unit"].to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of `display_line`, for the recomposition check: local-order
    /// lines put the street first and the unit tail after a comma.
    static LOCAL_LINE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"^(?P<street>.+?) (?P<number>\d+)(?:, (?P<kind>Unit|Apt|Suite|Apartment|Appartement|Stockwerk) (?P<unit>\d+))?$",
        )
        .unwrap()
    });

    // Longest suffixes first, so "Straße" is not shadowed by a shorter type.
    const SPLIT_ORDER: [&str; 5] = ["Straße", "Allee", "Platz", "Str.", "Weg"];

    fn parse_local(line: &str) -> Option<AddressComponents> {
        let captures = LOCAL_LINE.captures(line)?;
        let street = &captures["street"];
        let (street_name, street_type) = SPLIT_ORDER.iter().find_map(|t| {
            street
                .strip_suffix(t)
                .map(|name| (name.to_string(), t.to_string()))
        })?;

        Some(AddressComponents {
            house_number: captures["number"].to_string(),
            street_name,
            street_type,
            unit: captures.name("kind").map(|kind| UnitComponent {
                kind: kind.as_str().to_string(),
                number: captures["unit"].to_string(),
            }),
        })
    }

    #[test]
    fn parses_number_name_and_type() {
        let parts = parse_line("42 Example Allee").expect("parses");

        assert_eq!(parts.house_number, "42");
        assert_eq!(parts.street_name, "Example");
        assert_eq!(parts.street_type, "Allee");
        assert!(parts.unit.is_none());
        assert_eq!(parts.street(), "ExampleAllee");
        assert_eq!(parts.display_line(), "ExampleAllee 42");
    }

    #[test]
    fn parses_the_unit_tail() {
        let parts = parse_line("1021 Ferry Weg Apt 60").expect("parses");

        let unit = parts.unit.as_ref().expect("unit present");
        assert_eq!(unit.kind, "Apt");
        assert_eq!(unit.number, "60");
        assert_eq!(parts.display_line(), "FerryWeg 1021, Apt 60");
    }

    #[test]
    fn street_names_may_contain_a_type_word() {
        // "Allee" here belongs to the name; "Weg" is the type.
        let parts = parse_line("12 Alte Allee Weg").expect("parses");

        assert_eq!(parts.street_name, "Alte Allee");
        assert_eq!(parts.street_type, "Weg");
    }

    #[test]
    fn rejects_lines_with_unknown_street_types() {
        let err = parse_line("123 Main St").expect_err("unknown type");

        match err {
            GuideError::AddressFormat { line } => assert_eq!(line, "123 Main St"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_lines_without_a_house_number() {
        assert!(parse_line("Example Allee").is_err());
        assert!(parse_line("Postfach 120456").is_err());
    }

    #[test]
    fn recomposed_lines_parse_back_to_the_same_parts() {
        let lines = [
            "42 Example Allee",
            "1021 Ferry Weg Apt 60",
            "7 Neuer Markt Platz",
            "12 Alte Allee Weg",
            "815 Kirch Weg Stockwerk 2",
            "3 Lange Straße",
            "90 Kurze Str. Suite 11",
        ];

        for line in lines {
            let parts = parse_line(line).expect("parses");
            let recomposed = parts.display_line();
            let reparsed = parse_local(&recomposed).expect("recomposed line splits");
            assert_eq!(reparsed, parts, "line: {line} → {recomposed}");
        }
    }
}
