//! Shared FHIR R4 element types.
//!
//! These are strict wire models: their serialised form is the FHIR R4 JSON
//! representation, with struct field order matching the order FHIR readers
//! expect. Primitive elements that can carry extensions (`family`, `line`,
//! `city`, `gender`, `birthDate`, `prefix`) get an explicit `_field`
//! companion of type [`PrimitiveExtension`].
//!
//! Responsibilities:
//! - Define the reusable element types shared by all resource drafts
//! - Provide constructors for the common shapes so call sites stay terse
//! - Keep the `_field` companions aligned with their value arrays

use serde::{Deserialize, Serialize};

// ============================================================================
// Codings and concepts
// ============================================================================

/// A coded value drawn from a terminology system.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Coding with system, code and display text.
    pub fn new(
        system: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Coding {
            system: Some(system.into()),
            code: Some(code.into()),
            display: Some(display.into()),
        }
    }

    /// Coding without a display text.
    pub fn code_only(system: impl Into<String>, code: impl Into<String>) -> Self {
        Coding {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }
}

/// A concept expressed as one or more codings plus optional free text.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Concept carrying a single coding, with the coding's display as text.
    pub fn from_coding(coding: Coding) -> Self {
        let text = coding.display.clone();
        CodeableConcept {
            coding: vec![coding],
            text,
        }
    }

    /// True when any coding matches both system and code.
    pub fn has_coding(&self, system: &str, code: &str) -> bool {
        self.coding.iter().any(|c| {
            c.system.as_deref() == Some(system) && c.code.as_deref() == Some(code)
        })
    }
}

// ============================================================================
// Extensions
// ============================================================================

/// A FHIR extension with exactly one `value[x]` choice, or nested
/// sub-extensions for complex extensions.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Extension {
    pub url: String,

    #[serde(rename = "valueString", skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(rename = "valueCode", skip_serializing_if = "Option::is_none")]
    pub value_code: Option<String>,

    #[serde(rename = "valueBoolean", skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(rename = "valueCoding", skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl Extension {
    pub fn string(url: impl Into<String>, value: impl Into<String>) -> Self {
        Extension {
            url: url.into(),
            value_string: Some(value.into()),
            ..Extension::default()
        }
    }

    pub fn code(url: impl Into<String>, value: impl Into<String>) -> Self {
        Extension {
            url: url.into(),
            value_code: Some(value.into()),
            ..Extension::default()
        }
    }

    pub fn boolean(url: impl Into<String>, value: bool) -> Self {
        Extension {
            url: url.into(),
            value_boolean: Some(value),
            ..Extension::default()
        }
    }

    pub fn coding(url: impl Into<String>, value: Coding) -> Self {
        Extension {
            url: url.into(),
            value_coding: Some(value),
            ..Extension::default()
        }
    }

    /// Complex extension composed of sub-extensions.
    pub fn nested(url: impl Into<String>, children: Vec<Extension>) -> Self {
        Extension {
            url: url.into(),
            extension: children,
            ..Extension::default()
        }
    }

    /// First sub-extension with the given url.
    pub fn sub(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|e| e.url == url)
    }
}

/// The `_field` companion FHIR uses to attach extensions to a primitive
/// element. Serialises as `{"extension": [...]}` next to the plain value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PrimitiveExtension {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl PrimitiveExtension {
    pub fn with(extension: Extension) -> Self {
        PrimitiveExtension {
            extension: vec![extension],
        }
    }

    pub fn add(&mut self, extension: Extension) {
        self.extension.push(extension);
    }

    /// First extension with the given url.
    pub fn find(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|e| e.url == url)
    }
}

// ============================================================================
// Identifiers and references
// ============================================================================

/// A business identifier: system URI, value, optional use code, optional
/// coded type and optional assigner.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigner: Option<Reference>,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Identifier {
            system: Some(system.into()),
            value: Some(value.into()),
            ..Identifier::default()
        }
    }

    pub fn with_type(mut self, type_: CodeableConcept) -> Self {
        self.type_ = Some(type_);
        self
    }

    pub fn with_use(mut self, use_type: impl Into<String>) -> Self {
        self.use_type = Some(use_type.into());
        self
    }

    /// True when the coded type carries a coding matching system and code.
    pub fn is_type(&self, system: &str, code: &str) -> bool {
        self.type_
            .as_ref()
            .is_some_and(|t| t.has_coding(system, code))
    }
}

/// A reference to another resource, by literal url or by identifier.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Box<Identifier>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn to(url: impl Into<String>) -> Self {
        Reference {
            reference: Some(url.into()),
            ..Reference::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

// ============================================================================
// Names
// ============================================================================

/// A human name, with `_family` and `_prefix` companions for the extensions
/// locale guides attach to those elements. `prefix_elements` is kept aligned
/// index-by-index with `prefix` (nulls for prefixes without extensions).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(rename = "_family", skip_serializing_if = "Option::is_none")]
    pub family_element: Option<PrimitiveExtension>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,

    #[serde(rename = "_prefix", default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_elements: Vec<Option<PrimitiveExtension>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,
}

impl HumanName {
    /// An official-use name with family and given parts.
    pub fn official(family: impl Into<String>, given: Vec<String>) -> Self {
        HumanName {
            use_type: Some("official".to_string()),
            family: Some(family.into()),
            given,
            ..HumanName::default()
        }
    }

    /// True when the record is marked `use: official`.
    pub fn is_official(&self) -> bool {
        self.use_type.as_deref() == Some("official")
    }

    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.suffix.iter().any(|s| s == suffix)
    }

    pub fn remove_suffix(&mut self, suffix: &str) {
        self.suffix.retain(|s| s != suffix);
    }

    /// Remove every structured prefix equal to `prefix`, keeping the
    /// `_prefix` companion aligned.
    pub fn remove_prefix(&mut self, prefix: &str) {
        let mut index = 0;
        while index < self.prefix.len() {
            if self.prefix[index] == prefix {
                self.prefix.remove(index);
                if index < self.prefix_elements.len() {
                    self.prefix_elements.remove(index);
                }
            } else {
                index += 1;
            }
        }
    }

    /// Append a prefix that carries an extension on its element. Existing
    /// prefixes without extensions are padded with nulls so the `_prefix`
    /// array stays aligned.
    pub fn add_prefix_with_extension(&mut self, prefix: impl Into<String>, extension: Extension) {
        while self.prefix_elements.len() < self.prefix.len() {
            self.prefix_elements.push(None);
        }
        self.prefix.push(prefix.into());
        self.prefix_elements
            .push(Some(PrimitiveExtension::with(extension)));
    }

    /// The `_family` companion, created on first use.
    pub fn family_element_mut(&mut self) -> &mut PrimitiveExtension {
        self.family_element
            .get_or_insert_with(PrimitiveExtension::default)
    }
}

// ============================================================================
// Addresses and contact points
// ============================================================================

/// A postal address with a single-element `line` array in the drafts this
/// crate builds. `line_elements` and `city_element` are the `_line`/`_city`
/// companions for structured address extensions.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(rename = "_line", default, skip_serializing_if = "Vec::is_empty")]
    pub line_elements: Vec<Option<PrimitiveExtension>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(rename = "_city", skip_serializing_if = "Option::is_none")]
    pub city_element: Option<PrimitiveExtension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(rename = "postalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// The `_line` companion for the line at `index`, created on first use.
    /// Intermediate positions are padded with nulls.
    pub fn line_element_mut(&mut self, index: usize) -> &mut PrimitiveExtension {
        while self.line_elements.len() <= index {
            self.line_elements.push(None);
        }
        self.line_elements[index].get_or_insert_with(PrimitiveExtension::default)
    }

    /// The `_city` companion, created on first use.
    pub fn city_element_mut(&mut self) -> &mut PrimitiveExtension {
        self.city_element
            .get_or_insert_with(PrimitiveExtension::default)
    }
}

/// A telecom contact point. Extensions attach to the element itself, not to
/// a `_field` companion, because ContactPoint is a complex type.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ContactPoint {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
}

impl ContactPoint {
    pub fn phone(value: impl Into<String>) -> Self {
        ContactPoint {
            system: Some("phone".to_string()),
            value: Some(value.into()),
            ..ContactPoint::default()
        }
    }

    pub fn email(value: impl Into<String>) -> Self {
        ContactPoint {
            system: Some("email".to_string()),
            value: Some(value.into()),
            ..ContactPoint::default()
        }
    }
}

// ============================================================================
// Metadata and supporting types
// ============================================================================

/// Resource metadata: claimed profiles and an optional source system URI.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Meta {
    /// Meta claiming conformance to a single profile.
    pub fn conforming_to(profile_uri: impl Into<String>) -> Self {
        Meta {
            profile: vec![profile_uri.into()],
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn has_profile(&self, profile_uri: &str) -> bool {
        self.profile.iter().any(|p| p == profile_uri)
    }
}

/// A time period with RFC 3339 rendered bounds.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// A measured quantity.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Attached content, base64 payload in `data`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Attachment {
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}
