//! Metadata Facts
//!
//! Value types produced by visitors. Equality is by value, which is what the
//! traversal engine deduplicates on. URNs follow the catalog's
//! `urn:li:<entity>:<id>` form.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Glossary Terms
// =============================================================================

/// Identifier of a glossary term, e.g. `Classification.HighlyConfidential`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlossaryTermUrn(String);

impl GlossaryTermUrn {
    pub fn new(term: impl Into<String>) -> Self {
        Self(term.into())
    }

    /// Term name without the URN prefix
    pub fn term(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlossaryTermUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:li:glossaryTerm:{}", self.0)
    }
}

/// A glossary term attached to a schema entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlossaryTermAssociation {
    pub urn: GlossaryTermUrn,
}

impl GlossaryTermAssociation {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            urn: GlossaryTermUrn::new(term),
        }
    }
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagUrn(String);

impl TagUrn {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn tag(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:li:tag:{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagAssociation {
    pub urn: TagUrn,
}

impl TagAssociation {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { urn: TagUrn::new(tag) }
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// Kind of principal that owns an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    User,
    #[default]
    Group,
}

impl OwnerKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" | "corpuser" => Some(Self::User),
            "group" | "corpgroup" => Some(Self::Group),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerUrn {
    pub kind: OwnerKind,
    pub name: String,
}

impl fmt::Display for OwnerUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OwnerKind::User => write!(f, "urn:li:corpuser:{}", self.name),
            OwnerKind::Group => write!(f, "urn:li:corpGroup:{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipType {
    #[default]
    TechnicalOwner,
    BusinessOwner,
    DataSteward,
}

impl OwnershipType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "TECHNICAL_OWNER" => Some(Self::TechnicalOwner),
            "BUSINESS_OWNER" => Some(Self::BusinessOwner),
            "DATA_STEWARD" => Some(Self::DataSteward),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Owner {
    pub urn: OwnerUrn,
    pub ownership_type: OwnershipType,
}

// =============================================================================
// Schema Fields
// =============================================================================

/// Flattened field as seen from the traversal root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaField {
    /// `Root.field.nested` path
    pub path: String,
    /// Scalar type name or the fully qualified message/enum name
    pub native_type: String,
    pub repeated: bool,
    pub deprecated: bool,
}

// =============================================================================
// Heterogeneous Pipelines
// =============================================================================

/// Every fact kind the built-in visitors produce
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataFact {
    Term(GlossaryTermAssociation),
    Tag(TagAssociation),
    Owner(Owner),
    Field(SchemaField),
}

impl From<GlossaryTermAssociation> for MetadataFact {
    fn from(term: GlossaryTermAssociation) -> Self {
        MetadataFact::Term(term)
    }
}

impl From<TagAssociation> for MetadataFact {
    fn from(tag: TagAssociation) -> Self {
        MetadataFact::Tag(tag)
    }
}

impl From<Owner> for MetadataFact {
    fn from(owner: Owner) -> Self {
        MetadataFact::Owner(owner)
    }
}

impl From<SchemaField> for MetadataFact {
    fn from(field: SchemaField) -> Self {
        MetadataFact::Field(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urn_rendering() {
        let term = GlossaryTermAssociation::new("Classification.HighlyConfidential");
        assert_eq!(term.urn.to_string(), "urn:li:glossaryTerm:Classification.HighlyConfidential");
        assert_eq!(TagUrn::new("pii").to_string(), "urn:li:tag:pii");

        let group = OwnerUrn {
            kind: OwnerKind::Group,
            name: "data-platform".into(),
        };
        assert_eq!(group.to_string(), "urn:li:corpGroup:data-platform");
    }

    #[test]
    fn test_owner_parsing() {
        assert_eq!(OwnerKind::parse("corpuser"), Some(OwnerKind::User));
        assert_eq!(OwnerKind::parse("Group"), Some(OwnerKind::Group));
        assert_eq!(OwnerKind::parse("robot"), None);
        assert_eq!(OwnershipType::parse("business-owner"), Some(OwnershipType::BusinessOwner));
    }

    #[test]
    fn test_metadata_fact_serialization() {
        let fact = MetadataFact::from(TagAssociation::new("pii"));
        let json = serde_json::to_value(&fact).unwrap();
        assert_eq!(json["kind"], "tag");
        assert_eq!(json["urn"], "pii");
    }
}
