//! Extension identifiers and declarations
//!
//! An extension is addressed either by its fully qualified name
//! (`meta.msg.classification`) or, when the descriptor renders unknown
//! fields, by its field number. Numeric keys are rewritten to names during
//! graph construction whenever a matching declaration is present.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::descriptor::{FieldType, Label};

/// Default option id used to classify extension declarations
pub const DEFAULT_META_TYPE_OPTION: &str = "meta.type";

/// Identifier of a custom extension
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtensionId {
    Name(String),
    Number(u32),
}

impl ExtensionId {
    /// Named id; surrounding brackets and a leading dot are stripped
    pub fn name(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let name = name
            .strip_prefix('[')
            .and_then(|n| n.strip_suffix(']'))
            .unwrap_or(name);
        ExtensionId::Name(name.trim_start_matches('.').to_string())
    }

    pub fn number(number: u32) -> Self {
        ExtensionId::Number(number)
    }

    /// Interpret an `options` key. Plain keys (`deprecated`, `mapEntry`) are
    /// standard options and yield `None`.
    pub fn from_option_key(key: &str) -> Option<Self> {
        let inner = match key.strip_prefix('[').and_then(|k| k.strip_suffix(']')) {
            Some(inner) => inner,
            None => {
                return key.parse::<u32>().ok().map(ExtensionId::Number);
            }
        };
        if inner.is_empty() {
            return None;
        }
        match inner.parse::<u32>() {
            Ok(number) => Some(ExtensionId::Number(number)),
            Err(_) => Some(ExtensionId::name(inner)),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            ExtensionId::Name(name) => Some(name),
            ExtensionId::Number(_) => None,
        }
    }

    /// Last dotted segment of a named id (`meta.msg.team` -> `team`)
    pub fn local_name(&self) -> String {
        match self {
            ExtensionId::Name(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
            ExtensionId::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionId::Name(name) => write!(f, "[{}]", name),
            ExtensionId::Number(n) => write!(f, "[{}]", n),
        }
    }
}

impl From<&str> for ExtensionId {
    fn from(s: &str) -> Self {
        ExtensionId::name(s)
    }
}

/// Extension values declared on one node, flattened per id
pub type ExtensionValues = BTreeMap<ExtensionId, Vec<Value>>;

// =============================================================================
// Option Target
// =============================================================================

/// Which options message an extension extends
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionTarget {
    File,
    Message,
    Field,
    Enum,
    EnumValue,
    Other(String),
}

impl OptionTarget {
    pub fn from_extendee(extendee: &str) -> Self {
        match extendee.trim_start_matches('.') {
            "google.protobuf.FileOptions" => Self::File,
            "google.protobuf.MessageOptions" => Self::Message,
            "google.protobuf.FieldOptions" => Self::Field,
            "google.protobuf.EnumOptions" => Self::Enum,
            "google.protobuf.EnumValueOptions" => Self::EnumValue,
            other => Self::Other(other.to_string()),
        }
    }
}

// =============================================================================
// Meta Type
// =============================================================================

/// Governance concern an extension carries, read from the declaration's
/// own `(meta.type)` option
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaType {
    Term,
    Tag,
    Owner,
    Domain,
    Deprecation,
    Property,
    Other(String),
}

impl MetaType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TERM" => Self::Term,
            "TAG" => Self::Tag,
            "OWNER" => Self::Owner,
            "DOMAIN" => Self::Domain,
            "DEPRECATION" => Self::Deprecation,
            "PROPERTY" => Self::Property,
            _ => Self::Other(raw.to_string()),
        }
    }
}

// =============================================================================
// Extension Declaration
// =============================================================================

/// An `extend google.protobuf.*Options { ... }` declaration
#[derive(Debug, Clone)]
pub struct ExtensionDecl {
    pub id: ExtensionId,
    pub number: Option<u32>,
    pub target: OptionTarget,
    pub field_type: Option<FieldType>,
    pub label: Label,
    /// Resolved enum or message node for reference-typed extensions
    pub type_node: Option<NodeIndex>,
    /// Options attached to the declaration itself
    pub options: ExtensionValues,
}

impl ExtensionDecl {
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

/// Split a raw options object into extension values. Repeated payloads
/// (JSON arrays) are flattened; standard options are ignored.
pub fn extension_values_from_options(
    options: Option<&BTreeMap<String, Value>>,
) -> ExtensionValues {
    let mut values = ExtensionValues::new();
    let Some(options) = options else {
        return values;
    };
    for (key, value) in options {
        let Some(id) = ExtensionId::from_option_key(key) else {
            continue;
        };
        let slot = values.entry(id).or_default();
        match value {
            Value::Array(items) => slot.extend(items.iter().cloned()),
            other => slot.push(other.clone()),
        }
    }
    values
}
