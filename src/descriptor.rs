//! Descriptor Source
//!
//! Read-only input model: the JSON rendering of a `google.protobuf.FileDescriptorSet`
//! as produced by `buf build --as-file-descriptor-set` or `protoc`.
//!
//! Custom options are rendered as bracketed keys inside each `options` object:
//!
//! ```json
//! { "options": { "deprecated": true, "[meta.msg.classification]": "HighlyConfidential" } }
//! ```
//!
//! This crate never parses `.proto` text; it consumes these descriptors as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw option map (standard options and `[extension]` keys side by side)
pub type OptionsJson = BTreeMap<String, Value>;

/// Anything that can hand the graph builder a list of file descriptors
pub trait DescriptorSource {
    fn files(&self) -> &[FileDescriptor];
}

/// A full descriptor set (`google.protobuf.FileDescriptorSet`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorSet {
    #[serde(default)]
    pub file: Vec<FileDescriptor>,
}

impl DescriptorSet {
    /// Parse a descriptor set from its JSON rendering
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Append the files of another set, e.g. a separately compiled import
    pub fn extend(&mut self, other: DescriptorSet) {
        self.file.extend(other.file);
    }
}

impl DescriptorSource for DescriptorSet {
    fn files(&self) -> &[FileDescriptor] {
        &self.file
    }
}

impl DescriptorSource for Vec<FileDescriptor> {
    fn files(&self) -> &[FileDescriptor] {
        self
    }
}

impl DescriptorSource for [FileDescriptor] {
    fn files(&self) -> &[FileDescriptor] {
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: Option<String>,
    pub package: Option<String>,
    #[serde(default)]
    pub dependency: Vec<String>,
    #[serde(default)]
    pub message_type: Vec<MessageDescriptor>,
    #[serde(default)]
    pub enum_type: Vec<EnumDescriptor>,
    #[serde(default)]
    pub extension: Vec<FieldDescriptor>,
    #[serde(default)]
    pub options: Option<OptionsJson>,
    pub syntax: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDescriptor {
    pub name: Option<String>,
    #[serde(default)]
    pub field: Vec<FieldDescriptor>,
    #[serde(default)]
    pub nested_type: Vec<MessageDescriptor>,
    #[serde(default)]
    pub enum_type: Vec<EnumDescriptor>,
    #[serde(default)]
    pub extension: Vec<FieldDescriptor>,
    #[serde(default)]
    pub oneof_decl: Vec<OneofDescriptor>,
    #[serde(default)]
    pub options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: Option<String>,
    pub number: Option<i32>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub typ: Option<String>,
    pub type_name: Option<String>,
    /// Only set on extension declarations
    pub extendee: Option<String>,
    pub json_name: Option<String>,
    pub oneof_index: Option<i32>,
    #[serde(default)]
    pub options: Option<OptionsJson>,
}

impl FieldDescriptor {
    /// Declared wire type, if present and recognised
    pub fn field_type(&self) -> Option<FieldType> {
        self.typ.as_deref().and_then(FieldType::parse)
    }

    pub fn label(&self) -> Label {
        self.label.as_deref().map(Label::parse).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneofDescriptor {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: Option<String>,
    #[serde(default)]
    pub value: Vec<EnumValueDescriptor>,
    #[serde(default)]
    pub options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: Option<String>,
    pub number: Option<i32>,
    #[serde(default)]
    pub options: Option<OptionsJson>,
}

// =============================================================================
// Field Type / Label
// =============================================================================

/// `FieldDescriptorProto.Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    Uint32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl FieldType {
    /// Accepts `TYPE_STRING`, `string` and `String` spellings
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.strip_prefix("TYPE_").unwrap_or(raw).to_ascii_lowercase();
        let ty = match name.as_str() {
            "double" => Self::Double,
            "float" => Self::Float,
            "int64" => Self::Int64,
            "uint64" => Self::Uint64,
            "int32" => Self::Int32,
            "fixed64" => Self::Fixed64,
            "fixed32" => Self::Fixed32,
            "bool" => Self::Bool,
            "string" => Self::String,
            "group" => Self::Group,
            "message" => Self::Message,
            "bytes" => Self::Bytes,
            "uint32" => Self::Uint32,
            "enum" => Self::Enum,
            "sfixed32" => Self::Sfixed32,
            "sfixed64" => Self::Sfixed64,
            "sint32" => Self::Sint32,
            "sint64" => Self::Sint64,
            _ => return None,
        };
        Some(ty)
    }

    /// Name as written in `.proto` source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Group => "group",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::Uint32 => "uint32",
            Self::Enum => "enum",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
        }
    }

    /// Message, group and enum fields carry a `typeName`
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Message | Self::Group | Self::Enum)
    }
}

/// `FieldDescriptorProto.Label`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[default]
    Optional,
    Required,
    Repeated,
}

impl Label {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix("LABEL_").unwrap_or(raw).to_ascii_lowercase().as_str() {
            "required" => Self::Required,
            "repeated" => Self::Repeated,
            _ => Self::Optional,
        }
    }
}
