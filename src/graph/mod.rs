//! Schema Graph
//!
//! Cross-referenced, immutable view of a descriptor set. Messages, fields,
//! enums and enum values are interned as [`SchemaNode`]s inside a petgraph
//! `DiGraph`; `Declares` edges mirror lexical nesting and `TypeRef` edges
//! connect a field to the message or enum it is typed with.
//!
//! Built once by [`SchemaGraph::build`], then shared read-only by any number
//! of traversals.

pub mod analysis;
pub mod builder;
pub mod loader;

pub use analysis::{recursive_groups, RecursiveGroup};
pub use loader::{load_descriptor_set, load_from_directory, LoadConfig};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::descriptor::{DescriptorSource, FieldType, Label};
use crate::error::{NotFound, ResolutionError};
use crate::extension::{ExtensionDecl, ExtensionId, ExtensionValues, MetaType, OptionTarget};

/// Fully qualified, dot-separated name without a leading dot
pub type QualifiedName = String;

/// Types of edges in the schema graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Parent declares child (message -> field / nested type, enum -> value)
    Declares,
    /// Field is typed with a message or enum
    TypeRef,
}

/// Field-specific attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub number: i32,
    pub label: Label,
    pub field_type: FieldType,
    /// Type name exactly as declared (`.pkg.Msg`, `Msg`, ...)
    pub type_name: Option<String>,
    /// Resolved message or enum node
    pub type_node: Option<NodeIndex>,
    pub oneof: Option<String>,
    pub json_name: Option<String>,
}

impl FieldInfo {
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Message,
    Field(FieldInfo),
    Enum,
    EnumValue { number: i32 },
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Message => "message",
            NodeKind::Field(_) => "field",
            NodeKind::Enum => "enum",
            NodeKind::EnumValue { .. } => "enum value",
        }
    }
}

/// One schema entity
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Local name as declared
    pub name: String,
    /// Unique fully qualified name
    pub full_name: QualifiedName,
    /// Index into [`SchemaGraph::files`]
    pub file: usize,
    pub kind: NodeKind,
    /// Custom option values keyed by extension id
    pub extensions: ExtensionValues,
    pub deprecated: bool,
    /// Synthetic `XxxEntry` message generated for a map field
    pub map_entry: bool,
    /// Enclosing declaration, for navigation only
    pub parent: Option<NodeIndex>,
    /// Owned declarations in declaration order
    pub children: Vec<NodeIndex>,
}

/// A descriptor file as seen by the graph
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub package: String,
    pub extensions: ExtensionValues,
    /// Top-level messages and enums, in declaration order
    pub roots: Vec<NodeIndex>,
}

/// The schema graph
#[derive(Debug)]
pub struct SchemaGraph {
    pub(crate) graph: DiGraph<SchemaNode, EdgeKind>,

    /// Index: qualified name -> node
    pub(crate) index: HashMap<QualifiedName, NodeIndex>,

    /// Top-level declarations across all files
    pub(crate) roots: Vec<NodeIndex>,

    pub(crate) files: Vec<FileInfo>,

    /// Extension declarations by canonical id
    pub(crate) extensions: BTreeMap<ExtensionId, ExtensionDecl>,

    /// SHA-256 over every loaded input, when built by the loader
    pub(crate) bundle_hash: Option<String>,
}

impl SchemaGraph {
    /// Build a graph from any descriptor source.
    ///
    /// Type references that cannot be resolved when first seen are retried
    /// once every declaration is interned, so forward and mutual references
    /// are fine. Fails without exposing a partial graph.
    pub fn build<S: DescriptorSource + ?Sized>(source: &S) -> Result<Self, ResolutionError> {
        builder::GraphBuilder::new().build(source)
    }

    // ========== Public API ==========

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn bundle_hash(&self) -> Option<&str> {
        self.bundle_hash.as_deref()
    }

    /// Handle for a node index produced by this graph
    pub fn node(&self, index: NodeIndex) -> NodeRef<'_> {
        NodeRef { graph: self, index }
    }

    /// Look up any entity by qualified name (a leading dot is accepted)
    pub fn get(&self, name: &str) -> Option<NodeRef<'_>> {
        let name = name.trim_start_matches('.');
        self.index.get(name).map(|&index| self.node(index))
    }

    /// Resolve the entity a visit is rooted at
    pub fn find_root(&self, name: &str) -> Result<NodeRef<'_>, NotFound> {
        self.get(name).ok_or_else(|| NotFound(name.to_string()))
    }

    /// Owned children of a node, in declaration order
    pub fn children_of<'g>(&'g self, node: NodeRef<'g>) -> impl Iterator<Item = NodeRef<'g>> + 'g {
        node.children()
    }

    /// Values recorded for `id` on `node`; empty when absent
    pub fn extension_values<'g>(&'g self, node: NodeRef<'g>, id: &ExtensionId) -> &'g [Value] {
        node.extension_values(id)
    }

    /// Nodes a traversal moves to from `node`: a message's fields, a field's
    /// resolved type, an enum's values.
    pub fn successors<'g>(&'g self, node: NodeRef<'g>) -> Vec<NodeRef<'g>> {
        match &node.node().kind {
            NodeKind::Message => node.children().filter(|c| c.is_field()).collect(),
            NodeKind::Field(info) => info.type_node.map(|t| self.node(t)).into_iter().collect(),
            NodeKind::Enum => node.children().collect(),
            NodeKind::EnumValue { .. } => Vec::new(),
        }
    }

    /// Top-level messages and enums of every file
    pub fn roots(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.roots.iter().map(|&index| self.node(index))
    }

    /// Every message in the graph, nested ones included
    pub fn messages(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.graph
            .node_indices()
            .map(|index| self.node(index))
            .filter(|n| n.is_message())
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn extension(&self, id: &ExtensionId) -> Option<&ExtensionDecl> {
        self.extensions.get(id)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &ExtensionDecl> {
        self.extensions.values()
    }

    /// Extension declarations classified with `meta_type` through `option_id`
    pub fn extensions_by_meta_type<'g>(
        &'g self,
        option_id: &'g ExtensionId,
        meta_type: &'g MetaType,
    ) -> impl Iterator<Item = &'g ExtensionDecl> + 'g {
        self.extensions
            .values()
            .filter(move |decl| self.meta_type_of(decl, option_id).as_ref() == Some(meta_type))
    }

    /// Meta type `decl` carries through `option_id`. The payload is a value
    /// name or, as protoc emits enum options, the value's number; numbers are
    /// looked up in the enum the option itself is declared with.
    pub fn meta_type_of(&self, decl: &ExtensionDecl, option_id: &ExtensionId) -> Option<MetaType> {
        let values = decl.options.get(option_id)?;
        if let Some(name) = values.iter().find_map(Value::as_str) {
            return Some(MetaType::parse(name));
        }
        let number = values.iter().find_map(Value::as_i64)?;
        let enum_node = self
            .extension(option_id)
            .and_then(|option| option.type_node)
            .map(|index| self.node(index))
            .filter(|node| node.is_enum());
        let value = enum_node.and_then(|node| {
            node.children().find(|v| {
                matches!(v.kind(), NodeKind::EnumValue { number: n } if i64::from(*n) == number)
            })
        });
        if value.is_none() {
            debug!(
                extension = %decl.id,
                option = %option_id,
                number,
                "meta type number names no declared value"
            );
        }
        value.map(|v| MetaType::parse(v.name()))
    }

    /// Declarations extending `target`, sorted by id
    pub fn extensions_for(&self, target: &OptionTarget) -> Vec<&ExtensionDecl> {
        self.extensions.values().filter(|d| &d.target == target).collect()
    }
}

// =============================================================================
// Node Handle
// =============================================================================

/// Borrowed handle to a node: the graph plus its index
#[derive(Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g SchemaGraph,
    index: NodeIndex,
}

impl<'g> NodeRef<'g> {
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn graph(&self) -> &'g SchemaGraph {
        self.graph
    }

    pub fn node(&self) -> &'g SchemaNode {
        &self.graph.graph[self.index]
    }

    pub fn name(&self) -> &'g str {
        &self.node().name
    }

    pub fn full_name(&self) -> &'g str {
        &self.node().full_name
    }

    pub fn kind(&self) -> &'g NodeKind {
        &self.node().kind
    }

    pub fn is_message(&self) -> bool {
        matches!(self.kind(), NodeKind::Message)
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind(), NodeKind::Field(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind(), NodeKind::Enum)
    }

    pub fn field(&self) -> Option<&'g FieldInfo> {
        match self.kind() {
            NodeKind::Field(info) => Some(info),
            _ => None,
        }
    }

    /// Resolved type of a field
    pub fn type_node(&self) -> Option<NodeRef<'g>> {
        self.field()?.type_node.map(|t| self.graph.node(t))
    }

    pub fn extensions(&self) -> &'g ExtensionValues {
        &self.node().extensions
    }

    pub fn extension_values(&self, id: &ExtensionId) -> &'g [Value] {
        self.node()
            .extensions
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parent(&self) -> Option<NodeRef<'g>> {
        self.node().parent.map(|p| self.graph.node(p))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'g>> + 'g {
        let graph = self.graph;
        self.node().children.iter().map(move |&c| graph.node(c))
    }

    /// Field declared directly on this message
    pub fn field_named(&self, name: &str) -> Option<NodeRef<'g>> {
        self.children().find(|c| c.is_field() && c.name() == name)
    }

    pub fn file(&self) -> &'g FileInfo {
        &self.graph.files[self.node().file]
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.index == other.index
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("full_name", &self.full_name())
            .field("kind", &self.kind().as_str())
            .finish()
    }
}
