//! Graph Construction
//!
//! Two passes over the descriptor source:
//!
//! 1. Intern every file, message, field, enum, enum value and extension
//!    declaration. An absolute type reference is resolved immediately when
//!    its target is already known; everything else is parked on the
//!    pending list.
//! 2. Drain the pending list against the complete index, then rewrite
//!    numeric option keys to the names of their declarations.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{EdgeKind, FieldInfo, FileInfo, NodeKind, SchemaGraph, SchemaNode};
use crate::descriptor::{
    DescriptorSource, EnumDescriptor, FieldDescriptor, FieldType, FileDescriptor,
    MessageDescriptor, OneofDescriptor,
};
use crate::error::ResolutionError;
use crate::extension::{
    extension_values_from_options, ExtensionDecl, ExtensionId, ExtensionValues, OptionTarget,
};

/// Who is waiting for a type reference
#[derive(Debug, Clone)]
enum RefOwner {
    Field(NodeIndex),
    Extension(ExtensionId),
}

/// A type reference that could not be resolved on first encounter
#[derive(Debug, Clone)]
struct PendingRef {
    owner: RefOwner,
    /// Lexical scope the reference was written in
    scope: String,
    type_name: String,
    declared: Option<FieldType>,
}

pub(crate) struct GraphBuilder {
    graph: DiGraph<SchemaNode, EdgeKind>,
    index: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
    files: Vec<FileInfo>,
    extensions: BTreeMap<ExtensionId, ExtensionDecl>,
    pending: Vec<PendingRef>,
}

impl GraphBuilder {
    pub(crate) fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            files: Vec::new(),
            extensions: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn build<S: DescriptorSource + ?Sized>(
        mut self,
        source: &S,
    ) -> Result<SchemaGraph, ResolutionError> {
        for file in source.files() {
            self.intern_file(file)?;
        }

        let deferred = self.pending.len();
        self.resolve_pending()?;
        self.canonicalize_numeric_keys();

        debug!(
            files = self.files.len(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            extensions = self.extensions.len(),
            deferred,
            "schema graph built"
        );

        Ok(SchemaGraph {
            graph: self.graph,
            index: self.index,
            roots: self.roots,
            files: self.files,
            extensions: self.extensions,
            bundle_hash: None,
        })
    }

    // =========================================================================
    // Pass 1: interning
    // =========================================================================

    fn intern_file(&mut self, file: &FileDescriptor) -> Result<(), ResolutionError> {
        let file_idx = self.files.len();
        let package = file.package.clone().unwrap_or_default();
        self.files.push(FileInfo {
            name: file
                .name
                .clone()
                .unwrap_or_else(|| format!("<file {}>", file_idx)),
            package: package.clone(),
            extensions: extension_values_from_options(file.options.as_ref()),
            roots: Vec::new(),
        });

        for message in &file.message_type {
            let idx = self.intern_message(file_idx, &package, None, message)?;
            self.roots.push(idx);
            self.files[file_idx].roots.push(idx);
        }
        for e in &file.enum_type {
            let idx = self.intern_enum(file_idx, &package, None, e)?;
            self.roots.push(idx);
            self.files[file_idx].roots.push(idx);
        }
        for ext in &file.extension {
            self.intern_extension(&package, ext)?;
        }
        Ok(())
    }

    fn intern_message(
        &mut self,
        file: usize,
        scope: &str,
        parent: Option<NodeIndex>,
        message: &MessageDescriptor,
    ) -> Result<NodeIndex, ResolutionError> {
        let name = required_name(message.name.as_deref(), scope, "message")?;
        let full_name = qualify(scope, name);
        let options = message.options.as_ref();
        let idx = self.add_node(SchemaNode {
            name: name.to_string(),
            full_name: full_name.clone(),
            file,
            kind: NodeKind::Message,
            extensions: extension_values_from_options(options),
            deprecated: bool_option(options, "deprecated"),
            map_entry: bool_option(options, "mapEntry"),
            parent,
            children: Vec::new(),
        })?;

        for field in &message.field {
            self.intern_field(file, &full_name, idx, field, &message.oneof_decl)?;
        }
        for nested in &message.nested_type {
            self.intern_message(file, &full_name, Some(idx), nested)?;
        }
        for e in &message.enum_type {
            self.intern_enum(file, &full_name, Some(idx), e)?;
        }
        for ext in &message.extension {
            self.intern_extension(&full_name, ext)?;
        }
        Ok(idx)
    }

    fn intern_field(
        &mut self,
        file: usize,
        message: &str,
        parent: NodeIndex,
        field: &FieldDescriptor,
        oneofs: &[OneofDescriptor],
    ) -> Result<NodeIndex, ResolutionError> {
        let name = required_name(field.name.as_deref(), message, "field")?;
        let full_name = qualify(message, name);
        let declared = field.field_type();
        let type_name = type_reference(&full_name, declared, field)?;

        let oneof = field
            .oneof_index
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| oneofs.get(i))
            .and_then(|o| o.name.clone());

        let options = field.options.as_ref();
        let idx = self.add_node(SchemaNode {
            name: name.to_string(),
            full_name,
            file,
            kind: NodeKind::Field(FieldInfo {
                number: field.number.unwrap_or_default(),
                label: field.label(),
                // provisional for untyped references; fixed once resolved
                field_type: declared.unwrap_or(FieldType::Message),
                type_name: type_name.clone(),
                type_node: None,
                oneof,
                json_name: field.json_name.clone(),
            }),
            extensions: extension_values_from_options(options),
            deprecated: bool_option(options, "deprecated"),
            map_entry: false,
            parent: Some(parent),
            children: Vec::new(),
        })?;

        if let Some(type_name) = type_name {
            self.reference(RefOwner::Field(idx), message, type_name, declared)?;
        }
        Ok(idx)
    }

    fn intern_enum(
        &mut self,
        file: usize,
        scope: &str,
        parent: Option<NodeIndex>,
        e: &EnumDescriptor,
    ) -> Result<NodeIndex, ResolutionError> {
        let name = required_name(e.name.as_deref(), scope, "enum")?;
        let full_name = qualify(scope, name);
        let options = e.options.as_ref();
        let idx = self.add_node(SchemaNode {
            name: name.to_string(),
            full_name: full_name.clone(),
            file,
            kind: NodeKind::Enum,
            extensions: extension_values_from_options(options),
            deprecated: bool_option(options, "deprecated"),
            map_entry: false,
            parent,
            children: Vec::new(),
        })?;

        for value in &e.value {
            let name = required_name(value.name.as_deref(), &full_name, "enum value")?;
            let options = value.options.as_ref();
            self.add_node(SchemaNode {
                name: name.to_string(),
                full_name: qualify(&full_name, name),
                file,
                kind: NodeKind::EnumValue {
                    number: value.number.unwrap_or_default(),
                },
                extensions: extension_values_from_options(options),
                deprecated: bool_option(options, "deprecated"),
                map_entry: false,
                parent: Some(idx),
                children: Vec::new(),
            })?;
        }
        Ok(idx)
    }

    fn intern_extension(
        &mut self,
        scope: &str,
        ext: &FieldDescriptor,
    ) -> Result<(), ResolutionError> {
        let name = required_name(ext.name.as_deref(), scope, "extension")?;
        let full_name = qualify(scope, name);
        let extendee = ext.extendee.as_deref().ok_or_else(|| ResolutionError::Malformed {
            entity: full_name.clone(),
            reason: "extension without extendee".to_string(),
        })?;
        let declared = ext.field_type();
        let type_name = type_reference(&full_name, declared, ext)?;

        let id = ExtensionId::name(&full_name);
        if self.extensions.contains_key(&id) {
            return Err(ResolutionError::DuplicateName(full_name));
        }
        self.extensions.insert(
            id.clone(),
            ExtensionDecl {
                id: id.clone(),
                number: ext.number.and_then(|n| u32::try_from(n).ok()),
                target: OptionTarget::from_extendee(extendee),
                field_type: declared,
                label: ext.label(),
                type_node: None,
                options: extension_values_from_options(ext.options.as_ref()),
            },
        );

        if let Some(type_name) = type_name {
            self.reference(RefOwner::Extension(id), scope, type_name, declared)?;
        }
        Ok(())
    }

    fn add_node(&mut self, node: SchemaNode) -> Result<NodeIndex, ResolutionError> {
        if self.index.contains_key(&node.full_name) {
            return Err(ResolutionError::DuplicateName(node.full_name));
        }
        let full_name = node.full_name.clone();
        let parent = node.parent;
        let idx = self.graph.add_node(node);
        if let Some(parent) = parent {
            self.graph.add_edge(parent, idx, EdgeKind::Declares);
            self.graph[parent].children.push(idx);
        }
        self.index.insert(full_name, idx);
        Ok(idx)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve now if possible, otherwise defer. Relative names always wait
    /// for the full index: an inner scope declared later must win over an
    /// outer one that is already known.
    fn reference(
        &mut self,
        owner: RefOwner,
        scope: &str,
        type_name: String,
        declared: Option<FieldType>,
    ) -> Result<(), ResolutionError> {
        let eager = if type_name.starts_with('.') {
            self.resolve_name(scope, &type_name)
        } else {
            None
        };
        match eager {
            Some(target) => self.link(&owner, &type_name, target, declared),
            None => {
                self.pending.push(PendingRef {
                    owner,
                    scope: scope.to_string(),
                    type_name,
                    declared,
                });
                Ok(())
            }
        }
    }

    fn resolve_pending(&mut self) -> Result<(), ResolutionError> {
        for pending in std::mem::take(&mut self.pending) {
            let Some(target) = self.resolve_name(&pending.scope, &pending.type_name) else {
                return Err(ResolutionError::Unresolved {
                    field: self.owner_name(&pending.owner),
                    type_name: pending.type_name,
                });
            };
            self.link(&pending.owner, &pending.type_name, target, pending.declared)?;
        }
        Ok(())
    }

    /// Protobuf name lookup: absolute names (leading dot) directly, relative
    /// names from the innermost enclosing scope outwards. Only messages and
    /// enums are valid targets.
    fn resolve_name(&self, scope: &str, type_name: &str) -> Option<NodeIndex> {
        let is_type = |idx: &NodeIndex| {
            matches!(self.graph[*idx].kind, NodeKind::Message | NodeKind::Enum)
        };

        if let Some(absolute) = type_name.strip_prefix('.') {
            return self.index.get(absolute).copied().filter(is_type);
        }

        let mut scope = scope;
        loop {
            let candidate = qualify(scope, type_name);
            if let Some(idx) = self.index.get(&candidate).copied().filter(is_type) {
                return Some(idx);
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope.rsplit_once('.').map(|(outer, _)| outer).unwrap_or("");
        }
    }

    fn link(
        &mut self,
        owner: &RefOwner,
        type_name: &str,
        target: NodeIndex,
        declared: Option<FieldType>,
    ) -> Result<(), ResolutionError> {
        let resolved = match (declared, &self.graph[target].kind) {
            (Some(FieldType::Message | FieldType::Group), NodeKind::Message) => {
                declared.unwrap_or(FieldType::Message)
            }
            (None, NodeKind::Message) => FieldType::Message,
            (Some(FieldType::Enum) | None, NodeKind::Enum) => FieldType::Enum,
            (declared, found) => {
                return Err(ResolutionError::KindMismatch {
                    field: self.owner_name(owner),
                    type_name: type_name.to_string(),
                    declared: declared.map(|t| t.as_str()).unwrap_or("unknown").to_string(),
                    found: found.as_str().to_string(),
                });
            }
        };

        match owner {
            RefOwner::Field(idx) => {
                if let NodeKind::Field(info) = &mut self.graph[*idx].kind {
                    info.field_type = resolved;
                    info.type_node = Some(target);
                }
                self.graph.add_edge(*idx, target, EdgeKind::TypeRef);
            }
            RefOwner::Extension(id) => {
                if let Some(decl) = self.extensions.get_mut(id) {
                    decl.field_type = Some(resolved);
                    decl.type_node = Some(target);
                }
            }
        }
        Ok(())
    }

    fn owner_name(&self, owner: &RefOwner) -> String {
        match owner {
            RefOwner::Field(idx) => self.graph[*idx].full_name.clone(),
            RefOwner::Extension(id) => id.to_string(),
        }
    }

    // =========================================================================
    // Pass 2: numeric option keys
    // =========================================================================

    fn canonicalize_numeric_keys(&mut self) {
        let by_number: HashMap<(OptionTarget, u32), ExtensionId> = self
            .extensions
            .values()
            .filter_map(|d| Some(((d.target.clone(), d.number?), d.id.clone())))
            .collect();
        if by_number.is_empty() {
            return;
        }

        for idx in self.graph.node_indices().collect::<Vec<_>>() {
            let target = match self.graph[idx].kind {
                NodeKind::Message => OptionTarget::Message,
                NodeKind::Field(_) => OptionTarget::Field,
                NodeKind::Enum => OptionTarget::Enum,
                NodeKind::EnumValue { .. } => OptionTarget::EnumValue,
            };
            rename_numeric(&mut self.graph[idx].extensions, &target, &by_number);
        }
        for file in &mut self.files {
            rename_numeric(&mut file.extensions, &OptionTarget::File, &by_number);
        }
        for decl in self.extensions.values_mut() {
            rename_numeric(&mut decl.options, &OptionTarget::Field, &by_number);
        }
    }
}

fn rename_numeric(
    values: &mut ExtensionValues,
    target: &OptionTarget,
    by_number: &HashMap<(OptionTarget, u32), ExtensionId>,
) {
    let numeric: Vec<u32> = values
        .keys()
        .filter_map(|id| match id {
            ExtensionId::Number(n) => Some(*n),
            ExtensionId::Name(_) => None,
        })
        .collect();

    for number in numeric {
        let Some(name) = by_number.get(&(target.clone(), number)) else {
            continue;
        };
        if let Some(moved) = values.remove(&ExtensionId::Number(number)) {
            values.entry(name.clone()).or_default().extend(moved);
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn required_name<'a>(
    name: Option<&'a str>,
    scope: &str,
    what: &str,
) -> Result<&'a str, ResolutionError> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ResolutionError::Malformed {
            entity: if scope.is_empty() {
                "<root>".to_string()
            } else {
                scope.to_string()
            },
            reason: format!("{} without a name", what),
        }),
    }
}

/// Type name a field or extension must resolve, if any
fn type_reference(
    full_name: &str,
    declared: Option<FieldType>,
    field: &FieldDescriptor,
) -> Result<Option<String>, ResolutionError> {
    let type_name = field.type_name.clone().filter(|t| !t.is_empty());
    match (declared, type_name) {
        (None, None) => Err(ResolutionError::Malformed {
            entity: full_name.to_string(),
            reason: "field has no type information".to_string(),
        }),
        (Some(ty), None) if ty.is_reference() => Err(ResolutionError::Malformed {
            entity: full_name.to_string(),
            reason: format!("{} field without typeName", ty.as_str()),
        }),
        (Some(ty), _) if !ty.is_reference() => Ok(None),
        (_, type_name) => Ok(type_name),
    }
}

fn bool_option(options: Option<&BTreeMap<String, serde_json::Value>>, key: &str) -> bool {
    options
        .and_then(|o| o.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
