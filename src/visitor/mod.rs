//! Visitors
//!
//! A visitor inspects one node under a [`VisitContext`] and yields zero or
//! more facts. Visitors never mutate the graph and hold no per-traversal
//! state; the traversal engine owns ordering, deduplication and termination.
//!
//! Built-in visitors:
//! - [`TermAssociationVisitor`]: glossary terms (`meta.type = TERM`)
//! - [`TagVisitor`]: tags (`meta.type = TAG`)
//! - [`OwnershipVisitor`]: owners from message and file options (`meta.type = OWNER`)
//! - [`SchemaFieldVisitor`]: flattened field structure

pub mod field;
pub mod ownership;
pub mod tag;
pub mod term;

pub use field::SchemaFieldVisitor;
pub use ownership::OwnershipVisitor;
pub use tag::TagVisitor;
pub use term::TermAssociationVisitor;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::hash::Hash;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::context::{Scope, VisitContext};
use crate::extension::{
    ExtensionDecl, ExtensionId, ExtensionValues, MetaType, DEFAULT_META_TYPE_OPTION,
};
use crate::fact::MetadataFact;
use crate::graph::{NodeKind, NodeRef, SchemaGraph};

/// Lazy facts produced by one visit
pub type Facts<'a, F> = Box<dyn Iterator<Item = F> + 'a>;

/// Visitor yielding the shared [`MetadataFact`] type
pub type DynVisitor = Box<dyn Visitor<Fact = MetadataFact> + Send + Sync>;

pub trait Visitor {
    type Fact: Clone + Eq + Hash;

    /// Facts for `node` under `ctx`. Must be deterministic and side-effect
    /// free; an empty iterator is the common case.
    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact>;

    /// Convert every fact with `map`, e.g. into [`MetadataFact`]
    fn map_facts<M, G>(self, map: M) -> MapFacts<Self, M>
    where
        Self: Sized,
        M: Fn(Self::Fact) -> G,
        G: Clone + Eq + Hash,
    {
        MapFacts { inner: self, map }
    }
}

impl<V: Visitor + ?Sized> Visitor for &V {
    type Fact = V::Fact;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact> {
        (**self).visit(node, ctx)
    }
}

impl<V: Visitor + ?Sized> Visitor for Box<V> {
    type Fact = V::Fact;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact> {
        (**self).visit(node, ctx)
    }
}

/// See [`Visitor::map_facts`]
#[derive(Debug, Clone)]
pub struct MapFacts<V, M> {
    inner: V,
    map: M,
}

impl<V, M, G> Visitor for MapFacts<V, M>
where
    V: Visitor,
    M: Fn(V::Fact) -> G,
    G: Clone + Eq + Hash,
{
    type Fact = G;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, G> {
        Box::new(self.inner.visit(node, ctx).map(&self.map))
    }
}

// =============================================================================
// Extension Selection
// =============================================================================

/// Which extensions a visitor reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionSelector {
    /// Declarations whose `option` carries `meta_type`
    MetaType { option: ExtensionId, meta_type: MetaType },
    /// A fixed set of extension ids
    Ids(BTreeSet<ExtensionId>),
}

impl ExtensionSelector {
    /// Select by meta type through the default `meta.type` option
    pub fn meta_type(meta_type: MetaType) -> Self {
        Self::MetaType {
            option: ExtensionId::name(DEFAULT_META_TYPE_OPTION),
            meta_type,
        }
    }

    pub fn ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ExtensionId>,
    {
        Self::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Selector from configured ids, falling back to meta-type selection.
    /// Ids are names (`meta.msg.term`, `[meta.msg.term]`) or field numbers
    /// (`60101`, `[60101]`).
    pub(crate) fn configured(ids: &[String], option: &str, meta_type: MetaType) -> Self {
        if ids.is_empty() {
            Self::MetaType {
                option: ExtensionId::name(option),
                meta_type,
            }
        } else {
            Self::ids(ids.iter().map(|id| {
                ExtensionId::from_option_key(id).unwrap_or_else(|| ExtensionId::name(id))
            }))
        }
    }

    pub fn matches(&self, graph: &SchemaGraph, id: &ExtensionId) -> bool {
        match self {
            // numeric keys of declared extensions are renamed at build time
            Self::Ids(ids) => {
                ids.contains(id)
                    || graph
                        .extension(id)
                        .and_then(|decl| decl.number)
                        .is_some_and(|number| ids.contains(&ExtensionId::Number(number)))
            }
            Self::MetaType { option, meta_type } => graph
                .extension(id)
                .and_then(|decl| graph.meta_type_of(decl, option))
                .is_some_and(|found| &found == meta_type),
        }
    }

    /// Selected extension values of `node`, by id order
    pub fn select<'g>(&'g self, node: NodeRef<'g>) -> impl Iterator<Item = Selected<'g>> + 'g {
        self.select_values(node.graph(), node.extensions())
    }

    /// Selected entries of an arbitrary value map (file options, ...)
    pub fn select_values<'g>(
        &'g self,
        graph: &'g SchemaGraph,
        values: &'g ExtensionValues,
    ) -> impl Iterator<Item = Selected<'g>> + 'g {
        values
            .iter()
            .filter(move |(id, _)| self.matches(graph, id))
            .flat_map(move |(id, values)| {
                let decl = graph.extension(id);
                values.iter().map(move |value| Selected { id, decl, value })
            })
    }
}

/// One selected extension payload
#[derive(Debug, Clone, Copy)]
pub struct Selected<'g> {
    pub id: &'g ExtensionId,
    /// Declaration, when the descriptor set includes it
    pub decl: Option<&'g ExtensionDecl>,
    pub value: &'g Value,
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Whether `node` is where a scoped visitor reads its values: the root
/// message when unfocused, only the focus field when focused.
pub fn in_scope(node: NodeRef<'_>, ctx: &VisitContext<'_>) -> bool {
    match ctx.scope() {
        Scope::WholeEntity => node.index() == ctx.root().index(),
        Scope::FocusedField(field) => node.index() == field,
    }
}

/// `EnumName.VALUE` for an enum-typed payload given by value name or number
pub(crate) fn enum_value_name(graph: &SchemaGraph, selected: &Selected<'_>) -> Option<String> {
    let enum_node = selected
        .decl
        .and_then(|decl| decl.type_node)
        .map(|idx| graph.node(idx))
        .filter(|node| node.is_enum())?;

    let value = enum_node.children().find(|v| match (selected.value, v.kind()) {
        (Value::String(name), _) => v.name() == name,
        (Value::Number(n), NodeKind::EnumValue { number }) => {
            n.as_i64() == Some(i64::from(*number))
        }
        _ => false,
    });

    match value {
        Some(value) => Some(format!("{}.{}", enum_node.name(), value.name())),
        None => {
            debug!(
                extension = %selected.id,
                enum_type = enum_node.full_name(),
                value = %selected.value,
                "enum payload names no declared value"
            );
            None
        }
    }
}

/// Whether the selected payload belongs to an enum-typed declaration
pub(crate) fn is_enum_typed(graph: &SchemaGraph, selected: &Selected<'_>) -> bool {
    selected
        .decl
        .and_then(|decl| decl.type_node)
        .is_some_and(|idx| graph.node(idx).is_enum())
}

/// Visitors enabled by `config`, in configured order. Unknown names are
/// skipped with a debug event.
pub fn pipeline(config: &ExtractConfig) -> Vec<DynVisitor> {
    let mut visitors: Vec<DynVisitor> = Vec::new();
    for name in &config.visitors.enabled {
        match name.trim().to_ascii_lowercase().as_str() {
            "term" | "terms" => visitors.push(Box::new(
                TermAssociationVisitor::from_config(config).map_facts(MetadataFact::from),
            )),
            "tag" | "tags" => visitors.push(Box::new(
                TagVisitor::from_config(config).map_facts(MetadataFact::from),
            )),
            "owner" | "ownership" => visitors.push(Box::new(
                OwnershipVisitor::from_config(config).map_facts(MetadataFact::from),
            )),
            "field" | "fields" => visitors.push(Box::new(
                SchemaFieldVisitor::new().map_facts(MetadataFact::from),
            )),
            other => debug!(visitor = other, "unknown visitor name ignored"),
        }
    }
    visitors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorSet;
    use crate::fact::GlossaryTermAssociation;

    const SCHEMA: &str = r#"{"file": [{"package": "meta",
        "enumType": [{"name": "Level", "value": [
            {"name": "LOW", "number": 0}, {"name": "HIGH", "number": 1}]}],
        "extension": [
            {"name": "type", "number": 60000, "type": "TYPE_STRING",
             "extendee": ".google.protobuf.FieldOptions"},
            {"name": "level", "number": 60001, "type": "TYPE_ENUM", "typeName": ".meta.Level",
             "extendee": ".google.protobuf.MessageOptions", "options": {"[meta.type]": "TERM"}},
            {"name": "label", "number": 60002, "type": "TYPE_STRING",
             "extendee": ".google.protobuf.MessageOptions", "options": {"[meta.type]": "TAG"}}
        ],
        "messageType": [{"name": "Doc",
            "field": [{"name": "body", "number": 1, "type": "TYPE_STRING"}],
            "options": {"[meta.level]": "HIGH", "[meta.label]": "draft"}}]
    }]}"#;

    fn graph() -> SchemaGraph {
        SchemaGraph::build(&DescriptorSet::from_json(SCHEMA).unwrap()).unwrap()
    }

    #[test]
    fn test_selector_by_meta_type() {
        let graph = graph();
        let doc = graph.get("meta.Doc").unwrap();

        let terms = ExtensionSelector::meta_type(MetaType::Term);
        let ids: Vec<String> = terms.select(doc).map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["[meta.level]"]);

        let fixed = ExtensionSelector::ids(["meta.label"]);
        let values: Vec<&Value> = fixed.select(doc).map(|s| s.value).collect();
        assert_eq!(values, vec![&Value::from("draft")]);
    }

    #[test]
    fn test_enum_values_by_name_and_number() {
        let graph = graph();
        let decl = graph.extension(&ExtensionId::name("meta.level")).unwrap();
        let id = ExtensionId::name("meta.level");
        let by_name = Value::from("HIGH");
        let by_number = Value::from(0);
        let unknown = Value::from(7);

        let render = |value: &Value| {
            enum_value_name(
                &graph,
                &Selected {
                    id: &id,
                    decl: Some(decl),
                    value,
                },
            )
        };
        assert_eq!(render(&by_name).as_deref(), Some("Level.HIGH"));
        assert_eq!(render(&by_number).as_deref(), Some("Level.LOW"));
        assert_eq!(render(&unknown), None);
    }

    #[test]
    fn test_scope_check() {
        let graph = graph();
        let doc = graph.get("meta.Doc").unwrap();
        let body = graph.get("meta.Doc.body").unwrap();

        let whole = VisitContext::whole_entity(&graph, "meta.Doc").unwrap();
        assert!(in_scope(doc, &whole));
        assert!(!in_scope(body, &whole));

        let focused = VisitContext::focused_field(&graph, "meta.Doc", "body").unwrap();
        assert!(!in_scope(doc, &focused));
        assert!(in_scope(body, &focused));
    }

    #[test]
    fn test_map_facts_and_blanket_impls() {
        let graph = graph();
        let ctx = VisitContext::whole_entity(&graph, "meta.Doc").unwrap();
        let doc = ctx.root();

        let visitor = TermAssociationVisitor::new();
        let by_ref: Vec<GlossaryTermAssociation> = (&visitor).visit(doc, &ctx).collect();
        assert_eq!(by_ref, vec![GlossaryTermAssociation::new("Level.HIGH")]);

        let mapped = TermAssociationVisitor::new().map_facts(MetadataFact::from);
        let boxed: DynVisitor = Box::new(mapped);
        let facts: Vec<MetadataFact> = boxed.visit(doc, &ctx).collect();
        assert_eq!(facts, vec![MetadataFact::Term(GlossaryTermAssociation::new("Level.HIGH"))]);
    }

    #[test]
    fn test_configured_ids_by_name_or_number() {
        let selector = ExtensionSelector::configured(
            &[
                "60002".to_string(),
                "[60001]".to_string(),
                "[meta.label]".to_string(),
                "meta.other".to_string(),
            ],
            DEFAULT_META_TYPE_OPTION,
            MetaType::Term,
        );
        let expected = ExtensionSelector::Ids(BTreeSet::from([
            ExtensionId::Number(60002),
            ExtensionId::Number(60001),
            ExtensionId::name("meta.label"),
            ExtensionId::name("meta.other"),
        ]));
        assert_eq!(selector, expected);

        // [meta.level] is declared as 60001, so the renamed key still matches
        let graph = graph();
        let doc = graph.get("meta.Doc").unwrap();
        let ids: Vec<String> = selector.select(doc).map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["[meta.label]", "[meta.level]"]);
    }

    #[test]
    fn test_pipeline_follows_config_order() {
        let mut config = ExtractConfig::default();
        config.visitors.enabled = vec!["tag".into(), "bogus".into(), "term".into()];
        assert_eq!(pipeline(&config).len(), 2);
    }
}
