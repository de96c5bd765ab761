//! Tag Visitor
//!
//! Same scoping as term associations. Payloads map to tags as follows:
//! strings as given, enum values as `EnumName.VALUE`, a `true` flag as the
//! extension's own local name. `false` flags yield nothing.

use serde_json::Value;
use tracing::debug;

use super::{enum_value_name, in_scope, is_enum_typed, ExtensionSelector, Facts, Selected, Visitor};
use crate::config::ExtractConfig;
use crate::context::VisitContext;
use crate::extension::{ExtensionId, MetaType};
use crate::fact::TagAssociation;
use crate::graph::{NodeRef, SchemaGraph};

#[derive(Debug, Clone)]
pub struct TagVisitor {
    selector: ExtensionSelector,
}

impl Default for TagVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl TagVisitor {
    pub fn new() -> Self {
        Self {
            selector: ExtensionSelector::meta_type(MetaType::Tag),
        }
    }

    pub fn with_extensions<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ExtensionId>,
    {
        Self {
            selector: ExtensionSelector::ids(ids),
        }
    }

    pub fn with_selector(selector: ExtensionSelector) -> Self {
        Self { selector }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::with_selector(ExtensionSelector::configured(
            &config.extensions.tag,
            &config.extensions.meta_type_option,
            MetaType::Tag,
        ))
    }
}

impl Visitor for TagVisitor {
    type Fact = TagAssociation;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact> {
        if !in_scope(node, ctx) {
            return Box::new(std::iter::empty());
        }
        let graph = node.graph();
        Box::new(
            self.selector
                .select(node)
                .filter_map(move |selected| tag_name(graph, &selected))
                .map(TagAssociation::new),
        )
    }
}

fn tag_name(graph: &SchemaGraph, selected: &Selected<'_>) -> Option<String> {
    if is_enum_typed(graph, selected) {
        return enum_value_name(graph, selected);
    }
    match selected.value {
        Value::String(tag) if !tag.trim().is_empty() => Some(tag.trim().to_string()),
        Value::Bool(true) => Some(selected.id.local_name()),
        Value::Bool(false) => None,
        other => {
            debug!(extension = %selected.id, value = %other, "skipping malformed tag payload");
            None
        }
    }
}
