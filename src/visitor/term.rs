//! Term-Association Visitor
//!
//! Emits a [`GlossaryTermAssociation`] for every term-typed extension value
//! on the entity a context is scoped to. Unfocused contexts read only the
//! root message's options; focused contexts read only the focus field's.

use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use super::{enum_value_name, in_scope, is_enum_typed, ExtensionSelector, Facts, Selected, Visitor};
use crate::config::ExtractConfig;
use crate::context::VisitContext;
use crate::extension::{ExtensionId, MetaType};
use crate::fact::GlossaryTermAssociation;
use crate::graph::{NodeRef, SchemaGraph};

/// Dotted identifier, optionally namespaced with `:`
fn term_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*([.:][A-Za-z0-9_][A-Za-z0-9_\-]*)*$")
            .expect("term pattern is valid")
    })
}

#[derive(Debug, Clone)]
pub struct TermAssociationVisitor {
    selector: ExtensionSelector,
}

impl Default for TermAssociationVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl TermAssociationVisitor {
    /// Read every extension declared with `meta.type = TERM`
    pub fn new() -> Self {
        Self {
            selector: ExtensionSelector::meta_type(MetaType::Term),
        }
    }

    /// Read exactly these extensions
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
            &config.extensions.term,
            &config.extensions.meta_type_option,
            MetaType::Term,
        ))
    }

    pub fn selector(&self) -> &ExtensionSelector {
        &self.selector
    }
}

impl Visitor for TermAssociationVisitor {
    type Fact = GlossaryTermAssociation;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact> {
        if !in_scope(node, ctx) {
            return Box::new(std::iter::empty());
        }
        let graph = node.graph();
        Box::new(
            self.selector
                .select(node)
                .filter_map(move |selected| term_name(graph, &selected))
                .map(GlossaryTermAssociation::new),
        )
    }
}

fn term_name(graph: &SchemaGraph, selected: &Selected<'_>) -> Option<String> {
    if is_enum_typed(graph, selected) {
        return enum_value_name(graph, selected);
    }
    match selected.value {
        Value::String(term) if term_pattern().is_match(term) => Some(term.clone()),
        other => {
            debug!(extension = %selected.id, value = %other, "skipping malformed term payload");
            None
        }
    }
}
