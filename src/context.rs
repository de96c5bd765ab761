//! Visit Context
//!
//! Names the entity a traversal is rooted at and, optionally, the single
//! field it is narrowed to. Contexts are immutable; the traversal engine
//! derives a copy per visited node carrying the enclosing field path.

use petgraph::graph::NodeIndex;

use crate::error::ContextError;
use crate::graph::{NodeRef, SchemaGraph};

/// Whole message or one field of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    WholeEntity,
    FocusedField(NodeIndex),
}

#[derive(Debug, Clone)]
pub struct VisitContext<'g> {
    graph: &'g SchemaGraph,
    root: NodeIndex,
    scope: Scope,
    /// Field names leading from the root to the node being visited
    path: Vec<String>,
}

impl<'g> VisitContext<'g> {
    /// Root a context at `root`, optionally focused on one of its fields.
    ///
    /// The field may be given by local name or fully qualified name, and must
    /// be declared directly on the root message.
    pub fn new(
        graph: &'g SchemaGraph,
        root: &str,
        field: Option<&str>,
    ) -> Result<Self, ContextError> {
        let root_node = graph
            .get(root)
            .ok_or_else(|| ContextError::UnknownRoot(root.to_string()))?;
        if !root_node.is_message() {
            return Err(ContextError::NotAMessage {
                name: root_node.full_name().to_string(),
                kind: root_node.kind().as_str().to_string(),
            });
        }

        let scope = match field {
            None => Scope::WholeEntity,
            Some(field) => {
                let local = field
                    .trim_start_matches('.')
                    .strip_prefix(root_node.full_name())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(field);
                let focus =
                    root_node.field_named(local).ok_or_else(|| ContextError::UnknownField {
                        root: root_node.full_name().to_string(),
                        field: field.to_string(),
                    })?;
                Scope::FocusedField(focus.index())
            }
        };

        Ok(Self {
            graph,
            root: root_node.index(),
            scope,
            path: Vec::new(),
        })
    }

    pub fn whole_entity(graph: &'g SchemaGraph, root: &str) -> Result<Self, ContextError> {
        Self::new(graph, root, None)
    }

    pub fn focused_field(
        graph: &'g SchemaGraph,
        root: &str,
        field: &str,
    ) -> Result<Self, ContextError> {
        Self::new(graph, root, Some(field))
    }

    pub fn graph(&self) -> &'g SchemaGraph {
        self.graph
    }

    pub fn root(&self) -> NodeRef<'g> {
        self.graph.node(self.root)
    }

    pub fn focus_field(&self) -> Option<NodeRef<'g>> {
        match self.scope {
            Scope::WholeEntity => None,
            Scope::FocusedField(field) => Some(self.graph.node(field)),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_focused(&self) -> bool {
        matches!(self.scope, Scope::FocusedField(_))
    }

    /// Enclosing field chain of the node currently being visited
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dotted name of `local` as seen from the root: `Root.field.nested`
    pub fn qualify(&self, local: &str) -> String {
        let mut qualified = self.root().full_name().to_string();
        for segment in self.path.iter().map(String::as_str).chain(Some(local)) {
            if segment.is_empty() {
                continue;
            }
            qualified.push('.');
            qualified.push_str(segment);
        }
        qualified
    }

    /// Same request, positioned at a different field path
    pub(crate) fn at_path(&self, path: Vec<String>) -> Self {
        Self {
            graph: self.graph,
            root: self.root,
            scope: self.scope,
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorSet;

    fn graph() -> SchemaGraph {
        let set = DescriptorSet::from_json(
            r#"{"file": [{"package": "hr",
                "enumType": [{"name": "Level", "value": [{"name": "JUNIOR", "number": 0}]}],
                "messageType": [
                    {"name": "Person", "field": [
                        {"name": "name", "number": 1, "type": "TYPE_STRING"},
                        {"name": "team", "number": 2, "type": "TYPE_MESSAGE",
                         "typeName": ".hr.Team"}
                    ]},
                    {"name": "Team", "field": [
                        {"name": "title", "number": 1, "type": "TYPE_STRING"}
                    ]}
                ]}]}"#,
        )
        .unwrap();
        SchemaGraph::build(&set).unwrap()
    }

    #[test]
    fn test_whole_entity_context() {
        let graph = graph();
        let ctx = VisitContext::whole_entity(&graph, "hr.Person").unwrap();
        assert_eq!(ctx.root().full_name(), "hr.Person");
        assert_eq!(ctx.scope(), Scope::WholeEntity);
        assert!(ctx.focus_field().is_none());
        assert_eq!(ctx.qualify("name"), "hr.Person.name");
    }

    #[test]
    fn test_focused_context_accepts_local_and_qualified_names() {
        let graph = graph();
        let local = VisitContext::focused_field(&graph, "hr.Person", "team").unwrap();
        let qualified = VisitContext::focused_field(&graph, "hr.Person", "hr.Person.team").unwrap();
        assert_eq!(local.focus_field().unwrap().full_name(), "hr.Person.team");
        assert_eq!(local.scope(), qualified.scope());
        assert!(local.is_focused());
    }

    #[test]
    fn test_unknown_root_and_field() {
        let graph = graph();
        assert_eq!(
            VisitContext::whole_entity(&graph, "hr.Nobody").unwrap_err(),
            ContextError::UnknownRoot("hr.Nobody".into())
        );
        // declared on Team, not on Person
        assert_eq!(
            VisitContext::focused_field(&graph, "hr.Person", "title").unwrap_err(),
            ContextError::UnknownField {
                root: "hr.Person".into(),
                field: "title".into()
            }
        );
    }

    #[test]
    fn test_root_must_be_message() {
        let graph = graph();
        assert!(matches!(
            VisitContext::whole_entity(&graph, "hr.Level"),
            Err(ContextError::NotAMessage { .. })
        ));
        assert!(matches!(
            VisitContext::whole_entity(&graph, "hr.Person.name"),
            Err(ContextError::NotAMessage { .. })
        ));
    }

    #[test]
    fn test_qualify_follows_path() {
        let graph = graph();
        let ctx = VisitContext::whole_entity(&graph, "hr.Person").unwrap();
        let nested = ctx.at_path(vec!["team".to_string()]);
        assert_eq!(nested.qualify("title"), "hr.Person.team.title");
        assert_eq!(nested.path(), ["team".to_string()]);
        assert_eq!(ctx.qualify(""), "hr.Person");
    }
}
