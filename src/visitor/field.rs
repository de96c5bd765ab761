//! Schema Field Visitor
//!
//! Flattens the field structure reachable from the traversal's starting
//! point into [`SchemaField`] facts named by their path from the root.

use super::{Facts, Visitor};
use crate::context::VisitContext;
use crate::fact::SchemaField;
use crate::graph::NodeRef;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaFieldVisitor;

impl SchemaFieldVisitor {
    pub fn new() -> Self {
        Self
    }
}

impl Visitor for SchemaFieldVisitor {
    type Fact = SchemaField;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact> {
        let Some(info) = node.field() else {
            return Box::new(std::iter::empty());
        };
        let native_type = match node.type_node() {
            Some(target) => target.full_name().to_string(),
            None => info.field_type.as_str().to_string(),
        };
        Box::new(std::iter::once(SchemaField {
            path: ctx.qualify(node.name()),
            native_type,
            repeated: info.is_repeated(),
            deprecated: node.node().deprecated,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorSet;
    use crate::graph::SchemaGraph;

    #[test]
    fn test_fields_only() {
        let graph = SchemaGraph::build(
            &DescriptorSet::from_json(
                r#"{"file": [{"package": "p", "messageType": [{"name": "User", "field": [
                    {"name": "tags", "number": 1, "label": "LABEL_REPEATED", "type": "TYPE_STRING"},
                    {"name": "old", "number": 2, "type": "TYPE_INT32",
                     "options": {"deprecated": true}}
                ]}]}]}"#,
            )
            .unwrap(),
        )
        .unwrap();
        let ctx = VisitContext::whole_entity(&graph, "p.User").unwrap();
        let visitor = SchemaFieldVisitor::new();

        assert_eq!(visitor.visit(ctx.root(), &ctx).count(), 0);

        let tags_field = graph.get("p.User.tags").unwrap();
        let tags: Vec<SchemaField> = visitor.visit(tags_field, &ctx).collect();
        assert_eq!(
            tags,
            vec![SchemaField {
                path: "p.User.tags".into(),
                native_type: "string".into(),
                repeated: true,
                deprecated: false,
            }]
        );

        let old: Vec<SchemaField> = visitor.visit(graph.get("p.User.old").unwrap(), &ctx).collect();
        assert!(old[0].deprecated);
        assert_eq!(old[0].native_type, "int32");
    }
}
