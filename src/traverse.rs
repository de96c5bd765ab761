//! Traversal Engine
//!
//! Walks the schema graph depth-first from a context's starting point (the
//! root message, or the focus field) and feeds every reachable node to each
//! visitor in list order. The result is one lazy sequence of facts:
//!
//! - each node is entered at most once per traversal, so cycles terminate
//!   and a type reachable through several fields contributes once;
//! - facts from one visitor at one node are deduplicated by value;
//! - nothing is computed until the caller pulls, and dropping the iterator
//!   stops the walk.

use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use tracing::trace;

use crate::context::{Scope, VisitContext};
use crate::error::ContextError;
use crate::graph::{NodeRef, SchemaGraph};
use crate::visitor::{Facts, Visitor};

/// Start a traversal for `ctx` with `visitors`, in order
pub fn accept<'a, V: Visitor>(ctx: &VisitContext<'a>, visitors: &'a [V]) -> Traversal<'a, V> {
    let start = match ctx.scope() {
        Scope::WholeEntity => ctx.root().index(),
        Scope::FocusedField(field) => field,
    };
    let pending = if visitors.is_empty() {
        Vec::new()
    } else {
        vec![(start, Vec::new())]
    };

    Traversal {
        ctx: ctx.clone(),
        visitors,
        pending,
        visited: HashSet::new(),
        active: None,
    }
}

impl<'g> VisitContext<'g> {
    /// See [`accept`]
    pub fn accept<'a, V: Visitor>(&self, visitors: &'a [V]) -> Traversal<'a, V>
    where
        'g: 'a,
    {
        accept(self, visitors)
    }
}

impl SchemaGraph {
    /// Build a context for `root` (and optional `field`) and traverse it
    pub fn accept<'a, V: Visitor>(
        &'a self,
        root: &str,
        field: Option<&str>,
        visitors: &'a [V],
    ) -> Result<Traversal<'a, V>, ContextError> {
        let ctx = VisitContext::new(self, root, field)?;
        Ok(accept(&ctx, visitors))
    }
}

/// Node currently being fed to the visitors
struct ActiveVisit<'a, F> {
    node: NodeRef<'a>,
    ctx: VisitContext<'a>,
    next_visitor: usize,
    facts: Option<Facts<'a, F>>,
    /// Facts already yielded by the current (node, visitor) pair
    seen: HashSet<F>,
}

/// Lazy, deduplicated fact sequence (see [`accept`])
pub struct Traversal<'a, V: Visitor> {
    ctx: VisitContext<'a>,
    visitors: &'a [V],
    /// Nodes still to enter, with the field path leading to each
    pending: Vec<(NodeIndex, Vec<String>)>,
    visited: HashSet<&'a str>,
    active: Option<ActiveVisit<'a, V::Fact>>,
}

impl<'a, V: Visitor> Traversal<'a, V> {
    /// Number of distinct nodes entered so far
    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    pub fn context(&self) -> &VisitContext<'a> {
        &self.ctx
    }

    /// Pop the next unvisited node and make it active
    fn enter_next(&mut self) -> bool {
        let graph = self.ctx.graph();
        while let Some((index, path)) = self.pending.pop() {
            let node = graph.node(index);
            if !self.visited.insert(node.full_name()) {
                continue;
            }

            let child_path = if node.is_field() {
                let mut child_path = path.clone();
                child_path.push(node.name().to_string());
                child_path
            } else {
                path.clone()
            };
            // reversed so that the first successor is entered first
            for next in graph.successors(node).into_iter().rev() {
                if !self.visited.contains(next.full_name()) {
                    self.pending.push((next.index(), child_path.clone()));
                }
            }

            trace!(
                node = node.full_name(),
                kind = node.kind().as_str(),
                depth = path.len(),
                "entering node"
            );
            self.active = Some(ActiveVisit {
                node,
                ctx: self.ctx.at_path(path),
                next_visitor: 0,
                facts: None,
                seen: HashSet::new(),
            });
            return true;
        }
        false
    }
}

impl<'a, V: Visitor> Iterator for Traversal<'a, V> {
    type Item = V::Fact;

    fn next(&mut self) -> Option<Self::Item> {
        let visitors = self.visitors;
        loop {
            if let Some(active) = self.active.as_mut() {
                if let Some(facts) = active.facts.as_mut() {
                    for fact in facts.by_ref() {
                        if active.seen.insert(fact.clone()) {
                            return Some(fact);
                        }
                    }
                    active.facts = None;
                }
                if let Some(visitor) = visitors.get(active.next_visitor) {
                    active.next_visitor += 1;
                    active.seen.clear();
                    active.facts = Some(visitor.visit(active.node, &active.ctx));
                    continue;
                }
                self.active = None;
            }
            if !self.enter_next() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorSet;
    use crate::fact::SchemaField;
    use crate::visitor::SchemaFieldVisitor;

    /// Yields the full name of every node it sees, twice
    struct Echo;

    impl Visitor for Echo {
        type Fact = String;

        fn visit<'a>(&'a self, node: NodeRef<'a>, _ctx: &VisitContext<'a>) -> Facts<'a, String> {
            let name = node.full_name().to_string();
            Box::new(vec![name.clone(), name].into_iter())
        }
    }

    fn graph() -> SchemaGraph {
        SchemaGraph::build(
            &DescriptorSet::from_json(
                r#"{"file": [{"package": "p", "messageType": [
                    {"name": "Person", "field": [
                        {"name": "name", "number": 1, "type": "TYPE_STRING"},
                        {"name": "home", "number": 2, "type": "TYPE_MESSAGE",
                         "typeName": ".p.Address"},
                        {"name": "work", "number": 3, "type": "TYPE_MESSAGE",
                         "typeName": ".p.Address"}
                    ]},
                    {"name": "Address", "field": [
                        {"name": "city", "number": 1, "type": "TYPE_STRING"}
                    ]}
                ]}]}"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_preorder_with_per_visitor_dedup() {
        let graph = graph();
        let ctx = VisitContext::whole_entity(&graph, "p.Person").unwrap();
        let names: Vec<String> = accept(&ctx, &[Echo]).collect();
        assert_eq!(
            names,
            vec![
                "p.Person",
                "p.Person.name",
                "p.Person.home",
                "p.Address",
                "p.Address.city",
                "p.Person.work",
            ]
        );
    }

    #[test]
    fn test_dedup_is_per_visitor() {
        let graph = graph();
        let ctx = VisitContext::whole_entity(&graph, "p.Person").unwrap();
        let names: Vec<String> = accept(&ctx, &[Echo, Echo]).take(4).collect();
        assert_eq!(names, vec!["p.Person", "p.Person", "p.Person.name", "p.Person.name"]);
    }

    #[test]
    fn test_paths_follow_first_route() {
        let graph = graph();
        let fields: Vec<SchemaField> = graph
            .accept("p.Person", None, &[SchemaFieldVisitor])
            .unwrap()
            .collect();
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["p.Person.name", "p.Person.home", "p.Person.home.city", "p.Person.work"]
        );
        assert_eq!(fields[1].native_type, "p.Address");
    }

    #[test]
    fn test_focused_starts_at_field() {
        let graph = graph();
        let ctx = VisitContext::focused_field(&graph, "p.Person", "work").unwrap();
        let names: Vec<String> = ctx.accept(&[Echo]).collect();
        assert_eq!(names, vec!["p.Person.work", "p.Address", "p.Address.city"]);

        let fields: Vec<SchemaField> = ctx.accept(&[SchemaFieldVisitor]).collect();
        assert_eq!(fields[1].path, "p.Person.work.city");
    }

    #[test]
    fn test_lazy_and_empty() {
        let graph = graph();
        let ctx = VisitContext::whole_entity(&graph, "p.Person").unwrap();

        let mut traversal = accept(&ctx, &[Echo]);
        assert_eq!(traversal.visited(), 0);
        assert_eq!(traversal.next().as_deref(), Some("p.Person"));
        assert_eq!(traversal.visited(), 1);

        let none: [Echo; 0] = [];
        let mut empty = accept(&ctx, &none);
        assert!(empty.next().is_none());
        assert_eq!(empty.visited(), 0);
    }
}
