//! Traversal Engine Tests
//!
//! Ordering, cycle termination, deduplication and laziness of `accept`.

use std::cell::Cell;

use proto_metadata::{
    accept, DescriptorSet, Facts, NodeRef, SchemaField, SchemaFieldVisitor, SchemaGraph,
    VisitContext, Visitor,
};

fn load(json: &str) -> SchemaGraph {
    SchemaGraph::build(&DescriptorSet::from_json(json).unwrap()).unwrap()
}

fn cycle_graph() -> SchemaGraph {
    load(include_str!("fixtures/cycle.json"))
}

fn diamond_graph() -> SchemaGraph {
    load(include_str!("fixtures/diamond.json"))
}

/// Names every message it is shown
struct MessageNames;

impl Visitor for MessageNames {
    type Fact = String;

    fn visit<'a>(&'a self, node: NodeRef<'a>, _ctx: &VisitContext<'a>) -> Facts<'a, String> {
        if node.is_message() {
            Box::new(std::iter::once(node.full_name().to_string()))
        } else {
            Box::new(std::iter::empty())
        }
    }
}

/// Counts visit calls
#[derive(Default)]
struct Counting {
    calls: Cell<usize>,
}

impl Visitor for Counting {
    type Fact = String;

    fn visit<'a>(&'a self, node: NodeRef<'a>, _ctx: &VisitContext<'a>) -> Facts<'a, String> {
        self.calls.set(self.calls.get() + 1);
        Box::new(std::iter::once(node.full_name().to_string()))
    }
}

// =============================================================================
// Empty and Deterministic
// =============================================================================

#[test]
fn test_no_visitors_no_facts() {
    let graph = diamond_graph();
    let ctx = VisitContext::whole_entity(&graph, "crm.Person").unwrap();
    let none: &[SchemaFieldVisitor] = &[];
    let mut traversal = accept(&ctx, none);
    assert!(traversal.next().is_none());
    assert_eq!(traversal.visited(), 0);
}

#[test]
fn test_traversal_is_deterministic() {
    let graph = diamond_graph();
    let ctx = VisitContext::whole_entity(&graph, "crm.Person").unwrap();
    let first: Vec<SchemaField> = ctx.accept(&[SchemaFieldVisitor]).collect();
    let second: Vec<SchemaField> = ctx.accept(&[SchemaFieldVisitor]).collect();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

// =============================================================================
// Shared Types and Cycles
// =============================================================================

#[test]
fn test_shared_type_contributes_once() {
    let graph = diamond_graph();
    let ctx = VisitContext::whole_entity(&graph, "crm.Person").unwrap();
    let messages: Vec<String> = ctx.accept(&[MessageNames]).collect();
    assert_eq!(messages, vec!["crm.Person", "crm.Address"]);
}

#[test]
fn test_field_structure_through_shared_type() {
    let graph = diamond_graph();
    let ctx = VisitContext::whole_entity(&graph, "crm.Person").unwrap();
    let mut traversal = ctx.accept(&[SchemaFieldVisitor]);
    let fields: Vec<SchemaField> = traversal.by_ref().collect();

    let summary: Vec<(&str, &str, bool)> = fields
        .iter()
        .map(|f| (f.path.as_str(), f.native_type.as_str(), f.repeated))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("crm.Person.home", "crm.Address", false),
            ("crm.Person.home.street", "string", false),
            ("crm.Person.home.country", "crm.Country", false),
            ("crm.Person.work", "crm.Address", false),
            ("crm.Person.previous", "crm.Address", true),
        ]
    );
    // Person, 3 fields, Address, 2 fields, Country, 2 values
    assert_eq!(traversal.visited(), 10);
}

#[test]
fn test_cycle_terminates_and_visits_each_message_once() {
    let graph = cycle_graph();
    let ctx = VisitContext::whole_entity(&graph, "cycle.A").unwrap();

    let messages: Vec<String> = ctx.accept(&[MessageNames]).collect();
    assert_eq!(messages, vec!["cycle.A", "cycle.B"]);

    let paths: Vec<String> = ctx.accept(&[SchemaFieldVisitor]).map(|f| f.path).collect();
    assert_eq!(
        paths,
        vec!["cycle.A.label", "cycle.A.b", "cycle.A.b.a", "cycle.A.b.peers"]
    );
}

#[test]
fn test_cycle_from_other_side() {
    let graph = cycle_graph();
    let ctx = VisitContext::whole_entity(&graph, "cycle.B").unwrap();
    let messages: Vec<String> = ctx.accept(&[MessageNames]).collect();
    assert_eq!(messages, vec!["cycle.B", "cycle.A"]);
}

// =============================================================================
// Focus and Laziness
// =============================================================================

#[test]
fn test_focused_traversal_starts_at_field() {
    let graph = diamond_graph();
    let ctx = VisitContext::focused_field(&graph, "crm.Person", "work").unwrap();
    let paths: Vec<String> = ctx.accept(&[SchemaFieldVisitor]).map(|f| f.path).collect();
    assert_eq!(
        paths,
        vec!["crm.Person.work", "crm.Person.work.street", "crm.Person.work.country"]
    );
}

#[test]
fn test_traversal_is_lazy() {
    let graph = diamond_graph();
    let ctx = VisitContext::whole_entity(&graph, "crm.Person").unwrap();
    let counting = [Counting::default()];

    let mut traversal = accept(&ctx, &counting);
    assert_eq!(counting[0].calls.get(), 0);

    assert_eq!(traversal.next().as_deref(), Some("crm.Person"));
    assert_eq!(counting[0].calls.get(), 1);
    assert_eq!(traversal.visited(), 1);

    let _ = traversal.next();
    drop(traversal);
    assert_eq!(counting[0].calls.get(), 2);
}

#[test]
fn test_visitors_run_in_list_order_per_node() {
    let graph = cycle_graph();
    let ctx = VisitContext::whole_entity(&graph, "cycle.A").unwrap();
    let visitors: Vec<Box<dyn Visitor<Fact = String>>> = vec![
        Box::new(MessageNames),
        Box::new(SchemaFieldVisitor.map_facts(|f: SchemaField| f.path)),
    ];
    let facts: Vec<String> = ctx.accept(&visitors).take(3).collect();
    assert_eq!(facts, vec!["cycle.A", "cycle.A.label", "cycle.A.b"]);
}
