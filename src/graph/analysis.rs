//! Schema Graph Analysis
//!
//! Finds recursive message types: strongly connected components of the
//! "message has a field of type message" relation, including messages that
//! reference themselves.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{QualifiedName, SchemaGraph};

/// A group of mutually recursive messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursiveGroup {
    /// Members, sorted by qualified name
    pub members: Vec<QualifiedName>,
    /// Single message that references itself
    pub is_self_referential: bool,
}

impl RecursiveGroup {
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

/// Compute recursive message groups, sorted by their first member
pub fn recursive_groups(graph: &SchemaGraph) -> Vec<RecursiveGroup> {
    let mut deps: DiGraph<NodeIndex, ()> = DiGraph::new();
    let mut local: HashMap<NodeIndex, NodeIndex> = HashMap::new();

    for message in graph.messages() {
        local.insert(message.index(), deps.add_node(message.index()));
    }

    let mut self_refs = Vec::new();
    for message in graph.messages() {
        for field in message.children().filter(|c| c.is_field()) {
            let Some(target) = field.type_node().filter(|t| t.is_message()) else {
                continue;
            };
            let (Some(&from), Some(&to)) =
                (local.get(&message.index()), local.get(&target.index()))
            else {
                continue;
            };
            if from == to {
                self_refs.push(message.index());
            }
            deps.update_edge(from, to, ());
        }
    }

    let mut groups: Vec<RecursiveGroup> = kosaraju_scc(&deps)
        .into_iter()
        .filter_map(|scc| {
            let members: Vec<NodeIndex> = scc.iter().map(|&i| deps[i]).collect();
            let is_self_referential = members.len() == 1 && self_refs.contains(&members[0]);
            if members.len() < 2 && !is_self_referential {
                return None;
            }
            let mut names: Vec<QualifiedName> = members
                .iter()
                .map(|&m| graph.node(m).full_name().to_string())
                .collect();
            names.sort();
            Some(RecursiveGroup {
                members: names,
                is_self_referential,
            })
        })
        .collect();

    groups.sort_by(|a, b| a.members.cmp(&b.members));
    groups
}

impl SchemaGraph {
    /// Recursive message groups (see [`recursive_groups`])
    pub fn recursive_groups(&self) -> Vec<RecursiveGroup> {
        recursive_groups(self)
    }

    /// Whether a message takes part in any recursion
    pub fn is_recursive(&self, name: &str) -> bool {
        recursive_groups(self).iter().any(|g| g.contains(name.trim_start_matches('.')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorSet;

    #[test]
    fn test_mutual_and_self_recursion() {
        let set = DescriptorSet::from_json(
            r#"{"file": [{"package": "p", "messageType": [
                {"name": "A", "field": [
                    {"name": "b", "number": 1, "type": "TYPE_MESSAGE", "typeName": ".p.B"}
                ]},
                {"name": "B", "field": [
                    {"name": "a", "number": 1, "type": "TYPE_MESSAGE", "typeName": ".p.A"}
                ]},
                {"name": "Tree", "field": [
                    {"name": "children", "number": 1, "label": "LABEL_REPEATED",
                     "type": "TYPE_MESSAGE", "typeName": ".p.Tree"}
                ]},
                {"name": "Leaf", "field": [{"name": "v", "number": 1, "type": "TYPE_STRING"}]}
            ]}]}"#,
        )
        .unwrap();
        let graph = SchemaGraph::build(&set).unwrap();

        let groups = graph.recursive_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec!["p.A", "p.B"]);
        assert!(!groups[0].is_self_referential);
        assert_eq!(groups[1].members, vec!["p.Tree"]);
        assert!(groups[1].is_self_referential);

        assert!(graph.is_recursive(".p.Tree"));
        assert!(!graph.is_recursive("p.Leaf"));
    }
}
