//! Ownership Visitor
//!
//! Owners apply to whole entities, so this visitor only answers unfocused
//! contexts, at the root message. Owners declared on the message come
//! first, followed by owners declared on its file.
//!
//! Accepted payloads:
//! - `"user:alice"` / `"group:data-platform"`
//! - a bare name, owned by the configured default kind
//! - `{"owner": "user:alice", "type": "BUSINESS_OWNER"}`

use serde_json::Value;
use tracing::debug;

use super::{ExtensionSelector, Facts, Selected, Visitor};
use crate::config::ExtractConfig;
use crate::context::{Scope, VisitContext};
use crate::extension::{ExtensionId, MetaType};
use crate::fact::{Owner, OwnerKind, OwnerUrn, OwnershipType};
use crate::graph::NodeRef;

#[derive(Debug, Clone)]
pub struct OwnershipVisitor {
    selector: ExtensionSelector,
    default_kind: OwnerKind,
    default_type: OwnershipType,
}

impl Default for OwnershipVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnershipVisitor {
    pub fn new() -> Self {
        Self {
            selector: ExtensionSelector::meta_type(MetaType::Owner),
            default_kind: OwnerKind::default(),
            default_type: OwnershipType::default(),
        }
    }

    pub fn with_extensions<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ExtensionId>,
    {
        Self {
            selector: ExtensionSelector::ids(ids),
            ..Self::new()
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            selector: ExtensionSelector::configured(
                &config.extensions.owner,
                &config.extensions.meta_type_option,
                MetaType::Owner,
            ),
            default_kind: config.ownership.default_kind,
            default_type: config.ownership.default_type,
        }
    }

    /// Kind used for bare owner names
    pub fn default_kind(mut self, kind: OwnerKind) -> Self {
        self.default_kind = kind;
        self
    }

    pub fn default_type(mut self, ownership_type: OwnershipType) -> Self {
        self.default_type = ownership_type;
        self
    }

    fn owner(&self, selected: &Selected<'_>) -> Option<Owner> {
        let parsed = match selected.value {
            Value::String(raw) => self.parse_urn(raw).map(|urn| (urn, self.default_type)),
            Value::Object(fields) => {
                let urn = fields
                    .get("owner")
                    .and_then(Value::as_str)
                    .and_then(|raw| self.parse_urn(raw));
                let ownership_type = match fields.get("type").and_then(Value::as_str) {
                    Some(raw) => OwnershipType::parse(raw),
                    None => Some(self.default_type),
                };
                urn.zip(ownership_type)
            }
            _ => None,
        };

        match parsed {
            Some((urn, ownership_type)) => Some(Owner { urn, ownership_type }),
            None => {
                debug!(
                    extension = %selected.id,
                    value = %selected.value,
                    "skipping malformed owner payload"
                );
                None
            }
        }
    }

    fn parse_urn(&self, raw: &str) -> Option<OwnerUrn> {
        let raw = raw.trim();
        let (kind, name) = match raw.split_once(':') {
            Some((kind, name)) => (OwnerKind::parse(kind)?, name.trim()),
            None => (self.default_kind, raw),
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        Some(OwnerUrn {
            kind,
            name: name.to_string(),
        })
    }
}

impl Visitor for OwnershipVisitor {
    type Fact = Owner;

    fn visit<'a>(&'a self, node: NodeRef<'a>, ctx: &VisitContext<'a>) -> Facts<'a, Self::Fact> {
        if ctx.scope() != Scope::WholeEntity || node.index() != ctx.root().index() {
            return Box::new(std::iter::empty());
        }
        let graph = node.graph();
        let declared = self.selector.select(node);
        let inherited = self.selector.select_values(graph, &node.file().extensions);
        Box::new(declared.chain(inherited).filter_map(move |selected| self.owner(&selected)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorSet;
    use crate::graph::SchemaGraph;

    const SCHEMA: &str = r#"{"file": [{"name": "billing.proto", "package": "billing",
        "extension": [
            {"name": "type", "number": 60000, "type": "TYPE_STRING",
             "extendee": ".google.protobuf.FieldOptions"},
            {"name": "team", "number": 60020, "label": "LABEL_REPEATED", "type": "TYPE_STRING",
             "extendee": ".google.protobuf.MessageOptions", "options": {"[billing.type]": "OWNER"}},
            {"name": "file_team", "number": 60021, "type": "TYPE_STRING",
             "extendee": ".google.protobuf.FileOptions", "options": {"[billing.type]": "OWNER"}}
        ],
        "options": {"[billing.file_team]": "group:finance"},
        "messageType": [{"name": "Invoice",
            "field": [{"name": "total", "number": 1, "type": "TYPE_INT64"}],
            "options": {"[billing.team]": [
                "user:alice",
                "payments",
                "robot:r2d2",
                {"owner": "user:bob", "type": "DATA_STEWARD"}
            ]}}]
    }]}"#;

    fn visitor() -> OwnershipVisitor {
        OwnershipVisitor {
            selector: ExtensionSelector::MetaType {
                option: ExtensionId::name("billing.type"),
                meta_type: MetaType::Owner,
            },
            ..OwnershipVisitor::new()
        }
    }

    #[test]
    fn test_message_then_file_owners() {
        let graph = SchemaGraph::build(&DescriptorSet::from_json(SCHEMA).unwrap()).unwrap();
        let ctx = VisitContext::whole_entity(&graph, "billing.Invoice").unwrap();
        let owners: Vec<String> = visitor()
            .visit(ctx.root(), &ctx)
            .map(|o| format!("{} {:?}", o.urn, o.ownership_type))
            .collect();
        assert_eq!(
            owners,
            vec![
                "urn:li:corpuser:alice TechnicalOwner",
                "urn:li:corpGroup:payments TechnicalOwner",
                "urn:li:corpuser:bob DataSteward",
                "urn:li:corpGroup:finance TechnicalOwner",
            ]
        );
    }

    #[test]
    fn test_default_kind_applies_to_bare_names() {
        let graph = SchemaGraph::build(&DescriptorSet::from_json(SCHEMA).unwrap()).unwrap();
        let ctx = VisitContext::whole_entity(&graph, "billing.Invoice").unwrap();
        let users = visitor().default_kind(OwnerKind::User);
        let owners: Vec<Owner> = users.visit(ctx.root(), &ctx).collect();
        assert!(owners.iter().any(|o| o.urn.to_string() == "urn:li:corpuser:payments"));
    }

    #[test]
    fn test_silent_when_focused() {
        let graph = SchemaGraph::build(&DescriptorSet::from_json(SCHEMA).unwrap()).unwrap();
        let ctx = VisitContext::focused_field(&graph, "billing.Invoice", "total").unwrap();
        assert_eq!(visitor().visit(ctx.root(), &ctx).count(), 0);
        assert_eq!(visitor().visit(ctx.focus_field().unwrap(), &ctx).count(), 0);
    }
}
