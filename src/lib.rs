//! Protobuf Governance Metadata
//!
//! Extracts domain-governance metadata (glossary terms, tags, owners, field
//! structure) that is embedded as custom extension options in compiled
//! protobuf descriptor sets.
//!
//! ## Features
//!
//! - **Schema Graph**: descriptor sets are interned once into an immutable,
//!   cross-referenced graph; forward, mutual and cross-file references resolve
//! - **Scoped Visits**: a [`VisitContext`] names the entity (and optionally the
//!   single field) facts are wanted for
//! - **Pluggable Visitors**: every [`Visitor`] sees every reachable node
//! - **Lazy Traversal**: facts stream out deduplicated and in a stable order;
//!   cycles terminate
//!
//! ## Architecture
//!
//! ```text
//! descriptor-set JSON ──► SchemaGraph ──► accept(VisitContext, [Visitor]) ──► facts
//!                          (built once,     (depth-first, lazy,
//!                           shared)          dedup per node & visitor)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use proto_metadata::{SchemaGraph, LoadConfig, TermAssociationVisitor, VisitContext};
//! use std::path::Path;
//!
//! let graph = SchemaGraph::from_path(Path::new("descriptors.json"), &LoadConfig::default())?;
//! let ctx = VisitContext::whole_entity(&graph, "extended_protobuf.Person")?;
//! for term in ctx.accept(&[TermAssociationVisitor::new()]) {
//!     println!("{}", term.urn);
//! }
//! # Ok::<(), proto_metadata::Error>(())
//! ```

pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod extension;
pub mod fact;
pub mod graph;
pub mod traverse;
pub mod visitor;

pub use config::ExtractConfig;
pub use context::{Scope, VisitContext};
pub use descriptor::{DescriptorSet, DescriptorSource, FieldType, FileDescriptor, Label};
pub use error::{ContextError, Error, NotFound, ResolutionError, Result};
pub use extension::{ExtensionDecl, ExtensionId, MetaType, OptionTarget};
pub use fact::{GlossaryTermAssociation, MetadataFact, Owner, SchemaField, TagAssociation};
pub use graph::{LoadConfig, NodeKind, NodeRef, SchemaGraph, SchemaNode};
pub use traverse::{accept, Traversal};
pub use visitor::{
    pipeline, ExtensionSelector, Facts, OwnershipVisitor, SchemaFieldVisitor, TagVisitor,
    TermAssociationVisitor, Visitor,
};
