//! Metadata Extraction CLI
//!
//! Loads descriptor-set JSON and prints the governance facts of one entity,
//! or of every top-level message when no root is given.

use anyhow::{Context, Result};
use clap::Parser;
use proto_metadata::config::OutputFormat;
use proto_metadata::{pipeline, ExtractConfig, MetadataFact, SchemaGraph, VisitContext};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-metadata-extract")]
#[command(about = "Extract glossary terms, tags and owners from protobuf descriptor sets")]
struct Cli {
    /// Descriptor-set JSON file, or a directory of them
    descriptors: PathBuf,

    /// Fully qualified message to extract (defaults to every top-level message)
    #[arg(short, long)]
    root: Option<String>,

    /// Restrict extraction to one field of the root
    #[arg(short, long, requires = "root")]
    field: Option<String>,

    /// Config file (defaults to proto-metadata.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Visitors to run, in order; overrides the config
    #[arg(long = "visitor", value_name = "NAME")]
    visitors: Vec<String>,

    /// Output format: pretty or compact
    #[arg(long)]
    format: Option<String>,
}

#[derive(Serialize)]
struct EntityFacts<'a> {
    entity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    facts: Vec<MetadataFact>,
}

/// One compact output line: a single fact tagged with its entity
#[derive(Serialize)]
struct FactLine<'a> {
    entity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(flatten)]
    fact: &'a MetadataFact,
}

/// Output lines for one entity in `format`
fn render(format: &OutputFormat, entity: &EntityFacts<'_>) -> serde_json::Result<Vec<String>> {
    match format {
        OutputFormat::Pretty => Ok(vec![serde_json::to_string_pretty(entity)?]),
        OutputFormat::Compact => entity
            .facts
            .iter()
            .map(|fact| {
                serde_json::to_string(&FactLine {
                    entity: entity.entity,
                    field: entity.field,
                    fact,
                })
            })
            .collect(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config =
        ExtractConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if !cli.visitors.is_empty() {
        config.visitors.enabled = cli.visitors.clone();
    }
    match cli.format.as_deref() {
        None => {}
        Some("pretty") => config.output.format = OutputFormat::Pretty,
        Some("compact") => config.output.format = OutputFormat::Compact,
        Some(other) => anyhow::bail!("invalid format '{}'. Use 'pretty' or 'compact'", other),
    }

    let graph = SchemaGraph::from_path(&cli.descriptors, &config.load_config())
        .with_context(|| format!("loading descriptors from {}", cli.descriptors.display()))?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        bundle = graph.bundle_hash().unwrap_or("-"),
        "schema graph loaded"
    );

    let visitors = pipeline(&config);

    let roots: Vec<String> = match &cli.root {
        Some(root) => vec![root.clone()],
        None => graph
            .roots()
            .filter(|n| n.is_message())
            .map(|n| n.full_name().to_string())
            .collect(),
    };

    for root in &roots {
        let ctx = VisitContext::new(&graph, root, cli.field.as_deref())?;
        let facts: Vec<MetadataFact> = ctx.accept(&visitors).collect();
        let entity = EntityFacts {
            entity: root,
            field: cli.field.as_deref(),
            facts,
        };
        for line in render(&config.output.format, &entity)? {
            println!("{}", line);
        }
    }

    Ok(())
}
