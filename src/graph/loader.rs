//! Descriptor Loading
//!
//! Reads descriptor-set JSON from a single file or a directory tree, merges
//! the files, builds the graph and records a bundle hash over every input.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::SchemaGraph;
use crate::descriptor::DescriptorSet;
use crate::error::{Error, Result};

/// Configuration for descriptor loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip descriptor sets matching these path prefixes
    pub skip_prefixes: Vec<String>,
    /// Only load descriptor sets matching these path prefixes
    pub include_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                "target/".to_string(),       // Rust build artifacts
                ".git/".to_string(),         // Git repository
                "node_modules/".to_string(), // Node.js dependencies
            ],
            include_prefixes: Vec::new(),
        }
    }
}

/// Parse one descriptor-set JSON file, feeding its bytes to `hasher`
fn read_descriptor_set(path: &Path, hasher: &mut Sha256) -> Result<DescriptorSet> {
    let content = fs::read_to_string(path)?;
    hasher.update(content.as_bytes());
    DescriptorSet::from_json(&content).map_err(|source| Error::InvalidDescriptorSet {
        path: path.display().to_string(),
        source,
    })
}

/// Build a graph from one descriptor-set JSON file
pub fn load_descriptor_set(path: &Path) -> Result<SchemaGraph> {
    let mut hasher = Sha256::new();
    let set = read_descriptor_set(path, &mut hasher)?;

    let mut graph = SchemaGraph::build(&set)?;
    graph.bundle_hash = Some(format!("{:x}", hasher.finalize()));
    Ok(graph)
}

/// Build one graph from every `*.json` descriptor set below `dir`.
///
/// Files are visited in sorted path order. A proto file that appears in
/// more than one set (shared imports) is kept once, first occurrence wins.
pub fn load_from_directory(dir: &Path, config: &LoadConfig) -> Result<SchemaGraph> {
    let mut merged = DescriptorSet::default();
    let mut seen_files: HashSet<String> = HashSet::new();
    let mut hasher = Sha256::new();
    let mut loaded = 0usize;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let relative_str = relative.to_string_lossy();

        // Apply include/skip filters
        if !config.include_prefixes.is_empty()
            && !config.include_prefixes.iter().any(|p| relative_str.starts_with(p))
        {
            continue;
        }
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p)) {
            continue;
        }

        let set = read_descriptor_set(path, &mut hasher)?;
        for file in set.file {
            let name = file.name.clone().unwrap_or_default();
            if !name.is_empty() && !seen_files.insert(name.clone()) {
                warn!(file = %name, set = %relative_str, "duplicate proto file ignored");
                continue;
            }
            merged.file.push(file);
        }
        loaded += 1;
    }

    debug!(
        sets = loaded,
        files = merged.file.len(),
        dir = %dir.display(),
        "descriptor sets loaded"
    );

    let mut graph = SchemaGraph::build(&merged)?;
    graph.bundle_hash = Some(format!("{:x}", hasher.finalize()));
    Ok(graph)
}

impl SchemaGraph {
    /// Load from a descriptor-set file or a directory of them
    pub fn from_path(path: &Path, config: &LoadConfig) -> Result<Self> {
        if path.is_dir() {
            load_from_directory(path, config)
        } else {
            load_descriptor_set(path)
        }
    }
}
