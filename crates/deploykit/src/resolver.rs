//! Node name resolution and the per-batch node cache.
//!
//! The set of known nodes is derived from the project's `nodes/` directory:
//! every `<hostname>.json` entry names one node. A node can be referred to
//! by any dot-separated prefix of its hostname as long as the prefix is
//! unambiguous — `henrietta.swa.gov.it` answers to `henrietta.swa.gov`,
//! `henrietta.swa`, or `henrietta`, but an abbreviation matching two nodes
//! is rejected rather than guessed at.

use crate::error::{Error, Result};
use crate::node::Node;
use std::collections::HashMap;
use std::path::PathBuf;

/// Finds, validates and caches [`Node`]s for one batch.
#[derive(Debug)]
pub struct NodeRegistry {
    nodes_dir: PathBuf,
    known: Option<Vec<String>>,
    nodes: HashMap<String, Node>,
}

impl NodeRegistry {
    /// Create a registry over the given `nodes/` descriptor directory.
    #[must_use]
    pub fn new(nodes_dir: impl Into<PathBuf>) -> Self {
        Self {
            nodes_dir: nodes_dir.into(),
            known: None,
            nodes: HashMap::new(),
        }
    }

    /// The known node hostnames, sorted.
    ///
    /// Scanned from the descriptor directory on first use and memoized for
    /// the life of the registry; a single batch never adds nodes mid-run.
    pub fn known_nodes(&mut self) -> Result<&[String]> {
        if self.known.is_none() {
            let entries = std::fs::read_dir(&self.nodes_dir).map_err(|_| Error::ProjectLayout {
                path: self.nodes_dir.clone(),
            })?;

            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|err| Error::io(&self.nodes_dir, err))?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(hostname) = name.strip_suffix(".json") {
                    names.push(hostname.to_string());
                }
            }
            names.sort();
            self.known = Some(names);
        }
        Ok(self.known.as_deref().unwrap_or_default())
    }

    /// Resolve a possibly abbreviated node name to its unique hostname.
    ///
    /// An exact match wins outright; otherwise the name is treated as a
    /// dot-separated prefix. Zero prefix matches is [`Error::NoSuchNode`];
    /// two or more is [`Error::AmbiguousNode`] naming every candidate, so
    /// the caller can disambiguate instead of this code guessing.
    pub fn resolve(&mut self, name: &str) -> Result<String> {
        let known = self.known_nodes()?;
        if known.iter().any(|n| n == name) {
            return Ok(name.to_string());
        }

        let prefix = format!("{name}.");
        let matches: Vec<String> = known
            .iter()
            .filter(|n| n.starts_with(&prefix))
            .cloned()
            .collect();

        match matches.len() {
            1 => Ok(matches.into_iter().next().unwrap()),
            0 => Err(Error::NoSuchNode {
                name: name.to_string(),
            }),
            _ => Err(Error::AmbiguousNode {
                name: name.to_string(),
                matches,
            }),
        }
    }

    /// Resolve every name before anything else happens.
    ///
    /// A single failure aborts the whole batch with no side effects.
    pub fn resolve_all(&mut self, names: &[String]) -> Result<Vec<String>> {
        names.iter().map(|name| self.resolve(name)).collect()
    }

    /// The cached [`Node`] for a fully-resolved hostname, created on first
    /// reference.
    pub fn node(&mut self, hostname: &str) -> &mut Node {
        self.nodes
            .entry(hostname.to_string())
            .or_insert_with(|| Node::new(hostname))
    }

    /// Resolve a name and return its cached node.
    pub fn find(&mut self, name: &str) -> Result<&mut Node> {
        let hostname = self.resolve(name)?;
        Ok(self.node(&hostname))
    }
}
