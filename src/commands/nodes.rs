use anyhow::{Result, bail};
use deploykit::DeployConfig;
use deploykit::resolver::NodeRegistry;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::cli::NodesCommand;
use crate::ui;

/// Skeleton written for a freshly added node.
#[derive(Serialize)]
struct NodeDescriptor {
    run_list: Vec<String>,
}

pub fn run(_ctx: &Context, cmd: NodesCommand) -> Result<()> {
    match cmd {
        NodesCommand::List => list(Path::new(".")),
        NodesCommand::Add { hostname } => add(Path::new("."), &hostname),
    }
}

/// List every node the project knows about.
fn list(project: &Path) -> Result<()> {
    let config = DeployConfig::new(project);
    let mut registry = NodeRegistry::new(config.nodes_dir());
    let nodes = registry.known_nodes()?;

    if nodes.is_empty() {
        ui::warn("No nodes defined yet. Add one with 'skiff nodes add <hostname>'.");
        return Ok(());
    }

    ui::header("Known nodes");
    for node in nodes {
        println!("  {node}");
    }
    Ok(())
}

/// Write a descriptor skeleton for `hostname`.
fn add(project: &Path, hostname: &str) -> Result<()> {
    let config = DeployConfig::new(project);
    let path = config.node_descriptor(hostname);
    if path.exists() {
        bail!("node '{}' already exists at {}", hostname, path.display());
    }

    fs::create_dir_all(config.nodes_dir())?;
    let descriptor = NodeDescriptor { run_list: vec![] };
    let mut contents = serde_json::to_string_pretty(&descriptor)?;
    contents.push('\n');
    fs::write(&path, contents)?;

    ui::success(&format!("Added node '{hostname}' at {}", path.display()));
    Ok(())
}
