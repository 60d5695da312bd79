use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;

use crate::Context;
use crate::ui;

/// Create a new project directory with the expected subdirectories.
pub fn run(_ctx: &Context, name: &str) -> Result<()> {
    ui::info(&format!("Creating project in directory: {name}"));
    scaffold(Path::new(name))?;
    ui::success(&format!(
        "Project '{name}' ready. Add a node with 'skiff nodes add <hostname>'."
    ));
    Ok(())
}

fn scaffold(dir: &Path) -> Result<()> {
    for sub in ["nodes", "roles", "cookbooks", "site-cookbooks"] {
        let target = dir.join(sub);
        if !target.exists() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            ui::dim(&format!("{}/", target.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold_creates_project_layout() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("myproject");

        scaffold(&project).unwrap();

        for sub in ["nodes", "roles", "cookbooks", "site-cookbooks"] {
            assert!(project.join(sub).is_dir());
        }
    }

    #[test]
    fn test_scaffold_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("myproject");

        scaffold(&project).unwrap();
        scaffold(&project).unwrap();
        assert!(project.join("nodes").is_dir());
    }
}
