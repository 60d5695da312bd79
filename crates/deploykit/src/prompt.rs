//! Install-decision prompting.
//!
//! When the install policy is [`InstallPolicy::Ask`], the decision goes
//! through a [`Prompter`] rather than straight to a terminal, so the core
//! stays testable and embedders can supply their own decision surface.
//!
//! [`InstallPolicy::Ask`]: crate::types::InstallPolicy::Ask

use crate::error::{Error, Result};

/// Decides whether a missing chef-solo should be installed on a node.
pub trait Prompter: Send + Sync {
    /// Ask whether to install on `node`. `Ok(false)` declines.
    fn confirm_install(&self, node: &str) -> Result<bool>;
}

/// Interactive prompter for terminal use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn confirm_install(&self, node: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(format!(
                "chef-solo not found on '{node}'. Install it and its dependencies?"
            ))
            .default(true)
            .interact()
            .map_err(|err| Error::Prompt(err.to_string()))
    }
}

/// Prompter with a fixed answer, for tests and non-interactive embedders.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrompter {
    answer: bool,
}

impl StaticPrompter {
    /// Always answer yes.
    #[must_use]
    pub const fn yes() -> Self {
        Self { answer: true }
    }

    /// Always answer no.
    #[must_use]
    pub const fn no() -> Self {
        Self { answer: false }
    }
}

impl Prompter for StaticPrompter {
    fn confirm_install(&self, _node: &str) -> Result<bool> {
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_prompter_answers() {
        assert!(StaticPrompter::yes().confirm_install("a.b.c").unwrap());
        assert!(!StaticPrompter::no().confirm_install("a.b.c").unwrap());
    }
}
