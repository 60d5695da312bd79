//! # deploykit
//!
//! Library for deploying chef-solo configuration to remote Windows hosts.
//!
//! This crate provides functionality for:
//! - Resolving abbreviated node names against a project's `nodes/` directory
//! - Building the shared upload bundle (cookbooks, roles, generated control
//!   files) with a guaranteed-cleanup lifecycle
//! - Driving each node through upload, prerequisite install and chef-solo
//!   apply over a reused ssh session
//!
//! ## Example
//!
//! ```no_run
//! use deploykit::{Client, DeployConfig, InstallPolicy};
//!
//! // Configure a batch for the project in the current directory.
//! let config = DeployConfig::new(".")
//!     .user("Administrator")
//!     .password("secret")
//!     .install_policy(InstallPolicy::Always);
//!
//! let mut client = Client::new(config);
//!
//! // Upload and apply on both nodes, in order.
//! client.deploy(&["web1".to_string(), "web2.example.com".to_string()])
//!     .expect("deployment failed");
//! ```
//!
//! ## Failure model
//!
//! Node names are validated up front: a batch containing one unknown or
//! ambiguous name performs no remote action at all. Once remote work has
//! started, the first failing node aborts the rest of the batch, and the
//! shared bundle's staged artifacts are removed on every exit path. There
//! are no automatic retries anywhere.
//!
//! ## Testing
//!
//! Everything remote goes through the [`transport::Transport`] trait; use
//! [`transport::MockTransport`] and [`prompt::StaticPrompter`] to exercise
//! batches without a network or a terminal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod error;
pub mod layout;
pub mod node;
pub mod prompt;
pub mod resolver;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use layout::RemoteLayout;
pub use types::{DeployConfig, InstallPolicy, Platform, Verbosity};

use node::NodeContext;
use prompt::{ConsolePrompter, Prompter};
use resolver::NodeRegistry;
use transport::ssh::SshTransport;
use transport::{Auth, Transport};

/// High-level client for deployment batches.
///
/// The client owns the batch configuration, the node registry and the
/// channels to the outside world. One client drives one orchestrator
/// invocation; nodes and the known-nodes cache live as long as it does.
pub struct Client {
    config: DeployConfig,
    layout: RemoteLayout,
    transport: Box<dyn Transport>,
    prompter: Box<dyn Prompter>,
    registry: NodeRegistry,
}

impl Client {
    /// Create a client with the production ssh transport and an
    /// interactive install prompt.
    #[must_use]
    pub fn new(config: DeployConfig) -> Self {
        Self::with_transport(config, Box::new(SshTransport::new()), Box::new(ConsolePrompter))
    }

    /// Create a client with custom channels (useful for testing).
    #[must_use]
    pub fn with_transport(
        config: DeployConfig,
        transport: Box<dyn Transport>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        let layout = RemoteLayout::new(&config);
        let registry = NodeRegistry::new(config.nodes_dir());
        Self {
            config,
            layout,
            transport,
            prompter,
            registry,
        }
    }

    /// The known node hostnames, sorted.
    pub fn known_nodes(&mut self) -> Result<Vec<String>> {
        Ok(self.registry.known_nodes()?.to_vec())
    }

    /// Upload configuration to the nodes and apply it, in the order given.
    ///
    /// All names are resolved before any remote action; the shared bundle
    /// exists for exactly the duration of the node loop.
    pub fn deploy(&mut self, names: &[String]) -> Result<()> {
        let targets = self.registry.resolve_all(names)?;
        let auth = Auth::from_config(&self.config);
        let ctx = NodeContext {
            config: &self.config,
            layout: &self.layout,
            transport: self.transport.as_ref(),
            prompter: self.prompter.as_ref(),
            auth: &auth,
        };
        bundle::with_prepared(&self.config, &self.layout, |bundle| {
            for hostname in &targets {
                self.registry.node(hostname).deploy(&ctx, bundle)?;
            }
            Ok(())
        })
    }

    /// Upload configuration to the nodes without applying it.
    pub fn upload(&mut self, names: &[String]) -> Result<()> {
        let targets = self.registry.resolve_all(names)?;
        let auth = Auth::from_config(&self.config);
        let ctx = NodeContext {
            config: &self.config,
            layout: &self.layout,
            transport: self.transport.as_ref(),
            prompter: self.prompter.as_ref(),
            auth: &auth,
        };
        bundle::with_prepared(&self.config, &self.layout, |bundle| {
            for hostname in &targets {
                self.registry.node(hostname).upload(&ctx, bundle)?;
            }
            Ok(())
        })
    }

    /// Apply already-uploaded configuration on the nodes.
    ///
    /// No bundle is needed; nothing is staged locally.
    pub fn apply(&mut self, names: &[String]) -> Result<()> {
        let targets = self.registry.resolve_all(names)?;
        let auth = Auth::from_config(&self.config);
        let ctx = NodeContext {
            config: &self.config,
            layout: &self.layout,
            transport: self.transport.as_ref(),
            prompter: self.prompter.as_ref(),
            auth: &auth,
        };
        for hostname in &targets {
            self.registry.node(hostname).apply(&ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ARCHIVE_NAME;
    use crate::prompt::StaticPrompter;
    use crate::transport::MockTransport;
    use std::fs;
    use std::path::Path;

    fn project(nodes: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["nodes", "roles", "cookbooks", "site-cookbooks"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
        }
        for node in nodes {
            fs::write(dir.path().join("nodes").join(format!("{node}.json")), "{}").unwrap();
        }
        dir
    }

    fn client(dir: &Path, transport: &MockTransport) -> Client {
        Client::with_transport(
            DeployConfig::new(dir),
            Box::new(transport.clone()),
            Box::new(StaticPrompter::yes()),
        )
    }

    #[test]
    fn test_known_nodes() {
        let dir = project(&["b.example.com", "a.example.com"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        assert_eq!(
            client.known_nodes().unwrap(),
            vec!["a.example.com".to_string(), "b.example.com".to_string()]
        );
    }

    #[test]
    fn test_deploy_unknown_node_creates_no_bundle() {
        let dir = project(&["a.b.c"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        let result = client.deploy(&["x".to_string()]);
        assert!(matches!(result, Err(Error::NoSuchNode { .. })));
        assert_eq!(transport.remote_actions(), 0);
        assert!(!dir.path().join(ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_one_bad_name_aborts_whole_batch_before_any_remote_action() {
        let dir = project(&["a.b.c", "a.d.c"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        let names = vec!["a.b".to_string(), "nonesuch".to_string()];
        assert!(client.deploy(&names).is_err());
        assert_eq!(transport.remote_actions(), 0);
        assert!(transport.connections().is_empty());
    }

    #[test]
    fn test_ambiguous_name_aborts_batch() {
        let dir = project(&["a.b.c", "a.d.c"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        match client.deploy(&["a".to_string()]) {
            Err(Error::AmbiguousNode { matches, .. }) => {
                assert_eq!(matches, vec!["a.b.c".to_string(), "a.d.c".to_string()]);
            }
            other => panic!("expected AmbiguousNode, got {other:?}"),
        }
        assert_eq!(transport.remote_actions(), 0);
    }

    #[test]
    fn test_deploy_processes_nodes_in_supplied_order() {
        let dir = project(&["a.b.c", "a.d.c"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        client
            .deploy(&["a.d".to_string(), "a.b".to_string()])
            .unwrap();

        assert_eq!(
            transport.connections(),
            vec!["a.d.c".to_string(), "a.b.c".to_string()]
        );
        // The batch is sequential: every command on the first node precedes
        // every command on the second.
        let hosts: Vec<String> = transport.commands_run().into_iter().map(|(h, _)| h).collect();
        let first_b = hosts.iter().position(|h| h == "a.b.c").unwrap();
        assert!(hosts[..first_b].iter().all(|h| h == "a.d.c"));
    }

    #[test]
    fn test_deploy_cleans_bundle_after_batch() {
        let dir = project(&["a.b.c"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        client.deploy(&["a.b.c".to_string()]).unwrap();
        assert!(!dir.path().join(ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_mid_batch_failure_aborts_remaining_nodes_and_cleans_bundle() {
        let dir = project(&["a.b.c", "a.d.c"]);
        let transport = MockTransport::new();
        transport.refuse_host("a.b.c");
        let mut client = client(dir.path(), &transport);

        let result = client.deploy(&["a.b".to_string(), "a.d".to_string()]);
        let err = result.unwrap_err();
        assert_eq!(err.node(), Some("a.b.c"));
        assert_eq!(err.category(), ErrorCategory::Remote);
        // The second node was never touched.
        assert!(transport.connections().is_empty());
        assert!(
            transport
                .commands_run()
                .iter()
                .all(|(host, _)| host != "a.d.c")
        );
        // The bundle is still cleaned up.
        assert!(!dir.path().join(ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_upload_does_not_apply() {
        let dir = project(&["a.b.c"]);
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        client.upload(&["a.b".to_string()]).unwrap();

        assert!(
            transport
                .commands_run()
                .iter()
                .all(|(_, c)| !c.contains("chef-solo\" -c"))
        );
    }

    #[test]
    fn test_apply_needs_no_bundle() {
        let dir = project(&["a.b.c"]);
        // Remove the content dirs: apply must not touch them.
        fs::remove_dir(dir.path().join("cookbooks")).unwrap();
        let transport = MockTransport::new();
        let mut client = client(dir.path(), &transport);

        client.apply(&["a.b.c".to_string()]).unwrap();

        assert!(!dir.path().join(ARCHIVE_NAME).exists());
        assert!(
            transport
                .commands_run()
                .iter()
                .any(|(_, c)| c.contains("chef-solo\" -c"))
        );
    }

    #[test]
    fn test_install_policy_never_fails_node() {
        let dir = project(&["a.b.c"]);
        let transport = MockTransport::new();
        transport.deny_matching("if exist");
        let mut client = Client::with_transport(
            DeployConfig::new(dir.path()).install_policy(InstallPolicy::Never),
            Box::new(transport.clone()),
            Box::new(StaticPrompter::yes()),
        );

        let result = client.apply(&["a.b.c".to_string()]);
        assert!(matches!(result, Err(Error::NotInstalling { .. })));
        // No install command ever ran.
        assert!(
            transport
                .commands_run()
                .iter()
                .all(|(_, c)| !c.contains("msiexec"))
        );
    }
}
