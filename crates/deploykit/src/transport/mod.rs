//! Remote execution and file-transfer channels.
//!
//! This module defines the [`Transport`] and [`Session`] traits the rest of
//! the crate runs commands and copies files through. The production
//! implementation is [`ssh::SshTransport`]; tests use [`MockTransport`] to
//! script remote behavior without a network.
//!
//! # Testing
//!
//! ```
//! use deploykit::transport::{Auth, MockTransport, Session, Transport};
//!
//! let mock = MockTransport::new();
//! mock.deny_matching("if exist");
//!
//! let auth = Auth::agent("Administrator");
//! let mut session = mock.connect("web1.example.com", &auth).unwrap();
//! let result = session.run("if exist c:\\x ( exit 0 ) else ( exit 1 )", None).unwrap();
//! assert!(!result.success);
//! ```

pub mod ssh;

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Authentication material for opening a session.
///
/// Exactly one method applies, by priority: private key file, then
/// username + password, then the ssh agent with username only.
#[derive(Debug, Clone)]
pub struct Auth {
    /// Login user.
    pub user: String,
    /// Password, used when no key is set.
    pub password: Option<String>,
    /// Private key path, preferred over a password.
    pub key: Option<PathBuf>,
}

impl Auth {
    /// Key-file authentication.
    #[must_use]
    pub fn key(user: impl Into<String>, key: impl Into<PathBuf>) -> Self {
        Self {
            user: user.into(),
            password: None,
            key: Some(key.into()),
        }
    }

    /// Password authentication.
    #[must_use]
    pub fn password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: Some(password.into()),
            key: None,
        }
    }

    /// Agent (username-only) authentication.
    #[must_use]
    pub fn agent(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: None,
            key: None,
        }
    }

    /// Authentication material from batch configuration, selecting by
    /// priority: key file, then password, then agent.
    #[must_use]
    pub fn from_config(config: &crate::types::DeployConfig) -> Self {
        if let Some(key) = &config.ssh_key {
            Self::key(config.user.clone(), key.clone())
        } else if let Some(password) = &config.password {
            Self::password(config.user.clone(), password.clone())
        } else {
            Self::agent(config.user.clone())
        }
    }

    /// Short description of the method that will be used, for log lines.
    #[must_use]
    pub fn method(&self) -> &'static str {
        if self.key.is_some() {
            "ssh key"
        } else if self.password.is_some() {
            "password"
        } else {
            "agent"
        }
    }
}

/// Outcome of one remote command.
///
/// `output` is stdout and stderr multiplexed in arrival order; `success` is
/// the command's exit status. A failing command is a normal result at this
/// layer — only transport trouble is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Combined command output.
    pub output: String,
    /// Whether the command exited successfully.
    pub success: bool,
}

impl ExecutionResult {
    /// A successful result with the given output.
    #[must_use]
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    /// A failed result with the given output.
    #[must_use]
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
        }
    }
}

/// One authenticated connection to one host.
///
/// A session is opened once per node and reused for every command issued to
/// that node.
pub trait Session {
    /// Run a shell command, returning its combined output and exit status.
    ///
    /// When `on_line` is given, each output line is handed to it as it
    /// arrives; the callback is scoped to this call and cannot observe any
    /// other command's output.
    fn run(
        &mut self,
        command: &str,
        on_line: Option<&mut dyn FnMut(&str)>,
    ) -> Result<ExecutionResult>;

    /// Copy a single local file to `remote` (a path interpreted by the
    /// remote side).
    fn send_file(&mut self, local: &Path, remote: &str) -> Result<()>;
}

/// Connection factory.
///
/// This abstraction keeps the node state machine independent of the wire
/// protocol and makes everything remote testable.
pub trait Transport: Send + Sync {
    /// Open an authenticated session to `host`.
    fn connect(&self, host: &str, auth: &Auth) -> Result<Box<dyn Session>>;
}

// ============================================================================
// Mock transport
// ============================================================================

/// Scripted in-memory transport for tests.
///
/// Records every connection, command and file transfer, and can be told to
/// refuse hosts, fail commands at the transport layer, or make commands
/// exit unsuccessfully.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    refused_hosts: Vec<String>,
    failures: Vec<(String, String)>,
    denials: Vec<String>,
    outputs: Vec<(String, String)>,
    connects: Vec<String>,
    commands: Vec<(String, String)>,
    uploads: Vec<(String, String)>,
}

impl MockTransport {
    /// Create a mock where every command succeeds with empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to `host` with a transport error.
    pub fn refuse_host(&self, host: impl Into<String>) {
        self.state.lock().unwrap().refused_hosts.push(host.into());
    }

    /// Fail any command containing `pattern` with a transport-level error.
    pub fn fail_matching(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((pattern.into(), message.into()));
    }

    /// Make any command containing `pattern` exit unsuccessfully.
    pub fn deny_matching(&self, pattern: impl Into<String>) {
        self.state.lock().unwrap().denials.push(pattern.into());
    }

    /// Set canned output for any command containing `pattern`.
    pub fn output_matching(&self, pattern: impl Into<String>, output: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .outputs
            .push((pattern.into(), output.into()));
    }

    /// Hosts that were connected to, in order.
    #[must_use]
    pub fn connections(&self) -> Vec<String> {
        self.state.lock().unwrap().connects.clone()
    }

    /// Every `(host, command)` pair run, in order.
    #[must_use]
    pub fn commands_run(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Every `(host, remote_path)` file transfer, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// Total count of remote actions (commands + uploads) across all hosts.
    #[must_use]
    pub fn remote_actions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.commands.len() + state.uploads.len()
    }
}

impl Transport for MockTransport {
    fn connect(&self, host: &str, _auth: &Auth) -> Result<Box<dyn Session>> {
        let mut state = self.state.lock().unwrap();
        if state.refused_hosts.iter().any(|h| h == host) {
            return Err(Error::transport(host, "connection refused"));
        }
        state.connects.push(host.to_string());
        Ok(Box::new(MockSession {
            host: host.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockSession {
    host: String,
    state: Arc<Mutex<MockState>>,
}

impl Session for MockSession {
    fn run(
        &mut self,
        command: &str,
        on_line: Option<&mut dyn FnMut(&str)>,
    ) -> Result<ExecutionResult> {
        let mut state = self.state.lock().unwrap();
        state
            .commands
            .push((self.host.clone(), command.to_string()));

        if let Some((_, message)) = state.failures.iter().find(|(p, _)| command.contains(p)) {
            return Err(Error::transport(&self.host, message.clone()));
        }

        let output = state
            .outputs
            .iter()
            .find(|(p, _)| command.contains(p))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        let success = !state.denials.iter().any(|p| command.contains(p));
        drop(state);

        if let Some(on_line) = on_line {
            for line in output.lines() {
                on_line(line);
            }
        }

        Ok(ExecutionResult { output, success })
    }

    fn send_file(&mut self, _local: &Path, remote: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.uploads.push((self.host.clone(), remote.to_string()));
        Ok(())
    }
}
