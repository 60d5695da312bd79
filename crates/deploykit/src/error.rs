//! Error types for deployment operations.
//!
//! This module provides the error taxonomy for everything deploykit does.
//! Errors are categorized so callers can tell pre-check failures (no remote
//! side effects yet) apart from failures that interrupted a running batch.

use std::io;
use std::path::PathBuf;

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of deployment errors.
///
/// Categories describe at which stage an error can occur, which determines
/// what state the batch was left in when it surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Node-name resolution failure. Raised during batch validation.
    Resolution,
    /// Install policy or operator declined an installation.
    Policy,
    /// A remote command or the transport underneath it failed.
    Remote,
    /// A local filesystem or archive operation failed.
    Local,
}

impl ErrorCategory {
    /// Whether errors of this category are raised before any remote side
    /// effect occurs.
    #[must_use]
    pub fn is_precheck(&self) -> bool {
        matches!(self, Self::Resolution)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Resolution => "Unknown or ambiguous node name",
            Self::Policy => "Installation declined",
            Self::Remote => "Remote execution failure",
            Self::Local => "Local file operation failure",
        }
    }
}

/// Errors that can occur while deploying configuration to nodes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The given name matches no known node.
    #[error("can't find node named '{name}'")]
    NoSuchNode {
        /// The name as supplied by the caller.
        name: String,
    },

    /// The given abbreviation matches more than one known node.
    #[error("can't find unique node named '{name}', matches: {}", .matches.join(", "))]
    AmbiguousNode {
        /// The abbreviation as supplied by the caller.
        name: String,
        /// Every known node the abbreviation matched.
        matches: Vec<String>,
    },

    /// chef-solo is missing and policy or the operator declined to install it.
    #[error("chef-solo isn't installed on node '{node}' and installation was declined")]
    NotInstalling {
        /// The node that is missing chef-solo.
        node: String,
    },

    /// A remote command failed, either at the transport layer or by exiting
    /// with a failure status.
    #[error("execution failed on '{node}': {cause}")]
    Execution {
        /// The node the command ran on.
        node: String,
        /// The literal command text.
        command: String,
        /// Whether output streaming was requested for this command.
        streamed: bool,
        /// Human-readable underlying cause.
        cause: String,
    },

    /// Connecting or authenticating to a host failed.
    #[error("ssh error on '{host}': {message}")]
    Transport {
        /// The host being connected to.
        host: String,
        /// Error message from the transport.
        message: String,
    },

    /// The interactive install prompt could not be read.
    #[error("install prompt failed: {0}")]
    Prompt(String),

    /// A required project directory is missing.
    #[error("missing project directory: {path}")]
    ProjectLayout {
        /// The directory that was expected to exist.
        path: PathBuf,
    },

    /// IO error during local file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Building the upload archive failed.
    #[error("archive creation failed: {0}")]
    Archive(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a transport error.
    pub fn transport(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            host: host.into(),
            message: message.into(),
        }
    }

    /// The node this error is about, if any.
    ///
    /// Callers use this to render the conventional `! <node>: <message>`
    /// failure line.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::NoSuchNode { name } | Self::AmbiguousNode { name, .. } => Some(name),
            Self::NotInstalling { node } | Self::Execution { node, .. } => Some(node),
            Self::Transport { host, .. } => Some(host),
            Self::Prompt(_) | Self::ProjectLayout { .. } | Self::Io { .. } | Self::Archive(_) => {
                None
            }
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoSuchNode { .. } | Self::AmbiguousNode { .. } => ErrorCategory::Resolution,
            Self::NotInstalling { .. } | Self::Prompt(_) => ErrorCategory::Policy,
            Self::Execution { .. } | Self::Transport { .. } => ErrorCategory::Remote,
            Self::ProjectLayout { .. } | Self::Io { .. } | Self::Archive(_) => ErrorCategory::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_such_node_display() {
        let err = Error::NoSuchNode {
            name: "giovanni".to_string(),
        };
        assert_eq!(format!("{err}"), "can't find node named 'giovanni'");
    }

    #[test]
    fn test_ambiguous_node_display_lists_matches() {
        let err = Error::AmbiguousNode {
            name: "giovanni".to_string(),
            matches: vec![
                "giovanni.bellini.it".to_string(),
                "giovanni.boldini.it".to_string(),
            ],
        };
        let display = format!("{err}");
        assert!(display.contains("giovanni.bellini.it"));
        assert!(display.contains("giovanni.boldini.it"));
    }

    #[test]
    fn test_execution_carries_context() {
        let err = Error::Execution {
            node: "web1.example.com".to_string(),
            command: "cmd /C mkdir c:\\chef".to_string(),
            streamed: false,
            cause: "exited with failure status".to_string(),
        };
        match &err {
            Error::Execution {
                node,
                command,
                streamed,
                ..
            } => {
                assert_eq!(node, "web1.example.com");
                assert!(command.contains("mkdir"));
                assert!(!streamed);
            }
            _ => panic!("expected Error::Execution"),
        }
        assert_eq!(err.node(), Some("web1.example.com"));
    }

    #[test]
    fn test_resolution_errors_are_precheck() {
        let err = Error::NoSuchNode {
            name: "x".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Resolution);
        assert!(err.category().is_precheck());

        let err = Error::AmbiguousNode {
            name: "a".to_string(),
            matches: vec!["a.b.c".to_string(), "a.d.c".to_string()],
        };
        assert!(err.category().is_precheck());
    }

    #[test]
    fn test_remote_errors_are_not_precheck() {
        let err = Error::transport("web1.example.com", "connection refused");
        assert_eq!(err.category(), ErrorCategory::Remote);
        assert!(!err.category().is_precheck());
    }

    #[test]
    fn test_not_installing_category() {
        let err = Error::NotInstalling {
            node: "web1.example.com".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Policy);
        assert_eq!(err.node(), Some("web1.example.com"));
    }

    #[test]
    fn test_io_constructor() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/some/path", io_err);
        match err {
            Error::Io { path, .. } => assert_eq!(path, PathBuf::from("/some/path")),
            _ => panic!("expected Error::Io"),
        }
    }

    #[test]
    fn test_local_errors_have_no_node() {
        let err = Error::Archive("tar failed".to_string());
        assert_eq!(err.node(), None);
        assert_eq!(err.category(), ErrorCategory::Local);
    }

    #[test]
    fn test_category_description() {
        assert!(!ErrorCategory::Resolution.description().is_empty());
        assert!(!ErrorCategory::Policy.description().is_empty());
        assert!(!ErrorCategory::Remote.description().is_empty());
        assert!(!ErrorCategory::Local.description().is_empty());
    }
}
