//! Core types for deployment configuration.
//!
//! This module contains the configuration struct threaded through every
//! component for one batch, plus the small value types it is built from.

use std::fmt;
use std::path::{Path, PathBuf};

/// Amount of operator-visible detail to produce.
///
/// Also forwarded to chef-solo: a verbose batch runs the remote apply with
/// `-l debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Important messages only.
    Quiet,
    /// Normal progress output.
    #[default]
    Normal,
    /// Detailed output, including every remote command issued.
    Verbose,
}

impl Verbosity {
    /// Whether detailed output was requested.
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        matches!(self, Self::Verbose)
    }
}

/// What to do when chef-solo is missing from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallPolicy {
    /// Install without asking.
    Always,
    /// Never install; fail the node instead.
    Never,
    /// Ask the operator through the configured [`Prompter`].
    ///
    /// [`Prompter`]: crate::prompt::Prompter
    #[default]
    Ask,
}

/// Description of a node's remote platform.
///
/// Currently every node reports as Windows Server; platform probing is a
/// known simplification carried over from the tool this replaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    /// Distributor name, e.g. "windows_server".
    pub distributor: String,
    /// Release codename, empty when the distributor has none.
    pub codename: String,
    /// Release number as a string.
    pub release: String,
    /// Release number as a number, 0.0 when unknown.
    pub version: f64,
}

impl Platform {
    /// The Windows Server platform descriptor.
    #[must_use]
    pub fn windows_server() -> Self {
        Self {
            distributor: "windows_server".to_string(),
            codename: String::new(),
            release: String::new(),
            version: 0.0,
        }
    }

    /// Whether this platform is a Windows variant.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.distributor.starts_with("windows")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.distributor)
    }
}

/// Immutable configuration for one deployment batch.
///
/// Constructed once by the caller and threaded through the resolver, bundle
/// manager and every node. Remote path templates derive from this via
/// [`RemoteLayout`].
///
/// # Example
///
/// ```
/// use deploykit::DeployConfig;
///
/// let config = DeployConfig::new(".")
///     .user("deployer")
///     .ssh_key("/home/me/.ssh/id_ed25519")
///     .verbose(true);
///
/// assert_eq!(config.user, "deployer");
/// assert_eq!(config.staging_dir(), "c:\\users\\deployer");
/// ```
///
/// [`RemoteLayout`]: crate::layout::RemoteLayout
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Root of the local project (contains `nodes/`, `roles/`, `cookbooks/`,
    /// `site-cookbooks/`).
    pub project_dir: PathBuf,
    /// Remote login user.
    pub user: String,
    /// Password authentication, used when no key is configured.
    pub password: Option<String>,
    /// Path to an ssh private key, preferred over password auth.
    pub ssh_key: Option<PathBuf>,
    /// Remote directory uploads land in before being moved into place.
    /// Defaults to `c:\users\<user>`.
    pub upload_dir: Option<String>,
    /// Local directory holding the `tar` and `wget` helper executables.
    /// Defaults to `<project_dir>/tools`.
    pub tools_dir: Option<PathBuf>,
    /// URL the chef installer MSI is fetched from on the node.
    pub installer_url: String,
    /// What to do when chef-solo is missing.
    pub install_policy: InstallPolicy,
    /// Output detail level.
    pub verbosity: Verbosity,
}

/// Default source for the chef-solo installer MSI.
pub const DEFAULT_INSTALLER_URL: &str = "http://www.opscode.com/chef/install.msi";

impl DeployConfig {
    /// Create a configuration for the project at `project_dir` with defaults:
    /// `Administrator` login, agent authentication, interactive install
    /// policy, normal verbosity.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            user: "Administrator".to_string(),
            password: None,
            ssh_key: None,
            upload_dir: None,
            tools_dir: None,
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            install_policy: InstallPolicy::default(),
            verbosity: Verbosity::default(),
        }
    }

    /// Set the remote login user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set password authentication.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the ssh private key path. Takes priority over a password.
    #[must_use]
    pub fn ssh_key(mut self, key: impl Into<PathBuf>) -> Self {
        self.ssh_key = Some(key.into());
        self
    }

    /// Override the remote upload landing directory.
    #[must_use]
    pub fn upload_dir(mut self, dir: impl Into<String>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// Override the local helper-executable directory.
    #[must_use]
    pub fn tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = Some(dir.into());
        self
    }

    /// Override the installer MSI URL.
    #[must_use]
    pub fn installer_url(mut self, url: impl Into<String>) -> Self {
        self.installer_url = url.into();
        self
    }

    /// Set the install policy.
    #[must_use]
    pub fn install_policy(mut self, policy: InstallPolicy) -> Self {
        self.install_policy = policy;
        self
    }

    /// Set verbose output on or off.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbosity = if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        self
    }

    /// Set the verbosity level directly.
    #[must_use]
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    // =========================================================================
    // Derived paths
    // =========================================================================

    /// The local `nodes/` descriptor directory.
    #[must_use]
    pub fn nodes_dir(&self) -> PathBuf {
        self.project_dir.join("nodes")
    }

    /// The local `cookbooks/` directory.
    #[must_use]
    pub fn cookbooks_dir(&self) -> PathBuf {
        self.project_dir.join("cookbooks")
    }

    /// The local `site-cookbooks/` directory.
    #[must_use]
    pub fn site_cookbooks_dir(&self) -> PathBuf {
        self.project_dir.join("site-cookbooks")
    }

    /// The local `roles/` directory.
    #[must_use]
    pub fn roles_dir(&self) -> PathBuf {
        self.project_dir.join("roles")
    }

    /// The remote directory uploads land in.
    #[must_use]
    pub fn staging_dir(&self) -> String {
        match &self.upload_dir {
            Some(dir) => dir.clone(),
            None => format!("c:\\users\\{}", self.user.to_lowercase()),
        }
    }

    /// Local path of the `tar.exe` helper uploaded before extraction.
    #[must_use]
    pub fn tar_helper(&self) -> PathBuf {
        self.helper_root().join("tar").join("tar.exe")
    }

    /// Local path of the `wget.exe` helper uploaded before installation.
    #[must_use]
    pub fn wget_helper(&self) -> PathBuf {
        self.helper_root().join("wget").join("wget.exe")
    }

    fn helper_root(&self) -> PathBuf {
        match &self.tools_dir {
            Some(dir) => dir.clone(),
            None => self.project_dir.join("tools"),
        }
    }

    /// Local path of a node's descriptor file, `nodes/<hostname>.json`.
    #[must_use]
    pub fn node_descriptor(&self, hostname: &str) -> PathBuf {
        self.nodes_dir().join(format!("{hostname}.json"))
    }

    /// The project directory as a path.
    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DeployConfig::new("/tmp/project");
        assert_eq!(config.user, "Administrator");
        assert!(config.password.is_none());
        assert!(config.ssh_key.is_none());
        assert_eq!(config.install_policy, InstallPolicy::Ask);
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert_eq!(config.installer_url, DEFAULT_INSTALLER_URL);
    }

    #[test]
    fn test_config_builder() {
        let config = DeployConfig::new("/tmp/project")
            .user("deployer")
            .password("hunter2")
            .ssh_key("/keys/id_ed25519")
            .upload_dir("d:\\staging")
            .install_policy(InstallPolicy::Always)
            .verbose(true);

        assert_eq!(config.user, "deployer");
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert_eq!(config.ssh_key, Some(PathBuf::from("/keys/id_ed25519")));
        assert_eq!(config.staging_dir(), "d:\\staging");
        assert_eq!(config.install_policy, InstallPolicy::Always);
        assert!(config.verbosity.is_verbose());
    }

    #[test]
    fn test_staging_dir_derives_from_user() {
        let config = DeployConfig::new(".").user("Deployer");
        assert_eq!(config.staging_dir(), "c:\\users\\deployer");
    }

    #[test]
    fn test_derived_local_paths() {
        let config = DeployConfig::new("/srv/project");
        assert_eq!(config.nodes_dir(), PathBuf::from("/srv/project/nodes"));
        assert_eq!(
            config.site_cookbooks_dir(),
            PathBuf::from("/srv/project/site-cookbooks")
        );
        assert_eq!(
            config.node_descriptor("web1.example.com"),
            PathBuf::from("/srv/project/nodes/web1.example.com.json")
        );
    }

    #[test]
    fn test_helper_paths() {
        let config = DeployConfig::new("/srv/project");
        assert_eq!(
            config.tar_helper(),
            PathBuf::from("/srv/project/tools/tar/tar.exe")
        );

        let custom = DeployConfig::new("/srv/project").tools_dir("/opt/helpers");
        assert_eq!(
            custom.wget_helper(),
            PathBuf::from("/opt/helpers/wget/wget.exe")
        );
    }

    #[test]
    fn test_platform_windows_server() {
        let platform = Platform::windows_server();
        assert_eq!(platform.distributor, "windows_server");
        assert!(platform.is_windows());
        assert_eq!(format!("{platform}"), "windows_server");
    }

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
        assert!(!Verbosity::Quiet.is_verbose());
        assert!(Verbosity::Verbose.is_verbose());
    }
}
