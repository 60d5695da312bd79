//! Remote filesystem layout and generated control files.
//!
//! Every remote path the deployment touches, and the contents of the two
//! generated control files, derive from one [`RemoteLayout`] built per batch
//! from the [`DeployConfig`]. Nothing node-specific goes into the layout:
//! one rendering is valid for every node in a batch.

use crate::types::DeployConfig;

/// Remote path and control-file templates for one batch.
///
/// Paths use backslashes because every target is a Windows host; the
/// `solo.rb` contents use forward slashes because chef reads them as Ruby
/// strings and accepts either.
#[derive(Debug, Clone)]
pub struct RemoteLayout {
    /// Remote directory uploads land in before being moved into place.
    pub upload_dir: String,
    /// Root of the chef configuration on the node.
    pub chef_root: String,
    /// Final path of the rendered chef-solo settings file.
    pub solo_rb: String,
    /// Final path of the node's descriptor.
    pub node_json: String,
    /// Directory the deployed payload (cookbooks, roles) lives in.
    pub payload_dir: String,
    /// Staging directory the archive is extracted into before the payload
    /// swap.
    pub stage_dir: String,
}

/// Base name of the shared upload archive.
pub const ARCHIVE_NAME: &str = "skiff.tgz";

/// Base name the settings file is staged under inside the archive. Renamed
/// to `solo.rb` once relocated on the node.
pub const STAGED_SOLO_RB: &str = "solo.rb.tmp";

/// Base name of the generated apply wrapper script.
pub const APPLY_SCRIPT: &str = "chef-solo-apply.bat";

/// Remote path of the chef-solo executable once installed.
pub const CHEF_SOLO_EXE: &str = "c:\\opscode\\chef\\bin\\chef-solo";

/// Remote path of the chef-client executable, used to verify an install.
pub const CHEF_CLIENT_EXE: &str = "c:\\opscode\\chef\\bin\\chef-client";

impl RemoteLayout {
    /// Build the layout for one batch.
    #[must_use]
    pub fn new(config: &DeployConfig) -> Self {
        let chef_root = "c:\\chef".to_string();
        Self {
            upload_dir: config.staging_dir(),
            solo_rb: format!("{chef_root}\\solo.rb"),
            node_json: format!("{chef_root}\\node.json"),
            payload_dir: format!("{chef_root}\\skiff"),
            stage_dir: format!("{chef_root}\\skiff.stage"),
            chef_root,
        }
    }

    /// Remote path the uploaded archive is moved to before extraction.
    #[must_use]
    pub fn remote_archive(&self) -> String {
        format!("{}\\{ARCHIVE_NAME}", self.chef_root)
    }

    /// Remote path of the uploaded tar helper.
    #[must_use]
    pub fn remote_tar(&self) -> String {
        format!("{}\\tar.exe", self.chef_root)
    }

    /// Remote path of the apply wrapper script.
    #[must_use]
    pub fn apply_script(&self) -> String {
        format!("{}\\{APPLY_SCRIPT}", self.chef_root)
    }

    /// Cache directory handed to chef-solo, created inside the staged
    /// payload so it travels with the swap.
    #[must_use]
    pub fn stage_cache(&self) -> String {
        format!("{}\\cache", self.stage_dir)
    }

    /// Contents of the generated `solo.rb`.
    ///
    /// Parameterized only by the payload's own install paths, so the same
    /// rendering serves every node in the batch.
    #[must_use]
    pub fn solo_rb_content(&self) -> String {
        let payload = self.payload_dir.replace('\\', "/");
        format!(
            "file_cache_path \"{payload}/cache\"\n\
             cookbook_path [\"{payload}/cookbooks\", \"{payload}/site-cookbooks\"]\n\
             role_path \"{payload}/roles\"\n"
        )
    }

    /// Contents of the generated apply wrapper script.
    #[must_use]
    pub fn apply_script_content(&self) -> String {
        format!(
            "@echo off\r\n\"{CHEF_SOLO_EXE}\" -c \"{}\" -j \"{}\" %*\r\n",
            self.solo_rb, self.node_json
        )
    }

    /// The chef-solo invocation for an apply run.
    #[must_use]
    pub fn apply_command(&self, verbose: bool) -> String {
        let mut command = format!(
            "\"{CHEF_SOLO_EXE}\" -c \"{}\" -j \"{}\"",
            self.solo_rb, self.node_json
        );
        if verbose {
            command.push_str(" -l debug");
        }
        command
    }
}
