//! Per-node deployment state machine.
//!
//! A [`Node`] is one remote host, driven through upload, install and apply.
//! The progression is `fresh → uploaded → installed → applied`, where the
//! install step is skipped (not re-run) when chef-solo is already present.
//! Each node owns one lazily opened session, reused for every command
//! issued to it; remote paths and command text come from the batch's
//! [`RemoteLayout`].

use crate::bundle::PreparedBundle;
use crate::error::{Error, Result};
use crate::layout::{
    APPLY_SCRIPT, ARCHIVE_NAME, CHEF_CLIENT_EXE, CHEF_SOLO_EXE, RemoteLayout, STAGED_SOLO_RB,
};
use crate::prompt::Prompter;
use crate::transport::{Auth, ExecutionResult, Session, Transport};
use crate::types::{DeployConfig, InstallPolicy, Platform};
use std::fmt;
use std::path::Path;

/// Shared collaborators for node operations within one batch.
pub struct NodeContext<'a> {
    /// Batch configuration.
    pub config: &'a DeployConfig,
    /// Remote path templates.
    pub layout: &'a RemoteLayout,
    /// Connection factory.
    pub transport: &'a dyn Transport,
    /// Install-decision surface.
    pub prompter: &'a dyn Prompter,
    /// Authentication material.
    pub auth: &'a Auth,
}

/// One remote host, tracked by fully-qualified name.
pub struct Node {
    name: String,
    session: Option<Box<dyn Session>>,
    platform: Option<Platform>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl Node {
    /// Create a node for a fully-qualified hostname.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session: None,
            platform: None,
        }
    }

    /// The node's fully-qualified hostname.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's platform descriptor, cached after the first call.
    ///
    /// Always reports Windows Server for now; real probing is a known
    /// simplification.
    pub fn platform(&mut self) -> &Platform {
        self.platform.get_or_insert_with(Platform::windows_server)
    }

    /// The cached session, connecting on first use.
    fn session(&mut self, ctx: &NodeContext<'_>) -> Result<&mut Box<dyn Session>> {
        if self.session.is_none() {
            log::info!(
                "* {}: connecting as '{}' ({})",
                self.name,
                ctx.auth.user,
                ctx.auth.method()
            );
            self.session = Some(ctx.transport.connect(&self.name, ctx.auth)?);
        }
        self.session
            .as_mut()
            .ok_or_else(|| Error::transport(&self.name, "session unavailable"))
    }

    /// Run a command on the node, wrapping any failure of the channel into
    /// one uniform error shape carrying node, command and streaming flag.
    ///
    /// A command that merely exits unsuccessfully is a normal result here;
    /// use [`Self::execute_checked`] when a failure status should abort.
    fn execute(&mut self, ctx: &NodeContext<'_>, command: &str, stream: bool) -> Result<ExecutionResult> {
        log::debug!("* {}: executing: {}", self.name, command);
        self.run_wrapped(ctx, command, stream)
            .map_err(|err| Error::Execution {
                node: self.name.clone(),
                command: command.to_string(),
                streamed: stream,
                cause: err.to_string(),
            })
    }

    fn run_wrapped(
        &mut self,
        ctx: &NodeContext<'_>,
        command: &str,
        stream: bool,
    ) -> Result<ExecutionResult> {
        // Multiplex stderr into the output stream on the remote side.
        let wrapped = format!("({command}) 2>&1");
        let session = self.session(ctx)?;
        if stream {
            // The hook only lives for this call, so it cannot leak into the
            // next command on the reused session.
            let mut hook = |line: &str| println!("{line}");
            session.run(&wrapped, Some(&mut hook))
        } else {
            session.run(&wrapped, None)
        }
    }

    /// Run a command and treat a failure exit status as an error.
    fn execute_checked(
        &mut self,
        ctx: &NodeContext<'_>,
        command: &str,
        stream: bool,
    ) -> Result<ExecutionResult> {
        let result = self.execute(ctx, command, stream)?;
        if result.success {
            Ok(result)
        } else {
            let output = result.output.trim();
            let cause = if output.is_empty() {
                "exited with failure status".to_string()
            } else {
                format!("exited with failure status: {output}")
            };
            Err(Error::Execution {
                node: self.name.clone(),
                command: command.to_string(),
                streamed: stream,
                cause,
            })
        }
    }

    /// Copy a local file up to the node. Transfers land in the login user's
    /// home directory, which the configured upload directory names.
    fn send_file(&mut self, ctx: &NodeContext<'_>, local: &Path, remote_name: &str) -> Result<()> {
        log::debug!(
            "* {}: uploading {} as {}",
            self.name,
            local.display(),
            remote_name
        );
        self.session(ctx)?.send_file(local, remote_name)
    }

    // =========================================================================
    // State machine
    // =========================================================================

    /// Does the node have chef-solo?
    ///
    /// A probe reporting absence is `Ok(false)`, never an error; only
    /// transport trouble fails.
    pub fn has_prerequisite(&mut self, ctx: &NodeContext<'_>) -> Result<bool> {
        let probe = format!("if exist \"{CHEF_SOLO_EXE}\" ( exit 0 ) else ( exit 1 )");
        Ok(self.execute(ctx, &probe, false)?.success)
    }

    /// Install chef-solo if missing, honoring the install policy.
    ///
    /// Idempotent: a node that already has the prerequisite is untouched.
    /// A declined installation fails with [`Error::NotInstalling`] before
    /// any install command runs. Installation is not retried — a failure
    /// surfaces immediately.
    pub fn install(&mut self, ctx: &NodeContext<'_>) -> Result<()> {
        if self.has_prerequisite(ctx)? {
            log::debug!("* {}: chef-solo already present", self.name);
            return Ok(());
        }

        let allowed = match ctx.config.install_policy {
            InstallPolicy::Always => true,
            InstallPolicy::Never => false,
            InstallPolicy::Ask => ctx.prompter.confirm_install(&self.name)?,
        };
        if !allowed {
            return Err(Error::NotInstalling {
                node: self.name.clone(),
            });
        }

        self.install_chef(ctx)
    }

    /// Fetch and install the chef MSI, then verify with a version run.
    fn install_chef(&mut self, ctx: &NodeContext<'_>) -> Result<()> {
        log::info!("* {}: installing chef ...", self.name);
        self.send_file(ctx, &ctx.config.wget_helper(), "wget.exe")?;

        let staging = &ctx.layout.upload_dir;
        let fetch = format!(
            "cmd /C if not exist \"{staging}\\chef-client-latest.msi\" \
             \"{staging}\\wget\" \"{url}\" --no-check-certificate \
             -O \"{staging}\\chef-client-latest.msi\"",
            url = ctx.config.installer_url
        );
        self.execute_checked(ctx, &fetch, false)?;

        let install = format!(
            "cmd /C msiexec /quiet /l \"{staging}\\chef-client-install.log\" \
             /i \"{staging}\\chef-client-latest.msi\" && \
             cmd /C type \"{staging}\\chef-client-install.log\" && \
             cmd /C \"{CHEF_CLIENT_EXE}\" -v"
        );
        self.execute_checked(ctx, &install, true)?;

        log::info!("* {}: installed chef", self.name);
        Ok(())
    }

    /// Upload the shared bundle plus this node's descriptor.
    ///
    /// The bundle must already be prepared; the orchestrator owns that
    /// precondition. Every step is a separate remote command. The sequence
    /// extracts into a staging directory and only touches the live payload
    /// in the final swap, so an earlier failure leaves any previous
    /// deployment intact; the sequence as a whole is still not
    /// transactional.
    pub fn upload(&mut self, ctx: &NodeContext<'_>, bundle: &PreparedBundle) -> Result<()> {
        log::info!("* {}: uploading configuration ...", self.name);
        let layout = ctx.layout;
        let staging = &layout.upload_dir;

        self.send_file(ctx, &ctx.config.tar_helper(), "tar.exe")?;

        log::debug!("* {}: removing stale files", self.name);
        let scrub = format!(
            "cmd /C (if exist \"{stage}\" rmdir /Q /S \"{stage}\") & \
             (if exist \"{archive}\" erase /Q \"{archive}\")",
            stage = layout.stage_dir,
            archive = layout.remote_archive()
        );
        self.execute_checked(ctx, &scrub, false)?;

        let make_dirs = format!(
            "cmd /C (if not exist \"{root}\" mkdir \"{root}\") && \
             mkdir \"{stage}\" \"{cache}\"",
            root = layout.chef_root,
            stage = layout.stage_dir,
            cache = layout.stage_cache()
        );
        self.execute_checked(ctx, &make_dirs, false)?;

        log::debug!("* {}: uploading new files", self.name);
        let descriptor = ctx.config.node_descriptor(&self.name);
        self.send_file(ctx, &descriptor, "node.json")?;
        self.send_file(ctx, bundle.archive_path(), ARCHIVE_NAME)?;

        let collect = format!(
            "cmd /C move /Y \"{staging}\\node.json\" \"{node_json}\" && \
             move /Y \"{staging}\\{ARCHIVE_NAME}\" \"{archive}\" && \
             move /Y \"{staging}\\tar.exe\" \"{tar}\"",
            node_json = layout.node_json,
            archive = layout.remote_archive(),
            tar = layout.remote_tar()
        );
        self.execute_checked(ctx, &collect, false)?;

        log::debug!("* {}: extracting into staging area", self.name);
        let extract = format!(
            "cmd /C cd /D \"{stage}\" && \"{tar}\" xzf \"{archive}\"",
            stage = layout.stage_dir,
            tar = layout.remote_tar(),
            archive = layout.remote_archive()
        );
        self.execute_checked(ctx, &extract, false)?;

        let relocate = format!(
            "cmd /C move /Y \"{stage}\\{STAGED_SOLO_RB}\" \"{solo}\" && \
             move /Y \"{stage}\\{APPLY_SCRIPT}\" \"{apply}\"",
            stage = layout.stage_dir,
            solo = layout.solo_rb,
            apply = layout.apply_script()
        );
        self.execute_checked(ctx, &relocate, false)?;

        // The live payload is only touched here, after extraction succeeded.
        let swap = format!(
            "cmd /C (if exist \"{payload}\" rmdir /Q /S \"{payload}\") && \
             move /Y \"{stage}\" \"{payload}\"",
            payload = layout.payload_dir,
            stage = layout.stage_dir
        );
        self.execute_checked(ctx, &swap, false)?;

        let discard = format!(
            "cmd /C erase /Q \"{archive}\"",
            archive = layout.remote_archive()
        );
        self.execute_checked(ctx, &discard, false)?;

        log::info!("* {}: finished uploading", self.name);
        Ok(())
    }

    /// Run chef-solo against the uploaded configuration, installing it
    /// first if needed. Output streams live.
    pub fn apply(&mut self, ctx: &NodeContext<'_>) -> Result<()> {
        self.install(ctx)?;

        log::info!("* {}: applying configuration ...", self.name);
        let command = ctx.layout.apply_command(ctx.config.verbosity.is_verbose());
        self.execute_checked(ctx, &command, true)?;
        log::info!("* {}: finished applying", self.name);
        Ok(())
    }

    /// Upload then apply. Sequential; no concurrency within a node.
    pub fn deploy(&mut self, ctx: &NodeContext<'_>, bundle: &PreparedBundle) -> Result<()> {
        self.upload(ctx, bundle)?;
        self.apply(ctx)
    }
}
