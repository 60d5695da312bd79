use anyhow::Result;
use deploykit::{Client, DeployConfig, InstallPolicy, Verbosity};

use crate::Context;
use crate::cli::TargetArgs;
use crate::ui;

/// Which batch operation to run against the named nodes.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Deploy,
    Upload,
    Apply,
}

pub fn run(ctx: &Context, op: Operation, args: &TargetArgs) -> Result<()> {
    let config = build_config(ctx, args);
    let mut client = Client::new(config);

    let result = match op {
        Operation::Deploy => client.deploy(&args.nodes),
        Operation::Upload => client.upload(&args.nodes),
        Operation::Apply => client.apply(&args.nodes),
    };

    match result {
        Ok(()) => {
            let what = match op {
                Operation::Deploy => "Deployed to",
                Operation::Upload => "Uploaded to",
                Operation::Apply => "Applied on",
            };
            ui::success(&format!("{what} {} node(s)", args.nodes.len()));
            Ok(())
        }
        Err(err) => {
            let node = err.node().unwrap_or("skiff").to_string();
            ui::error(&format!("! {node}: {err}"));
            std::process::exit(1);
        }
    }
}

/// Build the batch configuration from CLI arguments, rooted at the current
/// directory.
fn build_config(ctx: &Context, args: &TargetArgs) -> DeployConfig {
    let mut config = DeployConfig::new(".").user(args.user.clone());

    if let Some(password) = &args.password {
        config = config.password(password.clone());
    }
    if let Some(key) = &args.ssh_key {
        config = config.ssh_key(key.clone());
    }
    if let Some(directory) = &args.directory {
        config = config.upload_dir(directory.clone());
    }
    if let Some(tools) = &args.tools_dir {
        config = config.tools_dir(tools.clone());
    }

    let policy = if args.install {
        InstallPolicy::Always
    } else if args.no_install {
        InstallPolicy::Never
    } else {
        InstallPolicy::Ask
    };

    let verbosity = if ctx.quiet {
        Verbosity::Quiet
    } else if ctx.verbose > 0 {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    config.install_policy(policy).verbosity(verbosity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> TargetArgs {
        TargetArgs::parse_from(std::iter::once("skiff").chain(argv.iter().copied()))
    }

    #[test]
    fn test_config_defaults_from_args() {
        let ctx = Context {
            verbose: 0,
            quiet: false,
        };
        let config = build_config(&ctx, &args(&["web1"]));

        assert_eq!(config.user, "Administrator");
        assert_eq!(config.install_policy, InstallPolicy::Ask);
        assert_eq!(config.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_install_flags_map_to_policy() {
        let ctx = Context {
            verbose: 0,
            quiet: false,
        };
        let always = build_config(&ctx, &args(&["web1", "--install"]));
        assert_eq!(always.install_policy, InstallPolicy::Always);

        let never = build_config(&ctx, &args(&["web1", "--no-install"]));
        assert_eq!(never.install_policy, InstallPolicy::Never);
    }

    #[test]
    fn test_verbosity_flags() {
        let quiet = Context {
            verbose: 0,
            quiet: true,
        };
        assert_eq!(
            build_config(&quiet, &args(&["web1"])).verbosity,
            Verbosity::Quiet
        );

        let verbose = Context {
            verbose: 1,
            quiet: false,
        };
        assert!(
            build_config(&verbose, &args(&["web1"]))
                .verbosity
                .is_verbose()
        );
    }

    #[test]
    fn test_credentials_forwarded() {
        let ctx = Context {
            verbose: 0,
            quiet: false,
        };
        let config = build_config(
            &ctx,
            &args(&["web1", "--user", "deployer", "-p", "secret", "-d", "d:\\drop"]),
        );

        assert_eq!(config.user, "deployer");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.staging_dir(), "d:\\drop");
    }
}
