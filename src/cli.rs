use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deploy chef-solo configuration to remote Windows hosts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project skeleton
    Create {
        /// Project directory to create
        name: String,
    },

    /// Upload configuration to nodes and apply it
    Deploy(TargetArgs),

    /// Upload configuration to nodes without applying it
    Upload(TargetArgs),

    /// Apply already-uploaded configuration on nodes
    Apply(TargetArgs),

    /// Manage node descriptors
    #[command(subcommand)]
    Nodes(NodesCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Nodes Commands
// ============================================================================

#[derive(Subcommand)]
pub enum NodesCommand {
    /// List known nodes
    List,

    /// Create a descriptor skeleton for a node
    Add {
        /// Fully-qualified hostname, e.g. web1.example.com
        hostname: String,
    },
}

// ============================================================================
// Deploy / Upload / Apply
// ============================================================================

#[derive(Parser)]
pub struct TargetArgs {
    /// Node names, full or abbreviated by dot-prefix
    #[arg(required = true)]
    pub nodes: Vec<String>,

    /// Remote login user
    #[arg(short, long, default_value = "Administrator")]
    pub user: String,

    /// Password for the remote user
    #[arg(short, long)]
    pub password: Option<String>,

    /// Path to an ssh private key (preferred over a password)
    #[arg(short = 'k', long)]
    pub ssh_key: Option<PathBuf>,

    /// Remote directory uploads land in (defaults to c:\users\<user>)
    #[arg(short, long)]
    pub directory: Option<String>,

    /// Local directory holding the tar and wget helper executables
    #[arg(long)]
    pub tools_dir: Option<PathBuf>,

    /// Install chef automatically when missing
    #[arg(short, long, conflicts_with = "no_install")]
    pub install: bool,

    /// Never install chef; fail the node when it is missing
    #[arg(short = 'I', long)]
    pub no_install: bool,
}
