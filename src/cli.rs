use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wok-platform - stage projects and build job submissions for wok platforms
#[derive(Parser, Debug)]
#[command(name = "wok-platform")]
#[command(about = "Stage workflow projects and build job submissions on execution platforms")]
#[command(version)]
pub struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true, default_value = "wok.json")]
    pub config: PathBuf,

    /// Platform to use (default: the only configured platform)
    #[arg(short, long, global = true)]
    pub platform: Option<String>,

    /// Dry-run mode: log transfer commands instead of running them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration by building every platform
    Check,
    /// Stage a project's files on the platform
    Sync {
        /// Project name (staged as <projects_path>/<name>)
        #[arg(long)]
        project: String,
        /// Local project root
        #[arg(long)]
        path: PathBuf,
    },
    /// Print job submissions for tasks of one flow as JSON lines
    Submit {
        /// Project name
        #[arg(long)]
        project: String,
        /// Local project root
        #[arg(long)]
        path: PathBuf,
        /// Flow document the tasks belong to
        #[arg(long)]
        flow: PathBuf,
        /// Script path relative to the flow's directory
        #[arg(long)]
        script: String,
        /// Task ids (default: the flow's file stem)
        #[arg(long = "task")]
        tasks: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
