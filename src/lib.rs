//! Wok execution platforms
//!
//! This library turns resolved workflow tasks into job submissions for a
//! pluggable set of backends, and stages project files onto the backends that
//! run jobs away from the local filesystem.

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod model;
pub mod paths;
pub mod platform;
pub mod runner;
pub mod submission;
pub mod sync;

// Re-export main types for convenience
pub use config::ConfigElement;
pub use endpoint::{Endpoint, Scheme};
pub use error::{ConfigError, PlatformError, Result, SubmissionError};
pub use logging::{LogLevels, Logger, check_logging_config, init_logging};
pub use model::{Flow, Project, Task, WorkflowInstance};
pub use paths::PlatformPaths;
pub use platform::{
    ClusterPlatform, LocalPlatform, Platform, PlatformKind, PlatformState, create_platform,
    load_platforms,
};
pub use runner::{CommandOutcome, CommandRunner, DryRunRunner, SystemRunner, TransportCommand};
pub use submission::{FLOW_PATH, JobSubmission, JobSubmissions, MODULE_SCRIPT_PATH, SCRIPT_PATH};
pub use sync::{ProjectSynchronizer, SyncOutcome};
