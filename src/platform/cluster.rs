//! Cluster platform: jobs run on a remote cluster whose storage is reached
//! through a transfer endpoint.
//!
//! # Configuration
//!
//! | Key             | Default                 | Meaning |
//! |-----------------|-------------------------|---------|
//! | `work_path`     | required                | Local working root |
//! | `files_url`     | required                | Transfer endpoint: `ssh://host:22`, `rsync://host`, `file:///data`, `/data` |
//! | `remote_path`   | `work_path`             | Working root of jobs on the cluster |
//! | `projects_path` | `<work_path>/projects`  | Where projects are staged |
//! | `rsync_path`    | `rsync`                 | rsync binary |
//! | `ssh_path`      | `ssh`                   | ssh binary |

use std::sync::Arc;

use crate::config::ConfigElement;
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::logging::Logger;
use crate::model::{Project, Task};
use crate::paths::PlatformPaths;
use crate::platform::{Platform, PlatformCore, PlatformKind};
use crate::runner::CommandRunner;
use crate::submission::{JobSubmissions, build_job_submission};
use crate::sync::{ProjectSynchronizer, SyncOutcome, TransferTools};

const REQUIRED_FIELDS: &[&str] = &["work_path", "files_url"];

/// Remote cluster reached over a transfer endpoint
pub struct ClusterPlatform {
    core: PlatformCore,
    paths: PlatformPaths,
    sync: ProjectSynchronizer,
}

impl std::fmt::Debug for ClusterPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterPlatform")
            .field("name", &self.core.name())
            .field("endpoint", self.sync.endpoint())
            .field("paths", &self.paths)
            .finish()
    }
}

impl ClusterPlatform {
    /// Build a cluster platform. Fails without side effects on any
    /// missing key, bad path or unsupported transfer scheme.
    pub fn new(
        name: &str,
        conf: ConfigElement,
        runner: Arc<dyn CommandRunner>,
        logger: Logger,
    ) -> Result<Self, ConfigError> {
        let missing = conf.missing_fields(REQUIRED_FIELDS);
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        let endpoint = Endpoint::parse(conf.require_str("files_url")?)?;
        let core = PlatformCore::new(name, conf, logger)?;
        let conf = core.config();
        let paths = PlatformPaths::from_config(conf, core.work_path())?;
        let tools = TransferTools {
            rsync_path: conf.get_or("rsync_path", "rsync"),
            ssh_path: conf.get_or("ssh_path", "ssh"),
        };

        let sync = ProjectSynchronizer::new(
            endpoint,
            paths.clone(),
            tools,
            runner,
            core.logger().child("sync"),
        );

        Ok(Self { core, paths, sync })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.sync.endpoint()
    }

    pub fn paths(&self) -> &PlatformPaths {
        &self.paths
    }
}

impl Platform for ClusterPlatform {
    fn core(&self) -> &PlatformCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlatformCore {
        &mut self.core
    }

    fn kind(&self) -> PlatformKind {
        PlatformKind::Cluster
    }

    fn on_start(&mut self) {
        self.sync
            .ensure_dir(&self.paths.remote_path, "remote working path");
    }

    fn sync_project(&self, project: &Project) -> SyncOutcome {
        self.sync.sync(project)
    }

    fn job_submissions<'a>(&'a self, tasks: &'a [Task]) -> JobSubmissions<'a> {
        JobSubmissions::new(tasks, self.core.logger(), move |task| {
            build_job_submission(task, self.core.name(), &self.paths.remote_path, |task| {
                self.paths
                    .remote_flow_dir(task.project(), &task.parent.flow_path)
            })
        })
    }
}
