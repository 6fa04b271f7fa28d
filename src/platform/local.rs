//! Local platform: tasks run on this machine, in place.

use std::path::PathBuf;

use crate::config::ConfigElement;
use crate::error::{ConfigError, SubmissionError};
use crate::logging::Logger;
use crate::model::{Project, Task};
use crate::paths::absolute;
use crate::platform::{Platform, PlatformCore, PlatformKind};
use crate::submission::{JobSubmissions, build_job_submission};
use crate::sync::SyncOutcome;

/// Runs jobs against the project's own files. Nothing is staged.
pub struct LocalPlatform {
    core: PlatformCore,
}

impl LocalPlatform {
    pub fn new(name: &str, conf: ConfigElement, logger: Logger) -> Result<Self, ConfigError> {
        Ok(Self {
            core: PlatformCore::new(name, conf, logger)?,
        })
    }
}

fn local_flow_dir(task: &Task) -> Result<PathBuf, SubmissionError> {
    let flow_path = absolute(&task.parent.flow_path);
    match flow_path.parent() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Err(SubmissionError::MissingFlowDir {
            flow_path: flow_path.clone(),
        }),
    }
}

impl Platform for LocalPlatform {
    fn core(&self) -> &PlatformCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PlatformCore {
        &mut self.core
    }

    fn kind(&self) -> PlatformKind {
        PlatformKind::Local
    }

    fn sync_project(&self, project: &Project) -> SyncOutcome {
        self.core
            .logger()
            .debug(format!("Project {} runs in place, nothing to sync", project.name));
        SyncOutcome::Skipped
    }

    fn job_submissions<'a>(&'a self, tasks: &'a [Task]) -> JobSubmissions<'a> {
        JobSubmissions::new(tasks, self.core.logger(), move |task| {
            build_job_submission(task, self.core.name(), self.core.work_path(), local_flow_dir)
        })
    }
}
