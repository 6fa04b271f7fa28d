//! Execution platforms.
//!
//! A [`Platform`] turns tasks into job submissions for one backend and makes
//! sure the files those jobs need are present where they will run. Every
//! backend shares a [`PlatformCore`] (name, configuration, working root,
//! lifecycle state, logger) and supplies the backend-specific pieces:
//! one-time setup, project staging and submission building.
//!
//! Lifecycle: `Created → Started → Stopped`. `start` and `stop` are
//! idempotent; a stopped platform cannot be restarted.

mod cluster;
mod local;

pub use cluster::ClusterPlatform;
pub use local::LocalPlatform;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString};

use crate::config::ConfigElement;
use crate::error::{ConfigError, PlatformError, Result};
use crate::logging::{LogLevels, Logger};
use crate::model::{Project, Task};
use crate::paths::{normalize, require_absolute};
use crate::runner::CommandRunner;
use crate::submission::JobSubmissions;
use crate::sync::SyncOutcome;

/// Available backends, selected by a platform's `type` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum PlatformKind {
    #[default]
    Local,
    Cluster,
}

/// Lifecycle state of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PlatformState {
    Created,
    Started,
    Stopped,
}

/// State shared by every backend
#[derive(Debug, Clone)]
pub struct PlatformCore {
    name: String,
    conf: ConfigElement,
    work_path: PathBuf,
    state: PlatformState,
    logger: Logger,
}

impl PlatformCore {
    /// Read the shared keys. `work_path` is required and must be absolute.
    pub fn new(name: &str, conf: ConfigElement, logger: Logger) -> std::result::Result<Self, ConfigError> {
        let work_path = require_absolute(
            "work_path",
            normalize(Path::new(conf.require_str("work_path")?)),
        )?;
        Ok(Self {
            name: name.to_string(),
            conf,
            work_path,
            state: PlatformState::Created,
            logger,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ConfigElement {
        &self.conf
    }

    pub fn work_path(&self) -> &Path {
        &self.work_path
    }

    pub fn state(&self) -> PlatformState {
        self.state
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Move to `Started`. Returns whether setup should run.
    fn begin_start(&mut self) -> Result<bool> {
        match self.state {
            PlatformState::Created => {
                self.state = PlatformState::Started;
                Ok(true)
            }
            PlatformState::Started => Ok(false),
            PlatformState::Stopped => Err(PlatformError::state(format!(
                "platform {} is stopped and cannot be restarted",
                self.name
            ))),
        }
    }

    /// Move to `Stopped`. Returns whether teardown should run.
    fn begin_stop(&mut self) -> bool {
        match self.state {
            PlatformState::Started => {
                self.state = PlatformState::Stopped;
                true
            }
            PlatformState::Created | PlatformState::Stopped => false,
        }
    }
}

/// Capabilities every execution backend provides.
pub trait Platform: Send + Sync {
    fn core(&self) -> &PlatformCore;

    fn core_mut(&mut self) -> &mut PlatformCore;

    fn kind(&self) -> PlatformKind;

    /// Backend-specific one-time setup, run by the first `start`.
    ///
    /// Failures are logged; they do not undo the start.
    fn on_start(&mut self) {}

    /// Backend-specific teardown, run by the first `stop` after a `start`.
    fn on_stop(&mut self) {}

    /// Stage a project's files where this platform runs its tasks.
    fn sync_project(&self, project: &Project) -> SyncOutcome;

    /// One submission per task, lazily, in task order.
    ///
    /// Tasks whose submission cannot be built are logged and skipped; see
    /// [`JobSubmissions::failed`].
    fn job_submissions<'a>(&'a self, tasks: &'a [Task]) -> JobSubmissions<'a>;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn work_path(&self) -> &Path {
        self.core().work_path()
    }

    fn state(&self) -> PlatformState {
        self.core().state()
    }

    fn start(&mut self) -> Result<()> {
        if self.core_mut().begin_start()? {
            self.core()
                .logger()
                .info(format!("Starting {} platform {} ...", self.kind(), self.name()));
            self.on_start();
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.core_mut().begin_stop() {
            self.core()
                .logger()
                .info(format!("Stopping platform {} ...", self.name()));
            self.on_stop();
        }
    }
}

/// Build a platform from its configuration element.
///
/// The backend comes from the `type` key (`local` when absent).
pub fn create_platform(
    name: &str,
    conf: ConfigElement,
    runner: Arc<dyn CommandRunner>,
    levels: &LogLevels,
) -> std::result::Result<Box<dyn Platform>, ConfigError> {
    let kind = match conf.get_str("type") {
        None => PlatformKind::default(),
        Some(s) => PlatformKind::from_str(s)
            .map_err(|_| ConfigError::invalid("type", format!("unknown platform type '{}'", s)))?,
    };
    let logger = levels.logger(&format!("wok.platform.{}", name));

    let platform: Box<dyn Platform> = match kind {
        PlatformKind::Local => Box::new(LocalPlatform::new(name, conf, logger)?),
        PlatformKind::Cluster => Box::new(ClusterPlatform::new(name, conf, runner, logger)?),
    };
    Ok(platform)
}

/// Build every platform listed under `platforms` in an engine configuration.
///
/// Platforms are returned sorted by name. The first configuration error
/// aborts the whole load.
pub fn load_platforms(
    engine_conf: &ConfigElement,
    runner: Arc<dyn CommandRunner>,
    levels: &LogLevels,
) -> std::result::Result<Vec<Box<dyn Platform>>, ConfigError> {
    let platforms = match engine_conf.element("platforms") {
        Some(platforms) => platforms,
        None => return Ok(Vec::new()),
    };

    platforms
        .keys()
        .into_iter()
        .map(|name| {
            let conf = platforms.element(&name).ok_or_else(|| {
                ConfigError::invalid(format!("platforms.{}", name), "expected an object")
            })?;
            create_platform(&name, conf, runner.clone(), levels)
        })
        .collect()
}
