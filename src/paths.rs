//! Path resolution between the three address spaces a task crosses:
//! the project's local path, its staged path on the platform, and the path a
//! running job sees.
//!
//! Everything here is lexical. No function touches the filesystem, so remote
//! paths can be computed for hosts this process cannot see.

use std::path::{Component, Path, PathBuf};

use crate::config::ConfigElement;
use crate::error::{ConfigError, SubmissionError};
use crate::model::Project;

/// Configured roots of a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPaths {
    /// Local working root
    pub work_path: PathBuf,
    /// Working root of jobs on the platform
    pub remote_path: PathBuf,
    /// Where projects are staged, one subdirectory per project
    pub projects_path: PathBuf,
}

impl PlatformPaths {
    /// Read roots from a platform element.
    ///
    /// `remote_path` defaults to `work_path`; `projects_path` defaults to
    /// `<work_path>/projects`. All three must be absolute.
    pub fn from_config(conf: &ConfigElement, work_path: &Path) -> Result<Self, ConfigError> {
        let work_path = require_absolute("work_path", normalize(work_path))?;
        let remote_path = require_absolute(
            "remote_path",
            normalize(&conf.get_path_or("remote_path", &work_path)),
        )?;
        let projects_path = require_absolute(
            "projects_path",
            normalize(&conf.get_path_or("projects_path", work_path.join("projects"))),
        )?;

        Ok(Self {
            work_path,
            remote_path,
            projects_path,
        })
    }

    /// Staged root of a project: `<projects_path>/<name>`
    pub fn project_root(&self, project_name: &str) -> PathBuf {
        self.projects_path.join(project_name)
    }

    /// Directory of a flow as seen from the platform.
    ///
    /// The flow's local directory is expressed relative to the project's
    /// local root and re-rooted under [`project_root`](Self::project_root).
    pub fn remote_flow_dir(
        &self,
        project: &Project,
        flow_path: &Path,
    ) -> Result<PathBuf, SubmissionError> {
        if !project.has_valid_name() {
            return Err(SubmissionError::InvalidProjectName {
                name: project.name.clone(),
            });
        }
        let rel = relative_flow_dir(flow_path, &project.path)?;
        let root = self.project_root(&project.name);
        if rel.as_os_str().is_empty() {
            Ok(root)
        } else {
            Ok(root.join(rel))
        }
    }
}

pub(crate) fn require_absolute(key: &str, path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ConfigError::invalid(
            key,
            format!("'{}' is not an absolute path", path.display()),
        ))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into its
/// parent. `..` above the root is dropped; leading `..` of a relative path is
/// kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute, normalized form of a local path.
///
/// Relative paths are resolved against the current directory.
pub fn absolute(path: &Path) -> PathBuf {
    let resolved = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize(&resolved)
}

/// Directory of `flow_path` relative to `project_path`.
///
/// Fails when the flow has no parent or does not live under the project.
pub fn relative_flow_dir(flow_path: &Path, project_path: &Path) -> Result<PathBuf, SubmissionError> {
    let flow_path = absolute(flow_path);
    let flow_dir = flow_path
        .parent()
        .ok_or_else(|| SubmissionError::MissingFlowDir {
            flow_path: flow_path.clone(),
        })?;
    let project_root = absolute(project_path);

    flow_dir
        .strip_prefix(&project_root)
        .map(Path::to_path_buf)
        .map_err(|_| SubmissionError::OutsideProject {
            flow_path: flow_path.clone(),
            project_path: project_root.clone(),
        })
}
