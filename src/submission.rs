//! Job submissions.
//!
//! A [`JobSubmission`] tells a job-execution collaborator how to launch one
//! task. Building one resolves where the task's flow directory lives as seen
//! by the job, then records two environment entries: the flow directory
//! itself and the task's script re-rooted under it. The script is taken from
//! the *relative* path the flow loader recorded in [`SCRIPT_PATH`], so the
//! same reference works whether the job runs in place or after staging.
//!
//! [`JobSubmissions`] is the lazy, ordered sequence platforms hand back. A
//! task that cannot be resolved is logged, counted, and skipped; the rest of
//! the batch carries on.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::logging::Logger;
use crate::model::Task;
use crate::paths::normalize;

/// Flow directory as seen by the running job
pub const FLOW_PATH: &str = "WOK_FLOW_PATH";

/// Script path relative to the flow directory, recorded by the flow loader
pub const SCRIPT_PATH: &str = "WOK_SCRIPT_PATH";

/// Absolute script path as seen by the running job
pub const MODULE_SCRIPT_PATH: &str = "WOK_MODULE_SCRIPT_PATH";

/// Backend-ready description of how to launch one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub task_id: String,
    /// Name of the platform that produced this submission
    pub platform: String,
    /// Working directory for the job
    pub work_dir: PathBuf,
    /// Script to execute, in the job's address space
    pub script_path: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Build a submission for `task` whose flow directory resolves to `flow_dir`.
///
/// The task's existing environment is copied unchanged; only [`FLOW_PATH`]
/// and [`MODULE_SCRIPT_PATH`] are added, and always together.
pub fn build_job_submission<F>(
    task: &Task,
    platform: &str,
    work_dir: &Path,
    flow_dir: F,
) -> Result<JobSubmission, SubmissionError>
where
    F: FnOnce(&Task) -> Result<PathBuf, SubmissionError>,
{
    let script_rel = task
        .env
        .get(SCRIPT_PATH)
        .ok_or_else(|| SubmissionError::MissingEnv {
            task: task.id.clone(),
            key: SCRIPT_PATH.to_string(),
        })?;
    let script_rel = Path::new(script_rel);
    // The script must stay inside the flow's directory tree
    let escapes = script_rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if script_rel.as_os_str().is_empty() || script_rel.is_absolute() || escapes {
        return Err(SubmissionError::InvalidScriptPath {
            task: task.id.clone(),
            path: script_rel.to_path_buf(),
        });
    }

    let flow_dir = flow_dir(task)?;
    let script_path = normalize(&flow_dir.join(script_rel));

    let mut env = task.env.clone();
    env.insert(FLOW_PATH.to_string(), flow_dir.display().to_string());
    env.insert(
        MODULE_SCRIPT_PATH.to_string(),
        script_path.display().to_string(),
    );

    Ok(JobSubmission {
        task_id: task.id.clone(),
        platform: platform.to_string(),
        work_dir: work_dir.to_path_buf(),
        script_path,
        env,
    })
}

type BuildFn<'a> = Box<dyn Fn(&Task) -> Result<JobSubmission, SubmissionError> + 'a>;

/// Lazy, single-pass sequence of job submissions in task order.
///
/// Failed tasks are logged at error level and counted in [`failed`](Self::failed);
/// they never appear in the sequence.
pub struct JobSubmissions<'a> {
    tasks: std::slice::Iter<'a, Task>,
    build: BuildFn<'a>,
    logger: &'a Logger,
    submitted: usize,
    failed: usize,
}

impl<'a> JobSubmissions<'a> {
    pub fn new<F>(tasks: &'a [Task], logger: &'a Logger, build: F) -> Self
    where
        F: Fn(&Task) -> Result<JobSubmission, SubmissionError> + 'a,
    {
        Self {
            tasks: tasks.iter(),
            build: Box::new(build),
            logger,
            submitted: 0,
            failed: 0,
        }
    }

    /// Submissions yielded so far
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Tasks skipped so far because their submission could not be built
    pub fn failed(&self) -> usize {
        self.failed
    }
}

impl Iterator for JobSubmissions<'_> {
    type Item = JobSubmission;

    fn next(&mut self) -> Option<JobSubmission> {
        for task in self.tasks.by_ref() {
            match (self.build)(task) {
                Ok(js) => {
                    self.submitted += 1;
                    return Some(js);
                }
                Err(e) => {
                    self.failed += 1;
                    self.logger
                        .error(format!("Skipping job submission for task {}: {}", task.id, e));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.tasks.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flow, Project, WorkflowInstance};
    use std::sync::Arc;

    fn task(id: &str, script: Option<&str>) -> Task {
        let project = Arc::new(Project::new("proj1", "/home/u/proj1"));
        let instance = Arc::new(WorkflowInstance::new("i1", project));
        let flow = Arc::new(Flow::new("f", "/home/u/proj1/sub/flow.wok"));
        let mut task = Task::new(id, instance, flow).with_env("KEEP", "me");
        if let Some(script) = script {
            task.env.insert(SCRIPT_PATH.to_string(), script.to_string());
        }
        task
    }

    fn fixed_dir(_: &Task) -> Result<PathBuf, SubmissionError> {
        Ok(PathBuf::from("/remote/projects/proj1/sub"))
    }

    #[test]
    fn test_build_sets_both_entries() {
        let js = build_job_submission(&task("t1", Some("run.sh")), "cluster", Path::new("/w"), fixed_dir)
            .unwrap();
        assert_eq!(js.env[FLOW_PATH], "/remote/projects/proj1/sub");
        assert_eq!(js.env[MODULE_SCRIPT_PATH], "/remote/projects/proj1/sub/run.sh");
        assert_eq!(js.script_path, PathBuf::from("/remote/projects/proj1/sub/run.sh"));
        assert_eq!(js.env["KEEP"], "me");
        assert_eq!(js.env[SCRIPT_PATH], "run.sh");
        assert_eq!(js.env.len(), 4);
    }

    #[test]
    fn test_missing_script_key_fails() {
        let err = build_job_submission(&task("t1", None), "cluster", Path::new("/w"), fixed_dir)
            .unwrap_err();
        assert_eq!(
            err,
            SubmissionError::MissingEnv {
                task: "t1".into(),
                key: SCRIPT_PATH.into()
            }
        );
    }

    #[test]
    fn test_absolute_script_rejected() {
        let err = build_job_submission(
            &task("t1", Some("/home/u/proj1/sub/run.sh")),
            "cluster",
            Path::new("/w"),
            fixed_dir,
        )
        .unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidScriptPath { .. }));
    }

    #[test]
    fn test_parent_dir_script_rejected() {
        for script in ["../proj2/run.sh", "bin/../../run.sh", ".."] {
            let err = build_job_submission(&task("t1", Some(script)), "cluster", Path::new("/w"), fixed_dir)
                .unwrap_err();
            assert_eq!(
                err,
                SubmissionError::InvalidScriptPath {
                    task: "t1".into(),
                    path: PathBuf::from(script)
                }
            );
        }

        let js = build_job_submission(&task("t1", Some("./bin/run.sh")), "cluster", Path::new("/w"), fixed_dir)
            .unwrap();
        assert_eq!(js.env[MODULE_SCRIPT_PATH], "/remote/projects/proj1/sub/bin/run.sh");
    }

    #[test]
    fn test_flow_dir_failure_sets_nothing() {
        let result = build_job_submission(&task("t1", Some("run.sh")), "cluster", Path::new("/w"), |_| {
            Err(SubmissionError::MissingFlowDir {
                flow_path: PathBuf::from("/"),
            })
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_sequence_skips_failures_and_keeps_order() {
        let tasks = vec![
            task("a", Some("a.sh")),
            task("b", None),
            task("c", Some("c.sh")),
        ];
        let logger = Logger::new("test");
        let mut seq = JobSubmissions::new(&tasks, &logger, |t| {
            build_job_submission(t, "p", Path::new("/w"), fixed_dir)
        });

        let ids: Vec<String> = seq.by_ref().map(|js| js.task_id).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(seq.submitted(), 2);
        assert_eq!(seq.failed(), 1);
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_sequence_is_lazy() {
        let tasks = vec![task("a", Some("a.sh")), task("b", Some("b.sh"))];
        let logger = Logger::new("test");
        let calls = std::cell::Cell::new(0);
        let mut seq = JobSubmissions::new(&tasks, &logger, |t| {
            calls.set(calls.get() + 1);
            build_job_submission(t, "p", Path::new("/w"), fixed_dir)
        });
        assert_eq!(calls.get(), 0);
        seq.next();
        assert_eq!(calls.get(), 1);
    }
}
