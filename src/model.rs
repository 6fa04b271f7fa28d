//! Engine-owned types the platforms read.
//!
//! Projects, flows and workflow instances are shared by many tasks and are
//! held behind `Arc`. Platforms never mutate them; the only per-task state a
//! platform touches is the environment it copies into a job submission.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A filesystem-rooted collection of flows and their assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Whether the name is usable as a single directory name on the target.
    ///
    /// Rejects empty names, `.`/`..`, and names containing a path separator
    /// or NUL, any of which would stage files outside the project's subtree.
    pub fn has_valid_name(&self) -> bool {
        let name = self.name.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
    }
}

/// A workflow definition document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    /// Local path of the flow document
    pub flow_path: PathBuf,
}

impl Flow {
    pub fn new(name: impl Into<String>, flow_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            flow_path: flow_path.into(),
        }
    }
}

/// A running instance of a workflow, bound to the project it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInstance {
    pub name: String,
    pub project: Arc<Project>,
}

impl WorkflowInstance {
    pub fn new(name: impl Into<String>, project: Arc<Project>) -> Self {
        Self {
            name: name.into(),
            project,
        }
    }
}

/// A unit of work ready to be turned into a job submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub instance: Arc<WorkflowInstance>,
    /// The flow that declared this task
    pub parent: Arc<Flow>,
    pub env: BTreeMap<String, String>,
}

impl Task {
    pub fn new(id: impl Into<String>, instance: Arc<WorkflowInstance>, parent: Arc<Flow>) -> Self {
        Self {
            id: id.into(),
            instance,
            parent,
            env: BTreeMap::new(),
        }
    }

    /// Builder-style environment entry
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn project(&self) -> &Project {
        &self.instance.project
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_validation() {
        assert!(Project::new("proj1", "/p").has_valid_name());
        assert!(Project::new("my project", "/p").has_valid_name());
        assert!(!Project::new("", "/p").has_valid_name());
        assert!(!Project::new("..", "/p").has_valid_name());
        assert!(!Project::new("a/b", "/p").has_valid_name());
    }

    #[test]
    fn test_task_reaches_project_through_instance() {
        let project = Arc::new(Project::new("proj1", "/home/u/proj1"));
        let instance = Arc::new(WorkflowInstance::new("run-1", project));
        let flow = Arc::new(Flow::new("main", "/home/u/proj1/main.wok"));
        let task = Task::new("main.step1", instance, flow).with_env("A", "1");

        assert_eq!(task.project().name, "proj1");
        assert_eq!(task.env.get("A").map(String::as_str), Some("1"));
    }
}
