//! Refinement of reaction pathways cut out of reactive MD trajectories. Each
//! step (an optimization, a join, a re-spacing, an external interpolation) is
//! a [Task] in a [Graph] that runs the steps in order and tracks a [Status]
//! for each one.

use std::{error::Error, fmt::Display, path::PathBuf};

pub mod calc;
pub mod command;
pub mod config;
pub mod graph;
pub mod pathway;
pub mod status;
pub mod task;

pub use config::Config;
pub use graph::Graph;
pub use pathway::{Pathway, Trajectory};
pub use status::Status;
pub use task::Task;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    Io(String, std::io::ErrorKind),
    Xyz(String, geom::XyzError),

    /// the external command exited unsuccessfully. `code` is `None` if it
    /// was killed by a signal
    Exit { task: String, code: Option<i32> },

    MissingInputs { task: String, missing: Vec<PathBuf> },
    MissingOutputs { task: String, missing: Vec<PathBuf> },

    /// a frame selection that did not yield the frames a task needs
    Selection { task: String, msg: String },

    Transition { task: String, from: Status, to: Status },
    UnknownDependency { task: String, dependency: String },
    DuplicateName(String),
    Config(String),

    /// the named tasks did not complete
    Failed(Vec<String>),
}

impl Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths = |v: &[PathBuf]| {
            v.iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            TaskError::Io(path, kind) => {
                write!(f, "failed to access {path}: {kind}")
            }
            TaskError::Xyz(path, e) => write!(f, "{path}: {e}"),
            TaskError::Exit {
                task,
                code: Some(code),
            } => write!(f, "{task} exited with status {code}"),
            TaskError::Exit { task, code: None } => {
                write!(f, "{task} was killed by a signal")
            }
            TaskError::MissingInputs { task, missing } => {
                write!(f, "{task} is missing inputs: {}", paths(missing))
            }
            TaskError::MissingOutputs { task, missing } => {
                write!(f, "{task} did not produce {}", paths(missing))
            }
            TaskError::Selection { task, msg } => write!(f, "{task}: {msg}"),
            TaskError::Transition { task, from, to } => {
                write!(f, "{task} cannot go from {from} to {to}")
            }
            TaskError::UnknownDependency { task, dependency } => {
                write!(f, "{task} depends on unknown task {dependency}")
            }
            TaskError::DuplicateName(name) => {
                write!(f, "a task named {name} already exists")
            }
            TaskError::Config(msg) => write!(f, "bad configuration: {msg}"),
            TaskError::Failed(tasks) => {
                write!(f, "tasks failed: {}", tasks.join(", "))
            }
        }
    }
}

impl Error for TaskError {}

pub(crate) fn io_error(
    path: impl AsRef<std::path::Path>,
) -> impl FnOnce(std::io::Error) -> TaskError {
    move |e| TaskError::Io(path.as_ref().display().to_string(), e.kind())
}
