use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::TaskError;

/// Where a task is in its life. Tasks start out [Status::Pending] and move
/// forward only:
///
/// ```text
/// Pending -> Running -> Complete
///    |          \-----> Failed
///    |----------------> Complete   (outputs already present)
///    \----------------> Failed     (a dependency failed)
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Pending,
    Running,
    Complete,
    Failed(String),
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::Running => write!(f, "running"),
            Status::Complete => write!(f, "complete"),
            Status::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl Status {
    pub fn can_become(&self, to: &Status) -> bool {
        matches!(
            (self, to),
            (Status::Pending, Status::Running)
                | (Status::Pending, Status::Complete)
                | (Status::Pending, Status::Failed(_))
                | (Status::Running, Status::Complete)
                | (Status::Running, Status::Failed(_))
        )
    }

    /// Move to `to`, or return an error naming `task` if that transition is
    /// not allowed
    pub fn advance(&mut self, task: &str, to: Status) -> Result<(), TaskError> {
        if !self.can_become(&to) {
            return Err(TaskError::Transition {
                task: task.to_owned(),
                from: self.clone(),
                to,
            });
        }
        *self = to;
        Ok(())
    }

    /// Returns `true` if the status is [`Complete`](Status::Complete)
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns `true` if the status is [`Failed`](Status::Failed)
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(..))
    }
}
