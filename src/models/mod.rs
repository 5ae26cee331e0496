//! Wire-level data transfer objects for the sprint board REST API.
//!
//! Every entity is an explicit struct with an exhaustive field list.
//! The server speaks camelCase JSON; the few snake_case request keys it
//! expects (`team_id`, `assignee_ids`) are produced by the request types.

mod comment;
mod kpi;
mod sprint;
mod task;
mod user;

pub use comment::Comment;
pub use kpi::Kpi;
pub use sprint::{IncompleteTasksAction, NewSprint, Sprint, SprintStatus, SprintUpdate};
pub use task::{NewTask, Task, TaskTag, TaskUpdate, status};
pub use user::{NewTeam, Team, TeamUpdate, User};

/// A record the entity store can cache by numeric id.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable kind, used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> i64;
}
