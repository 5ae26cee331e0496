//! The task-division wizard.
//!
//! `SelectionSession` picks candidates, `DivideWorkflow` walks them through
//! queue, loading, carousel and summary, and `commit` applies the result to
//! the task repository.

mod commit;
mod params;
mod selection;
mod state;
mod workflow;

pub use commit::{CommitReport, CreateFailure, commit, new_task_for};
pub use params::{DivisionParams, QueuedTask, SubtaskCount};
pub use selection::{Candidate, SelectionSession};
pub use state::{DivisionItem, DivisionSummary, Step, WorkflowState};
pub use workflow::{DivideWorkflow, Snapshot};
