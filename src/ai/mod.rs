//! AI division service: breaks a task into subtask proposals and ranks
//! tasks as division candidates.

mod gemini;
mod heuristic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::{GeminiDivisionService, build_prompt};
pub use heuristic::{MAX_RECOMMENDATIONS, rank_candidates};

use crate::divide::SubtaskCount;
use crate::errors::DivisionError;
use crate::models::Task;

/// One task suggested for division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecommendation {
    pub task_id: i64,
    pub reason: String,
    pub score: f64,
}

#[async_trait]
pub trait DivisionService: Send + Sync {
    /// Propose `subtask_count` subtasks for `task`. Proposals carry
    /// provisional non-positive ids and the original's sprint and team.
    async fn divide_task(
        &self,
        task: &Task,
        subtask_count: SubtaskCount,
        additional_context: &str,
    ) -> Result<Vec<Task>, DivisionError>;

    /// Rank `tasks` as division candidates, best first.
    async fn analyze_tasks(
        &self,
        tasks: &[Task],
        subtask_count: SubtaskCount,
        additional_context: &str,
    ) -> Result<Vec<TaskRecommendation>, DivisionError>;
}
