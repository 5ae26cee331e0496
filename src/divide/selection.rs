use tracing::info;

use super::params::{DivisionParams, QueuedTask, SubtaskCount};
use crate::ai::DivisionService;
use crate::errors::SelectionError;
use crate::models::Task;

/// A task offered for division, with the analysis that surfaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub task: Task,
    pub selected: bool,
    pub params: DivisionParams,
    pub reason: String,
    pub score: f64,
}

/// Picks which tasks go into the divide queue and with what parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSession {
    candidates: Vec<Candidate>,
}

impl SelectionSession {
    /// Ask the division service which open tasks are worth dividing.
    ///
    /// Recommended tasks keep their input order and start selected with
    /// `default_subtasks` each.
    pub async fn analyze(
        service: &dyn DivisionService,
        tasks: &[Task],
        default_subtasks: SubtaskCount,
    ) -> Result<Self, SelectionError> {
        let open: Vec<Task> = tasks.iter().filter(|t| t.is_divisible()).cloned().collect();
        if open.is_empty() {
            return Err(SelectionError::NoBacklog);
        }

        let recommendations = service.analyze_tasks(&open, default_subtasks, "").await?;
        let candidates = open
            .into_iter()
            .filter_map(|task| {
                let rec = recommendations.iter().find(|r| r.task_id == task.id)?;
                Some(Candidate {
                    params: DivisionParams::new(default_subtasks, ""),
                    reason: rec.reason.clone(),
                    score: rec.score,
                    selected: true,
                    task,
                })
            })
            .collect::<Vec<_>>();
        info!(candidates = candidates.len(), "analysis complete");
        Ok(Self { candidates })
    }

    /// Offer every divisible task without consulting the service.
    pub fn from_tasks(tasks: &[Task], default_subtasks: SubtaskCount) -> Self {
        let candidates = tasks
            .iter()
            .filter(|t| t.is_divisible())
            .map(|task| Candidate {
                task: task.clone(),
                selected: true,
                params: DivisionParams::new(default_subtasks, ""),
                reason: String::new(),
                score: 0.0,
            })
            .collect();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.selected).count()
    }

    fn candidate_mut(&mut self, id: i64) -> Result<&mut Candidate, SelectionError> {
        self.candidates
            .iter_mut()
            .find(|c| c.task.id == id)
            .ok_or(SelectionError::UnknownTask { id })
    }

    /// Flip selection; returns the new state.
    pub fn toggle(&mut self, id: i64) -> Result<bool, SelectionError> {
        let candidate = self.candidate_mut(id)?;
        candidate.selected = !candidate.selected;
        Ok(candidate.selected)
    }

    pub fn set_subtask_count(&mut self, id: i64, n: i64) -> Result<SubtaskCount, SelectionError> {
        let count = SubtaskCount::new(n);
        self.candidate_mut(id)?.params.subtasks = count;
        Ok(count)
    }

    /// Free-text count input; non-numeric falls back to the default.
    pub fn set_subtask_input(&mut self, id: i64, input: &str) -> Result<SubtaskCount, SelectionError> {
        let count = SubtaskCount::parse_input(input);
        self.candidate_mut(id)?.params.subtasks = count;
        Ok(count)
    }

    pub fn set_context(&mut self, id: i64, context: &str) -> Result<(), SelectionError> {
        self.candidate_mut(id)?.params.context = context.to_string();
        Ok(())
    }

    /// The selected candidates, ready to open the divide workflow.
    pub fn into_queue(self) -> Result<Vec<QueuedTask>, SelectionError> {
        let queue: Vec<QueuedTask> = self
            .candidates
            .into_iter()
            .filter(|c| c.selected)
            .map(|c| QueuedTask::with_params(c.task, c.params))
            .collect();
        if queue.is_empty() {
            return Err(SelectionError::NothingSelected);
        }
        Ok(queue)
    }
}
