//! Pure state of one divide workflow instance.
//!
//! Every transition validates before it mutates: a rejected action leaves
//! the state exactly as it was. Async work (AI requests, commit) is driven
//! by `DivideWorkflow`, which calls the `begin_*` / `finish_*` pairs here.

use super::params::{DivisionParams, QueuedTask, SubtaskCount};
use crate::errors::WorkflowError;
use crate::models::{Task, TaskUpdate};

/// The four wizard steps.
///
/// ```text
/// queue ──start──▶ loading ──all divided──▶ carousel ──accept last──▶ summary
///                     ▲                        │  ▲                     │
///                     └──────redivide──────────┘  └────────back─────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Step {
    /// Reviewing the tasks to divide (initial)
    #[default]
    Queue,
    /// Waiting for AI proposals (batch or a single re-divide)
    Loading,
    /// Reviewing one division item at a time
    Carousel,
    /// Final review before commit
    Summary,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Queue => "queue",
            Step::Loading => "loading",
            Step::Carousel => "carousel",
            Step::Summary => "summary",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One original task and its proposed replacement subtasks.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionItem {
    pub original: Task,
    /// Parameters the proposals were requested with; re-divide reuses them.
    pub params: DivisionParams,
    pub generated: Vec<Task>,
}

/// Aggregate view shown in the summary step.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionSummary {
    /// Originals that will be replaced (items with at least one subtask)
    pub originals: Vec<Task>,
    pub generated: Vec<Task>,
    /// Originals left untouched because every proposal was removed
    pub skipped: Vec<Task>,
}

impl DivisionSummary {
    pub fn from_items(items: &[DivisionItem]) -> Self {
        let mut originals = Vec::new();
        let mut generated = Vec::new();
        let mut skipped = Vec::new();
        for item in items {
            if item.generated.is_empty() {
                skipped.push(item.original.clone());
            } else {
                originals.push(item.original.clone());
                generated.extend(item.generated.iter().cloned());
            }
        }
        Self {
            originals,
            generated,
            skipped,
        }
    }

    /// Summary sentence, e.g. "1 tarea original será reemplazada con 3 subtareas."
    pub fn headline(&self) -> String {
        let originals = self.originals.len();
        let generated = self.generated.len();
        let (tarea, original, verbo, reemplazada) = if originals == 1 {
            ("tarea", "original", "será", "reemplazada")
        } else {
            ("tareas", "originales", "serán", "reemplazadas")
        };
        let subtarea = if generated == 1 { "subtarea" } else { "subtareas" };
        format!(
            "{} {} {} {} {} con {} {}.",
            originals, tarea, original, verbo, reemplazada, generated, subtarea
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    step: Step,
    queue: Vec<QueuedTask>,
    items: Vec<DivisionItem>,
    carousel_index: usize,
    /// Highest carousel index reached through accept
    visited_max: usize,
    /// Item being re-divided while in `Loading`
    redividing: Option<usize>,
    committing: bool,
}

impl WorkflowState {
    pub fn new(queue: Vec<QueuedTask>) -> Self {
        Self {
            step: Step::Queue,
            queue,
            items: Vec::new(),
            carousel_index: 0,
            visited_max: 0,
            redividing: None,
            committing: false,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn queue(&self) -> &[QueuedTask] {
        &self.queue
    }

    pub fn items(&self) -> &[DivisionItem] {
        &self.items
    }

    pub fn carousel_index(&self) -> usize {
        self.carousel_index
    }

    pub fn visited_max(&self) -> usize {
        self.visited_max
    }

    pub fn is_committing(&self) -> bool {
        self.committing
    }

    /// Item being re-divided, if the current `Loading` step is a re-divide.
    pub fn redividing(&self) -> Option<usize> {
        self.redividing
    }

    pub fn current_item(&self) -> Option<&DivisionItem> {
        match self.step {
            Step::Carousel => self.items.get(self.carousel_index),
            _ => None,
        }
    }

    pub fn summary(&self) -> DivisionSummary {
        DivisionSummary::from_items(&self.items)
    }

    fn expect_step(&self, step: Step, action: &'static str) -> Result<(), WorkflowError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                step: self.step,
                action,
            })
        }
    }

    fn queued_mut(&mut self, id: i64) -> Result<&mut QueuedTask, WorkflowError> {
        self.queue
            .iter_mut()
            .find(|q| q.task.id == id)
            .ok_or(WorkflowError::UnknownTask { id })
    }

    // Queue step

    /// Drop a task from the queue. Returns `true` when the queue is now empty,
    /// in which case the workflow must close.
    pub fn remove_task(&mut self, id: i64) -> Result<bool, WorkflowError> {
        self.expect_step(Step::Queue, "remove a task")?;
        let pos = self
            .queue
            .iter()
            .position(|q| q.task.id == id)
            .ok_or(WorkflowError::UnknownTask { id })?;
        self.queue.remove(pos);
        Ok(self.queue.is_empty())
    }

    pub fn set_subtasks(&mut self, id: i64, subtasks: SubtaskCount) -> Result<(), WorkflowError> {
        self.expect_step(Step::Queue, "change subtask count")?;
        self.queued_mut(id)?.params.subtasks = subtasks;
        Ok(())
    }

    pub fn set_context(&mut self, id: i64, context: &str) -> Result<(), WorkflowError> {
        self.expect_step(Step::Queue, "change context")?;
        self.queued_mut(id)?.params.context = context.to_string();
        Ok(())
    }

    /// `queue → loading`. Returns the requests to run, in queue order.
    pub fn begin_loading(&mut self) -> Result<Vec<QueuedTask>, WorkflowError> {
        self.expect_step(Step::Queue, "start")?;
        if self.queue.is_empty() {
            return Err(WorkflowError::EmptyQueue);
        }
        self.step = Step::Loading;
        Ok(self.queue.clone())
    }

    // Loading step

    /// `loading → carousel` with one proposal list per queued task.
    pub fn finish_loading(&mut self, generated: Vec<Vec<Task>>) -> Result<(), WorkflowError> {
        self.expect_step(Step::Loading, "finish loading")?;
        if self.redividing.is_some() || generated.len() != self.queue.len() {
            return Err(WorkflowError::InvalidTransition {
                step: self.step,
                action: "finish loading",
            });
        }
        self.items = self
            .queue
            .iter()
            .zip(generated)
            .map(|(queued, generated)| DivisionItem {
                original: queued.task.clone(),
                params: queued.params.clone(),
                generated,
            })
            .collect();
        self.carousel_index = 0;
        self.visited_max = 0;
        self.step = Step::Carousel;
        Ok(())
    }

    // Carousel step

    /// `carousel → loading` for the current item. Returns its index, the
    /// original task and the parameters to request with.
    pub fn begin_redivide(&mut self) -> Result<(usize, Task, DivisionParams), WorkflowError> {
        self.expect_step(Step::Carousel, "re-divide")?;
        let index = self.carousel_index;
        let item = self
            .items
            .get(index)
            .ok_or(WorkflowError::NavigationOutOfRange { index })?;
        let request = (index, item.original.clone(), item.params.clone());
        self.redividing = Some(index);
        self.step = Step::Loading;
        Ok(request)
    }

    /// `loading → carousel` at the re-divided index, replacing only that
    /// item's proposals.
    pub fn finish_redivide(&mut self, generated: Vec<Task>) -> Result<(), WorkflowError> {
        self.expect_step(Step::Loading, "finish re-divide")?;
        let index = self.redividing.ok_or(WorkflowError::InvalidTransition {
            step: self.step,
            action: "finish re-divide",
        })?;
        self.items[index].generated = generated;
        self.redividing = None;
        self.carousel_index = index;
        self.step = Step::Carousel;
        Ok(())
    }

    /// Advance to the next item, or to the summary from the last one.
    pub fn accept(&mut self) -> Result<(), WorkflowError> {
        self.expect_step(Step::Carousel, "accept")?;
        if self.carousel_index + 1 < self.items.len() {
            self.carousel_index += 1;
            self.visited_max = self.visited_max.max(self.carousel_index);
        } else {
            self.step = Step::Summary;
        }
        Ok(())
    }

    /// Jump to an already-visited item.
    pub fn go_to(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.expect_step(Step::Carousel, "navigate")?;
        if index > self.visited_max || index >= self.items.len() {
            return Err(WorkflowError::NavigationOutOfRange { index });
        }
        self.carousel_index = index;
        Ok(())
    }

    pub fn previous(&mut self) -> Result<(), WorkflowError> {
        self.expect_step(Step::Carousel, "navigate")?;
        match self.carousel_index.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => Err(WorkflowError::NavigationOutOfRange { index: 0 }),
        }
    }

    pub fn next(&mut self) -> Result<(), WorkflowError> {
        self.go_to(self.carousel_index + 1)
    }

    /// Replace one proposal of the current item.
    pub fn edit_generated(&mut self, index: usize, task: Task) -> Result<(), WorkflowError> {
        *self.generated_mut(index, "edit a subtask")? = task;
        Ok(())
    }

    /// Apply a partial edit to one proposal of the current item.
    pub fn update_generated(
        &mut self,
        index: usize,
        update: &TaskUpdate,
    ) -> Result<(), WorkflowError> {
        update.apply_to(self.generated_mut(index, "edit a subtask")?);
        Ok(())
    }

    pub fn remove_generated(&mut self, index: usize) -> Result<Task, WorkflowError> {
        self.generated_mut(index, "remove a subtask")?;
        let current = self.carousel_index;
        Ok(self.items[current].generated.remove(index))
    }

    fn generated_mut(
        &mut self,
        index: usize,
        action: &'static str,
    ) -> Result<&mut Task, WorkflowError> {
        self.expect_step(Step::Carousel, action)?;
        let current = self.carousel_index;
        self.items
            .get_mut(current)
            .and_then(|item| item.generated.get_mut(index))
            .ok_or(WorkflowError::UnknownGenerated { index })
    }

    // Summary step

    /// `summary → carousel` at the last item.
    pub fn back_to_carousel(&mut self) -> Result<(), WorkflowError> {
        self.expect_step(Step::Summary, "go back")?;
        if self.committing {
            return Err(WorkflowError::CommitInProgress);
        }
        self.carousel_index = self.items.len().saturating_sub(1);
        self.step = Step::Carousel;
        Ok(())
    }

    pub fn ensure_cancellable(&self) -> Result<(), WorkflowError> {
        self.expect_step(Step::Summary, "cancel")?;
        if self.committing {
            return Err(WorkflowError::CommitInProgress);
        }
        Ok(())
    }

    /// Mark the commit as started and hand out the items to commit.
    pub fn begin_commit(&mut self) -> Result<Vec<DivisionItem>, WorkflowError> {
        self.expect_step(Step::Summary, "confirm")?;
        if self.committing {
            return Err(WorkflowError::CommitInProgress);
        }
        self.committing = true;
        Ok(self.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, title: &str) -> Task {
        serde_json::from_value(serde_json::json!({
            "id": id, "title": title, "status": "Backlog", "startDate": "2025-03-01"
        }))
        .unwrap()
    }

    fn proposals(prefix: &str, n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| task(-(i as i64) - 1, &format!("{} {}", prefix, i + 1)))
            .collect()
    }

    fn in_carousel(n: usize) -> WorkflowState {
        let queue = (1..=n as i64)
            .map(|id| QueuedTask::new(task(id, &format!("T{}", id))))
            .collect();
        let mut state = WorkflowState::new(queue);
        state.begin_loading().unwrap();
        let generated = (1..=n).map(|i| proposals(&format!("T{}", i), 3)).collect();
        state.finish_loading(generated).unwrap();
        state
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::Carousel.to_string(), "carousel");
        assert_eq!(Step::default(), Step::Queue);
    }

    #[test]
    fn test_start_requires_non_empty_queue() {
        let mut state = WorkflowState::new(Vec::new());
        assert!(matches!(state.begin_loading(), Err(WorkflowError::EmptyQueue)));
        assert_eq!(state.step(), Step::Queue);
    }

    #[test]
    fn test_loading_builds_items_in_queue_order() {
        let state = in_carousel(3);
        assert_eq!(state.step(), Step::Carousel);
        assert_eq!(state.items().len(), 3);
        let ids: Vec<i64> = state.items().iter().map(|i| i.original.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(state.carousel_index(), 0);
    }

    #[test]
    fn test_finish_loading_rejects_mismatched_results() {
        let mut state = WorkflowState::new(vec![QueuedTask::new(task(1, "A"))]);
        state.begin_loading().unwrap();
        let before = state.clone();
        assert!(state.finish_loading(vec![]).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_last_task_reports_empty() {
        let mut state = WorkflowState::new(vec![
            QueuedTask::new(task(1, "A")),
            QueuedTask::new(task(2, "B")),
        ]);
        assert!(!state.remove_task(1).unwrap());
        assert!(matches!(
            state.remove_task(1),
            Err(WorkflowError::UnknownTask { id: 1 })
        ));
        assert!(state.remove_task(2).unwrap());
    }

    #[test]
    fn test_queue_params_editable_per_task() {
        let mut state = WorkflowState::new(vec![
            QueuedTask::new(task(1, "A")),
            QueuedTask::new(task(2, "B")),
        ]);
        state.set_subtasks(2, SubtaskCount::new(5)).unwrap();
        state.set_context(1, "backend only").unwrap();
        assert_eq!(state.queue()[0].params.subtasks.get(), 3);
        assert_eq!(state.queue()[0].params.context, "backend only");
        assert_eq!(state.queue()[1].params.subtasks.get(), 5);
        assert_eq!(state.queue()[1].params.context, "");
    }

    #[test]
    fn test_accept_walks_to_summary() {
        let mut state = in_carousel(2);
        state.accept().unwrap();
        assert_eq!(state.carousel_index(), 1);
        assert_eq!(state.visited_max(), 1);
        state.accept().unwrap();
        assert_eq!(state.step(), Step::Summary);
    }

    #[test]
    fn test_forward_navigation_only_to_visited() {
        let mut state = in_carousel(3);
        assert!(matches!(
            state.next(),
            Err(WorkflowError::NavigationOutOfRange { index: 1 })
        ));
        state.accept().unwrap();
        state.accept().unwrap();
        state.previous().unwrap();
        state.previous().unwrap();
        assert_eq!(state.carousel_index(), 0);
        assert!(state.previous().is_err());
        state.next().unwrap();
        state.go_to(2).unwrap();
        assert_eq!(state.carousel_index(), 2);
        assert!(state.go_to(3).is_err());
    }

    #[test]
    fn test_edit_generated_round_trips_and_is_idempotent() {
        let mut state = in_carousel(1);
        let mut edited = state.items()[0].generated[1].clone();
        edited.title = "Edited".to_string();
        edited.estimated_hours = Some(4.0);

        state.edit_generated(1, edited.clone()).unwrap();
        assert_eq!(state.items()[0].generated[1], edited);
        let once = state.clone();
        state.edit_generated(1, edited.clone()).unwrap();
        assert_eq!(state, once);
    }

    #[test]
    fn test_update_and_remove_generated() {
        let mut state = in_carousel(2);
        state.accept().unwrap();
        let update = TaskUpdate {
            description: Some("detail".into()),
            ..Default::default()
        };
        state.update_generated(0, &update).unwrap();
        assert_eq!(
            state.items()[1].generated[0].description.as_deref(),
            Some("detail")
        );
        assert!(state.items()[0].generated[0].description.is_none());

        let removed = state.remove_generated(2).unwrap();
        assert_eq!(removed.title, "T2 3");
        assert_eq!(state.items()[1].generated.len(), 2);
        assert!(matches!(
            state.remove_generated(5),
            Err(WorkflowError::UnknownGenerated { index: 5 })
        ));
    }

    #[test]
    fn test_edit_outside_carousel_rejected() {
        let mut state = in_carousel(1);
        state.accept().unwrap();
        let t = task(-1, "x");
        let before = state.clone();
        assert!(matches!(
            state.edit_generated(0, t),
            Err(WorkflowError::InvalidTransition {
                step: Step::Summary,
                ..
            })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_redivide_replaces_only_current_item() {
        let mut state = in_carousel(3);
        state.accept().unwrap();
        let before = state.items().to_vec();

        let (index, original, params) = state.begin_redivide().unwrap();
        assert_eq!(index, 1);
        assert_eq!(original.id, 2);
        assert_eq!(params.subtasks.get(), 3);
        assert_eq!(state.step(), Step::Loading);
        assert!(state.accept().is_err());

        state.finish_redivide(proposals("R", 2)).unwrap();
        assert_eq!(state.step(), Step::Carousel);
        assert_eq!(state.carousel_index(), 1);
        assert_eq!(state.items()[0], before[0]);
        assert_eq!(state.items()[2], before[2]);
        assert_eq!(state.items()[1].original, before[1].original);
        assert_eq!(state.items()[1].generated.len(), 2);
        assert_eq!(state.items()[1].generated[0].title, "R 1");
    }

    #[test]
    fn test_summary_back_goes_to_last_index() {
        let mut state = in_carousel(3);
        state.accept().unwrap();
        state.accept().unwrap();
        state.accept().unwrap();
        state.back_to_carousel().unwrap();
        assert_eq!(state.step(), Step::Carousel);
        assert_eq!(state.carousel_index(), 2);
    }

    #[test]
    fn test_commit_only_once() {
        let mut state = in_carousel(1);
        state.accept().unwrap();
        assert_eq!(state.begin_commit().unwrap().len(), 1);
        assert!(state.is_committing());
        assert!(matches!(
            state.begin_commit(),
            Err(WorkflowError::CommitInProgress)
        ));
        assert!(matches!(
            state.back_to_carousel(),
            Err(WorkflowError::CommitInProgress)
        ));
    }

    #[test]
    fn test_summary_headline() {
        let mut state = in_carousel(1);
        state.accept().unwrap();
        assert_eq!(
            state.summary().headline(),
            "1 tarea original será reemplazada con 3 subtareas."
        );

        let mut two = in_carousel(2);
        two.remove_generated(0).unwrap();
        two.remove_generated(0).unwrap();
        assert_eq!(
            two.summary().headline(),
            "2 tareas originales serán reemplazadas con 4 subtareas."
        );
    }

    #[test]
    fn test_summary_skips_items_without_proposals() {
        let mut state = in_carousel(2);
        for _ in 0..3 {
            state.remove_generated(0).unwrap();
        }
        let summary = state.summary();
        assert_eq!(summary.originals.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].id, 1);
        assert_eq!(
            summary.headline(),
            "1 tarea original será reemplazada con 3 subtareas."
        );
    }
}
