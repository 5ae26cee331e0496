use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::try_join_all;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::commit::{CommitReport, commit};
use super::params::{QueuedTask, SubtaskCount};
use super::state::{Step, WorkflowState};
use crate::ai::DivisionService;
use crate::errors::WorkflowError;
use crate::models::{Task, TaskUpdate};
use crate::store::TaskRepository;

/// Published on every state change. `state == None` means closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Instance counter; bumped on every open and close
    pub generation: u64,
    pub state: Option<WorkflowState>,
}

impl Snapshot {
    pub fn step(&self) -> Option<Step> {
        self.state.as_ref().map(WorkflowState::step)
    }
}

#[derive(Default)]
struct Inner {
    generation: u64,
    state: Option<WorkflowState>,
}

/// Controller of the divide wizard.
///
/// Transitions are synchronous and validated by `WorkflowState`. The two
/// awaiting operations (`start`/`redivide` and `confirm`) tag their work with
/// the generation that was current when they began; results arriving after
/// the instance closed or was replaced are dropped. The state lock is never
/// held across an await.
pub struct DivideWorkflow {
    divider: Arc<dyn DivisionService>,
    repository: Arc<dyn TaskRepository>,
    inner: Mutex<Inner>,
    events: watch::Sender<Snapshot>,
}

impl DivideWorkflow {
    pub fn new(divider: Arc<dyn DivisionService>, repository: Arc<dyn TaskRepository>) -> Self {
        let (events, _) = watch::channel(Snapshot::default());
        Self {
            divider,
            repository,
            inner: Mutex::new(Inner::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            generation: inner.generation,
            state: inner.state.clone(),
        }
    }

    pub fn state(&self) -> Option<WorkflowState> {
        self.lock().state.clone()
    }

    pub fn is_open(&self) -> bool {
        self.lock().state.is_some()
    }

    pub fn step(&self) -> Option<Step> {
        self.lock().state.as_ref().map(WorkflowState::step)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, inner: &Inner) {
        self.events.send_replace(Snapshot {
            generation: inner.generation,
            state: inner.state.clone(),
        });
    }

    /// Run a transition on the open instance and publish the result.
    fn transition<T>(
        &self,
        f: impl FnOnce(&mut WorkflowState) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let mut inner = self.lock();
        let state = inner.state.as_mut().ok_or(WorkflowError::Closed)?;
        let out = f(state)?;
        self.publish(&inner);
        Ok(out)
    }

    /// Like `transition`, but only if `generation` is still the open instance.
    fn transition_at<T>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut WorkflowState) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state.is_none() {
            warn!(
                generation,
                current = inner.generation,
                "discarding result for a closed divide workflow"
            );
            return Err(WorkflowError::Closed);
        }
        let state = inner.state.as_mut().ok_or(WorkflowError::Closed)?;
        let out = f(state)?;
        self.publish(&inner);
        Ok(out)
    }

    fn close_generation(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state.is_some() {
            inner.generation += 1;
            inner.state = None;
            self.publish(&inner);
        }
    }

    /// Open a fresh instance in the queue step, replacing any open one.
    pub fn open(&self, tasks: Vec<QueuedTask>) -> Result<u64, WorkflowError> {
        if tasks.is_empty() {
            return Err(WorkflowError::EmptyQueue);
        }
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = Some(WorkflowState::new(tasks));
        info!(generation = inner.generation, "divide workflow opened");
        self.publish(&inner);
        Ok(inner.generation)
    }

    /// Open and immediately start dividing.
    pub async fn open_loading(&self, tasks: Vec<QueuedTask>) -> Result<(), WorkflowError> {
        self.open(tasks)?;
        self.start().await
    }

    /// Close the open instance from any step. Pending results are discarded.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state.is_some() {
            inner.generation += 1;
            inner.state = None;
            info!(generation = inner.generation, "divide workflow closed");
            self.publish(&inner);
        }
    }

    /// Remove a queued task; closes the workflow when the queue empties.
    pub fn remove_task(&self, id: i64) -> Result<(), WorkflowError> {
        let emptied = self.transition(|s| s.remove_task(id))?;
        if emptied {
            info!("division queue emptied");
            self.close();
        }
        Ok(())
    }

    pub fn set_subtasks(&self, id: i64, subtasks: SubtaskCount) -> Result<(), WorkflowError> {
        self.transition(|s| s.set_subtasks(id, subtasks))
    }

    pub fn set_context(&self, id: i64, context: &str) -> Result<(), WorkflowError> {
        self.transition(|s| s.set_context(id, context))
    }

    /// `queue → loading → carousel`. Every queued task is divided
    /// concurrently; the first failure closes the workflow.
    pub async fn start(&self) -> Result<(), WorkflowError> {
        let (generation, requests) = {
            let mut inner = self.lock();
            let generation = inner.generation;
            let state = inner.state.as_mut().ok_or(WorkflowError::Closed)?;
            let requests = state.begin_loading()?;
            self.publish(&inner);
            (generation, requests)
        };
        info!(generation, tasks = requests.len(), "dividing tasks");

        let divider = &self.divider;
        let results = try_join_all(requests.iter().map(|q| {
            divider.divide_task(&q.task, q.params.subtasks, &q.params.context)
        }))
        .await;

        match results {
            Ok(generated) => self.transition_at(generation, |s| s.finish_loading(generated)),
            Err(e) => {
                error!(generation, error = %e, "division failed, closing workflow");
                self.close_generation(generation);
                Err(e.into())
            }
        }
    }

    /// Re-run the division of the current carousel item only.
    pub async fn redivide(&self) -> Result<(), WorkflowError> {
        let (generation, (index, original, params)) = {
            let mut inner = self.lock();
            let generation = inner.generation;
            let state = inner.state.as_mut().ok_or(WorkflowError::Closed)?;
            let request = state.begin_redivide()?;
            self.publish(&inner);
            (generation, request)
        };
        info!(generation, index, task_id = original.id, "re-dividing task");

        match self
            .divider
            .divide_task(&original, params.subtasks, &params.context)
            .await
        {
            Ok(generated) => self.transition_at(generation, |s| s.finish_redivide(generated)),
            Err(e) => {
                error!(generation, task_id = original.id, error = %e, "re-divide failed, closing workflow");
                self.close_generation(generation);
                Err(e.into())
            }
        }
    }

    pub fn accept(&self) -> Result<(), WorkflowError> {
        self.transition(WorkflowState::accept)
    }

    pub fn next(&self) -> Result<(), WorkflowError> {
        self.transition(WorkflowState::next)
    }

    pub fn previous(&self) -> Result<(), WorkflowError> {
        self.transition(WorkflowState::previous)
    }

    pub fn go_to(&self, index: usize) -> Result<(), WorkflowError> {
        self.transition(|s| s.go_to(index))
    }

    pub fn edit_generated(&self, index: usize, task: Task) -> Result<(), WorkflowError> {
        self.transition(|s| s.edit_generated(index, task))
    }

    pub fn update_generated(&self, index: usize, update: &TaskUpdate) -> Result<(), WorkflowError> {
        self.transition(|s| s.update_generated(index, update))
    }

    pub fn remove_generated(&self, index: usize) -> Result<Task, WorkflowError> {
        self.transition(|s| s.remove_generated(index))
    }

    /// `summary → carousel` at the last item.
    pub fn back(&self) -> Result<(), WorkflowError> {
        self.transition(WorkflowState::back_to_carousel)
    }

    /// Discard the division from the summary; the store is not touched.
    pub fn cancel(&self) -> Result<(), WorkflowError> {
        self.transition(|s| s.ensure_cancellable())?;
        self.close();
        Ok(())
    }

    /// Commit the division, then close whatever the outcome.
    pub async fn confirm(&self) -> Result<CommitReport, WorkflowError> {
        let (generation, items) = {
            let mut inner = self.lock();
            let generation = inner.generation;
            let state = inner.state.as_mut().ok_or(WorkflowError::Closed)?;
            let items = state.begin_commit()?;
            self.publish(&inner);
            (generation, items)
        };

        let report = commit(self.repository.as_ref(), &items).await;
        self.close_generation(generation);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::TaskRecommendation;
    use crate::errors::{DivisionError, StoreError};
    use crate::models::NewTask;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl DivisionService for Echo {
        async fn divide_task(
            &self,
            task: &Task,
            subtask_count: SubtaskCount,
            _additional_context: &str,
        ) -> Result<Vec<Task>, DivisionError> {
            Ok((0..subtask_count.get() as i64)
                .map(|i| {
                    let mut t = task.clone();
                    t.id = -(i + 1);
                    t.title = format!("{} part {}", task.title, i + 1);
                    t
                })
                .collect())
        }

        async fn analyze_tasks(
            &self,
            _tasks: &[Task],
            _subtask_count: SubtaskCount,
            _additional_context: &str,
        ) -> Result<Vec<TaskRecommendation>, DivisionError> {
            Ok(Vec::new())
        }
    }

    struct NoStore;

    #[async_trait]
    impl TaskRepository for NoStore {
        async fn delete_tasks(&self, _ids: &[i64]) -> Result<(), StoreError> {
            Ok(())
        }

        async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
            Ok(serde_json::from_value(serde_json::json!({
                "id": 100, "title": task.title, "status": task.status
            }))
            .unwrap())
        }
    }

    fn task(id: i64) -> Task {
        serde_json::from_value(serde_json::json!({
            "id": id, "title": format!("T{}", id), "status": "Backlog"
        }))
        .unwrap()
    }

    fn workflow() -> DivideWorkflow {
        DivideWorkflow::new(Arc::new(Echo), Arc::new(NoStore))
    }

    #[test]
    fn test_open_empty_rejected() {
        let wf = workflow();
        assert!(matches!(wf.open(vec![]), Err(WorkflowError::EmptyQueue)));
        assert!(!wf.is_open());
    }

    #[test]
    fn test_actions_on_closed_workflow() {
        let wf = workflow();
        assert!(matches!(wf.accept(), Err(WorkflowError::Closed)));
        assert!(matches!(wf.remove_task(1), Err(WorkflowError::Closed)));
    }

    #[test]
    fn test_open_replaces_instance_and_bumps_generation() {
        let wf = workflow();
        let first = wf.open(vec![QueuedTask::new(task(1))]).unwrap();
        let second = wf.open(vec![QueuedTask::new(task(2))]).unwrap();
        assert!(second > first);
        assert_eq!(wf.state().unwrap().queue()[0].task.id, 2);
    }

    #[test]
    fn test_removing_last_task_closes() {
        let wf = workflow();
        wf.open(vec![QueuedTask::new(task(1))]).unwrap();
        wf.remove_task(1).unwrap();
        assert!(!wf.is_open());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let wf = workflow();
        let mut rx = wf.subscribe();
        wf.open(vec![QueuedTask::new(task(1))]).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().step(), Some(Step::Queue));

        wf.start().await.unwrap();
        assert_eq!(rx.borrow_and_update().step(), Some(Step::Carousel));

        wf.close();
        assert_eq!(rx.borrow_and_update().step(), None);
    }

    #[tokio::test]
    async fn test_open_loading_goes_straight_to_carousel() {
        let wf = workflow();
        wf.open_loading(vec![QueuedTask::new(task(1))]).await.unwrap();
        assert_eq!(wf.step(), Some(Step::Carousel));
    }

    #[tokio::test]
    async fn test_cancel_only_from_summary() {
        let wf = workflow();
        wf.open_loading(vec![QueuedTask::new(task(1))]).await.unwrap();
        assert!(matches!(
            wf.cancel(),
            Err(WorkflowError::InvalidTransition {
                step: Step::Carousel,
                ..
            })
        ));
        wf.accept().unwrap();
        wf.cancel().unwrap();
        assert!(!wf.is_open());
    }

    #[tokio::test]
    async fn test_confirm_closes_and_reports() {
        let wf = workflow();
        wf.open_loading(vec![QueuedTask::new(task(1))]).await.unwrap();
        wf.accept().unwrap();
        let report = wf.confirm().await.unwrap();
        assert_eq!(report.deleted, vec![1]);
        assert_eq!(report.created.len(), 3);
        assert!(!wf.is_open());
    }
}
