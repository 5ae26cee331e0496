//! Entity store: in-memory cache of server entities.
//!
//! Every mutating operation calls the gateway first and reconciles the cache
//! only on success. A failure leaves the cache untouched, records its message
//! in the shared `error` slot and is returned to the caller. The state lock is
//! never held across an await.

mod cache;
mod comments;
mod kpis;
mod sprints;
mod tasks;
mod users;

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::warn;

pub use cache::EntityCache;
pub use kpis::KpiFilter;
pub use tasks::TaskView;

use crate::api::Gateway;
use crate::errors::StoreError;
use crate::models::{Comment, Kpi, NewTask, Sprint, Task, Team, User};

/// The slice of the store the divide workflow commits through.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn delete_tasks(&self, ids: &[i64]) -> Result<(), StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;
}

#[derive(Default)]
struct StoreState {
    tasks: EntityCache<Task>,
    sprints: EntityCache<Sprint>,
    comments: EntityCache<Comment>,
    users: EntityCache<User>,
    teams: EntityCache<Team>,
    kpis: Vec<Kpi>,
    current_user: Option<User>,
    error: Option<String>,
}

pub struct EntityStore {
    gateway: Arc<dyn Gateway>,
    state: Mutex<StoreState>,
}

impl EntityStore {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Message of the most recent failed operation, cleared by the next success.
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn clear_error(&self) {
        self.state().error = None;
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the outcome of an operation in the error slot.
    fn settle<T, E: Into<StoreError>>(
        &self,
        action: &str,
        result: Result<T, E>,
    ) -> Result<T, StoreError> {
        let result = result.map_err(Into::into);
        let mut state = self.state();
        match &result {
            Ok(_) => state.error = None,
            Err(e) => {
                warn!(action, error = %e, "store operation failed");
                state.error = Some(e.to_string());
            }
        }
        result
    }
}

#[async_trait]
impl TaskRepository for EntityStore {
    async fn delete_tasks(&self, ids: &[i64]) -> Result<(), StoreError> {
        EntityStore::delete_tasks(self, ids).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        EntityStore::create_task(self, task).await
    }
}
