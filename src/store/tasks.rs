use serde::Deserialize;
use tracing::info;

use super::EntityStore;
use crate::errors::StoreError;
use crate::models::{NewTask, Task, TaskUpdate};

/// Which slice of tasks `GET /tasks` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskView {
    #[default]
    All,
    Assigned,
    Team(Option<i64>),
}

impl TaskView {
    pub fn path(&self) -> String {
        match self {
            TaskView::All => "/tasks?view_mode=all".to_string(),
            TaskView::Assigned => "/tasks?view_mode=assigned".to_string(),
            TaskView::Team(None) => "/tasks?view_mode=team".to_string(),
            TaskView::Team(Some(team)) => format!("/tasks?view_mode=team&team_id={}", team),
        }
    }
}

fn not_found(id: i64, err: crate::errors::ApiError) -> StoreError {
    if err.status() == Some(404) {
        StoreError::NotFound { entity: "Task", id }
    } else {
        err.into()
    }
}

/// `PUT /tasks/{id}/status` answers with either the task or `{task: ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusReply {
    Task(Box<Task>),
    Wrapped { task: Box<Task> },
}

impl EntityStore {
    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.to_vec()
    }

    pub fn get_task_by_id(&self, id: i64) -> Option<Task> {
        self.state().tasks.get(id).cloned()
    }

    /// Replace the task cache with the server's list for `view`.
    pub async fn fetch_tasks(&self, view: TaskView) -> Result<Vec<Task>, StoreError> {
        let result = self.gateway.get::<Vec<Task>>(&view.path()).await;
        let tasks = self.settle("fetch_tasks", result)?;
        self.state().tasks.replace_all(tasks.clone());
        Ok(tasks)
    }

    pub async fn fetch_task(&self, id: i64) -> Result<Task, StoreError> {
        let result = self
            .gateway
            .get::<Task>(&format!("/tasks/{}", id))
            .await
            .map_err(|e| not_found(id, e));
        let task = self.settle("fetch_task", result)?;
        self.state().tasks.upsert(task.clone());
        Ok(task)
    }

    pub async fn create_task(&self, new: NewTask) -> Result<Task, StoreError> {
        if new.title.trim().is_empty() {
            return self.settle(
                "create_task",
                Err(StoreError::BadRequest("task title is required".to_string())),
            );
        }
        let result = self.gateway.post::<Task, _>("/tasks", &new.to_body()).await;
        let task = self.settle("create_task", result)?;
        self.state().tasks.upsert(task.clone());
        Ok(task)
    }

    pub async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task, StoreError> {
        let result = self
            .gateway
            .put::<Task, _>(&format!("/tasks/{}", id), update)
            .await
            .map_err(|e| not_found(id, e));
        let task = self.settle("update_task", result)?;
        self.state().tasks.upsert(task.clone());
        Ok(task)
    }

    pub async fn update_task_status(&self, id: i64, status: &str) -> Result<Task, StoreError> {
        let body = serde_json::json!({ "status": status });
        let result = self
            .gateway
            .put::<StatusReply, _>(&format!("/tasks/{}/status", id), &body)
            .await
            .map_err(|e| not_found(id, e));
        let task = match self.settle("update_task_status", result)? {
            StatusReply::Task(task) | StatusReply::Wrapped { task } => *task,
        };
        self.state().tasks.upsert(task.clone());
        Ok(task)
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        let result = self
            .gateway
            .delete(&format!("/tasks/{}", id))
            .await
            .map_err(|e| not_found(id, e));
        self.settle("delete_task", result)?;
        self.state().tasks.remove(id);
        Ok(())
    }

    /// One bulk `DELETE /tasks` carrying every id. An empty list is a no-op.
    pub async fn delete_tasks(&self, ids: &[i64]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let result = self.gateway.delete_many("/tasks", ids).await;
        self.settle("delete_tasks", result)?;
        let removed = self.state().tasks.remove_many(ids);
        info!(requested = ids.len(), removed, "bulk deleted tasks");
        Ok(())
    }
}
