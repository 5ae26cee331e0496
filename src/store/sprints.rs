use super::EntityStore;
use crate::errors::{ApiError, StoreError};
use crate::models::{IncompleteTasksAction, NewSprint, Sprint, SprintStatus, SprintUpdate, Task};

fn sprint_not_found(id: i64, err: ApiError) -> StoreError {
    if err.status() == Some(404) {
        StoreError::NotFound {
            entity: "Sprint",
            id,
        }
    } else {
        err.into()
    }
}

impl EntityStore {
    pub fn sprints(&self) -> Vec<Sprint> {
        self.state().sprints.to_vec()
    }

    pub fn get_sprint_by_id(&self, id: i64) -> Option<Sprint> {
        self.state().sprints.get(id).cloned()
    }

    pub async fn fetch_sprints(&self, team_id: Option<i64>) -> Result<Vec<Sprint>, StoreError> {
        let path = match team_id {
            Some(team) => format!("/sprints?teamId={}", team),
            None => "/sprints".to_string(),
        };
        let result = self.gateway.get::<Vec<Sprint>>(&path).await;
        let sprints = self.settle("fetch_sprints", result)?;
        self.state().sprints.replace_all(sprints.clone());
        Ok(sprints)
    }

    pub async fn fetch_sprint(&self, id: i64) -> Result<Sprint, StoreError> {
        let result = self
            .gateway
            .get::<Sprint>(&format!("/sprints/{}", id))
            .await
            .map_err(|e| sprint_not_found(id, e));
        let sprint = self.settle("fetch_sprint", result)?;
        self.state().sprints.upsert(sprint.clone());
        Ok(sprint)
    }

    /// Tasks of one sprint; merged into the task cache.
    pub async fn fetch_sprint_tasks(&self, id: i64) -> Result<Vec<Task>, StoreError> {
        let result = self
            .gateway
            .get::<Vec<Task>>(&format!("/sprints/{}/tasks", id))
            .await
            .map_err(|e| sprint_not_found(id, e));
        let tasks = self.settle("fetch_sprint_tasks", result)?;
        self.state().tasks.extend(tasks.clone());
        Ok(tasks)
    }

    pub async fn fetch_incomplete_tasks(&self, id: i64) -> Result<Vec<Task>, StoreError> {
        let result = self
            .gateway
            .get::<Vec<Task>>(&format!("/sprints/{}/incomplete-tasks", id))
            .await
            .map_err(|e| sprint_not_found(id, e));
        self.settle("fetch_incomplete_tasks", result)
    }

    pub async fn create_sprint(&self, new: &NewSprint) -> Result<Sprint, StoreError> {
        let result = self.gateway.post::<Sprint, _>("/sprints", new).await;
        let sprint = self.settle("create_sprint", result)?;
        self.state().sprints.upsert(sprint.clone());
        Ok(sprint)
    }

    pub async fn update_sprint(
        &self,
        id: i64,
        update: &SprintUpdate,
    ) -> Result<Sprint, StoreError> {
        let result = self
            .gateway
            .put::<Sprint, _>(&format!("/sprints/{}", id), update)
            .await
            .map_err(|e| sprint_not_found(id, e));
        let sprint = self.settle("update_sprint", result)?;
        self.state().sprints.upsert(sprint.clone());
        Ok(sprint)
    }

    pub async fn delete_sprint(&self, id: i64) -> Result<(), StoreError> {
        let result = self
            .gateway
            .delete(&format!("/sprints/{}", id))
            .await
            .map_err(|e| sprint_not_found(id, e));
        self.settle("delete_sprint", result)?;
        self.state().sprints.remove(id);
        Ok(())
    }

    pub async fn assign_tasks_to_sprint(
        &self,
        sprint_id: i64,
        task_ids: &[i64],
    ) -> Result<(), StoreError> {
        let body = serde_json::json!({ "taskIds": task_ids });
        let result = self
            .gateway
            .put_unit(&format!("/sprints/{}/tasks", sprint_id), &body)
            .await
            .map_err(|e| sprint_not_found(sprint_id, e));
        self.settle("assign_tasks_to_sprint", result)?;
        let mut state = self.state();
        for id in task_ids {
            state.tasks.update(*id, |task| task.sprint_id = Some(sprint_id));
        }
        Ok(())
    }

    pub async fn remove_task_from_sprint(
        &self,
        sprint_id: i64,
        task_id: i64,
    ) -> Result<(), StoreError> {
        let result = self
            .gateway
            .delete(&format!("/sprints/{}/tasks/{}", sprint_id, task_id))
            .await;
        self.settle("remove_task_from_sprint", result)?;
        self.state().tasks.update(task_id, |task| task.sprint_id = None);
        Ok(())
    }

    /// End a sprint. Unfinished tasks go back to the backlog or to the next
    /// sprint on the server; callers refetch tasks to see the result.
    pub async fn complete_sprint(
        &self,
        id: i64,
        action: IncompleteTasksAction,
    ) -> Result<(), StoreError> {
        if action.next_sprint() == Some(id) {
            return self.settle(
                "complete_sprint",
                Err(StoreError::BadRequest(
                    "the next sprint must differ from the sprint being completed".to_string(),
                )),
            );
        }
        let result = self
            .gateway
            .put_unit(&format!("/sprints/{}/end", id), &action.to_body())
            .await
            .map_err(|e| sprint_not_found(id, e));
        self.settle("complete_sprint", result)?;
        self.state()
            .sprints
            .update(id, |sprint| sprint.status = SprintStatus::Completed);
        Ok(())
    }
}
