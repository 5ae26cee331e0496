use super::EntityStore;
use crate::errors::StoreError;
use crate::models::Comment;

impl EntityStore {
    pub fn comments_for_task(&self, task_id: i64) -> Vec<Comment> {
        self.state()
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Replace the cached comments of one task.
    pub async fn fetch_comments(&self, task_id: i64) -> Result<Vec<Comment>, StoreError> {
        let result = self
            .gateway
            .get::<Vec<Comment>>(&format!("/comments/task/{}", task_id))
            .await;
        let comments = self.settle("fetch_comments", result)?;
        let mut state = self.state();
        state.comments.retain(|c| c.task_id != task_id);
        state.comments.extend(comments.clone());
        Ok(comments)
    }

    pub async fn add_comment(&self, task_id: i64, content: &str) -> Result<Comment, StoreError> {
        if content.trim().is_empty() {
            return self.settle(
                "add_comment",
                Err(StoreError::BadRequest("comment is empty".to_string())),
            );
        }
        let body = serde_json::json!({ "content": content });
        let result = self
            .gateway
            .post::<Comment, _>(&format!("/comments/task/{}", task_id), &body)
            .await;
        let comment = self.settle("add_comment", result)?;
        self.state().comments.upsert(comment.clone());
        Ok(comment)
    }

    pub async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        let result = self.gateway.delete(&format!("/comments/{}", id)).await;
        self.settle("delete_comment", result)?;
        self.state().comments.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::store::testing::FakeGateway;

    #[tokio::test]
    async fn test_comments_are_scoped_per_task() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.respond(
            Method::GET,
            "/comments/task/1",
            json!([{"id": 1, "taskId": 1, "content": "first"}]),
        );
        gateway.respond(
            Method::GET,
            "/comments/task/2",
            json!([{"id": 2, "taskId": 2, "content": "other"}]),
        );
        gateway.respond(
            Method::POST,
            "/comments/task/1",
            json!({"id": 3, "taskId": 1, "content": "second", "creatorName": "Ana"}),
        );
        let store = EntityStore::new(gateway.clone());
        store.fetch_comments(1).await.unwrap();
        store.fetch_comments(2).await.unwrap();
        store.add_comment(1, "second").await.unwrap();

        let contents: Vec<String> = store
            .comments_for_task(1)
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(store.comments_for_task(2).len(), 1);
        let (_, _, body) = gateway.calls().pop().unwrap();
        assert_eq!(body, Some(json!({"content": "second"})));
    }

    #[tokio::test]
    async fn test_empty_comment_rejected_locally() {
        let gateway = Arc::new(FakeGateway::default());
        let store = EntityStore::new(gateway.clone());
        assert!(store.add_comment(1, "   ").await.is_err());
        assert!(gateway.calls().is_empty());
    }
}
