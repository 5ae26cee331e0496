use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::{Entity, User};

/// Canonical task status values. Status is free-form on the wire.
pub mod status {
    pub const BACKLOG: &str = "Backlog";
    pub const TO_DO: &str = "To Do";
    pub const IN_PROGRESS: &str = "En progreso";
    pub const COMPLETED: &str = "Completada";
    pub const CANCELLED: &str = "Cancelada";

    pub const ALL: [&str; 5] = [BACKLOG, TO_DO, IN_PROGRESS, COMPLETED, CANCELLED];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskTag {
    #[default]
    Feature,
    Issue,
}

impl TaskTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "Feature",
            Self::Issue => "Issue",
        }
    }

    /// Lenient parse used for AI output: case-insensitive, unknown → `Feature`.
    pub fn from_loose(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for TaskTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(Self::Feature),
            "issue" => Ok(Self::Issue),
            _ => Err(format!("Invalid tag: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "tag_lenient")]
    pub tag: TaskTag,
    pub status: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub sprint_id: Option<i64>,
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub creator_id: Option<i64>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default, deserialize_with = "unique_assignees")]
    pub assignees: Vec<User>,
}

impl Task {
    /// Only tasks that have not started are offered for division.
    pub fn is_divisible(&self) -> bool {
        self.status == status::BACKLOG || self.status == status::TO_DO
    }

    /// Replace the assignee set, keeping the first occurrence of each id.
    pub fn set_assignees(&mut self, assignees: Vec<User>) {
        self.assignees = dedup_by_id(assignees);
    }

    pub fn assignee_names(&self) -> Vec<&str> {
        self.assignees.iter().map(|u| u.name.as_str()).collect()
    }
}

impl Entity for Task {
    const KIND: &'static str = "Task";

    fn id(&self) -> i64 {
        self.id
    }
}

fn dedup_by_id(users: Vec<User>) -> Vec<User> {
    let mut seen = HashSet::new();
    users.into_iter().filter(|u| seen.insert(u.id)).collect()
}

fn unique_assignees<'de, D>(deserializer: D) -> Result<Vec<User>, D::Error>
where
    D: Deserializer<'de>,
{
    let users: Option<Vec<User>> = Option::deserialize(deserializer)?;
    Ok(dedup_by_id(users.unwrap_or_default()))
}

fn tag_lenient<'de, D>(deserializer: D) -> Result<TaskTag, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(TaskTag::from_loose).unwrap_or_default())
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tag: TaskTag,
    pub status: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    pub assignees: Vec<User>,
}

impl NewTask {
    pub fn new(title: &str, status: &str, start_date: &str) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            tag: TaskTag::Feature,
            status: status.to_string(),
            start_date: start_date.to_string(),
            end_date: None,
            sprint_id: None,
            team_id: None,
            estimated_hours: None,
            actual_hours: None,
            assignees: Vec::new(),
        }
    }

    /// JSON body as the server reads it: camelCase fields plus the
    /// snake_case `team_id` / `assignee_ids` keys.
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = body.as_object_mut() {
            if let Some(team_id) = self.team_id {
                map.insert("team_id".to_string(), team_id.into());
            }
            let ids: Vec<i64> = self.assignees.iter().map(|u| u.id).collect();
            map.insert("assignee_ids".to_string(), ids.into());
        }
        body
    }
}

/// Body of `PUT /tasks/{id}`; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TaskTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "team_id")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "assignee_ids")]
    pub assignee_ids: Option<Vec<i64>>,
}

impl TaskUpdate {
    /// Apply the set fields onto a cached task.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(tag) = self.tag {
            task.tag = tag;
        }
        if let Some(status) = &self.status {
            task.status = status.clone();
        }
        if let Some(start) = &self.start_date {
            task.start_date = start.clone();
        }
        if let Some(end) = &self.end_date {
            task.end_date = Some(end.clone());
        }
        if let Some(sprint_id) = self.sprint_id {
            task.sprint_id = Some(sprint_id);
        }
        if let Some(team_id) = self.team_id {
            task.team_id = Some(team_id);
        }
        if let Some(hours) = self.estimated_hours {
            task.estimated_hours = Some(hours);
        }
        if let Some(hours) = self.actual_hours {
            task.actual_hours = Some(hours);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserializes_camel_case() {
        let json = r#"{
            "id": 12,
            "title": "Login page",
            "tag": "Feature",
            "status": "Backlog",
            "startDate": "2025-03-01",
            "endDate": null,
            "sprintId": 4,
            "teamId": 2,
            "creatorName": "Ana",
            "estimatedHours": 6.5,
            "assignees": [{"id": 1, "name": "Ana"}]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 12);
        assert_eq!(task.sprint_id, Some(4));
        assert_eq!(task.team_id, Some(2));
        assert_eq!(task.estimated_hours, Some(6.5));
        assert_eq!(task.actual_hours, None);
        assert_eq!(task.assignee_names(), vec!["Ana"]);
    }

    #[test]
    fn test_task_assignees_unique_by_id() {
        let json = r#"{
            "id": 1, "title": "t", "status": "Backlog",
            "assignees": [{"id": 3, "name": "Luis"}, {"id": 3, "name": "Luis"}, {"id": 5, "name": "Eva"}]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.assignees.len(), 2);
        assert_eq!(task.assignees[0].id, 3);
        assert_eq!(task.assignees[1].id, 5);
    }

    #[test]
    fn test_task_null_assignees_and_lowercase_tag() {
        let json = r#"{"id": 1, "title": "t", "status": "To Do", "tag": "issue", "assignees": null}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(task.assignees.is_empty());
        assert_eq!(task.tag, TaskTag::Issue);
        assert!(task.is_divisible());
    }

    #[test]
    fn test_tag_from_loose() {
        assert_eq!(TaskTag::from_loose("feature"), TaskTag::Feature);
        assert_eq!(TaskTag::from_loose("ISSUE"), TaskTag::Issue);
        assert_eq!(TaskTag::from_loose("chore"), TaskTag::Feature);
        assert!("chore".parse::<TaskTag>().is_err());
    }

    #[test]
    fn test_new_task_body_has_snake_case_keys() {
        let mut new = NewTask::new("Subtask", status::BACKLOG, "2025-03-01");
        new.team_id = Some(2);
        new.sprint_id = Some(9);
        new.assignees = vec![User::named(7, "Ana")];
        let body = new.to_body();
        assert_eq!(body["teamId"], 2);
        assert_eq!(body["team_id"], 2);
        assert_eq!(body["sprintId"], 9);
        assert_eq!(body["assignee_ids"], serde_json::json!([7]));
        assert!(body.get("description").is_none());
    }

    #[test]
    fn test_task_update_serializes_only_set_fields() {
        let update = TaskUpdate {
            status: Some(status::IN_PROGRESS.to_string()),
            assignee_ids: Some(vec![1, 2]),
            ..Default::default()
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "En progreso", "assignee_ids": [1, 2]})
        );
    }

    #[test]
    fn test_task_update_apply_to() {
        let mut task: Task =
            serde_json::from_str(r#"{"id": 1, "title": "old", "status": "Backlog"}"#).unwrap();
        let update = TaskUpdate {
            title: Some("new".into()),
            actual_hours: Some(2.0),
            ..Default::default()
        };
        update.apply_to(&mut task);
        assert_eq!(task.title, "new");
        assert_eq!(task.actual_hours, Some(2.0));
        assert_eq!(task.status, "Backlog");
    }
}
