use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Entity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SprintStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
        }
    }
}

impl FromStr for SprintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PLANNED" => Ok(Self::Planned),
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("Invalid sprint status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub team_id: i64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub status: SprintStatus,
}

impl Entity for Sprint {
    const KIND: &'static str = "Sprint";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub team_id: i64,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SprintStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SprintStatus>,
}

/// What to do with unfinished tasks when a sprint ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteTasksAction {
    MoveToBacklog,
    MoveToNextSprint(i64),
}

impl IncompleteTasksAction {
    /// Body of `PUT /sprints/{id}/end`.
    pub fn to_body(&self) -> serde_json::Value {
        match self {
            Self::MoveToBacklog => serde_json::json!({"incompleteTasksAction": "moveToBacklog"}),
            Self::MoveToNextSprint(next) => serde_json::json!({
                "incompleteTasksAction": "moveToNextSprint",
                "nextSprintId": next,
            }),
        }
    }

    pub fn next_sprint(&self) -> Option<i64> {
        match self {
            Self::MoveToBacklog => None,
            Self::MoveToNextSprint(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprint_status_wire_format() {
        let sprint: Sprint = serde_json::from_str(
            r#"{"id": 1, "name": "S1", "teamId": 2, "startDate": "2025-01-01", "endDate": "2025-01-14", "status": "ACTIVE"}"#,
        )
        .unwrap();
        assert_eq!(sprint.status, SprintStatus::Active);
        assert_eq!("completed".parse::<SprintStatus>(), Ok(SprintStatus::Completed));
    }

    #[test]
    fn test_end_sprint_body() {
        assert_eq!(
            IncompleteTasksAction::MoveToBacklog.to_body(),
            serde_json::json!({"incompleteTasksAction": "moveToBacklog"})
        );
        let next = IncompleteTasksAction::MoveToNextSprint(8);
        assert_eq!(next.to_body()["nextSprintId"], 8);
        assert_eq!(next.next_sprint(), Some(8));
    }
}
