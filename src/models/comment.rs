use serde::{Deserialize, Serialize};

use super::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub content: String,
    #[serde(default)]
    pub creator_id: Option<i64>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Entity for Comment {
    const KIND: &'static str = "Comment";

    fn id(&self) -> i64 {
        self.id
    }
}
