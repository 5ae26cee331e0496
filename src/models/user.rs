use serde::{Deserialize, Serialize};

use super::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
}

impl User {
    pub fn named(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: None,
            role: None,
            team_id: None,
            team_name: None,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role.as_deref() == Some("manager")
    }
}

impl Entity for User {
    const KIND: &'static str = "User";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity for Team {
    const KIND: &'static str = "Team";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accepts_spanish_name_key() {
        let user: User =
            serde_json::from_str(r#"{"id": 4, "nombre": "Carla", "role": "manager"}"#).unwrap();
        assert_eq!(user.name, "Carla");
        assert!(user.is_manager());
    }

    #[test]
    fn test_user_serializes_without_empty_optionals() {
        let body = serde_json::to_value(User::named(1, "Ana")).unwrap();
        assert_eq!(body, serde_json::json!({"id": 1, "name": "Ana"}));
    }
}
