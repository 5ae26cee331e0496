use super::EntityStore;
use crate::errors::StoreError;
use crate::models::{NewTeam, Team, TeamUpdate, User};

impl EntityStore {
    pub fn users(&self) -> Vec<User> {
        self.state().users.to_vec()
    }

    pub fn get_user_by_id(&self, id: i64) -> Option<User> {
        self.state().users.get(id).cloned()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().current_user.clone()
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>, StoreError> {
        let result = self.gateway.get::<Vec<User>>("/users").await;
        let users = self.settle("fetch_users", result)?;
        self.state().users.replace_all(users.clone());
        Ok(users)
    }

    pub async fn fetch_current_user(&self) -> Result<User, StoreError> {
        let result = self.gateway.get::<User>("/users/me").await;
        let user = self.settle("fetch_current_user", result)?;
        self.state().current_user = Some(user.clone());
        Ok(user)
    }

    pub async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let result = self
            .gateway
            .put::<User, _>(&format!("/users/{}", user.id), user)
            .await;
        let updated = self.settle("update_user", result)?;
        let mut state = self.state();
        state.users.upsert(updated.clone());
        if state.current_user.as_ref().map(|u| u.id) == Some(updated.id) {
            state.current_user = Some(updated.clone());
        }
        Ok(updated)
    }

    pub fn teams(&self) -> Vec<Team> {
        self.state().teams.to_vec()
    }

    pub fn get_team_by_id(&self, id: i64) -> Option<Team> {
        self.state().teams.get(id).cloned()
    }

    pub async fn fetch_teams(&self) -> Result<Vec<Team>, StoreError> {
        let result = self.gateway.get::<Vec<Team>>("/teams").await;
        let teams = self.settle("fetch_teams", result)?;
        self.state().teams.replace_all(teams.clone());
        Ok(teams)
    }

    pub async fn create_team(&self, new: &NewTeam) -> Result<Team, StoreError> {
        let result = self.gateway.post::<Team, _>("/teams", new).await;
        let team = self.settle("create_team", result)?;
        self.state().teams.upsert(team.clone());
        Ok(team)
    }

    pub async fn update_team(&self, id: i64, update: &TeamUpdate) -> Result<Team, StoreError> {
        let result = self
            .gateway
            .put::<Team, _>(&format!("/teams/{}", id), update)
            .await;
        let team = self.settle("update_team", result)?;
        self.state().teams.upsert(team.clone());
        Ok(team)
    }

    pub async fn delete_team(&self, id: i64) -> Result<(), StoreError> {
        let result = self.gateway.delete(&format!("/teams/{}", id)).await;
        self.settle("delete_team", result)?;
        self.state().teams.remove(id);
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
    async fn test_update_user_refreshes_current_user() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.respond(Method::GET, "/users/me", json!({"id": 1, "name": "Ana"}));
        gateway.respond(Method::PUT, "/users/1", json!({"id": 1, "name": "Ana M."}));
        let store = EntityStore::new(gateway);

        let me = store.fetch_current_user().await.unwrap();
        let mut edited = me.clone();
        edited.name = "Ana M.".into();
        store.update_user(&edited).await.unwrap();
        assert_eq!(store.current_user().unwrap().name, "Ana M.");
        assert_eq!(store.get_user_by_id(1).unwrap().name, "Ana M.");
    }

    #[tokio::test]
    async fn test_team_crud() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.respond(Method::GET, "/teams", json!([{"id": 1, "name": "Core"}]));
        gateway.respond(Method::POST, "/teams", json!({"id": 2, "name": "Mobile"}));
        gateway.respond(Method::PUT, "/teams/2", json!({"id": 2, "name": "Apps"}));
        gateway.respond(Method::DELETE, "/teams/1", serde_json::Value::Null);
        let store = EntityStore::new(gateway);

        store.fetch_teams().await.unwrap();
        store
            .create_team(&NewTeam {
                name: "Mobile".into(),
                description: None,
            })
            .await
            .unwrap();
        store
            .update_team(
                2,
                &TeamUpdate {
                    name: Some("Apps".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.delete_team(1).await.unwrap();

        let names: Vec<String> = store.teams().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Apps"]);
    }
}
