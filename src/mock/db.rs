use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::{
    Comment, Kpi, NewSprint, NewTeam, Sprint, SprintStatus, SprintUpdate, Task, TaskTag, Team,
    TeamUpdate, User, status,
};

/// Create/update body of `/tasks`. Accepts both the camelCase entity keys
/// and the snake_case `team_id` / `assignee_ids` keys.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sprint_id: Option<i64>,
    pub team_id: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub assignees: Option<Vec<User>>,
    #[serde(rename = "team_id")]
    pub team_id_key: Option<i64>,
    #[serde(rename = "assignee_ids")]
    pub assignee_ids: Option<Vec<i64>>,
}

impl TaskRequest {
    fn team(&self) -> Option<i64> {
        self.team_id_key.or(self.team_id)
    }

    fn assignee_ids(&self) -> Option<Vec<i64>> {
        self.assignee_ids
            .clone()
            .or_else(|| self.assignees.as_ref().map(|a| a.iter().map(|u| u.id).collect()))
    }
}

/// In-memory board data behind the mock server.
#[derive(Debug, Default)]
pub struct BoardDb {
    tasks: Vec<Task>,
    sprints: Vec<Sprint>,
    comments: Vec<Comment>,
    users: Vec<User>,
    teams: Vec<Team>,
    current_user: Option<i64>,
    next_id: i64,
}

impl BoardDb {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// A small board: one team, three members, one active sprint and a
    /// handful of tasks in every status.
    pub fn seeded() -> Self {
        let mut db = Self::new();
        let team = db.insert_team("Equipo Alfa", Some("Equipo de desarrollo"));
        let manager = db.insert_user("Carla Ruiz", "carla@example.com", "manager", team);
        let dev = db.insert_user("Ana López", "ana@example.com", "developer", team);
        db.insert_user("Luis Pérez", "luis@example.com", "developer", team);
        let sprint = db.next_id();
        db.sprints.push(Sprint {
            id: sprint,
            name: "Sprint 1".to_string(),
            team_id: team,
            start_date: "2025-03-01".to_string(),
            end_date: "2025-03-14".to_string(),
            status: SprintStatus::Active,
        });

        let seed = [
            ("Implementar autenticación de usuarios con OAuth y gestión de sesiones", status::BACKLOG, 12.0, None),
            ("Diseñar pantalla de reportes", status::TO_DO, 6.0, Some(sprint)),
            ("Configurar pipeline de CI", status::IN_PROGRESS, 4.0, Some(sprint)),
            ("Corregir error en login", status::COMPLETED, 2.0, Some(sprint)),
        ];
        for (title, task_status, hours, sprint_id) in seed {
            let request = TaskRequest {
                title: Some(title.to_string()),
                status: Some(task_status.to_string()),
                start_date: Some("2025-03-01".to_string()),
                sprint_id,
                team_id: Some(team),
                estimated_hours: Some(hours),
                assignee_ids: Some(vec![dev]),
                ..TaskRequest::default()
            };
            if let Err(e) = db.create_task(request, Some(manager)) {
                tracing::warn!(error = %e, "failed to seed task");
            }
        }
        db
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_team(&mut self, name: &str, description: Option<&str>) -> i64 {
        let id = self.next_id();
        self.teams.push(Team {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
        });
        id
    }

    fn insert_user(&mut self, name: &str, email: &str, role: &str, team: i64) -> i64 {
        let id = self.next_id();
        let team_name = self.teams.iter().find(|t| t.id == team).map(|t| t.name.clone());
        self.users.push(User {
            id,
            name: name.to_string(),
            email: Some(email.to_string()),
            role: Some(role.to_string()),
            team_id: Some(team),
            team_name,
        });
        id
    }

    fn resolve_users(&self, ids: &[i64]) -> Vec<User> {
        ids.iter()
            .filter_map(|id| self.users.iter().find(|u| u.id == *id).cloned())
            .collect()
    }

    // Auth and users

    /// Any non-empty password is accepted for a known email.
    pub fn login(&mut self, email: &str, password: &str) -> Option<User> {
        if password.is_empty() {
            return None;
        }
        let user = self
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned()?;
        self.current_user = Some(user.id);
        Some(user)
    }

    /// The logged-in user, or the first user when nobody logged in.
    pub fn me(&self) -> Option<User> {
        match self.current_user {
            Some(id) => self.users.iter().find(|u| u.id == id).cloned(),
            None => self.users.first().cloned(),
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.users.clone()
    }

    pub fn update_user(&mut self, id: i64, mut user: User) -> Option<User> {
        let slot = self.users.iter_mut().find(|u| u.id == id)?;
        user.id = id;
        *slot = user.clone();
        Some(user)
    }

    // Teams

    pub fn teams(&self) -> Vec<Team> {
        self.teams.clone()
    }

    pub fn create_team(&mut self, new: NewTeam) -> Result<Team, String> {
        if new.name.trim().is_empty() {
            return Err("Team name is required".to_string());
        }
        let id = self.insert_team(&new.name, new.description.as_deref());
        Ok(Team {
            id,
            name: new.name,
            description: new.description,
        })
    }

    pub fn update_team(&mut self, id: i64, update: TeamUpdate) -> Option<Team> {
        let team = self.teams.iter_mut().find(|t| t.id == id)?;
        if let Some(name) = update.name {
            team.name = name;
        }
        if let Some(description) = update.description {
            team.description = Some(description);
        }
        Some(team.clone())
    }

    pub fn delete_team(&mut self, id: i64) -> bool {
        let before = self.teams.len();
        self.teams.retain(|t| t.id != id);
        before != self.teams.len()
    }

    // Tasks

    /// `view_mode` is `all`, `assigned` (current user) or `team`.
    pub fn list_tasks(&self, view_mode: &str, team_id: Option<i64>) -> Vec<Task> {
        match view_mode {
            "assigned" => {
                let me = self.me().map(|u| u.id);
                self.tasks
                    .iter()
                    .filter(|t| t.assignees.iter().any(|a| Some(a.id) == me))
                    .cloned()
                    .collect()
            }
            "team" => {
                let team = team_id.or_else(|| self.me().and_then(|u| u.team_id));
                self.tasks
                    .iter()
                    .filter(|t| team.is_none() || t.team_id == team)
                    .cloned()
                    .collect()
            }
            _ => self.tasks.clone(),
        }
    }

    pub fn get_task(&self, id: i64) -> Option<Task> {
        self.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn create_task(&mut self, request: TaskRequest, creator: Option<i64>) -> Result<Task, String> {
        let title = request
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "Title is required".to_string())?;
        let creator = creator.and_then(|id| self.users.iter().find(|u| u.id == id).cloned());
        let assignees = self.resolve_users(&request.assignee_ids().unwrap_or_default());
        let mut task = Task {
            id: self.next_id(),
            title,
            description: request.description.clone(),
            tag: request.tag.as_deref().map(TaskTag::from_loose).unwrap_or_default(),
            status: request.status.clone().unwrap_or_else(|| status::BACKLOG.to_string()),
            start_date: request.start_date.clone().unwrap_or_default(),
            end_date: request.end_date.clone(),
            sprint_id: request.sprint_id,
            team_id: request.team(),
            creator_id: creator.as_ref().map(|u| u.id),
            creator_name: creator.map(|u| u.name),
            estimated_hours: request.estimated_hours,
            actual_hours: request.actual_hours,
            assignees: Vec::new(),
        };
        task.set_assignees(assignees);
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update_task(&mut self, id: i64, request: TaskRequest) -> Option<Task> {
        let assignees = request.assignee_ids().map(|ids| self.resolve_users(&ids));
        let team = request.team();
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        if let Some(title) = request.title {
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = Some(description);
        }
        if let Some(tag) = request.tag {
            task.tag = TaskTag::from_loose(&tag);
        }
        if let Some(task_status) = request.status {
            task.status = task_status;
        }
        if let Some(start) = request.start_date {
            task.start_date = start;
        }
        if let Some(end) = request.end_date {
            task.end_date = Some(end);
        }
        if let Some(sprint) = request.sprint_id {
            task.sprint_id = Some(sprint);
        }
        if let Some(team) = team {
            task.team_id = Some(team);
        }
        if let Some(hours) = request.estimated_hours {
            task.estimated_hours = Some(hours);
        }
        if let Some(hours) = request.actual_hours {
            task.actual_hours = Some(hours);
        }
        if let Some(assignees) = assignees {
            task.set_assignees(assignees);
        }
        Some(task.clone())
    }

    pub fn set_task_status(&mut self, id: i64, new_status: &str) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.status = new_status.to_string();
        Some(task.clone())
    }

    pub fn delete_task(&mut self, id: i64) -> bool {
        self.delete_tasks(&[id]) == 1
    }

    /// Remove every listed task and its comments; returns how many existed.
    pub fn delete_tasks(&mut self, ids: &[i64]) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !ids.contains(&t.id));
        self.comments.retain(|c| !ids.contains(&c.task_id));
        before - self.tasks.len()
    }

    // Sprints

    pub fn sprints(&self, team_id: Option<i64>) -> Vec<Sprint> {
        self.sprints
            .iter()
            .filter(|s| team_id.is_none_or(|team| s.team_id == team))
            .cloned()
            .collect()
    }

    pub fn get_sprint(&self, id: i64) -> Option<Sprint> {
        self.sprints.iter().find(|s| s.id == id).cloned()
    }

    pub fn create_sprint(&mut self, new: NewSprint) -> Sprint {
        let id = self.next_id();
        let sprint = Sprint {
            id,
            name: new.name.unwrap_or_else(|| format!("Sprint {}", id)),
            team_id: new.team_id,
            start_date: new.start_date,
            end_date: new.end_date,
            status: new.status.unwrap_or_default(),
        };
        self.sprints.push(sprint.clone());
        sprint
    }

    pub fn update_sprint(&mut self, id: i64, update: SprintUpdate) -> Option<Sprint> {
        let sprint = self.sprints.iter_mut().find(|s| s.id == id)?;
        if let Some(name) = update.name {
            sprint.name = name;
        }
        if let Some(start) = update.start_date {
            sprint.start_date = start;
        }
        if let Some(end) = update.end_date {
            sprint.end_date = end;
        }
        if let Some(sprint_status) = update.status {
            sprint.status = sprint_status;
        }
        Some(sprint.clone())
    }

    /// Deleting a sprint sends its tasks back to the backlog.
    pub fn delete_sprint(&mut self, id: i64) -> bool {
        let before = self.sprints.len();
        self.sprints.retain(|s| s.id != id);
        if before == self.sprints.len() {
            return false;
        }
        for task in self.tasks.iter_mut().filter(|t| t.sprint_id == Some(id)) {
            task.sprint_id = None;
        }
        true
    }

    pub fn sprint_tasks(&self, id: i64) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.sprint_id == Some(id))
            .cloned()
            .collect()
    }

    pub fn incomplete_tasks(&self, id: i64) -> Vec<Task> {
        self.sprint_tasks(id)
            .into_iter()
            .filter(|t| t.status != status::COMPLETED && t.status != status::CANCELLED)
            .collect()
    }

    pub fn assign_to_sprint(&mut self, id: i64, task_ids: &[i64]) {
        for task in self.tasks.iter_mut().filter(|t| task_ids.contains(&t.id)) {
            task.sprint_id = Some(id);
        }
    }

    pub fn remove_from_sprint(&mut self, id: i64, task_id: i64) -> bool {
        match self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.sprint_id == Some(id))
        {
            Some(task) => {
                task.sprint_id = None;
                true
            }
            None => false,
        }
    }

    /// Complete a sprint, moving unfinished tasks to the backlog or to `next`.
    pub fn end_sprint(&mut self, id: i64, next: Option<i64>) -> Result<(), String> {
        if next == Some(id) {
            return Err("The next sprint must be a different sprint".to_string());
        }
        if let Some(next) = next
            && self.get_sprint(next).is_none()
        {
            return Err(format!("Sprint {} not found", next));
        }
        let incomplete: Vec<i64> = self.incomplete_tasks(id).iter().map(|t| t.id).collect();
        for task in self.tasks.iter_mut().filter(|t| incomplete.contains(&t.id)) {
            task.sprint_id = next;
            if next.is_none() {
                task.status = status::BACKLOG.to_string();
            }
        }
        if let Some(sprint) = self.sprints.iter_mut().find(|s| s.id == id) {
            sprint.status = SprintStatus::Completed;
        }
        Ok(())
    }

    // Comments

    pub fn comments(&self, task_id: i64) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn add_comment(&mut self, task_id: i64, content: &str) -> Result<Comment, String> {
        if content.trim().is_empty() {
            return Err("Comment content is required".to_string());
        }
        let author = self.me();
        let comment = Comment {
            id: self.next_id(),
            task_id,
            content: content.to_string(),
            creator_id: author.as_ref().map(|u| u.id),
            creator_name: author.map(|u| u.name),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn delete_comment(&mut self, id: i64) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != id);
        before != self.comments.len()
    }

    // KPIs

    /// Completion figures per assignee, or one row for the whole scope
    /// when `aggregated`.
    pub fn kpis(&self, sprint_id: Option<i64>, team_id: Option<i64>, aggregated: bool) -> Vec<Kpi> {
        let scope: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| match (sprint_id, team_id) {
                (Some(sprint), _) => t.sprint_id == Some(sprint),
                (None, Some(team)) => t.team_id == Some(team),
                (None, None) => true,
            })
            .collect();

        let mut rows: BTreeMap<String, Kpi> = BTreeMap::new();
        for task in &scope {
            let names: Vec<String> = if aggregated {
                vec!["Total".to_string()]
            } else {
                task.assignees.iter().map(|u| u.name.clone()).collect()
            };
            for name in names {
                let row = rows.entry(name.clone()).or_insert_with(|| Kpi {
                    member_name: name,
                    ..Kpi::default()
                });
                row.total_assigned_tasks += 1;
                if task.status == status::COMPLETED {
                    row.completed_tasks += 1;
                }
                row.total_actual_hours += task.actual_hours.unwrap_or(0.0);
                row.total_estimated_hours += task.estimated_hours.unwrap_or(0.0);
            }
        }
        rows.into_values()
            .map(|mut row| {
                row.completion_rate_percent =
                    row.completed_tasks as f64 * 100.0 / row.total_assigned_tasks as f64;
                row
            })
            .collect()
    }
}
