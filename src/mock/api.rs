use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use serde_json::json;

use super::db::{BoardDb, TaskRequest};
use crate::ai::rank_candidates;
use crate::models::{NewSprint, NewTeam, SprintUpdate, Task, TeamUpdate, User};

// Shared application state

pub struct MockState {
    pub db: Mutex<BoardDb>,
}

impl MockState {
    pub fn new(db: BoardDb) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> MutexGuard<'_, BoardDb> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub type SharedState = Arc<MockState>;

// Request payload types

#[derive(Deserialize)]
pub struct TaskQuery {
    pub view_mode: Option<String>,
    pub team_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamQuery {
    pub team_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiQuery {
    pub sprint_id: Option<i64>,
    pub team_id: Option<i64>,
    #[serde(default)]
    pub aggregated: bool,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub task_ids: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSprintRequest {
    pub incomplete_tasks_action: String,
    pub next_sprint_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomizeRequest {
    pub task_description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

// Error handling

pub enum HandlerError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HandlerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HandlerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HandlerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

fn not_found(entity: &str, id: i64) -> HandlerError {
    HandlerError::NotFound(format!("{} {} not found", entity, id))
}

// Router

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task).delete(delete_tasks))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/status", put(update_task_status))
        .route("/sprints", get(list_sprints).post(create_sprint))
        .route(
            "/sprints/{id}",
            get(get_sprint).put(update_sprint).delete(delete_sprint),
        )
        .route("/sprints/{id}/tasks", get(sprint_tasks).put(assign_tasks))
        .route("/sprints/{id}/tasks/{task_id}", delete(remove_sprint_task))
        .route("/sprints/{id}/incomplete-tasks", get(incomplete_tasks))
        .route("/sprints/{id}/end", put(end_sprint))
        .route("/comments/task/{task_id}", get(list_comments).post(add_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/users", get(list_users))
        .route("/users/me", get(current_user))
        .route("/users/{id}", put(update_user))
        .route("/teams", get(list_teams).post(create_team))
        .route("/teams/{id}", put(update_team).delete(delete_team))
        .route("/kpis/completion-rate", get(completion_rate))
        .route("/auth/login", post(login))
        .route("/gemini/atomize", post(atomize))
        .route("/gemini/analyze-tasks", post(analyze_tasks))
}

// Tasks

async fn list_tasks(
    State(state): State<SharedState>,
    Query(query): Query<TaskQuery>,
) -> Json<Vec<Task>> {
    let view = query.view_mode.as_deref().unwrap_or("all");
    Json(state.db().list_tasks(view, query.team_id))
}

async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let task = state.db().get_task(id).ok_or_else(|| not_found("Task", id))?;
    Ok(Json(task))
}

async fn create_task(
    State(state): State<SharedState>,
    Json(req): Json<TaskRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut db = state.db();
    let creator = db.me().map(|u| u.id);
    let task = db.create_task(req, creator).map_err(HandlerError::BadRequest)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<TaskRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let task = state
        .db()
        .update_task(id, req)
        .ok_or_else(|| not_found("Task", id))?;
    Ok(Json(task))
}

async fn update_task_status(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let task = state
        .db()
        .set_task_status(id, &req.status)
        .ok_or_else(|| not_found("Task", id))?;
    Ok(Json(json!({"message": "Status updated", "task": task})))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.db().delete_task(id) {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Task", id)),
    }
}

async fn delete_tasks(
    State(state): State<SharedState>,
    Json(ids): Json<Vec<i64>>,
) -> StatusCode {
    let deleted = state.db().delete_tasks(&ids);
    tracing::debug!(requested = ids.len(), deleted, "bulk delete");
    StatusCode::NO_CONTENT
}

// Sprints

async fn list_sprints(
    State(state): State<SharedState>,
    Query(query): Query<TeamQuery>,
) -> impl IntoResponse {
    Json(state.db().sprints(query.team_id))
}

async fn get_sprint(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let sprint = state.db().get_sprint(id).ok_or_else(|| not_found("Sprint", id))?;
    Ok(Json(sprint))
}

async fn create_sprint(
    State(state): State<SharedState>,
    Json(req): Json<NewSprint>,
) -> impl IntoResponse {
    (StatusCode::CREATED, Json(state.db().create_sprint(req)))
}

async fn update_sprint(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<SprintUpdate>,
) -> Result<impl IntoResponse, HandlerError> {
    let sprint = state
        .db()
        .update_sprint(id, req)
        .ok_or_else(|| not_found("Sprint", id))?;
    Ok(Json(sprint))
}

async fn delete_sprint(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.db().delete_sprint(id) {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Sprint", id)),
    }
}

async fn sprint_tasks(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let db = state.db();
    db.get_sprint(id).ok_or_else(|| not_found("Sprint", id))?;
    Ok(Json(db.sprint_tasks(id)))
}

async fn incomplete_tasks(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let db = state.db();
    db.get_sprint(id).ok_or_else(|| not_found("Sprint", id))?;
    Ok(Json(db.incomplete_tasks(id)))
}

async fn assign_tasks(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<AssignRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut db = state.db();
    db.get_sprint(id).ok_or_else(|| not_found("Sprint", id))?;
    db.assign_to_sprint(id, &req.task_ids);
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_sprint_task(
    State(state): State<SharedState>,
    Path((id, task_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.db().remove_from_sprint(id, task_id) {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Task", task_id)),
    }
}

async fn end_sprint(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<EndSprintRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let next = match req.incomplete_tasks_action.as_str() {
        "moveToBacklog" => None,
        "moveToNextSprint" => Some(req.next_sprint_id.ok_or_else(|| {
            HandlerError::BadRequest("nextSprintId is required".to_string())
        })?),
        other => {
            return Err(HandlerError::BadRequest(format!(
                "Unknown incompleteTasksAction: {}",
                other
            )));
        }
    };
    let mut db = state.db();
    db.get_sprint(id).ok_or_else(|| not_found("Sprint", id))?;
    db.end_sprint(id, next).map_err(HandlerError::BadRequest)?;
    Ok(Json(json!({"message": "Sprint completed"})))
}

// Comments

async fn list_comments(
    State(state): State<SharedState>,
    Path(task_id): Path<i64>,
) -> impl IntoResponse {
    Json(state.db().comments(task_id))
}

async fn add_comment(
    State(state): State<SharedState>,
    Path(task_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut db = state.db();
    db.get_task(task_id).ok_or_else(|| not_found("Task", task_id))?;
    let comment = db
        .add_comment(task_id, &req.content)
        .map_err(HandlerError::BadRequest)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.db().delete_comment(id) {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Comment", id)),
    }
}

// Users and teams

async fn list_users(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.db().users())
}

async fn current_user(State(state): State<SharedState>) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .db()
        .me()
        .ok_or_else(|| HandlerError::Unauthorized("Not logged in".to_string()))?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<User>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .db()
        .update_user(id, req)
        .ok_or_else(|| not_found("User", id))?;
    Ok(Json(user))
}

async fn list_teams(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.db().teams())
}

async fn create_team(
    State(state): State<SharedState>,
    Json(req): Json<NewTeam>,
) -> Result<impl IntoResponse, HandlerError> {
    let team = state.db().create_team(req).map_err(HandlerError::BadRequest)?;
    Ok((StatusCode::CREATED, Json(team)))
}

async fn update_team(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<TeamUpdate>,
) -> Result<impl IntoResponse, HandlerError> {
    let team = state
        .db()
        .update_team(id, req)
        .ok_or_else(|| not_found("Team", id))?;
    Ok(Json(team))
}

async fn delete_team(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.db().delete_team(id) {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found("Team", id)),
    }
}

async fn completion_rate(
    State(state): State<SharedState>,
    Query(query): Query<KpiQuery>,
) -> impl IntoResponse {
    Json(
        state
            .db()
            .kpis(query.sprint_id, query.team_id, query.aggregated),
    )
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .db()
        .login(&req.email, &req.password)
        .ok_or_else(|| HandlerError::Unauthorized("Invalid credentials".to_string()))?;
    let token = format!("mock-token-{}", user.id);
    Ok(Json(json!({"token": token, "user": user})))
}

// AI endpoints

/// Fields recovered from a division prompt.
#[derive(Debug, Default, PartialEq)]
struct PromptFields {
    count: usize,
    title: String,
    status: Option<String>,
    start_date: Option<String>,
}

fn parse_prompt(prompt: &str) -> PromptFields {
    let mut lines = prompt.lines();
    let count = lines
        .next()
        .and_then(|header| header.split_whitespace().find_map(|w| w.parse::<usize>().ok()))
        .unwrap_or(3);
    let title = lines
        .next()
        .map(|line| line.split_once(": ").map_or(line, |(title, _)| title))
        .unwrap_or_default()
        .trim()
        .to_string();
    let field = |key: &str| {
        prompt
            .lines()
            .find_map(|line| line.strip_prefix(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "-")
    };
    PromptFields {
        count,
        title,
        status: field("status:"),
        start_date: field("startDate:"),
    }
}

/// Deterministic division: `count` equally sized parts of the task.
async fn atomize(Json(req): Json<AtomizeRequest>) -> Result<impl IntoResponse, HandlerError> {
    let fields = parse_prompt(&req.task_description);
    if fields.title.is_empty() {
        return Err(HandlerError::BadRequest(
            "taskDescription does not name a task".to_string(),
        ));
    }
    let entries: Vec<_> = (1..=fields.count)
        .map(|i| {
            json!({
                "generated": {
                    "title": format!("{} - Parte {}", fields.title, i),
                    "tag": "feature",
                    "status": fields.status,
                    "description": format!("Parte {} de {}: {}", i, fields.count, fields.title),
                    "estimatedHours": 2.0,
                    "startDate": fields.start_date,
                    "assignees": [],
                }
            })
        })
        .collect();
    Ok(Json(entries))
}

async fn analyze_tasks(Json(req): Json<AnalyzeRequest>) -> impl IntoResponse {
    Json(json!({"recommendations": rank_candidates(&req.tasks)}))
}
