use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DivisionService, TaskRecommendation, rank_candidates};
use crate::api::Gateway;
use crate::config::DivisionSection;
use crate::divide::SubtaskCount;
use crate::errors::DivisionError;
use crate::models::{Task, TaskTag, User};

/// Subtask proposal as the atomize endpoint returns it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GeneratedTask {
    title: String,
    tag: Option<String>,
    status: Option<String>,
    description: Option<String>,
    estimated_hours: Option<f64>,
    start_date: Option<String>,
    end_date: Option<String>,
    creator_name: Option<String>,
    assignees: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DivisionEntry {
    generated: GeneratedTask,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AtomizeRequest<'a> {
    task_description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisTask<'a> {
    id: i64,
    title: &'a str,
    description: &'a str,
    estimated_hours: Option<f64>,
    status: &'a str,
    tag: TaskTag,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    tasks: Vec<AnalysisTask<'a>>,
    number_of_subtasks: u8,
    #[serde(skip_serializing_if = "str::is_empty")]
    additional_context: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    recommendations: Vec<TaskRecommendation>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Prompt sent to the atomize endpoint.
pub fn build_prompt(task: &Task, subtask_count: SubtaskCount, additional_context: &str) -> String {
    let mut prompt = format!(
        "Tarea a dividir en {} subtareas:\n{}: {}",
        subtask_count,
        task.title,
        task.description.as_deref().unwrap_or("")
    );
    if !additional_context.trim().is_empty() {
        prompt.push_str(&format!("\nContexto adicional: {}", additional_context));
    }
    let assignees = if task.assignees.is_empty() {
        "ninguno".to_string()
    } else {
        task.assignee_names().join(", ")
    };
    prompt.push_str(&format!(
        "\n\nDatos dados:\ncreatorName: {}\nstatus: {}\nstartDate: {}\nendDate: {}\nassignees: {}",
        task.creator_name.as_deref().unwrap_or("-"),
        task.status,
        task.start_date,
        task.end_date.as_deref().unwrap_or("-"),
        assignees
    ));
    prompt
}

/// Division service backed by the server's Gemini endpoints.
pub struct GeminiDivisionService {
    gateway: Arc<dyn Gateway>,
    atomize_path: String,
    analyze_path: String,
    next_provisional_id: AtomicI64,
}

impl GeminiDivisionService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_settings(gateway, &DivisionSection::default())
    }

    pub fn with_settings(gateway: Arc<dyn Gateway>, settings: &DivisionSection) -> Self {
        Self {
            gateway,
            atomize_path: settings.atomize_path.clone(),
            analyze_path: settings.analyze_path.clone(),
            next_provisional_id: AtomicI64::new(-1),
        }
    }

    fn provisional_id(&self) -> i64 {
        self.next_provisional_id.fetch_sub(1, Ordering::Relaxed)
    }

    fn to_proposal(
        &self,
        original: &Task,
        generated: GeneratedTask,
        position: usize,
        total: usize,
    ) -> Task {
        let assignees = generated
            .assignees
            .iter()
            .map(|name| {
                original
                    .assignees
                    .iter()
                    .find(|a| &a.name == name)
                    .cloned()
                    .unwrap_or_else(|| User::named(self.provisional_id(), name))
            })
            .collect();

        let title = if generated.title.trim().is_empty() {
            format!("{} ({}/{})", original.title, position + 1, total)
        } else {
            generated.title
        };

        let mut task = Task {
            id: self.provisional_id(),
            title,
            description: non_empty(generated.description),
            tag: generated
                .tag
                .as_deref()
                .map(TaskTag::from_loose)
                .unwrap_or_default(),
            status: non_empty(generated.status).unwrap_or_else(|| original.status.clone()),
            start_date: non_empty(generated.start_date)
                .unwrap_or_else(|| original.start_date.clone()),
            end_date: non_empty(generated.end_date).or_else(|| original.end_date.clone()),
            sprint_id: original.sprint_id,
            team_id: original.team_id,
            creator_id: original.creator_id,
            creator_name: non_empty(generated.creator_name)
                .or_else(|| original.creator_name.clone()),
            estimated_hours: generated.estimated_hours,
            actual_hours: Some(0.0),
            assignees: Vec::new(),
        };
        task.set_assignees(assignees);
        task
    }
}

#[async_trait]
impl DivisionService for GeminiDivisionService {
    async fn divide_task(
        &self,
        task: &Task,
        subtask_count: SubtaskCount,
        additional_context: &str,
    ) -> Result<Vec<Task>, DivisionError> {
        let prompt = build_prompt(task, subtask_count, additional_context);
        debug!(task_id = task.id, subtasks = subtask_count.get(), "requesting division");

        let request = AtomizeRequest {
            task_description: &prompt,
        };
        let entries: Vec<DivisionEntry> = self
            .gateway
            .post(&self.atomize_path, &request)
            .await
            .map_err(|source| DivisionError::Request {
                task_id: task.id,
                source,
            })?;

        if entries.is_empty() {
            debug!(task_id = task.id, "division service returned no subtasks");
        }
        let total = entries.len();
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| self.to_proposal(task, entry.generated, i, total))
            .collect())
    }

    async fn analyze_tasks(
        &self,
        tasks: &[Task],
        subtask_count: SubtaskCount,
        additional_context: &str,
    ) -> Result<Vec<TaskRecommendation>, DivisionError> {
        let request = AnalysisRequest {
            tasks: tasks
                .iter()
                .map(|t| AnalysisTask {
                    id: t.id,
                    title: &t.title,
                    description: t.description.as_deref().unwrap_or(""),
                    estimated_hours: t.estimated_hours,
                    status: &t.status,
                    tag: t.tag,
                })
                .collect(),
            number_of_subtasks: subtask_count.get(),
            additional_context,
        };

        match self
            .gateway
            .post::<AnalysisResponse, _>(&self.analyze_path, &request)
            .await
        {
            Ok(response) => Ok(response.recommendations),
            Err(e) => {
                warn!(error = %e, "task analysis endpoint failed, using local ranking");
                Ok(rank_candidates(tasks))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::Method;
    use serde_json::{Value, json};

    use super::*;
    use crate::errors::ApiError;

    struct Canned {
        reply: Result<Value, u16>,
        bodies: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl Canned {
        fn ok(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                bodies: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                bodies: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Gateway for Canned {
        async fn send(
            &self,
            _method: Method,
            path: &str,
            body: Option<Value>,
        ) -> Result<Value, ApiError> {
            self.bodies.lock().unwrap().push((path.to_string(), body));
            match &self.reply {
                Ok(v) => Ok(v.clone()),
                Err(status) => Err(ApiError::Status {
                    endpoint: path.to_string(),
                    status: *status,
                    message: "AI unavailable".to_string(),
                }),
            }
        }
    }

    fn original() -> Task {
        serde_json::from_value(json!({
            "id": 42,
            "title": "Checkout flow",
            "description": "Cart, payment and receipt",
            "status": "Backlog",
            "startDate": "2025-03-01",
            "endDate": "2025-03-20",
            "sprintId": 7,
            "teamId": 2,
            "creatorName": "Ana",
            "assignees": [{"id": 11, "name": "Luis"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt(&original(), SubtaskCount::new(4), "usar Stripe");
        assert!(prompt.starts_with(
            "Tarea a dividir en 4 subtareas:\nCheckout flow: Cart, payment and receipt"
        ));
        assert!(prompt.contains("\nContexto adicional: usar Stripe"));
        assert!(prompt.contains("creatorName: Ana"));
        assert!(prompt.contains("assignees: Luis"));
    }

    #[test]
    fn test_prompt_without_context_or_assignees() {
        let mut task = original();
        task.assignees.clear();
        let prompt = build_prompt(&task, SubtaskCount::default(), "   ");
        assert!(!prompt.contains("Contexto adicional"));
        assert!(prompt.contains("assignees: ninguno"));
    }

    #[tokio::test]
    async fn test_divide_maps_generated_tasks() {
        let gateway = Canned::ok(json!([
            {"generated": {"title": "Cart", "tag": "feature", "estimatedHours": 3,
                           "assignees": ["Luis", "Marta"]}},
            {"generated": {"title": "Payment", "tag": "issue", "status": "To Do",
                           "startDate": "2025-03-05", "assignees": []}}
        ]));
        let service = GeminiDivisionService::new(gateway.clone());
        let tasks = service
            .divide_task(&original(), SubtaskCount::new(2), "")
            .await
            .unwrap();

        assert_eq!(tasks.len(), 2);
        let cart = &tasks[0];
        assert_eq!(cart.tag, TaskTag::Feature);
        assert_eq!(cart.status, "Backlog");
        assert_eq!(cart.start_date, "2025-03-01");
        assert_eq!(cart.end_date.as_deref(), Some("2025-03-20"));
        assert_eq!(cart.creator_name.as_deref(), Some("Ana"));
        assert_eq!(cart.sprint_id, Some(7));
        assert_eq!(cart.team_id, Some(2));
        assert_eq!(cart.actual_hours, Some(0.0));
        assert_eq!(cart.assignees[0].id, 11);
        assert!(cart.assignees[1].id < 0);
        assert_eq!(cart.assignees[1].name, "Marta");

        let payment = &tasks[1];
        assert_eq!(payment.tag, TaskTag::Issue);
        assert_eq!(payment.status, "To Do");
        assert_eq!(payment.start_date, "2025-03-05");

        let ids: std::collections::HashSet<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(tasks.iter().all(|t| t.id < 0));

        let (path, body) = gateway.bodies.lock().unwrap().pop().unwrap();
        assert_eq!(path, "/gemini/atomize");
        let description = body.unwrap()["taskDescription"].as_str().unwrap().to_string();
        assert!(description.starts_with("Tarea a dividir en 2 subtareas"));
    }

    #[tokio::test]
    async fn test_divide_failure_propagates() {
        let service = GeminiDivisionService::new(Canned::failing(500));
        let err = service
            .divide_task(&original(), SubtaskCount::default(), "")
            .await
            .unwrap_err();
        match err {
            DivisionError::Request { task_id, source } => {
                assert_eq!(task_id, 42);
                assert_eq!(source.status(), Some(500));
            }
            other => panic!("Expected Request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_divide_empty_response_yields_no_proposals() {
        let service = GeminiDivisionService::new(Canned::ok(json!([])));
        let tasks = service
            .divide_task(&original(), SubtaskCount::default(), "")
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_uses_server_recommendations() {
        let gateway = Canned::ok(json!({
            "recommendations": [{"taskId": 42, "reason": "grande", "score": 9.5}]
        }));
        let service = GeminiDivisionService::new(gateway.clone());
        let recs = service
            .analyze_tasks(&[original()], SubtaskCount::new(4), "")
            .await
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].reason, "grande");

        let (path, body) = gateway.bodies.lock().unwrap().pop().unwrap();
        assert_eq!(path, "/gemini/analyze-tasks");
        let body = body.unwrap();
        assert_eq!(body["numberOfSubtasks"], 4);
        assert_eq!(body["tasks"][0]["id"], 42);
        assert!(body.get("additionalContext").is_none());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_to_heuristic() {
        let service = GeminiDivisionService::new(Canned::failing(503));
        let recs = service
            .analyze_tasks(&[original()], SubtaskCount::default(), "")
            .await
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].task_id, 42);
    }
}
