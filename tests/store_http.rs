//! Entity store and division service over real HTTP against the mock server.

use std::sync::Arc;

use sprintboard::ai::{DivisionService, GeminiDivisionService};
use sprintboard::api::{ApiClient, Gateway};
use sprintboard::divide::{DivideWorkflow, DivisionParams, QueuedTask, Step, SubtaskCount};
use sprintboard::errors::StoreError;
use sprintboard::mock::{BoardDb, spawn};
use sprintboard::models::{IncompleteTasksAction, NewTask, TaskUpdate, status};
use sprintboard::store::{EntityStore, KpiFilter, TaskView};

// Seeded ids
const SPRINT: i64 = 5;
const BACKLOG_TASK: i64 = 6;
const TODO_TASK: i64 = 7;
const STARTED_TASK: i64 = 8;

struct Board {
    client: Arc<ApiClient>,
    store: Arc<EntityStore>,
    divider: Arc<GeminiDivisionService>,
}

async fn board() -> Board {
    let (addr, _handle) = spawn(BoardDb::seeded()).await.unwrap();
    let client = Arc::new(ApiClient::with_base_url(&format!("http://{}/api", addr)).unwrap());
    let gateway: Arc<dyn Gateway> = client.clone();
    Board {
        client,
        store: Arc::new(EntityStore::new(gateway.clone())),
        divider: Arc::new(GeminiDivisionService::new(gateway)),
    }
}

#[tokio::test]
async fn test_fetch_tasks_fills_cache() {
    let board = board().await;
    let tasks = board.store.fetch_tasks(TaskView::All).await.unwrap();
    assert_eq!(tasks.len(), 4);
    assert_eq!(board.store.tasks().len(), 4);

    let todo = board.store.get_task_by_id(TODO_TASK).unwrap();
    assert_eq!(todo.status, status::TO_DO);
    assert_eq!(todo.sprint_id, Some(SPRINT));
    assert_eq!(todo.assignee_names(), vec!["Ana López"]);
}

#[tokio::test]
async fn test_missing_task_maps_to_not_found() {
    let board = board().await;
    let err = board.store.fetch_task(999).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { id: 999, .. }));
    assert!(board.store.error().is_some());

    board.store.fetch_task(TODO_TASK).await.unwrap();
    assert!(board.store.error().is_none());
}

#[tokio::test]
async fn test_create_update_and_bulk_delete() {
    let board = board().await;
    board.store.fetch_tasks(TaskView::All).await.unwrap();

    let mut new = NewTask::new("Escribir documentación", status::BACKLOG, "2025-03-02");
    new.estimated_hours = Some(3.0);
    new.sprint_id = Some(SPRINT);
    let created = board.store.create_task(new).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.sprint_id, Some(SPRINT));

    let update = TaskUpdate {
        title: Some("Escribir guía de usuario".to_string()),
        ..TaskUpdate::default()
    };
    let updated = board.store.update_task(created.id, &update).await.unwrap();
    assert_eq!(updated.title, "Escribir guía de usuario");
    assert_eq!(updated.estimated_hours, Some(3.0));

    let moved = board
        .store
        .update_task_status(created.id, status::IN_PROGRESS)
        .await
        .unwrap();
    assert_eq!(moved.status, status::IN_PROGRESS);

    board
        .store
        .delete_tasks(&[created.id, BACKLOG_TASK])
        .await
        .unwrap();
    assert!(board.store.get_task_by_id(created.id).is_none());
    let remaining = board.store.fetch_tasks(TaskView::All).await.unwrap();
    assert_eq!(remaining.len(), 3);
    assert!(remaining.iter().all(|t| t.id != BACKLOG_TASK));
}

#[tokio::test]
async fn test_complete_sprint_to_backlog() {
    let board = board().await;
    let incomplete = board.store.fetch_incomplete_tasks(SPRINT).await.unwrap();
    let ids: Vec<i64> = incomplete.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![TODO_TASK, STARTED_TASK]);

    board
        .store
        .complete_sprint(SPRINT, IncompleteTasksAction::MoveToBacklog)
        .await
        .unwrap();

    let started = board.store.fetch_task(STARTED_TASK).await.unwrap();
    assert_eq!(started.sprint_id, None);
    assert_eq!(started.status, status::BACKLOG);
    assert!(board.store.fetch_incomplete_tasks(SPRINT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_complete_sprint_into_itself_is_rejected_locally() {
    let board = board().await;
    let err = board
        .store
        .complete_sprint(SPRINT, IncompleteTasksAction::MoveToNextSprint(SPRINT))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BadRequest(_)));
}

#[tokio::test]
async fn test_comments_round_trip() {
    let board = board().await;
    let comment = board
        .store
        .add_comment(TODO_TASK, "Revisar con diseño")
        .await
        .unwrap();
    assert_eq!(comment.task_id, TODO_TASK);

    let comments = board.store.fetch_comments(TODO_TASK).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(board.store.comments_for_task(TODO_TASK).len(), 1);

    board.store.delete_comment(comment.id).await.unwrap();
    assert!(board.store.fetch_comments(TODO_TASK).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sprint_kpis() {
    let board = board().await;
    let filter = KpiFilter {
        sprint_id: Some(SPRINT),
        ..KpiFilter::default()
    };
    let kpis = board.store.fetch_kpis(filter).await.unwrap();
    assert_eq!(kpis.len(), 1);
    assert_eq!(kpis[0].member_name, "Ana López");
    assert_eq!(kpis[0].total_assigned_tasks, 3);
    assert_eq!(kpis[0].completed_tasks, 1);

    let total = board
        .store
        .fetch_kpis(KpiFilter {
            aggregated: true,
            ..filter
        })
        .await
        .unwrap();
    assert_eq!(total[0].member_name, "Total");
}

#[tokio::test]
async fn test_login_sets_token_and_current_user() {
    let board = board().await;
    let response = board.client.login("ana@example.com", "secret").await.unwrap();
    assert!(board.client.token().is_some());
    assert_eq!(response.user.unwrap().name, "Ana López");

    let me = board.store.fetch_current_user().await.unwrap();
    assert_eq!(me.email.as_deref(), Some("ana@example.com"));

    let err = board.client.login("ana@example.com", "").await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_division_service_against_server() {
    let board = board().await;
    let task = board.store.fetch_task(TODO_TASK).await.unwrap();

    let proposals = board
        .divider
        .divide_task(&task, SubtaskCount::new(4), "")
        .await
        .unwrap();
    assert_eq!(proposals.len(), 4);
    assert_eq!(proposals[0].title, "Diseñar pantalla de reportes - Parte 1");
    assert!(proposals.iter().all(|p| p.id < 0));
    assert!(proposals.iter().all(|p| p.sprint_id == Some(SPRINT)));

    let tasks = board.store.fetch_tasks(TaskView::All).await.unwrap();
    let ranked = board
        .divider
        .analyze_tasks(&tasks, SubtaskCount::default(), "")
        .await
        .unwrap();
    assert_eq!(ranked[0].task_id, BACKLOG_TASK);
    assert!(ranked.iter().all(|r| r.task_id != STARTED_TASK));
}

#[tokio::test]
async fn test_workflow_commits_against_server() {
    let board = board().await;
    let original = board.store.fetch_task(BACKLOG_TASK).await.unwrap();
    let workflow = DivideWorkflow::new(board.divider.clone(), board.store.clone());

    workflow
        .open(vec![QueuedTask::with_params(
            original,
            DivisionParams::new(SubtaskCount::new(2), "separar login y sesiones"),
        )])
        .unwrap();
    workflow.start().await.unwrap();
    assert_eq!(workflow.step(), Some(Step::Carousel));
    workflow.accept().unwrap();

    let report = workflow.confirm().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.deleted, vec![BACKLOG_TASK]);
    assert_eq!(report.created.len(), 2);
    assert!(!workflow.is_open());

    let tasks = board.store.fetch_tasks(TaskView::All).await.unwrap();
    assert!(tasks.iter().all(|t| t.id != BACKLOG_TASK));
    let parts: Vec<_> = tasks.iter().filter(|t| t.title.contains(" - Parte ")).collect();
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|t| t.status == status::BACKLOG && t.sprint_id.is_none()));
}
