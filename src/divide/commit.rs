//! Commit of an accepted division: delete the originals, create the subtasks.

use futures::future::join_all;
use tracing::{debug, error, info};

use super::state::DivisionItem;
use crate::models::{NewTask, Task};
use crate::store::TaskRepository;

/// A subtask the server refused to create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateFailure {
    pub original_id: i64,
    pub title: String,
    pub error: String,
}

/// Outcome of a commit. Partial application is possible: there is no
/// rollback of the delete when creates fail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub deleted: Vec<i64>,
    pub created: Vec<Task>,
    pub failed: Vec<CreateFailure>,
    /// Set when the bulk delete failed; no creates are attempted then.
    pub delete_error: Option<String>,
    /// Originals kept because all their proposals were removed
    pub skipped: Vec<i64>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.delete_error.is_none() && self.failed.is_empty()
    }
}

/// Create request for one proposal: the proposal's own fields, placed in
/// the original's sprint and team. Provisional assignees (non-positive ids)
/// are not real users and are left out.
pub fn new_task_for(original: &Task, generated: &Task) -> NewTask {
    let assignees = generated
        .assignees
        .iter()
        .filter(|user| user.id > 0)
        .cloned()
        .collect();
    NewTask {
        title: generated.title.clone(),
        description: generated.description.clone(),
        tag: generated.tag,
        status: generated.status.clone(),
        start_date: generated.start_date.clone(),
        end_date: None,
        sprint_id: original.sprint_id,
        team_id: original.team_id,
        estimated_hours: generated.estimated_hours,
        actual_hours: generated.actual_hours,
        assignees,
    }
}

/// Run the commit protocol against the repository.
///
/// 1. One bulk delete of every original that still has proposals; awaited.
/// 2. One create per proposal, all issued concurrently; every create is
///    attempted and the batch settles before returning.
pub async fn commit(repository: &dyn TaskRepository, items: &[DivisionItem]) -> CommitReport {
    let mut report = CommitReport::default();
    let (active, skipped): (Vec<&DivisionItem>, Vec<&DivisionItem>) =
        items.iter().partition(|item| !item.generated.is_empty());
    report.skipped = skipped.iter().map(|item| item.original.id).collect();
    if !report.skipped.is_empty() {
        debug!(skipped = ?report.skipped, "originals without proposals are kept");
    }

    let ids: Vec<i64> = active.iter().map(|item| item.original.id).collect();
    if ids.is_empty() {
        return report;
    }

    if let Err(e) = repository.delete_tasks(&ids).await {
        error!(error = %e, ids = ?ids, "bulk delete failed, no subtasks created");
        report.delete_error = Some(e.to_string());
        return report;
    }
    report.deleted = ids;

    let futures: Vec<_> = active
        .iter()
        .flat_map(|item| {
            item.generated.iter().map(move |generated| {
                let request = new_task_for(&item.original, generated);
                let original_id = item.original.id;
                async move {
                    let title = request.title.clone();
                    (original_id, title, repository.create_task(request).await)
                }
            })
        })
        .collect();

    for (original_id, title, result) in join_all(futures).await {
        match result {
            Ok(task) => report.created.push(task),
            Err(e) => {
                error!(original_id, %title, error = %e, "failed to create subtask");
                report.failed.push(CreateFailure {
                    original_id,
                    title,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        deleted = report.deleted.len(),
        created = report.created.len(),
        failed = report.failed.len(),
        "division committed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::divide::DivisionParams;
    use crate::models::{TaskTag, User};

    fn task(id: i64, title: &str) -> Task {
        serde_json::from_value(serde_json::json!({
            "id": id, "title": title, "status": "Backlog", "startDate": "2025-03-01",
            "endDate": "2025-03-09", "sprintId": 7, "teamId": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_new_task_for_copies_fields_and_original_placement() {
        let original = task(1, "Original");
        let mut generated = task(-1, "Sub");
        generated.sprint_id = None;
        generated.team_id = Some(99);
        generated.tag = TaskTag::Issue;
        generated.status = "To Do".into();
        generated.description = Some("desc".into());
        generated.estimated_hours = Some(2.5);
        generated.actual_hours = Some(0.0);
        generated.set_assignees(vec![User::named(4, "Ana"), User::named(-3, "Ghost")]);

        let new = new_task_for(&original, &generated);
        assert_eq!(new.title, "Sub");
        assert_eq!(new.description.as_deref(), Some("desc"));
        assert_eq!(new.tag, TaskTag::Issue);
        assert_eq!(new.status, "To Do");
        assert_eq!(new.start_date, "2025-03-01");
        assert_eq!(new.end_date, None);
        assert_eq!(new.sprint_id, Some(7));
        assert_eq!(new.team_id, Some(2));
        assert_eq!(new.estimated_hours, Some(2.5));
        assert_eq!(new.actual_hours, Some(0.0));
        assert_eq!(new.assignees.len(), 1);
        assert_eq!(new.assignees[0].id, 4);
    }

    #[test]
    fn test_report_success() {
        let mut report = CommitReport::default();
        assert!(report.is_success());
        report.failed.push(CreateFailure {
            original_id: 1,
            title: "x".into(),
            error: "boom".into(),
        });
        assert!(!report.is_success());
    }

    #[test]
    fn test_division_item_params_default() {
        let item = DivisionItem {
            original: task(1, "A"),
            params: DivisionParams::default(),
            generated: vec![],
        };
        assert_eq!(item.params.subtasks.get(), 3);
    }
}
