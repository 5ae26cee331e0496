//! Task listing and deletion: `sprintboard tasks`.

use anyhow::{Context, Result};
use console::style;

use super::super::TaskCommands;
use sprintboard::config::BoardConfig;
use sprintboard::models::Task;
use sprintboard::store::TaskView;

pub(crate) fn task_line(task: &Task) -> String {
    let hours = task
        .estimated_hours
        .map(|h| format!(" {}h", h))
        .unwrap_or_default();
    let assignees = if task.assignees.is_empty() {
        String::new()
    } else {
        format!(" [{}]", task.assignee_names().join(", "))
    };
    format!(
        "{:>5}  {:<12} {:<8} {}{}{}",
        style(format!("#{}", task.id)).dim(),
        task.status,
        task.tag,
        task.title,
        style(hours).cyan(),
        style(assignees).dim()
    )
}

pub async fn cmd_tasks(config: &BoardConfig, command: TaskCommands) -> Result<()> {
    let conn = super::connect(config)?;
    let store = &conn.store;

    match command {
        TaskCommands::List { status, team } => {
            let view = match team {
                Some(team) => TaskView::Team(Some(team)),
                None => TaskView::All,
            };
            let tasks = store.fetch_tasks(view).await.context("Failed to fetch tasks")?;
            let shown: Vec<&Task> = tasks
                .iter()
                .filter(|t| status.as_deref().is_none_or(|s| t.status.eq_ignore_ascii_case(s)))
                .collect();
            if shown.is_empty() {
                println!("No tasks found.");
            }
            for task in shown {
                println!("{}", task_line(task));
            }
        }
        TaskCommands::Show { id } => {
            let task = store.fetch_task(id).await?;
            let comments = store.fetch_comments(id).await.unwrap_or_default();
            println!();
            println!("{} {}", style(format!("#{}", task.id)).dim(), style(&task.title).bold());
            println!("  status:    {}", task.status);
            println!("  tag:       {}", task.tag);
            println!("  start:     {}", task.start_date);
            if let Some(end) = &task.end_date {
                println!("  end:       {}", end);
            }
            if let Some(hours) = task.estimated_hours {
                println!("  estimated: {}h", hours);
            }
            if let Some(sprint) = task.sprint_id {
                println!("  sprint:    {}", sprint);
            }
            if !task.assignees.is_empty() {
                println!("  assignees: {}", task.assignee_names().join(", "));
            }
            if let Some(description) = &task.description {
                println!();
                println!("  {}", description);
            }
            if !comments.is_empty() {
                println!();
                println!("Comments:");
                for comment in &comments {
                    println!(
                        "  {} {}",
                        style(comment.creator_name.as_deref().unwrap_or("?")).cyan(),
                        comment.content
                    );
                }
            }
            println!();
        }
        TaskCommands::Delete { ids, force } => {
            if !force {
                let confirm = dialoguer::Confirm::with_theme(&dialoguer::theme::ColorfulTheme::default())
                    .with_prompt(format!("Delete {} task(s)?", ids.len()))
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !confirm {
                    println!("Delete cancelled");
                    return Ok(());
                }
            }
            store.delete_tasks(&ids).await.context("Failed to delete tasks")?;
            println!("Deleted {} task(s)", ids.len());
        }
    }
    Ok(())
}
