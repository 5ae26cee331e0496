//! Sprint commands: `sprintboard sprints`.

use anyhow::{Context, Result, bail};
use console::style;

use super::super::SprintCommands;
use sprintboard::config::BoardConfig;
use sprintboard::models::IncompleteTasksAction;

pub async fn cmd_sprints(config: &BoardConfig, command: SprintCommands) -> Result<()> {
    let conn = super::connect(config)?;
    let store = &conn.store;

    match command {
        SprintCommands::List { team } => {
            let sprints = store.fetch_sprints(team).await.context("Failed to fetch sprints")?;
            if sprints.is_empty() {
                println!("No sprints found.");
            }
            for sprint in sprints {
                println!(
                    "{:>5}  {:<10} {} → {}  {}",
                    style(format!("#{}", sprint.id)).dim(),
                    sprint.status.as_str(),
                    sprint.start_date,
                    sprint.end_date,
                    style(&sprint.name).bold()
                );
            }
        }
        SprintCommands::Complete { id, backlog, next } => {
            let action = match (backlog, next) {
                (_, Some(next)) => IncompleteTasksAction::MoveToNextSprint(next),
                (true, None) => IncompleteTasksAction::MoveToBacklog,
                (false, None) => bail!("Pass --backlog or --next <sprint id>"),
            };
            let incomplete = store.fetch_incomplete_tasks(id).await?;
            store.complete_sprint(id, action).await?;
            match action.next_sprint() {
                Some(next) => println!(
                    "Sprint {} completed; {} unfinished task(s) moved to sprint {}",
                    id,
                    incomplete.len(),
                    next
                ),
                None => println!(
                    "Sprint {} completed; {} unfinished task(s) moved to the backlog",
                    id,
                    incomplete.len()
                ),
            }
        }
    }
    Ok(())
}
