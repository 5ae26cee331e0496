//! Task division wizard: `sprintboard divide` and `sprintboard suggest`.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use super::tasks::task_line;
use sprintboard::config::BoardConfig;
use sprintboard::divide::{
    CommitReport, DivideWorkflow, DivisionParams, QueuedTask, SelectionSession, Step,
    SubtaskCount,
};
use sprintboard::models::{TaskUpdate, status};
use sprintboard::store::TaskView;

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        bar.set_style(spinner_style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn subtask_count(config: &BoardConfig, input: Option<&str>) -> SubtaskCount {
    match input {
        Some(raw) => SubtaskCount::parse_input(raw),
        None => SubtaskCount::new(config.division().default_subtasks as i64),
    }
}

/// Choices offered for the current carousel item, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CarouselAction {
    Accept,
    Redivide,
    Edit,
    Remove,
    Previous,
    Next,
    Cancel,
}

impl CarouselAction {
    const ALL: [CarouselAction; 7] = [
        Self::Accept,
        Self::Redivide,
        Self::Edit,
        Self::Remove,
        Self::Previous,
        Self::Next,
        Self::Cancel,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Redivide => "Re-divide",
            Self::Edit => "Edit a subtask",
            Self::Remove => "Remove a subtask",
            Self::Previous => "Previous",
            Self::Next => "Next",
            Self::Cancel => "Cancel division",
        }
    }

    fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Self::Cancel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryAction {
    Apply,
    Back,
    Cancel,
}

impl SummaryAction {
    const ALL: [SummaryAction; 3] = [Self::Apply, Self::Back, Self::Cancel];

    fn label(&self) -> &'static str {
        match self {
            Self::Apply => "Apply the division",
            Self::Back => "Back to proposals",
            Self::Cancel => "Cancel division",
        }
    }

    fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Self::Cancel)
    }
}

pub async fn cmd_divide(
    config: &BoardConfig,
    ids: &[i64],
    subtasks: Option<&str>,
    context: &str,
    yes: bool,
) -> Result<()> {
    let conn = super::connect(config)?;
    let count = subtask_count(config, subtasks);

    let mut queue = Vec::new();
    for id in ids {
        let task = conn.store.fetch_task(*id).await?;
        if !task.is_divisible() {
            bail!(
                "Task {} is '{}'; only {} or {} tasks can be divided",
                id,
                task.status,
                status::BACKLOG,
                status::TO_DO
            );
        }
        queue.push(QueuedTask::with_params(task, DivisionParams::new(count, context)));
    }

    let workflow = DivideWorkflow::new(conn.divider.clone(), conn.store.clone());
    workflow.open(queue)?;

    if !yes {
        let state = workflow.state().context("Workflow closed unexpectedly")?;
        println!();
        println!("{}", style("Tasks to divide").bold());
        for queued in state.queue() {
            println!("{}  → {} subtasks", task_line(&queued.task), queued.params.subtasks);
        }
        println!();
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Request subtasks?")
            .default(true)
            .interact()
            .unwrap_or(false);
        if !proceed {
            workflow.close();
            println!("Division cancelled");
            return Ok(());
        }
    }

    run_wizard(&workflow, yes).await
}

pub async fn cmd_suggest(config: &BoardConfig, subtasks: Option<&str>, yes: bool) -> Result<()> {
    let conn = super::connect(config)?;
    let count = subtask_count(config, subtasks);
    let tasks = conn
        .store
        .fetch_tasks(TaskView::All)
        .await
        .context("Failed to fetch tasks")?;

    let bar = spinner("Analyzing backlog...");
    let analysis = SelectionSession::analyze(conn.divider.as_ref(), &tasks, count).await;
    bar.finish_and_clear();
    let mut session = analysis?;

    if session.candidates().is_empty() {
        println!("No tasks were recommended for division.");
        return Ok(());
    }

    if !yes {
        let labels: Vec<String> = session
            .candidates()
            .iter()
            .map(|c| format!("#{} {}  {}", c.task.id, c.task.title, style(&c.reason).dim()))
            .collect();
        let defaults: Vec<bool> = session.candidates().iter().map(|c| c.selected).collect();
        let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Tasks to divide")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;
        let ids: Vec<i64> = session.candidates().iter().map(|c| c.task.id).collect();
        for (i, id) in ids.iter().enumerate() {
            if !chosen.contains(&i) {
                session.toggle(*id)?;
            }
        }
        for id in chosen.iter().map(|&i| &ids[i]) {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Subtasks for #{}", id))
                .default(count.to_string())
                .interact_text()?;
            session.set_subtask_input(*id, &input)?;
            let context: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Additional context for #{}", id))
                .allow_empty(true)
                .interact_text()?;
            session.set_context(*id, &context)?;
        }
    }

    let queue = session.into_queue()?;
    let workflow = DivideWorkflow::new(conn.divider.clone(), conn.store.clone());
    workflow.open(queue)?;
    run_wizard(&workflow, yes).await
}

/// Drive an opened workflow from the queue step to commit or cancel.
async fn run_wizard(workflow: &DivideWorkflow, yes: bool) -> Result<()> {
    let bar = spinner("Dividing tasks...");
    let started = workflow.start().await;
    bar.finish_and_clear();
    started.context("Division failed")?;

    loop {
        match workflow.step() {
            None => {
                println!("Division cancelled");
                return Ok(());
            }
            Some(Step::Carousel) => {
                if yes {
                    workflow.accept()?;
                } else {
                    carousel_prompt(workflow).await?;
                }
            }
            Some(Step::Summary) => {
                if summary_prompt(workflow, yes).await? {
                    return Ok(());
                }
            }
            Some(step) => bail!("Unexpected workflow step: {}", step),
        }
    }
}

async fn carousel_prompt(workflow: &DivideWorkflow) -> Result<()> {
    let state = workflow.state().context("Workflow closed unexpectedly")?;
    let item = state.current_item().context("No current item")?;
    println!();
    println!(
        "{} {}",
        style(format!("[{}/{}]", state.carousel_index() + 1, state.items().len())).dim(),
        style(&item.original.title).bold()
    );
    for (i, task) in item.generated.iter().enumerate() {
        println!("  {}. {}", i + 1, task_line(task));
    }

    let labels: Vec<&str> = CarouselAction::ALL.iter().map(|a| a.label()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Proposal")
        .items(&labels)
        .default(0)
        .interact()?;

    let result = match CarouselAction::from_index(selection) {
        CarouselAction::Accept => workflow.accept(),
        CarouselAction::Redivide => {
            let bar = spinner("Re-dividing...");
            let result = workflow.redivide().await;
            bar.finish_and_clear();
            result
        }
        CarouselAction::Edit => {
            let index = pick_generated(item.generated.len())?;
            let current = &item.generated[index];
            let title: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Title")
                .default(current.title.clone())
                .interact_text()?;
            let hours: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Estimated hours")
                .default(current.estimated_hours.unwrap_or(0.0).to_string())
                .interact_text()?;
            let update = TaskUpdate {
                title: Some(title),
                estimated_hours: hours.trim().parse().ok(),
                ..TaskUpdate::default()
            };
            workflow.update_generated(index, &update)
        }
        CarouselAction::Remove => {
            let index = pick_generated(item.generated.len())?;
            workflow.remove_generated(index).map(|_| ())
        }
        CarouselAction::Previous => workflow.previous(),
        CarouselAction::Next => workflow.next(),
        CarouselAction::Cancel => {
            workflow.close();
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("{} {}", style("!").red().bold(), e);
    }
    Ok(())
}

fn pick_generated(len: usize) -> Result<usize> {
    if len == 0 {
        bail!("This item has no subtasks left");
    }
    let labels: Vec<String> = (1..=len).map(|i| format!("Subtask {}", i)).collect();
    Ok(Select::with_theme(&ColorfulTheme::default())
        .items(&labels)
        .default(0)
        .interact()?)
}

/// Returns `false` when the user went back to the proposals.
async fn summary_prompt(workflow: &DivideWorkflow, yes: bool) -> Result<bool> {
    let state = workflow.state().context("Workflow closed unexpectedly")?;
    let summary = state.summary();
    println!();
    println!("{}", style(summary.headline()).bold());
    for task in &summary.generated {
        println!("  {}", task_line(task));
    }
    for task in &summary.skipped {
        println!("  {} #{} {}", style("kept").dim(), task.id, task.title);
    }

    if !yes {
        let labels: Vec<&str> = SummaryAction::ALL.iter().map(|a| a.label()).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Summary")
            .items(&labels)
            .default(0)
            .interact()
            .ok();
        match selection.map_or(SummaryAction::Cancel, SummaryAction::from_index) {
            SummaryAction::Apply => {}
            SummaryAction::Back => {
                workflow.back()?;
                return Ok(false);
            }
            SummaryAction::Cancel => {
                workflow.cancel()?;
                println!("Division cancelled");
                return Ok(true);
            }
        }
    }

    let bar = spinner("Saving subtasks...");
    let report = workflow.confirm().await;
    bar.finish_and_clear();
    print_report(&report?);
    Ok(true)
}

fn print_report(report: &CommitReport) {
    if let Some(error) = &report.delete_error {
        println!("{} Failed to delete original tasks: {}", style("✗").red(), error);
        return;
    }
    println!(
        "{} Replaced {} task(s) with {} subtask(s)",
        style("✓").green(),
        report.deleted.len(),
        report.created.len()
    );
    for failure in &report.failed {
        println!(
            "{} Failed to create '{}': {}",
            style("✗").red(),
            failure.title,
            failure.error
        );
    }
}
