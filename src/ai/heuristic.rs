use super::TaskRecommendation;
use crate::models::Task;

pub const MAX_RECOMMENDATIONS: usize = 3;

const REASON_HIGH_ESTIMATE: &str = "Esta tarea tiene una estimación de horas alta";
const REASON_LONG_TITLE: &str =
    "El título de esta tarea es extenso y contiene múltiples conceptos que podrían separarse.";
const REASON_DEFAULT: &str =
    "Esta tarea parece contener varios componentes que podrían dividirse para mejor seguimiento.";

fn hours_factor(hours: f64) -> f64 {
    if hours > 8.0 {
        5.0
    } else if hours > 4.0 {
        3.0
    } else {
        1.0
    }
}

fn reason_for(task: &Task, hours: f64) -> String {
    if hours > 8.0 {
        format!(
            "{} ({}h), lo que indica que podría ser demasiado grande.",
            REASON_HIGH_ESTIMATE, hours
        )
    } else if task.title.chars().count() > 50 {
        REASON_LONG_TITLE.to_string()
    } else {
        REASON_DEFAULT.to_string()
    }
}

/// Local ranking used when the analysis endpoint is unavailable.
///
/// Only tasks still in `Backlog` or `To Do` qualify. The score grows with
/// title length and jumps with the estimate; the best three are returned,
/// ties keeping input order.
pub fn rank_candidates(tasks: &[Task]) -> Vec<TaskRecommendation> {
    let mut ranked: Vec<TaskRecommendation> = tasks
        .iter()
        .filter(|task| task.is_divisible())
        .map(|task| {
            let hours = task.estimated_hours.unwrap_or(0.0);
            let title_complexity = task.title.chars().count() as f64 / 10.0;
            TaskRecommendation {
                task_id: task.id,
                reason: reason_for(task, hours),
                score: title_complexity * hours_factor(hours),
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(MAX_RECOMMENDATIONS);
    ranked
}
