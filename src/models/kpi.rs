use serde::{Deserialize, Serialize};

/// Per-member productivity figures from `GET /kpis/completion-rate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Kpi {
    pub member_name: String,
    pub completed_tasks: u32,
    pub total_assigned_tasks: u32,
    pub completion_rate_percent: f64,
    pub total_actual_hours: f64,
    pub total_estimated_hours: f64,
}
