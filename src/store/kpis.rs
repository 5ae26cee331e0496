use super::EntityStore;
use crate::errors::StoreError;
use crate::models::Kpi;

/// Scope of a KPI query. A sprint wins over a team when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KpiFilter {
    pub sprint_id: Option<i64>,
    pub team_id: Option<i64>,
    pub aggregated: bool,
}

impl KpiFilter {
    pub fn path(&self) -> String {
        let mut params = Vec::new();
        if let Some(sprint) = self.sprint_id {
            params.push(format!("sprintId={}", sprint));
        } else if let Some(team) = self.team_id {
            params.push(format!("teamId={}", team));
        }
        if self.aggregated {
            params.push("aggregated=true".to_string());
        }
        if params.is_empty() {
            "/kpis/completion-rate".to_string()
        } else {
            format!("/kpis/completion-rate?{}", params.join("&"))
        }
    }
}

impl EntityStore {
    pub fn kpis(&self) -> Vec<Kpi> {
        self.state().kpis.clone()
    }

    pub async fn fetch_kpis(&self, filter: KpiFilter) -> Result<Vec<Kpi>, StoreError> {
        let result = self.gateway.get::<Vec<Kpi>>(&filter.path()).await;
        let kpis = self.settle("fetch_kpis", result)?;
        self.state().kpis = kpis.clone();
        Ok(kpis)
    }
}
