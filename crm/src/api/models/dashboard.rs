//! API response models for the dashboard.

use super::activities::ActivityResponse;
use super::contacts::LifecycleStage;
use super::deals::DealStage;
use crate::db::models::dashboard::DashboardStatsDBResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Whose records the figures cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatsScope {
    /// Every record in the organisation
    Organization,
    /// Records owned by (or assigned to) the caller
    Own,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStageCount {
    pub stage: LifecycleStage,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealStageTotal {
    pub stage: DealStage,
    pub count: i64,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub scope: StatsScope,
    pub total_contacts: i64,
    pub total_companies: i64,
    pub total_deals: i64,
    /// Deals not yet won or lost
    pub open_deals: i64,
    /// Pending or in-progress tasks
    pub open_tasks: i64,
    /// Open tasks whose due date has passed
    pub overdue_tasks: i64,
    /// Tickets not yet resolved or closed
    pub open_tickets: i64,
    pub active_campaigns: i64,
    /// Sum of open deal amounts
    #[schema(value_type = String)]
    pub pipeline_value: Decimal,
    /// Sum of `closed_won` deal amounts
    #[schema(value_type = String)]
    pub won_value: Decimal,
    /// One entry per lifecycle stage, zero counts included
    pub contacts_by_stage: Vec<LifecycleStageCount>,
    /// One entry per deal stage, zero counts included
    pub deals_by_stage: Vec<DealStageTotal>,
}

impl DashboardStats {
    pub fn new(scope: StatsScope, db: DashboardStatsDBResponse) -> Self {
        let contacts_by_stage = LifecycleStage::ALL
            .into_iter()
            .map(|stage| LifecycleStageCount {
                stage,
                count: db.contacts_by_stage.get(&stage).copied().unwrap_or(0),
            })
            .collect();
        let deals_by_stage = DealStage::ALL
            .into_iter()
            .map(|stage| {
                let (count, amount) = db.deals_by_stage.get(&stage).copied().unwrap_or_default();
                DealStageTotal { stage, count, amount }
            })
            .collect();

        Self {
            scope,
            total_contacts: db.total_contacts,
            total_companies: db.total_companies,
            total_deals: db.total_deals,
            open_deals: db.open_deals,
            open_tasks: db.open_tasks,
            overdue_tasks: db.overdue_tasks,
            open_tickets: db.open_tickets,
            active_campaigns: db.active_campaigns,
            pipeline_value: db.pipeline_value,
            won_value: db.won_value,
            contacts_by_stage,
            deals_by_stage,
        }
    }
}

pub const DEFAULT_RECENT_ACTIVITIES: i64 = 10;
pub const MAX_RECENT_ACTIVITIES: i64 = 50;

/// Query parameters for the recent activity feed
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct RecentActivitiesQuery {
    /// Number of activities to return (default 10, max 50)
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl RecentActivitiesQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_RECENT_ACTIVITIES)
            .clamp(1, MAX_RECENT_ACTIVITIES)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentActivitiesResponse {
    pub activities: Vec<ActivityResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_stage_breakdowns_include_empty_stages() {
        let db = DashboardStatsDBResponse {
            total_contacts: 3,
            contacts_by_stage: HashMap::from([(LifecycleStage::Customer, 2), (LifecycleStage::Lead, 1)]),
            deals_by_stage: HashMap::from([(DealStage::ClosedWon, (1, Decimal::new(500, 0)))]),
            ..Default::default()
        };
        let stats = DashboardStats::new(StatsScope::Own, db);

        assert_eq!(stats.contacts_by_stage.len(), LifecycleStage::ALL.len());
        let customers = stats
            .contacts_by_stage
            .iter()
            .find(|c| c.stage == LifecycleStage::Customer)
            .unwrap();
        assert_eq!(customers.count, 2);
        let evangelists = stats
            .contacts_by_stage
            .iter()
            .find(|c| c.stage == LifecycleStage::Evangelist)
            .unwrap();
        assert_eq!(evangelists.count, 0);

        assert_eq!(stats.deals_by_stage.len(), DealStage::ALL.len());
        assert_eq!(
            stats.deals_by_stage[4],
            DealStageTotal {
                stage: DealStage::ClosedWon,
                count: 1,
                amount: Decimal::new(500, 0)
            }
        );
        assert_eq!(stats.deals_by_stage[0].amount, Decimal::ZERO);
    }

    #[test]
    fn test_recent_activities_limit() {
        let query: RecentActivitiesQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query.limit(), 10);

        let query: RecentActivitiesQuery = serde_json::from_value(serde_json::json!({ "limit": "500" })).unwrap();
        assert_eq!(query.limit(), 50);

        let query: RecentActivitiesQuery = serde_json::from_value(serde_json::json!({ "limit": "0" })).unwrap();
        assert_eq!(query.limit(), 1);
    }
}
