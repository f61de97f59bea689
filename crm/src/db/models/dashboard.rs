//! Database models for dashboard aggregates.

use crate::api::models::contacts::LifecycleStage;
use crate::api::models::deals::DealStage;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Raw dashboard figures. Stages with no rows are absent from the breakdown maps.
#[derive(Debug, Clone, Default)]
pub struct DashboardStatsDBResponse {
    pub total_contacts: i64,
    pub total_companies: i64,
    pub total_deals: i64,
    pub open_deals: i64,
    pub open_tasks: i64,
    pub overdue_tasks: i64,
    pub open_tickets: i64,
    pub active_campaigns: i64,
    pub pipeline_value: Decimal,
    pub won_value: Decimal,
    pub contacts_by_stage: HashMap<LifecycleStage, i64>,
    /// Deal count and summed amount per stage
    pub deals_by_stage: HashMap<DealStage, (i64, Decimal)>,
}
