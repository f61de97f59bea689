//! Aggregate queries behind the dashboard.
//!
//! Every figure can be scoped to one user. Records count as theirs by `owner_id`, except tasks
//! and tickets, which count by assignee.

use crate::{
    api::models::{contacts::LifecycleStage, deals::DealStage},
    db::{errors::Result, models::dashboard::DashboardStatsDBResponse},
    types::{UserId, abbrev_uuid},
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(FromRow)]
struct Totals {
    total_contacts: i64,
    total_companies: i64,
    total_deals: i64,
    open_deals: i64,
    open_tasks: i64,
    overdue_tasks: i64,
    open_tickets: i64,
    active_campaigns: i64,
    pipeline_value: Decimal,
    won_value: Decimal,
}

#[derive(FromRow)]
struct ContactStageRow {
    stage: LifecycleStage,
    count: i64,
}

#[derive(FromRow)]
struct DealStageRow {
    stage: DealStage,
    count: i64,
    amount: Decimal,
}

/// Compute dashboard figures, over every record when `owner` is `None`.
#[instrument(skip_all, fields(owner = ?owner.as_ref().map(abbrev_uuid)), err)]
pub async fn get_dashboard_stats(conn: &mut PgConnection, owner: Option<UserId>) -> Result<DashboardStatsDBResponse> {
    let totals = sqlx::query_as::<_, Totals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM contacts WHERE $1::uuid IS NULL OR owner_id = $1) AS total_contacts,
            (SELECT COUNT(*) FROM companies WHERE $1::uuid IS NULL OR owner_id = $1) AS total_companies,
            (SELECT COUNT(*) FROM deals WHERE $1::uuid IS NULL OR owner_id = $1) AS total_deals,
            (SELECT COUNT(*) FROM deals
                WHERE stage NOT IN ('closed_won', 'closed_lost')
                  AND ($1::uuid IS NULL OR owner_id = $1)) AS open_deals,
            (SELECT COUNT(*) FROM tasks
                WHERE status IN ('pending', 'in_progress')
                  AND ($1::uuid IS NULL OR assigned_to_id = $1)) AS open_tasks,
            (SELECT COUNT(*) FROM tasks
                WHERE status IN ('pending', 'in_progress') AND due_date < NOW()
                  AND ($1::uuid IS NULL OR assigned_to_id = $1)) AS overdue_tasks,
            (SELECT COUNT(*) FROM tickets
                WHERE status NOT IN ('resolved', 'closed')
                  AND ($1::uuid IS NULL OR assigned_to_id = $1)) AS open_tickets,
            (SELECT COUNT(*) FROM campaigns
                WHERE status = 'active'
                  AND ($1::uuid IS NULL OR owner_id = $1)) AS active_campaigns,
            (SELECT COALESCE(SUM(amount), 0) FROM deals
                WHERE stage NOT IN ('closed_won', 'closed_lost')
                  AND ($1::uuid IS NULL OR owner_id = $1)) AS pipeline_value,
            (SELECT COALESCE(SUM(amount), 0) FROM deals
                WHERE stage = 'closed_won'
                  AND ($1::uuid IS NULL OR owner_id = $1)) AS won_value
        "#,
    )
    .bind(owner)
    .fetch_one(&mut *conn)
    .await?;

    let contact_stages = sqlx::query_as::<_, ContactStageRow>(
        r#"
        SELECT lifecycle_stage AS stage, COUNT(*) AS count
        FROM contacts
        WHERE $1::uuid IS NULL OR owner_id = $1
        GROUP BY lifecycle_stage
        "#,
    )
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;

    let deal_stages = sqlx::query_as::<_, DealStageRow>(
        r#"
        SELECT stage, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS amount
        FROM deals
        WHERE $1::uuid IS NULL OR owner_id = $1
        GROUP BY stage
        "#,
    )
    .bind(owner)
    .fetch_all(&mut *conn)
    .await?;

    Ok(DashboardStatsDBResponse {
        total_contacts: totals.total_contacts,
        total_companies: totals.total_companies,
        total_deals: totals.total_deals,
        open_deals: totals.open_deals,
        open_tasks: totals.open_tasks,
        overdue_tasks: totals.overdue_tasks,
        open_tickets: totals.open_tickets,
        active_campaigns: totals.active_campaigns,
        pipeline_value: totals.pipeline_value,
        won_value: totals.won_value,
        contacts_by_stage: contact_stages.into_iter().map(|r| (r.stage, r.count)).collect(),
        deals_by_stage: deal_stages.into_iter().map(|r| (r.stage, (r.count, r.amount))).collect(),
    })
}
