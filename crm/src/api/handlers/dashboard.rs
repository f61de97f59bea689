//! Dashboard figures and the recent activity feed.
//!
//! Privileged roles see the whole organisation; everyone else sees their own records.

use crate::{
    AppState,
    api::extractors::{Json, Query},
    api::models::{
        activities::ActivityResponse,
        dashboard::{DashboardStats, RecentActivitiesQuery, RecentActivitiesResponse, StatsScope},
    },
    auth::permissions::{RequiresPermission, can_read_all_resources, operation, resource},
    db::handlers::{Activities, Repository, activities::ActivityFilter, dashboard},
    errors::{Error, Result},
    types::Resource,
};
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    summary = "Dashboard statistics",
    description = "Organisation-wide for admins and sales managers, otherwise limited to the caller's own records.",
    responses(
        (status = 200, description = "Aggregate figures", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_stats(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Dashboard, operation::ReadOwn>,
) -> Result<Json<DashboardStats>> {
    let (scope, owner) = if can_read_all_resources(&current_user, Resource::Dashboard) {
        (StatsScope::Organization, None)
    } else {
        (StatsScope::Own, Some(current_user.id))
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let stats = dashboard::get_dashboard_stats(&mut conn, owner).await?;

    Ok(Json(DashboardStats::new(scope, stats)))
}

#[utoipa::path(
    get,
    path = "/dashboard/recent-activities",
    tag = "dashboard",
    summary = "Recent activities",
    params(RecentActivitiesQuery),
    responses(
        (status = 200, description = "Most recent activities first", body = RecentActivitiesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_recent_activities(
    State(state): State<AppState>,
    Query(query): Query<RecentActivitiesQuery>,
    current_user: RequiresPermission<resource::Dashboard, operation::ReadOwn>,
) -> Result<Json<RecentActivitiesResponse>> {
    let mut filter = ActivityFilter::new(0, query.limit());
    if !can_read_all_resources(&current_user, Resource::Dashboard) {
        filter.user_id = Some(current_user.id);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let activities = Activities::new(&mut conn).list(&filter).await?;

    Ok(Json(RecentActivitiesResponse {
        activities: activities.into_iter().map(ActivityResponse::from).collect(),
    }))
}
