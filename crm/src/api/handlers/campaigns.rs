use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        campaigns::{CampaignCreate, CampaignListResponse, CampaignResponse, CampaignUpdate, ListCampaignsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Campaigns, Repository, campaigns::CampaignFilter},
        models::campaigns::{CampaignCreateDBRequest, CampaignUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{CampaignId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: CampaignId) -> Error {
    Error::NotFound {
        resource: "Campaign".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "campaigns",
    summary = "List campaigns",
    params(ListCampaignsQuery),
    responses(
        (status = 200, description = "Page of campaigns", body = CampaignListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
    _: RequiresPermission<resource::Campaigns, operation::ReadAll>,
) -> Result<Json<CampaignListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = CampaignFilter {
        search: query.search,
        owner_id: query.owner_id,
        campaign_type: query.campaign_type,
        status: query.status,
        ..CampaignFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Campaigns::new(&mut conn);
    let campaigns = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(CampaignListResponse::new(
        campaigns.into_iter().map(CampaignResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "campaigns",
    summary = "Get campaign",
    responses(
        (status = 200, description = "Campaign with its owner and derived rates", body = CampaignResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Campaign not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    _: RequiresPermission<resource::Campaigns, operation::ReadAll>,
) -> Result<Json<CampaignResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let campaign = Campaigns::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(CampaignResponse::from(campaign)))
}

#[utoipa::path(
    post,
    path = "/campaigns",
    tag = "campaigns",
    summary = "Create campaign",
    request_body = CampaignCreate,
    responses(
        (status = 201, description = "Campaign created", body = CampaignResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the campaign to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_campaign(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Campaigns, operation::CreateOwn>,
    Json(create): Json<CampaignCreate>,
) -> Result<(StatusCode, Json<CampaignResponse>)> {
    check_owner_assignment(&current_user, Resource::Campaigns, Operation::CreateOwn, create.owner_id)?;
    let request = CampaignCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let campaign = Campaigns::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Campaigns);
    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

#[utoipa::path(
    put,
    path = "/campaigns/{id}",
    tag = "campaigns",
    summary = "Update campaign",
    request_body = CampaignUpdate,
    responses(
        (status = 200, description = "Campaign updated", body = CampaignResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the campaign's owner"),
        (status = 404, description = "Campaign not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    current_user: RequiresPermission<resource::Campaigns, operation::UpdateOwn>,
    Json(update): Json<CampaignUpdate>,
) -> Result<Json<CampaignResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Campaigns::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Campaigns, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Campaigns, Operation::UpdateOwn, update.owner_id)?;

    let campaign = repo.update(id, &CampaignUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(CampaignResponse::from(campaign)))
}

#[utoipa::path(
    delete,
    path = "/campaigns/{id}",
    tag = "campaigns",
    summary = "Delete campaign",
    responses(
        (status = 200, description = "Campaign deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the campaign's owner"),
        (status = 404, description = "Campaign not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Campaign ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    current_user: RequiresPermission<resource::Campaigns, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Campaigns::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Campaigns, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Campaigns);
    Ok(Json(MessageResponse::deleted("Campaign")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            campaigns::{CampaignListResponse, CampaignResponse, CampaignStatus, CampaignType},
            users::Role,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_rates_follow_counters(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = app
            .post("/api/campaigns")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Spring launch", "budget": "5000" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let campaign: CampaignResponse = response.json();
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.campaign_type, CampaignType::Email);
        assert_eq!(campaign.click_through_rate, None);

        let updated: CampaignResponse = app
            .put(&format!("/api/campaigns/{}", campaign.id))
            .add_header("authorization", bearer(&user))
            .json(&json!({ "status": "active", "impressions": 2000, "clicks": 100, "conversions": 25 }))
            .await
            .json();
        assert_eq!(updated.click_through_rate, Some(0.05));
        assert_eq!(updated.conversion_rate, Some(0.25));

        app.post("/api/campaigns")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Webinar series", "campaignType": "webinar" }))
            .await
            .assert_status(StatusCode::CREATED);

        let active: CampaignListResponse = app
            .get("/api/campaigns?status=active")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(active.total, 1);
        assert_eq!(active.campaigns[0].name, "Spring launch");

        let webinars: CampaignListResponse = app
            .get("/api/campaigns?campaignType=webinar")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(webinars.total, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_inconsistent_values_are_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        app.post("/api/campaigns")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Backwards", "startDate": "2026-05-01", "endDate": "2026-04-01" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.post("/api/campaigns")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Negative", "clicks": -3 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
