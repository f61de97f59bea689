use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        activities::{ActivityCreate, ActivityListResponse, ActivityResponse, ActivityUpdate, ListActivitiesQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Activities, Repository, activities::ActivityFilter},
        models::activities::{ActivityCreateDBRequest, ActivityUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{ActivityId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: ActivityId) -> Error {
    Error::NotFound {
        resource: "Activity".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/activities",
    tag = "activities",
    summary = "List activities",
    params(ListActivitiesQuery),
    responses(
        (status = 200, description = "Page of activities", body = ActivityListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ListActivitiesQuery>,
    _: RequiresPermission<resource::Activities, operation::ReadAll>,
) -> Result<Json<ActivityListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = ActivityFilter {
        search: query.search,
        user_id: query.user_id,
        activity_type: query.activity_type,
        contact_id: query.contact_id,
        company_id: query.company_id,
        deal_id: query.deal_id,
        ..ActivityFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Activities::new(&mut conn);
    let activities = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(ActivityListResponse::new(
        activities.into_iter().map(ActivityResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/activities/{id}",
    tag = "activities",
    summary = "Get activity",
    responses(
        (status = 200, description = "Activity with its user and linked records", body = ActivityResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Activity not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Activity ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_activity(
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
    _: RequiresPermission<resource::Activities, operation::ReadAll>,
) -> Result<Json<ActivityResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let activity = Activities::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(ActivityResponse::from(activity)))
}

#[utoipa::path(
    post,
    path = "/activities",
    tag = "activities",
    summary = "Create activity",
    description = "`userId` defaults to the caller and `occurredAt` to now.",
    request_body = ActivityCreate,
    responses(
        (status = 201, description = "Activity created", body = ActivityResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot log the activity for another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_activity(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Activities, operation::CreateOwn>,
    Json(create): Json<ActivityCreate>,
) -> Result<(StatusCode, Json<ActivityResponse>)> {
    check_owner_assignment(&current_user, Resource::Activities, Operation::CreateOwn, create.user_id)?;
    let request = ActivityCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let activity = Activities::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Activities);
    Ok((StatusCode::CREATED, Json(ActivityResponse::from(activity))))
}

#[utoipa::path(
    put,
    path = "/activities/{id}",
    tag = "activities",
    summary = "Update activity",
    request_body = ActivityUpdate,
    responses(
        (status = 200, description = "Activity updated", body = ActivityResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Activity was logged by another user"),
        (status = 404, description = "Activity not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Activity ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_activity(
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
    current_user: RequiresPermission<resource::Activities, operation::UpdateOwn>,
    Json(update): Json<ActivityUpdate>,
) -> Result<Json<ActivityResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Activities::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Activities, Operation::UpdateOwn, id, &[existing.user_id])?;
    check_owner_assignment(&current_user, Resource::Activities, Operation::UpdateOwn, update.user_id)?;

    let activity = repo.update(id, &ActivityUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ActivityResponse::from(activity)))
}

#[utoipa::path(
    delete,
    path = "/activities/{id}",
    tag = "activities",
    summary = "Delete activity",
    responses(
        (status = 200, description = "Activity deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Activity was logged by another user"),
        (status = 404, description = "Activity not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Activity ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<ActivityId>,
    current_user: RequiresPermission<resource::Activities, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Activities::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Activities, Operation::DeleteOwn, id, &[existing.user_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Activities);
    Ok(Json(MessageResponse::deleted("Activity")))
}
