use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        subscriptions::{SubscriptionCreate, SubscriptionListResponse, SubscriptionResponse, SubscriptionUpdate, ListSubscriptionsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Subscriptions, Repository, subscriptions::SubscriptionFilter},
        models::subscriptions::{SubscriptionCreateDBRequest, SubscriptionUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{SubscriptionId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: SubscriptionId) -> Error {
    Error::NotFound {
        resource: "Subscription".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscriptions",
    summary = "List subscriptions",
    params(ListSubscriptionsQuery),
    responses(
        (status = 200, description = "Page of subscriptions", body = SubscriptionListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<ListSubscriptionsQuery>,
    _: RequiresPermission<resource::Subscriptions, operation::ReadAll>,
) -> Result<Json<SubscriptionListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = SubscriptionFilter {
        search: query.search,
        owner_id: query.owner_id,
        status: query.status,
        contact_id: query.contact_id,
        company_id: query.company_id,
        ..SubscriptionFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut conn);
    let subscriptions = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(SubscriptionListResponse::new(
        subscriptions.into_iter().map(SubscriptionResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Get subscription",
    responses(
        (status = 200, description = "Subscription with its contact, company and owner", body = SubscriptionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
    _: RequiresPermission<resource::Subscriptions, operation::ReadAll>,
) -> Result<Json<SubscriptionResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let subscription = Subscriptions::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscriptions",
    summary = "Create subscription",
    description = "`startDate` defaults to today. Payments referencing the subscription keep their history when it is deleted.",
    request_body = SubscriptionCreate,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the subscription to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_subscription(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Subscriptions, operation::CreateOwn>,
    Json(create): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    check_owner_assignment(&current_user, Resource::Subscriptions, Operation::CreateOwn, create.owner_id)?;
    let request = SubscriptionCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let subscription = Subscriptions::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Subscriptions);
    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(subscription))))
}

#[utoipa::path(
    put,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Update subscription",
    request_body = SubscriptionUpdate,
    responses(
        (status = 200, description = "Subscription updated", body = SubscriptionResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the subscription's owner"),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
    current_user: RequiresPermission<resource::Subscriptions, operation::UpdateOwn>,
    Json(update): Json<SubscriptionUpdate>,
) -> Result<Json<SubscriptionResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Subscriptions, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Subscriptions, Operation::UpdateOwn, update.owner_id)?;

    let subscription = repo.update(id, &SubscriptionUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Delete subscription",
    description = "Payments made against the subscription are kept and unlinked.",
    responses(
        (status = 200, description = "Subscription deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the subscription's owner"),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
    current_user: RequiresPermission<resource::Subscriptions, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Subscriptions::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Subscriptions, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Subscriptions);
    Ok(Json(MessageResponse::deleted("Subscription")))
}
