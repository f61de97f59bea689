use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        deals::{DealCreate, DealListResponse, DealResponse, DealUpdate, ListDealsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Deals, Repository, deals::DealFilter},
        models::deals::{DealCreateDBRequest, DealUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{DealId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: DealId) -> Error {
    Error::NotFound {
        resource: "Deal".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/deals",
    tag = "deals",
    summary = "List deals",
    params(ListDealsQuery),
    responses(
        (status = 200, description = "Page of deals", body = DealListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_deals(
    State(state): State<AppState>,
    Query(query): Query<ListDealsQuery>,
    _: RequiresPermission<resource::Deals, operation::ReadAll>,
) -> Result<Json<DealListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = DealFilter {
        search: query.search,
        owner_id: query.owner_id,
        stage: query.stage,
        contact_id: query.contact_id,
        company_id: query.company_id,
        ..DealFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Deals::new(&mut conn);
    let deals = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(DealListResponse::new(
        deals.into_iter().map(DealResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/deals/{id}",
    tag = "deals",
    summary = "Get deal",
    responses(
        (status = 200, description = "Deal with its contact, company and owner", body = DealResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Deal not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Deal ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_deal(
    State(state): State<AppState>,
    Path(id): Path<DealId>,
    _: RequiresPermission<resource::Deals, operation::ReadAll>,
) -> Result<Json<DealResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deal = Deals::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(DealResponse::from(deal)))
}

#[utoipa::path(
    post,
    path = "/deals",
    tag = "deals",
    summary = "Create deal",
    description = "The owner defaults to the caller. A deal created in a closed stage is stamped with `closedAt`.",
    request_body = DealCreate,
    responses(
        (status = 201, description = "Deal created", body = DealResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the deal to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_deal(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Deals, operation::CreateOwn>,
    Json(create): Json<DealCreate>,
) -> Result<(StatusCode, Json<DealResponse>)> {
    check_owner_assignment(&current_user, Resource::Deals, Operation::CreateOwn, create.owner_id)?;
    let request = DealCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let deal = Deals::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Deals);
    Ok((StatusCode::CREATED, Json(DealResponse::from(deal))))
}

#[utoipa::path(
    put,
    path = "/deals/{id}",
    tag = "deals",
    summary = "Update deal",
    description = "Moving a deal into `closed_won` or `closed_lost` stamps `closedAt`; moving it back to an open stage clears it.",
    request_body = DealUpdate,
    responses(
        (status = 200, description = "Deal updated", body = DealResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the deal's owner"),
        (status = 404, description = "Deal not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Deal ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_deal(
    State(state): State<AppState>,
    Path(id): Path<DealId>,
    current_user: RequiresPermission<resource::Deals, operation::UpdateOwn>,
    Json(update): Json<DealUpdate>,
) -> Result<Json<DealResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Deals::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Deals, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Deals, Operation::UpdateOwn, update.owner_id)?;

    let deal = repo.update(id, &DealUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(DealResponse::from(deal)))
}

#[utoipa::path(
    delete,
    path = "/deals/{id}",
    tag = "deals",
    summary = "Delete deal",
    description = "Activities logged against the deal are deleted with it; tasks and tickets are unlinked.",
    responses(
        (status = 200, description = "Deal deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the deal's owner"),
        (status = 404, description = "Deal not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Deal ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_deal(
    State(state): State<AppState>,
    Path(id): Path<DealId>,
    current_user: RequiresPermission<resource::Deals, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Deals::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Deals, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Deals);
    Ok(Json(MessageResponse::deleted("Deal")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            contacts::ContactResponse,
            deals::{DealListResponse, DealResponse, DealStage},
            users::Role,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_contact(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let contact: ContactResponse = app
            .post("/api/contacts")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "firstName": "Buyer", "lastName": "Person" }))
            .await
            .json();

        let response = app
            .post("/api/deals")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Annual licence", "amount": "12000.50", "contactId": contact.id }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let deal: DealResponse = response.json();
        assert_eq!(deal.stage, DealStage::Lead);
        assert_eq!(deal.amount, Decimal::new(1200050, 2));
        assert!(deal.closed_at.is_none());
        let summary = deal.contact.expect("contact summary");
        assert_eq!(summary.id, contact.id);
        assert_eq!(summary.first_name, "Buyer");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_closing_stamps_closed_at(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let deal: DealResponse = app
            .post("/api/deals")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Pilot", "stage": "negotiation" }))
            .await
            .json();
        let path = format!("/api/deals/{}", deal.id);

        let won: DealResponse = app
            .put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "stage": "closed_won" }))
            .await
            .json();
        assert_eq!(won.stage, DealStage::ClosedWon);
        assert!(won.closed_at.is_some());

        let reopened: DealResponse = app
            .put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "stage": "proposal" }))
            .await
            .json();
        assert!(reopened.closed_at.is_none());

        let by_stage: DealListResponse = app
            .get("/api/deals?stage=proposal")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(by_stage.total, 1);
        assert_eq!(by_stage.deals[0].id, deal.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_out_of_range_values_are_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        app.post("/api/deals")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Too sure", "probability": 150 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.post("/api/deals")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Negative", "amount": "-1" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.post("/api/deals")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Unknown stage", "stage": "maybe" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
