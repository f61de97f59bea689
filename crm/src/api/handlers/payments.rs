use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        payments::{PaymentCreate, PaymentListResponse, PaymentResponse, PaymentUpdate, ListPaymentsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Payments, Repository, payments::PaymentFilter},
        models::payments::{PaymentCreateDBRequest, PaymentUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{PaymentId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: PaymentId) -> Error {
    Error::NotFound {
        resource: "Payment".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    summary = "List payments",
    params(ListPaymentsQuery),
    responses(
        (status = 200, description = "Page of payments", body = PaymentListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
    _: RequiresPermission<resource::Payments, operation::ReadAll>,
) -> Result<Json<PaymentListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = PaymentFilter {
        search: query.search,
        owner_id: query.owner_id,
        status: query.status,
        subscription_id: query.subscription_id,
        contact_id: query.contact_id,
        ..PaymentFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut conn);
    let payments = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(PaymentListResponse::new(
        payments.into_iter().map(PaymentResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payments",
    summary = "Get payment",
    responses(
        (status = 200, description = "Payment with its subscription, contact, company and owner", body = PaymentResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Payment ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
    _: RequiresPermission<resource::Payments, operation::ReadAll>,
) -> Result<Json<PaymentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(PaymentResponse::from(payment)))
}

#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    summary = "Create payment",
    request_body = PaymentCreate,
    responses(
        (status = 201, description = "Payment created", body = PaymentResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the payment to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Payments, operation::CreateOwn>,
    Json(create): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<PaymentResponse>)> {
    check_owner_assignment(&current_user, Resource::Payments, Operation::CreateOwn, create.owner_id)?;
    let request = PaymentCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Payments);
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

#[utoipa::path(
    put,
    path = "/payments/{id}",
    tag = "payments",
    summary = "Update payment",
    request_body = PaymentUpdate,
    responses(
        (status = 200, description = "Payment updated", body = PaymentResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the payment's owner"),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Payment ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
    current_user: RequiresPermission<resource::Payments, operation::UpdateOwn>,
    Json(update): Json<PaymentUpdate>,
) -> Result<Json<PaymentResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Payments, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Payments, Operation::UpdateOwn, update.owner_id)?;

    let payment = repo.update(id, &PaymentUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PaymentResponse::from(payment)))
}

#[utoipa::path(
    delete,
    path = "/payments/{id}",
    tag = "payments",
    summary = "Delete payment",
    responses(
        (status = 200, description = "Payment deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the payment's owner"),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Payment ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
    current_user: RequiresPermission<resource::Payments, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Payments, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Payments);
    Ok(Json(MessageResponse::deleted("Payment")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            payments::{PaymentListResponse, PaymentMethod, PaymentResponse, PaymentStatus},
            subscriptions::SubscriptionResponse,
            users::Role,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_payment_against_subscription(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let subscription: SubscriptionResponse = app
            .post("/api/subscriptions")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "planName": "Team", "amount": "99" }))
            .await
            .json();

        let response = app
            .post("/api/payments")
            .add_header("authorization", bearer(&user))
            .json(&json!({
                "amount": "99",
                "method": "bank_transfer",
                "reference": "INV-0001",
                "subscriptionId": subscription.id
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let payment: PaymentResponse = response.json();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.method, PaymentMethod::BankTransfer);
        let summary = payment.subscription.expect("subscription summary");
        assert_eq!(summary.plan_name, "Team");

        app.post("/api/payments")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "amount": "15", "reference": "one-off" }))
            .await
            .assert_status(StatusCode::CREATED);

        let for_subscription: PaymentListResponse = app
            .get(&format!("/api/payments?subscriptionId={}", subscription.id))
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(for_subscription.total, 1);
        assert_eq!(for_subscription.payments[0].id, payment.id);

        // Deleting the subscription keeps the payment history
        app.delete(&format!("/api/subscriptions/{}", subscription.id))
            .add_header("authorization", bearer(&user))
            .await
            .assert_status_ok();
        let kept: PaymentResponse = app
            .get(&format!("/api/payments/{}", payment.id))
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(kept.subscription_id, None);
        assert_eq!(kept.reference.as_deref(), Some("INV-0001"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_amount_must_be_positive(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        app.post("/api/payments")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "amount": "0" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.post("/api/payments")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "method": "cash" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_completing_a_payment(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;

        let payment: PaymentResponse = app
            .post("/api/payments")
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "amount": "250.00" }))
            .await
            .json();
        let path = format!("/api/payments/{}", payment.id);

        app.put(&path)
            .add_header("authorization", bearer(&other))
            .json(&json!({ "status": "completed" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let completed: PaymentResponse = app
            .put(&path)
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "status": "completed", "paidAt": "2026-02-01T09:30:00Z" }))
            .await
            .json();
        assert_eq!(completed.status, PaymentStatus::Completed);
        assert!(completed.paid_at.is_some());

        let listed: PaymentListResponse = app
            .get("/api/payments?status=completed")
            .add_header("authorization", bearer(&other))
            .await
            .json();
        assert_eq!(listed.total, 1);
    }
}
