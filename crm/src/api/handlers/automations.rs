use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        automations::{AutomationCreate, AutomationListResponse, AutomationResponse, AutomationUpdate, ListAutomationsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Automations, Repository, automations::AutomationFilter},
        models::automations::{AutomationCreateDBRequest, AutomationUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{AutomationId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: AutomationId) -> Error {
    Error::NotFound {
        resource: "Automation".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/automations",
    tag = "automations",
    summary = "List automations",
    params(ListAutomationsQuery),
    responses(
        (status = 200, description = "Page of automations", body = AutomationListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_automations(
    State(state): State<AppState>,
    Query(query): Query<ListAutomationsQuery>,
    _: RequiresPermission<resource::Automations, operation::ReadAll>,
) -> Result<Json<AutomationListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = AutomationFilter {
        search: query.search,
        owner_id: query.owner_id,
        trigger_type: query.trigger_type,
        status: query.status,
        ..AutomationFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Automations::new(&mut conn);
    let automations = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(AutomationListResponse::new(
        automations.into_iter().map(AutomationResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/automations/{id}",
    tag = "automations",
    summary = "Get automation",
    responses(
        (status = 200, description = "Automation with its owner", body = AutomationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Automation not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Automation ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_automation(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    _: RequiresPermission<resource::Automations, operation::ReadAll>,
) -> Result<Json<AutomationResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let automation = Automations::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(AutomationResponse::from(automation)))
}

#[utoipa::path(
    post,
    path = "/automations",
    tag = "automations",
    summary = "Create automation",
    description = "Automations are stored definitions; nothing executes them. `conditions` and `actions` must be JSON arrays.",
    request_body = AutomationCreate,
    responses(
        (status = 201, description = "Automation created", body = AutomationResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the automation to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_automation(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Automations, operation::CreateOwn>,
    Json(create): Json<AutomationCreate>,
) -> Result<(StatusCode, Json<AutomationResponse>)> {
    create.validate().map_err(|message| Error::BadRequest { message })?;
    check_owner_assignment(&current_user, Resource::Automations, Operation::CreateOwn, create.owner_id)?;
    let request = AutomationCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let automation = Automations::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Automations);
    Ok((StatusCode::CREATED, Json(AutomationResponse::from(automation))))
}

#[utoipa::path(
    put,
    path = "/automations/{id}",
    tag = "automations",
    summary = "Update automation",
    request_body = AutomationUpdate,
    responses(
        (status = 200, description = "Automation updated", body = AutomationResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the automation's owner"),
        (status = 404, description = "Automation not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Automation ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_automation(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    current_user: RequiresPermission<resource::Automations, operation::UpdateOwn>,
    Json(update): Json<AutomationUpdate>,
) -> Result<Json<AutomationResponse>> {
    update.validate().map_err(|message| Error::BadRequest { message })?;
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Automations::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Automations, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Automations, Operation::UpdateOwn, update.owner_id)?;

    let automation = repo.update(id, &AutomationUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(AutomationResponse::from(automation)))
}

#[utoipa::path(
    delete,
    path = "/automations/{id}",
    tag = "automations",
    summary = "Delete automation",
    responses(
        (status = 200, description = "Automation deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the automation's owner"),
        (status = 404, description = "Automation not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Automation ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_automation(
    State(state): State<AppState>,
    Path(id): Path<AutomationId>,
    current_user: RequiresPermission<resource::Automations, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Automations::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Automations, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Automations);
    Ok(Json(MessageResponse::deleted("Automation")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            automations::{AutomationListResponse, AutomationResponse, AutomationStatus, AutomationTrigger},
            users::Role,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_steps_must_be_arrays(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = app
            .post("/api/automations")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Broken", "conditions": { "field": "stage" } }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap_or_default().contains("conditions must be a JSON array"));

        let response = app
            .post("/api/automations")
            .add_header("authorization", bearer(&user))
            .json(&json!({
                "name": "Welcome",
                "triggerType": "contact_created",
                "conditions": [{ "field": "lifecycleStage", "equals": "lead" }],
                "actions": [{ "type": "create_task", "title": "Say hello" }]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let automation: AutomationResponse = response.json();
        assert_eq!(automation.trigger_type, AutomationTrigger::ContactCreated);
        assert_eq!(automation.status, AutomationStatus::Draft);
        assert_eq!(automation.actions[0]["title"], "Say hello");

        app.put(&format!("/api/automations/{}", automation.id))
            .add_header("authorization", bearer(&user))
            .json(&json!({ "actions": "send everything" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_defaults_and_filters(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let manual: AutomationResponse = app
            .post("/api/automations")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Nightly cleanup" }))
            .await
            .json();
        assert_eq!(manual.trigger_type, AutomationTrigger::Manual);
        assert_eq!(manual.conditions, json!([]));

        let activated: AutomationResponse = app
            .put(&format!("/api/automations/{}", manual.id))
            .add_header("authorization", bearer(&user))
            .json(&json!({ "status": "active" }))
            .await
            .json();
        assert_eq!(activated.status, AutomationStatus::Active);

        let active: AutomationListResponse = app
            .get("/api/automations?status=active&triggerType=manual")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(active.total, 1);
        assert_eq!(active.automations[0].id, manual.id);
    }
}
