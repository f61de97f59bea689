use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        contacts::{ContactCreate, ContactListResponse, ContactResponse, ContactUpdate, ListContactsQuery},
        summaries::MessageResponse,
    },
    auth::permissions::{RequiresPermission, check_owner_assignment, check_record_access, operation, resource},
    db::{
        handlers::{Contacts, Repository, contacts::ContactFilter},
        models::contacts::{ContactCreateDBRequest, ContactUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{ContactId, Operation, Resource},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: ContactId) -> Error {
    Error::NotFound {
        resource: "Contact".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/contacts",
    tag = "contacts",
    summary = "List contacts",
    params(ListContactsQuery),
    responses(
        (status = 200, description = "Page of contacts", body = ContactListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListContactsQuery>,
    _: RequiresPermission<resource::Contacts, operation::ReadAll>,
) -> Result<Json<ContactListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = ContactFilter {
        search: query.search,
        owner_id: query.owner_id,
        company_id: query.company_id,
        lifecycle_stage: query.lifecycle_stage,
        ..ContactFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::new(&mut conn);
    let contacts = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(ContactListResponse::new(
        contacts.into_iter().map(ContactResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = "contacts",
    summary = "Get contact",
    responses(
        (status = 200, description = "Contact with its company and owner", body = ContactResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Contact not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Contact ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    _: RequiresPermission<resource::Contacts, operation::ReadAll>,
) -> Result<Json<ContactResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(ContactResponse::from(contact)))
}

#[utoipa::path(
    post,
    path = "/contacts",
    tag = "contacts",
    summary = "Create contact",
    description = "The owner defaults to the caller. Only privileged users may create contacts for someone else.",
    request_body = ContactCreate,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot assign the contact to another user"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_contact(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Contacts, operation::CreateOwn>,
    Json(create): Json<ContactCreate>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    check_owner_assignment(&current_user, Resource::Contacts, Operation::CreateOwn, create.owner_id)?;
    let request = ContactCreateDBRequest::new(current_user.id, create);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::new(&mut tx).create(&request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_created(Resource::Contacts);
    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = "contacts",
    summary = "Update contact",
    request_body = ContactUpdate,
    responses(
        (status = 200, description = "Contact updated", body = ContactResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the contact's owner"),
        (status = 404, description = "Contact not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Contact ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    current_user: RequiresPermission<resource::Contacts, operation::UpdateOwn>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<ContactResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Contacts, Operation::UpdateOwn, id, &[existing.owner_id])?;
    check_owner_assignment(&current_user, Resource::Contacts, Operation::UpdateOwn, update.owner_id)?;

    let contact = repo.update(id, &ContactUpdateDBRequest::from(update)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ContactResponse::from(contact)))
}

#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "contacts",
    summary = "Delete contact",
    description = "Activities logged against the contact are deleted with it; deals, tasks and tickets are unlinked.",
    responses(
        (status = 200, description = "Contact deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the contact's owner"),
        (status = 404, description = "Contact not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Contact ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    current_user: RequiresPermission<resource::Contacts, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    check_record_access(&current_user, Resource::Contacts, Operation::DeleteOwn, id, &[existing.owner_id])?;

    if !repo.delete(id).await? {
        return Err(not_found(id));
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    metrics::record_deleted(Resource::Contacts);
    Ok(Json(MessageResponse::deleted("Contact")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            contacts::{ContactListResponse, ContactResponse, LifecycleStage},
            users::Role,
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_then_get(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = app
            .post("/api/contacts")
            .add_header("authorization", bearer(&user))
            .json(&json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "tags": ["vip"]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: ContactResponse = response.json();
        assert_eq!(created.owner_id, user.id);
        assert_eq!(created.owner.email, user.email);
        assert_eq!(created.lifecycle_stage, LifecycleStage::Lead);

        let response = app
            .get(&format!("/api/contacts/{}", created.id))
            .add_header("authorization", bearer(&user))
            .await;
        response.assert_status_ok();
        let fetched: ContactResponse = response.json();
        assert_eq!(fetched.first_name, "Ada");
        assert_eq!(fetched.email.as_deref(), Some("ada@example.com"));
        assert_eq!(fetched.tags, vec!["vip".to_string()]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_requires_authentication(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.get("/api/contacts").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert!(body["error"].is_string());

        let response = app.get("/api/contacts").add_header("authorization", "Bearer nope").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_pagination_and_search(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        for (first, last) in [("Grace", "Hopper"), ("Alan", "Turing"), ("Barbara", "Liskov"), ("Edsger", "Dijkstra")] {
            app.post("/api/contacts")
                .add_header("authorization", bearer(&user))
                .json(&json!({ "firstName": first, "lastName": last }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = app
            .get("/api/contacts?page=2&limit=3")
            .add_header("authorization", bearer(&user))
            .await;
        response.assert_status_ok();
        let page: ContactListResponse = response.json();
        assert_eq!(page.contacts.len(), 1);
        assert_eq!(page.total, 4);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);

        let response = app
            .get("/api/contacts?search=TURING")
            .add_header("authorization", bearer(&user))
            .await;
        let found: ContactListResponse = response.json();
        assert_eq!(found.total, 1);
        assert_eq!(found.contacts[0].first_name, "Alan");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_only_owner_or_privileged_may_change(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;
        let manager = create_test_user(&pool, Role::JefeComercial).await;

        let created: ContactResponse = app
            .post("/api/contacts")
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "firstName": "Owned", "lastName": "Contact" }))
            .await
            .json();
        let path = format!("/api/contacts/{}", created.id);

        app.put(&path)
            .add_header("authorization", bearer(&other))
            .json(&json!({ "jobTitle": "CTO" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.delete(&path)
            .add_header("authorization", bearer(&other))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = app
            .put(&path)
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "jobTitle": "CTO", "lifecycleStage": "customer" }))
            .await;
        response.assert_status_ok();
        let updated: ContactResponse = response.json();
        assert_eq!(updated.job_title.as_deref(), Some("CTO"));
        assert_eq!(updated.lifecycle_stage, LifecycleStage::Customer);

        // Handing the contact to someone else is privileged
        app.put(&path)
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "ownerId": other.id }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        let response = app
            .put(&path)
            .add_header("authorization", bearer(&manager))
            .json(&json!({ "ownerId": other.id }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<ContactResponse>().owner_id, other.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_then_get_is_not_found(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let created: ContactResponse = app
            .post("/api/contacts")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "firstName": "Short", "lastName": "Lived" }))
            .await
            .json();
        let path = format!("/api/contacts/{}", created.id);

        let response = app.delete(&path).add_header("authorization", bearer(&user)).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Contact deleted successfully");

        app.get(&path)
            .add_header("authorization", bearer(&user))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        app.put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "notes": "too late" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
