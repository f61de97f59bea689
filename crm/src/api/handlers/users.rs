use crate::{
    AppState,
    api::extractors::{Json, Path, Query},
    api::models::{
        summaries::MessageResponse,
        users::{CurrentUser, ListUsersQuery, UserCreate, UserListResponse, UserResponse, UserUpdate},
    },
    auth::{
        password,
        permissions::{RequiresPermission, check_record_access, has_permission, operation, resource},
    },
    db::{
        handlers::{Repository, Users, users::UserFilter},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Error, Result},
    metrics,
    types::{Operation, Permission, Resource, UserId},
};
use axum::{extract::State, http::StatusCode};

fn not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// Role and activation changes are administrative, even on one's own account.
fn check_access_change(current_user: &CurrentUser, update: &UserUpdate) -> Result<()> {
    if update.changes_access() && !has_permission(current_user, Resource::Users, Operation::UpdateAll) {
        return Err(Error::InsufficientPermissions {
            required: Permission::Allow(Resource::Users, Operation::UpdateAll),
            action: Operation::UpdateAll,
            resource: "user role or status".to_string(),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<UserListResponse>> {
    let (skip, limit) = query.pagination.params();
    let filter = UserFilter {
        search: query.search,
        role: query.role,
        is_active: query.is_active,
        ..UserFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(UserListResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total,
        &query.pagination,
    )))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    summary = "Get user",
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "User ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    description = "Admin only. The role defaults to `user`.",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Users, operation::CreateAll>,
    Json(create): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let rules = &state.config.auth.password;
    password::validate_password(&create.password, rules)?;
    let password_hash = password::hash_password_blocking(create.password.clone(), rules.argon2_params()).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest::new(create, password_hash))
        .await?;

    metrics::record_created(Resource::Users);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    summary = "Update user",
    description = "Users may edit their own profile and password. Changing `role` or `isActive` is admin only.",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to change this user"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "User ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: RequiresPermission<resource::Users, operation::UpdateOwn>,
    Json(mut update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    check_record_access(&current_user, Resource::Users, Operation::UpdateOwn, id, &[id])?;
    check_access_change(&current_user, &update)?;

    let password_hash = match update.password.take() {
        Some(new_password) => {
            let rules = &state.config.auth.password;
            password::validate_password(&new_password, rules)?;
            Some(password::hash_password_blocking(new_password, rules.argon2_params()).await?)
        }
        None => None,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut tx);
    repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    let user = repo.update(id, &UserUpdateDBRequest::new(update, password_hash)).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    summary = "Delete user",
    description = "Admin only. Users who still own or are assigned records cannot be deleted until those are reassigned.",
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete your own account"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User still owns records"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "User ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: RequiresPermission<resource::Users, operation::DeleteAll>,
) -> Result<Json<MessageResponse>> {
    if current_user.id == id {
        return Err(Error::BadRequest {
            message: "Cannot delete your own account".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Users::new(&mut conn).delete(id).await? {
        return Err(not_found(id));
    }

    metrics::record_deleted(Resource::Users);
    Ok(Json(MessageResponse::deleted("User")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{
            contacts::ContactResponse,
            users::{Role, UserListResponse, UserResponse},
        },
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_creates_user_who_can_log_in(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let response = app
            .post("/api/users")
            .add_header("authorization", bearer(&admin))
            .json(&json!({
                "email": "rep@example.com",
                "password": "long enough password",
                "firstName": "Sales",
                "lastName": "Rep",
                "role": "jefe_comercial"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: UserResponse = response.json();
        assert_eq!(created.role, Role::JefeComercial);
        assert!(created.is_active);

        let body: serde_json::Value = response.json();
        assert!(body.get("passwordHash").is_none());

        app.post("/api/auth/login")
            .json(&json!({ "email": "REP@example.com", "password": "long enough password" }))
            .await
            .assert_status_ok();

        // Email uniqueness ignores case
        app.post("/api/users")
            .add_header("authorization", bearer(&admin))
            .json(&json!({
                "email": "Rep@Example.com",
                "password": "long enough password",
                "firstName": "Dupe",
                "lastName": "Rep"
            }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_only_admins_create_users(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let manager = create_test_user(&pool, Role::JefeComercial).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        app.post("/api/users")
            .add_header("authorization", bearer(&manager))
            .json(&json!({
                "email": "new@example.com",
                "password": "long enough password",
                "firstName": "New",
                "lastName": "Hire"
            }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        app.post("/api/users")
            .add_header("authorization", bearer(&admin))
            .json(&json!({
                "email": "new@example.com",
                "password": "short",
                "firstName": "New",
                "lastName": "Hire"
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_and_filter(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        create_test_user(&pool, Role::JefeComercial).await;

        let all: UserListResponse = app
            .get("/api/users")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        // Includes the bootstrap admin
        assert_eq!(all.total, 3);

        let managers: UserListResponse = app
            .get("/api/users?role=jefe_comercial")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(managers.total, 1);

        let admins: UserListResponse = app
            .get("/api/users?search=admin@test")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(admins.total, 1);
        assert_eq!(admins.users[0].role, Role::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_self_service_profile_updates(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let path = format!("/api/users/{}", user.id);

        let response = app
            .put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "firstName": "Renamed", "phone": "+34 600 000 000" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<UserResponse>().first_name, "Renamed");

        app.put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "role": "admin" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.put(&path)
            .add_header("authorization", bearer(&other))
            .json(&json!({ "firstName": "Hijacked" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = app
            .put(&path)
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "role": "jefe_comercial", "isActive": false, "phone": null }))
            .await;
        response.assert_status_ok();
        let updated: UserResponse = response.json();
        assert_eq!(updated.role, Role::JefeComercial);
        assert!(!updated.is_active);
        assert_eq!(updated.phone, None);

        // The deactivated user's existing token stops working at once
        let response = app
            .post("/api/companies")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "After deactivation" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<serde_json::Value>()["error"], "Account is disabled");
        app.get("/api/auth/me")
            .add_header("authorization", bearer(&user))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_password_change(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, Role::User, "original password").await;
        let path = format!("/api/users/{}", user.id);

        app.put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "password": "tiny" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.put(&path)
            .add_header("authorization", bearer(&user))
            .json(&json!({ "password": "replacement password" }))
            .await
            .assert_status_ok();

        app.post("/api/auth/login")
            .json(&json!({ "email": user.email, "password": "original password" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        app.post("/api/auth/login")
            .json(&json!({ "email": user.email, "password": "replacement password" }))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_rules(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let idle = create_test_user(&pool, Role::User).await;
        let busy = create_test_user(&pool, Role::User).await;

        app.delete(&format!("/api/users/{}", admin.id))
            .add_header("authorization", bearer(&admin))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.delete(&format!("/api/users/{}", idle.id))
            .add_header("authorization", bearer(&busy))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let contact: ContactResponse = app
            .post("/api/contacts")
            .add_header("authorization", bearer(&busy))
            .json(&json!({ "firstName": "Keeps", "lastName": "Owner" }))
            .await
            .json();
        app.delete(&format!("/api/users/{}", busy.id))
            .add_header("authorization", bearer(&admin))
            .await
            .assert_status(StatusCode::CONFLICT);

        // Reassign, then the account can go
        app.put(&format!("/api/contacts/{}", contact.id))
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "ownerId": admin.id }))
            .await
            .assert_status_ok();
        app.delete(&format!("/api/users/{}", busy.id))
            .add_header("authorization", bearer(&admin))
            .await
            .assert_status_ok();

        let response = app
            .delete(&format!("/api/users/{}", idle.id))
            .add_header("authorization", bearer(&admin))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["message"], "User deleted successfully");

        app.get(&format!("/api/users/{}", idle.id))
            .add_header("authorization", bearer(&admin))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
