use crate::{
    AppState,
    api::extractors::Json,
    api::models::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        users::{CurrentUser, Role, UserResponse},
    },
    auth::{password, session},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    errors::{Error, Result},
    metrics,
    types::Resource,
};
use axum::{extract::State, http::StatusCode};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

fn issue_token(user: UserDBResponse, state: &AppState) -> Result<AuthResponse> {
    let token = session::create_session_token(&CurrentUser::from(user.clone()), &state.config)?;
    Ok(AuthResponse {
        token,
        user: UserResponse::from(user),
    })
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or disabled account"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<AuthResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);

    let Some(user) = users.get_user_by_email(&request.email).await? else {
        metrics::record_login("invalid_credentials");
        return Err(invalid_credentials());
    };
    // Accounts without a password (e.g. a bootstrap admin without one configured) cannot log in
    let Some(hash) = user.password_hash.clone() else {
        metrics::record_login("invalid_credentials");
        return Err(invalid_credentials());
    };

    if !password::verify_password_blocking(request.password, hash).await? {
        metrics::record_login("invalid_credentials");
        return Err(invalid_credentials());
    }
    if !user.is_active {
        metrics::record_login("inactive");
        return Err(Error::Unauthenticated {
            message: Some("Account is disabled".to_string()),
        });
    }

    users.record_login(user.id).await?;
    let user = users.get_by_id(user.id).await?.ok_or_else(invalid_credentials)?;
    tracing::info!(user_id = %user.id, "user logged in");

    metrics::record_login("success");
    Ok(Json(issue_token(user, &state)?))
}

/// Create a `user`-role account and log it in
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input or registration disabled"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let rules = &state.config.auth.password;
    password::validate_password(&request.password, rules)?;
    let password_hash = password::hash_password_blocking(request.password, rules.argon2_params()).await?;

    let create = UserCreateDBRequest {
        email: request.email,
        password_hash: Some(password_hash),
        first_name: request.first_name,
        last_name: request.last_name,
        role: Role::User,
        phone: request.phone,
        avatar_url: None,
        is_active: true,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).create(&create).await?;
    tracing::info!(user_id = %user.id, "user registered");

    metrics::record_created(Resource::Users);
    Ok((StatusCode::CREATED, Json(issue_token(user, &state)?)))
}

/// The authenticated user's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    // The token may outlive the account
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("User no longer exists".to_string()),
        })?;

    Ok(Json(UserResponse::from(user)))
}
