use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    db::handlers::{Repository, Users},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{instrument, trace};

/// Pull the token out of `Authorization: Bearer <token>`.
/// Returns:
/// - Ok(None): No Authorization header present
/// - Ok(Some(token)): A bearer token was supplied
/// - Err(error): The header is present but unusable
fn bearer_token(parts: &Parts) -> Result<Option<&str>> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| Error::Unauthenticated {
        message: Some("Invalid authorization header".to_string()),
    })?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(Error::Unauthenticated {
            message: Some("Authorization header must use the Bearer scheme".to_string()),
        }),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = bearer_token(parts)? else {
            trace!("No authentication credentials found in request");
            return Err(Error::Unauthenticated {
                message: Some("Access token required".to_string()),
            });
        };

        let claims = session::verify_session_token(token, &state.config)?;

        // Tokens outlive account changes: reload so deactivation, deletion and role changes
        // apply to the next request
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let Some(account) = Users::new(&mut conn).get_by_id(claims.id).await? else {
            return Err(Error::Unauthenticated {
                message: Some("User no longer exists".to_string()),
            });
        };
        if !account.is_active {
            return Err(Error::Unauthenticated {
                message: Some("Account is disabled".to_string()),
            });
        }

        trace!("Authenticated user {}", account.id);
        Ok(CurrentUser::from(account))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        AppState,
        api::models::users::{CurrentUser, Role},
        auth::session::create_session_token,
        errors::Error,
        test_utils::{bearer, create_test_config, create_test_user},
    };
    use axum::{extract::FromRequestParts as _, http::request::Parts};
    use sqlx::PgPool;
    use uuid::Uuid;

    fn parts_with_authorization(value: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("http://localhost/api/contacts");
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        let (parts, _body) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn state(pool: PgPool) -> AppState {
        AppState::builder().db(pool).config(create_test_config()).build()
    }

    #[sqlx::test]
    async fn test_valid_bearer_token(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let state = state(pool);

        let mut parts = parts_with_authorization(Some(&bearer(&user)));
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
        assert_eq!(extracted.role, Role::User);
    }

    #[sqlx::test]
    async fn test_token_reflects_current_account_state(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let header = bearer(&user);
        let state = state(pool.clone());

        sqlx::query("UPDATE users SET role = 'jefe_comercial' WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();
        let mut parts = parts_with_authorization(Some(&header));
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.role, Role::JefeComercial);

        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();
        let mut parts = parts_with_authorization(Some(&header));
        match CurrentUser::from_request_parts(&mut parts, &state).await {
            Err(Error::Unauthenticated { message }) => assert_eq!(message.as_deref(), Some("Account is disabled")),
            other => panic!("expected 401, got {other:?}"),
        }
    }

    #[sqlx::test]
    async fn test_token_for_unknown_user_is_rejected(pool: PgPool) {
        let state = state(pool);
        let ghost = CurrentUser {
            id: Uuid::new_v4(),
            email: "ghost@example.com".to_string(),
            first_name: "Gone".to_string(),
            last_name: "Away".to_string(),
            role: Role::Admin,
        };
        let token = create_session_token(&ghost, &state.config).unwrap();

        let mut parts = parts_with_authorization(Some(&format!("Bearer {token}")));
        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[sqlx::test]
    async fn test_missing_header_is_unauthenticated(pool: PgPool) {
        let state = state(pool);
        let mut parts = parts_with_authorization(None);

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[sqlx::test]
    async fn test_wrong_scheme_and_garbage_token(pool: PgPool) {
        let state = state(pool);

        let mut parts = parts_with_authorization(Some("Basic dXNlcjpwYXNz"));
        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));

        let mut parts = parts_with_authorization(Some("Bearer not-a-jwt"));
        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }
}
