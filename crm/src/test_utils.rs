//! Test utilities shared by the repository and HTTP tests.

use crate::auth::password::{self, Argon2Params};
use crate::config::{AuthConfig, Config, DatabaseConfig, PasswordConfig, PoolSettings};
use crate::{
    api::models::users::{CurrentUser, Role},
    auth::session,
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
};
use axum_test::TestServer;
use sqlx::PgPool;
use uuid::Uuid;

/// Cheapest parameters argon2 accepts, so tests that log in stay fast.
const TEST_ARGON2: Argon2Params = Argon2Params {
    memory_kib: 8,
    iterations: 1,
    parallelism: 1,
};

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();

    crate::Application::new_with_pool(config, pool)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        database: DatabaseConfig {
            // Tests hand the pool in directly
            url: "postgres://unused".to_string(),
            pool: PoolSettings {
                max_connections: 2,
                ..Default::default()
            },
        },
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: AuthConfig {
            allow_registration: true,
            password: PasswordConfig {
                argon2_memory_kib: TEST_ARGON2.memory_kib,
                argon2_iterations: TEST_ARGON2.iterations,
                argon2_parallelism: TEST_ARGON2.parallelism,
                ..Default::default()
            },
            ..Default::default()
        },
        enable_metrics: false,
        enable_otel_export: false,
    }
}

/// Insert an active user with a unique email and no password.
pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    insert_user(pool, role, None).await
}

/// Insert an active user who can log in with `password`.
pub async fn create_test_user_with_password(pool: &PgPool, role: Role, password: &str) -> UserDBResponse {
    let hash = password::hash_password(password, TEST_ARGON2).expect("Failed to hash password");
    insert_user(pool, role, Some(hash)).await
}

async fn insert_user(pool: &PgPool, role: Role, password_hash: Option<String>) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let suffix = Uuid::new_v4().simple().to_string();

    let request = UserCreateDBRequest {
        email: format!("user_{suffix}@example.com"),
        password_hash,
        first_name: "Test".to_string(),
        last_name: format!("User {}", &suffix[..6]),
        role,
        phone: None,
        avatar_url: None,
        is_active: true,
    };

    users_repo.create(&request).await.expect("Failed to create test user")
}

/// `Authorization` header value carrying a fresh session token for `user`.
pub fn bearer(user: &UserDBResponse) -> String {
    let current_user = CurrentUser::from(user.clone());
    let token = session::create_session_token(&current_user, &create_test_config()).expect("Failed to create session token");
    format!("Bearer {token}")
}
