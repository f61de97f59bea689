//! # crm: a self-hostable CRM backend
//!
//! `crm` serves the REST API behind a sales and support CRM: companies and the contacts who work
//! there, the deals in the pipeline, the tasks and logged activities that move them along,
//! marketing campaigns and automations, support tickets, and billing subscriptions and payments.
//!
//! ## Overview
//!
//! Every resource follows the same conventions. Collections support `page`/`limit` pagination,
//! a case-insensitive `search` and per-resource filters; records are created with `POST`,
//! partially updated with `PUT`, and deleted with `DELETE`. Records have an owner (or, for tasks
//! and tickets, an assignee and a creator) who may change them; administrators and sales
//! managers (`jefe_comercial`) may change anything.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! A request to `/api/*` carries a bearer token issued by `/api/auth/login`. The
//! [`auth::permissions::RequiresPermission`] extractor verifies the token and checks the caller's
//! role against the operation the handler declares. The handler then opens a connection (or a
//! transaction when it reads before it writes), loads the record if needed to check ownership,
//! and calls the matching repository in [`db::handlers`]. Repositories return database models
//! which handlers convert to the API models in [`api::models`].
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) holds the route handlers and the request/response models, all
//! annotated for the OpenAPI document served at `/api-docs/openapi.json`.
//!
//! The **authentication layer** ([`auth`]) issues and verifies JWT session tokens, hashes
//! passwords with Argon2id, and maps roles to permissions.
//!
//! The **database layer** ([`db`]) uses the repository pattern: one repository per table, each
//! implementing [`db::handlers::Repository`]. Foreign keys in the schema decide what happens to
//! related records on delete.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use crm::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = crm::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     crm::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded in the binary and run on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! crm::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod metrics;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    auth::password::{self, Argon2Params},
    config::CorsOrigin,
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue, Method},
    routing::get,
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the crm database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing account with `email` keeps its id and is promoted back to an active
/// admin; its password is replaced only when `password` is given. Without a password the admin
/// exists (and can own records) but cannot log in.
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin_user(
    email: &str,
    password: Option<&str>,
    db: &PgPool,
    params: Argon2Params,
) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(password) => Some(password::hash_password_blocking(password.to_string(), params).await?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    let user_id = match user_repo.get_user_by_email(email).await? {
        Some(existing) => {
            let update = UserUpdateDBRequest {
                password_hash,
                role: Some(Role::Admin),
                is_active: Some(true),
                ..Default::default()
            };
            user_repo.update(existing.id, &update).await?;
            existing.id
        }
        None => {
            let create = UserCreateDBRequest {
                email: email.to_string(),
                password_hash,
                first_name: "Admin".to_string(),
                last_name: "User".to_string(),
                role: Role::Admin,
                phone: None,
                avatar_url: None,
                is_active: true,
            };
            let created = user_repo.create(&create).await?;
            info!(user_id = %created.id, "created initial admin user");
            created.id
        }
    };

    tx.commit().await?;
    Ok(user_id)
}

/// Connect to PostgreSQL with the configured pool settings and run migrations.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
        .connect(&config.database.url)
        .await?;
    info!(max_connections = settings.max_connections, "connected to database");

    migrator().run(&pool).await?;
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry the trailing slash `Url` adds
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - `/api/*`: the REST API
/// - `/api/docs` and `/api-docs/openapi.json`: API reference
/// - `/healthz`: liveness probe
/// - `/internal/metrics`: Prometheus metrics, when `enable_metrics` is set
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{
        activities, auth, automations, campaigns, companies, contacts, dashboard, deals, payments, subscriptions, tasks, tickets,
        users,
    };

    let api_routes = Router::new()
        // Authentication
        .route("/auth/login", axum::routing::post(auth::login))
        .route("/auth/register", axum::routing::post(auth::register))
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", get(users::get_user).put(users::update_user).delete(users::delete_user))
        // Records
        .route("/companies", get(companies::list_companies).post(companies::create_company))
        .route(
            "/companies/{id}",
            get(companies::get_company).put(companies::update_company).delete(companies::delete_company),
        )
        .route("/contacts", get(contacts::list_contacts).post(contacts::create_contact))
        .route(
            "/contacts/{id}",
            get(contacts::get_contact).put(contacts::update_contact).delete(contacts::delete_contact),
        )
        .route("/deals", get(deals::list_deals).post(deals::create_deal))
        .route("/deals/{id}", get(deals::get_deal).put(deals::update_deal).delete(deals::delete_deal))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/{id}", get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task))
        .route("/activities", get(activities::list_activities).post(activities::create_activity))
        .route(
            "/activities/{id}",
            get(activities::get_activity)
                .put(activities::update_activity)
                .delete(activities::delete_activity),
        )
        .route("/campaigns", get(campaigns::list_campaigns).post(campaigns::create_campaign))
        .route(
            "/campaigns/{id}",
            get(campaigns::get_campaign).put(campaigns::update_campaign).delete(campaigns::delete_campaign),
        )
        .route("/automations", get(automations::list_automations).post(automations::create_automation))
        .route(
            "/automations/{id}",
            get(automations::get_automation)
                .put(automations::update_automation)
                .delete(automations::delete_automation),
        )
        .route("/tickets", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/tickets/{id}",
            get(tickets::get_ticket).put(tickets::update_ticket).delete(tickets::delete_ticket),
        )
        .route("/subscriptions", get(subscriptions::list_subscriptions).post(subscriptions::create_subscription))
        .route(
            "/subscriptions/{id}",
            get(subscriptions::get_subscription)
                .put(subscriptions::update_subscription)
                .delete(subscriptions::delete_subscription),
        )
        .route("/payments", get(payments::list_payments).post(payments::create_payment))
        .route(
            "/payments/{id}",
            get(payments::get_payment).put(payments::update_payment).delete(payments::delete_payment),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::get_stats))
        .route("/dashboard/recent-activities", get(dashboard::get_recent_activities));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", api_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled server.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and ensures the
///    initial admin user exists
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting CRM server with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Build the application on an existing, already migrated pool.
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        create_initial_admin_user(
            &config.admin_email,
            config.admin_password.as_deref(),
            &pool,
            config.auth.password.argon2_params(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "CRM server listening on http://{}, API reference at http://localhost:{}/api/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{AppState, create_initial_admin_user};
    use crate::{
        api::models::users::Role,
        auth::password::{self, Argon2Params},
        db::handlers::Users,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use sqlx::{ConnectOptions, PgPool};

    fn fast_params() -> Argon2Params {
        create_test_config().auth.password.argon2_params()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_new_user(pool: PgPool) {
        let email = "new-admin@example.com";

        let user_id = create_initial_admin_user(email, Some("bootstrap password"), &pool, fast_params())
            .await
            .expect("Should create admin user");

        let mut conn = pool.acquire().await.unwrap();
        let created = Users::new(&mut conn)
            .get_user_by_email(email)
            .await
            .unwrap()
            .expect("User should exist");
        assert_eq!(created.id, user_id);
        assert_eq!(created.role, Role::Admin);
        assert!(created.is_active);
        let hash = created.password_hash.expect("password set");
        assert!(password::verify_password("bootstrap password", &hash).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_is_idempotent(pool: PgPool) {
        let existing = create_test_user_with_password(&pool, Role::User, "old password").await;

        let user_id = create_initial_admin_user(&existing.email, None, &pool, fast_params())
            .await
            .expect("Should handle existing user");
        assert_eq!(user_id, existing.id);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_user_by_email(&existing.email).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        // No password given, so the old one still works
        assert!(password::verify_password("old password", user.password_hash.as_deref().unwrap()).unwrap());

        create_initial_admin_user(&existing.email, Some("new password"), &pool, fast_params())
            .await
            .unwrap();
        let user = Users::new(&mut conn).get_user_by_email(&existing.email).await.unwrap().unwrap();
        assert!(password::verify_password("new password", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_bootstrap_admin_can_log_in(pool: PgPool) {
        let mut config = create_test_config();
        config.admin_password = Some("admin password".to_string());
        let server = crate::Application::new_with_pool(config, pool)
            .await
            .unwrap()
            .into_test_server();

        let response = server
            .post("/api/auth/login")
            .json(&serde_json::json!({ "email": "admin@test.com", "password": "admin password" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["user"]["role"], "admin");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_application_integration(pool: PgPool) {
        let mut config = create_test_config();
        config.database.url = pool.connect_options().to_url_lossy().to_string();

        let app = crate::Application::new(config).await;
        assert!(app.is_ok(), "Application::new should succeed");
        let server = app.unwrap().into_test_server();

        let health_response = server.get("/healthz").await;
        health_response.assert_status_ok();
        assert_eq!(health_response.text(), "OK");

        let openapi_response = server.get("/api-docs/openapi.json").await;
        openapi_response.assert_status_ok();
        let doc: serde_json::Value = openapi_response.json();
        assert!(doc["paths"]["/contacts"].is_object());

        server.get("/api/docs").await.assert_status_ok();

        // API routes require a token
        server.get("/api/users").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_preflight(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.security.cors.allowed_origins = vec![crate::config::CorsOrigin::Url(
            "https://crm.example.com".parse().unwrap(),
        )];
        let state = AppState::builder().db(pool).config(config).build();
        let server = axum_test::TestServer::new(super::build_router(&state).unwrap()).unwrap();

        let response = server
            .method(axum::http::Method::OPTIONS, "/api/contacts")
            .add_header("origin", "https://crm.example.com")
            .add_header("access-control-request-method", "PUT")
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://crm.example.com"
        );
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_disabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = false;

        let state = AppState::builder().db(pool).config(config).build();
        let router = super::build_router(&state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        server.get("/internal/metrics").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_enabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = true;

        let state = AppState::builder().db(pool).config(config).build();
        let router = super::build_router(&state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        server.get("/healthz").await.assert_status_ok();

        let metrics_response = server.get("/internal/metrics").await;
        metrics_response.assert_status_ok();
        let metrics_content = metrics_response.text();
        assert!(metrics_content.contains("# TYPE"));
    }
}
