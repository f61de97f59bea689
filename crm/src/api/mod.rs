//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`extractors`]**: `Json`, `Path` and `Query` extractors whose rejections render as JSON errors
//!
//! # API Structure
//!
//! Everything is nested under `/api`:
//!
//! - **Authentication** (`/api/auth/*`): Login, registration, current user
//! - **Users** (`/api/users/*`): Accounts and roles
//! - **Records** (`/api/{companies,contacts,deals,tasks,activities,campaigns,automations,tickets,subscriptions,payments}`):
//!   `GET`/`POST` on the collection, `GET`/`PUT`/`DELETE` on `/{id}`
//! - **Dashboard** (`/api/dashboard/*`): Statistics and the recent activity feed
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! An interactive reference is served at `/api/docs` and the raw document at
//! `/api-docs/openapi.json`.

pub mod extractors;
pub mod handlers;
pub mod models;
