//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request deserialization
//! - Authentication and authorization checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Login, self-service registration, and the current user's profile
//! - [`users`]: User administration and profile updates
//! - [`companies`], [`contacts`], [`deals`], [`tasks`], [`activities`]: Core CRM records
//! - [`campaigns`], [`automations`]: Marketing
//! - [`tickets`]: Support
//! - [`subscriptions`], [`payments`]: Billing
//! - [`dashboard`]: Aggregate figures and the recent activity feed
//!
//! Record handlers share one shape: `list_*` (paginated, filterable), `get_*`, `create_*` (201),
//! `update_*` (partial, via `PUT`) and `delete_*`.
//!
//! # Authentication
//!
//! Every handler except login and registration requires a bearer token. Handlers declare what
//! they need with [`crate::auth::permissions::RequiresPermission`]; record-level checks
//! (owner, assignee) happen once the record has been loaded.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the matching HTTP status code and a
//! `{"error": "..."}` body.

pub mod activities;
pub mod auth;
pub mod automations;
pub mod campaigns;
pub mod companies;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod payments;
pub mod subscriptions;
pub mod tasks;
pub mod tickets;
pub mod users;
