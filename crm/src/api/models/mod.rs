//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: API models are distinct from database models,
//!   allowing independent evolution of API and storage representations
//! - **Wire format**: JSON fields and query parameters are camelCase, enum values snake_case
//! - **Partial updates**: update bodies are all-optional; nullable columns use a double option
//!   so an explicit `null` clears the value
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//!
//! # Model Categories
//!
//! ## Records
//!
//! - [`companies`], [`contacts`]: Organisations and people, with their lifecycle stage
//! - [`deals`]: Pipeline stages and amounts
//! - [`tasks`], [`activities`]: Follow-ups and logged interactions
//! - [`campaigns`], [`automations`]: Marketing
//! - [`tickets`]: Support
//! - [`subscriptions`], [`payments`]: Billing
//!
//! ## Accounts
//!
//! - [`users`]: Profiles, roles, and the authenticated [`users::CurrentUser`]
//! - [`auth`]: Login and registration payloads
//!
//! ## Shared
//!
//! - [`pagination`]: `page`/`limit` parameters and the list response shape
//! - [`summaries`]: Compact views of associated records embedded in responses
//! - [`dashboard`]: Aggregate figures and the recent activity feed
//!
//! # Example
//!
//! ```ignore
//! use crm::api::models::contacts::{ContactCreate, ContactResponse};
//!
//! let create: ContactCreate = serde_json::from_str(json_str)?;
//! ```

pub mod activities;
pub mod auth;
pub mod automations;
pub mod campaigns;
pub mod companies;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod pagination;
pub mod payments;
pub mod subscriptions;
pub mod summaries;
pub mod tasks;
pub mod tickets;
pub mod users;
