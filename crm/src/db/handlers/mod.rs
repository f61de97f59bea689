//! Repository implementations for database access.
//!
//! This module provides one repository struct per table. Repositories follow a consistent
//! pattern and implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a `&mut PgConnection` (a pooled connection or an open transaction)
//! - Loads associations (owner, company, contact, deal, ...) in the same joined SELECT as the row
//! - Shares one filter function between `list` and `count`, so totals always match the pages
//! - Returns domain models from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Users`]: Accounts, roles and login bookkeeping
//! - [`Companies`], [`Contacts`]: The people and organisations being sold to
//! - [`Deals`]: Sales pipeline
//! - [`Tasks`], [`Activities`]: Follow-ups and the interaction log
//! - [`Campaigns`], [`Automations`]: Marketing records (stored, never executed)
//! - [`Tickets`]: Support requests
//! - [`Subscriptions`], [`Payments`]: Billing records
//! - [`dashboard`]: Aggregate figures (free functions, not a repository)
//!
//! # Common Pattern
//!
//! ```ignore
//! use crm::db::handlers::{Contacts, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Contacts::new(&mut tx);
//!
//!     let contacts = repo.list(&ContactFilter::new(0, 10)).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod activities;
pub mod automations;
pub mod campaigns;
pub mod companies;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod payments;
pub mod repository;
pub(crate) mod sql;
pub mod subscriptions;
pub mod tasks;
pub mod tickets;
pub mod users;

pub use activities::Activities;
pub use automations::Automations;
pub use campaigns::Campaigns;
pub use companies::Companies;
pub use contacts::Contacts;
pub use deals::Deals;
pub use payments::Payments;
pub use repository::Repository;
pub use subscriptions::Subscriptions;
pub use tasks::Tasks;
pub use tickets::Tickets;
pub use users::Users;
