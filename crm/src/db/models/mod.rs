//! Database record models.
//!
//! Each entity has three shapes here:
//!
//! - `<Entity>CreateDBRequest`: a fully defaulted insert, built from the API create body and the
//!   id of the user making the request
//! - `<Entity>UpdateDBRequest`: a partial update, where `None` leaves a column alone and, for
//!   nullable columns, `Some(None)` clears it
//! - `<Entity>DBResponse`: a row plus its eager-loaded associations
//!
//! Database models are distinct from API models so storage and the wire format can evolve
//! independently; API models convert from these with `From`.

pub mod activities;
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
