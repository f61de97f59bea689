//! Authentication and authorization.
//!
//! Every `/api` route except login and registration requires a bearer token:
//!
//! - Users log in via `/api/auth/login` with email/password and receive a signed JWT
//! - Clients send it back as `Authorization: Bearer <token>`
//! - The token identifies the user; each request reloads the account, so deactivating or deleting
//!   a user, or changing their role, applies to tokens already issued
//!
//! # Authorization
//!
//! Access control is role-based with an ownership rule layered on top: privileged roles
//! (`admin`, `jefe_comercial`) may change any record, everyone else only the records they own or
//! are assigned to. See [`permissions`] for the full table.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Permission checking and access control logic
//! - [`session`]: JWT creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use crm::auth::permissions::{RequiresPermission, operation, resource};
//!
//! async fn list_deals(
//!     State(state): State<AppState>,
//!     current_user: RequiresPermission<resource::Deals, operation::ReadAll>,
//! ) -> Result<Json<DealListResponse>> {
//!     tracing::debug!("listing deals for {}", current_user.email);
//!     // ...
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
