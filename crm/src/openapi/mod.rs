//! OpenAPI documentation configuration.
//!
//! [`api::ApiDoc`] describes every route under `/api`. It is served as JSON at
//! `/api-docs/openapi.json` and rendered with Scalar at `/api/docs`.

pub mod api;

pub use api::ApiDoc;
