//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures, shared with [`crate::client`]
//!
//! # API Structure
//!
//! - `POST /api/upload`: upload to the deployment's configured repository (single-tenant)
//! - `POST /api/public-upload`: upload to a repository named in the request (multi-tenant)
//! - `POST /api/test-config`: check a token and repository without writing
//! - `GET` on each of the above returns a description of the endpoint
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The interactive reference is served at
//! `/api-docs` and the raw document at `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
