//! HTTP request handlers.
//!
//! - [`upload`]: single-tenant and multi-tenant image upload, plus their self-descriptions
//! - [`test_config`]: read-only check of a token / repository / branch combination
//!
//! Handlers only parse requests and shape responses. Validation, naming, the GitHub write and
//! URL derivation all live in [`crate::upload`].

pub mod test_config;
pub mod upload;
