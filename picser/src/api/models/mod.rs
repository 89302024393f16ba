//! API request and response data models.
//!
//! These define the public HTTP contract and are shared with [`crate::client`], which decodes
//! the same types on the other side of the wire. All models carry `utoipa` schemas.
//!
//! - [`upload`]: upload responses and endpoint self-descriptions
//! - [`test_config`]: the repository configuration check

pub mod test_config;
pub mod upload;
