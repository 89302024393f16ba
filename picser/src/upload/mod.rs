//! Upload pipeline and its building blocks.
//!
//! - [`validator`]: type and size checks
//! - [`naming`]: collision-resistant repository paths
//! - [`urls`]: the six access URLs for a committed file
//! - [`resolver`]: where an upload goes (per-request or configured)
//! - [`pipeline`]: the orchestrator tying them together

pub mod naming;
pub mod pipeline;
pub mod resolver;
pub mod urls;
pub mod validator;

pub use pipeline::{IncomingFile, UploadResult, Uploader};
pub use resolver::{ConfiguredResolver, PerRequestResolver, RequestFields, TargetResolver};
pub use urls::UploadUrls;
pub use validator::ValidationError;
