#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(unreachable_pub, clippy::all, clippy::pedantic, clippy::nursery)]

//! Environment-backed configuration for Trowel clients.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (environment
//! lookup and the process-wide slot), `validate.rs` (parsing helpers),
//! `defaults.rs` (fallback values).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, ENV_API_ENDPOINT, ENV_CONVERSION_ENDPOINT,
    ENV_DOMAIN_NAME, ENV_HTTP_TIMEOUT_SECS, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_REDIRECT_ENDPOINT,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{current, install, try_current};
pub use model::EnvConfig;
