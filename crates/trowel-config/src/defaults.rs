//! Environment variable names and fallback values.

/// Root URL of the PostgREST-style API.
pub const ENV_API_ENDPOINT: &str = "TROWEL_API_ENDPOINT";
/// Public domain the deployment is served from.
pub const ENV_DOMAIN_NAME: &str = "TROWEL_DOMAIN_NAME";
/// Upload endpoint of the file conversion service.
pub const ENV_CONVERSION_ENDPOINT: &str = "TROWEL_CONVERSION_ENDPOINT";
/// Redirect/proxy endpoint used for third-party URLs.
pub const ENV_REDIRECT_ENDPOINT: &str = "TROWEL_REDIRECT_ENDPOINT";
/// Request timeout applied to every HTTP call, in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TROWEL_HTTP_TIMEOUT_SECS";
/// Log level used when `RUST_LOG` is absent.
pub const ENV_LOG_LEVEL: &str = "TROWEL_LOG_LEVEL";
/// Log output format (`json` or `pretty`).
pub const ENV_LOG_FORMAT: &str = "TROWEL_LOG_FORMAT";

/// Default request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Path of the upload route on the conversion service.
pub(crate) const CONVERSION_UPLOAD_PATH: &str = "upload/";
