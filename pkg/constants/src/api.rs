//! Authoritative lease API constants.

/// Bulk endpoint returning authoritative timing for up to a batch of lease ids.
pub const BULK_COUNTDOWN_PATH: &str = "/api/v1/leases/countdowns";

/// Default authoritative server address.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Default config file consulted by `countdownctl`.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/countdown/config.yaml";

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "COUNTDOWN_API_TOKEN";
