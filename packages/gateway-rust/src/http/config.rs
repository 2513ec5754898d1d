//! HTTP listener configuration.

use std::time::Duration;

/// Bind address and transport-level limits for the REST surface.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    /// 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Upper bound on handling one HTTP request. Kept above the bus request
    /// timeout so a bus timeout surfaces as 504 rather than this limit.
    pub request_timeout: Duration,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(75),
            drain_timeout: Duration::from_secs(30),
        }
    }
}
