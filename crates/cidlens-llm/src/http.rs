//! Shared HTTP client construction.

use std::time::Duration;

/// Create the HTTP client used for embedding requests.
///
/// Config: 10s connect timeout, rustls TLS, `cidlens/{version}` user-agent,
/// redirect limit 10. Request timeouts are set per call.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("cidlens/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}
