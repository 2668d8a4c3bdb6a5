use thiserror::Error;

/// Top-level error type for the `wifigate-api` crate.
///
/// Covers every failure mode of the site-scoped REST surface: login,
/// session expiry, transport, envelope errors, and decoding.
/// `wifigate-core` folds these into its controller failure taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session cookie expired or was revoked; a fresh login may fix it.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Controller ──────────────────────────────────────────────────
    /// Structured error from the controller (`meta.rc != "ok"`, non-2xx status,
    /// or a UniFi OS `{"error": {...}}` body).
    #[error("Controller API error: {message}")]
    Api { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the session is gone and a re-login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` for timeouts and connection failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expired_is_auth_expired() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(
            !Error::Authentication {
                message: "bad password".into()
            }
            .is_auth_expired()
        );
    }

    #[test]
    fn api_errors_are_not_transient() {
        let err = Error::Api {
            message: "api.err.InvalidObject".into(),
        };
        assert!(!err.is_transient());
        assert!(!err.is_timeout());
    }
}
