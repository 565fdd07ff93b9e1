// ── Core error types ──
//
// Errors the engine reports to its host. HTTP details are folded into a
// few domain variants by the `From<flowscope_api::Error>` impl, so the
// error view never has to know about status codes or JSON bodies.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Fetch errors ─────────────────────────────────────────────────
    #[error("Cannot reach appliance: {reason}")]
    Unreachable { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Appliance request timed out")]
    Timeout,

    #[error("{endpoint} returned HTTP {status}")]
    Status { status: u16, endpoint: String },

    #[error("Malformed appliance response: {message}")]
    MalformedResponse { message: String },

    // ── Asset errors ─────────────────────────────────────────────────
    #[error("Cannot load icon {path}: {message}")]
    Icon { path: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Worth another attempt on the next refresh tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<flowscope_api::Error> for CoreError {
    fn from(err: flowscope_api::Error) -> Self {
        match err {
            flowscope_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            flowscope_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if let Some(status) = e.status() {
                    CoreError::Status {
                        status: status.as_u16(),
                        endpoint: e.url().map(|u| u.path().to_owned()).unwrap_or_default(),
                    }
                } else {
                    CoreError::Unreachable {
                        reason: e.to_string(),
                    }
                }
            }
            flowscope_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            flowscope_api::Error::Tls(msg) => CoreError::Unreachable {
                reason: format!("TLS error: {msg}"),
            },
            flowscope_api::Error::Status { status, endpoint } => {
                CoreError::Status { status, endpoint }
            }
            flowscope_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}
