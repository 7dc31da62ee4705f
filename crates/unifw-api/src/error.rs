use thiserror::Error;

use crate::models::ValidationError;

/// Top-level error type for the `unifw-api` crate.
///
/// Covers every failure mode of the client: configuration, authentication,
/// transport, controller-reported API errors, and JSON (de)serialization.
/// The CLI maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Builder or setter received a value the client can't work with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// No session cookie / CSRF token stored -- `login` was never called
    /// or the session was logged out.
    #[error("Not authenticated -- login required")]
    NotAuthenticated,

    /// Session cookie has expired.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// Login succeeded but the expected session cookie was not set.
    #[error("Login response did not set the '{name}' cookie")]
    MissingSessionCookie { name: &'static str },

    /// Login succeeded but no CSRF token header was returned.
    #[error("Login response did not include an X-CSRF-Token header")]
    MissingCsrfToken,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Controller answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Error reported in the `{meta: {rc, msg}}` envelope.
    #[error("Controller API error: {message}")]
    Api {
        message: String,
        validation: Vec<ValidationError>,
    },

    /// The controller reported success but returned no record.
    #[error("Controller returned no {resource} record")]
    EmptyResponse { resource: &'static str },

    // ── Data ────────────────────────────────────────────────────────
    /// Request body could not be serialized to JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::SessionExpired | Self::NotAuthenticated
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            Self::Api { message, .. } => message.starts_with("api.err.IdInvalid"),
            _ => false,
        }
    }

    /// Field-level validation failures reported by the controller, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Api { validation, .. } => validation,
            _ => &[],
        }
    }
}
