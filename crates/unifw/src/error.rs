//! CLI error types with miette diagnostics.
//!
//! Maps `unifw_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use unifw_api::Error as ApiError;
use unifw_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(unifw::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             URL: {url}\n\
             Try: unifw session check --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: ApiError,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(unifw::tls_error),
        help(
            "Controllers usually use a self-signed certificate.\n\
             Use --insecure (-k) to accept it, or set ca_cert in your profile."
        )
    )]
    Tls { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(unifw::auth_failed),
        help(
            "Verify the username and password for this controller.\n\
             Run: unifw config set-password --profile <name>"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(unifw::no_credentials),
        help(
            "Configure credentials with: unifw config init\n\
             Or set UNIFW_USERNAME and UNIFW_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(unifw::not_found),
        help("Run: unifw {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Controller rejected the request: {message}")]
    #[diagnostic(code(unifw::api_error), help("{hint}"))]
    Api { message: String, hint: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(unifw::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(unifw::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: unifw config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(unifw::no_config),
        help(
            "Create a config with: unifw config init\n\
             Expected at: {path}\n\
             Or pass --controller / set UNIFW_CONTROLLER."
        )
    )]
    NoConfig { path: String },

    #[error("Failed to load configuration")]
    #[diagnostic(code(unifw::config))]
    Config(#[source] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(unifw::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(unifw::timeout),
        help("Increase the timeout with --timeout or check controller responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Everything else from the client ──────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(unifw::client))]
    Client(ApiError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(unifw::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Client(e) if e.is_not_found() => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the controller URL to transport failures.
    pub fn with_url(self, url: &str) -> Self {
        match self {
            Self::Client(source @ ApiError::Transport(_)) => Self::ConnectionFailed {
                url: url.to_owned(),
                source,
            },
            other => other,
        }
    }
}

fn api_hint(validation: &[unifw_api::ValidationError]) -> String {
    if validation.is_empty() {
        return "Check the request fields; run with -vv to see the exchange.".into();
    }
    let fields = validation
        .iter()
        .map(|v| {
            format!(
                "  {} must match {}",
                v.field.as_deref().unwrap_or("?"),
                v.pattern.as_deref().unwrap_or("?")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Invalid fields:\n{fields}")
}

// ── unifw_api::Error → CliError mapping ──────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication { message } => Self::AuthFailed { message },
            ApiError::NotAuthenticated
            | ApiError::SessionExpired
            | ApiError::MissingSessionCookie { .. }
            | ApiError::MissingCsrfToken => Self::AuthFailed {
                message: err.to_string(),
            },
            ApiError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            ApiError::Tls(message) => Self::Tls { message },
            ApiError::InvalidConfig(reason) => Self::Validation {
                field: "input".into(),
                reason,
            },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "controller".into(),
                reason: e.to_string(),
            },
            ApiError::Api {
                ref message,
                ref validation,
            } if !err.is_not_found() => Self::Api {
                message: message.clone(),
                hint: api_hint(validation),
            },
            other => Self::Client(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(see: unifw config show)".into(),
            },
            other => Self::Config(other),
        }
    }
}
