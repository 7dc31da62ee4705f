// Controller session + request executor
//
// A `Controller` owns the HTTP client and the session (cookie, CSRF token,
// cached credentials). Every resource call funnels through `execute`, which
// authorizes the request, sends it, and picks up rotated CSRF tokens.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{ControllerPlatform, Credentials, join_path};
use crate::error::Error;
use crate::models::{ApiResponse, api_error, preview};
use crate::session::{
    CSRF_HEADER, SessionCookie, SessionState, csrf_from_headers, header_string,
};
use crate::site::{DEFAULT_SITE, Site};
use crate::transport::{TlsMode, TransportConfig};

/// Treat cookies this close to their expiry as already expired.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

fn validate_base_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidConfig(format!(
            "base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidConfig(format!("base URL '{raw}' has no host")));
    }
    Ok(url)
}

fn margin_delta(margin: Duration) -> TimeDelta {
    TimeDelta::from_std(margin).unwrap_or(TimeDelta::MAX)
}

// ── Builder ──────────────────────────────────────────────────────────

/// Builder for [`Controller`].
///
/// ```no_run
/// # async fn demo() -> Result<(), unifw_api::Error> {
/// use std::time::Duration;
/// use unifw_api::{Controller, ControllerPlatform};
///
/// let controller = Controller::builder()
///     .base_url("https://192.168.1.1")
///     .platform(ControllerPlatform::UnifiOs)
///     .timeout(Duration::from_secs(30))
///     .tls_verification(false)
///     .build()?;
///
/// controller.login("admin", &"secret".to_string().into()).await?;
/// let rules = controller.default_site().list_firewall_rules().await?;
/// println!("{} rules", rules.len());
/// controller.logout().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ControllerBuilder {
    base_url: Option<String>,
    platform: ControllerPlatform,
    transport: TransportConfig,
    reauthenticate: bool,
    expiry_margin: Duration,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            platform: ControllerPlatform::default(),
            transport: TransportConfig::default(),
            reauthenticate: true,
            expiry_margin: DEFAULT_EXPIRY_MARGIN,
        }
    }
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller root, e.g. `https://192.168.1.1` or `https://host:8443`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Controller platform (defaults to classic endpoints).
    pub fn platform(mut self, platform: ControllerPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Per-request timeout. `Duration::ZERO` means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    pub fn tls(mut self, tls: TlsMode) -> Self {
        self.transport.tls = tls;
        self
    }

    /// Shorthand for system roots (`true`) or accepting any certificate (`false`).
    pub fn tls_verification(mut self, verify: bool) -> Self {
        self.transport.tls = if verify {
            TlsMode::System
        } else {
            TlsMode::DangerAcceptInvalid
        };
        self
    }

    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Log in again with the cached credentials when the session expires
    /// (default `true`).
    pub fn reauthenticate(mut self, enabled: bool) -> Self {
        self.reauthenticate = enabled;
        self
    }

    /// Clock-skew allowance applied to the cookie expiry.
    pub fn expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    pub fn build(self) -> Result<Controller, Error> {
        let raw = self
            .base_url
            .ok_or_else(|| Error::InvalidConfig("base URL is required".into()))?;
        let base_url = validate_base_url(&raw)?;
        let http = self.transport.build_client()?;

        Ok(Controller {
            http,
            base_url,
            platform: self.platform,
            transport: self.transport,
            reauthenticate: self.reauthenticate,
            expiry_margin: self.expiry_margin,
            session: RwLock::new(SessionState::default()),
        })
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// Session-holding client for a single UniFi controller.
///
/// Session state sits behind a lock so [`Site`] handles can borrow the
/// controller immutably. Callers should still avoid racing `login` and
/// `logout` against in-flight requests.
pub struct Controller {
    http: reqwest::Client,
    base_url: Url,
    platform: ControllerPlatform,
    transport: TransportConfig,
    reauthenticate: bool,
    expiry_margin: Duration,
    session: RwLock<SessionState>,
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn platform(&self) -> ControllerPlatform {
        self.platform
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// The underlying HTTP client (e.g. for platform detection).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Point the controller at a different base URL. Drops the session,
    /// since the cookie belongs to the old host.
    pub fn set_base_url(&mut self, url: &str) -> Result<(), Error> {
        self.base_url = validate_base_url(url)?;
        self.write_session().clear();
        Ok(())
    }

    /// Switch endpoint layout. Drops the session (cookie names differ).
    pub fn set_platform(&mut self, platform: ControllerPlatform) {
        self.platform = platform;
        self.write_session().clear();
    }

    /// Change the request timeout; rebuilds the HTTP client.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        let transport = TransportConfig {
            timeout,
            ..self.transport.clone()
        };
        self.replace_transport(transport)
    }

    /// Change TLS handling; rebuilds the HTTP client.
    pub fn set_tls(&mut self, tls: TlsMode) -> Result<(), Error> {
        let transport = TransportConfig {
            tls,
            ..self.transport.clone()
        };
        self.replace_transport(transport)
    }

    pub fn set_tls_verification(&mut self, verify: bool) -> Result<(), Error> {
        self.set_tls(if verify {
            TlsMode::System
        } else {
            TlsMode::DangerAcceptInvalid
        })
    }

    pub fn set_reauthenticate(&mut self, enabled: bool) {
        self.reauthenticate = enabled;
    }

    fn replace_transport(&mut self, transport: TransportConfig) -> Result<(), Error> {
        self.http = transport.build_client()?;
        self.transport = transport;
        Ok(())
    }

    // ── Sites ────────────────────────────────────────────────────────

    /// A handle for the site with the given name.
    pub fn site(&self, name: impl Into<String>) -> Result<Site<'_>, Error> {
        Site::new(self, name)
    }

    /// A handle for the `default` site.
    pub fn default_site(&self) -> Site<'_> {
        Site::default_for(self)
    }

    // ── Session ──────────────────────────────────────────────────────

    fn read_session(&self) -> RwLockReadGuard<'_, SessionState> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.transport.timeout_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Authenticate with the controller using username/password.
    ///
    /// The login endpoint differs by platform:
    /// - UniFi OS: `POST /api/auth/login`
    /// - Classic: `POST /api/login`
    ///
    /// On success the session cookie and CSRF token are stored, along with
    /// the credentials for later re-authentication.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        self.login_with(Credentials::new(username, password.clone()))
            .await
    }

    async fn login_with(&self, credentials: Credentials) -> Result<(), Error> {
        let url = join_path(&self.base_url, self.platform.login_path())?;
        debug!(username = %credentials.username, "logging in at {}", url);

        let body = json!({
            "username": credentials.username,
            "password": credentials.password.expose_secret(),
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {}", preview(&body)),
            });
        }

        let cookie_name = self.platform.session_cookie_name();
        let cookie = SessionCookie::from_response(&resp, cookie_name)
            .ok_or(Error::MissingSessionCookie { name: cookie_name })?;
        let csrf_token = header_string(resp.headers(), CSRF_HEADER).ok_or(Error::MissingCsrfToken)?;

        debug!(expires = ?cookie.expires(), "login successful");

        let mut session = self.write_session();
        session.cookie = Some(cookie);
        session.csrf_token = Some(csrf_token);
        session.credentials = Some(credentials);
        Ok(())
    }

    /// End the current session.
    ///
    /// Server-side invalidation is best effort: the local cookie, token and
    /// cached credentials are cleared whether or not the controller accepts
    /// the logout. A controller failure is still returned.
    ///
    /// Platform-specific logout endpoint:
    /// - UniFi OS: `POST /api/auth/logout`
    /// - Classic: `POST /api/logout`
    pub async fn logout(&self) -> Result<(), Error> {
        let active = {
            let session = self.read_session();
            session.cookie.clone().zip(session.csrf_token.clone())
        };

        let result = match active {
            Some((cookie, csrf_token)) => self.invalidate_session(&cookie, &csrf_token).await,
            None => {
                debug!("no active session, skipping controller logout");
                Ok(())
            }
        };

        self.write_session().clear();
        if let Err(ref e) = result {
            warn!(error = %e, "controller logout failed; local session cleared anyway");
        } else {
            debug!("logout complete");
        }
        result
    }

    async fn invalidate_session(
        &self,
        cookie: &SessionCookie,
        csrf_token: &str,
    ) -> Result<(), Error> {
        let url = join_path(&self.base_url, self.platform.logout_path())?;
        debug!("logging out at {}", url);

        let resp = self
            .http
            .post(url)
            .header(COOKIE, cookie.header_value())
            .header(CSRF_HEADER, csrf_token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Http {
                status: status.as_u16(),
                message: "logout failed".into(),
            })
        }
    }

    /// Check that a session exists and has not expired.
    ///
    /// Returns [`Error::NotAuthenticated`] before login / after logout and
    /// [`Error::SessionExpired`] once the cookie is within the expiry margin.
    pub fn assert_authenticated(&self) -> Result<(), Error> {
        self.read_session()
            .check(Utc::now(), margin_delta(self.expiry_margin))
    }

    pub fn is_authenticated(&self) -> bool {
        self.assert_authenticated().is_ok()
    }

    /// When the current session cookie expires, if it carries an expiry.
    pub fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        self.read_session()
            .cookie
            .as_ref()
            .and_then(SessionCookie::expires)
    }

    /// Attach the session cookie and CSRF token to a request.
    ///
    /// If the session has expired and re-authentication is enabled, logs in
    /// again with the cached credentials first.
    pub async fn authorize_request(&self, builder: RequestBuilder) -> Result<RequestBuilder, Error> {
        match self.assert_authenticated() {
            Ok(()) => {}
            Err(Error::SessionExpired) if self.reauthenticate => {
                let credentials = self
                    .read_session()
                    .credentials
                    .clone()
                    .ok_or(Error::SessionExpired)?;
                debug!("session expired, re-authenticating");
                self.login_with(credentials).await?;
                self.assert_authenticated()?;
            }
            Err(e) => return Err(e),
        }

        let session = self.read_session();
        let (Some(cookie), Some(csrf_token)) = (session.cookie.as_ref(), session.csrf_token.as_deref())
        else {
            return Err(Error::NotAuthenticated);
        };
        Ok(builder
            .header(COOKIE, cookie.header_value())
            .header(CSRF_HEADER, csrf_token))
    }

    /// Store a rotated CSRF token if the response carries one.
    fn update_csrf_from_response(&self, headers: &reqwest::header::HeaderMap) {
        if let Some(token) = csrf_from_headers(headers) {
            let mut session = self.write_session();
            if session.csrf_token.as_deref() != Some(token.as_str()) {
                trace!("CSRF token rotated");
                session.csrf_token = Some(token);
            }
        }
    }

    // ── Request execution ────────────────────────────────────────────

    /// Send an authorized request and return the successful response.
    ///
    /// The optional body is serialized as JSON. Any CSRF token in the
    /// response replaces the stored one. Non-2xx statuses become errors:
    /// [`Error::Api`] when the body carries an error envelope,
    /// [`Error::Authentication`] on 401, [`Error::Http`] otherwise.
    pub async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!("{} {}", method, url);

        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(Error::Serialization)?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let builder = self.authorize_request(builder).await?;
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;

        self.update_csrf_from_response(resp.headers());

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(status_error(resp).await)
        }
    }

    /// [`execute`](Self::execute), then decode the JSON response body into `T`.
    pub async fn execute_json<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let resp = self.execute(method, url, body).await?;
        let text = resp.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&text).map_err(|e| {
            let message = format!("{e} (body preview: {:?})", preview(&text));
            Error::Deserialization {
                message,
                body: text.clone(),
            }
        })
    }
}

/// Map a non-2xx response to an error.
async fn status_error(resp: Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    trace!(%status, body = %preview(&body), "request failed");

    if status == StatusCode::UNAUTHORIZED {
        return Error::Authentication {
            message: "session expired or invalid credentials".into(),
        };
    }

    if let Ok(envelope) = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body) {
        if !envelope.meta.is_ok() {
            return api_error(&envelope.meta, envelope.data);
        }
    }

    let message = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned()
    } else {
        preview(&body)
    };
    Error::Http {
        status: status.as_u16(),
        message,
    }
}
