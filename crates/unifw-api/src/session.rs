// Session state for cookie-based controller auth
//
// Login hands back a session cookie plus a CSRF token header. Both are kept
// here (rather than in a reqwest cookie jar) so the cookie's expiry can be
// checked before each request.

use std::fmt;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderMap;

use crate::auth::Credentials;
use crate::error::Error;

/// Header carrying the CSRF token on login responses and authorized requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Header UniFi OS uses to hand out a rotated CSRF token.
pub const UPDATED_CSRF_HEADER: &str = "X-Updated-CSRF-Token";

/// The session cookie captured at login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
}

impl SessionCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires,
        }
    }

    /// Find the cookie called `name` among the response's `Set-Cookie` headers.
    ///
    /// `Max-Age` wins over `Expires` when both are present.
    pub(crate) fn from_response(resp: &reqwest::Response, name: &str) -> Option<Self> {
        let now = Utc::now();
        resp.cookies().find(|c| c.name() == name).map(|c| {
            let expires = cookie_expiry(now, c.max_age(), c.expires());
            Self::new(c.name(), c.value(), expires)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expiry reported by the controller. `None` means a browser-session
    /// cookie, which never expires locally.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// `Cookie` request header value, e.g. `TOKEN=abc123`.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Whether the cookie is expired at `now`, treating anything within
    /// `margin` of the expiry as already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.expires.is_some_and(|expires| {
            now.checked_add_signed(margin)
                .is_none_or(|deadline| deadline >= expires)
        })
    }
}

/// Absolute expiry from a cookie's `Max-Age` and `Expires` attributes.
///
/// `Max-Age` wins over `Expires`. An age too large to represent is pinned
/// to the latest representable instant.
fn cookie_expiry(
    now: DateTime<Utc>,
    max_age: Option<Duration>,
    expires: Option<SystemTime>,
) -> Option<DateTime<Utc>> {
    match max_age {
        Some(age) => Some(
            TimeDelta::from_std(age)
                .ok()
                .and_then(|age| now.checked_add_signed(age))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        ),
        None => expires.map(DateTime::<Utc>::from),
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Mutable per-controller session state.
#[derive(Default)]
pub(crate) struct SessionState {
    pub cookie: Option<SessionCookie>,
    pub csrf_token: Option<String>,
    /// Last credentials that logged in successfully, kept for re-login.
    pub credentials: Option<Credentials>,
}

impl SessionState {
    /// Check that a session exists and its cookie is still valid.
    pub fn check(&self, now: DateTime<Utc>, margin: TimeDelta) -> Result<(), Error> {
        let Some(cookie) = self.cookie.as_ref() else {
            return Err(Error::NotAuthenticated);
        };
        if self.csrf_token.is_none() {
            return Err(Error::NotAuthenticated);
        }
        if cookie.is_expired_at(now, margin) {
            return Err(Error::SessionExpired);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cookie = None;
        self.csrf_token = None;
        self.credentials = None;
    }
}

/// Read a header as an owned, non-empty string.
pub(crate) fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// The CSRF token a response hands back, preferring a rotated value.
pub(crate) fn csrf_from_headers(headers: &HeaderMap) -> Option<String> {
    header_string(headers, UPDATED_CSRF_HEADER).or_else(|| header_string(headers, CSRF_HEADER))
}
