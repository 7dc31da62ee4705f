// Site-scoped request helpers
//
// Every firewall endpoint lives under `{base}{prefix}/api/s/{site}/...`.
// A `Site` borrows its controller, so resources always go through the
// controller's session and executor.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::controller::Controller;
use crate::error::Error;
use crate::models::decode_envelope;

/// Name of the site every controller starts with.
pub const DEFAULT_SITE: &str = "default";

/// A named site on a [`Controller`].
#[derive(Clone)]
pub struct Site<'a> {
    controller: &'a Controller,
    name: String,
}

impl<'a> Site<'a> {
    pub fn new(controller: &'a Controller, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidConfig("site name must not be empty".into()));
        }
        Ok(Self { controller, name })
    }

    pub(crate) fn default_for(controller: &'a Controller) -> Self {
        Self {
            controller,
            name: DEFAULT_SITE.to_owned(),
        }
    }

    /// The site's short name (`default`, not the display description).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidConfig("site name must not be empty".into()));
        }
        self.name = name;
        Ok(())
    }

    pub fn controller(&self) -> &'a Controller {
        self.controller
    }

    /// Build `{base}{prefix}/api/s/{site}/{path}[/{id}]`.
    ///
    /// Segments are percent-encoded, so site names and ids can't escape
    /// their path position. An empty id is left off.
    pub fn url(&self, path: &str, id: Option<&str>) -> Result<Url, Error> {
        let mut url = self.controller.base_url().clone();
        let prefix = self.controller.platform().api_prefix();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidConfig("base URL cannot carry a path".into()))?;
            segments.pop_if_empty();
            segments.extend(prefix.split('/').filter(|s| !s.is_empty()));
            segments.extend(["api", "s", self.name.as_str()]);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if let Some(id) = id.filter(|id| !id.is_empty()) {
                segments.push(id);
            }
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let resp = self.controller.execute(method, url, body).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| self.controller.transport_error(e))?;
        decode_envelope(&text)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, Error> {
        self.send::<T, ()>(Method::GET, url, None).await
    }

    pub(crate) async fn post<T, B>(&self, url: Url, body: &B) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send(Method::POST, url, Some(body)).await
    }

    pub(crate) async fn put<T, B>(&self, url: Url, body: &B) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.send(Method::PUT, url, Some(body)).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, Error> {
        self.send::<T, ()>(Method::DELETE, url, None).await
    }
}

impl std::fmt::Debug for Site<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("name", &self.name)
            .field("base_url", &self.controller.base_url().as_str())
            .finish_non_exhaustive()
    }
}

/// Reject empty identifiers before they turn into collection URLs.
pub(crate) fn require_id<'i>(id: &'i str, what: &str) -> Result<&'i str, Error> {
    if id.is_empty() {
        Err(Error::InvalidConfig(format!("{what} id must not be empty")))
    } else {
        Ok(id)
    }
}
