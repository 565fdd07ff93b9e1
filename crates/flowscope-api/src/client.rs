// Appliance API HTTP client
//
// Wraps `reqwest::Client` with URL construction, status mapping, and
// session handling for the dispatch proxy's web server. The appliance
// guards its API with a session cookie; unauthenticated requests are
// either answered with 401 or redirected to the login page.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ConfigResponse, DeviceInfoResponse, HostnameResponse, StatsResponse};

const LOGIN_PATH: &str = "/login";

/// HTTP client for the appliance status API.
///
/// Cheap to clone: the underlying `reqwest::Client` (and its cookie
/// jar) is reference counted, so clones share one session.
#[derive(Debug, Clone)]
pub struct ApplianceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApplianceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the root of the appliance's web server,
    /// e.g. `http://192.168.1.1:8090`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The appliance base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Log in with the dashboard credentials.
    ///
    /// `POST /login` (form encoded). On success the appliance sets a
    /// `session` cookie and redirects to `/`; on failure it answers 401.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.base_url.join(LOGIN_PATH)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url.clone())
            .form(&[("username", username), ("password", password.expose_secret())])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || redirected_to_login(&resp, &url) {
            return Err(Error::Authentication {
                message: "invalid credentials".into(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                endpoint: LOGIN_PATH.into(),
            });
        }

        debug!("session established");
        Ok(())
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/config`
    pub async fn config(&self) -> Result<ConfigResponse, Error> {
        self.get_json("/api/config", &[]).await
    }

    /// `GET /api/stats`
    pub async fn stats(&self) -> Result<StatsResponse, Error> {
        self.get_json("/api/stats", &[]).await
    }

    /// `GET /api/resolve-hostname?ip=`
    pub async fn resolve_hostname(&self, ip: &str) -> Result<HostnameResponse, Error> {
        self.get_json("/api/resolve-hostname", &[("ip", ip)]).await
    }

    /// `GET /api/device-info?ip=`
    pub async fn device_info(&self, ip: &str) -> Result<DeviceInfoResponse, Error> {
        self.get_json("/api/device-info", &[("ip", ip)]).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        debug!("GET {}", url);

        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || redirected_to_login(&resp, &url) {
            return Err(Error::Authentication {
                message: "session expired or missing".into(),
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                endpoint: path.into(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

/// `true` when the request was redirected and the redirects ended on the
/// login page. A direct answer from `/login` itself is not a redirect.
fn redirected_to_login(resp: &reqwest::Response, requested: &Url) -> bool {
    resp.url() != requested && resp.url().path() == LOGIN_PATH
}
