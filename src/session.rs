//! Authenticated session construction.
//!
//! A session is built in two phases. The primary check (fetching the
//! site's web root) is load-bearing: if it fails, construction fails
//! with [`Error::Auth`]. The secondary check (fetching the site object)
//! is best-effort: a failure is logged and the session is returned as
//! usable anyway. The two phases are distinct on purpose; do not
//! collapse them into one check.
//!
//! A session is single-owner and issues one blocking round-trip per
//! awaited call; callers that want parallelism should build one session
//! per task rather than share one.

use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response};

use crate::auth::Authenticator;
use crate::config::SharePointConfig;
use crate::credentials::ClientCredentials;
use crate::error::{Error, Result};
use crate::models::{ApiErrorResponse, SiteInfo, WebInfo};
use crate::url_router;

const ACCEPT_JSON: &str = "application/json;odata=nometadata";

/// An authenticated context bound to one site URL.
///
/// `complete_url` is derived once at construction and never recomputed;
/// every resource lookup made through this session is scoped to it.
pub struct SharePointSession {
    site: String,
    server_url: String,
    complete_url: String,
    http: Client,
    auth: Authenticator,
    web: WebInfo,
}

impl SharePointSession {
    /// Start building a session for `site` under `server_url`.
    pub fn builder(site: impl Into<String>, server_url: impl Into<String>) -> SessionBuilder {
        SessionBuilder {
            site: site.into(),
            server_url: server_url.into(),
            credentials: None,
            token_endpoint: None,
        }
    }

    /// Build a session from a document or folder URL, falling back to
    /// the configured site when the URL does not name one. Credentials
    /// always come from the configuration.
    pub async fn from_url(url: &str, config: &SharePointConfig) -> Result<Self> {
        let address = url_router::resolve(url, config);
        Self::builder(address.site, address.server_url)
            .credentials(config.credentials())
            .connect()
            .await
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn complete_url(&self) -> &str {
        &self.complete_url
    }

    /// The web root object obtained by the primary liveness check.
    pub fn web(&self) -> &WebInfo {
        &self.web
    }

    /// URL of an `_api/` endpoint under this session's site.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/_api/{}", self.complete_url, path)
    }

    /// A request builder with the bearer token and JSON accept header
    /// attached.
    pub(crate) async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.auth.get_access_token().await?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, ACCEPT_JSON))
    }

    async fn fetch_web(http: &Client, auth: &Authenticator, complete_url: &str) -> Result<WebInfo> {
        let token = auth.get_access_token().await?;
        let response = http
            .get(format!("{complete_url}/_api/web"))
            .bearer_auth(token)
            .header(ACCEPT, ACCEPT_JSON)
            .send()
            .await?;
        let response = expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_site(&self) -> Result<SiteInfo> {
        let response = self
            .request(Method::GET, &self.api_url("site"))
            .await?
            .send()
            .await?;
        let response = expect_success(response).await?;
        Ok(response.json().await?)
    }
}

/// Builder for [`SharePointSession`]. `connect` returns an error only
/// for the primary construction phase.
pub struct SessionBuilder {
    site: String,
    server_url: String,
    credentials: Option<ClientCredentials>,
    token_endpoint: Option<String>,
}

impl SessionBuilder {
    pub fn credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the token endpoint (sovereign clouds, tests).
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Connect and verify the session.
    pub async fn connect(self) -> Result<SharePointSession> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::Config("missing credentials".to_string()))?;

        let server_url = self.server_url.trim_end_matches('/').to_string();
        let complete_url = format!("{}/sites/{}", server_url, self.site);

        let mut auth = Authenticator::new(credentials, server_url.clone());
        if let Some(endpoint) = self.token_endpoint {
            auth = auth.with_token_endpoint(endpoint);
        }

        let http = Client::new();

        // Phase one, load-bearing: the session is unusable unless the
        // web root can be fetched.
        let web = SharePointSession::fetch_web(&http, &auth, &complete_url)
            .await
            .map_err(|e| Error::Auth(format!("unable to fetch web root for {complete_url}: {e}")))?;

        let session = SharePointSession {
            site: self.site,
            server_url,
            complete_url,
            http,
            auth,
            web,
        };

        // Phase two, best-effort: a failure here is logged, never
        // propagated.
        if let Err(error) = session.fetch_site().await {
            tracing::error!(%error, "unable to verify site object");
        }

        Ok(session)
    }
}

/// Convert a non-success response into an [`Error::Api`], extracting
/// the message from the OData error envelope when one is present.
pub(crate) async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&body) {
        return Err(Error::Api {
            status: status.as_u16(),
            message: parsed.error.message.text().to_string(),
        });
    }
    Err(Error::Api {
        status: status.as_u16(),
        message: body,
    })
}
