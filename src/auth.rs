//! App-only authentication against the SharePoint token service.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use reqwest::Client;
use tokio::sync::RwLock;

use crate::credentials::ClientCredentials;
use crate::error::{Error, Result};
use crate::models::TokenResponse;

/// Default ACS token endpoint. Sovereign clouds use a different host,
/// so the session builder can override it.
const ACS_TOKEN_ENDPOINT: &str =
    "https://accounts.accesscontrol.windows.net/common/tokens/OAuth/2";

/// Cached access token with expiration.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Obtains and caches bearer tokens via the OAuth2 client-credentials
/// grant. A token is refreshed once it is within 60 seconds of expiry.
#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<ClientCredentials>,
    resource: String,
    token_endpoint: String,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl Authenticator {
    /// Create an authenticator for the given resource (the server URL
    /// the tokens are requested for).
    pub fn new(credentials: ClientCredentials, resource: impl Into<String>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            resource: resource.into(),
            token_endpoint: ACS_TOKEN_ENDPOINT.to_string(),
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Use a non-default token endpoint.
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                let buffer = Duration::from_secs(60);
                if token.expires_at > SystemTime::now() + buffer {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let new_token = self.refresh_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Exchange the client credentials for a fresh token.
    async fn refresh_token(&self) -> Result<CachedToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose()),
            ("resource", self.resource.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        let expires_at = SystemTime::now() + Duration::from_secs(token_response.expires_in);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}
