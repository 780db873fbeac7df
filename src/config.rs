//! Process-wide fallback configuration.
//!
//! Used by [`crate::url_router::resolve`] and
//! [`crate::session::SharePointSession::from_url`] when a URL does not
//! carry a site address of its own.

use std::env;

use crate::credentials::{ClientCredentials, Secret};
use crate::error::{Error, Result};

pub const ENV_SITE: &str = "SHAREPOINT_SITE";
pub const ENV_SERVER_URL: &str = "SHAREPOINT_SERVER_URL";
pub const ENV_CLIENT_ID: &str = "SHAREPOINT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SHAREPOINT_CLIENT_SECRET";

/// Default site address and client identity, typically sourced from the
/// environment.
#[derive(Debug)]
pub struct SharePointConfig {
    pub site: String,
    pub server_url: String,
    pub client_id: String,
    pub client_secret: Secret,
}

impl SharePointConfig {
    pub fn new(
        site: impl Into<String>,
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret,
    ) -> Self {
        Self {
            site: site.into(),
            server_url: server_url.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Read the configuration from `SHAREPOINT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            site: require_env(ENV_SITE)?,
            server_url: require_env(ENV_SERVER_URL)?,
            client_id: require_env(ENV_CLIENT_ID)?,
            client_secret: Secret::new(require_env(ENV_CLIENT_SECRET)?),
        })
    }

    /// Client credentials carried by this configuration.
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(
            self.client_id.clone(),
            Secret::new(self.client_secret.expose()),
        )
    }
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("missing environment variable {name}")))
}
