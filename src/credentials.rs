//! Client credential resolution.
//!
//! Credentials come from either a local secrets file keyed by site name
//! or an explicit id/secret pair. They are resolved once, at session
//! construction, and never persisted.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::SecretsFile;

/// A secret value that stays out of logs.
///
/// Deliberately not `Clone`: the only way to get at the inner value is
/// [`Secret::expose`], and `Debug` prints a redaction marker.
#[derive(Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the wrapped value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Client identity used for the app-only token grant.
#[derive(Debug)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: Secret) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Load credentials for `site` from a secrets file of shape
    /// `{"sites": {"<site>": {"username": ..., "password": ...}}}`.
    pub fn from_secrets_file<P: AsRef<Path>>(path: P, site: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("unable to read secrets file {}: {e}", path.display())))?;
        let secrets: SecretsFile = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("malformed secrets file {}: {e}", path.display())))?;
        let entry = secrets
            .sites
            .into_iter()
            .find_map(|(name, entry)| (name == site).then_some(entry))
            .ok_or_else(|| Error::Config(format!("no credentials entry for site '{site}'")))?;
        Ok(Self {
            client_id: entry.username,
            client_secret: entry.password,
        })
    }

    /// Resolve credentials for a session.
    ///
    /// A secrets file takes precedence; otherwise both explicit values
    /// must be non-empty.
    pub fn resolve(
        site: &str,
        root_cred_path: Option<&Path>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Result<Self> {
        if let Some(path) = root_cred_path {
            return Self::from_secrets_file(path, site);
        }
        match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok(Self::new(id, Secret::new(secret)))
            }
            _ => Err(Error::Config(
                "missing credentials: provide a secrets file or both client_id and client_secret"
                    .to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn secrets_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn resolve_from_secrets_file() {
        let file = secrets_file(
            r#"{"sites": {"Engineering": {"username": "app-id", "password": "app-secret"}}}"#,
        );
        let creds =
            ClientCredentials::resolve("Engineering", Some(file.path()), None, None).unwrap();
        assert_eq!(creds.client_id, "app-id");
        assert_eq!(creds.client_secret.expose(), "app-secret");
    }

    #[test]
    fn secrets_file_takes_precedence_over_explicit_pair() {
        let file = secrets_file(
            r#"{"sites": {"Engineering": {"username": "file-id", "password": "file-secret"}}}"#,
        );
        let creds = ClientCredentials::resolve(
            "Engineering",
            Some(file.path()),
            Some("other-id"),
            Some("other-secret"),
        )
        .unwrap();
        assert_eq!(creds.client_id, "file-id");
    }

    #[test]
    fn missing_site_entry_is_config_error() {
        let file = secrets_file(
            r#"{"sites": {"Sales": {"username": "id", "password": "secret"}}}"#,
        );
        let err =
            ClientCredentials::resolve("Engineering", Some(file.path()), None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_secrets_file_is_config_error() {
        let file = secrets_file("not json at all");
        let err = ClientCredentials::from_secrets_file(file.path(), "Engineering").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_secrets_file_is_config_error() {
        let err = ClientCredentials::from_secrets_file("/nonexistent/secrets.json", "Engineering")
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn explicit_pair_is_used_without_file() {
        let creds = ClientCredentials::resolve("Engineering", None, Some("id"), Some("secret"))
            .unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret.expose(), "secret");
    }

    #[test]
    fn empty_id_or_secret_is_config_error() {
        for (id, secret) in [(Some(""), Some("secret")), (Some("id"), Some("")), (None, None)] {
            let err = ClientCredentials::resolve("Engineering", None, id, secret).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));

        let creds = ClientCredentials::new("id", Secret::new("hunter2"));
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
