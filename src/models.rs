//! Data models for the SharePoint REST surface.
//!
//! All request/response types assume `Accept: application/json;odata=nometadata`,
//! which yields bare PascalCase objects and `{"value": [...]}` collection
//! envelopes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::credentials::Secret;

/// A document library (a SharePoint list with the document-library
/// template). `root_folder` is present when the query expanded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentLibrary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_template: Option<u32>,
    #[serde(default)]
    pub root_folder: Option<Folder>,
}

/// A folder within a document library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Folder {
    pub name: String,
    pub server_relative_url: String,
    #[serde(default)]
    pub item_count: Option<u32>,
}

/// A remote file handle. Only the server-relative path is needed to
/// fetch it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharePointFile {
    pub name: String,
    pub server_relative_url: String,
    #[serde(default, deserialize_with = "deserialize_opt_u64")]
    pub length: Option<u64>,
    #[serde(default)]
    pub time_last_modified: Option<String>,
}

impl std::fmt::Display for SharePointFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .length
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        write!(f, "{}\t{}\t{}", size_str, self.name, self.server_relative_url)
    }
}

/// The site's web root object, fetched by the primary liveness check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebInfo {
    pub title: String,
    #[serde(default)]
    pub server_relative_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The site object, fetched by the secondary liveness check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// OData collection envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Collection<T> {
    #[serde(default)]
    pub value: Vec<T>,
}

/// OAuth2 token endpoint response. ACS encodes `expires_in` as a string.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(deserialize_with = "deserialize_u64")]
    pub expires_in: u64,
}

/// SharePoint error body. The envelope key and the message shape both
/// vary with the OData level, so accept either form.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(alias = "odata.error")]
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    pub message: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorMessage {
    Plain(String),
    Localized { value: String },
}

impl ApiErrorMessage {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Localized { value } => value,
        }
    }
}

/// Local secrets file: `{"sites": {"<site>": {"username": ..., "password": ...}}}`.
#[derive(Debug, Deserialize)]
pub struct SecretsFile {
    pub sites: HashMap<String, SiteCredentialEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SiteCredentialEntry {
    pub username: String,
    pub password: Secret,
}

fn deserialize_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    raw.map(StringOrNumber::into_u64).transpose()
}

fn deserialize_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer)?.into_u64()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Number(u64),
    Text(String),
}

impl StringOrNumber {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s.parse::<u64>().map_err(serde::de::Error::custom),
        }
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_document_library_deserialize() {
        let json = r#"{
            "Id": "f0e1d2c3-0000-4000-8000-123456789abc",
            "Title": "Documents",
            "BaseTemplate": 101,
            "RootFolder": {
                "Name": "Shared Documents",
                "ServerRelativeUrl": "/sites/eng/Shared Documents",
                "ItemCount": 4
            }
        }"#;

        let library: DocumentLibrary = serde_json::from_str(json).unwrap();
        assert_eq!(library.title, "Documents");
        assert_eq!(library.base_template, Some(101));
        let root = library.root_folder.unwrap();
        assert_eq!(root.server_relative_url, "/sites/eng/Shared Documents");
        assert_eq!(root.item_count, Some(4));
    }

    #[test]
    fn test_file_length_as_string_or_number() {
        let verbose = r#"{
            "Name": "report.csv",
            "ServerRelativeUrl": "/sites/eng/Docs/report.csv",
            "Length": "2048"
        }"#;
        let file: SharePointFile = serde_json::from_str(verbose).unwrap();
        assert_eq!(file.length, Some(2048));

        let plain = r#"{
            "Name": "report.csv",
            "ServerRelativeUrl": "/sites/eng/Docs/report.csv",
            "Length": 2048
        }"#;
        let file: SharePointFile = serde_json::from_str(plain).unwrap();
        assert_eq!(file.length, Some(2048));
    }

    #[test]
    fn test_file_without_length() {
        let json = r#"{
            "Name": "report.csv",
            "ServerRelativeUrl": "/sites/eng/Docs/report.csv"
        }"#;
        let file: SharePointFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.length, None);
        assert!(format!("{}", file).contains('-'));
    }

    #[test]
    fn test_file_display() {
        let file = SharePointFile {
            name: "report.csv".to_string(),
            server_relative_url: "/sites/eng/Docs/report.csv".to_string(),
            length: Some(1048576),
            time_last_modified: None,
        };
        let display = format!("{}", file);
        assert!(display.contains("1.00 MB"));
        assert!(display.contains("report.csv"));
    }

    #[test]
    fn test_collection_default_empty() {
        let collection: Collection<SharePointFile> = serde_json::from_str("{}").unwrap();
        assert!(collection.value.is_empty());
    }

    #[test]
    fn test_token_response_expires_in_as_string() {
        let json = r#"{"access_token": "abc", "token_type": "Bearer", "expires_in": "3599"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_in, 3599);

        let json = r#"{"access_token": "abc", "expires_in": 3599}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_in, 3599);
    }

    #[test]
    fn test_api_error_envelopes() {
        let nometadata = r#"{"error": {"code": "-2147024891", "message": "Access denied."}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(nometadata).unwrap();
        assert_eq!(parsed.error.message.text(), "Access denied.");

        let verbose = r#"{"odata.error": {"code": "-1", "message": {"lang": "en-US", "value": "File Not Found."}}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(verbose).unwrap();
        assert_eq!(parsed.error.message.text(), "File Not Found.");
    }

    #[test]
    fn test_secrets_file_deserialize() {
        let json = r#"{"sites": {"Engineering": {"username": "id", "password": "secret"}}}"#;
        let secrets: SecretsFile = serde_json::from_str(json).unwrap();
        let entry = &secrets.sites["Engineering"];
        assert_eq!(entry.username, "id");
        assert_eq!(entry.password.expose(), "secret");
    }
}
