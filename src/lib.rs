//! sharepoint_client - a thin client for SharePoint sites.
//!
//! This library provides functionality to:
//! - Resolve client credentials from a secrets file or explicit values
//! - Build an authenticated, liveness-checked session for a site
//! - Find or create document libraries and folders
//! - Upload files (single-call or chunked with progress) and download files
//!
//! Sessions are single-owner: every operation is one sequential awaited
//! round-trip, with no internal locking or concurrency. Callers that
//! want parallelism should create one session per task.
//!
//! # Example
//!
//! ```no_run
//! use sharepoint_client::{ClientCredentials, SharePointClient, SharePointSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials =
//!         ClientCredentials::from_secrets_file("secrets.json", "Engineering")?;
//!     let session = SharePointSession::builder("Engineering", "https://contoso.example")
//!         .credentials(credentials)
//!         .connect()
//!         .await?;
//!     let client = SharePointClient::new(session);
//!
//!     for file in client.list_files("Documents").await {
//!         println!("{}", file);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod session;
pub mod url_router;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::{SharePointClient, UPLOAD_CHUNK_SIZE};
pub use config::SharePointConfig;
pub use credentials::{ClientCredentials, Secret};
pub use error::{Error, Result};
pub use models::{DocumentLibrary, Folder, SharePointFile};
pub use session::{SessionBuilder, SharePointSession};
pub use url_router::{parse_site_url, SiteAddress};
