//! SharePoint client operations: library/folder resolution and file
//! transfer.
//!
//! Locator operations (`find_*`, `create_*`, `delete_*`) return hard
//! errors. Transfer and list operations follow the crate's best-effort
//! policy: remote failures are logged and collapse to `None`/`false`/an
//! empty list, while local I/O failures still propagate.

use std::path::Path;

use futures::TryStreamExt;
use reqwest::header::{CONTENT_TYPE, IF_MATCH};
use reqwest::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use uuid::Uuid;

use crate::config::SharePointConfig;
use crate::error::{Error, Result};
use crate::models::{Collection, DocumentLibrary, Folder, SharePointFile};
use crate::session::{expect_success, SharePointSession};

/// Chunk size for large-file upload sessions.
pub const UPLOAD_CHUNK_SIZE: usize = 1_000_000;

/// SharePoint list template for document libraries.
const DOCUMENT_LIBRARY_TEMPLATE: u32 = 101;

/// Escape a value for embedding in an OData literal (`'` doubles).
fn odata_quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Client for one SharePoint site, owning its session.
pub struct SharePointClient {
    session: SharePointSession,
}

impl SharePointClient {
    pub fn new(session: SharePointSession) -> Self {
        Self { session }
    }

    /// Build a client straight from a document or folder URL; see
    /// [`SharePointSession::from_url`].
    pub async fn from_url(url: &str, config: &SharePointConfig) -> Result<Self> {
        Ok(Self::new(SharePointSession::from_url(url, config).await?))
    }

    pub fn session(&self) -> &SharePointSession {
        &self.session
    }

    /// All lists of the site, root folders expanded.
    pub async fn document_libraries(&self) -> Result<Vec<DocumentLibrary>> {
        let url = self.session.api_url("web/lists");
        let response = self
            .session
            .request(Method::GET, &url)
            .await?
            .query(&[("$expand", "RootFolder")])
            .send()
            .await?;
        let libraries: Collection<DocumentLibrary> = expect_success(response).await?.json().await?;
        Ok(libraries.value)
    }

    /// Find a document library by exact title.
    ///
    /// Returns `None` for zero matches, and also for more than one:
    /// duplicate titles collapse to absent rather than picking one.
    pub async fn find_document_library(&self, name: &str) -> Result<Option<DocumentLibrary>> {
        let url = self.session.api_url("web/lists");
        let response = self
            .session
            .request(Method::GET, &url)
            .await?
            .query(&[
                ("$filter", format!("Title eq '{}'", odata_quote(name))),
                ("$expand", "RootFolder".to_string()),
            ])
            .send()
            .await?;
        let libraries: Collection<DocumentLibrary> = expect_success(response).await?.json().await?;
        let mut matches = libraries.value;
        if matches.len() == 1 {
            Ok(Some(matches.remove(0)))
        } else {
            Ok(None)
        }
    }

    /// Find-or-create a document library. Idempotent.
    pub async fn create_document_library(
        &self,
        name: &str,
        description: &str,
    ) -> Result<DocumentLibrary> {
        if let Some(existing) = self.find_document_library(name).await? {
            return Ok(existing);
        }
        let url = self.session.api_url("web/lists");
        let body = serde_json::json!({
            "Title": name,
            "Description": description,
            "BaseTemplate": DOCUMENT_LIBRARY_TEMPLATE,
        });
        let response = self
            .session
            .request(Method::POST, &url)
            .await?
            .json(&body)
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }

    /// Delete a document library if it exists. No-op when absent.
    pub async fn delete_document_library(&self, name: &str) -> Result<()> {
        let Some(library) = self.find_document_library(name).await? else {
            return Ok(());
        };
        let url = self
            .session
            .api_url(&format!("web/lists/GetByTitle('{}')", odata_quote(&library.title)));
        let response = self
            .session
            .request(Method::POST, &url)
            .await?
            .header("X-HTTP-Method", "DELETE")
            .header(IF_MATCH, "*")
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Find a folder by exact name under a library's root.
    ///
    /// An absent library propagates as `None`; single-match-or-absent
    /// applies to the folder lookup as well.
    pub async fn find_folder(
        &self,
        library_name: &str,
        folder_name: &str,
    ) -> Result<Option<Folder>> {
        let Some(library) = self.find_document_library(library_name).await? else {
            return Ok(None);
        };
        let Some(root) = library.root_folder else {
            return Ok(None);
        };
        let url = self.session.api_url(&format!(
            "web/GetFolderByServerRelativePath(decodedurl='{}')/Folders",
            odata_quote(&root.server_relative_url)
        ));
        let response = self
            .session
            .request(Method::GET, &url)
            .await?
            .query(&[("$filter", format!("Name eq '{}'", odata_quote(folder_name)))])
            .send()
            .await?;
        let folders: Collection<Folder> = expect_success(response).await?.json().await?;
        let mut matches = folders.value;
        if matches.len() == 1 {
            Ok(Some(matches.remove(0)))
        } else {
            Ok(None)
        }
    }

    /// Find-or-create a folder under a library's root. Idempotent:
    /// repeated calls return the existing folder.
    pub async fn create_folder(&self, library_name: &str, folder_name: &str) -> Result<Folder> {
        if let Some(existing) = self.find_folder(library_name, folder_name).await? {
            return Ok(existing);
        }
        let library = self
            .find_document_library(library_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document library '{library_name}'")))?;
        let root = library
            .root_folder
            .ok_or_else(|| Error::NotFound(format!("root folder of '{library_name}'")))?;
        let url = self.session.api_url(&format!(
            "web/GetFolderByServerRelativePath(decodedurl='{}')/Folders/AddUsingPath(decodedurl='{}')",
            odata_quote(&root.server_relative_url),
            odata_quote(folder_name)
        ));
        let response = self.session.request(Method::POST, &url).await?.send().await?;
        Ok(expect_success(response).await?.json().await?)
    }

    /// Fetch a file handle from its full URL.
    ///
    /// The session's server URL prefix is stripped to obtain the
    /// server-relative path.
    pub async fn get_file(&self, file_url: &str) -> Result<SharePointFile> {
        let relative = file_url
            .strip_prefix(self.session.server_url())
            .unwrap_or(file_url);
        let url = self.session.api_url(&format!(
            "web/GetFileByServerRelativePath(decodedurl='{}')",
            odata_quote(relative)
        ));
        let response = self.session.request(Method::GET, &url).await?.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("no file at '{relative}'")));
        }
        Ok(expect_success(response).await?.json().await?)
    }

    /// Download a file into `download_path`.
    ///
    /// The local output file is created before the remote fetch and is
    /// closed on every exit path. A remote failure is logged and
    /// returned as `None`; only local I/O errors propagate.
    pub async fn download_file<P: AsRef<Path>>(
        &self,
        file_url: &str,
        download_path: P,
    ) -> Result<Option<SharePointFile>> {
        let download_path = download_path.as_ref();
        let mut output = tokio::fs::File::create(download_path).await?;
        match self.try_download(file_url, &mut output).await {
            Ok(file) => {
                tracing::info!(path = %download_path.display(), "file has been downloaded");
                Ok(Some(file))
            }
            Err(error) => {
                tracing::error!(%error, "error with download");
                Ok(None)
            }
        }
    }

    async fn try_download(
        &self,
        file_url: &str,
        output: &mut tokio::fs::File,
    ) -> Result<SharePointFile> {
        let file = self.get_file(file_url).await?;
        let url = self.session.api_url(&format!(
            "web/GetFileByServerRelativePath(decodedurl='{}')/$value",
            odata_quote(&file.server_relative_url)
        ));
        let response = self.session.request(Method::GET, &url).await?.send().await?;
        let response = expect_success(response).await?;

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(stream);
        tokio::io::copy(&mut reader, output).await?;
        output.flush().await?;

        Ok(file)
    }

    /// Upload a file into `library_name/root_folder` in one call,
    /// creating the folder if needed. An empty `root_folder` targets the
    /// library root.
    ///
    /// If `file_path` exists locally its bytes are used and the name is
    /// derived from the path unless `file_name` is given; otherwise
    /// explicit `file_content` (plus `file_name`) is required, failing
    /// with [`Error::Input`] before any network call. Remote failures
    /// are logged and returned as `None`.
    pub async fn upload_file(
        &self,
        library_name: &str,
        root_folder: &str,
        file_path: Option<&Path>,
        file_content: Option<Vec<u8>>,
        file_name: Option<&str>,
    ) -> Result<Option<SharePointFile>> {
        let (content, name) = match file_path {
            Some(path) if path.exists() => {
                let name = match file_name {
                    Some(name) => name.to_string(),
                    None => path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(str::to_string)
                        .ok_or_else(|| {
                            Error::Input(format!(
                                "cannot derive a file name from {}",
                                path.display()
                            ))
                        })?,
                };
                (tokio::fs::read(path).await?, name)
            }
            _ => {
                let content = file_content.ok_or_else(|| {
                    Error::Input(
                        "need an existing file_path or file_content bytes to upload".to_string(),
                    )
                })?;
                let name = file_name
                    .ok_or_else(|| {
                        Error::Input("file_name is required when uploading raw bytes".to_string())
                    })?
                    .to_string();
                (content, name)
            }
        };

        match self.try_upload(library_name, root_folder, &name, content).await {
            Ok(file) => Ok(Some(file)),
            Err(error) => {
                tracing::error!(%error, "unable to upload file");
                Ok(None)
            }
        }
    }

    async fn try_upload(
        &self,
        library_name: &str,
        root_folder: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<SharePointFile> {
        let target = self.resolve_target_folder(library_name, root_folder).await?;
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let url = self.session.api_url(&format!(
            "web/GetFolderByServerRelativePath(decodedurl='{}')/Files/Add(url='{}',overwrite=true)",
            odata_quote(&target.server_relative_url),
            odata_quote(file_name)
        ));
        let response = self
            .session
            .request(Method::POST, &url)
            .await?
            .header(CONTENT_TYPE, mime.as_ref())
            .body(content)
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }

    async fn resolve_target_folder(
        &self,
        library_name: &str,
        root_folder: &str,
    ) -> Result<Folder> {
        if root_folder.is_empty() {
            let library = self
                .find_document_library(library_name)
                .await?
                .ok_or_else(|| Error::NotFound(format!("document library '{library_name}'")))?;
            return library
                .root_folder
                .ok_or_else(|| Error::NotFound(format!("root folder of '{library_name}'")));
        }
        self.create_folder(library_name, root_folder).await
    }

    /// Upload a file in 1,000,000-byte chunks under one upload session.
    ///
    /// `progress` runs after each chunk with (cumulative offset, total
    /// size). Returns `Ok(true)` on success and `Ok(false)` (logged) on
    /// remote failure; a failed session is abandoned, not resumed.
    /// Local metadata/read errors propagate.
    pub async fn upload_large_file<F>(
        &self,
        library_name: &str,
        root_folder: &str,
        file_path: &Path,
        progress: F,
    ) -> Result<bool>
    where
        F: FnMut(u64, u64),
    {
        let file_size = tokio::fs::metadata(file_path).await?.len();
        match self
            .try_upload_large(library_name, root_folder, file_path, file_size, progress)
            .await
        {
            Ok(target) => {
                tracing::info!(file = %target, "file has been uploaded successfully");
                Ok(true)
            }
            Err(error) => {
                tracing::error!(%error, "error while uploading");
                Ok(false)
            }
        }
    }

    async fn try_upload_large<F>(
        &self,
        library_name: &str,
        root_folder: &str,
        file_path: &Path,
        file_size: u64,
        mut progress: F,
    ) -> Result<String>
    where
        F: FnMut(u64, u64),
    {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::Input(format!("cannot derive a file name from {}", file_path.display()))
            })?;

        // Target folder one level deep, addressed relative to the site.
        let folder_path = format!("{library_name}/{root_folder}");
        let create_url = self.session.api_url(&format!(
            "web/GetFolderByServerRelativePath(decodedurl='{}')/Files/Add(url='{}',overwrite=true)",
            odata_quote(&folder_path),
            odata_quote(file_name)
        ));
        let response = self
            .session
            .request(Method::POST, &create_url)
            .await?
            .send()
            .await?;
        let target: SharePointFile = expect_success(response).await?.json().await?;

        let upload_id = Uuid::new_v4();
        let file_base = format!(
            "web/GetFileByServerRelativePath(decodedurl='{}')",
            odata_quote(&target.server_relative_url)
        );

        let mut handle = tokio::fs::File::open(file_path).await?;
        let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
        let mut offset: u64 = 0;

        loop {
            let mut filled = 0;
            while filled < buffer.len() {
                let n = handle.read(&mut buffer[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }

            // A short read means the file ended, even if it shrank
            // after the size was taken.
            let is_last = filled == 0 || offset + filled as u64 >= file_size;
            let call = if is_last {
                format!("{file_base}/FinishUpload(uploadId=guid'{upload_id}',fileOffset={offset})")
            } else if offset == 0 {
                format!("{file_base}/StartUpload(uploadId=guid'{upload_id}')")
            } else {
                format!("{file_base}/ContinueUpload(uploadId=guid'{upload_id}',fileOffset={offset})")
            };

            let url = self.session.api_url(&call);
            let response = self
                .session
                .request(Method::POST, &url)
                .await?
                .body(buffer[..filled].to_vec())
                .send()
                .await?;
            expect_success(response).await?;

            offset += filled as u64;
            progress(offset, file_size);

            if is_last {
                break;
            }
        }

        Ok(target.server_relative_url)
    }

    /// Files in the root folder of the library with the given title.
    /// Soft failure: logs and returns an empty list.
    pub async fn list_files(&self, root_folder_title: &str) -> Vec<SharePointFile> {
        match self.try_list_files(root_folder_title).await {
            Ok(files) => files,
            Err(error) => {
                tracing::error!(%error, library = root_folder_title, "unable to access folder items");
                Vec::new()
            }
        }
    }

    async fn try_list_files(&self, root_folder_title: &str) -> Result<Vec<SharePointFile>> {
        let url = self.session.api_url(&format!(
            "web/lists/GetByTitle('{}')/RootFolder/Files",
            odata_quote(root_folder_title)
        ));
        let response = self.session.request(Method::GET, &url).await?.send().await?;
        let files: Collection<SharePointFile> = expect_success(response).await?.json().await?;
        Ok(files.value)
    }

    /// Libraries whose title contains `name_filter` case-insensitively,
    /// in server order; all libraries when the filter is empty. Soft
    /// failure: logs and returns an empty list.
    ///
    /// Discovery listing only; find-or-create paths use exact matching.
    pub async fn list_libraries(&self, name_filter: &str) -> Vec<DocumentLibrary> {
        match self.document_libraries().await {
            Ok(libraries) => {
                if name_filter.is_empty() {
                    return libraries;
                }
                let needle = name_filter.to_lowercase();
                libraries
                    .into_iter()
                    .filter(|library| library.title.to_lowercase().contains(&needle))
                    .collect()
            }
            Err(error) => {
                tracing::error!(%error, "unable to enumerate document libraries");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::odata_quote;

    #[test]
    fn test_odata_quote() {
        assert_eq!(odata_quote("plain"), "plain");
        assert_eq!(odata_quote("report #123's"), "report #123''s");
    }
}
