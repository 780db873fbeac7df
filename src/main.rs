//! sharepoint_client CLI - browse and transfer files on a SharePoint site.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use tracing_subscriber::EnvFilter;

use sharepoint_client::{ClientCredentials, SharePointClient, SharePointSession};

/// CLI tool for interacting with a SharePoint site.
#[derive(Parser)]
#[command(name = "sharepoint_client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Site name, e.g. "Engineering".
    #[arg(long, env = "SHAREPOINT_SITE")]
    site: String,

    /// Server URL, e.g. "https://contoso.sharepoint.com".
    #[arg(long, env = "SHAREPOINT_SERVER_URL")]
    server_url: String,

    /// Path to a secrets JSON file keyed by site (takes precedence over
    /// --client-id/--client-secret).
    #[arg(long, env = "SHAREPOINT_CREDENTIALS_FILE")]
    credentials: Option<PathBuf>,

    /// Client id for app-only authentication.
    #[arg(long, env = "SHAREPOINT_CLIENT_ID")]
    client_id: Option<String>,

    /// Client secret for app-only authentication.
    #[arg(long, env = "SHAREPOINT_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List document libraries, optionally filtered by a title substring.
    Libraries {
        /// Case-insensitive substring to filter titles by.
        filter: Option<String>,
    },

    /// List files in a library's root folder.
    List {
        /// Document library title.
        library: String,
    },

    /// Upload files into a library folder.
    Upload {
        /// File patterns to upload (supports glob patterns like *.csv, report_{1,2}.csv).
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Destination document library.
        #[arg(long, short = 'l')]
        library: String,

        /// Destination folder under the library root (created if absent;
        /// empty targets the library root).
        #[arg(long, short = 'f', default_value = "")]
        folder: String,

        /// Use the chunked upload session (for large files).
        #[arg(long)]
        large: bool,
    },

    /// Download a file to the local filesystem.
    Download {
        /// Full URL of the file to download.
        file_url: String,

        /// Local destination path (file or directory).
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,
    },

    /// Create a folder under a library root (no-op if it exists).
    CreateFolder {
        library: String,
        folder: String,
    },

    /// Create a document library (no-op if it exists).
    CreateLibrary {
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a document library (no-op if absent).
    DeleteLibrary {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let credentials = ClientCredentials::resolve(
        &cli.site,
        cli.credentials.as_deref(),
        cli.client_id.as_deref(),
        cli.client_secret.as_deref(),
    )?;

    let session = SharePointSession::builder(&cli.site, &cli.server_url)
        .credentials(credentials)
        .connect()
        .await
        .with_context(|| format!("failed to connect to site {}", cli.site))?;
    let client = SharePointClient::new(session);

    match cli.command {
        Commands::Libraries { filter } => {
            let libraries = client.list_libraries(filter.as_deref().unwrap_or("")).await;
            if libraries.is_empty() {
                println!("No document libraries found.");
            } else {
                for library in libraries {
                    println!("{}", library.title);
                }
            }
        }

        Commands::List { library } => {
            let files = client.list_files(&library).await;
            if files.is_empty() {
                println!("No files found.");
            } else {
                println!("{:>10} {:<40} {}", "SIZE", "NAME", "PATH");
                println!("{}", "-".repeat(100));
                for file in files {
                    println!("{}", file);
                }
            }
        }

        Commands::Upload {
            patterns,
            library,
            folder,
            large,
        } => {
            let files_to_upload = collect_upload_files(&patterns)?;

            if files_to_upload.is_empty() {
                anyhow::bail!("No files to upload");
            }

            println!(
                "Uploading {} file(s) to {}/{}...",
                files_to_upload.len(),
                library,
                folder
            );

            for (idx, file_path) in files_to_upload.iter().enumerate() {
                let filename = file_path.file_name().unwrap_or_default().to_string_lossy();
                print!(
                    "[{}/{}] Uploading {}... ",
                    idx + 1,
                    files_to_upload.len(),
                    filename
                );

                if large {
                    let done = client
                        .upload_large_file(&library, &folder, file_path, print_upload_progress)
                        .await?;
                    println!("{}", if done { "OK" } else { "FAILED" });
                } else {
                    match client
                        .upload_file(&library, &folder, Some(file_path), None, None)
                        .await?
                    {
                        Some(file) => println!("OK ({})", file.server_relative_url),
                        None => println!("FAILED"),
                    }
                }
            }

            println!("Done.");
        }

        Commands::Download { file_url, to } => {
            let destination = if to.is_dir() {
                let name = file_url
                    .rsplit('/')
                    .next()
                    .filter(|n| !n.is_empty())
                    .context("cannot derive a file name from the URL")?;
                to.join(name)
            } else {
                if let Some(parent) = to.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create directory: {:?}", parent))?;
                    }
                }
                to
            };

            print!("Downloading {}... ", file_url);
            match client.download_file(&file_url, &destination).await? {
                Some(_) => {
                    println!("OK");
                    println!("Saved to: {:?}", destination);
                }
                None => anyhow::bail!("download failed"),
            }
        }

        Commands::CreateFolder { library, folder } => {
            let created = client.create_folder(&library, &folder).await?;
            println!("{}", created.server_relative_url);
        }

        Commands::CreateLibrary { name, description } => {
            let library = client.create_document_library(&name, &description).await?;
            println!("{}", library.title);
        }

        Commands::DeleteLibrary { name } => {
            client.delete_document_library(&name).await?;
            println!("Deleted (or already absent): {}", name);
        }
    }

    Ok(())
}

fn print_upload_progress(offset: u64, total: u64) {
    let pct = if total > 0 {
        offset as f64 / total as f64 * 100.0
    } else {
        100.0
    };
    println!("Uploaded '{}' bytes from '{}'...[{:.2}%]", offset, total, pct);
}

/// Expand the given patterns (glob + brace) into a deduplicated list of
/// local files.
fn collect_upload_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files_to_upload: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        for expanded_pattern in expand_braces(pattern) {
            let matches: Vec<PathBuf> = glob(&expanded_pattern)
                .with_context(|| format!("Invalid glob pattern: {}", expanded_pattern))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();

            if matches.is_empty() {
                // No glob matches, treat as a literal path
                let path = PathBuf::from(&expanded_pattern);
                if path.is_file() {
                    files_to_upload.push(path);
                } else {
                    eprintln!("Warning: No files matched pattern: {}", expanded_pattern);
                }
            } else {
                files_to_upload.extend(matches);
            }
        }
    }

    files_to_upload.sort();
    files_to_upload.dedup();
    Ok(files_to_upload)
}

/// Expand brace patterns like report_{1,2,3}.csv into multiple patterns.
fn expand_braces(pattern: &str) -> Vec<String> {
    if let Some(start) = pattern.find('{') {
        if let Some(end) = pattern[start..].find('}') {
            let end = start + end;
            let prefix = &pattern[..start];
            let suffix = &pattern[end + 1..];
            let alternatives = &pattern[start + 1..end];

            return alternatives
                .split(',')
                .flat_map(|alt| {
                    let expanded = format!("{}{}{}", prefix, alt.trim(), suffix);
                    expand_braces(&expanded)
                })
                .collect();
        }
    }

    vec![pattern.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_braces_simple() {
        let result = expand_braces("report_{1,2,3}.csv");
        assert_eq!(result, vec!["report_1.csv", "report_2.csv", "report_3.csv"]);
    }

    #[test]
    fn test_expand_braces_no_braces() {
        let result = expand_braces("report.csv");
        assert_eq!(result, vec!["report.csv"]);
    }

    #[test]
    fn test_expand_braces_glob_pattern() {
        let result = expand_braces("*.csv");
        assert_eq!(result, vec!["*.csv"]);
    }

    #[test]
    fn test_expand_braces_nested() {
        let result = expand_braces("{a,b}_{1,2}.csv");
        assert_eq!(result, vec!["a_1.csv", "a_2.csv", "b_1.csv", "b_2.csv"]);
    }

    #[test]
    fn test_progress_percentage_handles_empty_file() {
        // Exercises the guard; output goes to stdout.
        print_upload_progress(0, 0);
        print_upload_progress(500_000, 1_000_000);
    }
}
