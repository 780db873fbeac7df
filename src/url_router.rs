//! Routing of SharePoint document URLs to a site address.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SharePointConfig;

/// Pattern for site-scoped SharePoint URLs, e.g.
/// `https://contoso.example/sites/Engineering/Shared Documents/report.csv`.
static SITE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<server_url>https?://[^/\s]+)/sites/(?P<site_name>[^/\s?#]+)")
        .expect("Invalid site URL regex")
});

/// A site address: the short site name plus the server it lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    pub site: String,
    pub server_url: String,
}

/// Extract the site address from a document or folder URL.
///
/// Returns `None` when the URL does not address a site.
pub fn parse_site_url(url: &str) -> Option<SiteAddress> {
    let captures = SITE_URL_REGEX.captures(url.trim())?;
    Some(SiteAddress {
        site: captures["site_name"].to_string(),
        server_url: captures["server_url"].to_string(),
    })
}

/// Resolve a URL to a site address, falling back to the configured
/// default on any non-match. The fallback is unconditional: callers
/// cannot tell a parsed result from a defaulted one.
pub fn resolve(url: &str, config: &SharePointConfig) -> SiteAddress {
    match parse_site_url(url) {
        Some(address) => address,
        None => {
            tracing::debug!(url, "location does not contain a site name, using the configured site");
            SiteAddress {
                site: config.site.clone(),
                server_url: config.server_url.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_url() {
        let address = parse_site_url(
            "https://contoso.example/sites/Engineering/Shared Documents/report.csv",
        )
        .unwrap();
        assert_eq!(address.site, "Engineering");
        assert_eq!(address.server_url, "https://contoso.example");
    }

    #[test]
    fn test_parse_bare_site_url() {
        let address = parse_site_url("https://contoso.example/sites/Engineering").unwrap();
        assert_eq!(address.site, "Engineering");
    }

    #[test]
    fn test_malformed_url_is_none() {
        assert!(parse_site_url("https://contoso.example/teams/Engineering").is_none());
        assert!(parse_site_url("not a url").is_none());
        assert!(parse_site_url("").is_none());
    }
}
