//! URL normalization
//!
//! Every equality check between article URLs in Curator goes through
//! [`normalize_url`]:
//! - scheme forced to `https`
//! - tracking parameters (`utm_*`, `fbclid`, `gclid`, `msclkid`) removed
//! - trailing slash removed, except for the root path
//! - fragment removed

use thiserror::Error;
use url::Url;

/// Query parameters that only carry campaign tracking
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "msclkid"];

/// Errors from URL handling
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Failed to parse URL {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Normalize a URL so that tracking variants of one article compare equal
pub fn normalize_url(raw: &str) -> Result<String, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut url = Url::parse(raw).map_err(|e| UrlError::Parse {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "https" && url.set_scheme("https").is_err() {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path != "/" && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    url.set_fragment(None);

    Ok(url.to_string())
}

/// Lowercased host of a URL, if it has one
pub fn domain_of(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Whether `raw` points at `domain` (exact host match)
pub fn is_on_domain(raw: &str, domain: &str) -> bool {
    domain_of(raw).is_some_and(|host| host == domain)
}
