//! RSS and Atom listing parsing
//!
//! Signal sources that publish rankings as feeds only need the ordered list
//! of entry links.

use feed_rs::model::Entry;
use feed_rs::parser;

use crate::NetError;

/// Entry links of an RSS or Atom document, one slot per entry in listing order
///
/// Entries without any usable link keep their slot as `None`, so indexes are
/// listing positions.
pub fn parse_feed_links(body: &str) -> Result<Vec<Option<String>>, NetError> {
    let feed = parser::parse(body.as_bytes()).map_err(|e| NetError::Body(e.to_string()))?;
    Ok(feed.entries.iter().map(entry_link).collect())
}

/// First alternate (or untyped) link, then any link, then an http(s) id
fn entry_link(entry: &Entry) -> Option<String> {
    let preferred = entry.links.iter().find(|link| {
        let rel = link.rel.as_deref().unwrap_or("");
        !link.href.trim().is_empty() && (rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
    });
    if let Some(link) = preferred.or_else(|| entry.links.iter().find(|l| !l.href.trim().is_empty())) {
        return Some(link.href.trim().to_string());
    }

    let id = entry.id.trim();
    (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
}
