//! Extraction of file identifiers from stored references.

/// Extract the remote file identifier from a stored reference.
///
/// Records store bare identifiers. Older records may hold a share URL instead,
/// either `...?id=<id>&...` or `.../d/<id>/view`. Returns `None` when the
/// reference is blank or is a URL without a recognizable identifier.
#[must_use]
pub fn parse_file_reference(reference: &str) -> Option<&str> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if let Some((_, query)) = reference.split_once('?') {
        let query = query.split('#').next().unwrap_or_default();
        let id = query
            .split('&')
            .filter_map(|pair| pair.strip_prefix("id="))
            .find(|value| !value.is_empty());
        if id.is_some() {
            return id;
        }
    }

    if let Some((_, rest)) = reference.split_once("/d/") {
        let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if !id.is_empty() {
            return Some(id);
        }
    }

    let looks_like_url = reference.contains("://")
        || reference.contains('?')
        || reference.chars().any(char::is_whitespace);
    if looks_like_url {
        return None;
    }

    Some(reference)
}
