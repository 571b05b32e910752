//! URL normalization so equal resources map to equal store keys.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize an already-parsed URL in place.
///
/// Lowercases the host and drops the fragment; the query string is kept
/// verbatim because it is part of the resource identity.
fn normalize(mut parsed: Url) -> Result<Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a resource identifier against the application origin.
///
/// Relative identifiers (`index.html`, `/icons/icon-192.png`) are joined
/// onto `origin`; absolute ones are only normalized.
pub fn resolve(origin: &Url, identifier: &str) -> Result<Url, UrlError> {
    let trimmed = identifier.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    normalize(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://parts.example/app/").unwrap()
    }

    #[test]
    fn test_resolve_preserves_query() {
        let url = resolve(&origin(), "Parts.csv?rev=7&b=2").unwrap();
        assert_eq!(url.query(), Some("rev=7&b=2"));
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_whitespace_only() {
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_relative() {
        let url = resolve(&origin(), "index.html").unwrap();
        assert_eq!(url.as_str(), "https://parts.example/app/index.html");
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve(&origin(), "/offline.html").unwrap();
        assert_eq!(url.as_str(), "https://parts.example/offline.html");
    }

    #[test]
    fn test_resolve_absolute_is_normalized() {
        let url = resolve(&origin(), "https://CDN.example/lib.js#x").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example/lib.js");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
    }
}
