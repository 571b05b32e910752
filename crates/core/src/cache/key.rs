//! Request identity used to address stored responses.

use super::hash::compute_request_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a cacheable request: method plus normalized URL.
///
/// Only GET requests are ever stored or looked up, so the only constructor
/// is [`RequestKey::get`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    url: String,
}

impl RequestKey {
    pub const METHOD: &'static str = "GET";

    /// Key for a GET of the given (already normalized) URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn method(&self) -> &'static str {
        Self::METHOD
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hex SHA-256 digest used as the primary key within a generation.
    pub fn hash(&self) -> String {
        compute_request_key(Self::METHOD, &self.url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", Self::METHOD, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = RequestKey::get("https://app.test/app.js");
        assert_eq!(key.to_string(), "GET https://app.test/app.js");
        assert_eq!(key.method(), "GET");
    }

    #[test]
    fn test_key_hash_matches_compute() {
        let key = RequestKey::get("https://app.test/");
        assert_eq!(key.hash(), compute_request_key("GET", "https://app.test/"));
    }
}
