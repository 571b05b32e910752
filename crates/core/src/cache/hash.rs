//! Request-identity key hashing.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request identity.
///
/// The method is uppercased so `get` and `GET` address the same entry; the
/// URL is expected to be normalized already.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "https://app.test/index.html");
        let hash2 = compute_request_key("GET", "https://app.test/index.html");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        assert_eq!(
            compute_request_key("get", "https://app.test/app.js"),
            compute_request_key("GET", "https://app.test/app.js")
        );
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_request_key("GET", "https://app.test/api");
        let head = compute_request_key("HEAD", "https://app.test/api");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_query_is_significant() {
        let a = compute_request_key("GET", "https://app.test/Parts.csv?v=1");
        let b = compute_request_key("GET", "https://app.test/Parts.csv?v=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "https://app.test/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
