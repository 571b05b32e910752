//! Request classification.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::exchange::{ProxyRequest, RequestMode};

/// What the engine does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Not intercepted; goes straight to the network.
    Bypass,
    /// Document load. Network-first with document fallbacks.
    Navigation,
    /// The application bundle. Network-first.
    AppBundle,
    /// Any other GET. Cache-first.
    Other,
}

impl RequestClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Bypass => "bypass",
            RequestClass::Navigation => "navigation",
            RequestClass::AppBundle => "app_bundle",
            RequestClass::Other => "other",
        }
    }

    /// Whether freshness wins over availability for this class.
    pub fn is_network_first(self) -> bool {
        matches!(self, RequestClass::Navigation | RequestClass::AppBundle)
    }
}

/// Whether the URL path ends with the bundle's trailing path segments.
///
/// `app.js` matches `/app.js` and `/static/app.js` but not `/myapp.js`.
fn is_bundle_path(path: &str, app_bundle: &str) -> bool {
    let bundle = app_bundle.trim_start_matches('/');
    if bundle.is_empty() {
        return false;
    }
    path.strip_suffix(bundle)
        .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Classify `request`; rules apply in order.
pub fn classify(request: &ProxyRequest, app_bundle: &str) -> RequestClass {
    if request.method != Method::GET {
        return RequestClass::Bypass;
    }

    if request.mode == RequestMode::Navigate || request.accepts_html() {
        return RequestClass::Navigation;
    }

    if is_bundle_path(request.url.path(), app_bundle) {
        return RequestClass::AppBundle;
    }

    RequestClass::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    fn get(path: &str) -> ProxyRequest {
        ProxyRequest::get(Url::parse(&format!("https://app.test{path}")).unwrap())
    }

    #[test]
    fn test_non_get_bypasses() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let mut request = get("/app.js").with_accept("text/html");
            request.method = method;
            assert_eq!(classify(&request, "app.js"), RequestClass::Bypass);
        }
    }

    #[test]
    fn test_navigation_mode() {
        let request = ProxyRequest::navigate(Url::parse("https://app.test/parts").unwrap());
        assert_eq!(classify(&request, "app.js"), RequestClass::Navigation);
    }

    #[test]
    fn test_html_accept_is_navigation() {
        let request = get("/app.js").with_accept("text/html,*/*;q=0.8");
        assert_eq!(classify(&request, "app.js"), RequestClass::Navigation);
    }

    #[test]
    fn test_app_bundle_trailing_segment() {
        assert_eq!(classify(&get("/app.js"), "app.js"), RequestClass::AppBundle);
        assert_eq!(classify(&get("/static/app.js"), "app.js"), RequestClass::AppBundle);
        assert_eq!(classify(&get("/static/app.js?v=3"), "app.js"), RequestClass::AppBundle);
        assert_eq!(classify(&get("/myapp.js"), "app.js"), RequestClass::Other);
        assert_eq!(classify(&get("/app.js.map"), "app.js"), RequestClass::Other);
    }

    #[test]
    fn test_multi_segment_bundle() {
        assert_eq!(classify(&get("/dist/js/app.js"), "/js/app.js"), RequestClass::AppBundle);
        assert_eq!(classify(&get("/app.js"), "js/app.js"), RequestClass::Other);
    }

    #[test]
    fn test_other() {
        assert_eq!(classify(&get("/icon-192.png").with_accept("image/png"), "app.js"), RequestClass::Other);
        assert_eq!(classify(&get("/Parts.csv"), "app.js"), RequestClass::Other);
    }

    #[test]
    fn test_strategy_selection() {
        assert!(RequestClass::Navigation.is_network_first());
        assert!(RequestClass::AppBundle.is_network_first());
        assert!(!RequestClass::Other.is_network_first());
        assert!(!RequestClass::Bypass.is_network_first());
    }
}
