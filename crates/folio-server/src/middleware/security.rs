//! Browser hardening headers stamped on every response.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::HeaderName;
use axum::middleware::Next;
use axum::response::Response;

/// Blog templates inline their `style` and `javascript` fragments, and
/// posts may link images from anywhere over https.
const CONTENT_POLICY: &str = "default-src 'self'; \
                              script-src 'self' 'unsafe-inline'; \
                              style-src 'self' 'unsafe-inline'; \
                              img-src 'self' data: https:; \
                              frame-ancestors 'none'";

const HEADERS: [(&str, &str); 3] = [
    ("content-security-policy", CONTENT_POLICY),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
];

/// Run the request, then overwrite the hardening headers on its response.
pub(crate) async fn harden(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_allows_inline_fragments_only_from_self() {
        assert!(CONTENT_POLICY.starts_with("default-src 'self';"));
        assert!(CONTENT_POLICY.contains("script-src 'self' 'unsafe-inline'"));
        assert!(CONTENT_POLICY.contains("style-src 'self' 'unsafe-inline'"));
        assert!(!CONTENT_POLICY.contains("connect-src"));
    }
}
