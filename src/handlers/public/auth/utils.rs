use axum::http::{header::HOST, HeaderMap};
use url::form_urlencoded;

use crate::config::ServerConfig;
use crate::dashboard::session::LOGIN_PATH;
use crate::handlers::DASHBOARD_PATH;

pub const NO_CODE_ERROR: &str = "No authentication code provided";
pub const AUTH_FAILED_ERROR: &str = "Could not authenticate user";

/// `/login?error=<message>`
pub fn login_error(message: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!("{}?error={}", LOGIN_PATH, encoded)
}

/// Post-login target. Only same-origin absolute paths are honoured;
/// anything else falls back to the dashboard.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => DASHBOARD_PATH.to_string(),
    }
}

/// Origin the browser used to reach us. `SITE_URL` wins when set,
/// otherwise the forwarded headers and then `Host` decide.
pub fn request_origin(server: &ServerConfig, headers: &HeaderMap) -> String {
    if let Some(site_url) = server.site_url.as_deref() {
        return site_url.to_string();
    }

    let scheme = match first_value(headers, "x-forwarded-proto") {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, HOST.as_str()))
        .filter(|host| is_host(host))
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", server.port));

    format!("{}://{}", scheme, host)
}

// Proxies may append, so only the first listed value counts.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn is_host(host: &str) -> bool {
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next(Some("/dashboard?tab=1")), "/dashboard?tab=1");
        assert_eq!(safe_next(Some("/settings")), "/settings");
    }

    #[test]
    fn test_safe_next_rejects_foreign_targets() {
        assert_eq!(safe_next(None), "/dashboard");
        assert_eq!(safe_next(Some("")), "/dashboard");
        assert_eq!(safe_next(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/\\evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("/a\r\nSet-Cookie: x")), "/dashboard");
    }

    #[test]
    fn test_login_error_is_encoded() {
        assert_eq!(
            login_error(NO_CODE_ERROR),
            "/login?error=No+authentication+code+provided"
        );
    }

    fn server(site_url: Option<&str>) -> ServerConfig {
        ServerConfig {
            port: 3000,
            site_url: site_url.map(str::to_string),
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_request_origin_uses_host() {
        let origin = request_origin(&server(None), &headers(&[("host", "bookmarks.test:8080")]));
        assert_eq!(origin, "http://bookmarks.test:8080");
    }

    #[test]
    fn test_request_origin_prefers_forwarded_headers() {
        let map = headers(&[
            ("host", "10.0.0.7:3000"),
            ("x-forwarded-host", "bookmarks.test"),
            ("x-forwarded-proto", "https, http"),
        ]);
        assert_eq!(request_origin(&server(None), &map), "https://bookmarks.test");
    }

    #[test]
    fn test_request_origin_site_url_overrides() {
        let map = headers(&[("host", "internal:3000")]);
        assert_eq!(
            request_origin(&server(Some("https://marks.test")), &map),
            "https://marks.test"
        );
    }

    #[test]
    fn test_request_origin_rejects_odd_hosts() {
        let map = headers(&[("host", "evil.test/path")]);
        assert_eq!(request_origin(&server(None), &map), "http://localhost:3000");
    }
}
