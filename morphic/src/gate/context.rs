//! Per-request routing metadata derived from forwarded headers.

use axum::http::{HeaderMap, HeaderName, Uri};

pub const X_URL: HeaderName = HeaderName::from_static("x-url");
pub const X_HOST: HeaderName = HeaderName::from_static("x-host");
pub const X_PROTOCOL: HeaderName = HeaderName::from_static("x-protocol");
pub const X_BASE_URL: HeaderName = HeaderName::from_static("x-base-url");

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

/// Routing metadata for one request. Discarded once the response is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Absolute request URL.
    pub url: String,
    /// Effective host, possibly empty.
    pub host: String,
    /// Effective protocol, as received (`https` or `http:`).
    pub protocol: String,
    /// `protocol://host`.
    pub base_url: String,
}

impl RequestContext {
    /// Derive the context from request headers and the request target.
    ///
    /// Forwarded headers win over the direct connection values. Empty
    /// header values count as absent.
    pub fn from_request_parts(headers: &HeaderMap, uri: &Uri) -> Self {
        let protocol = header_str(headers, FORWARDED_PROTO).map_or_else(
            || format!("{}:", uri.scheme_str().unwrap_or("http")),
            String::from,
        );

        let host = header_str(headers, FORWARDED_HOST)
            .or_else(|| header_str(headers, "host"))
            .unwrap_or_default()
            .to_string();

        let base_url = join_base_url(&protocol, &host);

        let url = if uri.scheme().is_some() && uri.authority().is_some() {
            uri.to_string()
        } else {
            let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
            format!("{base_url}{path}")
        };

        Self {
            url,
            host,
            protocol,
            base_url,
        }
    }

    /// The four routing headers stamped on outbound responses.
    pub fn headers(&self) -> [(HeaderName, &str); 4] {
        [
            (X_URL, self.url.as_str()),
            (X_HOST, self.host.as_str()),
            (X_PROTOCOL, self.protocol.as_str()),
            (X_BASE_URL, self.base_url.as_str()),
        ]
    }
}

/// Join protocol and host, whether or not the protocol already ends in `:`.
pub fn join_base_url(protocol: &str, host: &str) -> String {
    let sep = if protocol.ends_with(':') { "//" } else { "://" };
    format!("{protocol}{sep}{host}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_forwarded_headers_win() {
        let h = headers(&[
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "chat.example.com"),
            ("host", "10.0.0.4:3000"),
        ]);
        let uri: Uri = "/search?q=rust".parse().unwrap();
        let ctx = RequestContext::from_request_parts(&h, &uri);

        assert_eq!(ctx.protocol, "https");
        assert_eq!(ctx.host, "chat.example.com");
        assert_eq!(ctx.base_url, "https://chat.example.com");
        assert_eq!(ctx.url, "https://chat.example.com/search?q=rust");
    }

    #[test]
    fn test_falls_back_to_connection_values() {
        let h = headers(&[("host", "localhost:3000")]);
        let uri: Uri = "/".parse().unwrap();
        let ctx = RequestContext::from_request_parts(&h, &uri);

        assert_eq!(ctx.protocol, "http:");
        assert_eq!(ctx.host, "localhost:3000");
        assert_eq!(ctx.base_url, "http://localhost:3000");
        assert_eq!(ctx.url, "http://localhost:3000/");
    }

    #[test]
    fn test_missing_host_is_empty() {
        let h = headers(&[("x-forwarded-host", "")]);
        let uri: Uri = "/".parse().unwrap();
        let ctx = RequestContext::from_request_parts(&h, &uri);

        assert_eq!(ctx.host, "");
        assert_eq!(ctx.base_url, "http://");
    }

    #[test]
    fn test_absolute_form_uri() {
        let uri: Uri = "https://proxy.local/a".parse().unwrap();
        let ctx = RequestContext::from_request_parts(&HeaderMap::new(), &uri);

        assert_eq!(ctx.protocol, "https:");
        assert_eq!(ctx.url, "https://proxy.local/a");
    }

    #[test]
    fn test_join_base_url_normalizes_separator() {
        assert_eq!(join_base_url("https:", "a.com"), "https://a.com");
        assert_eq!(join_base_url("https", "a.com"), "https://a.com");
    }
}
