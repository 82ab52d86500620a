//! Path matcher deciding which requests pass through the gate.

use regex::Regex;

/// Build assets, the favicon and common image files skip the gate.
const EXCLUDED_PATHS: &str =
    r"^/(?:_next/static|_next/image|favicon\.ico|.*\.(?:svg|png|jpg|jpeg|gif|webp)$)";

/// Matches every path except the fixed exclusion set.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    excluded: Regex,
}

impl RouteMatcher {
    pub fn new() -> Self {
        Self {
            excluded: Regex::new(EXCLUDED_PATHS).expect("exclusion pattern is valid"),
        }
    }

    /// Whether the gate applies to `path`.
    pub fn matches(&self, path: &str) -> bool {
        !self.excluded.is_match(path)
    }
}

impl Default for RouteMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gated_paths() {
        let m = RouteMatcher::new();
        for path in ["/", "/search/abc", "/api/chats", "/auth/login", "/share/x.json"] {
            assert!(m.matches(path), "{path} should be gated");
        }
    }

    #[test]
    fn test_excluded_paths() {
        let m = RouteMatcher::new();
        for path in [
            "/_next/static/chunks/app.js",
            "/_next/image",
            "/favicon.ico",
            "/logo.svg",
            "/images/hero.png",
            "/a/b.jpg",
            "/c.jpeg",
            "/d.gif",
            "/e.webp",
        ] {
            assert!(!m.matches(path), "{path} should be excluded");
        }
    }

    #[test]
    fn test_extension_must_be_suffix() {
        let m = RouteMatcher::new();
        assert!(m.matches("/files/report.png.txt"));
        assert!(m.matches("/svg"));
    }
}
