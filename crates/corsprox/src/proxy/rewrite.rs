//! Route matching and upstream URL construction.

/// The literal `/{prefix}/` a request target must start with to be proxied.
#[derive(Debug, Clone)]
pub struct RoutePrefix {
    literal: String,
}

impl RoutePrefix {
    /// `prefix` is the normalized config value (no surrounding slashes).
    pub fn new(prefix: &str) -> Self {
        Self {
            literal: format!("/{prefix}/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// Remainder of `path_and_query` after the prefix, or `None` when the
    /// request is outside the proxied route. The remainder may be empty and
    /// keeps any query string.
    pub fn strip<'a>(&self, path_and_query: &'a str) -> Option<&'a str> {
        path_and_query.strip_prefix(self.literal.as_str())
    }
}

/// `{target_base_url}/{remainder}`, without any normalization.
pub fn upstream_url(target_base_url: &str, remainder: &str) -> String {
    format!("{target_base_url}/{remainder}")
}

/// True when the path part of `remainder` contains a `.` or `..` segment.
///
/// Such segments are forwarded as-is; the upstream may resolve them to a
/// path outside the base URL.
pub fn has_dot_segments(remainder: &str) -> bool {
    let path = remainder.split(['?', '#']).next().unwrap_or_default();
    path.split('/').any(|segment| {
        matches!(
            segment.to_ascii_lowercase().as_str(),
            "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e."
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_keeps_nested_path_and_query() {
        let route = RoutePrefix::new("proxy");
        assert_eq!(route.strip("/proxy/users?id=5"), Some("users?id=5"));
        assert_eq!(route.strip("/proxy/a/b/c"), Some("a/b/c"));
    }

    #[test]
    fn test_strip_rejects_other_paths() {
        let route = RoutePrefix::new("proxy");
        assert_eq!(route.strip("/other/users"), None);
        assert_eq!(route.strip("/proxy"), None);
        assert_eq!(route.strip("/proxyx/users"), None);
        assert_eq!(route.strip("/api/proxy/users"), None);
    }

    #[test]
    fn test_strip_empty_remainder() {
        let route = RoutePrefix::new("proxy");
        assert_eq!(route.strip("/proxy/"), Some(""));
        assert_eq!(route.strip("/proxy/?q=1"), Some("?q=1"));
    }

    #[test]
    fn test_multi_segment_prefix() {
        let route = RoutePrefix::new("api/v1");
        assert_eq!(route.as_str(), "/api/v1/");
        assert_eq!(route.strip("/api/v1/items"), Some("items"));
    }

    #[test]
    fn test_upstream_url_concatenation() {
        let route = RoutePrefix::new("proxy");
        let remainder = route.strip("/proxy/users?id=5").unwrap();
        assert_eq!(
            upstream_url("https://example.com/api", remainder),
            "https://example.com/api/users?id=5"
        );
    }

    #[test]
    fn test_dot_segments_detected() {
        assert!(has_dot_segments("../admin"));
        assert!(has_dot_segments("users/../../secret"));
        assert!(has_dot_segments("./users"));
        assert!(has_dot_segments("%2E%2E/admin"));
    }

    #[test]
    fn test_dot_segments_ignored_in_query_and_names() {
        assert!(!has_dot_segments("users?next=../x"));
        assert!(!has_dot_segments("files/report..pdf"));
        assert!(!has_dot_segments(".well-known/config"));
    }
}
