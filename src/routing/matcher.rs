//! Route matching logic.
//!
//! # Responsibilities
//! - Match request method against a fixed set
//! - Match path prefix (case-sensitive)
//! - Match `Content-Type` prefix (case-insensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Media types compare case-insensitively
//! - No regex to guarantee O(n) matching

use crate::http::method::Method;

/// The parts of a request routing decisions look at.
#[derive(Debug, Clone, Copy)]
pub struct RouteInput<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub content_type: Option<&'a str>,
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, input: &RouteInput<'_>) -> bool;
}

/// Matches any of a set of methods.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, input: &RouteInput<'_>) -> bool {
        self.methods.contains(input.method)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, input: &RouteInput<'_>) -> bool {
        input.path.starts_with(&self.prefix)
    }
}

/// Matches the start of the `Content-Type` header.
#[derive(Debug, Clone)]
pub struct ContentTypeMatcher {
    prefix: String,
}

impl ContentTypeMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for ContentTypeMatcher {
    fn matches(&self, input: &RouteInput<'_>) -> bool {
        input
            .content_type
            .and_then(|ct| ct.get(..self.prefix.len()))
            .map(|head| head.eq_ignore_ascii_case(&self.prefix))
            .unwrap_or(false)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, input: &RouteInput<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(method: &'a Method, path: &'a str, ct: Option<&'a str>) -> RouteInput<'a> {
        RouteInput {
            method,
            path,
            content_type: ct,
        }
    }

    #[test]
    fn test_method_matcher() {
        let matcher = MethodMatcher::new([Method::Get, Method::Head]);
        assert!(matcher.matches(&input(&Method::Head, "/", None)));
        assert!(!matcher.matches(&input(&Method::Post, "/", None)));
        assert!(!matcher.matches(&input(&Method::Extension("get".into()), "/", None)));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/cgi-bin/");
        assert!(matcher.matches(&input(&Method::Get, "/cgi-bin/run.sh", None)));
        assert!(!matcher.matches(&input(&Method::Get, "/CGI-BIN/run.sh", None)));
        assert!(!matcher.matches(&input(&Method::Get, "/cgi-bin", None)));
    }

    #[test]
    fn test_content_type_matcher() {
        let matcher = ContentTypeMatcher::new("multipart/form-data;");
        let get = Method::Get;
        assert!(matcher.matches(&input(&get, "/", Some("multipart/form-data; boundary=x"))));
        assert!(matcher.matches(&input(&get, "/", Some("Multipart/Form-Data; boundary=x"))));
        assert!(!matcher.matches(&input(&get, "/", Some("multipart/form-data"))));
        assert!(!matcher.matches(&input(&get, "/", None)));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(MethodMatcher::new([Method::Post])),
            Box::new(PathPrefixMatcher::new("/up")),
        ]);
        assert!(matcher.matches(&input(&Method::Post, "/upload", None)));
        assert!(!matcher.matches(&input(&Method::Get, "/upload", None)));
        assert!(!matcher.matches(&input(&Method::Post, "/other", None)));
    }
}
