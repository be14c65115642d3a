//! Request methods.

use std::fmt;

/// HTTP request method.
///
/// Only the four verbs the server routes are named; any other syntactically
/// valid token is kept as [`Method::Extension`] so the router can reject it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Delete,
    Extension(String),
}

impl Method {
    /// Parse a request-line method token. Matching is case-sensitive.
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            other => Method::Extension(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Extension(token) => token,
        }
    }

    /// True for the verbs this server supports.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Method::Extension(_))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_verbs() {
        assert_eq!(Method::parse("GET"), Method::Get);
        assert_eq!(Method::parse("HEAD"), Method::Head);
        assert_eq!(Method::parse("POST"), Method::Post);
        assert_eq!(Method::parse("DELETE"), Method::Delete);
    }

    #[test]
    fn unknown_and_lowercase_verbs_are_extensions() {
        let put = Method::parse("PUT");
        assert!(!put.is_supported());
        assert_eq!(put.as_str(), "PUT");
        assert_eq!(Method::parse("get"), Method::Extension("get".into()));
    }
}
