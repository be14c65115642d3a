//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Hold the ordered routing rules built from content config
//! - Pick the handler for a parsed request
//! - Run it and report how the response went out
//!
//! # Design Decisions
//! - Immutable after construction (shared across workers without locks)
//! - First match wins; rule order is fixed
//! - Explicit `Reject` rather than silent default

use std::net::TcpStream;
use std::path::PathBuf;

use crate::config::ContentConfig;
use crate::handlers::{cgi, echo, static_files, upload};
use crate::http::method::Method;
use crate::http::request::ParsedRequest;
use crate::http::response::{Response, StatusCode, Version};
use crate::routing::matcher::{
    AndMatcher, ContentTypeMatcher, Matcher, MethodMatcher, PathPrefixMatcher, RouteInput,
};
use crate::security::path::PathResolver;

const COOKIE: &str = "visited=1";

/// Handler chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Cgi,
    Upload,
    Echo,
    Static,
    Delete,
    /// Unsupported method, answered with `400`.
    Reject,
}

impl Route {
    /// Label used in logs and metrics.
    pub fn name(self) -> &'static str {
        match self {
            Route::Cgi => "cgi",
            Route::Upload => "upload",
            Route::Echo => "echo",
            Route::Static => "static",
            Route::Delete => "delete",
            Route::Reject => "reject",
        }
    }
}

/// How a dispatched request ended.
#[derive(Debug)]
pub enum Outcome {
    /// A complete response for the caller to write.
    Respond(Response),
    /// The handler already wrote an unframed response; the connection must close.
    Streamed { status: StatusCode, bytes: u64 },
    /// Writing to the client failed part way; nothing more can be sent.
    Abandoned(std::io::Error),
}

#[derive(Debug)]
struct Rule {
    matcher: Box<dyn Matcher>,
    route: Route,
}

impl Rule {
    fn new(matcher: impl Matcher + 'static, route: Route) -> Self {
        Self {
            matcher: Box::new(matcher),
            route,
        }
    }
}

/// Immutable request router.
#[derive(Debug)]
pub struct Router {
    rules: Vec<Rule>,
    resolver: PathResolver,
    default_document: String,
    uploads_dir: PathBuf,
}

impl Router {
    /// Build the rule table from content settings.
    pub fn from_config(content: &ContentConfig) -> Self {
        let rules = vec![
            Rule::new(
                AndMatcher::new(vec![
                    Box::new(PathPrefixMatcher::new(content.cgi_prefix.clone())),
                    Box::new(MethodMatcher::new([Method::Get, Method::Post])),
                ]),
                Route::Cgi,
            ),
            Rule::new(
                AndMatcher::new(vec![
                    Box::new(MethodMatcher::new([Method::Post])),
                    Box::new(ContentTypeMatcher::new("multipart/form-data;")),
                ]),
                Route::Upload,
            ),
            Rule::new(MethodMatcher::new([Method::Post]), Route::Echo),
            Rule::new(MethodMatcher::new([Method::Get, Method::Head]), Route::Static),
            Rule::new(MethodMatcher::new([Method::Delete]), Route::Delete),
        ];

        Self {
            rules,
            resolver: PathResolver::new(&content.document_root, content.default_document.clone()),
            default_document: content.default_document.clone(),
            uploads_dir: PathBuf::from(&content.uploads_dir),
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// `/` is served as the default document.
    fn effective_path<'a>(&'a self, path: &'a str) -> &'a str {
        if path == "/" {
            &self.default_document
        } else {
            path
        }
    }

    /// Pick the route for a request. Pure; touches no filesystem state.
    pub fn select(&self, method: &Method, path: &str, content_type: Option<&str>) -> Route {
        let input = RouteInput {
            method,
            path: self.effective_path(path),
            content_type,
        };
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&input))
            .map(|rule| rule.route)
            .unwrap_or(Route::Reject)
    }

    /// Run the selected handler. CGI output is written straight to `out`.
    pub fn dispatch(
        &self,
        req: &ParsedRequest,
        out: &TcpStream,
        version: Version,
    ) -> (Route, Outcome) {
        let route = self.select(&req.method, &req.path, req.content_type());
        let path = self.effective_path(&req.path);

        let response = match route {
            Route::Reject => Response::error(StatusCode::BadRequest),
            Route::Static => static_files::serve(&self.resolver, path, req.method == Method::Head),
            Route::Delete => static_files::delete(&self.resolver, path),
            Route::Echo => echo::echo(req),
            Route::Upload => upload::handle(req, &self.uploads_dir),
            Route::Cgi => {
                return (route, self.run_cgi(req, out, version));
            }
        };

        (route, Outcome::Respond(finish_response(&req.method, response)))
    }

    fn run_cgi(&self, req: &ParsedRequest, out: &TcpStream, version: Version) -> Outcome {
        match cgi::execute(&self.resolver, req, out, version) {
            Ok(bytes) => Outcome::Streamed {
                status: StatusCode::Ok,
                bytes,
            },
            Err(cgi::CgiError::NotFound(e)) => {
                tracing::debug!(path = %req.path, reason = %e, "Script not found");
                Outcome::Respond(Response::error(StatusCode::NotFound))
            }
            Err(e @ (cgi::CgiError::Pipe | cgi::CgiError::Spawn(_))) => {
                tracing::warn!(path = %req.path, error = %e, "Script failed to start");
                Outcome::Respond(Response::error(StatusCode::InternalServerError))
            }
            Err(cgi::CgiError::Output(e)) => Outcome::Abandoned(e),
        }
    }
}

/// Cookie on GET and HEAD so both carry identical headers; HEAD never has a body.
fn finish_response(method: &Method, response: Response) -> Response {
    let response = if matches!(method, Method::Get | Method::Head) && !response.status().is_error() {
        response.header("Set-Cookie", COOKIE)
    } else {
        response
    };
    if *method == Method::Head {
        response.without_body()
    } else {
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::Body;

    fn router() -> Router {
        Router::from_config(&ContentConfig::default())
    }

    #[test]
    fn unsupported_methods_are_rejected() {
        let router = router();
        for token in ["PUT", "OPTIONS", "get"] {
            let method = Method::parse(token);
            assert_eq!(router.select(&method, "/index.html", None), Route::Reject);
        }
    }

    #[test]
    fn cgi_prefix_wins_for_get_and_post_only() {
        let router = router();
        assert_eq!(router.select(&Method::Get, "/cgi-bin/a.sh", None), Route::Cgi);
        assert_eq!(
            router.select(
                &Method::Post,
                "/cgi-bin/a.sh",
                Some("multipart/form-data; boundary=x")
            ),
            Route::Cgi
        );
        assert_eq!(router.select(&Method::Head, "/cgi-bin/a.sh", None), Route::Static);
        assert_eq!(router.select(&Method::Delete, "/cgi-bin/a.sh", None), Route::Delete);
    }

    #[test]
    fn post_splits_on_content_type() {
        let router = router();
        assert_eq!(
            router.select(&Method::Post, "/x", Some("multipart/form-data; boundary=b")),
            Route::Upload
        );
        assert_eq!(router.select(&Method::Post, "/x", Some("text/plain")), Route::Echo);
        assert_eq!(router.select(&Method::Post, "/x", None), Route::Echo);
    }

    #[test]
    fn root_is_rewritten_to_default_document() {
        let router = router();
        assert_eq!(router.effective_path("/"), "/index.html");
        assert_eq!(router.effective_path("/a/"), "/a/");
        assert_eq!(router.select(&Method::Get, "/", None), Route::Static);
    }

    #[test]
    fn head_error_pages_keep_length_but_drop_body() {
        let response = finish_response(&Method::Head, Response::error(StatusCode::NotFound));
        assert_eq!(response.content_length(), Some(9));
        assert!(matches!(response.body(), Body::Empty));
        assert!(!String::from_utf8(response.head_bytes(Version::Http11))
            .unwrap()
            .contains("Set-Cookie"));
    }

    #[test]
    fn get_and_head_carry_the_same_headers() {
        let make = || Response::ok().with_bytes(vec![b'a'; 20], "text/html");
        let get = finish_response(&Method::Get, make());
        let head = finish_response(&Method::Head, make());
        assert_eq!(get.head_bytes(Version::Http11), head.head_bytes(Version::Http11));
        assert!(matches!(get.body(), Body::Bytes(_)));
        assert!(matches!(head.body(), Body::Empty));
    }
}
