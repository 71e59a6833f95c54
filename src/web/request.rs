//! Request and response values flowing through the pipeline.

use super::Dispatched;

/// A response produced by a handler or a middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// An empty `200` response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First header value named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

/// An inbound request as seen by middleware.
///
/// Carries the routing result attached by the dispatcher and the contextual
/// response that middleware short-circuits derive from.
///
/// # Examples
///
/// ```
/// use proxy_weave::web::{Dispatched, Request, Response};
///
/// let request = Request::new("req-1")
///     .with_dispatched(Dispatched::not_found())
///     .with_context_response(Response::ok().with_header("X-Trace", "abc"));
///
/// assert_eq!(request.request_id(), "req-1");
/// assert!(request.dispatched().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    request_id: String,
    dispatched: Option<Dispatched>,
    context_response: Response,
}

impl Request {
    /// Creates a request without a dispatch annotation.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            dispatched: None,
            context_response: Response::ok(),
        }
    }

    pub fn with_dispatched(mut self, dispatched: Dispatched) -> Self {
        self.dispatched = Some(dispatched);
        self
    }

    /// Sets the response middleware derive short-circuit responses from.
    pub fn with_context_response(mut self, response: Response) -> Self {
        self.context_response = response;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The routing result, if the dispatcher ran.
    pub fn dispatched(&self) -> Option<&Dispatched> {
        self.dispatched.as_ref()
    }

    pub fn context_response(&self) -> &Response {
        &self.context_response
    }
}
