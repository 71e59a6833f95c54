//! Handler and middleware traits, and a pipeline composing them.
//!
//! # Integration Flow
//!
//! ```text
//! Request (with Dispatched annotation)
//!   ↓
//! Pipeline::handle
//!   ↓
//! Middleware::process(request, next)   ── may short-circuit with a Response
//!   ↓
//! next.handle(request)                 ── remaining middleware, then the handler
//!   ↓
//! Response
//! ```

use std::sync::Arc;

use crate::error::Error;

use super::{Request, Response};

/// Produces a response for a request.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> Result<Response, Error>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Result<Response, Error> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Result<Response, Error> {
        self(request)
    }
}

/// Processes a request before (or instead of) the rest of the pipeline.
pub trait Middleware: Send + Sync {
    /// Either returns a response itself or delegates to `next`.
    fn process(&self, request: &Request, next: &dyn Handler) -> Result<Response, Error>;
}

/// Middleware stack in front of a final handler.
///
/// Middleware run in the order they were added.
///
/// # Examples
///
/// ```
/// use proxy_weave::web::{Pipeline, Request, Response};
///
/// let pipeline = Pipeline::from_fn(|_: &Request| Ok(Response::ok().with_body("done")));
/// let response = pipeline.handle(&Request::new("req-1")).unwrap();
/// assert_eq!(response.body, "done");
/// ```
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn Handler>,
}

impl Pipeline {
    pub fn new<H: Handler + 'static>(handler: H) -> Self {
        Self {
            middleware: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Builds a pipeline whose final handler is a closure.
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response, Error> + Send + Sync + 'static,
    {
        Self::new(handler)
    }

    /// Appends a middleware; it runs after every middleware added before it.
    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn handle(&self, request: &Request) -> Result<Response, Error> {
        Next {
            rest: &self.middleware,
            handler: self.handler.as_ref(),
        }
        .handle(request)
    }
}

struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl Handler for Next<'_> {
    fn handle(&self, request: &Request) -> Result<Response, Error> {
        match self.rest.split_first() {
            Some((first, rest)) => first.process(
                request,
                &Next {
                    rest,
                    handler: self.handler,
                },
            ),
            None => self.handler.handle(request),
        }
    }
}
