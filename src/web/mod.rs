//! Request pipeline surface.
//!
//! This module holds the framework-neutral pieces the validation gate plugs
//! into:
//! - [`Request`] and [`Response`] values, the request carrying the router's
//!   [`Dispatched`] annotation
//! - [`Handler`] and [`Middleware`] traits and a [`Pipeline`] chaining them
//! - Handler parameter extraction for closures and controller actions
//!
//! Routing itself is out of scope: a router attaches [`Dispatched`] before
//! the pipeline runs.

mod dispatch;
pub mod extract;
mod middleware;
mod request;

pub use dispatch::{Dispatched, HandlerRef, RouteStatus};
pub use extract::{handler_parameters, is_builtin};
pub use middleware::{Handler, Middleware, Pipeline};
pub use request::{Request, Response};
