//! Routing results attached to requests by the dispatcher.

use std::fmt;

use crate::error::Error;
use crate::model::Parameter;

/// Outcome of route matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    NotFound,
    Found,
    MethodNotAllowed,
}

/// A reference to the handler a route resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerRef {
    /// An inline callable with its declared parameters
    Closure {
        parameters: Vec<Parameter>,
    },
    /// `"Controller@action"` or `"Controller::action"`
    Callback(String),
    /// `(controller, action)`
    Pair(String, String),
}

impl HandlerRef {
    /// Splits a controller reference into `(controller, action)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerNotFound`] for closures and malformed callbacks.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_weave::web::HandlerRef;
    ///
    /// let handler = HandlerRef::Callback("App\\UserController@store".into());
    /// let (controller, action) = handler.controller_action().unwrap();
    /// assert_eq!(controller, "App\\UserController");
    /// assert_eq!(action, "store");
    /// ```
    pub fn controller_action(&self) -> Result<(&str, &str), Error> {
        let parts = match self {
            HandlerRef::Callback(callback) => callback
                .split_once('@')
                .or_else(|| callback.split_once("::")),
            HandlerRef::Pair(controller, action) => Some((controller.as_str(), action.as_str())),
            HandlerRef::Closure { .. } => None,
        };
        match parts {
            Some((controller, action))
                if !controller.is_empty() && !action.is_empty() && !action.contains("::") =>
            {
                Ok((controller, action))
            }
            _ => Err(Error::HandlerNotFound {
                handler: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Closure { .. } => write!(f, "{{closure}}"),
            HandlerRef::Callback(callback) => write!(f, "{}", callback),
            HandlerRef::Pair(controller, action) => write!(f, "{}::{}", controller, action),
        }
    }
}

/// Routing annotation carried by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub status: RouteStatus,
    /// Present when `status` is [`RouteStatus::Found`]
    pub handler: Option<HandlerRef>,
}

impl Dispatched {
    pub fn found(handler: HandlerRef) -> Self {
        Self {
            status: RouteStatus::Found,
            handler: Some(handler),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: RouteStatus::NotFound,
            handler: None,
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: RouteStatus::MethodNotAllowed,
            handler: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == RouteStatus::Found
    }
}
