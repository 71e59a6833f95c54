use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    capability::{CapabilityTable, ValidationFailure},
    config::GateOptions,
    container::Container,
    error::Error,
    logging::GateLog,
    source::DeclarationSource,
    web::{handler_parameters, is_builtin, Handler, Middleware, Request, Response, RouteStatus},
};

/// The request validation gate.
///
/// Before a routed request reaches its handler, the gate resolves every
/// handler parameter whose type implements the validate-when-resolved
/// capability and asks it to validate itself. An authorization failure turns
/// into a fixed forbidden response and the rest of the pipeline is skipped.
///
/// One gate is meant to serve every request of a process; its capability
/// memo is shared across them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use proxy_weave::web::{Dispatched, HandlerRef, Middleware, Request, Response};
/// use proxy_weave::{
///     GateOptions, MapContainer, MemorySource, Parameter, TypeDeclaration,
///     ValidatesWhenResolved, ValidationFailure, ValidationGate,
/// };
///
/// struct AdminOnly;
/// impl ValidatesWhenResolved for AdminOnly {
///     fn validate_resolved(&self) -> Result<(), ValidationFailure> {
///         Err(ValidationFailure::unauthorized("admins only"))
///     }
/// }
///
/// let options = GateOptions::default();
/// let source = MemorySource::new().with(
///     TypeDeclaration::class("App\\AdminRequest").implements(options.capability_marker.clone()),
/// );
/// let mut container = MapContainer::new();
/// container.register("App\\AdminRequest", || Arc::new(AdminOnly));
///
/// let gate = ValidationGate::new(Arc::new(source), Arc::new(container), options);
/// let request = Request::new("req-1").with_dispatched(Dispatched::found(HandlerRef::Closure {
///     parameters: vec![Parameter::typed("request", "App\\AdminRequest")],
/// }));
///
/// let next = |_: &Request| -> Result<Response, proxy_weave::Error> { Ok(Response::ok()) };
/// let response = gate.process(&request, &next).unwrap();
/// assert_eq!(response.status, 403);
/// ```
pub struct ValidationGate {
    source: Arc<dyn DeclarationSource>,
    container: Arc<dyn Container>,
    options: GateOptions,
    capabilities: CapabilityTable,
}

impl ValidationGate {
    /// Creates a gate with an empty capability memo.
    pub fn new(
        source: Arc<dyn DeclarationSource>,
        container: Arc<dyn Container>,
        options: GateOptions,
    ) -> Self {
        Self {
            source,
            container,
            options,
            capabilities: CapabilityTable::new(),
        }
    }

    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    /// The memo of implemented interfaces built up by this gate.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Every interface `type_name` implements, memoized for the gate's lifetime.
    pub fn class_implements(&self, type_name: &str) -> Result<Arc<BTreeSet<String>>, Error> {
        self.capabilities.implements(self.source.as_ref(), type_name)
    }

    /// Whether parameters of `type_name` validate themselves when resolved.
    pub fn validates_when_resolved(&self, type_name: &str) -> Result<bool, Error> {
        if is_builtin(type_name) {
            return Ok(false);
        }
        Ok(self
            .class_implements(type_name)?
            .contains(&self.options.capability_marker))
    }

    /// Response returned when a parameter reports an authorization failure.
    fn forbidden(&self, request: &Request) -> Response {
        request
            .context_response()
            .clone()
            .with_status(self.options.forbidden_status)
    }
}

impl Middleware for ValidationGate {
    /// Validates resolved handler parameters, then delegates to `next`.
    ///
    /// # Errors
    ///
    /// - [`Error::MisroutedRequest`] if the request carries no dispatch result
    /// - [`Error::Validation`] if a parameter rejects itself as invalid
    /// - any error raised while resolving the handler, a parameter type, or by `next`
    fn process(&self, request: &Request, next: &dyn Handler) -> Result<Response, Error> {
        let log = GateLog::new(request.request_id());

        let Some(dispatched) = request.dispatched() else {
            return Err(Error::MisroutedRequest {
                message: "request carries no dispatch result".to_string(),
            });
        };

        if dispatched.status != RouteStatus::Found {
            log.debug(format_args!(
                "route status {:?}, skipping validation",
                dispatched.status
            ));
            return next.handle(request);
        }

        let Some(handler) = dispatched.handler.as_ref() else {
            return Err(Error::MisroutedRequest {
                message: "found route carries no handler".to_string(),
            });
        };

        let parameters = handler_parameters(self.source.as_ref(), handler)?;
        let mut validated = 0;
        for parameter in &parameters {
            let Some(type_name) = parameter.class_type() else {
                continue;
            };
            if !self.validates_when_resolved(type_name)? {
                continue;
            }

            let instance = self.container.get(type_name)?;
            match instance.validate_resolved() {
                Ok(()) => validated += 1,
                Err(ValidationFailure::Unauthorized { message }) => {
                    log.warn(format_args!(
                        "{} rejected ${} for {}: {}",
                        type_name, parameter.name, handler, message
                    ));
                    return Ok(self.forbidden(request));
                }
                Err(ValidationFailure::Invalid { message }) => {
                    return Err(Error::Validation {
                        type_name: type_name.to_string(),
                        message,
                    });
                }
            }
        }

        if validated > 0 {
            log.debug(format_args!(
                "{} parameter(s) of {} validated",
                validated, handler
            ));
        }
        next.handle(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MapContainer;
    use crate::model::{MethodDeclaration, Parameter, TypeDeclaration};
    use crate::source::MemorySource;
    use crate::web::{Dispatched, HandlerRef};
    use crate::ValidatesWhenResolved;

    const MARKER: &str = "Weave\\Validation\\Contract\\ValidatesWhenResolved";

    struct Fixed(Result<(), ValidationFailure>);

    impl ValidatesWhenResolved for Fixed {
        fn validate_resolved(&self) -> Result<(), ValidationFailure> {
            self.0.clone()
        }
    }

    fn gate(outcome: Result<(), ValidationFailure>) -> ValidationGate {
        let source = MemorySource::new()
            .with(TypeDeclaration::class("App\\StoreRequest").implements(MARKER))
            .with(TypeDeclaration::class("App\\Plain"))
            .with(
                TypeDeclaration::class("App\\Controller").with_method(
                    MethodDeclaration::new("store")
                        .with_parameter(Parameter::typed("id", "int"))
                        .with_parameter(Parameter::typed("plain", "Plain"))
                        .with_parameter(Parameter::typed("request", "?StoreRequest")),
                ),
            );
        let outcome = Arc::new(outcome);
        let mut container = MapContainer::new();
        container.register("App\\StoreRequest", move || {
            Arc::new(Fixed((*outcome).clone()))
        });
        ValidationGate::new(Arc::new(source), Arc::new(container), GateOptions::default())
    }

    fn routed() -> Request {
        Request::new("req-gate").with_dispatched(Dispatched::found(HandlerRef::Callback(
            "App\\Controller@store".to_string(),
        )))
    }

    fn ok_next(_: &Request) -> Result<Response, Error> {
        Ok(Response::ok().with_body("next"))
    }

    #[test]
    fn passing_validation_calls_next() {
        let response = gate(Ok(())).process(&routed(), &ok_next).unwrap();
        assert_eq!(response.body, "next");
    }

    #[test]
    fn unauthorized_becomes_forbidden() {
        let g = gate(Err(ValidationFailure::unauthorized("no")));
        let request = routed().with_context_response(Response::ok().with_header("X-Trace", "t"));
        let response = g.process(&request, &ok_next).unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(response.header("X-Trace"), Some("t"));
        assert_eq!(response.body, "");
    }

    #[test]
    fn relative_hints_are_validated_as_qualified_types() {
        let g = gate(Err(ValidationFailure::unauthorized("no")));
        let response = g.process(&routed(), &ok_next).unwrap();
        assert_eq!(response.status, 403);
        assert!(g.capabilities().len() >= 2);
        assert!(g
            .class_implements("App\\StoreRequest")
            .unwrap()
            .contains(MARKER));
    }

    #[test]
    fn invalid_input_propagates() {
        let g = gate(Err(ValidationFailure::invalid("name required")));
        assert_eq!(
            g.process(&routed(), &ok_next),
            Err(Error::Validation {
                type_name: "App\\StoreRequest".to_string(),
                message: "name required".to_string(),
            })
        );
    }

    #[test]
    fn missing_dispatch_is_misrouted() {
        let result = gate(Ok(())).process(&Request::new("r"), &ok_next);
        assert!(matches!(result, Err(Error::MisroutedRequest { .. })));
    }

    #[test]
    fn found_route_without_handler_is_misrouted() {
        let request = Request::new("r").with_dispatched(Dispatched {
            status: RouteStatus::Found,
            handler: None,
        });
        let result = gate(Ok(())).process(&request, &ok_next);
        assert!(matches!(result, Err(Error::MisroutedRequest { .. })));
    }

    #[test]
    fn builtins_and_plain_types_are_not_validated() {
        let g = gate(Ok(()));
        assert!(!g.validates_when_resolved("int").unwrap());
        assert!(!g.validates_when_resolved("App\\Plain").unwrap());
        assert!(g.validates_when_resolved("App\\StoreRequest").unwrap());
    }

    #[test]
    fn custom_forbidden_status_is_used() {
        let source = MemorySource::new().with(TypeDeclaration::class("R").implements("Marker"));
        let mut container = MapContainer::new();
        container.register("R", || Arc::new(Fixed(Err(ValidationFailure::unauthorized("x")))));
        let options = GateOptions {
            capability_marker: "Marker".to_string(),
            forbidden_status: 401,
        };
        let g = ValidationGate::new(Arc::new(source), Arc::new(container), options);
        let request = Request::new("r").with_dispatched(Dispatched::found(HandlerRef::Closure {
            parameters: vec![Parameter::typed("r", "R")],
        }));
        assert_eq!(g.process(&request, &ok_next).unwrap().status, 401);
    }
}
