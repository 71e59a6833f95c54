//! Handler parameter extraction.
//!
//! Maps a dispatched [`HandlerRef`] to the ordered parameter list the handler
//! declares, so middleware can inspect parameter types before the handler
//! runs. Controller methods are looked up in the declaration source, through
//! used traits and parent classes.

use crate::error::Error;
use crate::model::{namespace_of, Parameter};
use crate::source::{find_method, DeclarationSource};

use super::HandlerRef;

pub use crate::model::is_builtin;

/// Returns the parameters declared by the dispatched handler.
///
/// Class names in the returned type hints are fully qualified. Controller
/// hints are resolved against the namespace of the class or trait that
/// declares the action; closure hints are taken as already qualified.
///
/// # Errors
///
/// - [`Error::HandlerNotFound`] for a malformed callback or a controller without the action
/// - [`Error::TypeNotFound`] when the controller is not declared
pub fn handler_parameters(
    source: &dyn DeclarationSource,
    handler: &HandlerRef,
) -> Result<Vec<Parameter>, Error> {
    if let HandlerRef::Closure { parameters } = handler {
        return Ok(parameters
            .iter()
            .cloned()
            .map(|p| p.qualified_in(""))
            .collect());
    }

    let (controller, action) = handler.controller_action()?;
    match find_method(source, controller, action)? {
        Some(found) => {
            let namespace = namespace_of(&found.owner);
            Ok(found
                .method
                .parameters
                .into_iter()
                .map(|p| p.qualified_in(namespace))
                .collect())
        }
        None => Err(Error::HandlerNotFound {
            handler: handler.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodDeclaration, TypeDeclaration};
    use crate::source::MemorySource;

    fn source() -> MemorySource {
        MemorySource::new()
            .with(
                TypeDeclaration::class("App\\BaseController").with_method(
                    MethodDeclaration::new("index")
                        .with_parameter(Parameter::typed("request", "ListRequest")),
                ),
            )
            .with(
                TypeDeclaration::trait_("Shared\\Exports").with_method(
                    MethodDeclaration::new("export")
                        .with_parameter(Parameter::typed("request", "?Http\\ExportRequest"))
                        .with_parameter(Parameter::typed("format", "\\App\\Format")),
                ),
            )
            .with(
                TypeDeclaration::class("App\\Admin\\UserController")
                    .extends("App\\BaseController")
                    .uses("Shared\\Exports"),
            )
    }

    #[test]
    fn closure_parameters_are_returned_directly() {
        let handler = HandlerRef::Closure {
            parameters: vec![Parameter::typed("id", "int")],
        };
        let params = handler_parameters(&MemorySource::new(), &handler).unwrap();
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn controller_actions_are_found_through_parents() {
        let handler = HandlerRef::Callback("App\\Admin\\UserController@index".to_string());
        let params = handler_parameters(&source(), &handler).unwrap();
        assert_eq!(params[0].class_type(), Some("App\\ListRequest"));
    }

    #[test]
    fn hints_resolve_against_the_declaring_namespace() {
        let handler = HandlerRef::Callback("App\\Admin\\UserController::export".to_string());
        let params = handler_parameters(&source(), &handler).unwrap();
        assert_eq!(params[0].type_hint.as_deref(), Some("?Shared\\Http\\ExportRequest"));
        assert_eq!(params[1].class_type(), Some("App\\Format"));
    }

    #[test]
    fn closure_hints_lose_their_leading_separator() {
        let handler = HandlerRef::Closure {
            parameters: vec![Parameter::typed("r", "\\App\\StoreRequest")],
        };
        let params = handler_parameters(&MemorySource::new(), &handler).unwrap();
        assert_eq!(params[0].type_hint.as_deref(), Some("App\\StoreRequest"));
    }

    #[test]
    fn missing_action_is_handler_not_found() {
        let handler = HandlerRef::Pair("App\\Admin\\UserController".into(), "destroy".into());
        assert!(matches!(
            handler_parameters(&source(), &handler),
            Err(Error::HandlerNotFound { .. })
        ));
    }

    #[test]
    fn missing_controller_is_type_not_found() {
        let handler = HandlerRef::Pair("App\\Ghost".into(), "index".into());
        assert!(matches!(
            handler_parameters(&source(), &handler),
            Err(Error::TypeNotFound { .. })
        ));
    }

    #[test]
    fn builtins_are_case_insensitive() {
        assert!(is_builtin("int"));
        assert!(is_builtin("String"));
        assert!(!is_builtin("App\\Request"));
    }
}
