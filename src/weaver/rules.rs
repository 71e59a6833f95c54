//! Transformation rules from declarations to proxy IR nodes.

use crate::error::Error;
use crate::model::{
    is_builtin, map_class_names, namespace_of, qualify_name, short_name_of, ConstantDeclaration,
    MethodDeclaration, PropertyDeclaration, TypeDeclaration, TypeKind, CONSTRUCTOR,
};
use crate::source::{find_method, DeclarationSource};

use super::ir::{Argument, Capture, MagicConstant, Member, MethodNode, Stmt};

/// Rejects declaration shapes no rule covers.
///
/// Abstract or static methods are not rejected here; the weaver leaves them
/// verbatim when they are advised.
pub(crate) fn check_supported(decl: &TypeDeclaration) -> Result<(), Error> {
    let unsupported = |construct: String| -> Result<(), Error> {
        Err(Error::unsupported(decl.name.clone(), construct))
    };

    match decl.kind {
        TypeKind::Interface => {
            if decl.parent.is_some() {
                return unsupported("an interface with a parent class".to_string());
            }
            if !decl.traits.is_empty() {
                return unsupported("trait use inside an interface".to_string());
            }
            if !decl.properties.is_empty() {
                return unsupported("properties on an interface".to_string());
            }
            if let Some(m) = decl.methods.iter().find(|m| m.body_present()) {
                return unsupported(format!("interface method '{}' with a body", m.name));
            }
        }
        TypeKind::Trait => {
            if decl.parent.is_some() || !decl.interfaces.is_empty() {
                return unsupported("a trait extending or implementing types".to_string());
            }
        }
        TypeKind::Class => {
            if !decl.is_abstract {
                if let Some(m) = decl.methods.iter().find(|m| m.is_abstract) {
                    return unsupported(format!(
                        "abstract method '{}' in a concrete class",
                        m.name
                    ));
                }
            }
        }
    }

    for m in &decl.methods {
        if m.is_abstract && m.body_present() {
            return unsupported(format!("abstract method '{}' with a body", m.name));
        }
        if m.is_constructor() && m.is_static {
            return unsupported("a static constructor".to_string());
        }
    }
    Ok(())
}

/// Prints a referenced type name relative to the woven type's namespace.
pub(crate) fn display_name(name: &str, namespace: &str) -> String {
    if namespace_of(name) == namespace {
        short_name_of(name).to_string()
    } else {
        format!("\\{}", name)
    }
}

pub(crate) fn verbatim_method(method: &MethodDeclaration) -> MethodNode {
    MethodNode {
        visibility: method.visibility,
        is_static: method.is_static,
        is_abstract: method.is_abstract,
        is_final: method.is_final,
        name: method.name.clone(),
        parameters: method.parameters.clone(),
        return_type: method.return_type.clone(),
        body: method
            .body
            .as_ref()
            .map(|stmts| stmts.iter().cloned().map(Stmt::Verbatim).collect()),
    }
}

/// Whether an advised method has a body the dispatcher can wrap.
pub(crate) fn is_rewritable(method: &MethodDeclaration) -> bool {
    method.is_concrete() && !method.is_static && !method.is_constructor()
}

/// Replaces the body of `method` with a dispatcher call deferring to the original body.
pub(crate) fn proxied_method(method: &MethodDeclaration, kind: TypeKind) -> MethodNode {
    let mut node = verbatim_method(method);
    let original = node.body.take().unwrap_or_default();

    let mut captures = vec![
        Capture {
            name: "__function__".to_string(),
            by_ref: false,
        },
        Capture {
            name: "__method__".to_string(),
            by_ref: false,
        },
    ];
    captures.extend(method.parameters.iter().map(|p| Capture {
        name: p.name.clone(),
        by_ref: p.by_ref,
    }));

    let scope = match kind {
        TypeKind::Trait => MagicConstant::Trait,
        _ => MagicConstant::Class,
    };
    let returns = !method
        .return_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("void") || t.eq_ignore_ascii_case("never"));

    node.body = Some(vec![
        Stmt::Capture {
            variable: "__function__".to_string(),
            value: MagicConstant::Function,
        },
        Stmt::Capture {
            variable: "__method__".to_string(),
            value: MagicConstant::Method,
        },
        Stmt::ProxyCall {
            scope,
            returns,
            captures,
            body: original,
        },
    ]);
    node
}

/// The constructor a class without one of its own inherits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Inherited {
    /// The class has no parent
    NoParent,
    /// The parent declares a constructor itself
    Direct(MethodDeclaration),
    /// The parent does not declare one; the nearest ancestor's, if resolvable
    Indirect(Option<MethodDeclaration>),
}

pub(crate) fn inherited_constructor(
    source: &dyn DeclarationSource,
    decl: &TypeDeclaration,
) -> Inherited {
    let Some(parent_name) = decl.parent.as_deref() else {
        return Inherited::NoParent;
    };
    let parent = match source.get_type(parent_name) {
        Ok(parent) => parent,
        Err(_) => {
            tracing::debug!(
                type_name = %decl.name,
                parent = %parent_name,
                "parent declaration unavailable, guarding constructor forwarding"
            );
            return Inherited::Indirect(None);
        }
    };
    let namespace = decl.namespace();
    if let Some(ctor) = parent.constructor() {
        return Inherited::Direct(rebased(ctor.clone(), &parent.name, namespace));
    }
    Inherited::Indirect(
        find_method(source, parent_name, CONSTRUCTOR)
            .ok()
            .flatten()
            .map(|found| rebased(found.method, &found.owner, namespace)),
    )
}

/// Rewrites the signature of a constructor declared by `owner` so it keeps
/// its meaning when printed inside `namespace`.
fn rebased(mut ctor: MethodDeclaration, owner: &str, namespace: &str) -> MethodDeclaration {
    let owner_namespace = namespace_of(owner);
    if owner_namespace == namespace {
        return ctor;
    }
    let printed = |name: &str| display_name(&qualify_name(name, owner_namespace), namespace);
    for p in &mut ctor.parameters {
        p.type_hint = p.type_hint.as_deref().map(|t| map_class_names(t, printed));
        p.default = p
            .default
            .as_deref()
            .map(|d| rebased_default(d, owner, namespace, printed));
    }
    ctor
}

/// Requalifies the class a default value starts with, in `Class::CONST` or
/// `new Class(...)` form. Any other default is kept as written.
fn rebased_default(
    default: &str,
    owner: &str,
    namespace: &str,
    printed: impl Fn(&str) -> String,
) -> String {
    let (prefix, expr) = match default.strip_prefix("new ") {
        Some(rest) => ("new ", rest.trim_start()),
        None => ("", default),
    };
    let end = expr
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '\\'))
        .unwrap_or(expr.len());
    let (class, rest) = expr.split_at(end);
    let names_class = !prefix.is_empty() || rest.starts_with("::");
    if class.is_empty() || !names_class || class.starts_with(|c: char| c.is_ascii_digit()) {
        return default.to_string();
    }

    let class = if class.eq_ignore_ascii_case("self") {
        display_name(owner, namespace)
    } else if is_builtin(class) {
        class.to_string()
    } else {
        printed(class)
    };
    format!("{}{}{}", prefix, class, rest)
}

/// Builds the constructor of a class that declares none.
pub(crate) fn synthesized_constructor(inherited: &Inherited) -> MethodNode {
    let (parameters, mut body) = match inherited {
        Inherited::NoParent => (Vec::new(), Vec::new()),
        Inherited::Direct(ctor) => (
            ctor.parameters.clone(),
            vec![Stmt::ForwardToParent {
                arguments: ctor
                    .parameters
                    .iter()
                    .map(|p| Argument {
                        name: p.name.clone(),
                        spread: p.variadic,
                    })
                    .collect(),
            }],
        ),
        Inherited::Indirect(ctor) => (
            ctor.as_ref()
                .map(|c| c.parameters.clone())
                .unwrap_or_default(),
            vec![Stmt::GuardedForwardToParent],
        ),
    };
    body.push(Stmt::HandleProperties);

    MethodNode {
        visibility: None,
        is_static: false,
        is_abstract: false,
        is_final: false,
        name: CONSTRUCTOR.to_string(),
        parameters,
        return_type: None,
        body: Some(body),
    }
}

/// Prepends the property hook to an explicit constructor, leaving the rest untouched.
pub(crate) fn hooked_constructor(ctor: &MethodDeclaration) -> MethodNode {
    let mut node = verbatim_method(ctor);
    if let Some(body) = node.body.as_mut() {
        body.insert(0, Stmt::HandleProperties);
    }
    node
}

pub(crate) fn constant_member(decl: &ConstantDeclaration) -> Member {
    Member::Constant {
        visibility: decl.visibility,
        name: decl.name.clone(),
        value: decl.value.clone(),
    }
}

pub(crate) fn property_member(decl: &PropertyDeclaration) -> Member {
    Member::Property {
        visibility: decl.visibility,
        is_static: decl.is_static,
        type_hint: decl.type_hint.clone(),
        name: decl.name.clone(),
        default: decl.default.clone(),
    }
}
