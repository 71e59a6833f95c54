//! Structural declarations the weaver and the gate operate on.
//!
//! A [`TypeDeclaration`] is populated once by a loader (see
//! [`crate::source`]) and never mutated afterwards. All weaving decisions
//! are made against these values, never against live reflection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the constructor method.
pub const CONSTRUCTOR: &str = "__construct";

/// The kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// A class, possibly abstract or final
    Class,
    /// A trait (mixin) with method bodies but no instances
    Trait,
    /// An interface carrying signatures only
    Interface,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Class => write!(f, "class"),
            TypeKind::Trait => write!(f, "trait"),
            TypeKind::Interface => write!(f, "interface"),
        }
    }
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// `public`
    Public,
    /// `protected`
    Protected,
    /// `private`
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name without the `$` sigil
    pub name: String,
    /// Declared type, as written (`int`, `?Foo`, `\App\Bar`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    /// Default value source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Passed by reference (`&$x`)
    #[serde(default)]
    pub by_ref: bool,
    /// Collects the remaining arguments (`...$xs`)
    #[serde(default)]
    pub variadic: bool,
}

impl Parameter {
    /// Creates an untyped, required parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
            by_ref: false,
            variadic: false,
        }
    }

    /// Creates a typed, required parameter.
    pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            type_hint: Some(type_hint.into()),
            ..Self::new(name)
        }
    }

    /// Sets the default value source text.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Marks the parameter as variadic.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Marks the parameter as by-reference.
    pub fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    /// Resolves the class names in the type hint as written inside `namespace`.
    ///
    /// The result names every class fully qualified, without a leading separator.
    pub fn qualified_in(mut self, namespace: &str) -> Self {
        self.type_hint = self
            .type_hint
            .as_deref()
            .map(|hint| map_class_names(hint, |name| qualify_name(name, namespace)));
        self
    }

    /// The type name with nullability and leading separator stripped.
    ///
    /// Returns `None` for untyped parameters and union/intersection types.
    pub fn class_type(&self) -> Option<&str> {
        let hint = self.type_hint.as_deref()?;
        let hint = hint.strip_prefix('?').unwrap_or(hint);
        if hint.contains('|') || hint.contains('&') {
            return None;
        }
        Some(hint.strip_prefix('\\').unwrap_or(hint))
    }
}

/// A declared method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    /// Method name
    pub name: String,
    /// Explicit visibility; `None` when the declaration omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Ordered parameter list
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// One entry per statement; `None` for bodiless declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<String>>,
}

impl MethodDeclaration {
    /// Creates a public method with an empty body.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Some(Visibility::Public),
            is_static: false,
            is_abstract: false,
            is_final: false,
            parameters: Vec::new(),
            return_type: None,
            body: Some(Vec::new()),
        }
    }

    /// Creates a bodiless signature, as declared on interfaces.
    pub fn signature(name: impl Into<String>) -> Self {
        Self {
            body: None,
            ..Self::new(name)
        }
    }

    pub fn with_visibility(mut self, visibility: Option<Visibility>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Appends a statement, creating the body if absent.
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.body.get_or_insert_with(Vec::new).push(statement.into());
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the method abstract and drops its body.
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self.body = None;
        self
    }

    /// Whether the declaration carries a body.
    pub fn body_present(&self) -> bool {
        self.body.is_some()
    }

    /// Whether this is the constructor.
    pub fn is_constructor(&self) -> bool {
        self.name.eq_ignore_ascii_case(CONSTRUCTOR)
    }

    /// Whether the method has a body the dispatcher can wrap.
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract && self.body_present()
    }
}

/// A declared property, emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A declared class constant, emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Value source text
    pub value: String,
}

/// Parsed structural metadata of one class, trait or interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    /// Fully-qualified name without a leading separator (`App\Model\User`)
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Qualified name of the parent class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Qualified names of used traits, in declaration order
    #[serde(default)]
    pub traits: Vec<String>,
    /// Implemented interfaces; for an interface, the interfaces it extends
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub constants: Vec<ConstantDeclaration>,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
    #[serde(default)]
    pub methods: Vec<MethodDeclaration>,
}

impl TypeDeclaration {
    /// Creates an empty declaration of the given kind.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        let name = name.into();
        Self {
            name: name.trim_start_matches('\\').to_string(),
            kind,
            is_abstract: false,
            is_final: false,
            parent: None,
            traits: Vec::new(),
            interfaces: Vec::new(),
            constants: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn trait_(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Trait)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(normalize_name(&parent.into()));
        self
    }

    /// Adds a used trait; repeated names are ignored.
    pub fn uses(mut self, trait_name: impl Into<String>) -> Self {
        push_unique(&mut self.traits, normalize_name(&trait_name.into()));
        self
    }

    /// Adds an implemented (or, for interfaces, extended) interface.
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        push_unique(&mut self.interfaces, normalize_name(&interface.into()));
        self
    }

    pub fn with_method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_constant(mut self, constant: ConstantDeclaration) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Namespace portion of the qualified name; empty for the global namespace.
    pub fn namespace(&self) -> &str {
        namespace_of(&self.name)
    }

    /// Unqualified name.
    pub fn short_name(&self) -> &str {
        short_name_of(&self.name)
    }

    /// Whether a `__construct` method is declared on this type itself.
    pub fn has_explicit_constructor(&self) -> bool {
        self.constructor().is_some()
    }

    pub fn constructor(&self) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|m| m.is_constructor())
    }

    /// Finds a method declared directly on this type (case-insensitive, like the target runtime).
    pub fn method(&self, name: &str) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Re-normalizes names after deserialization.
    pub(crate) fn normalized(mut self) -> Self {
        self.name = normalize_name(&self.name);
        self.parent = self.parent.as_deref().map(normalize_name);
        let traits = std::mem::take(&mut self.traits);
        for t in traits {
            push_unique(&mut self.traits, normalize_name(&t));
        }
        let interfaces = std::mem::take(&mut self.interfaces);
        for i in interfaces {
            push_unique(&mut self.interfaces, normalize_name(&i));
        }
        self
    }
}

/// Strips a leading namespace separator.
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches('\\').to_string()
}

/// Namespace portion of a qualified name.
pub fn namespace_of(name: &str) -> &str {
    match name.rfind('\\') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

/// Unqualified portion of a qualified name.
pub fn short_name_of(name: &str) -> &str {
    match name.rfind('\\') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Fully qualifies `name` as written inside `namespace`, without a leading separator.
pub fn qualify_name(name: &str, namespace: &str) -> String {
    if let Some(absolute) = name.strip_prefix('\\') {
        absolute.to_string()
    } else if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", namespace, name)
    }
}

/// Primitive and pseudo types that never name a resolvable class.
const BUILTIN_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed", "never", "null",
    "object", "parent", "self", "static", "string", "true", "void",
];

/// Whether `type_name` is a builtin rather than a class-like type.
pub fn is_builtin(type_name: &str) -> bool {
    BUILTIN_TYPES
        .iter()
        .any(|b| b.eq_ignore_ascii_case(type_name))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\\'
}

/// Rewrites every class name in a type hint through `f`.
///
/// Builtins and punctuation are kept, so nullable, union, intersection and
/// parenthesized forms survive unchanged apart from their class names.
pub fn map_class_names(hint: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(hint.len());
    let mut start = None;
    let mut flush = |out: &mut String, name: &str| {
        if is_builtin(name) {
            out.push_str(name);
        } else {
            out.push_str(&f(name));
        }
    };
    for (i, c) in hint.char_indices() {
        if is_name_char(c) {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            flush(&mut out, &hint[s..i]);
        }
        out.push(c);
    }
    if let Some(s) = start {
        flush(&mut out, &hint[s..]);
    }
    out
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
