//! Proxy IR.
//!
//! Weaving rules produce a [`ProxyUnit`] tree instead of strings; the
//! [`printer`](super::printer) walks the tree and emits source text. Rules
//! can therefore be tested by inspecting nodes, independent of formatting.

use crate::model::{Parameter, TypeKind, Visibility};

/// One generated source file: header plus a single type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUnit {
    /// Emit `declare (strict_types=1);` after the open tag
    pub strict_types: bool,
    /// Comment block after the directive; skipped when empty
    pub banner: String,
    /// Namespace of the woven type; `None` for the global namespace
    pub namespace: Option<String>,
    pub decl: TypeNode,
}

/// A class, trait or interface body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub kind: TypeKind,
    /// Unqualified name
    pub name: String,
    pub is_abstract: bool,
    pub is_final: bool,
    /// Printed parent names (one for classes, any number for interfaces)
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    /// Printed trait names, injected capabilities first
    pub uses: Vec<String>,
    pub members: Vec<Member>,
}

impl TypeNode {
    /// Methods in emission order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodNode> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn method(&self, name: &str) -> Option<&MethodNode> {
        self.methods().find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Constant {
        visibility: Option<Visibility>,
        name: String,
        value: String,
    },
    Property {
        visibility: Option<Visibility>,
        is_static: bool,
        type_hint: Option<String>,
        name: String,
        default: Option<String>,
    },
    Method(MethodNode),
}

/// A method signature with an optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// `None` prints a bodiless signature terminated by `;`
    pub body: Option<Vec<Stmt>>,
}

/// Compile-time constants the generated code refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicConstant {
    Class,
    Trait,
    Function,
    Method,
}

impl MagicConstant {
    pub fn as_str(self) -> &'static str {
        match self {
            MagicConstant::Class => "__CLASS__",
            MagicConstant::Trait => "__TRAIT__",
            MagicConstant::Function => "__FUNCTION__",
            MagicConstant::Method => "__METHOD__",
        }
    }
}

/// An argument forwarded to the parent constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub spread: bool,
}

/// A variable captured by the deferred closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub by_ref: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// Source statement copied unchanged
    Verbatim(String),
    /// `self::__handlePropertyHandler(__CLASS__);`
    HandleProperties,
    /// `parent::__construct($a, ...$b);`
    ForwardToParent { arguments: Vec<Argument> },
    /// Parent constructor call guarded by a runtime existence check
    GuardedForwardToParent,
    /// `$variable = CONSTANT;`
    Capture {
        variable: String,
        value: MagicConstant,
    },
    /// Dispatcher invocation wrapping the original body in a closure
    ProxyCall {
        /// `__CLASS__` for classes, `__TRAIT__` for traits
        scope: MagicConstant,
        /// Prefix the call with `return`
        returns: bool,
        captures: Vec<Capture>,
        body: Vec<Stmt>,
    },
}
