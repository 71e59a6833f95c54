//! Proxy weaving.
//!
//! [`ProxyWeaver`] turns a declared type into an equivalent type whose advised
//! methods run through the around-dispatcher:
//!
//! ```text
//! DeclarationSource ──get_type──▶ TypeDeclaration
//!                                      │ rules (check, match, rewrite)
//! InterceptionRegistry ──bindings──────┤
//!                                      ▼
//!                                 ProxyUnit (IR) ──printer──▶ source text
//! ```
//!
//! Weaving is a pure function of the declarations, the bindings and the
//! options: it keeps no state between calls and never caches output.

pub mod ir;
mod printer;
mod rules;

use std::collections::BTreeSet;
use std::fmt;

use crate::config::WeaveOptions;
use crate::error::Error;
use crate::model::{TypeDeclaration, TypeKind};
use crate::registry::{AdviceBinding, InterceptionRegistry};
use crate::source::DeclarationSource;

use ir::{Member, ProxyUnit, TypeNode};

pub use printer::print;

/// Output of a weave: the proxy IR and its rendered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedType {
    /// Qualified name, identical to the input declaration's
    pub name: String,
    pub kind: TypeKind,
    /// Names of the methods whose bodies now go through the dispatcher
    pub intercepted_methods: Vec<String>,
    pub unit: ProxyUnit,
    source: String,
}

impl GeneratedType {
    /// Rendered source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_intercepted(&self, method: &str) -> bool {
        self.intercepted_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }
}

impl fmt::Display for GeneratedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Generates interception proxies from declarations.
///
/// # Examples
///
/// ```
/// use proxy_weave::{
///     AspectCollector, MemorySource, MethodDeclaration, ProxyWeaver, TypeDeclaration,
///     WeaveOptions,
/// };
///
/// let source = MemorySource::new().with(
///     TypeDeclaration::class("App\\Greeter").with_method(
///         MethodDeclaration::new("greet")
///             .returning("string")
///             .with_statement("return 'hi';"),
///     ),
/// );
/// let mut aspects = AspectCollector::new();
/// aspects.set_around("App\\TraceAspect", ["App\\Greeter"], 0);
///
/// let weaver = ProxyWeaver::new(source, aspects, WeaveOptions::default());
/// let proxy = weaver.weave("App\\Greeter").expect("type is declared");
///
/// assert!(proxy.is_intercepted("greet"));
/// assert!(proxy.source().contains("self::__proxyCall(__CLASS__"));
/// ```
pub struct ProxyWeaver<S, R> {
    source: S,
    registry: R,
    options: WeaveOptions,
}

impl<S, R> ProxyWeaver<S, R>
where
    S: DeclarationSource,
    R: InterceptionRegistry,
{
    pub fn new(source: S, registry: R, options: WeaveOptions) -> Self {
        Self {
            source,
            registry,
            options,
        }
    }

    pub fn options(&self) -> &WeaveOptions {
        &self.options
    }

    /// Weaves the proxy of `type_name`.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeNotFound`] if the source does not declare the type
    /// - [`Error::UnsupportedConstruct`] if the declaration has a shape no rule covers
    pub fn weave(&self, type_name: &str) -> Result<GeneratedType, Error> {
        let decl = self.source.get_type(type_name)?;
        rules::check_supported(&decl)?;

        let bindings = match decl.kind {
            TypeKind::Interface => Vec::new(),
            _ => self.registry.find_around_bindings(&lookup_keys(&decl)),
        };

        let (node, intercepted_methods) = self.build_type(&decl, &bindings);
        let namespace = decl.namespace();
        let unit = ProxyUnit {
            strict_types: self.options.strict_types,
            banner: self.options.banner.clone(),
            namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
            decl: node,
        };
        let source = printer::print(&unit);

        tracing::debug!(
            type_name = %decl.name,
            kind = %decl.kind,
            bindings = bindings.len(),
            intercepted = intercepted_methods.len(),
            "woven proxy"
        );

        Ok(GeneratedType {
            name: decl.name,
            kind: decl.kind,
            intercepted_methods,
            unit,
            source,
        })
    }

    /// Weaves every type in `type_names`, stopping at the first failure.
    pub fn weave_many<I, T>(&self, type_names: I) -> Result<Vec<GeneratedType>, Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        type_names
            .into_iter()
            .map(|name| self.weave(name.as_ref()))
            .collect()
    }

    fn build_type(
        &self,
        decl: &TypeDeclaration,
        bindings: &[AdviceBinding],
    ) -> (TypeNode, Vec<String>) {
        let namespace = decl.namespace();
        let mut uses = Vec::new();
        match decl.kind {
            TypeKind::Class => {
                uses.push(self.options.proxy_trait.clone());
                uses.push(self.options.property_trait.clone());
            }
            TypeKind::Trait if self.options.runtime_version.supports_trait_proxy() => {
                uses.push(self.options.proxy_trait.clone());
            }
            _ => {}
        }
        uses.extend(decl.traits.iter().map(|t| rules::display_name(t, namespace)));

        let interfaces: Vec<String> = decl
            .interfaces
            .iter()
            .map(|i| rules::display_name(i, namespace))
            .collect();
        let (extends, implements) = match decl.kind {
            TypeKind::Interface => (interfaces, Vec::new()),
            _ => (
                decl.parent
                    .iter()
                    .map(|p| rules::display_name(p, namespace))
                    .collect(),
                interfaces,
            ),
        };

        let mut members: Vec<Member> = decl.constants.iter().map(rules::constant_member).collect();
        members.extend(decl.properties.iter().map(rules::property_member));

        if decl.kind == TypeKind::Class && !decl.has_explicit_constructor() {
            let inherited = rules::inherited_constructor(&self.source, decl);
            members.push(Member::Method(rules::synthesized_constructor(&inherited)));
        }

        let mut intercepted = Vec::new();
        for method in &decl.methods {
            let node = if decl.kind == TypeKind::Class && method.is_constructor() {
                rules::hooked_constructor(method)
            } else if decl.kind != TypeKind::Interface && is_matched(bindings, &method.name) {
                if rules::is_rewritable(method) {
                    tracing::trace!(type_name = %decl.name, method = %method.name, "intercepting");
                    intercepted.push(method.name.clone());
                    rules::proxied_method(method, decl.kind)
                } else {
                    tracing::trace!(
                        type_name = %decl.name,
                        method = %method.name,
                        "advised method has no wrappable body, emitted verbatim"
                    );
                    rules::verbatim_method(method)
                }
            } else {
                rules::verbatim_method(method)
            };
            members.push(Member::Method(node));
        }

        let node = TypeNode {
            kind: decl.kind,
            name: decl.short_name().to_string(),
            is_abstract: decl.is_abstract,
            is_final: decl.is_final,
            extends,
            implements,
            uses,
            members,
        };
        (node, intercepted)
    }
}

/// Names a binding may target to reach this type's methods.
fn lookup_keys(decl: &TypeDeclaration) -> BTreeSet<String> {
    std::iter::once(decl.name.clone())
        .chain(decl.traits.iter().cloned())
        .chain(decl.interfaces.iter().cloned())
        .collect()
}

fn is_matched(bindings: &[AdviceBinding], method: &str) -> bool {
    bindings.iter().any(|b| b.matches_method(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodDeclaration, Parameter};
    use crate::registry::AspectCollector;
    use crate::source::MemorySource;
    use crate::weaver::ir::Stmt;

    fn weaver(source: MemorySource, aspects: AspectCollector) -> ProxyWeaver<MemorySource, AspectCollector> {
        ProxyWeaver::new(source, aspects, WeaveOptions::default())
    }

    #[test]
    fn unknown_type_fails() {
        let w = weaver(MemorySource::new(), AspectCollector::new());
        assert!(matches!(w.weave("Nope"), Err(Error::TypeNotFound { .. })));
    }

    #[test]
    fn lookup_keys_cover_traits_and_interfaces() {
        let decl = TypeDeclaration::class("A").uses("T").implements("I");
        let keys: Vec<String> = lookup_keys(&decl).into_iter().collect();
        assert_eq!(keys, vec!["A", "I", "T"]);
    }

    #[test]
    fn binding_on_interface_name_matches_implementing_class() {
        let source = MemorySource::new().with(
            TypeDeclaration::class("App\\Impl")
                .implements("App\\Contract")
                .with_method(MethodDeclaration::new("run").with_statement("return 1;")),
        );
        let mut aspects = AspectCollector::new();
        aspects.set_around("Aspect", ["App\\Contract"], 0);

        let out = weaver(source, aspects).weave("App\\Impl").unwrap();
        assert_eq!(out.intercepted_methods, vec!["run".to_string()]);
    }

    #[test]
    fn method_scoped_binding_only_rewrites_that_method() {
        let source = MemorySource::new().with(
            TypeDeclaration::class("A")
                .with_method(MethodDeclaration::new("one").with_statement("return 1;"))
                .with_method(MethodDeclaration::new("two").with_statement("return 2;")),
        );
        let mut aspects = AspectCollector::new();
        aspects.set_around("Aspect", ["A::two"], 0);

        let out = weaver(source, aspects).weave("A").unwrap();
        assert!(!out.is_intercepted("one"));
        assert!(out.is_intercepted("two"));
    }

    #[test]
    fn many_bindings_produce_one_dispatch() {
        let source = MemorySource::new().with(
            TypeDeclaration::class("A")
                .with_method(MethodDeclaration::new("run").with_statement("return 1;")),
        );
        let mut aspects = AspectCollector::new();
        aspects.set_around("First", ["A"], 1);
        aspects.set_around("Second", ["A::run"], 2);

        let out = weaver(source, aspects).weave("A").unwrap();
        assert_eq!(out.source().matches("__proxyCall").count(), 1);
    }

    #[test]
    fn static_and_abstract_advised_methods_stay_verbatim() {
        let source = MemorySource::new().with(
            TypeDeclaration::class("A")
                .abstract_()
                .with_method(MethodDeclaration::new("make").static_().with_statement("return new static();"))
                .with_method(MethodDeclaration::new("handle").abstract_()),
        );
        let mut aspects = AspectCollector::new();
        aspects.set_around("Aspect", ["A"], 0);

        let out = weaver(source, aspects).weave("A").unwrap();
        assert!(out.intercepted_methods.is_empty());
        assert!(out.source().contains("    public static function make()\n    {\n        return new static();\n    }\n"));
        assert!(out.source().contains("    public abstract function handle();\n"));
    }

    #[test]
    fn explicit_constructor_is_hooked_not_proxied() {
        let source = MemorySource::new().with(
            TypeDeclaration::class("A").with_method(
                MethodDeclaration::new("__construct")
                    .with_parameter(Parameter::typed("id", "int"))
                    .with_statement("$this->id = $id;"),
            ),
        );
        let mut aspects = AspectCollector::new();
        aspects.set_around("Aspect", ["A"], 0);

        let out = weaver(source, aspects).weave("A").unwrap();
        assert!(out.intercepted_methods.is_empty());
        let ctor = out.unit.decl.method("__construct").expect("constructor");
        assert_eq!(
            ctor.body,
            Some(vec![
                Stmt::HandleProperties,
                Stmt::Verbatim("$this->id = $id;".to_string())
            ])
        );
    }

    #[test]
    fn traits_never_get_constructors_or_property_hooks() {
        let source = MemorySource::new().with(TypeDeclaration::trait_("App\\T"));
        let out = weaver(source, AspectCollector::new()).weave("App\\T").unwrap();
        assert!(out.unit.decl.method("__construct").is_none());
        assert_eq!(out.unit.decl.uses, vec!["\\Weave\\Aop\\ProxyTrait".to_string()]);
    }

    #[test]
    fn weave_many_stops_at_first_missing_type() {
        let source = MemorySource::new().with(TypeDeclaration::class("A"));
        let w = weaver(source, AspectCollector::new());
        assert_eq!(w.weave_many(["A"]).unwrap().len(), 1);
        assert!(w.weave_many(["A", "B"]).is_err());
    }
}
