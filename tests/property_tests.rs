//! Integration property tests for proxy-weave.
//!
//! These tests check cross-module invariants of weaving and of the gate
//! over generated declarations and requests.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use proxy_weave::web::{Dispatched, Middleware, Request, Response};
use proxy_weave::{
    AspectCollector, Error, GateOptions, MapContainer, MemorySource, MethodDeclaration,
    Parameter, ProxyWeaver, TypeDeclaration, ValidationGate, WeaveOptions,
};

// Strategy: one method with a short straight-line body
fn arb_method(name: String) -> impl Strategy<Value = MethodDeclaration> {
    (
        prop::collection::vec("\\$[a-z]{1,6} = [0-9]{1,4};", 0..4),
        prop::collection::btree_set("[a-z]{1,6}", 0..3),
        prop::option::of(prop_oneof![Just("int"), Just("string"), Just("void"), Just("?array")]),
        any::<bool>(),
    )
        .prop_map(move |(statements, params, returns, is_static)| {
            let mut method = MethodDeclaration::new(name.clone());
            for p in params {
                method = method.with_parameter(Parameter::new(p));
            }
            for s in statements {
                method = method.with_statement(s);
            }
            if let Some(r) = returns {
                method = method.returning(r);
            }
            if is_static {
                method = method.static_();
            }
            method
        })
}

// Strategy: a class in App\Gen with unique lowercase method names
fn arb_class() -> impl Strategy<Value = TypeDeclaration> {
    prop::collection::btree_set("[a-z]{3,8}", 0..5)
        .prop_flat_map(|names| {
            names
                .into_iter()
                .map(arb_method)
                .collect::<Vec<_>>()
        })
        .prop_map(|methods| {
            methods
                .into_iter()
                .fold(TypeDeclaration::class("App\\Gen\\Subject"), |decl, m| {
                    decl.with_method(m)
                })
        })
}

fn weaver_for(decl: TypeDeclaration, advised: bool) -> ProxyWeaver<MemorySource, AspectCollector> {
    let mut aspects = AspectCollector::new();
    let target = if advised { "App\\Gen\\Subject" } else { "App\\Gen\\Elsewhere" };
    aspects.set_around("App\\Gen\\Aspect", [target], 0);
    ProxyWeaver::new(MemorySource::new().with(decl), aspects, WeaveOptions::default())
}

proptest! {
    /// Property: weaving the same declaration twice yields identical output
    #[test]
    fn proptest_weaving_is_deterministic(decl in arb_class(), advised in any::<bool>()) {
        let weaver = weaver_for(decl, advised);
        let first = weaver.weave("App\\Gen\\Subject").unwrap();
        let second = weaver.weave("App\\Gen\\Subject").unwrap();
        prop_assert_eq!(first.source(), second.source());
    }

    /// Property: without a matching binding every body line survives verbatim
    #[test]
    fn proptest_unadvised_bodies_are_verbatim(decl in arb_class()) {
        let weaver = weaver_for(decl.clone(), false);
        let proxy = weaver.weave("App\\Gen\\Subject").unwrap();

        prop_assert!(proxy.intercepted_methods.is_empty());
        prop_assert!(!proxy.source().contains("__proxyCall"));
        for method in &decl.methods {
            for statement in method.body.iter().flatten() {
                let line = format!("        {}\n", statement);
                prop_assert!(proxy.source().contains(&line));
            }
        }
    }

    /// Property: exactly the concrete instance methods are intercepted when advised
    #[test]
    fn proptest_advised_instance_methods_are_intercepted(decl in arb_class()) {
        let expected: BTreeSet<String> = decl
            .methods
            .iter()
            .filter(|m| !m.is_static)
            .map(|m| m.name.clone())
            .collect();

        let proxy = weaver_for(decl, true).weave("App\\Gen\\Subject").unwrap();
        let intercepted: BTreeSet<String> = proxy.intercepted_methods.iter().cloned().collect();

        prop_assert_eq!(&intercepted, &expected);
        prop_assert_eq!(proxy.source().matches("self::__proxyCall(").count(), expected.len());
        prop_assert!(proxy.source().ends_with("}\n"), "source does not end with closing brace");
    }

    /// Property: interfaces never receive injected capabilities or rewritten bodies
    #[test]
    fn proptest_interfaces_stay_signature_only(
        names in prop::collection::btree_set("[a-z]{3,8}", 0..5)
    ) {
        let decl = names.iter().fold(
            TypeDeclaration::interface("App\\Gen\\Subject"),
            |decl, name| decl.with_method(MethodDeclaration::signature(name.clone())),
        );
        let proxy = weaver_for(decl, true).weave("App\\Gen\\Subject").unwrap();

        prop_assert!(!proxy.source().contains("    use "));
        prop_assert!(!proxy.source().contains("__proxyCall"));
        prop_assert_eq!(proxy.source().matches("();\n").count(), names.len());
    }

    /// Property: routes that were not found always go straight to `next`
    #[test]
    fn proptest_unrouted_requests_always_delegate(
        request_id in prop::string::string_regex("[a-z0-9-]{1,20}").unwrap(),
        method_not_allowed in any::<bool>()
    ) {
        let gate = ValidationGate::new(
            Arc::new(MemorySource::new()),
            Arc::new(MapContainer::new()),
            GateOptions::default(),
        );
        let dispatched = if method_not_allowed {
            Dispatched::method_not_allowed()
        } else {
            Dispatched::not_found()
        };
        let request = Request::new(request_id.clone()).with_dispatched(dispatched);
        let next = |r: &Request| -> Result<Response, Error> {
            Ok(Response::ok().with_body(r.request_id().to_string()))
        };

        let response = gate.process(&request, &next).unwrap();
        prop_assert_eq!(response.body, request_id);
        prop_assert!(gate.capabilities().is_empty());
    }
}
