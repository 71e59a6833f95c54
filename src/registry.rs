//! Interception registry: which advices run around which methods.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::normalize_name;

/// How an advice wraps its target. Only `around` exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceKind {
    /// Runs around the original call and decides whether to proceed
    Around,
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceKind::Around => write!(f, "around"),
        }
    }
}

/// One aspect bound to one target.
///
/// `target` is either a qualified type name, binding every method of that
/// type, or `Type::method`, binding a single method. Matching is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdviceBinding {
    pub aspect_id: String,
    pub target: String,
    pub kind: AdviceKind,
    #[serde(default)]
    pub priority: i32,
}

impl AdviceBinding {
    /// Creates an around binding.
    pub fn around(aspect_id: impl Into<String>, target: impl Into<String>, priority: i32) -> Self {
        Self {
            aspect_id: aspect_id.into(),
            target: normalize_name(&target.into()),
            kind: AdviceKind::Around,
            priority,
        }
    }

    /// The type part of the target.
    pub fn target_type(&self) -> &str {
        match self.target.split_once("::") {
            Some((ty, _)) => ty,
            None => &self.target,
        }
    }

    /// The method part of the target, if the binding is method-scoped.
    pub fn target_method(&self) -> Option<&str> {
        self.target.split_once("::").map(|(_, m)| m)
    }

    /// Whether this binding covers `method`.
    pub fn matches_method(&self, method: &str) -> bool {
        match self.target_method() {
            Some(m) => m.eq_ignore_ascii_case(method),
            None => true,
        }
    }
}

/// Maps type names to the around-advices bound to them.
pub trait InterceptionRegistry: Send + Sync {
    /// Returns every binding whose target type is one of `type_names`.
    ///
    /// Implementations must return a deterministic order.
    fn find_around_bindings(&self, type_names: &BTreeSet<String>) -> Vec<AdviceBinding>;
}

impl<R: InterceptionRegistry + ?Sized> InterceptionRegistry for &R {
    fn find_around_bindings(&self, type_names: &BTreeSet<String>) -> Vec<AdviceBinding> {
        (**self).find_around_bindings(type_names)
    }
}

impl<R: InterceptionRegistry + ?Sized> InterceptionRegistry for std::sync::Arc<R> {
    fn find_around_bindings(&self, type_names: &BTreeSet<String>) -> Vec<AdviceBinding> {
        (**self).find_around_bindings(type_names)
    }
}

/// In-memory registry populated by aspect declarations.
///
/// Lookups return bindings ordered by descending priority, then aspect id,
/// then target.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use proxy_weave::{AspectCollector, InterceptionRegistry};
///
/// let mut aspects = AspectCollector::new();
/// aspects.set_around("App\\LogAspect", ["App\\Foo", "App\\Bar::run"], 0);
///
/// let keys: BTreeSet<String> = ["App\\Bar".to_string()].into_iter().collect();
/// let found = aspects.find_around_bindings(&keys);
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].target_method(), Some("run"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AspectCollector {
    bindings: Vec<AdviceBinding>,
}

impl AspectCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `aspect_id` around every target, replacing earlier bindings of the same aspect.
    pub fn set_around<I, T>(&mut self, aspect_id: &str, targets: I, priority: i32)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.bindings.retain(|b| b.aspect_id != aspect_id);
        for target in targets {
            self.bindings
                .push(AdviceBinding::around(aspect_id, target, priority));
        }
    }

    /// Adds a single binding.
    pub fn bind(&mut self, binding: AdviceBinding) {
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
    }

    /// All registered bindings in registration order.
    pub fn bindings(&self) -> &[AdviceBinding] {
        &self.bindings
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

impl InterceptionRegistry for AspectCollector {
    fn find_around_bindings(&self, type_names: &BTreeSet<String>) -> Vec<AdviceBinding> {
        let mut found: Vec<AdviceBinding> = self
            .bindings
            .iter()
            .filter(|b| b.kind == AdviceKind::Around && type_names.contains(b.target_type()))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.aspect_id.cmp(&b.aspect_id))
                .then_with(|| a.target.cmp(&b.target))
        });
        found
    }
}
