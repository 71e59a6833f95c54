//! The validate-when-resolved capability and its memoized lookup table.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Error;
use crate::model::normalize_name;
use crate::source::DeclarationSource;

/// Why a resolved parameter rejected itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The caller is not allowed to make this request; the gate answers 403
    Unauthorized {
        /// Reason reported by the instance
        message: String,
    },
    /// The input is invalid; propagated to the outer pipeline
    Invalid {
        /// Reason reported by the instance
        message: String,
    },
}

impl ValidationFailure {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ValidationFailure::Unauthorized {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationFailure::Invalid {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            ValidationFailure::Invalid { message } => write!(f, "Invalid: {}", message),
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// A resolved handler parameter that validates itself before the handler runs.
///
/// # Examples
///
/// ```
/// use proxy_weave::{ValidatesWhenResolved, ValidationFailure};
///
/// struct CreateUser {
///     admin: bool,
/// }
///
/// impl ValidatesWhenResolved for CreateUser {
///     fn validate_resolved(&self) -> Result<(), ValidationFailure> {
///         if !self.admin {
///             return Err(ValidationFailure::unauthorized("admins only"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(CreateUser { admin: false }.validate_resolved().is_err());
/// ```
pub trait ValidatesWhenResolved: Send + Sync {
    /// Validates the instance; `Unauthorized` makes the gate answer with 403.
    fn validate_resolved(&self) -> Result<(), ValidationFailure>;
}

/// Memo of the interfaces each type implements, keyed by qualified name.
///
/// Entries are computed once from the declaration source and never
/// invalidated: declarations are immutable after load. The table is safe to
/// share between concurrently handled requests; two threads racing on the
/// same key both compute the same set and the first insert wins.
#[derive(Debug, Default)]
pub struct CapabilityTable {
    implements: DashMap<String, Arc<BTreeSet<String>>>,
    lookups: AtomicUsize,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every interface `type_name` implements, directly or through ancestors.
    ///
    /// Types the source does not know implement nothing.
    ///
    /// # Errors
    ///
    /// Source failures other than [`Error::TypeNotFound`] are propagated.
    pub fn implements(
        &self,
        source: &dyn DeclarationSource,
        type_name: &str,
    ) -> Result<Arc<BTreeSet<String>>, Error> {
        let key = normalize_name(type_name);
        if let Some(found) = self.implements.get(&key) {
            return Ok(Arc::clone(found.value()));
        }

        let computed = Arc::new(collect_interfaces(source, &key)?);
        self.lookups.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(type_name = %key, interfaces = computed.len(), "memoized implements");

        let entry = self.implements.entry(key).or_insert(computed);
        Ok(Arc::clone(entry.value()))
    }

    /// Number of lookups that went to the declaration source.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of memoized types.
    pub fn len(&self) -> usize {
        self.implements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implements.is_empty()
    }
}

fn collect_interfaces(
    source: &dyn DeclarationSource,
    type_name: &str,
) -> Result<BTreeSet<String>, Error> {
    let mut found = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut pending = vec![type_name.to_string()];
    let mut root = true;

    while let Some(name) = pending.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let decl = match source.get_type(&name) {
            Ok(decl) => decl,
            Err(Error::TypeNotFound { .. }) => {
                // An unknown ancestor ends its branch; an unknown root implements nothing.
                if root {
                    return Ok(found);
                }
                continue;
            }
            Err(e) => return Err(e),
        };
        root = false;
        for interface in &decl.interfaces {
            found.insert(interface.clone());
            pending.push(interface.clone());
        }
        if let Some(parent) = &decl.parent {
            pending.push(parent.clone());
        }
    }
    Ok(found)
}
