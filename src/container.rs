//! Dependency resolution for validated handler parameters.

use std::collections::HashMap;
use std::sync::Arc;

use crate::capability::ValidatesWhenResolved;
use crate::error::Error;
use crate::model::normalize_name;

/// Resolves instances of parameter types by qualified name.
pub trait Container: Send + Sync {
    /// Returns an instance of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] when the type cannot be produced.
    fn get(&self, type_name: &str) -> Result<Arc<dyn ValidatesWhenResolved>, Error>;
}

impl<C: Container + ?Sized> Container for Arc<C> {
    fn get(&self, type_name: &str) -> Result<Arc<dyn ValidatesWhenResolved>, Error> {
        (**self).get(type_name)
    }
}

type Factory = Box<dyn Fn() -> Arc<dyn ValidatesWhenResolved> + Send + Sync>;

/// Container backed by per-type factories.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use proxy_weave::{Container, MapContainer, ValidatesWhenResolved, ValidationFailure};
///
/// struct AlwaysOk;
/// impl ValidatesWhenResolved for AlwaysOk {
///     fn validate_resolved(&self) -> Result<(), ValidationFailure> {
///         Ok(())
///     }
/// }
///
/// let mut container = MapContainer::new();
/// container.register("App\\Request", || Arc::new(AlwaysOk));
///
/// assert!(container.get("App\\Request").is_ok());
/// assert!(container.get("App\\Other").is_err());
/// ```
#[derive(Default)]
pub struct MapContainer {
    factories: HashMap<String, Factory>,
}

impl MapContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory invoked on every resolution of `type_name`.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn ValidatesWhenResolved> + Send + Sync + 'static,
    {
        self.factories
            .insert(normalize_name(type_name), Box::new(factory));
    }

    /// Registers a shared instance returned on every resolution.
    pub fn instance(&mut self, type_name: &str, instance: Arc<dyn ValidatesWhenResolved>) {
        self.register(type_name, move || Arc::clone(&instance));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(&normalize_name(type_name))
    }
}

impl Container for MapContainer {
    fn get(&self, type_name: &str) -> Result<Arc<dyn ValidatesWhenResolved>, Error> {
        let key = normalize_name(type_name);
        match self.factories.get(&key) {
            Some(factory) => Ok(factory()),
            None => Err(Error::Resolution {
                type_name: key,
                message: "no binding registered".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ValidationFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted(Arc<AtomicUsize>);

    impl ValidatesWhenResolved for Counted {
        fn validate_resolved(&self) -> Result<(), ValidationFailure> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn factories_run_per_resolution() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut container = MapContainer::new();
        container.register("A", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Counted(Arc::new(AtomicUsize::new(0))))
        });

        container.get("A").unwrap();
        container.get("\\A").unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shared_instances_are_reused() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut container = MapContainer::new();
        container.instance("A", Arc::new(Counted(Arc::clone(&calls))));

        container.get("A").unwrap().validate_resolved().unwrap();
        container.get("A").unwrap().validate_resolved().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(container.contains("A"));
    }

    #[test]
    fn missing_binding_is_a_resolution_error() {
        let container = MapContainer::new();
        assert!(matches!(
            container.get("Nope"),
            Err(Error::Resolution { .. })
        ));
    }
}
