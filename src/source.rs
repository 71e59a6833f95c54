//! Declaration sources.
//!
//! A [`DeclarationSource`] hands out immutable [`TypeDeclaration`] values by
//! qualified name. The weaver reads a type and its ancestors from it; the
//! validation gate reads handler signatures and interface lists from it.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Error;
use crate::model::{normalize_name, MethodDeclaration, TypeDeclaration};

/// Supplies parsed structural metadata for a qualified type name.
pub trait DeclarationSource: Send + Sync {
    /// Returns the declaration of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if the source does not know the type.
    fn get_type(&self, name: &str) -> Result<TypeDeclaration, Error>;
}

impl<S: DeclarationSource + ?Sized> DeclarationSource for &S {
    fn get_type(&self, name: &str) -> Result<TypeDeclaration, Error> {
        (**self).get_type(name)
    }
}

impl<S: DeclarationSource + ?Sized> DeclarationSource for std::sync::Arc<S> {
    fn get_type(&self, name: &str) -> Result<TypeDeclaration, Error> {
        (**self).get_type(name)
    }
}

/// In-memory declaration source keyed by qualified name.
///
/// # Examples
///
/// ```
/// use proxy_weave::{DeclarationSource, MemorySource, TypeDeclaration};
///
/// let mut source = MemorySource::new();
/// source.insert(TypeDeclaration::class("App\\Foo"));
///
/// assert!(source.get_type("\\App\\Foo").is_ok());
/// assert!(source.get_type("App\\Bar").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    types: HashMap<String, TypeDeclaration>,
}

#[derive(Deserialize)]
struct Manifest {
    types: Vec<TypeDeclaration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads declarations from a JSON manifest of the form `{"types": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] if the document does not decode.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let manifest: Manifest = serde_json::from_str(json)?;
        let mut source = Self::new();
        for decl in manifest.types {
            source.insert(decl.normalized());
        }
        tracing::debug!(types = source.len(), "loaded declaration manifest");
        Ok(source)
    }

    /// Adds or replaces a declaration.
    pub fn insert(&mut self, decl: TypeDeclaration) {
        self.types.insert(decl.name.clone(), decl);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, decl: TypeDeclaration) -> Self {
        self.insert(decl);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DeclarationSource for MemorySource {
    fn get_type(&self, name: &str) -> Result<TypeDeclaration, Error> {
        let key = normalize_name(name);
        self.types
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::type_not_found(key))
    }
}

/// A method together with the class or trait that declares it.
///
/// Type names in the method's signature are written relative to the
/// owner's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclaredMethod {
    pub owner: String,
    pub method: MethodDeclaration,
}

/// Finds `method` on `type_name`, searching used traits and then the parent chain.
///
/// Returns `Ok(None)` when no declaration in the chain has the method.
/// Ancestors the source does not know end the search quietly.
pub(crate) fn find_method(
    source: &dyn DeclarationSource,
    type_name: &str,
    method: &str,
) -> Result<Option<DeclaredMethod>, Error> {
    let declared = |owner: &TypeDeclaration, found: &MethodDeclaration| DeclaredMethod {
        owner: owner.name.clone(),
        method: found.clone(),
    };

    let mut current = Some(source.get_type(type_name)?);
    let mut depth = 0;
    while let Some(decl) = current {
        if let Some(found) = decl.method(method) {
            return Ok(Some(declared(&decl, found)));
        }
        for trait_name in &decl.traits {
            if let Ok(t) = source.get_type(trait_name) {
                if let Some(found) = t.method(method) {
                    return Ok(Some(declared(&t, found)));
                }
            }
        }
        depth += 1;
        // Malformed manifests can declare cycles.
        if depth > MAX_ANCESTRY {
            break;
        }
        current = match decl.parent {
            Some(parent) => source.get_type(&parent).ok(),
            None => None,
        };
    }
    Ok(None)
}

/// Upper bound on parent-chain walks.
pub(crate) const MAX_ANCESTRY: usize = 64;
