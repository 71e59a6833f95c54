//! Interception proxy weaving and resolved-parameter request validation.
//!
//! This crate provides two independent building blocks of an aspect-oriented
//! web stack:
//! - **Proxy weaving**: a [`ProxyWeaver`] turns a declared class, trait or
//!   interface into an equivalent proxy whose advised methods run through an
//!   around-dispatcher, preserving signatures and inheritance
//! - **Request validation**: a [`ValidationGate`] middleware resolves handler
//!   parameters that validate themselves when resolved, and answers a fixed
//!   forbidden response when one of them rejects the caller
//!
//! # Core Types
//!
//! - [`TypeDeclaration`]: Immutable structural metadata of a declared type
//! - [`DeclarationSource`]: Where declarations come from ([`MemorySource`] in memory or from JSON)
//! - [`InterceptionRegistry`]: Which advices bind to which types ([`AspectCollector`])
//! - [`GeneratedType`]: Proxy IR plus its rendered source
//! - [`web::Middleware`]: The pipeline seam the gate implements
//!
//! # Examples
//!
//! ```
//! use proxy_weave::{
//!     AspectCollector, MemorySource, MethodDeclaration, Parameter, ProxyWeaver,
//!     TypeDeclaration, WeaveOptions,
//! };
//!
//! let source = MemorySource::new()
//!     .with(TypeDeclaration::class("App\\Bar").with_method(
//!         MethodDeclaration::new("__construct").with_parameter(Parameter::typed("id", "int")),
//!     ))
//!     .with(TypeDeclaration::class("App\\Bar3").extends("App\\Bar").with_method(
//!         MethodDeclaration::new("getId")
//!             .returning("int")
//!             .with_statement("return parent::getId();"),
//!     ));
//!
//! let mut aspects = AspectCollector::new();
//! aspects.set_around("App\\BarAspect", ["App\\Bar3"], 0);
//!
//! let proxy = ProxyWeaver::new(source, aspects, WeaveOptions::default())
//!     .weave("App\\Bar3")
//!     .expect("declared type");
//!
//! assert!(proxy.source().contains("parent::__construct($id);"));
//! assert!(proxy.source().contains("public function getId() : int"));
//! ```

#![forbid(unsafe_code)]

mod capability;
mod config;
mod container;
mod error;
mod gate;
mod logging;
mod model;
mod registry;
mod source;
pub mod weaver;
pub mod web;

pub use capability::{CapabilityTable, ValidatesWhenResolved, ValidationFailure};
pub use config::{GateOptions, RuntimeVersion, WeaveOptions};
pub use container::{Container, MapContainer};
pub use error::Error;
pub use gate::ValidationGate;
pub use logging::GateLog;
pub use model::{
    ConstantDeclaration, MethodDeclaration, Parameter, PropertyDeclaration, TypeDeclaration,
    TypeKind, Visibility, CONSTRUCTOR,
};
pub use registry::{AdviceBinding, AdviceKind, AspectCollector, InterceptionRegistry};
pub use source::{DeclarationSource, MemorySource};
pub use weaver::{GeneratedType, ProxyWeaver};
