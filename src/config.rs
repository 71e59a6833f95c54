//! Weaver and gate options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Version of the runtime the generated source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl RuntimeVersion {
    /// First runtime that lets traits use the proxy trait themselves.
    pub const TRAIT_PROXY: RuntimeVersion = RuntimeVersion::new(7, 3, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether trait declarations receive the call-interception trait.
    pub fn supports_trait_proxy(&self) -> bool {
        *self >= Self::TRAIT_PROXY
    }
}

impl Default for RuntimeVersion {
    fn default() -> Self {
        Self::new(8, 1, 0)
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for RuntimeVersion {
    type Err = Error;

    /// Parses `major[.minor[.patch]]`; missing parts default to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidManifest {
            message: format!("invalid runtime version '{}'", s),
        };
        let mut parts = s.trim().splitn(3, '.');
        let mut next = |required: bool| -> Result<u32, Error> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }
}

const DEFAULT_BANNER: &str = "/**
 * This file was generated by proxy-weave.
 *
 * Changes are overwritten the next time the proxy is woven.
 */";

/// Options controlling generated proxy source.
///
/// # Examples
///
/// ```
/// use proxy_weave::{RuntimeVersion, WeaveOptions};
///
/// let options = WeaveOptions::default()
///     .with_runtime_version(RuntimeVersion::new(7, 2, 0))
///     .with_proxy_trait("\\App\\Aop\\ProxyTrait");
///
/// assert!(!options.runtime_version.supports_trait_proxy());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveOptions {
    /// Target runtime; below 7.3 traits are not given the proxy trait
    pub runtime_version: RuntimeVersion,
    /// Emit the strict-types directive after the open tag
    pub strict_types: bool,
    /// Comment block emitted after the directive
    pub banner: String,
    /// Call-interception trait mixed into classes (and traits when supported)
    pub proxy_trait: String,
    /// Property-interception trait mixed into classes
    pub property_trait: String,
}

impl Default for WeaveOptions {
    fn default() -> Self {
        Self {
            runtime_version: RuntimeVersion::default(),
            strict_types: true,
            banner: DEFAULT_BANNER.to_string(),
            proxy_trait: "\\Weave\\Aop\\ProxyTrait".to_string(),
            property_trait: "\\Weave\\Aop\\PropertyHandlerTrait".to_string(),
        }
    }
}

impl WeaveOptions {
    pub fn with_runtime_version(mut self, version: RuntimeVersion) -> Self {
        self.runtime_version = version;
        self
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn with_strict_types(mut self, strict_types: bool) -> Self {
        self.strict_types = strict_types;
        self
    }

    pub fn with_proxy_trait(mut self, name: impl Into<String>) -> Self {
        self.proxy_trait = name.into();
        self
    }

    pub fn with_property_trait(mut self, name: impl Into<String>) -> Self {
        self.property_trait = name.into();
        self
    }
}

/// Options for the request validation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateOptions {
    /// Interface a parameter type must implement to be validated on resolution
    pub capability_marker: String,
    /// Status of the response returned when validation reports an authorization failure
    pub forbidden_status: u16,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            capability_marker: "Weave\\Validation\\Contract\\ValidatesWhenResolved".to_string(),
            forbidden_status: 403,
        }
    }
}

impl GateOptions {
    pub fn with_capability_marker(mut self, marker: impl Into<String>) -> Self {
        self.capability_marker = marker.into().trim_start_matches('\\').to_string();
        self
    }
}
