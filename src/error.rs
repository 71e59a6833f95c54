use std::fmt;

/// Errors that can occur while weaving proxies or gating requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The declaration source has no type with this qualified name
    TypeNotFound {
        /// The qualified name that was looked up
        name: String,
    },
    /// The declaration contains a shape the weaver has no rule for
    UnsupportedConstruct {
        /// The type being woven
        type_name: String,
        /// Description of the offending construct
        construct: String,
    },
    /// The request reached the gate without a dispatch annotation
    MisroutedRequest {
        /// Human-readable message explaining the violation
        message: String,
    },
    /// The dispatched handler reference could not be resolved to a callable
    HandlerNotFound {
        /// The handler reference as it was dispatched
        handler: String,
    },
    /// A resolved parameter rejected itself for a reason other than authorization
    Validation {
        /// The parameter type that failed validation
        type_name: String,
        /// The failure message reported by the instance
        message: String,
    },
    /// The container could not produce an instance for a parameter type
    Resolution {
        /// The type that was requested from the container
        type_name: String,
        /// Why resolution failed
        message: String,
    },
    /// A declaration manifest could not be decoded
    InvalidManifest {
        /// Decoder message
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::TypeNotFound`].
    pub fn type_not_found(name: impl Into<String>) -> Self {
        Error::TypeNotFound { name: name.into() }
    }

    /// Shorthand for [`Error::UnsupportedConstruct`].
    pub fn unsupported(type_name: impl Into<String>, construct: impl Into<String>) -> Self {
        Error::UnsupportedConstruct {
            type_name: type_name.into(),
            construct: construct.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeNotFound { name } => write!(f, "Type '{}' not found", name),
            Error::UnsupportedConstruct {
                type_name,
                construct,
            } => write!(f, "No weaving rule for {} in '{}'", construct, type_name),
            Error::MisroutedRequest { message } => write!(f, "Misrouted request: {}", message),
            Error::HandlerNotFound { handler } => write!(f, "Handler '{}' does not exist", handler),
            Error::Validation { type_name, message } => {
                write!(f, "Validation of '{}' failed: {}", type_name, message)
            }
            Error::Resolution { type_name, message } => {
                write!(f, "Cannot resolve '{}': {}", type_name, message)
            }
            Error::InvalidManifest { message } => {
                write!(f, "Invalid declaration manifest: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidManifest {
            message: e.to_string(),
        }
    }
}
