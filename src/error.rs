//! Error taxonomy for the skill-to-tool pipeline.
//!
//! Fatal at startup in single-tenant mode, converted to a returned message
//! or an empty listing everywhere else. The protocol layer never sees an
//! unhandled error from this crate.

use crate::platform::PlatformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// The connectivity probe against the resolved base URL failed.
    #[error("Cannot connect to platform at {0}")]
    Connectivity(String),

    /// A required identifier, credential, or tenant is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied argument is missing or outside its permitted set.
    #[error("{0}")]
    Validation(String),

    /// A skill declares a parameter type outside the supported closed set.
    /// An un-typeable parameter would break the typed invocation signature,
    /// so contract building refuses it rather than coercing.
    #[error("Unsupported parameter type `{source_type}` for parameter `{parameter}`")]
    UnsupportedParameterType {
        parameter: String,
        source_type: String,
    },

    /// The upstream platform call itself failed.
    #[error(transparent)]
    Upstream(#[from] PlatformError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
