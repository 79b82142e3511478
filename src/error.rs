//! Error taxonomy for spec resolution and construction.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpinError {
    /// The spec does not name exactly one usable callable.
    #[error("bad spec for `{name}`: {reason}")]
    Config { name: String, reason: String },

    #[error("cannot resolve `{path}`: no module `{module}` is registered")]
    ModuleNotFound { path: String, module: String },

    #[error("cannot resolve `{path}`: module `{module}` has no member `{member}`")]
    MemberNotFound {
        path: String,
        module: String,
        member: String,
    },

    #[error("cannot resolve `{path}`: no alternate constructor `{constructor}`")]
    ConstructorNotFound { path: String, constructor: String },

    /// The callable itself failed. `source` is the callable's own error.
    #[error("constructing `{name}` failed: {source}")]
    Construction {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("dependency cycle detected: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("cannot register `{path}`: {reason}")]
    Registration { path: String, reason: String },

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl SpinError {
    /// True for the lookup-miss family (module, member, or alternate constructor).
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            SpinError::ModuleNotFound { .. }
                | SpinError::MemberNotFound { .. }
                | SpinError::ConstructorNotFound { .. }
        )
    }

    pub(crate) fn config(name: &str, reason: impl Into<String>) -> Self {
        SpinError::Config {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
