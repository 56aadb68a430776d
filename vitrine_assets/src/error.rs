use std::io;

use thiserror::Error;

/// Failure to fetch or decode a model/animation asset.
///
/// Both variants families are recoverable by the caller: the viewer keeps
/// rendering an empty scene and reports the error instead of aborting.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("asset not found: {location}")]
    NotFound { location: String },
    #[error("reading {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("decoding {location}: {reason}")]
    Decode { location: String, reason: String },
    #[error("{location} contains no renderable meshes")]
    EmptyModel { location: String },
    #[error("{location} contains no animation clips")]
    MissingAnimation { location: String },
}

impl LoadError {
    pub fn decode(location: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::Decode {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Where the failing asset was expected to come from.
    pub fn location(&self) -> &str {
        match self {
            LoadError::NotFound { location }
            | LoadError::Io { location, .. }
            | LoadError::Decode { location, .. }
            | LoadError::EmptyModel { location }
            | LoadError::MissingAnimation { location } => location,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}
