//! PvldError: unified error type for the pvld-reader public APIs
//!
//! Every fallible operation returns [`PvldError`]. Errors raised deep inside a
//! block read are wrapped layer by layer with [`PvldError::Context`], so the
//! rendered message keeps one prefix per layer while [`PvldError::kind`] still
//! reports the kind of the innermost failure.

use crate::topology::element_class::ElementClass;
use thiserror::Error;

/// Coarse classification of a [`PvldError`], stable across context wrapping.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    MissingGroup,
    MissingDataset,
    MissingAttribute,
    UnknownVariable,
    InconsistentMetadata,
    Configuration,
    TypeMismatch,
    Communication,
    Io,
}

/// Unified error type for reader operations.
#[derive(Debug, Error)]
pub enum PvldError {
    /// A named group does not exist in the store.
    #[error("Missing group `{0}`")]
    MissingGroup(String),
    /// A required dataset is absent from its group.
    #[error("Missing dataset `{dataset}` in group `{group}`")]
    MissingDataset { group: String, dataset: String },
    /// A required attribute is absent from its group.
    #[error("Missing attribute `{attribute}` in group `{group}`")]
    MissingAttribute { group: String, attribute: String },
    /// A block data request matched no dataset, node variable or history variable.
    #[error("Unknown variable `{variable}` for {class} elements")]
    UnknownVariable {
        class: ElementClass,
        variable: String,
    },
    /// Stored metadata contradicts itself (partition, material types, history slots...).
    #[error("Inconsistent metadata: {0}")]
    InconsistentMetadata(String),
    /// Reader configuration cannot be honoured for this file or communicator.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A stored value has a different type or shape than requested.
    #[error("Type mismatch for `{name}`: expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: String,
    },
    /// The root rank failed a collective read; the payload never arrived.
    #[error("Collective read failed on rank 0: {0}")]
    Communication(String),
    /// Context added by an outer layer around an inner failure.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<PvldError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PvldError {
    /// Kind of the innermost error, looking through any context layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PvldError::MissingGroup(_) => ErrorKind::MissingGroup,
            PvldError::MissingDataset { .. } => ErrorKind::MissingDataset,
            PvldError::MissingAttribute { .. } => ErrorKind::MissingAttribute,
            PvldError::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            PvldError::InconsistentMetadata(_) => ErrorKind::InconsistentMetadata,
            PvldError::Configuration(_) => ErrorKind::Configuration,
            PvldError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            PvldError::Communication(_) => ErrorKind::Communication,
            PvldError::Context { source, .. } => source.kind(),
            PvldError::Io(_) | PvldError::Json(_) => ErrorKind::Io,
        }
    }

    /// Innermost error beneath all context layers.
    pub fn root_cause(&self) -> &PvldError {
        match self {
            PvldError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Wrap this error with an outer context message.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PvldError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn missing_dataset(group: &str, dataset: &str) -> Self {
        PvldError::MissingDataset {
            group: group.to_string(),
            dataset: dataset.to_string(),
        }
    }

    pub(crate) fn missing_attribute(group: &str, attribute: &str) -> Self {
        PvldError::MissingAttribute {
            group: group.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

/// Lazily attach context to the error branch of a `Result`.
pub trait ResultExt<T> {
    fn context<F, S>(self, f: F) -> Result<T, PvldError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, PvldError> {
    fn context<F, S>(self, f: F) -> Result<T, PvldError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
