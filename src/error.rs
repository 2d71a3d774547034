use thiserror::Error;

use crate::geom::KernelError;
use crate::parse::DocumentError;

/// Result type of every engine-level query.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures surfaced by the configuration and its components.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A uid referenced in the document is not registered.
    #[error("unresolved reference: no component with uid `{uid}`")]
    UnresolvedReference { uid: String },
    /// A uid is registered twice in one configuration.
    #[error("duplicate identifier `{uid}`")]
    DuplicateIdentifier { uid: String },
    /// 1-based index outside `1..=count`.
    #[error("{what} index {index} out of range (1..={count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },
    #[error("document structure error: {0}")]
    XmlStructure(#[from] DocumentError),
    #[error("shape construction failed: {0}")]
    ShapeConstruction(#[from] KernelError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("non-finite value for {what}")]
    NonFinite { what: &'static str },
    #[error("point inversion on segment `{uid}` did not converge after {iterations} iterations")]
    Inversion { uid: String, iterations: usize },
}

impl EngineError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn unresolved(uid: impl Into<String>) -> Self {
        Self::UnresolvedReference { uid: uid.into() }
    }
}

/// Checks a 1-based `index` against `count`.
pub(crate) fn check_index(what: &'static str, index: usize, count: usize) -> EngineResult<usize> {
    if index == 0 || index > count {
        Err(EngineError::IndexOutOfRange { what, index, count })
    } else {
        Ok(index - 1)
    }
}
