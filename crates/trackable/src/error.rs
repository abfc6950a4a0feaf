use thiserror::Error;

/// Construction failures.
///
/// Almost every operation on a tracked container is total; the only way to
/// go wrong is handing a constructor a plain value of the wrong shape, and
/// that fails fast rather than deferring the problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackableError {
    #[error("NOT_OBJECT")]
    NotObject,

    #[error("NOT_ARRAY")]
    NotArray,
}
