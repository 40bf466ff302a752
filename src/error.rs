use thiserror::Error;

/// Reasons a generation run produces no result at all.
///
/// An infeasible timetable is not an error: it is reported as a
/// `GenerationResult` with `success == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("invalid scheduling input: {0}")]
    InvalidInput(String),

    #[error("timetable generation was cancelled")]
    Cancelled,
}

impl GenerationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GenerationError::InvalidInput(message.into())
    }
}
