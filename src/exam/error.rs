use std::path::PathBuf;

/// Errors surfaced to the presentation layer.
///
/// Everything except `Persistence` is a synchronous rejection that leaves the
/// session untouched. `Persistence` never aborts a submission; it is folded into
/// the outcome as a warning.
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    #[error("{0}")]
    Validation(String),
    #[error("question {} is out of range for section '{section}'", .index + 1)]
    OutOfRange { section: String, index: usize },
    #[error("failed to save results to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("no exam in progress")]
    NoActiveSession,
    #[error("exam already submitted")]
    SessionClosed,
}

pub type ExamResult<T> = Result<T, ExamError>;
