//! Domain error taxonomy.
//!
//! Every variant is request-scoped: handlers map them to structured
//! failure responses and none of them bring the service down. External
//! process failures are deliberately *not* represented here -- they are
//! carried inside [`crate::executor::ExecutionResult`] so timing and
//! diagnostics survive the failure path.

/// Errors produced by the core pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The storage root could not be created or written to.
    #[error("storage root unavailable: {0}")]
    Storage(String),

    /// A user-supplied filename failed path sanitation.
    #[error("invalid filename: {0}")]
    InvalidPath(String),

    /// The uploaded payload was empty or could not be written.
    #[error("upload failed: {0}")]
    Upload(String),

    /// No job directory exists for the given id.
    #[error("unknown job id: {0}")]
    JobNotFound(String),

    /// The job already has an input file bound to it.
    #[error("job {0} already has an input file")]
    JobAlreadyBound(String),

    /// The command template failed structural validation.
    #[error("invalid command template: {0}")]
    Template(String),

    /// The requested download target does not exist.
    #[error("file not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout the core crate.
pub type CoreResult<T> = Result<T, CoreError>;
