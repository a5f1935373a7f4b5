// Fatal pipeline errors and their process exit codes.
//
// Everything else propagates as anyhow::Error with context. Isolated content
// failures (a cell that won't translate, a chart that won't render) are not
// errors at all: they are recorded as values by the stage that hit them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run. Each maps to a distinct exit code.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("required column missing: {0}")]
    MissingColumn(String),
}

/// Exit code when the run finished but some artifacts or segments failed (`--strict`).
pub const EXIT_WITH_WARNINGS: i32 = 5;

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InputNotFound(_) => 2,
            PipelineError::UnsupportedFormat(_) => 3,
            PipelineError::MissingColumn(_) => 4,
        }
    }
}

/// Pick the process exit code for a top-level error.
///
/// Walks the anyhow chain so a `PipelineError` wrapped in context still
/// gets its own code. Anything else exits with 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}
