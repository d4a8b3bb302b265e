use thiserror::Error;

/// Per-image failures. The `Display` text is the status line the user sees.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{file}: failed to read image: {reason}")]
    UnreadableImage { file: String, reason: String },
    #[error("{file}: text detection failed: {reason}")]
    Detection { file: String, reason: String },
    #[error("[{index}/{total}] translation failed for '{original}': {reason}")]
    Translation {
        index: usize,
        total: usize,
        original: String,
        reason: String,
    },
    #[error("[{index}/{total}] rendering failed for '{original}': {reason}")]
    Render {
        index: usize,
        total: usize,
        original: String,
        reason: String,
    },
    #[error("{file}: failed to write output: {reason}")]
    Write { file: String, reason: String },
}

/// Flattens an error chain into one line.
pub(crate) fn reason(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
