// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure here aborts the current run. Skipping silently
// would desynchronise predicted and gold answer sets during
// evaluation. An empty decoding result is NOT an error: it is
// represented by `Prediction::empty`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    /// A source record could not be parsed or is internally inconsistent
    #[error("malformed input record '{record}': {reason}")]
    InputFormat { record: String, reason: String },

    /// Training-direction alignment needed a gold answer that was not there
    #[error("example '{0}' has no gold answer to align")]
    Alignment(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Parallel corpus files do not have the same number of lines
    #[error("line count mismatch: {titles} title lines vs {contents} content lines")]
    LengthMismatch { titles: usize, contents: usize },

    /// The model returned a different number of logit rows than windows sent
    #[error("model returned {actual} logit rows for {expected} windows")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

impl ReaderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn input_format(record: impl Into<String>, reason: impl ToString) -> Self {
        Self::InputFormat { record: record.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;
