//! Error types for the classification benchmark.
//!
//! Every failure the benchmark can hit is fatal: the variants below exist to
//! carry enough context (path, stage, model, shape) for the top-level report,
//! not to drive recovery.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stage of the batch pipeline in which a processing error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Reading, decoding and normalizing the images of a batch.
    Load,
    /// Submitting a batch to the inference engine.
    Inference,
    /// Slicing per-image vectors out of a batch output.
    Extraction,
    /// Writing result files or the timing report.
    Persistence,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Load => write!(f, "load"),
            ProcessingStage::Inference => write!(f, "inference"),
            ProcessingStage::Extraction => write!(f, "extraction"),
            ProcessingStage::Persistence => write!(f, "persistence"),
        }
    }
}

/// Errors produced by the benchmark pipeline.
#[derive(Error, Debug)]
pub enum BenchError {
    /// A required setting is missing or invalid.
    #[error("configuration: {message}")]
    Config {
        /// Description of the offending setting.
        message: String,
    },

    /// An image, label, list, model or result file could not be read or written.
    #[error("io error on '{}': {source}", path.display())]
    Io {
        /// Path of the file involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Data does not match the declared dimensions.
    #[error("shape mismatch: {context}")]
    Shape {
        /// Description of the expected and actual shapes.
        context: String,
    },

    /// The inference engine failed.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model being run.
        model_name: String,
        /// What was being attempted.
        context: String,
        /// Underlying engine error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A pipeline stage failed on top of another error.
    #[error("{stage} failed: {context}")]
    Processing {
        /// Stage where the failure happened.
        stage: ProcessingStage,
        /// Additional context.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from tensor reshaping.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// Error serializing the timing report.
    #[error("report serialization")]
    Serialization(#[from] serde_json::Error),
}

/// Convenient result alias for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;

/// Minimal error carrying only a message, used as a `source` where no
/// underlying error exists.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimpleError(String);

impl SimpleError {
    /// Creates a new message-only error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl BenchError {
    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a configuration error naming the field and the rejected value.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::Config {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates an I/O error bound to a path.
    pub fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a shape error.
    pub fn shape_error(context: impl Into<String>) -> Self {
        Self::Shape {
            context: context.into(),
        }
    }

    /// Creates a shape error comparing expected and actual dimensions.
    pub fn shape_mismatch(what: &str, expected: &[usize], actual: &[usize]) -> Self {
        Self::Shape {
            context: format!("{}: expected {:?}, got {:?}", what, expected, actual),
        }
    }

    /// Creates an inference error.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a processing error for a given stage.
    pub fn processing_error(
        stage: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Follows `Processing` wrappers down to the error that caused them.
    pub fn root_cause(&self) -> &BenchError {
        let mut current = self;
        while let Self::Processing { source, .. } = current {
            match source.downcast_ref::<BenchError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Pipeline stage of the outermost `Processing` wrapper, if any.
    pub fn stage(&self) -> Option<ProcessingStage> {
        match self {
            Self::Processing { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self.root_cause(), Self::Config { .. })
    }

    /// Returns true for shape errors, including those raised by ndarray.
    pub fn is_shape(&self) -> bool {
        matches!(self.root_cause(), Self::Shape { .. } | Self::Tensor(_))
    }

    /// Returns true for I/O errors.
    pub fn is_io(&self) -> bool {
        matches!(self.root_cause(), Self::Io { .. })
    }

    /// Returns true for engine failures.
    pub fn is_inference(&self) -> bool {
        matches!(self.root_cause(), Self::Inference { .. })
    }
}

impl From<crate::core::config::ConfigError> for BenchError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Config {
            message: error.to_string(),
        }
    }
}
