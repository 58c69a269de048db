//! The core module of the benchmark.
//!
//! This module contains the fundamental components shared by the pipeline:
//! - Tensor aliases, data layouts and raw image records
//! - Configuration management
//! - Error handling
//! - The inference engine boundary and its ONNX Runtime implementation

pub mod batch;
pub mod config;
pub mod errors;
pub mod inference;

pub use batch::{DataLayout, IMAGE_CHANNELS, ImageDataType, ImageRecord, Tensor2D, Tensor4D};
pub use config::{BenchmarkConfig, ConfigError, OrtSessionConfig};
pub use errors::{BenchError, BenchResult, ProcessingStage, SimpleError};
pub use inference::{InferenceEngine, InferenceInvoker, OrtInfer, TensorInfo, load_session};
