//! Configuration management for the benchmark.
//!
//! This module provides the run configuration, the ONNX Runtime session
//! settings and the validation traits shared by both.

pub mod benchmark;
pub mod errors;
pub mod onnx;

// Re-export commonly used types
pub use benchmark::{
    BatchConfig, BenchmarkConfig, DEFAULT_REPORT_PATH, DatasetConfig, ModelConfig, env_keys,
};
pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use onnx::*;
