//! # ONNX Classify Bench
//!
//! A batched image-classification benchmark for ONNX models. It streams
//! pre-processed raw images from disk, feeds them to ONNX Runtime in fixed-size
//! batches, writes one probability file per image and reports load and
//! inference timings with the first batch excluded as warm-up.
//!
//! ## Components
//!
//! - **TensorAssembler**: reads raw `uint8`/`float32` images and stacks them
//!   into an NHWC or NCHW batch tensor, normalizing integer data
//! - **InferenceInvoker**: binds the engine to one input and one output
//! - **ResultExtractor**: slices per-image vectors, dropping background classes
//! - **TimingAccumulator**: per-stage timings and the summary report
//! - **BenchmarkDriver**: setup, the sequential batch loop and reporting
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, tensor types and the inference boundary
//! * [`processors`] - Batch assembly, normalization and result extraction
//! * [`pipeline`] - Timing statistics, result files and the driver
//! * [`utils`] - List readers and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use onnx_classify_bench::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BenchmarkConfig::from_env()?;
//! let mut driver = BenchmarkDriver::new(&config);
//! let report = driver.run(OrtInfer::from_config)?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;

pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use onnx_classify_bench::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::{BenchmarkConfig, ConfigValidator};
    pub use crate::core::inference::{InferenceEngine, OrtInfer, TensorInfo};
    pub use crate::core::{BenchError, BenchResult};
    pub use crate::pipeline::{BenchmarkDriver, TimingReport};
}
