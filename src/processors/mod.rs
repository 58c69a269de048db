//! Batch preprocessing and postprocessing.
//!
//! * `assembler` - reads raw image files and stacks them into a batch tensor
//! * `normalization` - rescaling and mean subtraction for integer images
//! * `extractor` - per-image probability vectors from a batch output

pub mod assembler;
pub mod extractor;
pub mod normalization;

pub use assembler::{DEFAULT_PARALLEL_THRESHOLD, TensorAssembler, nchw_to_nhwc, nhwc_to_nchw};
pub use extractor::{BackgroundOffset, ClassificationResult, ResultExtractor, extract};
pub use normalization::{MeanSubtraction, NormalizationPolicy};
