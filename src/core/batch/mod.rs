//! Tensor aliases and the data-layout types shared by the batch pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::config::ConfigError;

/// A 2-dimensional tensor, one row per image in a batch.
pub type Tensor2D = ndarray::Array2<f32>;

/// A 4-dimensional batch tensor in either NHWC or NCHW order.
pub type Tensor4D = ndarray::Array4<f32>;

/// Number of colour channels in every stored image.
pub const IMAGE_CHANNELS: usize = 3;

/// Axis ordering of the tensor fed to the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DataLayout {
    /// Batch, height, width, channel.
    #[serde(rename = "NHWC")]
    #[default]
    Nhwc,
    /// Batch, channel, height, width.
    #[serde(rename = "NCHW")]
    Nchw,
}

impl DataLayout {
    /// Returns the tensor shape for a batch of `batch` images of `height` x `width`.
    pub fn batch_shape(self, batch: usize, height: usize, width: usize) -> [usize; 4] {
        match self {
            DataLayout::Nhwc => [batch, height, width, IMAGE_CHANNELS],
            DataLayout::Nchw => [batch, IMAGE_CHANNELS, height, width],
        }
    }

    /// Reads `(height, width)` out of a model-declared 4D input shape.
    ///
    /// Dynamic dimensions (negative values) yield `None`.
    pub fn spatial_dims(self, shape: &[i64]) -> Option<(usize, usize)> {
        if shape.len() != 4 {
            return None;
        }
        let (h, w) = match self {
            DataLayout::Nhwc => (shape[1], shape[2]),
            DataLayout::Nchw => (shape[2], shape[3]),
        };
        if h < 0 || w < 0 {
            None
        } else {
            Some((h as usize, w as usize))
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataLayout::Nhwc => write!(f, "NHWC"),
            DataLayout::Nchw => write!(f, "NCHW"),
        }
    }
}

impl FromStr for DataLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NHWC" => Ok(DataLayout::Nhwc),
            "NCHW" => Ok(DataLayout::Nchw),
            _ => Err(ConfigError::invalid_value(
                "data_layout",
                s,
                "expected NHWC or NCHW",
            )),
        }
    }
}

/// Element type of the pre-processed images stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageDataType {
    /// One byte per channel value, range [0, 255].
    #[default]
    Uint8,
    /// Native-endian 32-bit floats, already scaled.
    Float32,
}

impl ImageDataType {
    /// Size in bytes of one stored element.
    pub fn element_size(self) -> usize {
        match self {
            ImageDataType::Uint8 => 1,
            ImageDataType::Float32 => 4,
        }
    }
}

impl fmt::Display for ImageDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDataType::Uint8 => write!(f, "uint8"),
            ImageDataType::Float32 => write!(f, "float32"),
        }
    }
}

impl FromStr for ImageDataType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "uint8" | "u8" => Ok(ImageDataType::Uint8),
            "float32" | "f32" => Ok(ImageDataType::Float32),
            other => Err(ConfigError::invalid_value(
                "data_type",
                other,
                "supported types are uint8 and float32",
            )),
        }
    }
}

/// One raw image as read from disk.
///
/// The payload is kept exactly as stored; decoding and normalization happen
/// when the record is placed into a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    name: String,
    bytes: Vec<u8>,
    data_type: ImageDataType,
}

impl ImageRecord {
    /// Creates a record from its list name, raw bytes and declared element type.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, data_type: ImageDataType) -> Self {
        Self {
            name: name.into(),
            bytes,
            data_type,
        }
    }

    /// Name of the image as listed in the image list file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared element type of the payload.
    pub fn data_type(&self) -> ImageDataType {
        self.data_type
    }
}
