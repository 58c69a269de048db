//! Assembly of raw image files into one contiguous batch tensor.

use std::path::Path;

use rayon::prelude::*;
use tracing::trace;

use crate::core::batch::{DataLayout, IMAGE_CHANNELS, ImageDataType, ImageRecord, Tensor4D};
use crate::core::config::BenchmarkConfig;
use crate::core::errors::{BenchError, BenchResult};
use crate::processors::normalization::NormalizationPolicy;

/// Batches larger than this are decoded and normalized on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Reads fixed-size images from an image directory and stacks them into a
/// float32 tensor in the layout the model expects.
#[derive(Debug, Clone)]
pub struct TensorAssembler<'a> {
    image_dir: &'a Path,
    height: usize,
    width: usize,
    layout: DataLayout,
    data_type: ImageDataType,
    normalization: &'a NormalizationPolicy,
    parallel_threshold: usize,
}

impl<'a> TensorAssembler<'a> {
    /// Creates an assembler for images of `height` x `width` x 3.
    pub fn new(
        image_dir: &'a Path,
        height: usize,
        width: usize,
        layout: DataLayout,
        data_type: ImageDataType,
        normalization: &'a NormalizationPolicy,
    ) -> Self {
        Self {
            image_dir,
            height,
            width,
            layout,
            data_type,
            normalization,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Creates an assembler from the model and dataset sections of a config.
    pub fn from_config(config: &'a BenchmarkConfig) -> Self {
        Self::new(
            &config.dataset.image_dir,
            config.model.image_height,
            config.model.image_width,
            config.model.data_layout,
            config.dataset.data_type,
            &config.normalization,
        )
    }

    /// Overrides the batch size above which images are processed in parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Number of f32 elements in one image.
    pub fn image_len(&self) -> usize {
        self.height * self.width * IMAGE_CHANNELS
    }

    /// Reads one listed image from the image directory.
    pub fn read_record(&self, name: &str) -> BenchResult<ImageRecord> {
        let path = self.image_dir.join(name);
        let bytes = std::fs::read(&path).map_err(|e| BenchError::io_error(&path, e))?;
        Ok(ImageRecord::new(name, bytes, self.data_type))
    }

    /// Decodes a record into `out` (HWC, f32) and normalizes integer data.
    ///
    /// `out` must hold exactly [`Self::image_len`] elements.
    pub fn decode_into(&self, record: &ImageRecord, out: &mut [f32]) -> BenchResult<()> {
        let element_size = record.data_type().element_size();
        let bytes = record.bytes();
        if bytes.len() % element_size != 0 || bytes.len() / element_size != self.image_len() {
            return Err(BenchError::shape_error(format!(
                "image '{}' holds {} bytes, which is not {}x{}x{} {} elements",
                record.name(),
                bytes.len(),
                self.height,
                self.width,
                IMAGE_CHANNELS,
                record.data_type()
            )));
        }
        if out.len() != self.image_len() {
            return Err(BenchError::shape_mismatch(
                "decode buffer",
                &[self.image_len()],
                &[out.len()],
            ));
        }

        match record.data_type() {
            ImageDataType::Uint8 => {
                for (dst, &b) in out.iter_mut().zip(bytes) {
                    *dst = b as f32;
                }
                self.normalization.apply(out);
            }
            ImageDataType::Float32 => {
                for (dst, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                    *dst = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
            }
        }
        Ok(())
    }

    /// Stacks already-read records into a tensor in the configured layout.
    pub fn stack(&self, records: &[ImageRecord]) -> BenchResult<Tensor4D> {
        let image_len = self.image_len();
        if image_len == 0 {
            return Err(BenchError::shape_error(format!(
                "cannot assemble images of {}x{}",
                self.height, self.width
            )));
        }
        let mut data = vec![0.0f32; records.len() * image_len];

        if records.len() > self.parallel_threshold {
            data.par_chunks_mut(image_len)
                .zip(records.par_iter())
                .try_for_each(|(chunk, record)| self.decode_into(record, chunk))?;
        } else {
            data.chunks_mut(image_len)
                .zip(records.iter())
                .try_for_each(|(chunk, record)| self.decode_into(record, chunk))?;
        }

        let nhwc = Tensor4D::from_shape_vec(
            (records.len(), self.height, self.width, IMAGE_CHANNELS),
            data,
        )?;
        Ok(match self.layout {
            DataLayout::Nhwc => nhwc,
            DataLayout::Nchw => nhwc_to_nchw(nhwc),
        })
    }

    /// Loads `batch_size` consecutive images starting at `start_index` and
    /// returns the batch tensor together with the next read index.
    pub fn assemble(
        &self,
        image_list: &[String],
        start_index: usize,
        batch_size: usize,
    ) -> BenchResult<(Tensor4D, usize)> {
        let end_index = start_index + batch_size;
        let names = image_list.get(start_index..end_index).ok_or_else(|| {
            BenchError::config_error(format!(
                "image list has {} entries, batch needs entries {}..{}",
                image_list.len(),
                start_index,
                end_index
            ))
        })?;

        let records = names
            .iter()
            .map(|name| self.read_record(name))
            .collect::<BenchResult<Vec<_>>>()?;
        let tensor = self.stack(&records)?;
        trace!(
            start_index,
            batch_size,
            shape = ?tensor.shape(),
            "assembled batch tensor"
        );
        Ok((tensor, end_index))
    }
}

/// Reorders a batch from NHWC to NCHW, returning a contiguous tensor.
pub fn nhwc_to_nchw(tensor: Tensor4D) -> Tensor4D {
    tensor
        .permuted_axes([0, 3, 1, 2])
        .as_standard_layout()
        .into_owned()
}

/// Reorders a batch from NCHW to NHWC, returning a contiguous tensor.
pub fn nchw_to_nhwc(tensor: Tensor4D) -> Tensor4D {
    tensor
        .permuted_axes([0, 2, 3, 1])
        .as_standard_layout()
        .into_owned()
}
