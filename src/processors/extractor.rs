//! Per-image result extraction from a batch output.

use crate::core::batch::Tensor2D;
use crate::core::errors::{BenchError, BenchResult};

/// Number of leading output slots that belong to classes the label file
/// does not list (for example a background class at index 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackgroundOffset(usize);

impl BackgroundOffset {
    /// Wraps a known offset.
    pub fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Derives the offset from the model's class count and the label count.
    ///
    /// A model with fewer classes than there are labels is a configuration error.
    pub fn compute(model_classes: usize, label_count: usize) -> BenchResult<Self> {
        model_classes
            .checked_sub(label_count)
            .map(Self)
            .ok_or_else(|| {
                BenchError::config_error(format!(
                    "model declares {model_classes} output classes but the label file lists {label_count}"
                ))
            })
    }

    /// The offset as a slot count.
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BackgroundOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Probability vector for one image, in class order after the offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Per-class values as produced by the model.
    pub probabilities: Vec<f32>,
}

impl ClassificationResult {
    /// Number of classes reported.
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Returns true when no classes remain.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Selects row `index` of `output` and drops its first `offset` entries.
pub fn extract(
    output: &Tensor2D,
    index: usize,
    offset: BackgroundOffset,
) -> BenchResult<ClassificationResult> {
    let (rows, classes) = output.dim();
    if index >= rows {
        return Err(BenchError::shape_error(format!(
            "result index {index} is outside a batch output of {rows} rows"
        )));
    }
    if offset.get() > classes {
        return Err(BenchError::shape_error(format!(
            "background offset {offset} exceeds the {classes} output classes"
        )));
    }

    let probabilities = output.row(index).iter().skip(offset.get()).copied().collect();
    Ok(ClassificationResult { probabilities })
}

/// Extracts every row of a batch output with a fixed background offset.
#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor {
    offset: BackgroundOffset,
}

impl ResultExtractor {
    /// Creates an extractor for a precomputed offset.
    pub fn new(offset: BackgroundOffset) -> Self {
        Self { offset }
    }

    /// The offset applied to each row.
    pub fn offset(&self) -> BackgroundOffset {
        self.offset
    }

    /// Extracts the result for one image of the batch.
    pub fn extract(&self, output: &Tensor2D, index: usize) -> BenchResult<ClassificationResult> {
        extract(output, index, self.offset)
    }

    /// Extracts the results for all rows, in batch order.
    pub fn extract_all(&self, output: &Tensor2D) -> BenchResult<Vec<ClassificationResult>> {
        (0..output.nrows())
            .map(|index| self.extract(output, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn offset_drops_background_slot() {
        let output = Array2::from_shape_fn((2, 1001), |(r, c)| (r * 10_000 + c) as f32);
        let offset = BackgroundOffset::compute(1001, 1000).unwrap();
        assert_eq!(offset.get(), 1);

        let result = extract(&output, 1, offset).unwrap();
        assert_eq!(result.len(), 1000);
        assert_eq!(result.probabilities[0], 10_001.0);
        assert_eq!(result.probabilities[999], 11_000.0);
    }

    #[test]
    fn zero_offset_returns_row_unchanged() {
        let output = Array2::from_shape_vec((1, 3), vec![0.2, 0.5, 0.3]).unwrap();
        let result = extract(&output, 0, BackgroundOffset::default()).unwrap();
        assert_eq!(result.probabilities, vec![0.2, 0.5, 0.3]);
    }

    #[test]
    fn more_labels_than_classes_is_config_error() {
        let err = BackgroundOffset::compute(10, 11).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn out_of_range_index_is_shape_error() {
        let output = Array2::<f32>::zeros((2, 4));
        let err = extract(&output, 2, BackgroundOffset::new(1)).unwrap_err();
        assert!(err.is_shape());

        let err = extract(&output, 0, BackgroundOffset::new(5)).unwrap_err();
        assert!(err.is_shape());
    }

    #[test]
    fn extract_all_keeps_batch_order() {
        let output = Array2::from_shape_fn((3, 3), |(r, c)| (r * 3 + c) as f32);
        let results = ResultExtractor::new(BackgroundOffset::new(1))
            .extract_all(&output)
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].probabilities, vec![1.0, 2.0]);
        assert_eq!(results[2].probabilities, vec![7.0, 8.0]);
    }
}
