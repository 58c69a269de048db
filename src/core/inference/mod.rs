//! The boundary between the benchmark and the inference engine.
//!
//! The engine itself is a black box behind [`InferenceEngine`]. The
//! [`InferenceInvoker`] binds one engine to a single input and output name
//! during setup and then submits one batch per call.

pub mod ort_infer;
pub mod session;

pub use ort_infer::OrtInfer;
pub use session::load_session;

use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::errors::{BenchError, BenchResult, SimpleError};
use std::fmt::Debug;

/// A named tensor declared by a model, with its shape when the model states one.
///
/// Dynamic dimensions are reported as negative values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Option<Vec<i64>>,
}

impl TensorInfo {
    pub fn new(name: impl Into<String>, shape: Option<Vec<i64>>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// A loaded model that turns one batch tensor into one batch of output rows.
pub trait InferenceEngine: Send + Sync + Debug {
    /// Short model name for logs and errors.
    fn model_name(&self) -> &str;

    /// Inputs declared by the model, in declaration order.
    fn inputs(&self) -> &[TensorInfo];

    /// Outputs declared by the model, in declaration order.
    fn outputs(&self) -> &[TensorInfo];

    /// Runs one batch and returns the named output with one row per image.
    fn run(&self, input_name: &str, output_name: &str, input: &Tensor4D) -> BenchResult<Tensor2D>;

    /// Get information about the inference engine.
    fn engine_info(&self) -> String;
}

fn resolve(
    declared: &[TensorInfo],
    requested: Option<&str>,
    kind: &str,
) -> BenchResult<TensorInfo> {
    match requested {
        Some(name) => declared
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| {
                let names: Vec<&str> = declared.iter().map(|t| t.name.as_str()).collect();
                BenchError::config_error(format!(
                    "model has no {kind} named '{name}' (declared: {names:?})"
                ))
            }),
        None => declared
            .first()
            .cloned()
            .ok_or_else(|| BenchError::config_error(format!("model declares no {kind}s"))),
    }
}

/// An engine bound to the input and output used for the whole run.
#[derive(Debug)]
pub struct InferenceInvoker<E> {
    engine: E,
    input: TensorInfo,
    output: TensorInfo,
}

impl<E: InferenceEngine> InferenceInvoker<E> {
    /// Binds `engine` to the requested names, falling back to the first
    /// declared input or output when a name is not given.
    pub fn bind(
        engine: E,
        input_name: Option<&str>,
        output_name: Option<&str>,
    ) -> BenchResult<Self> {
        let input = resolve(engine.inputs(), input_name, "input")?;
        let output = resolve(engine.outputs(), output_name, "output")?;
        Ok(Self {
            engine,
            input,
            output,
        })
    }

    /// Submits one batch. The result holds exactly one row per image.
    pub fn infer(&self, batch: &Tensor4D) -> BenchResult<Tensor2D> {
        let output = self
            .engine
            .run(&self.input.name, &self.output.name, batch)?;
        let expected = batch.shape()[0];
        if output.nrows() != expected {
            return Err(BenchError::inference_error(
                self.engine.model_name(),
                &format!("output '{}' row count", self.output.name),
                SimpleError::new(format!(
                    "expected {expected} rows for the batch, got {}",
                    output.nrows()
                )),
            ));
        }
        Ok(output)
    }

    /// Class count of the bound output: the product of its non-batch
    /// dimensions, or `None` when any of them is dynamic.
    pub fn output_classes(&self) -> Option<usize> {
        let shape = self.output.shape.as_ref()?;
        if shape.len() < 2 {
            return None;
        }
        shape[1..]
            .iter()
            .try_fold(1usize, |acc, &d| (d > 0).then(|| acc * d as usize))
    }

    pub fn input(&self) -> &TensorInfo {
        &self.input
    }

    pub fn output(&self) -> &TensorInfo {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[derive(Debug)]
    struct FixedEngine {
        inputs: Vec<TensorInfo>,
        outputs: Vec<TensorInfo>,
        rows_override: Option<usize>,
    }

    impl FixedEngine {
        fn new() -> Self {
            Self {
                inputs: vec![
                    TensorInfo::new("data", Some(vec![-1, 3, 224, 224])),
                    TensorInfo::new("aux", None),
                ],
                outputs: vec![
                    TensorInfo::new("prob", Some(vec![-1, 1001])),
                    TensorInfo::new("logits", Some(vec![-1, 1001, 1, 1])),
                    TensorInfo::new("dynamic", Some(vec![-1, -1])),
                ],
                rows_override: None,
            }
        }
    }

    impl InferenceEngine for FixedEngine {
        fn model_name(&self) -> &str {
            "fixed"
        }

        fn inputs(&self) -> &[TensorInfo] {
            &self.inputs
        }

        fn outputs(&self) -> &[TensorInfo] {
            &self.outputs
        }

        fn run(&self, _: &str, _: &str, input: &Tensor4D) -> BenchResult<Tensor2D> {
            let rows = self.rows_override.unwrap_or(input.shape()[0]);
            Ok(Array2::zeros((rows, 4)))
        }

        fn engine_info(&self) -> String {
            "fixed test engine".to_string()
        }
    }

    #[test]
    fn unnamed_io_falls_back_to_first_declared() {
        let invoker = InferenceInvoker::bind(FixedEngine::new(), None, None).unwrap();
        assert_eq!(invoker.input().name, "data");
        assert_eq!(invoker.output().name, "prob");
        assert_eq!(invoker.output_classes(), Some(1001));
    }

    #[test]
    fn named_output_is_used_and_flattened_for_classes() {
        let invoker =
            InferenceInvoker::bind(FixedEngine::new(), Some("aux"), Some("logits")).unwrap();
        assert_eq!(invoker.input().name, "aux");
        assert_eq!(invoker.output_classes(), Some(1001));

        let invoker = InferenceInvoker::bind(FixedEngine::new(), None, Some("dynamic")).unwrap();
        assert_eq!(invoker.output_classes(), None);
    }

    #[test]
    fn undeclared_name_is_config_error() {
        let err = InferenceInvoker::bind(FixedEngine::new(), Some("images"), None).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("images"));
    }

    #[test]
    fn row_count_mismatch_is_inference_error() {
        let mut engine = FixedEngine::new();
        engine.rows_override = Some(1);
        let invoker = InferenceInvoker::bind(engine, None, None).unwrap();
        let batch = Tensor4D::zeros((2, 3, 2, 2));
        assert!(invoker.infer(&batch).unwrap_err().is_inference());

        let invoker = InferenceInvoker::bind(FixedEngine::new(), None, None).unwrap();
        assert_eq!(invoker.infer(&batch).unwrap().nrows(), 2);
    }
}
