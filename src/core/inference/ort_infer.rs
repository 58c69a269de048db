//! ONNX Runtime implementation of [`InferenceEngine`].

use super::{InferenceEngine, TensorInfo};
use crate::core::batch::{Tensor2D, Tensor4D};
use crate::core::config::BenchmarkConfig;
use crate::core::errors::{BenchError, BenchResult, SimpleError};
use ort::session::Session;
use ort::value::{TensorRef, ValueType};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One ONNX Runtime session plus the I/O declarations read from it at load time.
pub struct OrtInfer {
    session: Mutex<Session>,
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

fn tensor_shape(value_type: &ValueType) -> Option<Vec<i64>> {
    match value_type {
        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

impl OrtInfer {
    /// Wraps an already committed session.
    pub fn from_session(session: Session, model_path: impl AsRef<Path>) -> Self {
        let model_path = model_path.as_ref().to_path_buf();
        let inputs = session
            .inputs
            .iter()
            .map(|input| TensorInfo::new(input.name.clone(), tensor_shape(&input.input_type)))
            .collect();
        let outputs = session
            .outputs
            .iter()
            .map(|output| TensorInfo::new(output.name.clone(), tensor_shape(&output.output_type)))
            .collect();
        Self {
            session: Mutex::new(session),
            inputs,
            outputs,
            model_name: super::session::model_name_of(&model_path),
            model_path,
        }
    }

    /// Loads the model named by the configuration with its session settings.
    pub fn from_config(config: &BenchmarkConfig) -> BenchResult<Self> {
        let session = super::load_session(&config.model.model_path, &config.ort_session)?;
        Ok(Self::from_session(session, &config.model.model_path))
    }
}

impl InferenceEngine for OrtInfer {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn inputs(&self) -> &[TensorInfo] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorInfo] {
        &self.outputs
    }

    fn run(&self, input_name: &str, output_name: &str, x: &Tensor4D) -> BenchResult<Tensor2D> {
        let input_shape = x.shape().to_vec();
        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            BenchError::inference_error(
                &self.model_name,
                &format!("failed to convert input tensor with shape {:?}", input_shape),
                e,
            )
        })?;
        let inputs = ort::inputs![input_name => input_tensor];

        let mut session = self.session.lock().map_err(|_| {
            BenchError::inference_error(
                &self.model_name,
                "failed to acquire session lock",
                SimpleError::new("session lock poisoned"),
            )
        })?;

        let outputs = session.run(inputs).map_err(|e| {
            BenchError::inference_error(
                &self.model_name,
                &format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}'",
                    input_name, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                BenchError::inference_error(
                    &self.model_name,
                    &format!("failed to extract output tensor '{}' as f32", output_name),
                    e,
                )
            })?;

        let rows = output_shape.first().copied().unwrap_or(0).max(0) as usize;
        if rows == 0 || output_data.len() % rows != 0 {
            return Err(BenchError::inference_error(
                &self.model_name,
                &format!("unusable output shape {:?} for input {:?}", output_shape, input_shape),
                SimpleError::new("output cannot be split into per-image rows"),
            ));
        }
        let columns = output_data.len() / rows;
        Ok(Tensor2D::from_shape_vec((rows, columns), output_data.to_vec())?)
    }

    fn engine_info(&self) -> String {
        format!(
            "ONNX Runtime session for '{}' ({})",
            self.model_name,
            self.model_path.display()
        )
    }
}
