//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use ndarray::Array2;
use onnx_classify_bench::core::batch::{DataLayout, ImageDataType, Tensor2D, Tensor4D};
use onnx_classify_bench::core::config::{
    BatchConfig, BenchmarkConfig, DatasetConfig, ModelConfig, OrtSessionConfig,
};
use onnx_classify_bench::core::{BenchResult, InferenceEngine, TensorInfo};
use onnx_classify_bench::processors::NormalizationPolicy;
use std::path::{Path, PathBuf};

/// How a stub output fills its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `mean * (c + 1) / width` clamped to [-1, 1], from the image's mean.
    ImageMean,
    /// `c / width`, the same for every image.
    Ramp,
}

/// One output of the stub: the declared metadata, the width it really
/// produces and how its values are filled.
#[derive(Debug, Clone)]
pub struct StubOutput {
    pub info: TensorInfo,
    pub width: usize,
    pub fill: Fill,
}

impl StubOutput {
    pub fn new(name: &str, declared: Vec<i64>, width: usize, fill: Fill) -> Self {
        Self {
            info: TensorInfo::new(name, Some(declared)),
            width,
            fill,
        }
    }
}

/// Engine with a fixed 2x2x3 NHWC input and configurable outputs.
#[derive(Debug)]
pub struct StubEngine {
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
    stub_outputs: Vec<StubOutput>,
}

impl StubEngine {
    /// `softmax` declares and produces `classes` image-mean values; `logits`
    /// declares and produces `classes + 2` ramp values.
    pub fn new(classes: i64) -> Self {
        Self::with_outputs(vec![
            StubOutput::new("softmax", vec![-1, classes], classes as usize, Fill::ImageMean),
            StubOutput::new("logits", vec![-1, classes + 2], classes as usize + 2, Fill::Ramp),
        ])
    }

    pub fn with_outputs(stub_outputs: Vec<StubOutput>) -> Self {
        Self {
            inputs: vec![TensorInfo::new("input", Some(vec![-1, 2, 2, 3]))],
            outputs: stub_outputs.iter().map(|o| o.info.clone()).collect(),
            stub_outputs,
        }
    }
}

impl InferenceEngine for StubEngine {
    fn model_name(&self) -> &str {
        "stub"
    }

    fn inputs(&self) -> &[TensorInfo] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorInfo] {
        &self.outputs
    }

    fn run(&self, _input: &str, output: &str, batch: &Tensor4D) -> BenchResult<Tensor2D> {
        let stub = self
            .stub_outputs
            .iter()
            .find(|o| o.info.name == output)
            .unwrap();
        let width = stub.width;
        let rows = batch.shape()[0];
        let per_image = batch.len() / rows;
        let means: Vec<f32> = batch
            .as_slice()
            .unwrap()
            .chunks(per_image)
            .map(|c| c.iter().sum::<f32>() / c.len() as f32)
            .collect();
        Ok(Array2::from_shape_fn((rows, width), |(r, c)| match stub.fill {
            Fill::ImageMean => (means[r] * (c + 1) as f32 / width as f32).clamp(-1.0, 1.0),
            Fill::Ramp => c as f32 / width as f32,
        }))
    }

    fn engine_info(&self) -> String {
        "stub engine".to_string()
    }
}

/// A scratch dataset of 2x2x3 uint8 images plus label file and results dir.
pub struct Fixture {
    pub root: tempfile::TempDir,
    pub image_names: Vec<String>,
}

impl Fixture {
    pub fn new(image_count: usize, labels: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        std::fs::create_dir_all(&images).unwrap();

        let image_names: Vec<String> = (0..image_count)
            .map(|i| format!("ILSVRC2012_val_{:08}.rgb8", i + 1))
            .collect();
        for (i, name) in image_names.iter().enumerate() {
            let bytes: Vec<u8> = (0..12).map(|j| ((i * 40 + j * 20) % 256) as u8).collect();
            std::fs::write(images.join(name), bytes).unwrap();
        }
        std::fs::write(images.join("val_map.txt"), image_names.join("\n")).unwrap();

        let label_lines: Vec<String> = (0..labels).map(|i| format!("class_{i}")).collect();
        std::fs::write(root.path().join("labels.txt"), label_lines.join("\n")).unwrap();

        Self { root, image_names }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn results_dir(&self) -> PathBuf {
        self.path().join("results")
    }

    pub fn report_path(&self) -> PathBuf {
        self.path().join("tmp-ck-timer.json")
    }

    pub fn config(&self, batch_size: usize, batch_count: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            model: ModelConfig {
                model_path: self.path().join("model.onnx"),
                input_name: None,
                output_name: None,
                data_layout: DataLayout::Nhwc,
                image_height: 2,
                image_width: 2,
                output_classes: None,
            },
            dataset: DatasetConfig {
                image_dir: self.path().join("images"),
                image_list: PathBuf::from("val_map.txt"),
                data_type: ImageDataType::Uint8,
                labels_path: self.path().join("labels.txt"),
            },
            normalization: NormalizationPolicy::from_flags(true, false, Vec::new()),
            batching: BatchConfig {
                batch_size,
                batch_count,
            },
            results_dir: self.results_dir(),
            report_path: self.report_path(),
            full_report: true,
            ort_session: OrtSessionConfig::default(),
        }
    }
}
