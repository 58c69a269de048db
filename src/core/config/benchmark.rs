//! The benchmark configuration and its loaders.
//!
//! A [`BenchmarkConfig`] is built once at startup, either from the process
//! environment or from a JSON file, and then passed by reference through the
//! pipeline.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use crate::core::batch::{DataLayout, ImageDataType};
use crate::core::errors::{BenchError, BenchResult};
use crate::processors::normalization::NormalizationPolicy;

/// Environment variable names understood by [`BenchmarkConfig::from_env`].
pub mod env_keys {
    pub const MODEL_PATH: &str = "CK_ENV_ONNX_MODEL_ONNX_FILEPATH";
    pub const INPUT_NAME: &str = "CK_ENV_ONNX_MODEL_INPUT_LAYER_NAME";
    pub const OUTPUT_NAME: &str = "CK_ENV_ONNX_MODEL_OUTPUT_LAYER_NAME";
    pub const DATA_LAYOUT: &str = "ML_MODEL_DATA_LAYOUT";
    pub const IMAGE_HEIGHT: &str = "CK_ENV_ONNX_MODEL_IMAGE_HEIGHT";
    pub const IMAGE_WIDTH: &str = "CK_ENV_ONNX_MODEL_IMAGE_WIDTH";
    pub const OUTPUT_CLASSES: &str = "CK_ENV_ONNX_MODEL_OUTPUT_CLASSES";
    pub const LABELS_PATH: &str = "CK_CAFFE_IMAGENET_SYNSET_WORDS_TXT";
    pub const NORMALIZE_DATA: &str = "CK_ENV_ONNX_MODEL_NORMALIZE_DATA";
    pub const SUBTRACT_MEAN: &str = "CK_ENV_ONNX_MODEL_SUBTRACT_MEAN";
    pub const CHANNEL_MEANS: &str = "ML_MODEL_GIVEN_CHANNEL_MEANS";
    pub const IMAGE_DIR: &str = "CK_ENV_DATASET_IMAGENET_PREPROCESSED_DIR";
    pub const IMAGE_LIST: &str = "CK_ENV_DATASET_IMAGENET_PREPROCESSED_SUBSET_FOF";
    pub const DATA_TYPE: &str = "CK_ENV_DATASET_IMAGENET_PREPROCESSED_DATA_TYPE";
    pub const RESULTS_DIR: &str = "CK_RESULTS_DIR";
    pub const SILENT_MODE: &str = "CK_SILENT_MODE";
    pub const BATCH_SIZE: &str = "CK_BATCH_SIZE";
    pub const BATCH_COUNT: &str = "CK_BATCH_COUNT";
    pub const CPU_THREADS: &str = "CK_HOST_CPU_NUMBER_OF_PROCESSORS";
}

/// Default location of the timing report, relative to the working directory.
pub const DEFAULT_REPORT_PATH: &str = "tmp-ck-timer.json";

/// The model artifact and the shape of the tensor it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the `.onnx` file.
    pub model_path: PathBuf,
    /// Input to feed. The first declared input is used when unset.
    #[serde(default)]
    pub input_name: Option<String>,
    /// Output to read. The first declared output is used when unset.
    #[serde(default)]
    pub output_name: Option<String>,
    /// Axis order the model expects.
    #[serde(default)]
    pub data_layout: DataLayout,
    pub image_height: usize,
    pub image_width: usize,
    /// Class count to use when the model leaves its class dimension dynamic.
    #[serde(default)]
    pub output_classes: Option<usize>,
}

/// The pre-processed image set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding the raw image files.
    pub image_dir: PathBuf,
    /// Image list file, relative to `image_dir`.
    pub image_list: PathBuf,
    /// Element type of the stored images.
    #[serde(default)]
    pub data_type: ImageDataType,
    /// Label file, one label per line.
    pub labels_path: PathBuf,
}

impl DatasetConfig {
    /// Full path of the image list file.
    pub fn image_list_path(&self) -> PathBuf {
        self.image_dir.join(&self.image_list)
    }
}

/// Batch geometry of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_one")]
    pub batch_size: usize,
    #[serde(default = "default_one")]
    pub batch_count: usize,
}

fn default_one() -> usize {
    1
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            batch_count: 1,
        }
    }
}

impl BatchConfig {
    /// Number of images the run will process, or `None` if the product
    /// does not fit in `usize`.
    pub fn total_images(&self) -> Option<usize> {
        self.batch_size.checked_mul(self.batch_count)
    }
}

fn default_report_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_PATH)
}

fn default_full_report() -> bool {
    true
}

/// Complete, immutable configuration of one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub normalization: NormalizationPolicy,
    #[serde(default)]
    pub batching: BatchConfig,
    /// Directory receiving one result file per image. Wiped at startup.
    pub results_dir: PathBuf,
    /// Where the timing report is written.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    /// Log timings for every batch instead of every tenth batch header.
    #[serde(default = "default_full_report")]
    pub full_report: bool,
    /// ONNX Runtime session settings.
    #[serde(default)]
    pub ort_session: OrtSessionConfig,
}

/// Values accepted as "on" by boolean environment flags.
fn is_truthy(value: &str) -> bool {
    matches!(value, "YES" | "yes" | "ON" | "on" | "1")
}

/// Values accepted as "off" by the silent-mode flag.
fn is_falsy(value: &str) -> bool {
    matches!(value, "NO" | "no" | "OFF" | "off" | "0")
}

impl BenchmarkConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup using the environment
    /// variable names in [`env_keys`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ConfigError::MissingSetting {
                key: key.to_string(),
            })
        };
        let optional_name = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| lookup(key).is_some_and(|v| is_truthy(&v));

        let model = ModelConfig {
            model_path: PathBuf::from(required(env_keys::MODEL_PATH)?),
            input_name: optional_name(env_keys::INPUT_NAME),
            output_name: optional_name(env_keys::OUTPUT_NAME),
            data_layout: DataLayout::from_str(&required(env_keys::DATA_LAYOUT)?)?,
            image_height: parse_usize(env_keys::IMAGE_HEIGHT, &required(env_keys::IMAGE_HEIGHT)?)?,
            image_width: parse_usize(env_keys::IMAGE_WIDTH, &required(env_keys::IMAGE_WIDTH)?)?,
            output_classes: optional_name(env_keys::OUTPUT_CLASSES)
                .map(|v| parse_usize(env_keys::OUTPUT_CLASSES, &v))
                .transpose()?,
        };

        let dataset = DatasetConfig {
            image_dir: PathBuf::from(required(env_keys::IMAGE_DIR)?),
            image_list: PathBuf::from(required(env_keys::IMAGE_LIST)?),
            data_type: match lookup(env_keys::DATA_TYPE) {
                Some(v) => ImageDataType::from_str(&v)?,
                None => ImageDataType::default(),
            },
            labels_path: PathBuf::from(required(env_keys::LABELS_PATH)?),
        };

        let channel_means = parse_means(&lookup(env_keys::CHANNEL_MEANS).unwrap_or_default())?;
        let normalization = NormalizationPolicy::from_flags(
            flag(env_keys::NORMALIZE_DATA),
            flag(env_keys::SUBTRACT_MEAN),
            channel_means,
        );

        let batching = BatchConfig {
            batch_size: lookup(env_keys::BATCH_SIZE)
                .map(|v| parse_usize(env_keys::BATCH_SIZE, &v))
                .transpose()?
                .unwrap_or(1),
            batch_count: lookup(env_keys::BATCH_COUNT)
                .map(|v| parse_usize(env_keys::BATCH_COUNT, &v))
                .transpose()?
                .unwrap_or(1),
        };

        let cpu_threads = lookup(env_keys::CPU_THREADS)
            .map(|v| parse_usize(env_keys::CPU_THREADS, &v))
            .transpose()?
            .unwrap_or(0);

        let silent_mode = lookup(env_keys::SILENT_MODE).unwrap_or_else(|| "0".to_string());

        Ok(Self {
            model,
            dataset,
            normalization,
            batching,
            results_dir: PathBuf::from(required(env_keys::RESULTS_DIR)?),
            report_path: default_report_path(),
            full_report: is_falsy(&silent_mode),
            ort_session: OrtSessionConfig::new().with_cpu_threads(cpu_threads),
        })
    }

    /// Loads the configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BenchError::io_error(path, e))?;
        let config = serde_json::from_str(&text).map_err(|e| {
            BenchError::config_error(format!("failed to parse '{}': {e}", path.display()))
        })?;
        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batching.batch_size = batch_size;
        self
    }

    pub fn with_batch_count(mut self, batch_count: usize) -> Self {
        self.batching.batch_count = batch_count;
        self
    }

    pub fn with_results_dir(mut self, results_dir: impl Into<PathBuf>) -> Self {
        self.results_dir = results_dir.into();
        self
    }

    pub fn with_report_path(mut self, report_path: impl Into<PathBuf>) -> Self {
        self.report_path = report_path.into();
        self
    }

    pub fn with_full_report(mut self, full_report: bool) -> Self {
        self.full_report = full_report;
        self
    }

    /// Sizes the ONNX Runtime intra-op pool. Zero keeps the runtime default.
    pub fn with_cpu_threads(mut self, threads: usize) -> Self {
        self.ort_session = self.ort_session.with_cpu_threads(threads);
        self
    }
}

impl ConfigValidator for BenchmarkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size(self.batching.batch_size)?;
        self.validate_batch_count(self.batching.batch_count)?;
        if self.batching.total_images().is_none() {
            return Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "{} batches of {} images overflow the image count",
                    self.batching.batch_count, self.batching.batch_size
                ),
            });
        }
        self.validate_image_dimensions(self.model.image_height, self.model.image_width)?;
        self.normalization.validate()?;

        if self.model.output_classes == Some(0) {
            return Err(ConfigError::invalid_value(
                "output_classes",
                "0",
                "must be greater than 0",
            ));
        }
        if let Some(threads) = self.ort_session.intra_threads {
            self.validate_thread_count(threads)?;
        }
        if let Some(threads) = self.ort_session.inter_threads {
            self.validate_thread_count(threads)?;
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::invalid_value(key, value, e.to_string()))
}

/// Parses a whitespace-separated list of channel means. Empty input yields no means.
fn parse_means(value: &str) -> Result<Vec<f32>, ConfigError> {
    value
        .split_whitespace()
        .map(|token| {
            token.parse::<f32>().map_err(|e| {
                ConfigError::invalid_value(env_keys::CHANNEL_MEANS, token, e.to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::normalization::MeanSubtraction;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (env_keys::MODEL_PATH, "/models/resnet50.onnx"),
            (env_keys::INPUT_NAME, ""),
            (env_keys::OUTPUT_NAME, "softmax_tensor:0"),
            (env_keys::DATA_LAYOUT, "NCHW"),
            (env_keys::IMAGE_HEIGHT, "224"),
            (env_keys::IMAGE_WIDTH, "224"),
            (env_keys::LABELS_PATH, "/data/synset_words.txt"),
            (env_keys::IMAGE_DIR, "/data/preprocessed"),
            (env_keys::IMAGE_LIST, "image_list.txt"),
            (env_keys::RESULTS_DIR, "/tmp/results"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<BenchmarkConfig, ConfigError> {
        BenchmarkConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn env_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.model.input_name, None);
        assert_eq!(config.model.output_name.as_deref(), Some("softmax_tensor:0"));
        assert_eq!(config.model.data_layout, DataLayout::Nchw);
        assert_eq!(config.dataset.data_type, ImageDataType::Uint8);
        assert_eq!(
            config.dataset.image_list_path(),
            PathBuf::from("/data/preprocessed/image_list.txt")
        );
        assert_eq!(config.batching, BatchConfig::default());
        assert!(config.normalization.is_identity());
        assert!(config.full_report);
        assert_eq!(config.report_path, PathBuf::from(DEFAULT_REPORT_PATH));
        assert_eq!(config.ort_session, OrtSessionConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_flags_and_numbers() {
        let mut env = base_env();
        env.insert(env_keys::NORMALIZE_DATA, "YES");
        env.insert(env_keys::SUBTRACT_MEAN, "on");
        env.insert(env_keys::CHANNEL_MEANS, "123.68 116.78 103.94");
        env.insert(env_keys::BATCH_SIZE, "8");
        env.insert(env_keys::BATCH_COUNT, "5");
        env.insert(env_keys::CPU_THREADS, "4");
        env.insert(env_keys::SILENT_MODE, "YES");
        env.insert(env_keys::DATA_TYPE, "float32");

        let config = load(&env).unwrap();
        assert!(config.normalization.normalize);
        assert_eq!(
            config.normalization.subtract_mean,
            MeanSubtraction::PerChannel(vec![123.68, 116.78, 103.94])
        );
        assert_eq!(config.batching.total_images(), Some(40));
        assert_eq!(config.ort_session.intra_threads, Some(4));
        assert_eq!(config.ort_session.parallel_execution, Some(true));
        assert!(!config.full_report);
        assert_eq!(config.dataset.data_type, ImageDataType::Float32);
    }

    #[test]
    fn subtract_mean_without_vector_uses_per_image_mean() {
        let mut env = base_env();
        env.insert(env_keys::SUBTRACT_MEAN, "1");
        let config = load(&env).unwrap();
        assert_eq!(config.normalization.subtract_mean, MeanSubtraction::PerImage);
        assert!(!config.normalization.normalize);
    }

    #[test]
    fn unrecognized_flag_values_are_off() {
        let mut env = base_env();
        env.insert(env_keys::NORMALIZE_DATA, "true");
        env.insert(env_keys::SILENT_MODE, "maybe");
        let config = load(&env).unwrap();
        assert!(!config.normalization.normalize);
        assert!(!config.full_report);
    }

    #[test]
    fn missing_required_setting() {
        let mut env = base_env();
        env.remove(env_keys::LABELS_PATH);
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting { key } if key == env_keys::LABELS_PATH));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut env = base_env();
        env.insert(env_keys::BATCH_SIZE, "eight");
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));

        let mut env = base_env();
        env.insert(env_keys::DATA_LAYOUT, "CHWN");
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));

        let mut env = base_env();
        env.insert(env_keys::CHANNEL_MEANS, "1.0 abc");
        assert!(matches!(load(&env), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn validation_catches_bad_geometry() {
        let config = load(&base_env()).unwrap();
        assert!(matches!(
            config.clone().with_batch_size(0).validate(),
            Err(ConfigError::InvalidBatchSize)
        ));
        assert!(matches!(
            config.clone().with_batch_count(0).validate(),
            Err(ConfigError::InvalidBatchCount)
        ));

        let mut config = config;
        config.normalization =
            NormalizationPolicy::new(true, MeanSubtraction::PerChannel(vec![1.0, 2.0]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn overflowing_image_count_is_rejected() {
        let config = load(&base_env())
            .unwrap()
            .with_batch_size(usize::MAX / 2 + 1)
            .with_batch_count(2);
        assert_eq!(config.batching.total_images(), None);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ResourceLimitExceeded { .. })
        ));
    }

    #[test]
    fn json_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.json");
        std::fs::write(
            &path,
            r#"{
                "model": {"model_path": "m.onnx", "image_height": 2, "image_width": 2},
                "dataset": {"image_dir": "imgs", "image_list": "list.txt", "labels_path": "labels.txt"},
                "normalization": {"normalize": true, "subtract_mean": {"mode": "per_image"}},
                "results_dir": "out"
            }"#,
        )
        .unwrap();

        let config = BenchmarkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.model.data_layout, DataLayout::Nhwc);
        assert_eq!(config.batching, BatchConfig::default());
        assert_eq!(config.normalization.subtract_mean, MeanSubtraction::PerImage);
        assert!(config.full_report);
        assert_eq!(config.report_path, PathBuf::from(DEFAULT_REPORT_PATH));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(BenchmarkConfig::from_json_file(&path).unwrap_err().is_config());
        assert!(
            BenchmarkConfig::from_json_file(dir.path().join("absent.json"))
                .unwrap_err()
                .is_io()
        );
    }
}
