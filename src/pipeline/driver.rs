//! The benchmark run: setup, the sequential batch loop and the final report.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::results::{ResultWriter, prepare_results_dir, write_report};
use super::stats::{Stage, TimingAccumulator, TimingReport};
use crate::core::config::{BenchmarkConfig, ConfigValidator};
use crate::core::errors::{BenchError, BenchResult, ProcessingStage};
use crate::core::inference::{InferenceEngine, InferenceInvoker};
use crate::processors::assembler::TensorAssembler;
use crate::processors::extractor::{BackgroundOffset, ResultExtractor};
use crate::utils::{load_labels, read_image_list};

/// Where a driver is in its run. A driver runs once and ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Setup,
    /// Processing batch `batch` (1-based).
    Running { batch: usize },
    Reporting,
    Done,
}

/// Everything SETUP resolves for the batch loop.
struct Prepared<E> {
    total_images: usize,
    image_list: Vec<String>,
    invoker: InferenceInvoker<E>,
    extractor: ResultExtractor,
    writer: ResultWriter,
}

/// Runs one benchmark over a borrowed configuration.
#[derive(Debug)]
pub struct BenchmarkDriver<'a> {
    config: &'a BenchmarkConfig,
    state: DriverState,
    timings: TimingAccumulator,
}

impl<'a> BenchmarkDriver<'a> {
    pub fn new(config: &'a BenchmarkConfig) -> Self {
        Self {
            config,
            state: DriverState::Setup,
            timings: TimingAccumulator::new(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn timings(&self) -> &TimingAccumulator {
        &self.timings
    }

    /// Runs setup, every batch and the report.
    ///
    /// `load_engine` is called once during setup, after the results directory
    /// has been reset. Any error aborts the run; result files already written
    /// stay on disk.
    pub fn run<E, F>(&mut self, load_engine: F) -> BenchResult<TimingReport>
    where
        E: InferenceEngine,
        F: FnOnce(&BenchmarkConfig) -> BenchResult<E>,
    {
        if self.state != DriverState::Setup {
            return Err(BenchError::config_error(format!(
                "benchmark driver cannot start from state {:?}",
                self.state
            )));
        }

        let setup_start = Instant::now();
        let prepared = self.setup(load_engine)?;
        self.timings.set_setup_time(setup_start.elapsed());

        let test_start = Instant::now();
        self.run_batches(&prepared)?;
        self.timings.set_test_time(test_start.elapsed());

        self.state = DriverState::Reporting;
        let batching = self.config.batching;
        let report = self.timings.summarize(
            prepared.total_images,
            batching.batch_size,
            batching.batch_count,
        );
        write_report(&self.config.report_path, &report).map_err(|e| {
            BenchError::processing_error(
                ProcessingStage::Persistence,
                &format!("report '{}'", self.config.report_path.display()),
                e,
            )
        })?;
        info!(path = %self.config.report_path.display(), "timing report written");
        info!("\n{report}");

        self.state = DriverState::Done;
        Ok(report)
    }

    fn setup<E, F>(&self, load_engine: F) -> BenchResult<Prepared<E>>
    where
        E: InferenceEngine,
        F: FnOnce(&BenchmarkConfig) -> BenchResult<E>,
    {
        let config = self.config;
        config.validate()?;

        let image_list = read_image_list(&config.dataset.image_list_path())?;
        let needed = config.batching.total_images().ok_or_else(|| {
            BenchError::config_error(format!(
                "{} batches of {} images overflow the image count",
                config.batching.batch_count, config.batching.batch_size
            ))
        })?;
        if image_list.len() < needed {
            return Err(BenchError::config_error(format!(
                "image list '{}' has {} entries, {} batches of {} need {}",
                config.dataset.image_list_path().display(),
                image_list.len(),
                config.batching.batch_count,
                config.batching.batch_size,
                needed
            )));
        }

        prepare_results_dir(&config.results_dir)?;

        let engine = load_engine(config)?;
        info!(engine = %engine.engine_info(), "model loaded");
        let invoker = InferenceInvoker::bind(
            engine,
            config.model.input_name.as_deref(),
            config.model.output_name.as_deref(),
        )?;

        let model_classes = match (invoker.output_classes(), config.model.output_classes) {
            (Some(declared), Some(configured)) if declared != configured => {
                warn!(
                    declared,
                    configured, "configured class count differs from the model, using the model's"
                );
                declared
            }
            (Some(declared), _) => declared,
            (None, Some(configured)) => configured,
            (None, None) => {
                return Err(BenchError::config_error(format!(
                    "output '{}' has a dynamic class dimension and no output_classes is configured",
                    invoker.output().name
                )));
            }
        };

        let labels = load_labels(&config.dataset.labels_path)?;
        let offset = BackgroundOffset::compute(model_classes, labels.len())?;

        if let Some(shape) = invoker.input().shape.as_deref() {
            if let Some((h, w)) = config.model.data_layout.spatial_dims(shape) {
                if (h, w) != (config.model.image_height, config.model.image_width) {
                    warn!(
                        model_height = h,
                        model_width = w,
                        image_height = config.model.image_height,
                        image_width = config.model.image_width,
                        "model input size differs from the configured image size"
                    );
                }
            }
        }

        self.log_banner(&invoker, model_classes, labels.len(), offset);

        Ok(Prepared {
            total_images: needed,
            image_list,
            invoker,
            extractor: ResultExtractor::new(offset),
            writer: ResultWriter::new(&config.results_dir),
        })
    }

    fn log_banner<E: InferenceEngine>(
        &self,
        invoker: &InferenceInvoker<E>,
        model_classes: usize,
        label_count: usize,
        offset: BackgroundOffset,
    ) {
        let config = self.config;
        info!(path = %config.model.model_path.display(), "model");
        info!(
            layout = %config.model.data_layout,
            height = config.model.image_height,
            width = config.model.image_width,
            data_type = %config.dataset.data_type,
            "images"
        );
        info!(
            normalize = config.normalization.normalize,
            subtract_mean = ?config.normalization.subtract_mean,
            "normalization"
        );
        info!(
            batch_size = config.batching.batch_size,
            batch_count = config.batching.batch_count,
            results_dir = %config.results_dir.display(),
            "batching"
        );
        info!(
            optimization = ?config.ort_session.get_optimization_level(),
            providers = ?config.ort_session.get_execution_providers(),
            intra_threads = ?config.ort_session.intra_threads,
            "session"
        );
        info!(
            input = %invoker.input().name,
            input_shape = ?invoker.input().shape,
            output = %invoker.output().name,
            output_shape = ?invoker.output().shape,
            "model I/O"
        );
        info!(
            expected_input_shape = ?config.model.data_layout.batch_shape(
                config.batching.batch_size,
                config.model.image_height,
                config.model.image_width,
            ),
            "feeding tensors"
        );
        info!(
            model_classes,
            label_count,
            background_offset = offset.get(),
            "classes"
        );
    }

    fn run_batches<E: InferenceEngine>(&mut self, prepared: &Prepared<E>) -> BenchResult<()> {
        let config = self.config;
        let batch_size = config.batching.batch_size;
        let batch_count = config.batching.batch_count;
        let assembler = TensorAssembler::from_config(config);

        let mut index = 0;
        for batch_index in 0..batch_count {
            let batch = batch_index + 1;
            self.state = DriverState::Running { batch };
            if config.full_report || batch % 10 == 0 {
                info!("Batch {} of {}", batch, batch_count);
            }

            let load_start = Instant::now();
            let (tensor, next_index) = assembler
                .assemble(&prepared.image_list, index, batch_size)
                .map_err(|e| {
                    BenchError::processing_error(
                        ProcessingStage::Load,
                        &format!("batch {batch}"),
                        e,
                    )
                })?;
            let load_time = load_start.elapsed();
            self.timings.record(Stage::Load, load_time, batch_index);

            let infer_start = Instant::now();
            let output = prepared.invoker.infer(&tensor).map_err(|e| {
                BenchError::processing_error(
                    ProcessingStage::Inference,
                    &format!("batch {batch}"),
                    e,
                )
            })?;
            let infer_time = infer_start.elapsed();
            self.timings.record(Stage::Infer, infer_time, batch_index);

            if config.full_report {
                info!(
                    load_s = load_time.as_secs_f64(),
                    infer_s = infer_time.as_secs_f64(),
                    "batch {} timings",
                    batch
                );
            } else {
                debug!(
                    load_s = load_time.as_secs_f64(),
                    infer_s = infer_time.as_secs_f64(),
                    "batch {} timings",
                    batch
                );
            }

            for (row, name) in prepared.image_list[index..next_index].iter().enumerate() {
                let result = prepared.extractor.extract(&output, row).map_err(|e| {
                    BenchError::processing_error(
                        ProcessingStage::Extraction,
                        &format!("result for image '{name}'"),
                        e,
                    )
                })?;
                prepared.writer.write(name, &result).map_err(|e| {
                    BenchError::processing_error(
                        ProcessingStage::Persistence,
                        &format!("result for image '{name}'"),
                        e,
                    )
                })?;
            }
            index = next_index;
        }
        Ok(())
    }
}
