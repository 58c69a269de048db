//! Per-stage timing collection and the summary report.
//!
//! The [`TimingAccumulator`] keeps an append-only log of load and inference
//! durations. [`TimingAccumulator::summarize`] turns it into a
//! [`TimingReport`], excluding the first inference batch from the average
//! when more than one batch ran.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Timed stage of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading and assembling the batch tensor.
    Load,
    /// Running the inference engine on the batch.
    Infer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Infer => write!(f, "infer"),
        }
    }
}

/// One measured duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub stage: Stage,
    pub duration: Duration,
    pub batch_index: usize,
}

/// Collects timings for a run.
#[derive(Debug, Clone, Default)]
pub struct TimingAccumulator {
    samples: Vec<TimingSample>,
    total_load: Duration,
    total_infer: Duration,
    first_infer: Option<Duration>,
    setup_time: Duration,
    test_time: Duration,
}

impl TimingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and updates the stage total.
    ///
    /// The first inference sample recorded is retained separately for
    /// cold-start exclusion.
    pub fn record(&mut self, stage: Stage, duration: Duration, batch_index: usize) {
        match stage {
            Stage::Load => self.total_load += duration,
            Stage::Infer => {
                self.total_infer += duration;
                if self.first_infer.is_none() {
                    self.first_infer = Some(duration);
                }
            }
        }
        self.samples.push(TimingSample {
            stage,
            duration,
            batch_index,
        });
    }

    /// Records the wall-clock time spent before the first batch.
    pub fn set_setup_time(&mut self, duration: Duration) {
        self.setup_time = duration;
    }

    /// Records the wall-clock time of the whole batch loop.
    pub fn set_test_time(&mut self, duration: Duration) {
        self.test_time = duration;
    }

    pub fn samples(&self) -> &[TimingSample] {
        &self.samples
    }

    /// Sum of all recorded durations for `stage`.
    pub fn total(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Load => self.total_load,
            Stage::Infer => self.total_infer,
        }
    }

    /// Duration of the first inference batch, if any ran.
    pub fn first_inference(&self) -> Option<Duration> {
        self.first_infer
    }

    /// Computes the report for a run of `batch_count` batches of `batch_size`.
    ///
    /// With more than one batch the first inference batch is removed from both
    /// the total and the image count. When that would leave no images the
    /// plain average over all images is used instead.
    pub fn summarize(
        &self,
        total_images: usize,
        batch_size: usize,
        batch_count: usize,
    ) -> TimingReport {
        let total_load = self.total_load.as_secs_f64();
        let total_infer = self.total_infer.as_secs_f64();
        let first_infer = self.first_infer.unwrap_or_default().as_secs_f64();

        let remaining = total_images.saturating_sub(batch_size);
        let avg_infer = if batch_count > 1 && remaining > 0 {
            (total_infer - first_infer) / remaining as f64
        } else {
            if batch_count > 1 {
                warn!(
                    total_images,
                    batch_size,
                    "no images remain after excluding the first batch, averaging over all images"
                );
            }
            total_infer / total_images as f64
        };
        let avg_load = total_load / total_images as f64;

        let avg_time_ms = avg_infer * 1000.0;
        TimingReport {
            avg_fps: 1.0 / avg_infer,
            avg_time_ms,
            batch_size,
            batch_time_ms: avg_time_ms * batch_size as f64,
            images_load_time_avg_s: avg_load,
            images_load_time_total_s: total_load,
            prediction_time_avg_s: avg_infer,
            prediction_time_total_s: total_infer,
            setup_time_s: self.setup_time.as_secs_f64(),
            test_time_s: self.test_time.as_secs_f64(),
        }
    }
}

/// Summary timing statistics of a run.
///
/// Fields are declared in key order so the serialized report has sorted keys.
/// Non-finite values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingReport {
    pub avg_fps: f64,
    pub avg_time_ms: f64,
    pub batch_size: usize,
    pub batch_time_ms: f64,
    pub images_load_time_avg_s: f64,
    pub images_load_time_total_s: f64,
    pub prediction_time_avg_s: f64,
    pub prediction_time_total_s: f64,
    pub setup_time_s: f64,
    pub test_time_s: f64,
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Benchmark Summary:")?;
        writeln!(f, "  Setup time: {:.3} s", self.setup_time_s)?;
        writeln!(f, "  Test time: {:.3} s", self.test_time_s)?;
        writeln!(
            f,
            "  Image load time: {:.3} s total, {:.6} s per image",
            self.images_load_time_total_s, self.images_load_time_avg_s
        )?;
        writeln!(
            f,
            "  Prediction time: {:.3} s total, {:.6} s per image",
            self.prediction_time_total_s, self.prediction_time_avg_s
        )?;
        writeln!(f, "  Average: {:.3} ms/image, {:.2} FPS", self.avg_time_ms, self.avg_fps)?;
        write!(
            f,
            "  Batch of {}: {:.3} ms",
            self.batch_size, self.batch_time_ms
        )
    }
}
