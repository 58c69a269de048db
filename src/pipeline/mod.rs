//! The benchmark pipeline.
//!
//! [`BenchmarkDriver`] runs SETUP, the batch loop and REPORTING. Timings are
//! kept in [`stats`] and files are written through [`results`].

pub mod driver;
pub mod results;
pub mod stats;

pub use driver::{BenchmarkDriver, DriverState};
pub use results::{ResultWriter, prepare_results_dir, write_report};
pub use stats::{Stage, TimingAccumulator, TimingReport, TimingSample};
