//! Command-line entry point for the classification benchmark.
//!
//! Settings come from the `CK_*` environment variables, or from a JSON file
//! given with `--config`. Flags override either source.
//!
//! Usage:
//!   classify-bench [--config bench.json] [--batch-size 8] [--batch-count 10] [--device cuda:0]

use clap::Parser;
use onnx_classify_bench::core::config::{
    BenchmarkConfig, ConfigValidatorExt, OrtExecutionProvider, OrtGraphOptimizationLevel,
};
use onnx_classify_bench::core::{BenchError, BenchResult, OrtInfer};
use onnx_classify_bench::pipeline::BenchmarkDriver;
use onnx_classify_bench::utils;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "classify-bench")]
#[command(about = "Batched ONNX Runtime image-classification benchmark")]
struct Args {
    /// JSON configuration file; the CK_* environment is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Images per batch
    #[arg(short = 's', long)]
    batch_size: Option<usize>,

    /// Number of batches to run
    #[arg(short = 'n', long)]
    batch_count: Option<usize>,

    /// Directory for per-image result files (wiped at startup)
    #[arg(short, long)]
    results_dir: Option<PathBuf>,

    /// Path of the JSON timing report
    #[arg(long)]
    report: Option<PathBuf>,

    /// ONNX Runtime intra-op threads (0 keeps the runtime default)
    #[arg(short, long)]
    threads: Option<usize>,

    /// ONNX Runtime inter-op threads
    #[arg(long)]
    inter_threads: Option<usize>,

    /// Graph optimization level: disable, 1, 2, 3 or all
    #[arg(long)]
    graph_opt: Option<OrtGraphOptimizationLevel>,

    /// Device to run on: cpu, cuda, or cuda:N
    #[arg(short, long)]
    device: Option<String>,

    /// Only log every tenth batch
    #[arg(long)]
    silent: bool,
}

fn parse_device(device: &str) -> BenchResult<Vec<OrtExecutionProvider>> {
    let device = device.to_lowercase();
    let cuda_id = match device.as_str() {
        "cpu" => return Ok(vec![OrtExecutionProvider::CPU]),
        "cuda" => 0,
        other => match other.strip_prefix("cuda:") {
            Some(id) => id.parse::<i32>().map_err(|e| {
                BenchError::config_error_with_context("device", other, &e.to_string())
            })?,
            None => {
                return Err(BenchError::config_error_with_context(
                    "device",
                    other,
                    "expected cpu, cuda, or cuda:N",
                ));
            }
        },
    };

    if cfg!(feature = "cuda") {
        Ok(vec![
            OrtExecutionProvider::CUDA {
                device_id: Some(cuda_id),
            },
            OrtExecutionProvider::CPU,
        ])
    } else {
        warn!("CUDA requested but cuda feature not enabled. Falling back to CPU.");
        Ok(vec![OrtExecutionProvider::CPU])
    }
}

fn build_config(args: &Args) -> BenchResult<BenchmarkConfig> {
    let mut config = match &args.config {
        Some(path) => BenchmarkConfig::from_json_file(path)?,
        None => BenchmarkConfig::from_env()?,
    };

    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(batch_count) = args.batch_count {
        config = config.with_batch_count(batch_count);
    }
    if let Some(dir) = &args.results_dir {
        config = config.with_results_dir(dir);
    }
    if let Some(report) = &args.report {
        config = config.with_report_path(report);
    }
    if let Some(threads) = args.threads {
        config = config.with_cpu_threads(threads);
    }

    let mut session = std::mem::take(&mut config.ort_session);
    if let Some(inter) = args.inter_threads {
        session = session.with_inter_threads(inter);
    }
    if let Some(level) = args.graph_opt {
        session = session.with_optimization_level(level);
    }
    if let Some(device) = &args.device {
        session = session.with_execution_providers(parse_device(device)?);
    }
    config.ort_session = session;

    if args.silent {
        config = config.with_full_report(false);
    }

    config.validate_and_wrap()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    utils::init_tracing();
    let args = Args::parse();

    let config = build_config(&args).inspect_err(|e| error!("invalid configuration: {e}"))?;
    info!("Classification benchmark");

    let mut driver = BenchmarkDriver::new(&config);
    let report = driver
        .run(OrtInfer::from_config)
        .inspect_err(|e| error!("benchmark aborted: {e}"))?;

    info!(
        avg_time_ms = report.avg_time_ms,
        avg_fps = report.avg_fps,
        "done"
    );
    Ok(())
}
