//! Result files and the timing report on disk.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use super::stats::TimingReport;
use crate::core::errors::{BenchError, BenchResult};
use crate::processors::extractor::ClassificationResult;

/// Removes `dir` with everything in it, then creates it empty.
pub fn prepare_results_dir(dir: &Path) -> BenchResult<()> {
    if dir.exists() {
        debug!(path = %dir.display(), "removing previous results");
        fs::remove_dir_all(dir).map_err(|e| BenchError::io_error(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| BenchError::io_error(dir, e))
}

/// Writes one `<image name>.txt` file per image into the results directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the result file for `image_name`.
    pub fn result_path(&self, image_name: &str) -> PathBuf {
        self.dir.join(format!("{image_name}.txt"))
    }

    /// Writes the probabilities, one per line, and returns the file path.
    pub fn write(&self, image_name: &str, result: &ClassificationResult) -> BenchResult<PathBuf> {
        let path = self.result_path(image_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BenchError::io_error(parent, e))?;
        }

        let file = File::create(&path).map_err(|e| BenchError::io_error(&path, e))?;
        let mut writer = BufWriter::new(file);
        for p in &result.probabilities {
            writeln!(writer, "{p}").map_err(|e| BenchError::io_error(&path, e))?;
        }
        writer.flush().map_err(|e| BenchError::io_error(&path, e))?;
        Ok(path)
    }
}

/// Writes the report as JSON with sorted keys and four-space indentation.
pub fn write_report(path: &Path, report: &TimingReport) -> BenchResult<()> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    report.serialize(&mut ser)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| BenchError::io_error(parent, e))?;
    }
    fs::write(path, buf).map_err(|e| BenchError::io_error(path, e))
}
