//! Readers for the image list and the label file.

use std::path::Path;

use crate::core::errors::{BenchError, BenchResult};

fn read_text(path: &Path) -> BenchResult<String> {
    std::fs::read_to_string(path).map_err(|e| BenchError::io_error(path, e))
}

/// Reads the ordered list of image file names, one per line.
///
/// Surrounding whitespace is trimmed and blank lines are skipped.
pub fn read_image_list(path: &Path) -> BenchResult<Vec<String>> {
    Ok(read_text(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Reads the label file. Every line is one label, so the result length is the
/// label count used to derive the background offset.
pub fn load_labels(path: &Path) -> BenchResult<Vec<String>> {
    Ok(read_text(path)?
        .lines()
        .map(|line| line.trim().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "a.rgb8\n  b.rgb8 \n\nc.rgb8\n").unwrap();
        assert_eq!(read_image_list(&path).unwrap(), vec!["a.rgb8", "b.rgb8", "c.rgb8"]);
    }

    #[test]
    fn labels_count_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synset_words.txt");
        std::fs::write(&path, "n01440764 tench\nn01443537 goldfish\n").unwrap();
        let labels = load_labels(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1], "n01443537 goldfish");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_labels(&dir.path().join("absent.txt")).unwrap_err().is_io());
    }
}
