//! Common utilities for verso-cmd

use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use verso_decoder::Translation;

/// Checks if a file exists and is readable
pub fn validate_file_exists(path: &str) -> Result<()> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a file: {}", path);
    }
    Ok(())
}

/// Formats one n-best entry as `id ||| text ||| Name= s1 s2 Other= s3 ||| score`.
pub fn format_nbest_line(id: usize, translation: &Translation) -> String {
    let mut features = String::new();
    for feature in &translation.features {
        if !features.is_empty() {
            features.push(' ');
        }
        let _ = write!(features, "{}=", feature.name);
        for score in &feature.scores {
            let _ = write!(features, " {score}");
        }
    }
    format!(
        "{id} ||| {} ||| {features} ||| {}",
        translation.text(),
        translation.score
    )
}
