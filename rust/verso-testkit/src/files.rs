//! Temporary files for tests that load models from disk.

use std::io::{Seek, SeekFrom, Write};

/// Writes `lines` to a new temporary file, one per line, and rewinds it.
pub fn temp_text_file<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

/// Writes a phrase table in text form, one `source ||| target ||| probabilities`
/// line per entry.
pub fn temp_phrase_table(
    entries: &[(&str, &str, &[f32])],
) -> anyhow::Result<tempfile::NamedTempFile> {
    let lines = entries
        .iter()
        .map(|(source, target, probabilities)| {
            let scores = probabilities
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            format!("{source} ||| {target} ||| {scores}")
        })
        .collect::<Vec<_>>();
    temp_text_file(lines.iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_phrase_table() {
        let file = temp_phrase_table(&[("a", "x", &[0.5, 1.0]), ("a b", "x y", &[0.25, 0.5])])
            .unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text, "a ||| x ||| 0.5 1\na b ||| x y ||| 0.25 0.5\n");
    }
}
