//! Check-config command implementation

use anyhow::{Context, Result};

use crate::commands::load_config;

pub fn run(path: String) -> Result<()> {
    println!("{}", render(&path)?);
    Ok(())
}

/// Loads and validates the configuration, returning it as pretty JSON with
/// every default spelled out.
pub fn render(path: &str) -> Result<String> {
    let config = load_config(Some(path))?;
    config
        .validate()
        .with_context(|| format!("Invalid decoder configuration {path}"))?;
    let text = serde_json::to_string_pretty(&config)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use verso_decoder::{DecoderConfig, SearchAlgorithm};
    use verso_testkit::files::temp_text_file;

    use super::*;

    #[test]
    fn test_render_fills_defaults() {
        let file = temp_text_file([r#"{"search": {"algorithm": "cube_pruning"}}"#]).unwrap();
        let text = render(file.path().to_str().unwrap()).unwrap();
        assert!(text.contains("\"stack_limit\": 100"));

        let config: DecoderConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config.search.algorithm, SearchAlgorithm::CubePruning);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_render_rejects_invalid() {
        let file = temp_text_file([r#"{"search": {"stack_limit": 0}}"#]).unwrap();
        let err = render(file.path().to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("stack_limit"));
    }
}
