//! YAML parsing with error handling

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while reading or parsing YAML content
#[derive(Debug, Error)]
pub enum YamlError {
    #[error("YAML syntax error in {filename}: {message}")]
    Syntax { filename: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse YAML content into a typed value with the source filename attached
pub fn parse_yaml<T: DeserializeOwned + 'static>(content: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(content).map_err(|e| YamlError::Syntax {
        filename: filename.to_string(),
        message: e.to_string(),
    })
}

/// Parse YAML from a file path
pub fn parse_yaml_file<T: DeserializeOwned + 'static>(path: &std::path::Path) -> Result<T, YamlError> {
    let content = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    parse_yaml(&content, &filename)
}
