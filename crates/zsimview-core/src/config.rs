//! Viewer configuration: recognized-options tables and display settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// Largest float precision accepted (f64 has ~17 significant digits).
pub const MAX_PRECISION: usize = 17;

/// Settings shared by the normalizer, materializer and renderer.
///
/// Every field has a default so a partial JSON file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Digits after the decimal point for float cells.
    pub precision: usize,
    /// Names recognized as the snapshot phase number, tried in order.
    pub phase_keys: Vec<String>,
    /// Names recognized as the snapshot timestamp, tried in order.
    pub time_keys: Vec<String>,
    /// Prepend a SUM row to array-of-compound grids.
    pub sum_row: bool,
    /// Array-of-compound leaves with more rows than this wait for an explicit load.
    pub eager_row_limit: usize,
    /// Top-level dataset holding one packed snapshot per element.
    pub packed_dataset: String,
    /// Compound field of each packed element that holds the modules.
    pub packed_root_field: String,
    /// Passed through to the renderer only.
    pub light_theme: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            phase_keys: vec!["phase".to_string()],
            time_keys: vec!["time".to_string(), "timestamp".to_string()],
            sum_row: false,
            eager_row_limit: 100_000,
            packed_dataset: "stats".to_string(),
            packed_root_field: "root".to_string(),
            light_theme: false,
        }
    }
}

impl ViewerConfig {
    /// Loads a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ViewerError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ViewerError::NotFound(path.to_path_buf())
            } else {
                ViewerError::Config(format!("{}: {}", path.display(), e))
            }
        })?;
        let config: ViewerConfig = serde_json::from_str(&text)
            .map_err(|e| ViewerError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and that the recognized-name tables are usable.
    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.precision > MAX_PRECISION {
            return Err(ViewerError::Config(format!(
                "precision {} exceeds maximum {}",
                self.precision, MAX_PRECISION
            )));
        }
        if self.phase_keys.iter().all(|k| k.is_empty()) {
            return Err(ViewerError::Config("phase_keys is empty".to_string()));
        }
        if self.time_keys.iter().all(|k| k.is_empty()) {
            return Err(ViewerError::Config("time_keys is empty".to_string()));
        }
        Ok(())
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_sum_row(mut self, sum_row: bool) -> Self {
        self.sum_row = sum_row;
        self
    }

    pub fn with_eager_row_limit(mut self, limit: usize) -> Self {
        self.eager_row_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.precision, 3);
        assert_eq!(config.phase_keys, vec!["phase"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"precision": 1, "sum_row": true}"#).unwrap();
        assert_eq!(config.precision, 1);
        assert!(config.sum_row);
        assert_eq!(config.time_keys, vec!["time", "timestamp"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ViewerConfig::default().with_precision(40);
        assert!(matches!(config.validate(), Err(ViewerError::Config(_))));

        let config = ViewerConfig {
            phase_keys: vec![],
            ..ViewerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"phase_keys": ["ph"], "light_theme": true}}"#).unwrap();
        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.phase_keys, vec!["ph"]);
        assert!(config.light_theme);

        let missing = ViewerConfig::from_file(Path::new("/nonexistent/zsimview.json"));
        assert!(matches!(missing, Err(ViewerError::NotFound(_))));
    }
}
