//! Editor configuration.
//!
//! Every field has a default, so hosts pass only what they override:
//! `{"historyDepth": 50}` is a complete config.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(String),

    #[error("min_zoom must be positive, got {0}")]
    NonPositiveMinZoom(f64),

    #[error("min_zoom ({min}) exceeds max_zoom ({max})")]
    ZoomRange { min: f64, max: f64 },

    #[error("zoom_step must be greater than 1, got {0}")]
    ZoomStep(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum undo depth.
    pub history_depth: usize,
    /// Multiplicative step for zoom in/out shortcuts.
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Distance in canvas units within which a click hits a connection.
    pub hit_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 200,
            zoom_step: 1.2,
            min_zoom: 0.1,
            max_zoom: 4.0,
            hit_tolerance: 6.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_zoom <= 0.0 {
            return Err(ConfigError::NonPositiveMinZoom(self.min_zoom));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigError::ZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if self.zoom_step <= 1.0 {
            return Err(ConfigError::ZoomStep(self.zoom_step));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = EditorConfig::from_json(r#"{"historyDepth": 50}"#).unwrap();
        assert_eq!(config.history_depth, 50);
        assert_eq!(config.max_zoom, 4.0);
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let err = EditorConfig::from_json(r#"{"minZoom": 5.0, "maxZoom": 2.0}"#).unwrap_err();
        assert_eq!(err, ConfigError::ZoomRange { min: 5.0, max: 2.0 });
    }

    #[test]
    fn rejects_shrinking_zoom_step() {
        assert!(matches!(
            EditorConfig::from_json(r#"{"zoomStep": 0.5}"#),
            Err(ConfigError::ZoomStep(_))
        ));
        assert!(matches!(
            EditorConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
