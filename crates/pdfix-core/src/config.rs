//! Editor settings
//!
//! Every field has a default, so a partial TOML `[editor]` table (or none at
//! all) yields a usable configuration.

use serde::{Deserialize, Serialize};

use crate::undo::DEFAULT_UNDO_DEPTH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Logical display scale applied to page points (default: 1.8)
    #[serde(default = "default_base_scale")]
    pub base_scale: f64,
    /// Device pixel density multiplier (default: 1.0)
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
    /// Available viewport width in logical units; pages wider than this at
    /// `base_scale` are shrunk to fit (default: unlimited)
    #[serde(default)]
    pub viewport_width: Option<f64>,
    /// Lower bound for the shrunk logical scale (default: 1.0)
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    /// Scale used when rasterizing whole pages for export (default: 4.0)
    #[serde(default = "default_export_scale")]
    pub export_scale: f64,
    /// Snapshots kept per page (default: 30)
    #[serde(default = "default_max_undo")]
    pub max_undo: usize,
    /// Extra margin around redaction boxes, in display units (default: 8.0)
    #[serde(default = "default_redaction_pad")]
    pub redaction_pad: f64,
    /// Initial brush color (default: "#ff0000")
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    /// Initial brush width (default: 3.0)
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// Font size for newly placed text (default: 18.0)
    #[serde(default = "default_text_size")]
    pub text_size: f64,
}

fn default_base_scale() -> f64 {
    1.8
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

fn default_min_scale() -> f64 {
    1.0
}

fn default_export_scale() -> f64 {
    4.0
}

fn default_max_undo() -> usize {
    DEFAULT_UNDO_DEPTH
}

fn default_redaction_pad() -> f64 {
    8.0
}

fn default_stroke_color() -> String {
    "#ff0000".to_string()
}

fn default_stroke_width() -> f64 {
    3.0
}

fn default_text_size() -> f64 {
    18.0
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            base_scale: default_base_scale(),
            device_pixel_ratio: default_device_pixel_ratio(),
            viewport_width: None,
            min_scale: default_min_scale(),
            export_scale: default_export_scale(),
            max_undo: default_max_undo(),
            redaction_pad: default_redaction_pad(),
            stroke_color: default_stroke_color(),
            stroke_width: default_stroke_width(),
            text_size: default_text_size(),
        }
    }
}

impl EditorConfig {
    /// Reject settings that would make page geometry degenerate.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("base_scale", self.base_scale),
            ("device_pixel_ratio", self.device_pixel_ratio),
            ("min_scale", self.min_scale),
            ("export_scale", self.export_scale),
            ("text_size", self.text_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be a positive number, got {}", name, value));
            }
        }
        if let Some(width) = self.viewport_width {
            if !width.is_finite() || width <= 0.0 {
                return Err(format!("viewport_width must be positive, got {}", width));
            }
        }
        if self.max_undo == 0 {
            return Err("max_undo must be at least 1".to_string());
        }
        if self.redaction_pad < 0.0 || self.stroke_width < 0.0 {
            return Err("redaction_pad and stroke_width must not be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_constants() {
        let config = EditorConfig::default();
        assert_eq!(config.base_scale, 1.8);
        assert_eq!(config.export_scale, 4.0);
        assert_eq!(config.max_undo, 30);
        assert_eq!(config.redaction_pad, 8.0);
        assert_eq!(config.text_size, 18.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"device_pixel_ratio": 2.0}"#).unwrap();
        assert_eq!(config.device_pixel_ratio, 2.0);
        assert_eq!(config.base_scale, 1.8);
    }

    #[test]
    fn test_validate_rejects_zero_scale() {
        let config = EditorConfig {
            export_scale: 0.0,
            ..EditorConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("export_scale"));
    }

    #[test]
    fn test_validate_rejects_zero_undo() {
        let config = EditorConfig {
            max_undo: 0,
            ..EditorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
