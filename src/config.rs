//! Engine configuration
//!
//! Settings are read from TOML. Every section is optional; anything left out
//! keeps the built-in default shown in [`DEFAULT_CONFIG`].

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::template::{Color, FontFace};

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Built-in configuration
pub const DEFAULT_CONFIG: &str = r#"
[fonts]
default_family = "Inter"
default_style = "Regular"

[fonts.aliases]

[images]
# Largest embedded payload accepted, in decoded bytes (32 MiB)
max_bytes = 33554432

[compositing]
grayscale_color = { r = 0.5, g = 0.5, b = 0.5 }

[export]
instructions = true
gap = 24.0
"#;

/// Font fallback settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub default_family: String,
    pub default_style: String,
    /// Family substitutions tried before the default face
    pub aliases: HashMap<String, String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            default_family: "Inter".to_string(),
            default_style: "Regular".to_string(),
            aliases: HashMap::new(),
        }
    }
}

impl FontConfig {
    pub fn default_face(&self) -> FontFace {
        FontFace::new(self.default_family.clone(), self.default_style.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub max_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: 32 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompositingConfig {
    /// Fill of the overlay stacked above grayscale photos
    pub grayscale_color: Color,
}

impl Default for CompositingConfig {
    fn default() -> Self {
        Self {
            grayscale_color: Color::rgb(0.5, 0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Place an instructions frame above the carousel
    pub instructions: bool,
    /// Vertical space between the instructions frame and the carousel
    pub gap: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            instructions: true,
            gap: 24.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fonts: FontConfig,
    pub images: ImageConfig,
    pub compositing: CompositingConfig,
    pub export: ExportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fonts: FontConfig::default(),
            images: ImageConfig::default(),
            compositing: CompositingConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.images.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "images.max_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.export.gap.is_finite() || self.export.gap < 0.0 {
            return Err(ConfigError::Invalid {
                key: "export.gap",
                reason: format!("expected a non-negative number, got {}", self.export.gap),
            });
        }
        if self.fonts.default_family.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "fonts.default_family",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Set the face used when no requested font loads
    pub fn with_default_font(mut self, family: impl Into<String>, style: impl Into<String>) -> Self {
        self.fonts.default_family = family.into();
        self.fonts.default_style = style.into();
        self
    }

    /// Substitute `family` with `replacement` during font fallback
    pub fn with_font_alias(mut self, family: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.fonts.aliases.insert(family.into(), replacement.into());
        self
    }

    pub fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.images.max_bytes = max_bytes;
        self
    }

    pub fn with_grayscale_color(mut self, color: Color) -> Self {
        self.compositing.grayscale_color = color;
        self
    }

    /// Enable or disable the export-instructions frame
    pub fn with_instructions(mut self, enabled: bool) -> Self {
        self.export.instructions = enabled;
        self
    }

    pub fn with_export_gap(mut self, gap: f64) -> Self {
        self.export.gap = gap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_matches_section_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fonts, FontConfig::default());
        assert_eq!(config.images, ImageConfig::default());
        assert_eq!(config.compositing, CompositingConfig::default());
        assert_eq!(config.export, ExportConfig::default());

        let parsed = EngineConfig::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(EngineConfig::from_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_str(
            r#"
[fonts.aliases]
"Helvetica Neue" = "Inter"

[export]
instructions = false
"#,
        )
        .unwrap();
        assert_eq!(
            config.fonts.aliases.get("Helvetica Neue").map(String::as_str),
            Some("Inter")
        );
        assert_eq!(config.fonts.default_face(), FontFace::new("Inter", "Regular"));
        assert!(!config.export.instructions);
        assert_eq!(config.export.gap, 24.0);
        assert_eq!(config.images.max_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_grayscale_color_table() {
        let config =
            EngineConfig::from_str("[compositing]\ngrayscale_color = { r = 0.2, g = 0.3, b = 0.4 }")
                .unwrap();
        assert_eq!(config.compositing.grayscale_color, Color::rgb(0.2, 0.3, 0.4));
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_str("[images]\nmax_bytes = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "images.max_bytes", .. }));

        let err = EngineConfig::from_str("[export]\ngap = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "export.gap", .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_str("[fonts\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_default_font("Roboto", "Medium")
            .with_font_alias("Arial", "Roboto")
            .with_max_image_bytes(1024)
            .with_instructions(false)
            .with_export_gap(10.0);
        assert_eq!(config.fonts.default_face(), FontFace::new("Roboto", "Medium"));
        assert_eq!(config.fonts.aliases["Arial"], "Roboto");
        assert_eq!(config.images.max_bytes, 1024);
        assert!(!config.export.instructions);
        assert_eq!(config.export.gap, 10.0);
    }
}
