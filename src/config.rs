use crate::error::{Result, SignatureError};
use crate::features::color::Rgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_STORAGE_KEY: &str = "pdfEditorSignatures";

/// Tunables for the capture surface, cropper, store and placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignatureConfig {
    pub surface_width: u32,
    pub surface_height: u32,
    pub line_width: f32,
    pub crop_padding: u32,
    pub max_placed_width: f64,
    pub max_saved: usize,
    pub storage_key: String,
    pub default_color: String,
    pub author: String,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            surface_width: 500,
            surface_height: 200,
            line_width: 2.0,
            crop_padding: 4,
            max_placed_width: 200.0,
            max_saved: 5,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_color: "#000000".to_string(),
            author: "User".to_string(),
        }
    }
}

impl SignatureConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: SignatureConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(SignatureError::Config("empty_surface".into()));
        }
        if !(self.line_width > 0.0) {
            return Err(SignatureError::Config("line_width".into()));
        }
        if !(self.max_placed_width > 0.0) {
            return Err(SignatureError::Config("max_placed_width".into()));
        }
        if self.max_saved == 0 {
            return Err(SignatureError::Config("max_saved".into()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(SignatureError::Config("storage_key".into()));
        }
        Rgb::parse(&self.default_color)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SignatureConfig::from_json_str(r#"{ "crop_padding": 8 }"#).unwrap();
        assert_eq!(config.crop_padding, 8);
        assert_eq!(config.max_saved, 5);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn rejects_zero_sized_surface() {
        let err = SignatureConfig::from_json_str(r#"{ "surface_width": 0 }"#).unwrap_err();
        assert!(matches!(err, SignatureError::Config(_)));
    }

    #[test]
    fn rejects_bad_default_color() {
        let err = SignatureConfig::from_json_str(r##"{ "default_color": "#12" }"##).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidColor(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_placed_width": 150.0, "author": "Ada" }}"#).unwrap();
        let config = SignatureConfig::load(file.path()).unwrap();
        assert_eq!(config.max_placed_width, 150.0);
        assert_eq!(config.author, "Ada");
    }
}
