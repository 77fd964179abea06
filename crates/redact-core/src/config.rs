//! Editor configuration
//!
//! Everything is optional in JSON; missing fields take the built-in
//! defaults, so `{}` is a valid configuration.

use crate::annotations::{RectangleStyle, TextStyle};
use crate::error::EditorError;
use crate::flatten::DEFAULT_EXPORT_FILE_NAME;
use crate::loader::PDF_MEDIA_TYPE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Media type a selected file must declare to be loaded
    pub accepted_media_type: String,
    /// Name of the downloaded file
    pub export_file_name: String,
    /// Defaults for new rectangles
    pub rectangle: RectangleStyle,
    /// Defaults for new text labels
    pub text: TextStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            accepted_media_type: PDF_MEDIA_TYPE.to_string(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            rectangle: RectangleStyle::default(),
            text: TextStyle::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EditorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.accepted_media_type.trim().is_empty() {
            return Err(EditorError::Config("accepted_media_type is empty".into()));
        }
        if self.export_file_name.trim().is_empty() {
            return Err(EditorError::Config("export_file_name is empty".into()));
        }
        if self.text.font_size <= 0.0 {
            return Err(EditorError::Config(format!(
                "text.font_size must be positive, got {}",
                self.text.font_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EditorConfig::from_json(
            r##"{ "export_file_name": "redacted.pdf", "text": { "fill": "#ff0000" } }"##,
        )
        .unwrap();
        assert_eq!(config.export_file_name, "redacted.pdf");
        assert_eq!(config.text.fill, Color::rgb(255, 0, 0));
        assert_eq!(config.text.font_size, 20.0);
        assert_eq!(config.rectangle, RectangleStyle::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EditorConfig::from_json("{ nope"),
            Err(EditorError::Config(_))
        ));
    }

    #[test]
    fn test_empty_file_name_rejected() {
        assert!(EditorConfig::from_json(r#"{ "export_file_name": "  " }"#).is_err());
    }
}
