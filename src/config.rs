use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::glm;

/// Settings for a single rendering context and the window that owns
/// it. Every field has a default so partial JSON documents are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// (major, minor) version of the requested OpenGL context.
    pub gl_version: (u32, u32),
    pub core_profile: bool,
    /// Enable SRC_ALPHA/ONE_MINUS_SRC_ALPHA blending on the new context.
    pub enable_blend: bool,
    pub vsync: bool,
    pub clear_color: glm::Vec4,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            title: "window".to_string(),
            width: 640,
            height: 640,
            gl_version: (3, 3),
            core_profile: true,
            enable_blend: true,
            vsync: true,
            clear_color: glm::vec4(0.8, 0.8, 0.8, 1.0),
        }
    }
}

impl ContextConfig {
    pub fn new(title: &str, width: u32, height: u32) -> Self {
        Self {
            title: title.to_string(),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_config_partial_json() {
        let config = ContextConfig::from_json_str(r#"{"title": "Demo", "width": 800}"#).unwrap();

        assert_eq!(config.title, "Demo");
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 640);
        assert_eq!(config.gl_version, (3, 3));
        assert!(config.core_profile);
        assert!(config.enable_blend);
    }

    #[test]
    fn context_config_json_round_trip() {
        let config = ContextConfig {
            vsync: false,
            gl_version: (4, 1),
            ..ContextConfig::new("round trip", 320, 240)
        };
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(ContextConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn context_config_invalid_json() {
        assert!(matches!(
            ContextConfig::from_json_str(r#"{"width": "wide"}"#),
            Err(crate::errors::Error::Config(_))
        ));
    }

    #[test]
    fn context_config_missing_file() {
        assert!(matches!(
            ContextConfig::from_path("does/not/exist.json"),
            Err(crate::errors::Error::Io(_))
        ));
    }
}
