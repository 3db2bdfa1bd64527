use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::openai_vision::{DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, NUTRITION_PROMPT};
use crate::capture::codec::DEFAULT_JPEG_QUALITY;

/// Settings file looked up in the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "nutricam.toml";

/// Environment variable holding the bearer credential.
pub const API_KEY_ENV: &str = "api_key";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("invalid settings in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub jpeg_quality: u8,
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            prompt: NUTRITION_PROMPT.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from `nutricam.toml` in the working
    /// directory. A missing default file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        };
        if !required && !path.exists() {
            log::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| SettingsError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&content).map_err(|message| SettingsError::Parse {
            path: path.clone(),
            message,
        })?;
        log::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply the `api_key` environment variable, which wins over the file.
    pub fn with_env_api_key(mut self, env_value: Option<String>) -> Self {
        if let Some(key) = env_value.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        if self.api_key.is_empty() {
            log::warn!("No API key set; analysis requests will be rejected by the API");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_public_api() {
        let s = Settings::default();
        assert_eq!(s.endpoint, "https://api.openai.com/v1/chat/completions");
        assert_eq!(s.model, "gpt-4o-mini");
        assert_eq!(s.max_tokens, 300);
        assert_eq!(s.jpeg_quality, 75);
        assert_eq!(s.camera_index, 0);
        assert_eq!(s.output_dir, PathBuf::from("."));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let s = Settings::from_toml("model = \"gpt-4o\"\ncameraIndex = 2\n").unwrap();
        assert_eq!(s.model, "gpt-4o");
        assert_eq!(s.camera_index, 2);
        assert_eq!(s.max_tokens, 300);
        assert_eq!(s.prompt, NUTRITION_PROMPT);
    }

    #[test]
    fn bad_toml_is_reported() {
        assert!(Settings::from_toml("maxTokens = \"lots\"").is_err());
    }

    #[test]
    fn env_key_overrides_file() {
        let s = Settings {
            api_key: "from-file".into(),
            ..Settings::default()
        };
        assert_eq!(s.clone().with_env_api_key(Some("from-env".into())).api_key, "from-env");
        assert_eq!(s.clone().with_env_api_key(Some(String::new())).api_key, "from-file");
        assert_eq!(s.with_env_api_key(None).api_key, "from-file");
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.toml");
        fs::write(&path, "frameWidth = 1280\nframeHeight = 720\noutputDir = \"shots\"\n").unwrap();

        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!((s.frame_width, s.frame_height), (1280, 720));
        assert_eq!(s.output_dir, PathBuf::from("shots"));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
