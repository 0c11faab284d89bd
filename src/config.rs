use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_image_folder")]
    pub image_folder: String,

    /// Crop edge as a fraction of the image's shorter side.
    #[serde(default = "default_crop_ratio")]
    pub crop_ratio: f32,

    #[serde(default = "default_min_crop_px")]
    pub min_crop_px: u32,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra accepted spellings, canonical name -> aliases. Merged on top of
    /// the built-in table; unknown canonical names create new characters.
    #[serde(default)]
    pub extra_aliases: HashMap<String, Vec<String>>,
}

fn default_image_folder() -> String {
    "guess_images".to_string()
}
fn default_crop_ratio() -> f32 {
    0.05
}
fn default_min_crop_px() -> u32 {
    10
}
fn default_timeout_seconds() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            image_folder: default_image_folder(),
            crop_ratio: default_crop_ratio(),
            min_crop_px: default_min_crop_px(),
            timeout_seconds: default_timeout_seconds(),
            extra_aliases: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads the JSON config, falling back to defaults when the file is
    /// missing or unreadable. The defaults are written back so the user has
    /// a file to edit next time.
    pub fn load_or_init(path: &Path) -> Config {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("failed to parse {}: {}, rewriting defaults", path.display(), e);
                }
            },
            Err(e) => {
                warn!("failed to read {}: {}, writing defaults", path.display(), e);
            }
        }

        let config = Config::default();
        if let Err(e) = config.save(path) {
            warn!("failed to write default config: {:#}", e);
        }
        config
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");

        let config = Config::load_or_init(&path);
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.min_crop_px, 10);

        assert!(path.exists(), "defaults should be written back");
        let reloaded: Config = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(reloaded.image_folder, config.image_folder);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_replaced() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json")?;

        let config = Config::load_or_init(&path);
        assert_eq!(config.crop_ratio, 0.05);

        let content = fs::read_to_string(&path)?;
        assert!(serde_json::from_str::<Config>(&content).is_ok());
        Ok(())
    }

    #[test]
    fn partial_file_fills_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "timeout_seconds": 30 }"#)?;

        let config = Config::load_or_init(&path);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.image_folder, "guess_images");
        assert!(config.extra_aliases.is_empty());
        Ok(())
    }
}
