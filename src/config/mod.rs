use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Directory name used under the platform data directory
pub const APP_DIR_NAME: &str = "HaydeeOutfitGenerator";

/// Environment variables that override values from the settings file.
///
/// Each maps onto the [`Settings`] field of the same name in lower case.
pub const ENV_OVERRIDES: [&str; 4] = [
    "GEMINI_API_KEY",
    "HAYDEE_PATH",
    "AUTHOR_NAME",
    "IMAGE_RESOLUTION",
];

/// Loads and saves the user's [`Settings`].
///
/// Settings live in `settings.yaml` inside the configuration directory. When
/// loading, the file is layered under the variables in [`ENV_OVERRIDES`] so a
/// key or game path can be supplied without editing the file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// `%LOCALAPPDATA%\HaydeeOutfitGenerator`, falling back to the home directory
    pub fn default_dir() -> Result<Utf8PathBuf> {
        let base = ["LOCALAPPDATA", "XDG_DATA_HOME", "HOME", "USERPROFILE"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .context("Could not determine a directory for settings (LOCALAPPDATA and HOME are unset)")?;
        Ok(Utf8PathBuf::from(base).join(APP_DIR_NAME))
    }

    /// Load settings from the file and the process environment.
    ///
    /// A missing file yields defaults.
    pub fn load_settings(&self) -> Result<Settings> {
        let overrides = ENV_OVERRIDES
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect();
        self.load_settings_with_env(overrides)
    }

    /// Load settings from the file, overridden by `env` instead of the process environment.
    pub fn load_settings_with_env(&self, env: config::Map<String, String>) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let env = env
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();

        let settings: Settings = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(Environment::default().source(Some(env)))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings: configured={}, resolution={}, debug={}",
            settings.is_fully_configured(),
            settings.image_resolution,
            settings.debug_mode
        );
        Ok(settings)
    }

    /// Write `settings` to the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Directory for rotating log files
    pub fn log_dir(&self) -> Utf8PathBuf {
        self.config_dir.join("logs")
    }
}
