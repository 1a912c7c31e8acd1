//! Integration tests for ConfigManager and settings handling
//!
//! These tests verify:
//! - Settings loading and saving
//! - Defaults when no file exists
//! - Environment overrides layered over the file
//! - Snapshotting settings into a pipeline configuration

use camino::Utf8PathBuf;
use haydee_outfit_gen::config::SETTINGS_FILE;
use haydee_outfit_gen::models::{CommandTemplate, DEFAULT_BASE_TEXTURE};
use haydee_outfit_gen::{ConfigManager, FailureKind, Resolution, Settings};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn no_env() -> config::Map<String, String> {
    config::Map::new()
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join(SETTINGS_FILE));
    assert_eq!(manager.log_dir(), config_path.join("logs"));
}

#[test]
fn test_creates_missing_config_dir() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("a/b/HaydeeOutfitGenerator");

    ConfigManager::new(&nested).unwrap();

    assert!(nested.is_dir());
}

#[test]
fn test_load_defaults_without_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings_with_env(no_env()).unwrap();

    assert_eq!(settings.image_resolution, Resolution::FourK);
    assert_eq!(settings.base_texture, DEFAULT_BASE_TEXTURE);
    assert_eq!(settings.restyle_timeout_secs, 300);
    assert!(!settings.is_fully_configured());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        manager.settings_path(),
        "haydee_path: D:/Games/Haydee\nimage_resolution: 2K\ntools:\n  transcoder:\n    program: texconv\n    args: [\"-ft\", \"{format}\", \"{input}\"]\n",
    )
    .unwrap();

    let settings = manager.load_settings_with_env(no_env()).unwrap();

    assert_eq!(settings.haydee_path, "D:/Games/Haydee");
    assert_eq!(settings.image_resolution, Resolution::TwoK);
    assert_eq!(settings.tools.transcoder.program, "texconv");
    assert_eq!(settings.tools.transcoder.args, vec!["-ft", "{format}", "{input}"]);
    // The restyler falls back to its default command
    assert_eq!(settings.tools.restyler, Settings::default().tools.restyler);
}

#[test]
fn test_save_and_reload_custom_tools() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = Settings {
        gemini_api_key: "key-123".to_string(),
        haydee_path: "/games/Haydee".to_string(),
        author_name: "Alice".to_string(),
        debug_mode: true,
        ..Settings::default()
    };
    let mut restyler = CommandTemplate {
        program: "python".to_string(),
        args: vec!["restyle.py".to_string(), "{input}".to_string()],
        env: Default::default(),
    };
    restyler.env.insert("model".to_string(), "image-preview".to_string());
    settings.tools.restyler = restyler;

    manager.save_settings(&settings).unwrap();
    let reloaded = manager.load_settings_with_env(no_env()).unwrap();

    assert_eq!(reloaded, settings);
}

#[test]
fn test_environment_fills_missing_values() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.settings_path(), "author_name: Alice\n").unwrap();

    let mut env = no_env();
    env.insert("GEMINI_API_KEY".to_string(), "env-key".to_string());
    env.insert("HAYDEE_PATH".to_string(), "/env/Haydee".to_string());

    let settings = manager.load_settings_with_env(env).unwrap();

    assert_eq!(settings.author_name, "Alice");
    assert_eq!(settings.gemini_api_key, "env-key");
    assert!(settings.is_fully_configured());
}

#[test]
fn test_resolution_is_case_insensitive() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    for (value, expected) in [("4k", Resolution::FourK), ("2k", Resolution::TwoK)] {
        let mut env = no_env();
        env.insert("IMAGE_RESOLUTION".to_string(), value.to_string());
        let settings = manager.load_settings_with_env(env).unwrap();
        assert_eq!(settings.image_resolution, expected, "IMAGE_RESOLUTION={value}");
    }

    fs::write(manager.settings_path(), "image_resolution: 2k\n").unwrap();
    let settings = manager.load_settings_with_env(no_env()).unwrap();
    assert_eq!(settings.image_resolution, Resolution::TwoK);
}

#[test]
fn test_snapshot_requires_key_and_game_path() {
    let missing_key = Settings {
        haydee_path: "/games/Haydee".to_string(),
        ..Settings::default()
    };
    assert_eq!(missing_key.snapshot().unwrap_err().kind(), FailureKind::NotConfigured);

    let missing_path = Settings {
        gemini_api_key: "key".to_string(),
        ..Settings::default()
    };
    let err = missing_path.snapshot().unwrap_err();
    assert_eq!(err.kind(), FailureKind::NotConfigured);
    assert!(err.to_string().contains("Game path"));
}

#[test]
fn test_snapshot_is_independent_of_later_edits() {
    let mut settings = Settings {
        gemini_api_key: " key ".to_string(),
        haydee_path: "/games/Haydee".to_string(),
        author_name: "  ".to_string(),
        restyle_timeout_secs: 60,
        ..Settings::default()
    };

    let config = settings.snapshot().unwrap();
    settings.haydee_path = "/elsewhere".to_string();
    settings.image_resolution = Resolution::TwoK;

    assert_eq!(config.api_key, "key");
    assert_eq!(config.author, None);
    assert_eq!(config.resolution, Resolution::FourK);
    assert_eq!(config.restyle_timeout, Duration::from_secs(60));
    assert_eq!(config.outfits_root(), Utf8PathBuf::from("/games/Haydee/Outfits"));
    assert_eq!(
        config.base_texture_path(),
        Utf8PathBuf::from("/games/Haydee/Textures/Suit/Suit_D.dds")
    );
}
