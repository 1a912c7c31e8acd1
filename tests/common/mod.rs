//! Shared fixtures for integration tests: a fake game install and in-process
//! stand-ins for the transcode and restyle capabilities.

#![allow(dead_code)]

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use haydee_outfit_gen::PipelineConfig;
use haydee_outfit_gen::models::{ModDescriptor, Resolution, SlotEntry};
use haydee_outfit_gen::services::game_files;
use haydee_outfit_gen::services::{
    LocalModFiles, ModFiles, RestyleError, Restyler, TextureFormat, TranscodeError, Transcoder,
};
use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub const BASE_TEXTURE: &str = "Textures/Suit/Suit_D.dds";
pub const FIXED_IMAGE: &[u8] = b"restyled image bytes";

/// A temporary Haydee install with a base suit texture and an empty Outfits folder
pub struct GameDir {
    _temp: TempDir,
    pub game: Utf8PathBuf,
    pub outfits: Utf8PathBuf,
}

impl GameDir {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let game = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let base = game.join(BASE_TEXTURE);
        fs::create_dir_all(base.parent().unwrap()).unwrap();
        fs::write(&base, b"base dds").unwrap();
        let outfits = game.join("Outfits");
        fs::create_dir_all(&outfits).unwrap();
        Self {
            _temp: temp,
            game,
            outfits,
        }
    }

    pub fn base_texture(&self) -> Utf8PathBuf {
        self.game.join(BASE_TEXTURE)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            api_key: "test-key".to_string(),
            game_path: self.game.clone(),
            author: Some("Alice".to_string()),
            resolution: Resolution::FourK,
            base_texture: Utf8PathBuf::from(BASE_TEXTURE),
            restyle_timeout: Duration::from_secs(5),
        }
    }

    /// Write a single-variant mod whose texture holds `texture_bytes`
    pub fn write_source_mod(&self, name: &str, texture_bytes: &[u8]) {
        let dir = self.outfits.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Suit_D.dds"), texture_bytes).unwrap();
        fs::write(dir.join(format!("{name}.mtl")), game_files::material_file(name, "Suit_D.dds")).unwrap();
        let descriptor = ModDescriptor {
            name: name.to_string(),
            author: None,
            slot_category: None,
            resolution: Resolution::FourK,
            directory: dir.clone(),
            slots: vec![SlotEntry {
                index: 1,
                variant: name.to_string(),
                texture: "Suit_D.dds".to_string(),
                material: format!("{name}.mtl"),
            }],
        };
        fs::write(dir.join(format!("{name}.outfit")), game_files::outfit_file(&descriptor)).unwrap();
    }

    /// Names of the entries directly under Outfits, sorted
    pub fn outfit_entries(&self) -> Vec<String> {
        sorted_entries(&self.outfits)
    }
}

pub fn sorted_entries(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Copies bytes through unchanged and counts calls per target format
#[derive(Default)]
pub struct CopyTranscoder {
    pub to_png: AtomicUsize,
    pub to_dds: AtomicUsize,
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
        format: TextureFormat,
        _resolution: Resolution,
    ) -> Result<(), TranscodeError> {
        match format {
            TextureFormat::Png => self.to_png.fetch_add(1, Ordering::SeqCst),
            TextureFormat::Dds => self.to_dds.fetch_add(1, Ordering::SeqCst),
        };
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Fails every conversion
pub struct BrokenTranscoder;

#[async_trait]
impl Transcoder for BrokenTranscoder {
    async fn transcode(
        &self,
        _input: &Utf8Path,
        _output: &Utf8Path,
        _format: TextureFormat,
        _resolution: Resolution,
    ) -> Result<(), TranscodeError> {
        Err(TranscodeError::Failed {
            code: Some(1),
            message: "unsupported DDS variant".to_string(),
        })
    }
}

/// Writes a fixed image and remembers the prompts it was given
#[derive(Default)]
pub struct FixedImageRestyler {
    pub image: Vec<u8>,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedImageRestyler {
    pub fn new() -> Self {
        Self::with_image(FIXED_IMAGE)
    }

    pub fn with_image(image: &[u8]) -> Self {
        Self {
            image: image.to_vec(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Restyler for FixedImageRestyler {
    async fn restyle(
        &self,
        _base_image: &Utf8Path,
        style: &str,
        _resolution: Resolution,
        output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, RestyleError> {
        self.prompts.lock().unwrap().push(style.to_string());
        let output = output_dir.join("restyled.png");
        tokio::fs::write(&output, &self.image)
            .await
            .map_err(|e| RestyleError::Generation(e.to_string()))?;
        Ok(output)
    }
}

/// How a [`FailingRestyler`] fails
#[derive(Clone, Copy)]
pub enum Failure {
    Rejected,
    Quota,
}

pub struct FailingRestyler(pub Failure);

#[async_trait]
impl Restyler for FailingRestyler {
    async fn restyle(
        &self,
        _base_image: &Utf8Path,
        _style: &str,
        _resolution: Resolution,
        _output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, RestyleError> {
        Err(match self.0 {
            Failure::Rejected => RestyleError::Generation("prompt rejected by safety filter".to_string()),
            Failure::Quota => RestyleError::Quota("429 resource exhausted".to_string()),
        })
    }
}

/// Sleeps before producing an image
pub struct SlowRestyler {
    pub delay: Duration,
}

#[async_trait]
impl Restyler for SlowRestyler {
    async fn restyle(
        &self,
        base_image: &Utf8Path,
        style: &str,
        resolution: Resolution,
        output_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, RestyleError> {
        tokio::time::sleep(self.delay).await;
        FixedImageRestyler::new()
            .restyle(base_image, style, resolution, output_dir)
            .await
    }
}

/// Local filesystem access that fails for one named source mod
#[derive(Default)]
pub struct FlakyModFiles {
    pub fail_copy_from: Option<&'static str>,
    pub fail_removal_of: Option<&'static str>,
}

fn is_mod_dir(dir: &Utf8Path, name: Option<&str>) -> bool {
    name.is_some_and(|name| dir.file_name() == Some(name))
}

impl ModFiles for FlakyModFiles {
    fn copy_texture(&self, from: &Utf8Path, to: &Utf8Path) -> std::io::Result<u64> {
        if from.parent().is_some_and(|dir| is_mod_dir(dir, self.fail_copy_from)) {
            return Err(std::io::Error::other("device not ready"));
        }
        LocalModFiles.copy_texture(from, to)
    }

    fn remove_mod(&self, directory: &Utf8Path) -> std::io::Result<()> {
        if is_mod_dir(directory, self.fail_removal_of) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "file is open in another program",
            ));
        }
        LocalModFiles.remove_mod(directory)
    }
}
