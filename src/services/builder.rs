//! Builds one single-variant outfit mod from a style description.
//!
//! Steps run strictly in order and each one gates the next:
//!
//! 1. validate the mod name
//! 2. check the base texture exists in the game install
//! 3. stage the destination directory (see [`StagedModDir`])
//! 4. open a scratch workspace for intermediate images
//! 5. transcode the base texture DDS -> PNG
//! 6. restyle the PNG (bounded by a timeout)
//! 7. transcode the restyled PNG -> DDS into the staged directory
//! 8. write the material and outfit descriptor, then publish
//!
//! Nothing is visible under `<outfits>/<name>` until step 8 publishes it, and
//! the scratch workspace is removed on every exit path.

use super::capabilities::{Restyler, TextureFormat, Transcoder};
use super::game_files;
use super::layout::{self, ModAssetSchema};
use super::staging::{StagedModDir, utf8_path};
use crate::error::{IoResultExt, PipelineError};
use crate::models::{AssetSet, ModDescriptor, PipelineConfig, Resolution, SlotEntry};
use crate::pipeline::events::EventSink;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Number of progress steps a build reports
pub const BUILD_STEPS: usize = 8;

/// Default limit for one restyle round-trip
pub const DEFAULT_RESTYLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything needed to build one mod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub mod_name: String,
    pub author: Option<String>,
    pub resolution: Resolution,
    pub base_texture: Utf8PathBuf,
    pub style: String,
}

impl BuildRequest {
    /// Request for `mod_name` using the base texture and preferences from `config`
    pub fn from_config(config: &PipelineConfig, mod_name: &str, style: &str) -> Self {
        Self {
            mod_name: mod_name.trim().to_string(),
            author: config.author.clone(),
            resolution: config.resolution,
            base_texture: config.base_texture_path(),
            style: style.trim().to_string(),
        }
    }
}

/// Produces complete single-variant mods under one outfits root
pub struct ModBuilder {
    outfits_root: Utf8PathBuf,
    transcoder: Arc<dyn Transcoder>,
    restyler: Arc<dyn Restyler>,
    restyle_timeout: Duration,
    events: EventSink,
}

impl ModBuilder {
    pub fn new(
        outfits_root: impl Into<Utf8PathBuf>,
        transcoder: Arc<dyn Transcoder>,
        restyler: Arc<dyn Restyler>,
    ) -> Self {
        Self {
            outfits_root: outfits_root.into(),
            transcoder,
            restyler,
            restyle_timeout: DEFAULT_RESTYLE_TIMEOUT,
            events: EventSink::silent(),
        }
    }

    pub fn with_restyle_timeout(mut self, restyle_timeout: Duration) -> Self {
        self.restyle_timeout = restyle_timeout;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn outfits_root(&self) -> &Utf8Path {
        &self.outfits_root
    }

    /// Files a successful build of `request` produces
    pub fn asset_set(&self, request: &BuildRequest) -> Result<AssetSet, PipelineError> {
        let directory = layout::resolve_mod_directory(&self.outfits_root, &request.mod_name)?;
        let schema = ModAssetSchema::for_mod(&request.mod_name);
        Ok(AssetSet {
            base_texture: request.base_texture.clone(),
            output_texture: directory.join(&schema.texture),
            material: directory.join(&schema.material),
            descriptor: directory.join(&schema.descriptor),
        })
    }

    /// Build the mod described by `request`, replacing any previous mod of the same name.
    pub async fn build(&self, request: &BuildRequest) -> Result<ModDescriptor, PipelineError> {
        let name = request.mod_name.as_str();
        let resolution = request.resolution;

        self.events
            .step(1, BUILD_STEPS, format!("Validating mod name '{name}'"));
        let destination = layout::resolve_mod_directory(&self.outfits_root, name)?;
        if request.style.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "style description is empty".to_string(),
            ));
        }

        self.events.step(2, BUILD_STEPS, "Checking base texture");
        if !request.base_texture.is_file() {
            return Err(PipelineError::MissingAsset {
                path: request.base_texture.clone(),
            });
        }
        tracing::debug!("Base texture: {}", request.base_texture);

        self.events.step(3, BUILD_STEPS, "Preparing mod directory");
        let staged = StagedModDir::create(&self.outfits_root, name)?;

        self.events.step(4, BUILD_STEPS, "Preparing workspace");
        let workspace = tempfile::Builder::new()
            .prefix("haydee-outfit-")
            .tempdir()
            .io_context(|| "Failed to create temporary workspace")?;
        let work_dir = utf8_path(workspace.path())?;

        self.events
            .step(5, BUILD_STEPS, "Converting base texture to PNG");
        let interchange = work_dir.join(format!("base.{}", TextureFormat::Png.extension()));
        self.transcoder
            .transcode(&request.base_texture, &interchange, TextureFormat::Png, resolution)
            .await?;

        self.events.step(
            6,
            BUILD_STEPS,
            format!("Generating {resolution} texture: \"{}\"", request.style),
        );
        let restyled = timeout(
            self.restyle_timeout,
            self.restyler
                .restyle(&interchange, &request.style, resolution, &work_dir),
        )
        .await
        .map_err(|_| PipelineError::Timeout(self.restyle_timeout))??;
        if !restyled.is_file() {
            return Err(PipelineError::Generation(format!(
                "no image was written to {restyled}"
            )));
        }

        self.events
            .step(7, BUILD_STEPS, "Converting restyled texture to DDS");
        let schema = ModAssetSchema::for_mod(name);
        let texture = staged.path().join(&schema.texture);
        self.transcoder
            .transcode(&restyled, &texture, TextureFormat::Dds, resolution)
            .await?;

        self.events
            .step(8, BUILD_STEPS, "Writing material and outfit files");
        let descriptor = ModDescriptor {
            name: name.to_string(),
            author: request.author.clone(),
            slot_category: None,
            resolution,
            directory: destination,
            slots: vec![SlotEntry {
                index: 1,
                variant: name.to_string(),
                texture: schema.texture.clone(),
                material: schema.material.clone(),
            }],
        };

        let material_path = staged.path().join(&schema.material);
        tokio::fs::write(&material_path, game_files::material_file(name, &schema.texture))
            .await
            .io_context(|| format!("Failed to write {material_path}"))?;

        let descriptor_path = staged.path().join(&schema.descriptor);
        tokio::fs::write(&descriptor_path, game_files::outfit_file(&descriptor))
            .await
            .io_context(|| format!("Failed to write {descriptor_path}"))?;

        let directory = staged.commit()?;
        drop(workspace);

        self.events
            .info(format!("Mod '{name}' written to {directory}"));
        Ok(descriptor)
    }
}
