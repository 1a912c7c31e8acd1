//! Merges several single-variant mods into one slot-selectable multi-mod.
//!
//! Sources are only ever read. The combined mod is written to a staging
//! directory and published in one rename once every slot is in place; sources
//! are deleted (when requested) strictly after that, and failures at that point
//! are reported as [`CleanupWarning`]s rather than errors.

use super::game_files;
use super::layout::{self, ModAssetSchema};
use super::staging::StagedModDir;
use crate::error::{CleanupWarning, IoResultExt, PipelineError};
use crate::models::{ModDescriptor, MultiModGroup, Resolution, SlotEntry};
use crate::pipeline::events::EventSink;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::sync::Arc;

/// A source mod that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMod {
    pub name: String,
    pub directory: Utf8PathBuf,
    pub schema: ModAssetSchema,
    /// Resolution recorded in the source's descriptor, when readable
    pub resolution: Option<Resolution>,
}

impl SourceMod {
    pub fn texture_path(&self) -> Utf8PathBuf {
        self.directory.join(&self.schema.texture)
    }
}

/// Result of a successful assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub descriptor: ModDescriptor,
    /// Sources that were removed after the merge
    pub removed_sources: Vec<String>,
    pub warnings: Vec<CleanupWarning>,
}

/// Filesystem operations that touch source mods during an assembly
#[cfg_attr(test, mockall::automock)]
pub trait ModFiles: Send + Sync {
    /// Copy a source texture into the staged multi-mod
    fn copy_texture(&self, from: &Utf8Path, to: &Utf8Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    /// Remove a source mod directory after a successful merge
    fn remove_mod(&self, directory: &Utf8Path) -> io::Result<()> {
        fs::remove_dir_all(directory)
    }
}

/// [`ModFiles`] backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalModFiles;

impl ModFiles for LocalModFiles {}

/// Check that every named source exists and follows the single-mod schema.
///
/// Returns the sources in input order. Performs no writes.
pub fn validate_sources(
    source_names: &[String],
    outfits_root: &Utf8Path,
) -> Result<Vec<SourceMod>, PipelineError> {
    if source_names.is_empty() {
        return Err(PipelineError::EmptySourceList);
    }

    let mut seen = HashSet::new();
    let mut sources = Vec::with_capacity(source_names.len());

    for raw_name in source_names {
        let name = raw_name.trim();
        let directory = layout::resolve_mod_directory(outfits_root, name)?;

        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(PipelineError::DuplicateSource(name.to_string()));
        }
        if !directory.is_dir() {
            return Err(PipelineError::SourceNotFound {
                name: name.to_string(),
                path: directory,
            });
        }

        let schema = ModAssetSchema::for_mod(name);
        if let Some(missing) = schema.first_missing(&directory) {
            return Err(PipelineError::SchemaMismatch {
                name: name.to_string(),
                missing: missing.to_string(),
            });
        }

        let resolution = fs::read_to_string(directory.join(&schema.descriptor))
            .ok()
            .and_then(|text| game_files::read_resolution(&text));

        tracing::debug!("Validated source mod '{}' at {}", name, directory);
        sources.push(SourceMod {
            name: name.to_string(),
            directory,
            schema,
            resolution,
        });
    }

    Ok(sources)
}

/// Builds multi-mods under one outfits root
pub struct MultiModAssembler {
    outfits_root: Utf8PathBuf,
    author: Option<String>,
    fallback_resolution: Resolution,
    events: EventSink,
    files: Arc<dyn ModFiles>,
}

impl MultiModAssembler {
    pub fn new(outfits_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            outfits_root: outfits_root.into(),
            author: None,
            fallback_resolution: Resolution::default(),
            events: EventSink::silent(),
            files: Arc::new(LocalModFiles),
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    /// Resolution recorded when no source descriptor states one
    pub fn with_fallback_resolution(mut self, resolution: Resolution) -> Self {
        self.fallback_resolution = resolution;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_files(mut self, files: Arc<dyn ModFiles>) -> Self {
        self.files = files;
        self
    }

    pub fn validate_sources(&self, source_names: &[String]) -> Result<Vec<SourceMod>, PipelineError> {
        validate_sources(source_names, &self.outfits_root)
    }

    /// Merge the sources of `group` into a new multi-mod.
    pub fn assemble(&self, group: &MultiModGroup) -> Result<AssemblyReport, PipelineError> {
        let name = group.multimod_name.trim();
        let category = group.slot_category.trim();
        let source_count = group.source_mod_names.len();
        let descriptor_step = source_count + 2;
        let total = descriptor_step + usize::from(group.delete_sources_on_success);

        self.events
            .step(1, total, format!("Validating {source_count} source mods"));
        let destination = layout::resolve_mod_directory(&self.outfits_root, name)?;
        if category.is_empty() {
            return Err(PipelineError::InvalidRequest("slot category is empty".to_string()));
        }
        let sources = self.validate_sources(&group.source_mod_names)?;

        if sources.iter().any(|s| s.name.eq_ignore_ascii_case(name)) || !is_absent_or_empty(&destination)? {
            return Err(PipelineError::DestinationExists(destination));
        }

        let staged = StagedModDir::create(&self.outfits_root, name)?;
        let mut slots = Vec::with_capacity(sources.len());

        for (offset, source) in sources.iter().enumerate() {
            let index = offset + 1;
            self.events
                .step(index + 1, total, format!("Adding slot {index}: {}", source.name));

            let texture = layout::slot_texture_name(index);
            let material = layout::slot_material_name(name, index);

            let from = source.texture_path();
            let to = staged.path().join(&texture);
            self.files
                .copy_texture(&from, &to)
                .io_context(|| format!("Failed to copy {from} to {to}"))?;

            let material_path = staged.path().join(&material);
            fs::write(&material_path, game_files::material_file(name, &texture))
                .io_context(|| format!("Failed to write {material_path}"))?;

            slots.push(SlotEntry {
                index,
                variant: source.name.clone(),
                texture,
                material,
            });
        }

        self.events
            .step(descriptor_step, total, "Writing combined outfit descriptor");
        let descriptor = ModDescriptor {
            name: name.to_string(),
            author: self.author.clone(),
            slot_category: Some(category.to_string()),
            resolution: sources
                .iter()
                .find_map(|s| s.resolution)
                .unwrap_or(self.fallback_resolution),
            directory: destination,
            slots,
        };

        let descriptor_path = staged
            .path()
            .join(format!("{name}.{}", layout::DESCRIPTOR_EXT));
        fs::write(&descriptor_path, game_files::outfit_file(&descriptor))
            .io_context(|| format!("Failed to write {descriptor_path}"))?;

        let directory = staged.commit()?;
        self.events.info(format!(
            "Multi-mod '{name}' written to {directory} with {} slots",
            descriptor.slots.len()
        ));

        let mut report = AssemblyReport {
            descriptor,
            removed_sources: Vec::new(),
            warnings: Vec::new(),
        };

        if group.delete_sources_on_success {
            self.events.step(total, total, "Removing source mods");
            for source in &sources {
                match self.files.remove_mod(&source.directory) {
                    Ok(()) => {
                        tracing::info!("Removed source mod {}", source.directory);
                        report.removed_sources.push(source.name.clone());
                    }
                    Err(err) => {
                        let warning = CleanupWarning::new(&source.directory, err.to_string());
                        self.events.warning(warning.clone());
                        report.warnings.push(warning);
                    }
                }
            }
        }

        Ok(report)
    }
}

fn is_absent_or_empty(dir: &Utf8Path) -> Result<bool, PipelineError> {
    if !dir.exists() {
        return Ok(true);
    }
    if !dir.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(dir).io_context(|| format!("Failed to read {dir}"))?;
    Ok(entries.next().is_none())
}
