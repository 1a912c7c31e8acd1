//! Atomic publication of mod directories.
//!
//! A mod is assembled inside a hidden staging directory next to its final
//! location and only renamed onto `<outfits>/<name>` once every file has been
//! written. Dropping a [`StagedModDir`] without committing removes the staging
//! directory, so the game's loader never sees a half-written mod and a failed
//! rebuild leaves the previous version untouched.

use crate::error::{IoResultExt, PipelineError};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// A mod directory under construction
#[derive(Debug)]
pub struct StagedModDir {
    staging: TempDir,
    path: Utf8PathBuf,
    destination: Utf8PathBuf,
}

impl StagedModDir {
    /// Create an empty staging directory for the mod `name` inside `outfits_root`.
    ///
    /// The outfits root itself is created if the game install does not have one yet.
    /// Leftovers of an interrupted earlier run for the same mod are cleared first.
    pub fn create(outfits_root: &Utf8Path, name: &str) -> Result<Self, PipelineError> {
        fs::create_dir_all(outfits_root)
            .io_context(|| format!("Failed to create outfits directory {outfits_root}"))?;
        sweep_leftovers(outfits_root, name);

        let staging = tempfile::Builder::new()
            .prefix(&staging_prefix(name))
            .tempdir_in(outfits_root)
            .io_context(|| format!("Failed to create staging directory in {outfits_root}"))?;

        let path = utf8_path(staging.path())?;
        tracing::debug!("Staging mod '{}' in {}", name, path);

        Ok(Self {
            staging,
            path,
            destination: outfits_root.join(name),
        })
    }

    /// Where files for the mod should be written until commit
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Where the mod will live after commit
    pub fn destination(&self) -> &Utf8Path {
        &self.destination
    }

    /// Publish the staged directory under its final name.
    ///
    /// An existing directory of the same name is replaced. If the swap fails the
    /// previous directory is restored before the error is returned.
    pub fn commit(self) -> Result<Utf8PathBuf, PipelineError> {
        let Self {
            staging,
            path,
            destination,
        } = self;

        if !destination.exists() {
            fs::rename(&path, &destination)
                .io_context(|| format!("Failed to publish {destination}"))?;
            drop(staging);
            tracing::debug!("Published {}", destination);
            return Ok(destination);
        }

        let parent = destination.parent().unwrap_or(Utf8Path::new("."));
        let name = destination.file_name().unwrap_or("mod");
        let holder = tempfile::Builder::new()
            .prefix(&holder_prefix(name))
            .tempdir_in(parent)
            .io_context(|| format!("Failed to prepare replacement of {destination}"))?;
        let parked = utf8_path(holder.path())?.join(name);

        fs::rename(&destination, &parked)
            .io_context(|| format!("Failed to move aside existing {destination}"))?;

        if let Err(err) = fs::rename(&path, &destination) {
            if let Err(restore_err) = fs::rename(&parked, &destination) {
                tracing::error!(
                    "Failed to restore {} from {}: {}",
                    destination,
                    parked,
                    restore_err
                );
                // Leave the parked copy on disk for manual recovery.
                std::mem::forget(holder);
            }
            return Err(PipelineError::io(
                format!("Failed to publish {destination}"),
                err,
            ));
        }
        drop(staging);

        if let Err(err) = holder.close() {
            tracing::warn!("Failed to remove previous version of {}: {}", destination, err);
        }

        tracing::debug!("Replaced {}", destination);
        Ok(destination)
    }
}

fn staging_prefix(name: &str) -> String {
    format!(".{name}.staging-")
}

fn holder_prefix(name: &str) -> String {
    format!(".{name}.previous-")
}

/// Remove staging and holder directories left behind by a run that was killed
/// before it could clean up.
///
/// A holder whose parked copy is the only surviving version of the mod is moved
/// back into place instead of being removed.
fn sweep_leftovers(outfits_root: &Utf8Path, name: &str) {
    let Ok(entries) = outfits_root.read_dir_utf8() else {
        return;
    };
    let staging = staging_prefix(name);
    let holder = holder_prefix(name);
    let destination = outfits_root.join(name);

    for entry in entries.flatten() {
        let leftover = entry.path();
        let file_name = entry.file_name();

        if file_name.starts_with(&holder) {
            let parked = leftover.join(name);
            if !destination.exists() && parked.is_dir() {
                match fs::rename(&parked, &destination) {
                    Ok(()) => tracing::warn!("Restored {} from interrupted replacement", destination),
                    Err(err) => {
                        tracing::error!("Failed to restore {} from {}: {}", destination, parked, err);
                        continue;
                    }
                }
            }
        } else if !file_name.starts_with(&staging) {
            continue;
        }

        match fs::remove_dir_all(leftover) {
            Ok(()) => tracing::info!("Removed stale {}", leftover),
            Err(err) => tracing::warn!("Failed to remove stale {}: {}", leftover, err),
        }
    }
}

pub(crate) fn utf8_path(path: &std::path::Path) -> Result<Utf8PathBuf, PipelineError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|raw| {
        PipelineError::io(
            format!("Non UTF-8 path {}", raw.display()),
            std::io::Error::from(std::io::ErrorKind::InvalidData),
        )
    })
}
