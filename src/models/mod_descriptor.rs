use super::config::Resolution;
use camino::Utf8PathBuf;
use serde::Serialize;

/// One selectable variant inside a mod's outfit descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotEntry {
    /// 1-based position; defines the in-game cycling order
    pub index: usize,
    /// Name of the variant (the source mod name for grouped mods)
    pub variant: String,
    /// Texture file name inside the mod directory
    pub texture: String,
    /// Material file name inside the mod directory
    pub material: String,
}

/// Identity of a finished mod on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModDescriptor {
    pub name: String,
    pub author: Option<String>,
    /// Only set for grouped mods
    pub slot_category: Option<String>,
    pub resolution: Resolution,
    pub directory: Utf8PathBuf,
    pub slots: Vec<SlotEntry>,
}

impl ModDescriptor {
    pub fn is_grouped(&self) -> bool {
        self.slot_category.is_some()
    }
}

/// Files belonging to one single-variant mod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSet {
    /// Read-only texture owned by the game installation
    pub base_texture: Utf8PathBuf,
    pub output_texture: Utf8PathBuf,
    pub material: Utf8PathBuf,
    pub descriptor: Utf8PathBuf,
}

/// Request to merge several single mods into one slot-selectable mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiModGroup {
    pub multimod_name: String,
    pub slot_category: String,
    /// Order defines the slot index of each source
    pub source_mod_names: Vec<String>,
    pub delete_sources_on_success: bool,
}

impl MultiModGroup {
    pub fn new<I, S>(multimod_name: impl Into<String>, slot_category: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            multimod_name: multimod_name.into(),
            slot_category: slot_category.into(),
            source_mod_names: sources.into_iter().map(Into::into).collect(),
            delete_sources_on_success: false,
        }
    }

    pub fn deleting_sources(mut self, delete: bool) -> Self {
        self.delete_sources_on_success = delete;
        self
    }
}
