//! Canonical on-disk layout of outfit mods.
//!
//! A mod lives at `<game>/Outfits/<name>/`. Single mods contain the suit
//! texture, one material and one outfit descriptor; grouped mods contain one
//! texture/material pair per slot plus a single descriptor. Nothing here
//! touches the filesystem except [`ModAssetSchema::first_missing`].

use crate::error::{InvalidNameError, NameRejection};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::sync::LazyLock;

/// Name of the outfits folder inside the game install
pub const OUTFITS_DIR: &str = "Outfits";

/// Stem of the diffuse suit texture the game loads
pub const TEXTURE_STEM: &str = "Suit_D";

/// Extension of the game's native texture format
pub const NATIVE_TEXTURE_EXT: &str = "dds";

pub const MATERIAL_EXT: &str = "mtl";
pub const DESCRIPTOR_EXT: &str = "outfit";

/// Longest mod name accepted
pub const MAX_NAME_LEN: usize = 64;

/// Folder names the game ships or loads specially
const RESERVED_GAME_NAMES: &[&str] = &["default", "textures", "materials", "models", "outfits"];

static FORBIDDEN_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("Invalid forbidden-char regex"));

static DEVICE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[1-9]|lpt[1-9])(\..*)?$").expect("Invalid device-name regex")
});

/// Check that `name` is usable as a single directory under the outfits root.
pub fn validate_name(name: &str) -> Result<(), InvalidNameError> {
    let reject = |reason| {
        Err(InvalidNameError {
            name: name.to_string(),
            reason,
        })
    };

    if name.trim().is_empty() {
        return reject(NameRejection::Empty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return reject(NameRejection::TooLong(MAX_NAME_LEN));
    }
    if name == "." || name == ".." {
        return reject(NameRejection::Traversal);
    }
    if let Some(found) = FORBIDDEN_CHAR.find(name) {
        let ch = found.as_str().chars().next().unwrap_or('\0');
        return reject(NameRejection::ForbiddenCharacter(ch));
    }
    if name.starts_with('.') {
        return reject(NameRejection::LeadingDot);
    }
    if name.ends_with('.') || name.ends_with(' ') {
        return reject(NameRejection::TrailingDotOrSpace);
    }
    if DEVICE_NAME.is_match(name)
        || RESERVED_GAME_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return reject(NameRejection::Reserved);
    }

    Ok(())
}

/// Directory of the mod called `name` under `outfits_root`.
pub fn resolve_mod_directory(outfits_root: &Utf8Path, name: &str) -> Result<Utf8PathBuf, InvalidNameError> {
    validate_name(name)?;
    Ok(outfits_root.join(name))
}

/// `<game>/Outfits`
pub fn outfits_root(game_path: &Utf8Path) -> Utf8PathBuf {
    game_path.join(OUTFITS_DIR)
}

/// Path of a mod file as the game loader references it (forward slashes, install-relative)
pub fn game_reference(mod_name: &str, file_name: &str) -> String {
    format!("{OUTFITS_DIR}/{mod_name}/{file_name}")
}

/// Texture file of the 1-based slot `index` in a grouped mod
pub fn slot_texture_name(index: usize) -> String {
    format!("{TEXTURE_STEM}_{index:02}.{NATIVE_TEXTURE_EXT}")
}

/// Material file of the 1-based slot `index` in a grouped mod
pub fn slot_material_name(group_name: &str, index: usize) -> String {
    format!("{group_name}_{index:02}.{MATERIAL_EXT}")
}

/// The exact files a single-variant mod must contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModAssetSchema {
    pub texture: String,
    pub material: String,
    pub descriptor: String,
}

impl ModAssetSchema {
    pub fn for_mod(name: &str) -> Self {
        Self {
            texture: format!("{TEXTURE_STEM}.{NATIVE_TEXTURE_EXT}"),
            material: format!("{name}.{MATERIAL_EXT}"),
            descriptor: format!("{name}.{DESCRIPTOR_EXT}"),
        }
    }

    pub fn files(&self) -> [&str; 3] {
        [&self.texture, &self.material, &self.descriptor]
    }

    /// First schema file that is not a regular file inside `dir`
    pub fn first_missing(&self, dir: &Utf8Path) -> Option<&str> {
        self.files().into_iter().find(|file| !dir.join(file).is_file())
    }
}
