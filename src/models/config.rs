use crate::error::PipelineError;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Output texture resolution requested from the restyle step
///
/// Deserializes through [`FromStr`], so `4k` and ` 4K ` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Resolution {
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    #[default]
    FourK,
}

impl Resolution {
    /// Edge length of the square texture in pixels
    pub fn pixels(self) -> u32 {
        match self {
            Self::TwoK => 2048,
            Self::FourK => 4096,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resolution {0:?}, expected 2K or 4K")]
pub struct ParseResolutionError(String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2K" => Ok(Self::TwoK),
            "4K" => Ok(Self::FourK),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = ParseResolutionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An external program invocation with `{placeholder}` arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables, applied in order
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

/// External tools backing the transcode and restyle capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub transcoder: CommandTemplate,
    pub restyler: CommandTemplate,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            transcoder: CommandTemplate {
                program: "magick".to_string(),
                args: vec![
                    "{input}".to_string(),
                    "-resize".to_string(),
                    "{size}x{size}".to_string(),
                    "-define".to_string(),
                    "dds:compression=dxt5".to_string(),
                    "{output}".to_string(),
                ],
                env: IndexMap::new(),
            },
            restyler: CommandTemplate {
                program: "haydee-restyle".to_string(),
                args: vec![
                    "--input".to_string(),
                    "{input}".to_string(),
                    "--prompt".to_string(),
                    "{prompt}".to_string(),
                    "--size".to_string(),
                    "{resolution}".to_string(),
                    "--output".to_string(),
                    "{output}".to_string(),
                ],
                env: IndexMap::new(),
            },
        }
    }
}

/// Persisted user settings (`settings.yaml`, overridable from the environment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gemini_api_key: String,

    /// Root of the Haydee installation
    pub haydee_path: String,

    pub author_name: String,

    pub image_resolution: Resolution,

    /// Base suit texture, relative to the game install
    pub base_texture: String,

    pub restyle_timeout_secs: u64,

    pub debug_mode: bool,

    pub tools: ToolSettings,
}

pub const DEFAULT_BASE_TEXTURE: &str = "Textures/Suit/Suit_D.dds";

fn default_restyle_timeout() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            haydee_path: String::new(),
            author_name: String::new(),
            image_resolution: Resolution::default(),
            base_texture: DEFAULT_BASE_TEXTURE.to_string(),
            restyle_timeout_secs: default_restyle_timeout(),
            debug_mode: false,
            tools: ToolSettings::default(),
        }
    }
}

impl Settings {
    /// Whether the settings needed to run an operation are present
    pub fn is_fully_configured(&self) -> bool {
        !self.gemini_api_key.trim().is_empty() && !self.haydee_path.trim().is_empty()
    }

    /// Freeze the current settings into the configuration for one operation
    ///
    /// Later edits to `self` do not affect the returned value.
    pub fn snapshot(&self) -> Result<PipelineConfig, PipelineError> {
        let api_key = self.gemini_api_key.trim();
        if api_key.is_empty() {
            return Err(PipelineError::NotConfigured("API key"));
        }

        let game_path = self.haydee_path.trim();
        if game_path.is_empty() {
            return Err(PipelineError::NotConfigured("Game path"));
        }

        let author = self.author_name.trim();
        let base_texture = if self.base_texture.trim().is_empty() {
            DEFAULT_BASE_TEXTURE
        } else {
            self.base_texture.trim()
        };

        Ok(PipelineConfig {
            api_key: api_key.to_string(),
            game_path: Utf8PathBuf::from(game_path),
            author: (!author.is_empty()).then(|| author.to_string()),
            resolution: self.image_resolution,
            base_texture: Utf8PathBuf::from(base_texture),
            restyle_timeout: Duration::from_secs(if self.restyle_timeout_secs == 0 {
                default_restyle_timeout()
            } else {
                self.restyle_timeout_secs
            }),
        })
    }
}

/// Immutable configuration captured when an operation starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub api_key: String,
    pub game_path: Utf8PathBuf,
    pub author: Option<String>,
    pub resolution: Resolution,
    pub base_texture: Utf8PathBuf,
    pub restyle_timeout: Duration,
}

impl PipelineConfig {
    /// Directory holding every installed outfit mod
    pub fn outfits_root(&self) -> Utf8PathBuf {
        crate::services::layout::outfits_root(&self.game_path)
    }

    /// Absolute path of the base texture inside the game install
    pub fn base_texture_path(&self) -> Utf8PathBuf {
        self.game_path.join(&self.base_texture)
    }
}
