//! Quality tiers and the tier-to-engine-preset table.
//!
//! [`QualityTier::preset`] is the only place that decides which engine size
//! preset a tier renders at and whether the result is upscaled afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Full HD, the target of the post-render upscale.
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Caller-selected quality tier.
///
/// The resolution-style names used by earlier clients (`480p`, `720p`,
/// `1080p`) are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Native 480p render.
    #[serde(alias = "480p")]
    Low,
    /// Native 720p render.
    #[default]
    #[serde(alias = "720p")]
    Standard,
    /// 720p render upscaled to 1080p.
    #[serde(alias = "1080p")]
    High,
}

/// Engine settings derived from a [`QualityTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierPreset {
    /// Value of the engine's `--size` flag.
    pub engine_size: &'static str,
    /// Target resolution of the post-render upscale, if any.
    pub upscale: Option<Resolution>,
}

impl TierPreset {
    /// Whether the quality enhancer has to run for this preset.
    pub fn needs_upscale(&self) -> bool {
        self.upscale.is_some()
    }
}

const PRESET_480: &str = "infinitetalk-480";
const PRESET_720: &str = "infinitetalk-720";

impl QualityTier {
    /// All tiers, in ascending quality.
    pub const ALL: [QualityTier; 3] = [Self::Low, Self::Standard, Self::High];

    /// Look up the engine preset for this tier.
    pub fn preset(&self) -> TierPreset {
        match self {
            Self::Low => TierPreset {
                engine_size: PRESET_480,
                upscale: None,
            },
            Self::Standard => TierPreset {
                engine_size: PRESET_720,
                upscale: None,
            },
            Self::High => TierPreset {
                engine_size: PRESET_720,
                upscale: Some(Resolution::FULL_HD),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "480p" => Ok(Self::Low),
            "standard" | "720p" => Ok(Self::Standard),
            "high" | "1080p" => Ok(Self::High),
            other => Err(format!(
                "unknown quality '{other}', expected one of: low, standard, high"
            )),
        }
    }
}
