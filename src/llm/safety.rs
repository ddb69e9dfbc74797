//! Content-safety settings forwarded to the model provider.

use crate::error::{DishVisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Harm categories the provider can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];

    /// Short name used in environment variable suffixes, e.g. `HATE_SPEECH`.
    pub fn short_name(&self) -> &'static str {
        match self {
            HarmCategory::Harassment => "HARASSMENT",
            HarmCategory::HateSpeech => "HATE_SPEECH",
            HarmCategory::SexuallyExplicit => "SEXUALLY_EXPLICIT",
            HarmCategory::DangerousContent => "DANGEROUS_CONTENT",
        }
    }
}

/// Blocking threshold applied to a harm category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl HarmBlockThreshold {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarmBlockThreshold::BlockNone => "BLOCK_NONE",
            HarmBlockThreshold::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            HarmBlockThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            HarmBlockThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }
}

impl fmt::Display for HarmBlockThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HarmBlockThreshold {
    type Err = DishVisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLOCK_NONE" => Ok(HarmBlockThreshold::BlockNone),
            "BLOCK_ONLY_HIGH" => Ok(HarmBlockThreshold::BlockOnlyHigh),
            "BLOCK_MEDIUM_AND_ABOVE" => Ok(HarmBlockThreshold::BlockMediumAndAbove),
            "BLOCK_LOW_AND_ABOVE" => Ok(HarmBlockThreshold::BlockLowAndAbove),
            other => Err(DishVisionError::ConfigError(format!(
                "Unknown safety threshold: {}",
                other
            ))),
        }
    }
}

/// One category/threshold pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Same threshold for every known category
pub fn uniform_safety_settings(threshold: HarmBlockThreshold) -> Vec<SafetySetting> {
    HarmCategory::ALL
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold,
        })
        .collect()
}
