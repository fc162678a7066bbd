//! Transform option parsing and validation
//!
//! Raw caller input arrives as a string-keyed map (query parameters in the
//! full service). `TransformOptions::from_raw` normalizes it into a typed,
//! validated struct or fails naming the offending field.
//!
//! Recognized keys (case-sensitive):
//! `width`, `height`, `format`, `crop`, `min_quality`, `max_quality`,
//! `max_file_size_bytes`

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RepixError;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RepixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(RepixError::unsupported_format(s)),
        }
    }
}

/// Compression quality in the codec range [1, 100].
///
/// 1 is the most lossy (smallest output), 100 applies no compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    /// Full compression floor
    pub const MIN: Quality = Quality(1);
    /// No compression ceiling
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u8) -> Result<Self, RepixError> {
        if (1..=100).contains(&value) {
            Ok(Quality(value))
        } else {
            Err(RepixError::invalid_compression(value.to_string()))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// Named compression presets accepted wherever a numeric quality is.
///
/// A closed enumeration replaces the original duck-typed int-or-string
/// quality field; unknown names are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPreset {
    /// No compression (quality 100)
    None,
    /// Light compression (quality 85)
    Low,
    /// Balanced compression (quality 70)
    Medium,
    /// Aggressive compression (quality 40)
    High,
    /// Full compression (quality 1)
    Full,
}

impl CompressionPreset {
    pub fn quality(&self) -> Quality {
        match self {
            Self::None => Quality(100),
            Self::Low => Quality(85),
            Self::Medium => Quality(70),
            Self::High => Quality(40),
            Self::Full => Quality(1),
        }
    }
}

impl FromStr for CompressionPreset {
    type Err = RepixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "full" => Ok(Self::Full),
            _ => Err(RepixError::invalid_compression(s)),
        }
    }
}

/// Translate a raw quality value, numeric or preset name, to a `Quality`
pub fn parse_quality(raw: &str) -> Result<Quality, RepixError> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u8>() {
        return Quality::new(value);
    }
    // Large numerics overflow u8 and land here; keep them in the
    // numeric error path rather than the preset one
    if raw.chars().all(|c| c.is_ascii_digit()) && !raw.is_empty() {
        return Err(RepixError::invalid_compression(raw));
    }
    raw.parse::<CompressionPreset>().map(|p| p.quality())
}

/// Validated, normalized transform configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Output format (defaults to the source file's format)
    pub format: OutputFormat,
    /// Crop-to-fill instead of best-fit
    pub crop: bool,
    /// Quality floor for the byte-budget search
    pub min_quality: Quality,
    /// Quality ceiling, applied directly when no budget is set
    pub max_quality: Quality,
    /// Byte budget for the output; None disables the quality search
    pub max_file_size_bytes: Option<u64>,
}

fn require_dimension(raw: &HashMap<String, String>, key: &str) -> Result<u32, RepixError> {
    let value = raw
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RepixError::invalid_param(key, "missing"))?;

    let parsed: u32 = value
        .parse()
        .map_err(|_| RepixError::invalid_param(key, "must be numeric"))?;

    if parsed == 0 {
        return Err(RepixError::invalid_param(key, "must be positive"));
    }

    Ok(parsed)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

impl TransformOptions {
    /// Build validated options from raw caller input.
    ///
    /// `source_extension` supplies the default output format when no
    /// explicit `format` key is present. Pure function of its inputs.
    pub fn from_raw(
        raw: &HashMap<String, String>,
        source_extension: &str,
    ) -> Result<Self, RepixError> {
        let width = require_dimension(raw, "width")?;
        let height = require_dimension(raw, "height")?;

        let format = match raw.get("format") {
            Some(value) => value.parse()?,
            None => source_extension.parse()?,
        };

        let crop = raw.get("crop").map(|v| parse_bool(v)).unwrap_or(false);

        let min_quality = match raw.get("min_quality") {
            Some(value) => parse_quality(value)?,
            None => Quality::MIN,
        };
        let max_quality = match raw.get("max_quality") {
            Some(value) => parse_quality(value)?,
            None => Quality::MAX,
        };

        if min_quality > max_quality {
            return Err(RepixError::invalid_param(
                "min_quality",
                format!(
                    "must not exceed max_quality ({} > {})",
                    min_quality.get(),
                    max_quality.get()
                ),
            ));
        }

        let max_file_size_bytes = match raw.get("max_file_size_bytes") {
            Some(value) => {
                let bytes: u64 = value.trim().parse().map_err(|_| {
                    RepixError::invalid_param("max_file_size_bytes", "must be numeric")
                })?;
                // 0 disables the byte budget
                (bytes > 0).then_some(bytes)
            }
            None => None,
        };

        Ok(Self {
            width,
            height,
            format,
            crop,
            min_quality,
            max_quality,
            max_file_size_bytes,
        })
    }
}
