//! Decoder configuration.
//!
//! Configuration is an explicit struct with a default for every field. It can
//! be read from JSON (camelCase keys, missing keys take their default) and
//! overridden field by field from `TERRAIN_*` environment variables.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use terrain_decode::{DEFAULT_SEGMENTS, DecodeOptions, DemEncoding};

use crate::error::{Error, Result};

/// Environment variable selecting the tile format.
pub const ENV_FORMAT: &str = "TERRAIN_FORMAT";
/// Environment variable overriding the grid width in segments.
pub const ENV_WIDTH_SEGMENTS: &str = "TERRAIN_WIDTH_SEGMENTS";
/// Environment variable overriding the grid height in segments.
pub const ENV_HEIGHT_SEGMENTS: &str = "TERRAIN_HEIGHT_SEGMENTS";
/// Environment variable overriding the DEM encoding.
pub const ENV_DEM_ENCODING: &str = "TERRAIN_DEM_ENCODING";

/// Tile payload format, which picks the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileFormat {
    /// PNG heightmap.
    #[default]
    #[serde(alias = "png")]
    Raster,
    /// Quantized-mesh 1.0 payload.
    #[serde(alias = "terrain")]
    QuantizedMesh,
}

impl TileFormat {
    /// Guess the format from a file extension (`.png` or `.terrain`).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        extension.parse().ok()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raster => "raster",
            Self::QuantizedMesh => "quantized-mesh",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raster" | "png" => Ok(Self::Raster),
            "quantized-mesh" | "terrain" => Ok(Self::QuantizedMesh),
            other => Err(Error::Config(format!("unknown tile format \"{other}\""))),
        }
    }
}

/// Everything needed to build a decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderConfig {
    pub format: TileFormat,
    /// Raster grid width in segments.
    pub width_segments: u32,
    /// Raster grid height in segments.
    pub height_segments: u32,
    /// Raster pixel encoding name, `"float32"` or `"terrarium"`.
    pub dem_encoding: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            format: TileFormat::default(),
            width_segments: DEFAULT_SEGMENTS,
            height_segments: DEFAULT_SEGMENTS,
            dem_encoding: DemEncoding::default().to_string(),
        }
    }
}

impl DecoderConfig {
    /// Default configuration for `format`.
    #[must_use]
    pub fn for_format(format: TileFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TERRAIN_*` overrides looked up through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(format) = lookup(ENV_FORMAT) {
            self.format = format.parse()?;
        }
        if let Some(value) = lookup(ENV_WIDTH_SEGMENTS) {
            self.width_segments = parse_segments(ENV_WIDTH_SEGMENTS, &value)?;
        }
        if let Some(value) = lookup(ENV_HEIGHT_SEGMENTS) {
            self.height_segments = parse_segments(ENV_HEIGHT_SEGMENTS, &value)?;
        }
        if let Some(encoding) = lookup(ENV_DEM_ENCODING) {
            self.dem_encoding = encoding;
        }
        Ok(self)
    }

    /// Resolve and validate the raster decode options.
    pub fn decode_options(&self) -> Result<DecodeOptions> {
        let options = DecodeOptions {
            width_segments: self.width_segments,
            height_segments: self.height_segments,
            dem_encoding: self.dem_encoding.parse()?,
        };
        options.validate()?;
        Ok(options)
    }
}

fn parse_segments(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={value}: {e}")))
}
