//! Raster decoder configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, DecodeResult};
use crate::grid::grid_vertex_count;

/// Default number of grid segments along each axis.
pub const DEFAULT_SEGMENTS: u32 = 63;

/// How raster pixels encode elevation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DemEncoding {
    /// 4 bytes per pixel holding a little-endian IEEE-754 float in meters.
    Float32,
    /// 3 bytes per pixel: `(R * 256 + G + B / 256) - 32768` meters.
    #[default]
    Terrarium,
}

impl DemEncoding {
    /// Bytes consumed per source pixel.
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Terrarium => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Terrarium => "terrarium",
        }
    }
}

impl fmt::Display for DemEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DemEncoding {
    type Err = DecodeError;

    fn from_str(s: &str) -> DecodeResult<Self> {
        match s {
            "float32" => Ok(Self::Float32),
            "terrarium" => Ok(Self::Terrarium),
            other => Err(DecodeError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Options for the raster height decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodeOptions {
    /// Grid segments along the X axis; the grid has one more vertex column.
    pub width_segments: u32,
    /// Grid segments along the Y axis; the grid has one more vertex row.
    pub height_segments: u32,
    pub dem_encoding: DemEncoding,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            width_segments: DEFAULT_SEGMENTS,
            height_segments: DEFAULT_SEGMENTS,
            dem_encoding: DemEncoding::default(),
        }
    }
}

impl DecodeOptions {
    #[must_use]
    pub fn with_segments(mut self, width_segments: u32, height_segments: u32) -> Self {
        self.width_segments = width_segments;
        self.height_segments = height_segments;
        self
    }

    #[must_use]
    pub fn with_dem_encoding(mut self, dem_encoding: DemEncoding) -> Self {
        self.dem_encoding = dem_encoding;
        self
    }

    /// Check the options before they are used for decoding.
    pub fn validate(&self) -> DecodeResult<()> {
        if self.width_segments == 0 || self.height_segments == 0 {
            return Err(DecodeError::InvalidOptions(format!(
                "segment counts must be positive, got {}x{}",
                self.width_segments, self.height_segments
            )));
        }
        if u32::try_from(grid_vertex_count(self.width_segments, self.height_segments)).is_err() {
            return Err(DecodeError::InvalidOptions(format!(
                "{}x{} segments exceed the addressable vertex count",
                self.width_segments, self.height_segments
            )));
        }
        Ok(())
    }

    /// Vertex columns in the output grid.
    #[must_use]
    pub fn grid_width(&self) -> u32 {
        self.width_segments + 1
    }

    /// Vertex rows in the output grid.
    #[must_use]
    pub fn grid_height(&self) -> u32 {
        self.height_segments + 1
    }
}
