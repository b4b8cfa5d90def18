//! Error types for tile decoding.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors produced while decoding a terrain tile.
///
/// No variant ever carries partial geometry: a failed decode produces nothing.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The raster size is not a multiple of the grid vertex counts.
    #[error(
        "number of vertices in the plane must be a multiple of the number of pixels in the DEM tile \
         in both dimensions (DEM tile: {image_width}x{image_height} pixels, \
         plane geometry: {grid_width}x{grid_height} vertices)"
    )]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        grid_width: u32,
        grid_height: u32,
    },

    /// The requested DEM encoding is not known.
    #[error("\"{0}\" is unsupported DEM encoding")]
    UnsupportedEncoding(String),

    /// Decode options failed validation.
    #[error("invalid decode options: {0}")]
    InvalidOptions(String),

    /// The PNG container could not be decoded.
    #[error("failed to decode PNG: {0}")]
    Png(#[from] image::ImageError),

    /// The payload ended before a complete structure could be read.
    #[error("truncated {what}: needed {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// The quantized-mesh payload is structurally invalid.
    #[error("invalid quantized mesh: {0}")]
    InvalidMesh(String),
}

impl DecodeError {
    /// Whether the error comes from bytes that could not be parsed, as opposed
    /// to a configuration problem.
    #[must_use]
    pub fn is_malformed_payload(&self) -> bool {
        matches!(
            self,
            Self::Png(_) | Self::Truncated { .. } | Self::InvalidMesh(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_grouping() {
        let truncated = DecodeError::Truncated {
            what: "header",
            needed: 88,
            available: 4,
        };
        assert!(truncated.is_malformed_payload());
        assert!(DecodeError::InvalidMesh("bad".into()).is_malformed_payload());
        assert!(!DecodeError::UnsupportedEncoding("rgb".into()).is_malformed_payload());
        assert!(
            !DecodeError::DimensionMismatch {
                image_width: 3,
                image_height: 3,
                grid_width: 2,
                grid_height: 2,
            }
            .is_malformed_payload()
        );
    }

    #[test]
    fn unsupported_encoding_message_names_the_value() {
        let err = DecodeError::UnsupportedEncoding("mapbox".into());
        assert_eq!(err.to_string(), "\"mapbox\" is unsupported DEM encoding");
    }
}
