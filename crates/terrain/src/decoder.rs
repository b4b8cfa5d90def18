//! Decoder selection by tile format.

use terrain_decode::{
    DecodeResult, DecodedTile, GridIndexCache, QuantizedMeshDecoder, RasterDecoder,
};

use crate::config::{DecoderConfig, TileFormat};
use crate::error::Result;

/// A configured decoder for one tile format.
#[derive(Debug, Clone)]
pub enum TileDecoder {
    Raster(RasterDecoder),
    QuantizedMesh(QuantizedMeshDecoder),
}

impl TileDecoder {
    /// Build the decoder `config` asks for.
    ///
    /// Raster decoders take their grid index from `cache`, so decoders with
    /// the same segment counts share one buffer.
    pub fn from_config(config: &DecoderConfig, cache: &GridIndexCache) -> Result<Self> {
        Ok(match config.format {
            TileFormat::Raster => {
                Self::Raster(RasterDecoder::with_cache(config.decode_options()?, cache)?)
            }
            TileFormat::QuantizedMesh => Self::QuantizedMesh(QuantizedMeshDecoder),
        })
    }

    #[must_use]
    pub fn format(&self) -> TileFormat {
        match self {
            Self::Raster(_) => TileFormat::Raster,
            Self::QuantizedMesh(_) => TileFormat::QuantizedMesh,
        }
    }

    /// Decode one tile synchronously.
    pub fn decode(&self, bytes: &[u8]) -> DecodeResult<DecodedTile> {
        match self {
            Self::Raster(decoder) => decoder.decode(bytes),
            Self::QuantizedMesh(decoder) => decoder.decode(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use terrain_decode::DecodeError;

    #[test]
    fn selects_by_format() {
        let cache = GridIndexCache::new();
        let raster = TileDecoder::from_config(&DecoderConfig::default(), &cache).unwrap();
        assert_eq!(raster.format(), TileFormat::Raster);
        assert_eq!(cache.len(), 1);

        let mesh = TileDecoder::from_config(
            &DecoderConfig::for_format(TileFormat::QuantizedMesh),
            &cache,
        )
        .unwrap();
        assert_eq!(mesh.format(), TileFormat::QuantizedMesh);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn raster_options_are_validated_up_front() {
        let config = DecoderConfig {
            height_segments: 0,
            ..DecoderConfig::default()
        };
        let err = TileDecoder::from_config(&config, &GridIndexCache::new()).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::InvalidOptions(_))));
    }

    #[test]
    fn mesh_decoder_ignores_raster_options() {
        let config = DecoderConfig {
            format: TileFormat::QuantizedMesh,
            dem_encoding: "unknown".into(),
            ..DecoderConfig::default()
        };
        assert!(TileDecoder::from_config(&config, &GridIndexCache::new()).is_ok());
    }

    #[test]
    fn decode_errors_pass_through() {
        let decoder = TileDecoder::from_config(
            &DecoderConfig::for_format(TileFormat::QuantizedMesh),
            &GridIndexCache::new(),
        )
        .unwrap();
        let err = decoder.decode(&[0; 10]).unwrap_err();
        assert!(err.is_malformed_payload());
    }
}
