//! Concurrent tile decoding on the Tokio blocking pool.
//!
//! Decoding is CPU-bound and synchronous, so each tile is handed to
//! [`tokio::task::spawn_blocking`]. The decoder is shared read-only between
//! tasks; the only shared state is the append-only grid index cache.

use std::sync::Arc;

use terrain_decode::{DecodedTile, GridIndexCache};

use crate::config::DecoderConfig;
use crate::decoder::TileDecoder;
use crate::error::Result;

/// Decodes tiles of one configured format in the background.
#[derive(Debug, Clone)]
pub struct DecodeService {
    decoder: Arc<TileDecoder>,
    cache: Arc<GridIndexCache>,
}

impl DecodeService {
    /// Create a service with its own grid index cache.
    pub fn new(config: &DecoderConfig) -> Result<Self> {
        Self::with_cache(config, Arc::new(GridIndexCache::new()))
    }

    /// Create a service that shares `cache` with other services.
    pub fn with_cache(config: &DecoderConfig, cache: Arc<GridIndexCache>) -> Result<Self> {
        let decoder = TileDecoder::from_config(config, &cache)?;
        tracing::info!(
            format = %decoder.format(),
            width_segments = config.width_segments,
            height_segments = config.height_segments,
            dem_encoding = %config.dem_encoding,
            "Configured tile decoder"
        );
        Ok(Self {
            decoder: Arc::new(decoder),
            cache,
        })
    }

    /// Swap in a decoder for a new configuration.
    ///
    /// Decodes already in flight finish with the previous decoder.
    pub fn reconfigure(&mut self, config: &DecoderConfig) -> Result<()> {
        *self = Self::with_cache(config, Arc::clone(&self.cache))?;
        Ok(())
    }

    #[must_use]
    pub fn decoder(&self) -> &TileDecoder {
        &self.decoder
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<GridIndexCache> {
        &self.cache
    }

    /// Decode one tile on the blocking pool, inside a `decode_tile` span.
    pub async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedTile> {
        let span = tracing::info_span!(
            "decode_tile",
            format = %self.decoder.format(),
            bytes = bytes.len()
        );
        let decoder = Arc::clone(&self.decoder);
        let blocking_span = span.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _entered = blocking_span.enter();
            decoder.decode(&bytes)
        });

        let result = task.await?;
        span.in_scope(|| match result {
            Ok(tile) => {
                if let Some(geometry) = tile.geometry() {
                    tracing::debug!(
                        vertices = geometry.vertex_count(),
                        triangles = geometry.triangle_count(),
                        "Decoded tile"
                    );
                }
                Ok(tile)
            }
            Err(e) => {
                tracing::warn!("Failed to decode tile: {}", e);
                Err(e.into())
            }
        })
    }

    /// Decode several tiles concurrently. Results keep the input order.
    pub async fn decode_many(&self, tiles: Vec<Vec<u8>>) -> Vec<Result<DecodedTile>> {
        let handles: Vec<_> = tiles
            .into_iter()
            .map(|bytes| {
                let service = self.clone();
                tokio::spawn(async move { service.decode(bytes).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.map_err(Into::into).and_then(|result| result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileFormat;
    use crate::error::Error;
    use glam::DVec3;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use terrain_decode::quantized_mesh::{EdgeIndices, Extensions};
    use terrain_decode::{
        DecodeError, IndexBuffer, QuantizedMesh, QuantizedMeshHeader, encode_quantized_mesh,
    };

    fn terrarium_png(width: u32, height: u32, red: u8) -> Vec<u8> {
        let image = ImageBuffer::from_pixel(width, height, Rgb([red, 0, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn mesh_bytes() -> Vec<u8> {
        encode_quantized_mesh(&QuantizedMesh {
            header: QuantizedMeshHeader {
                center: DVec3::ZERO,
                min_height: 0.0,
                max_height: 100.0,
                bounding_sphere_center: DVec3::ZERO,
                bounding_sphere_radius: 1.0,
                horizon_occlusion_point: DVec3::ZERO,
            },
            vertex_data: vec![0, 32767, 0, 0, 0, 32767, 0, 100, 200],
            triangle_indices: IndexBuffer::U16(vec![0, 1, 2]),
            edge_indices: EdgeIndices::default(),
            extensions: Extensions::default(),
        })
        .unwrap()
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn raster_config(segments: u32) -> DecoderConfig {
        DecoderConfig {
            width_segments: segments,
            height_segments: segments,
            ..DecoderConfig::default()
        }
    }

    #[tokio::test]
    async fn decodes_raster_tile() {
        init_tracing();
        let service = DecodeService::new(&raster_config(3)).unwrap();
        let tile = service.decode(terrarium_png(8, 8, 130)).await.unwrap();
        let geometry = tile.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 16);
        assert_eq!(geometry.triangle_count(), 18);
    }

    #[tokio::test]
    async fn decodes_mesh_tile() {
        init_tracing();
        let service =
            DecodeService::new(&DecoderConfig::for_format(TileFormat::QuantizedMesh)).unwrap();
        let tile = service.decode(mesh_bytes()).await.unwrap();
        assert_eq!(tile.geometry().unwrap().vertex_count(), 3);
    }

    #[tokio::test]
    async fn errors_reach_the_caller() {
        init_tracing();
        let service = DecodeService::new(&raster_config(1)).unwrap();
        let err = service.decode(terrarium_png(3, 3, 128)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn decode_many_keeps_order() {
        init_tracing();
        let service = DecodeService::new(&raster_config(1)).unwrap();
        let tiles = vec![
            terrarium_png(2, 2, 129),
            terrarium_png(3, 3, 129),
            terrarium_png(4, 4, 127),
        ];
        let results = service.decode_many(tiles).await;
        assert_eq!(results.len(), 3);

        let first = results[0].as_ref().unwrap().geometry().unwrap();
        assert_eq!(first.height_range().unwrap().max_height, 256.0);
        assert!(results[1].is_err());
        let third = results[2].as_ref().unwrap().geometry().unwrap();
        assert_eq!(third.height_range().unwrap().min_height, -256.0);
    }

    #[tokio::test]
    async fn reconfigure_shares_cache() {
        init_tracing();
        let mut service = DecodeService::new(&raster_config(2)).unwrap();
        let cache = Arc::clone(service.cache());
        service.reconfigure(&raster_config(5)).unwrap();
        service.reconfigure(&raster_config(2)).unwrap();
        assert!(Arc::ptr_eq(&cache, service.cache()));
        assert_eq!(cache.len(), 2);

        service
            .reconfigure(&DecoderConfig::for_format(TileFormat::QuantizedMesh))
            .unwrap();
        assert_eq!(service.decoder().format(), TileFormat::QuantizedMesh);
    }
}
