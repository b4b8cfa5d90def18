//! PNG heightmap decoding.
//!
//! A raster tile is sampled onto a regular grid of
//! `(width_segments + 1) x (height_segments + 1)` vertices. The raster size must
//! be an exact multiple of the grid size so every vertex lands on a pixel; the
//! nearest pixel is used, no interpolation happens.

use std::sync::Arc;

use image::ImageFormat;

use crate::error::{DecodeError, DecodeResult};
use crate::grid::{GridIndexCache, build_grid_index};
use crate::model::{
    AttributeBuffer, AttributeKind, DecodedTile, Geometry, HeightRange, IndexBuffer,
    VertexAttribute, uvs_from_positions,
};
use crate::options::{DecodeOptions, DemEncoding};

/// Offset applied to terrarium heights so sea level sits mid-range.
const TERRARIUM_OFFSET: f32 = 32768.0;

/// Decode a `float32` pixel: a little-endian IEEE-754 single.
#[must_use]
pub fn decode_float32_pixel(bytes: [u8; 4]) -> f32 {
    f32::from_le_bytes(bytes)
}

/// Decode a `terrarium` pixel from its red, green and blue channels.
#[must_use]
pub fn decode_terrarium_pixel([red, green, blue]: [u8; 3]) -> f32 {
    // Exact in f32: at most 16 integer bits plus 8 fraction bits.
    (f32::from(red) * 256.0 + f32::from(green) + f32::from(blue) / 256.0) - TERRARIUM_OFFSET
}

/// Decoded elevation of every source pixel plus the observed range.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    pub heights: Vec<f32>,
    pub min_height: f32,
    pub max_height: f32,
}

impl HeightField {
    /// Decode all pixels of a raw buffer with the given encoding.
    ///
    /// The range starts at `[0, 0]` rather than at the first sample, so it
    /// always includes sea level.
    pub fn from_pixels(data: &[u8], pixel_count: usize, encoding: DemEncoding) -> DecodeResult<Self> {
        let stride = encoding.bytes_per_pixel();
        let needed = pixel_count * stride;
        let Some(pixels) = data.get(..needed) else {
            return Err(DecodeError::Truncated {
                what: "pixel buffer",
                needed,
                available: data.len(),
            });
        };

        let heights: Vec<f32> = match encoding {
            DemEncoding::Float32 => pixels
                .chunks_exact(4)
                .map(|p| decode_float32_pixel([p[0], p[1], p[2], p[3]]))
                .collect(),
            DemEncoding::Terrarium => pixels
                .chunks_exact(3)
                .map(|p| decode_terrarium_pixel([p[0], p[1], p[2]]))
                .collect(),
        };

        let mut min_height = 0.0f32;
        let mut max_height = 0.0f32;
        for &height in &heights {
            if height > max_height {
                max_height = height;
            }
            if height < min_height {
                min_height = height;
            }
        }

        Ok(Self {
            heights,
            min_height,
            max_height,
        })
    }

    #[must_use]
    pub fn range(&self) -> HeightRange {
        HeightRange {
            min_height: self.min_height,
            max_height: self.max_height,
        }
    }
}

/// Decoder for PNG-encoded heightmaps with a fixed configuration.
#[derive(Debug, Clone)]
pub struct RasterDecoder {
    options: DecodeOptions,
    index: Arc<IndexBuffer>,
}

impl RasterDecoder {
    /// Validate the options and build the grid index once.
    pub fn new(options: DecodeOptions) -> DecodeResult<Self> {
        options.validate()?;
        let index = Arc::new(build_grid_index(
            options.width_segments,
            options.height_segments,
        ));
        Ok(Self { options, index })
    }

    /// Like [`RasterDecoder::new`], but reuses a grid index from `cache`.
    pub fn with_cache(options: DecodeOptions, cache: &GridIndexCache) -> DecodeResult<Self> {
        options.validate()?;
        let index = cache.get_or_build(options.width_segments, options.height_segments);
        Ok(Self { options, index })
    }

    #[must_use]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a PNG byte stream.
    pub fn decode(&self, bytes: &[u8]) -> DecodeResult<DecodedTile> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        self.decode_pixels(image.width(), image.height(), image.as_bytes())
    }

    /// Decode an already unpacked raster with native channel layout.
    pub fn decode_pixels(&self, width: u32, height: u32, data: &[u8]) -> DecodeResult<DecodedTile> {
        self.validate_dimensions(width, height)?;

        let pixel_count = width as usize * height as usize;
        let field = HeightField::from_pixels(data, pixel_count, self.options.dem_encoding)?;
        let positions = self.positions(width, height, &field);
        let uvs = uvs_from_positions(&positions);

        let geometry = Geometry::new(
            Arc::clone(&self.index),
            vec![
                VertexAttribute::new(AttributeKind::Position, AttributeBuffer::F32(positions), 3)
                    .with_metadata(field.range()),
                VertexAttribute::new(AttributeKind::Uv, AttributeBuffer::F32(uvs), 2),
            ],
        );
        Ok(DecodedTile::new(geometry))
    }

    fn validate_dimensions(&self, width: u32, height: u32) -> DecodeResult<()> {
        let grid_width = self.options.grid_width();
        let grid_height = self.options.grid_height();
        if !width.is_multiple_of(grid_width) || !height.is_multiple_of(grid_height) {
            return Err(DecodeError::DimensionMismatch {
                image_width: width,
                image_height: height,
                grid_width,
                grid_height,
            });
        }
        Ok(())
    }

    /// Sample the height field onto the grid as normalized `[x, y, z]` triples.
    fn positions(&self, width: u32, height: u32, field: &HeightField) -> Vec<f32> {
        let grid_width = self.options.grid_width() as usize;
        let grid_height = self.options.grid_height() as usize;
        let width_scale = width as usize / grid_width;
        let height_scale = height as usize / grid_height;

        let min = f64::from(field.min_height);
        let span = f64::from(field.max_height) - min;

        let mut positions = Vec::with_capacity(grid_width * grid_height * 3);
        for row in 0..grid_height {
            // Y is flipped so the first raster row ends up at the top.
            let y = 1.0 - row as f64 / (grid_height - 1) as f64;
            let pixel_row = row * height_scale * width as usize;
            for col in 0..grid_width {
                let x = col as f64 / (grid_width - 1) as f64;
                let z = if span == 0.0 {
                    0.0
                } else {
                    let sample = field.heights[pixel_row + col * width_scale];
                    (f64::from(sample) - min) / span
                };
                positions.extend([x as f32, y as f32, z as f32]);
            }
        }
        positions
    }
}

/// Decode a PNG heightmap in one call.
pub fn decode_raster(bytes: &[u8], options: &DecodeOptions) -> DecodeResult<DecodedTile> {
    RasterDecoder::new(*options)?.decode(bytes)
}
