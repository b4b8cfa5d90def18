//! Quantized-mesh 1.0 container parsing.
//!
//! # Layout
//!
//! All values are little-endian.
//!
//! - Header, 88 bytes: tile center (3 × f64), min and max height (2 × f32),
//!   bounding sphere center and radius (4 × f64), horizon occlusion point (3 × f64).
//! - Vertex data: `u32` vertex count, then the `u`, `v` and `height` arrays
//!   (u16 each), every array zig-zag delta encoded.
//! - Index data: 32-bit indices when there are more than 65536 vertices,
//!   otherwise 16-bit, preceded by padding to the index width. A `u32`
//!   triangle count followed by high-water-mark encoded indices.
//! - Edge indices for the west, south, east and north edges: `u32` count and
//!   plain indices each.
//! - Extensions until the end of the payload: `u8` id, `u32` length, payload.

use glam::DVec3;

use crate::error::{DecodeError, DecodeResult};
use crate::model::{IndexBuffer, MAX_U16_VERTEX_COUNT};
use crate::reader::ByteReader;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 88;

/// Extension id of oct-encoded per-vertex normals.
pub const EXTENSION_VERTEX_NORMALS: u8 = 1;
/// Extension id of the water mask.
pub const EXTENSION_WATER_MASK: u8 = 2;
/// Extension id of the JSON metadata block.
pub const EXTENSION_METADATA: u8 = 4;

/// Side length of a full water mask grid.
pub const WATER_MASK_SIZE: usize = 256;

/// Fixed-size tile header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedMeshHeader {
    /// Tile center in Earth-centered fixed coordinates.
    pub center: DVec3,
    pub min_height: f32,
    pub max_height: f32,
    pub bounding_sphere_center: DVec3,
    pub bounding_sphere_radius: f64,
    pub horizon_occlusion_point: DVec3,
}

/// Vertices lying on each tile edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeIndices {
    pub west: Vec<u32>,
    pub south: Vec<u32>,
    pub east: Vec<u32>,
    pub north: Vec<u32>,
}

/// Water coverage of a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaterMask {
    /// The whole tile is land (0) or water (255).
    Uniform(u8),
    /// 256 × 256 coverage values, row-major from the north-west corner.
    Grid(Vec<u8>),
}

/// Optional extension blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    /// Two oct-encoded bytes per vertex.
    pub vertex_normals: Option<Vec<u8>>,
    pub water_mask: Option<WaterMask>,
    /// Raw JSON metadata text.
    pub metadata: Option<String>,
}

/// A parsed quantized-mesh tile.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMesh {
    pub header: QuantizedMeshHeader,
    /// All `u` values, then all `v` values, then all heights, each in `0..=32767`.
    pub vertex_data: Vec<u16>,
    pub triangle_indices: IndexBuffer,
    pub edge_indices: EdgeIndices,
    pub extensions: Extensions,
}

impl QuantizedMesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.len() / 3
    }
}

/// Undo zig-zag encoding of a signed delta.
#[must_use]
pub fn zig_zag_decode(value: u16) -> i16 {
    (value >> 1).cast_signed() ^ -(value & 1).cast_signed()
}

/// Decode one delta-encoded vertex component array in place.
fn decode_deltas(values: &mut [u16]) {
    let mut current = 0u16;
    for value in values {
        current = current.wrapping_add(zig_zag_decode(*value).cast_unsigned());
        *value = current;
    }
}

/// Undo high-water-mark encoding and check every index against `vertex_count`.
fn decode_high_water_mark(codes: &[u32], vertex_count: usize) -> DecodeResult<Vec<u32>> {
    let mut highest = 0u32;
    codes
        .iter()
        .map(|&code| {
            let index = highest.checked_sub(code).ok_or_else(|| {
                DecodeError::InvalidMesh(format!(
                    "index code {code} exceeds high-water mark {highest}"
                ))
            })?;
            if code == 0 {
                highest += 1;
            }
            check_index(index, vertex_count, "triangle")
        })
        .collect()
}

fn check_index(index: u32, vertex_count: usize, what: &str) -> DecodeResult<u32> {
    if index as usize >= vertex_count {
        return Err(DecodeError::InvalidMesh(format!(
            "{what} index {index} out of range for {vertex_count} vertices"
        )));
    }
    Ok(index)
}

fn read_dvec3(reader: &mut ByteReader<'_>) -> DecodeResult<DVec3> {
    Ok(DVec3::new(
        reader.f64("header")?,
        reader.f64("header")?,
        reader.f64("header")?,
    ))
}

fn read_header(reader: &mut ByteReader<'_>) -> DecodeResult<QuantizedMeshHeader> {
    Ok(QuantizedMeshHeader {
        center: read_dvec3(reader)?,
        min_height: reader.f32("header")?,
        max_height: reader.f32("header")?,
        bounding_sphere_center: read_dvec3(reader)?,
        bounding_sphere_radius: reader.f64("header")?,
        horizon_occlusion_point: read_dvec3(reader)?,
    })
}

fn read_vertex_data(reader: &mut ByteReader<'_>) -> DecodeResult<Vec<u16>> {
    let vertex_count = reader.u32("vertex count")? as usize;
    let mut vertex_data = reader.u16_array(vertex_count * 3, "vertex data")?;
    for component in vertex_data.chunks_exact_mut(vertex_count.max(1)) {
        decode_deltas(component);
    }
    Ok(vertex_data)
}

/// Read `count` indices at the width implied by the vertex count.
fn read_indices(
    reader: &mut ByteReader<'_>,
    count: usize,
    wide: bool,
    what: &'static str,
) -> DecodeResult<Vec<u32>> {
    if wide {
        reader.u32_array(count, what)
    } else {
        Ok(reader
            .u16_array(count, what)?
            .into_iter()
            .map(u32::from)
            .collect())
    }
}

fn read_edge(
    reader: &mut ByteReader<'_>,
    vertex_count: usize,
    wide: bool,
    what: &'static str,
) -> DecodeResult<Vec<u32>> {
    let count = reader.u32(what)? as usize;
    let indices = read_indices(reader, count, wide, what)?;
    for &index in &indices {
        check_index(index, vertex_count, what)?;
    }
    Ok(indices)
}

fn read_extensions(reader: &mut ByteReader<'_>, vertex_count: usize) -> DecodeResult<Extensions> {
    let mut extensions = Extensions::default();
    while !reader.is_empty() {
        let id = reader.u8("extension header")?;
        let length = reader.u32("extension header")? as usize;
        let payload = reader.bytes(length, "extension payload")?;

        match id {
            // An empty normals block is treated as absent.
            EXTENSION_VERTEX_NORMALS if payload.is_empty() => {}
            EXTENSION_VERTEX_NORMALS => {
                if payload.len() != vertex_count * 2 {
                    return Err(DecodeError::InvalidMesh(format!(
                        "vertex normals extension has {} bytes for {vertex_count} vertices",
                        payload.len()
                    )));
                }
                extensions.vertex_normals = Some(payload.to_vec());
            }
            EXTENSION_WATER_MASK => {
                extensions.water_mask = Some(match payload {
                    [value] => WaterMask::Uniform(*value),
                    grid if grid.len() == WATER_MASK_SIZE * WATER_MASK_SIZE => {
                        WaterMask::Grid(grid.to_vec())
                    }
                    other => {
                        return Err(DecodeError::InvalidMesh(format!(
                            "water mask extension has {} bytes",
                            other.len()
                        )));
                    }
                });
            }
            EXTENSION_METADATA => {
                let mut inner = ByteReader::new(payload);
                let json_length = inner.u32("metadata length")? as usize;
                let json = inner.bytes(json_length, "metadata")?;
                let text = std::str::from_utf8(json).map_err(|e| {
                    DecodeError::InvalidMesh(format!("metadata is not UTF-8: {e}"))
                })?;
                extensions.metadata = Some(text.to_string());
            }
            // Unknown extensions are skipped; their length is already consumed.
            _ => {}
        }
    }
    Ok(extensions)
}

/// Parse a quantized-mesh payload.
pub fn parse_quantized_mesh(bytes: &[u8]) -> DecodeResult<QuantizedMesh> {
    let mut reader = ByteReader::new(bytes);

    let header = read_header(&mut reader)?;
    let vertex_data = read_vertex_data(&mut reader)?;
    let vertex_count = vertex_data.len() / 3;

    let wide = vertex_count > MAX_U16_VERTEX_COUNT;
    let index_size = if wide { 4 } else { 2 };
    reader.align(index_size, "index padding")?;

    let triangle_count = reader.u32("triangle count")? as usize;
    let codes = read_indices(&mut reader, triangle_count * 3, wide, "triangle indices")?;
    let decoded = decode_high_water_mark(&codes, vertex_count)?;
    let triangle_indices = if wide {
        IndexBuffer::U32(decoded)
    } else {
        // Bounded by the vertex count checked above.
        IndexBuffer::U16(decoded.into_iter().map(|i| i as u16).collect())
    };

    let edge_indices = EdgeIndices {
        west: read_edge(&mut reader, vertex_count, wide, "west edge indices")?,
        south: read_edge(&mut reader, vertex_count, wide, "south edge indices")?,
        east: read_edge(&mut reader, vertex_count, wide, "east edge indices")?,
        north: read_edge(&mut reader, vertex_count, wide, "north edge indices")?,
    };

    let extensions = read_extensions(&mut reader, vertex_count)?;

    Ok(QuantizedMesh {
        header,
        vertex_data,
        triangle_indices,
        edge_indices,
        extensions,
    })
}
