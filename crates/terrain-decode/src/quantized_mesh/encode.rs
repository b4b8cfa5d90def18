//! Quantized-mesh serialization, the inverse of [`parse_quantized_mesh`].
//!
//! Used to produce fixtures and to re-emit edited tiles.
//!
//! [`parse_quantized_mesh`]: super::parse_quantized_mesh

use glam::DVec3;

use super::parse::{
    EXTENSION_METADATA, EXTENSION_VERTEX_NORMALS, EXTENSION_WATER_MASK, HEADER_SIZE,
    QuantizedMesh, WaterMask,
};
use crate::error::{DecodeError, DecodeResult};
use crate::model::MAX_U16_VERTEX_COUNT;

/// Zig-zag encode a signed delta.
#[must_use]
pub fn zig_zag_encode(value: i16) -> u16 {
    ((value << 1) ^ (value >> 15)).cast_unsigned()
}

fn put_dvec3(out: &mut Vec<u8>, v: DVec3) {
    for c in v.to_array() {
        out.extend(c.to_le_bytes());
    }
}

fn put_index(out: &mut Vec<u8>, index: u32, wide: bool) {
    if wide {
        out.extend(index.to_le_bytes());
    } else {
        out.extend((index as u16).to_le_bytes());
    }
}

fn put_len(out: &mut Vec<u8>, len: usize) -> DecodeResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| DecodeError::InvalidMesh(format!("{len} entries do not fit a u32 count")))?;
    out.extend(len.to_le_bytes());
    Ok(())
}

/// Serialize a mesh.
///
/// Fails when the triangle indices are not in high-water-mark order, i.e. a
/// triangle references a vertex more than one past the highest seen so far.
pub fn encode_quantized_mesh(mesh: &QuantizedMesh) -> DecodeResult<Vec<u8>> {
    let vertex_count = mesh.vertex_count();
    let wide = vertex_count > MAX_U16_VERTEX_COUNT;
    let mut out = Vec::with_capacity(HEADER_SIZE + mesh.vertex_data.len() * 2);

    let header = &mesh.header;
    put_dvec3(&mut out, header.center);
    out.extend(header.min_height.to_le_bytes());
    out.extend(header.max_height.to_le_bytes());
    put_dvec3(&mut out, header.bounding_sphere_center);
    out.extend(header.bounding_sphere_radius.to_le_bytes());
    put_dvec3(&mut out, header.horizon_occlusion_point);

    put_len(&mut out, vertex_count)?;
    for component in mesh.vertex_data.chunks_exact(vertex_count.max(1)) {
        let mut previous = 0u16;
        for &value in component {
            let delta = value.wrapping_sub(previous).cast_signed();
            out.extend(zig_zag_encode(delta).to_le_bytes());
            previous = value;
        }
    }

    let index_size = if wide { 4 } else { 2 };
    out.resize(out.len().next_multiple_of(index_size), 0);

    put_len(&mut out, mesh.triangle_indices.len() / 3)?;
    let mut highest = 0u32;
    for index in mesh.triangle_indices.iter() {
        let code = highest.checked_sub(index).ok_or_else(|| {
            DecodeError::InvalidMesh(format!(
                "index {index} skips ahead of high-water mark {highest}"
            ))
        })?;
        if code == 0 {
            highest += 1;
        }
        put_index(&mut out, code, wide);
    }

    let edges = &mesh.edge_indices;
    for edge in [&edges.west, &edges.south, &edges.east, &edges.north] {
        put_len(&mut out, edge.len())?;
        for &index in edge {
            put_index(&mut out, index, wide);
        }
    }

    let extensions = &mesh.extensions;
    if let Some(normals) = &extensions.vertex_normals {
        out.push(EXTENSION_VERTEX_NORMALS);
        put_len(&mut out, normals.len())?;
        out.extend(normals);
    }
    if let Some(mask) = &extensions.water_mask {
        let payload = match mask {
            WaterMask::Uniform(value) => std::slice::from_ref(value),
            WaterMask::Grid(grid) => grid.as_slice(),
        };
        out.push(EXTENSION_WATER_MASK);
        put_len(&mut out, payload.len())?;
        out.extend(payload);
    }
    if let Some(metadata) = &extensions.metadata {
        out.push(EXTENSION_METADATA);
        put_len(&mut out, metadata.len() + 4)?;
        put_len(&mut out, metadata.len())?;
        out.extend(metadata.as_bytes());
    }

    Ok(out)
}
