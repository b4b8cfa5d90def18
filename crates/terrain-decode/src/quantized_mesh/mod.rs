//! Quantized-mesh tile decoding.
//!
//! Quantized-mesh tiles arrive pre-triangulated: the decoder only rescales the
//! 15-bit vertex coordinates into `[0, 1]`, interleaves them and forwards the
//! triangle indices and optional normals untouched.

mod encode;
mod parse;

use std::sync::Arc;

pub use encode::{encode_quantized_mesh, zig_zag_encode};
pub use parse::{
    EXTENSION_METADATA, EXTENSION_VERTEX_NORMALS, EXTENSION_WATER_MASK, EdgeIndices,
    Extensions, HEADER_SIZE, QuantizedMesh, QuantizedMeshHeader, WATER_MASK_SIZE, WaterMask,
    parse_quantized_mesh, zig_zag_decode,
};

use crate::error::DecodeResult;
use crate::model::{
    AttributeBuffer, AttributeKind, DecodedTile, Geometry, HeightRange, VertexAttribute,
    uvs_from_positions,
};

/// Largest quantized vertex coordinate.
pub const VERTEX_MAX_POSITION: u16 = 32767;

/// Convert component-major `[u.., v.., h..]` data into interleaved
/// `[x, y, z, ...]` positions scaled to `[0, 1]`.
#[must_use]
pub fn normalized_positions(vertex_data: &[u16]) -> Vec<f32> {
    let vertex_count = vertex_data.len() / 3;
    let (u, rest) = vertex_data.split_at(vertex_count);
    let (v, rest) = rest.split_at(vertex_count);
    let h = &rest[..vertex_count];

    let scale = f64::from(VERTEX_MAX_POSITION);
    u.iter()
        .zip(v)
        .zip(h)
        .flat_map(|((&u, &v), &h)| {
            [u, v, h].map(|c| (f64::from(c) / scale) as f32)
        })
        .collect()
}

/// Build the decoded tile for an already parsed mesh.
#[must_use]
pub fn decode_parsed_mesh(mesh: QuantizedMesh) -> DecodedTile {
    let positions = normalized_positions(&mesh.vertex_data);
    let uvs = uvs_from_positions(&positions);
    let range = HeightRange {
        min_height: mesh.header.min_height,
        max_height: mesh.header.max_height,
    };

    let mut vertex_attributes = vec![
        VertexAttribute::new(AttributeKind::Position, AttributeBuffer::F32(positions), 3)
            .with_metadata(range),
        VertexAttribute::new(AttributeKind::Uv, AttributeBuffer::F32(uvs), 2),
    ];
    if let Some(normals) = mesh.extensions.vertex_normals.filter(|n| !n.is_empty()) {
        vertex_attributes.push(VertexAttribute::new(
            AttributeKind::OctNormal,
            AttributeBuffer::U8(normals),
            2,
        ));
    }

    DecodedTile::new(Geometry::new(
        Arc::new(mesh.triangle_indices),
        vertex_attributes,
    ))
}

/// Decode a quantized-mesh payload in one call.
pub fn decode_quantized_mesh(bytes: &[u8]) -> DecodeResult<DecodedTile> {
    parse_quantized_mesh(bytes).map(decode_parsed_mesh)
}

/// Stateless quantized-mesh decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantizedMeshDecoder;

impl QuantizedMeshDecoder {
    pub fn decode(&self, bytes: &[u8]) -> DecodeResult<DecodedTile> {
        decode_quantized_mesh(bytes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::model::IndexBuffer;
    use glam::{DVec3, Vec3};

    /// A unit quad: two triangles over four corner vertices.
    pub(crate) fn sample_mesh() -> QuantizedMesh {
        QuantizedMesh {
            header: QuantizedMeshHeader {
                center: DVec3::new(1_000.0, 2_000.0, 3_000.0),
                min_height: -12.5,
                max_height: 1_250.0,
                bounding_sphere_center: DVec3::new(1_001.0, 2_001.0, 3_001.0),
                bounding_sphere_radius: 4_321.0,
                horizon_occlusion_point: DVec3::new(0.1, 0.2, 0.3),
            },
            vertex_data: vec![
                0, 0, 32767, 32767, // u
                32767, 0, 32767, 0, // v
                0, 16384, 8192, 32767, // height
            ],
            triangle_indices: IndexBuffer::U16(vec![0, 1, 2, 2, 1, 3]),
            edge_indices: EdgeIndices {
                west: vec![0, 1],
                south: vec![1, 3],
                east: vec![2, 3],
                north: vec![0, 2],
            },
            extensions: Extensions::default(),
        }
    }

    fn encoded(mesh: &QuantizedMesh) -> Vec<u8> {
        encode_quantized_mesh(mesh).unwrap()
    }

    #[test]
    fn positions_are_interleaved_and_normalized() {
        let positions = normalized_positions(&[0, 32767, 10, 20, 30, 40]);
        assert_eq!(
            positions,
            vec![
                0.0,
                (10.0f64 / 32767.0) as f32,
                (30.0f64 / 32767.0) as f32,
                1.0,
                (20.0f64 / 32767.0) as f32,
                (40.0f64 / 32767.0) as f32,
            ]
        );
    }

    #[test]
    fn decodes_sample_mesh() {
        let tile = decode_quantized_mesh(&encoded(&sample_mesh())).unwrap();
        let geometry = tile.geometry().unwrap();

        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(*geometry.index, IndexBuffer::U16(vec![0, 1, 2, 2, 1, 3]));
        assert_eq!(&geometry.positions()[..3], &[0.0, 1.0, 0.0]);
        assert_eq!(&geometry.positions()[9..], &[1.0, 0.0, 1.0]);
        assert_eq!(geometry.uvs(), &[0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        assert_eq!(
            geometry.height_range(),
            Some(HeightRange {
                min_height: -12.5,
                max_height: 1_250.0
            })
        );
        assert!(!tile.contains_oct_normals());
    }

    #[test]
    fn normals_become_oct_normal_attribute() {
        let mut mesh = sample_mesh();
        mesh.extensions.vertex_normals = Some(vec![128, 128, 128, 128, 255, 128, 128, 255]);
        let tile = decode_quantized_mesh(&encoded(&mesh)).unwrap();
        assert!(tile.contains_oct_normals());

        let geometry = tile.geometry().unwrap();
        let attribute = geometry.attribute(AttributeKind::OctNormal).unwrap();
        assert_eq!(attribute.name(), "octNormal");
        assert_eq!(attribute.item_count, 2);
        assert_eq!(attribute.vertex_count(), 4);

        let normals = geometry.decoded_normals().unwrap();
        assert!((normals[0] - Vec3::Z).length() < 0.02);
        assert!((normals[2] - Vec3::X).length() < 0.02);
        assert!((normals[3] - Vec3::Y).length() < 0.02);
    }

    #[test]
    fn empty_normals_are_omitted() {
        let mut mesh = sample_mesh();
        mesh.extensions.vertex_normals = Some(Vec::new());
        let tile = decode_parsed_mesh(mesh);
        assert!(!tile.contains_oct_normals());
    }

    #[test]
    fn truncated_payload_fails() {
        let bytes = encoded(&sample_mesh());
        let err = QuantizedMeshDecoder.decode(&bytes[..HEADER_SIZE + 2]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn deterministic() {
        let mut mesh = sample_mesh();
        mesh.extensions.vertex_normals = Some(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let bytes = encoded(&mesh);
        let a = decode_quantized_mesh(&bytes).unwrap();
        let b = decode_quantized_mesh(&bytes).unwrap();
        assert_eq!(a, b);
    }
}
