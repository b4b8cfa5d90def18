//! Decoded tile geometry model shared by both decoders.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::normals;

/// Largest vertex count that can still be addressed with 16-bit indices.
pub const MAX_U16_VERTEX_COUNT: usize = 1 << 16;

/// Triangle index buffer, sized to the vertex count it addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Allocate an empty buffer whose element width suits `vertex_count`.
    ///
    /// The width is chosen here, before any index is written, so callers
    /// never have to widen a buffer after overflowing it.
    #[must_use]
    pub fn for_vertex_count(vertex_count: usize, capacity: usize) -> Self {
        if vertex_count <= MAX_U16_VERTEX_COUNT {
            Self::U16(Vec::with_capacity(capacity))
        } else {
            Self::U32(Vec::with_capacity(capacity))
        }
    }

    /// Append an index. The caller guarantees it fits the element width.
    pub(crate) fn push(&mut self, index: u32) {
        match self {
            Self::U16(indices) => {
                debug_assert!(u16::try_from(index).is_ok());
                indices.push(index as u16);
            }
            Self::U32(indices) => indices.push(index),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U16(indices) => indices.len(),
            Self::U32(indices) => indices.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether indices are stored as 16-bit integers.
    #[must_use]
    pub fn is_u16(&self) -> bool {
        matches!(self, Self::U16(_))
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Self::U16(indices) => indices.get(i).map(|&v| u32::from(v)),
            Self::U32(indices) => indices.get(i).copied(),
        }
    }

    /// Iterate indices widened to `u32`.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (narrow, wide) = match self {
            Self::U16(indices) => (indices.as_slice(), &[][..]),
            Self::U32(indices) => (&[][..], indices.as_slice()),
        };
        narrow
            .iter()
            .map(|&v| u32::from(v))
            .chain(wide.iter().copied())
    }
}

/// Height range of a tile in world units, used to de-normalize `position.z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRange {
    pub min_height: f32,
    pub max_height: f32,
}

impl HeightRange {
    /// Map a normalized height back to world units.
    #[must_use]
    pub fn denormalize(&self, z: f32) -> f32 {
        z * (self.max_height - self.min_height) + self.min_height
    }
}

/// Which vertex attribute a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Position,
    Uv,
    OctNormal,
}

impl AttributeKind {
    /// Attribute name as consumed by renderers.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Uv => "uv",
            Self::OctNormal => "octNormal",
        }
    }
}

/// Typed storage for a vertex attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeBuffer {
    F32(Vec<f32>),
    U8(Vec<u8>),
}

impl AttributeBuffer {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(values) => values.len(),
            Self::U8(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(values) => Some(values),
            Self::U8(_) => None,
        }
    }

    #[must_use]
    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Self::U8(values) => Some(values),
            Self::F32(_) => None,
        }
    }
}

/// A named per-vertex attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    pub kind: AttributeKind,
    pub buffer: AttributeBuffer,
    /// Number of buffer elements per vertex.
    pub item_count: usize,
    pub metadata: Option<HeightRange>,
}

impl VertexAttribute {
    #[must_use]
    pub fn new(kind: AttributeKind, buffer: AttributeBuffer, item_count: usize) -> Self {
        Self {
            kind,
            buffer,
            item_count,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: HeightRange) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.buffer.len() / self.item_count
    }
}

/// A single indexed triangle mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub index: Arc<IndexBuffer>,
    pub vertex_attributes: Vec<VertexAttribute>,
}

impl Geometry {
    /// Build a geometry. All attributes must describe the same number of vertices.
    #[must_use]
    pub fn new(index: Arc<IndexBuffer>, vertex_attributes: Vec<VertexAttribute>) -> Self {
        debug_assert!(
            vertex_attributes
                .windows(2)
                .all(|pair| pair[0].vertex_count() == pair[1].vertex_count()),
            "vertex attributes disagree on vertex count"
        );
        Self {
            index,
            vertex_attributes,
        }
    }

    #[must_use]
    pub fn attribute(&self, kind: AttributeKind) -> Option<&VertexAttribute> {
        self.vertex_attributes.iter().find(|attr| attr.kind == kind)
    }

    /// Interleaved `[x, y, z, ...]` positions.
    #[must_use]
    pub fn positions(&self) -> &[f32] {
        self.attribute(AttributeKind::Position)
            .and_then(|attr| attr.buffer.as_f32())
            .unwrap_or_default()
    }

    /// Interleaved `[u, v, ...]` texture coordinates.
    #[must_use]
    pub fn uvs(&self) -> &[f32] {
        self.attribute(AttributeKind::Uv)
            .and_then(|attr| attr.buffer.as_f32())
            .unwrap_or_default()
    }

    /// Interleaved octahedral normal bytes, if the tile carries normals.
    #[must_use]
    pub fn oct_normals(&self) -> Option<&[u8]> {
        self.attribute(AttributeKind::OctNormal)
            .and_then(|attr| attr.buffer.as_u8())
    }

    #[must_use]
    pub fn height_range(&self) -> Option<HeightRange> {
        self.attribute(AttributeKind::Position)
            .and_then(|attr| attr.metadata)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_attributes
            .first()
            .map_or(0, VertexAttribute::vertex_count)
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.index.len() / 3
    }

    /// Scale normalized positions into tile-local world units.
    ///
    /// X and Y are centered on the tile origin; Z is mapped back through the
    /// position metadata height range (left normalized if there is none).
    #[must_use]
    pub fn scaled_positions(&self, tile_size: Vec2) -> Vec<Vec3> {
        let range = self.height_range();
        self.positions()
            .chunks_exact(3)
            .map(|p| {
                let z = range.map_or(p[2], |range| range.denormalize(p[2]));
                Vec3::new(
                    p[0] * tile_size.x - tile_size.x / 2.0,
                    p[1] * tile_size.y - tile_size.y / 2.0,
                    z,
                )
            })
            .collect()
    }

    /// Unit normals reconstructed from the `octNormal` attribute.
    #[must_use]
    pub fn decoded_normals(&self) -> Option<Vec<Vec3>> {
        self.oct_normals().map(|bytes| {
            bytes
                .chunks_exact(2)
                .map(|pair| normals::oct_decode(pair[0], pair[1]))
                .collect()
        })
    }

    /// Smooth normals computed from the normalized positions and triangles.
    #[must_use]
    pub fn compute_vertex_normals(&self) -> Vec<Vec3> {
        let positions: Vec<Vec3> = self
            .positions()
            .chunks_exact(3)
            .map(Vec3::from_slice)
            .collect();
        normals::compute_vertex_normals(&positions, &self.index)
    }
}

/// Output of a decoder: the geometry of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    /// Always exactly one geometry for tiles produced by this crate.
    pub geometries: Vec<Geometry>,
}

impl DecodedTile {
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometries: vec![geometry],
        }
    }

    /// The tile's primary geometry.
    #[must_use]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometries.first()
    }

    #[must_use]
    pub fn contains_oct_normals(&self) -> bool {
        self.geometry()
            .is_some_and(|geometry| geometry.attribute(AttributeKind::OctNormal).is_some())
    }
}

/// Drop the z component of interleaved positions to form a UV map.
pub(crate) fn uvs_from_positions(positions: &[f32]) -> Vec<f32> {
    positions
        .chunks_exact(3)
        .flat_map(|p| [p[0], p[1]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Geometry {
        let positions = vec![
            0.0, 1.0, 0.0, //
            0.0, 0.0, 0.5, //
            1.0, 1.0, 0.5, //
            1.0, 0.0, 1.0,
        ];
        let uvs = uvs_from_positions(&positions);
        Geometry::new(
            Arc::new(IndexBuffer::U16(vec![0, 1, 2, 1, 3, 2])),
            vec![
                VertexAttribute::new(AttributeKind::Position, AttributeBuffer::F32(positions), 3)
                    .with_metadata(HeightRange {
                        min_height: -100.0,
                        max_height: 300.0,
                    }),
                VertexAttribute::new(AttributeKind::Uv, AttributeBuffer::F32(uvs), 2),
            ],
        )
    }

    #[test]
    fn index_width_follows_vertex_count() {
        assert!(IndexBuffer::for_vertex_count(MAX_U16_VERTEX_COUNT, 0).is_u16());
        assert!(!IndexBuffer::for_vertex_count(MAX_U16_VERTEX_COUNT + 1, 0).is_u16());
    }

    #[test]
    fn index_iter_widens() {
        let narrow = IndexBuffer::U16(vec![1, 2, 65535]);
        let wide = IndexBuffer::U32(vec![1, 2, 70000]);
        assert_eq!(narrow.iter().collect::<Vec<_>>(), vec![1, 2, 65535]);
        assert_eq!(wide.iter().collect::<Vec<_>>(), vec![1, 2, 70000]);
        assert_eq!(wide.get(2), Some(70000));
        assert_eq!(wide.get(3), None);
    }

    #[test]
    fn uv_drops_z() {
        let uvs = uvs_from_positions(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(uvs, vec![0.1, 0.2, 0.4, 0.5]);
    }

    #[test]
    fn geometry_accessors() {
        let geometry = quad();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.uvs().len(), 8);
        assert!(geometry.oct_normals().is_none());
        assert!(geometry.decoded_normals().is_none());
        assert_eq!(geometry.attribute(AttributeKind::Uv).map(VertexAttribute::name), Some("uv"));

        let tile = DecodedTile::new(geometry);
        assert!(!tile.contains_oct_normals());
    }

    #[test]
    fn scaled_positions_center_and_denormalize() {
        let scaled = quad().scaled_positions(Vec2::new(200.0, 100.0));
        assert_eq!(scaled[0], Vec3::new(-100.0, 50.0, -100.0));
        assert_eq!(scaled[1], Vec3::new(-100.0, -50.0, 100.0));
        assert_eq!(scaled[3], Vec3::new(100.0, -50.0, 300.0));
    }

    #[test]
    fn computed_normals_point_up_on_flat_grid() {
        let positions = vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let uvs = uvs_from_positions(&positions);
        let geometry = Geometry::new(
            Arc::new(IndexBuffer::U16(vec![0, 1, 2, 1, 3, 2])),
            vec![
                VertexAttribute::new(AttributeKind::Position, AttributeBuffer::F32(positions), 3),
                VertexAttribute::new(AttributeKind::Uv, AttributeBuffer::F32(uvs), 2),
            ],
        );
        for normal in geometry.compute_vertex_normals() {
            assert!((normal - Vec3::Z).length() < 1e-6, "{normal}");
        }
    }
}
