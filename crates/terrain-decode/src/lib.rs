//! Decode elevation tiles into normalized, renderer-agnostic meshes.
//!
//! This crate provides pure synchronous decoders for the two terrain tile
//! formats: PNG heightmaps and quantized-mesh payloads. All functions are
//! designed to be called from any threading context - the library user
//! controls parallelism.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no I/O
//! - **Deterministic**: The same bytes and options always produce bit-identical buffers
//! - **No partial output**: A decode either returns a whole tile or an error
//!
//! # Key functions
//!
//! - [`decode_raster`]: Sample a PNG heightmap onto a regular grid
//! - [`decode_quantized_mesh`]: Normalize a pre-triangulated quantized-mesh tile
//! - [`build_grid_index`]: Triangulate a regular vertex grid
//! - [`oct_decode`]: Reconstruct a unit normal from its octahedral encoding
//!
//! Every decoded position lies in `[0, 1]³` local tile space. The height range
//! needed to map `z` back to meters travels as metadata on the `position`
//! attribute.

mod error;
mod reader;

pub mod grid;
pub mod model;
pub mod normals;
pub mod options;
pub mod quantized_mesh;
pub mod raster;

pub use error::{DecodeError, DecodeResult};
pub use grid::{GridIndexCache, build_grid_index, grid_vertex_count};
pub use model::{
    AttributeBuffer, AttributeKind, DecodedTile, Geometry, HeightRange, IndexBuffer,
    MAX_U16_VERTEX_COUNT, VertexAttribute,
};
pub use normals::{compute_vertex_normals, oct_decode, oct_encode};
pub use options::{DEFAULT_SEGMENTS, DecodeOptions, DemEncoding};
pub use quantized_mesh::{
    QuantizedMesh, QuantizedMeshDecoder, QuantizedMeshHeader, decode_parsed_mesh,
    decode_quantized_mesh, encode_quantized_mesh, parse_quantized_mesh,
};
pub use raster::{
    HeightField, RasterDecoder, decode_float32_pixel, decode_raster, decode_terrarium_pixel,
};
