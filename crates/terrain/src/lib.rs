//! High-level terrain tile decoding.
//!
//! Wraps the pure decoders from [`terrain_decode`] with:
//!
//! - **Format selection**: [`TileDecoder`] is an explicit tagged choice
//!   between the raster and quantized-mesh decoders
//! - **Configuration**: [`DecoderConfig`] from defaults, JSON or `TERRAIN_*`
//!   environment variables
//! - **Concurrency**: [`DecodeService`] decodes tiles on Tokio's blocking pool
//!   with a shared grid index cache
//!
//! Fetching tile bytes is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use terrain::{DecodeService, DecoderConfig, TileFormat};
//!
//! # async fn run(bytes: Vec<u8>) -> terrain::Result<()> {
//! let service = DecodeService::new(&DecoderConfig::for_format(TileFormat::QuantizedMesh))?;
//! let tile = service.decode(bytes).await?;
//! println!("{} geometries", tile.geometries.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod decoder;
mod error;
mod service;

pub use config::{
    DecoderConfig, ENV_DEM_ENCODING, ENV_FORMAT, ENV_HEIGHT_SEGMENTS, ENV_WIDTH_SEGMENTS,
    TileFormat,
};
pub use decoder::TileDecoder;
pub use error::{Error, Result};
pub use service::DecodeService;

pub use terrain_decode as decode;
