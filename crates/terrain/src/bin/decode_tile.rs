//! Decode terrain tiles from disk and print a JSON summary of each.
//!
//! Run: `cargo run -p terrain --features tools --bin decode_tile -- [options] <tile>...`
//!
//! Options:
//! - `--format <raster|png|quantized-mesh|terrain>`: force the tile format
//!   (otherwise guessed from the extension, then `TERRAIN_FORMAT`)
//! - `--tile-size <x>,<y>`: also report world-space bounds for this tile size
//!
//! Raster settings come from `TERRAIN_WIDTH_SEGMENTS`,
//! `TERRAIN_HEIGHT_SEGMENTS` and `TERRAIN_DEM_ENCODING`.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use terrain::decode::{DecodedTile, GridIndexCache};
use terrain::{DecodeService, DecoderConfig, TileFormat};

struct Args {
    format: Option<TileFormat>,
    tile_size: Option<Vec2>,
    paths: Vec<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        format: None,
        tile_size: None,
        paths: Vec::new(),
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--format" => {
                let value = iter.next().ok_or("--format needs a value")?;
                args.format = Some(value.parse().map_err(|e| format!("{e}"))?);
            }
            "--tile-size" => {
                let value = iter.next().ok_or("--tile-size needs a value")?;
                let (x, y) = value
                    .split_once(',')
                    .ok_or_else(|| format!("expected <x>,<y>, got {value}"))?;
                let parse = |s: &str| {
                    s.trim()
                        .parse::<f32>()
                        .map_err(|e| format!("bad tile size {s}: {e}"))
                };
                args.tile_size = Some(Vec2::new(parse(x)?, parse(y)?));
            }
            _ => args.paths.push(PathBuf::from(arg)),
        }
    }
    if args.paths.is_empty() {
        return Err("usage: decode_tile [--format F] [--tile-size X,Y] <tile>...".to_string());
    }
    Ok(args)
}

fn summarize(tile: &DecodedTile, tile_size: Option<Vec2>) -> serde_json::Value {
    let Some(geometry) = tile.geometry() else {
        return serde_json::json!({ "geometries": 0 });
    };
    let range = geometry.height_range();
    let bounds = tile_size.map(|size| {
        let scaled = geometry.scaled_positions(size);
        let min = scaled.iter().copied().fold(Vec3::INFINITY, Vec3::min);
        let max = scaled.iter().copied().fold(Vec3::NEG_INFINITY, Vec3::max);
        serde_json::json!({ "min": min.to_array(), "max": max.to_array() })
    });

    serde_json::json!({
        "geometries": tile.geometries.len(),
        "vertex_count": geometry.vertex_count(),
        "triangle_count": geometry.triangle_count(),
        "index_bits": if geometry.index.is_u16() { 16 } else { 32 },
        "min_height": range.map(|r| r.min_height),
        "max_height": range.map(|r| r.max_height),
        "oct_normals": tile.contains_oct_normals(),
        "first_positions": geometry.positions().chunks_exact(3).take(5).collect::<Vec<_>>(),
        "first_indices": geometry.index.iter().take(12).collect::<Vec<_>>(),
        "world_bounds": bounds,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = parse_args()?;
    let base = DecoderConfig::from_env()?;
    let cache = Arc::new(GridIndexCache::new());

    let mut summaries = Vec::new();
    for path in &args.paths {
        let format = args
            .format
            .or_else(|| TileFormat::from_path(path))
            .unwrap_or(base.format);
        let config = DecoderConfig {
            format,
            ..base.clone()
        };
        let service = DecodeService::with_cache(&config, Arc::clone(&cache))?;

        let bytes = fs::read(path)?;
        let summary = match service.decode(bytes).await {
            Ok(tile) => summarize(&tile, args.tile_size),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        summaries.push(serde_json::json!({
            "path": path.display().to_string(),
            "config": &config,
            "summary": summary,
        }));
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
