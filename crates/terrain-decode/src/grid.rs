//! Regular grid triangulation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::model::IndexBuffer;

/// Indices emitted per grid cell (two triangles).
const INDICES_PER_CELL: usize = 6;

/// Number of vertices in a grid with the given segment counts.
#[must_use]
pub fn grid_vertex_count(width_segments: u32, height_segments: u32) -> usize {
    (width_segments as usize + 1) * (height_segments as usize + 1)
}

/// Build the triangle index buffer for a `(w+1) x (h+1)` vertex grid.
///
/// Cells are visited row by row. Each cell emits the triangles
/// (top-left, bottom-left, top-right) and (bottom-left, bottom-right, top-right).
/// Indices are 16-bit when the grid has at most 65536 vertices.
#[must_use]
pub fn build_grid_index(width_segments: u32, height_segments: u32) -> IndexBuffer {
    let columns = width_segments as usize + 1;
    let cell_count = width_segments as usize * height_segments as usize;
    let mut index = IndexBuffer::for_vertex_count(
        grid_vertex_count(width_segments, height_segments),
        cell_count * INDICES_PER_CELL,
    );

    for row in 0..height_segments as usize {
        for col in 0..width_segments as usize {
            let top_left = (row * columns + col) as u32;
            let top_right = top_left + 1;
            let bottom_left = ((row + 1) * columns + col) as u32;
            let bottom_right = bottom_left + 1;

            for i in [
                top_left,
                bottom_left,
                top_right,
                bottom_left,
                bottom_right,
                top_right,
            ] {
                index.push(i);
            }
        }
    }

    index
}

/// Shared cache of grid index buffers keyed by segment counts.
///
/// Entries are only ever added, so a buffer handed out once stays valid and
/// identical for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct GridIndexCache {
    entries: RwLock<HashMap<(u32, u32), Arc<IndexBuffer>>>,
}

impl GridIndexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the index buffer for a grid, building it on first request.
    pub fn get_or_build(&self, width_segments: u32, height_segments: u32) -> Arc<IndexBuffer> {
        let key = (width_segments, height_segments);
        if let Some(index) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(index);
        }

        let built = Arc::new(build_grid_index(width_segments, height_segments));
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert(built))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
