//! Tiling-plan computation
//!
//! The planner is a pure function from page dimensions to an ordered
//! sequence of viewport-sized tiles. Tiles cover `[0, full_height)` with
//! no gaps and no overlaps; the final tile is clipped so the draw heights
//! sum to `full_height` exactly.

use crate::{Error, Result};

/// Page dimensions in device-independent pixels, measured once at
/// pipeline start and treated as immutable for the duration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    /// Width of the visible viewport
    pub viewport_width: u32,
    /// Height of the visible viewport
    pub viewport_height: u32,
    /// Full scrollable height of the document
    pub full_height: u32,
}

/// One viewport-sized capture slot at a specific scroll offset.
///
/// Only the first `draw_height` rows of the captured image are
/// authoritative for this tile; anything below is re-captured by the
/// next tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Position of this tile in the plan (capture order)
    pub index: usize,
    /// Scroll offset the document must be at when this tile is captured
    pub scroll_offset: u32,
    /// Number of rows of the captured image that belong to this tile
    pub draw_height: u32,
}

/// Ordered tile sequence covering the whole document exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlan {
    tiles: Vec<Tile>,
}

impl TilePlan {
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Compute the tile plan for a page.
///
/// Tile 0 starts at offset 0 with `draw_height = min(viewport_height,
/// full_height)`; each subsequent tile advances the offset by the
/// previous tile's draw height, and the last tile is clipped to
/// `full_height - offset`. A document no taller than the viewport yields
/// a single tile.
pub fn plan_tiles(geometry: &PageGeometry) -> Result<TilePlan> {
    if geometry.viewport_height == 0 {
        return Err(Error::InvalidGeometry(
            "viewport height must be positive".to_string(),
        ));
    }
    if geometry.viewport_width == 0 {
        return Err(Error::InvalidGeometry(
            "viewport width must be positive".to_string(),
        ));
    }

    let mut tiles = vec![Tile {
        index: 0,
        scroll_offset: 0,
        draw_height: geometry.viewport_height.min(geometry.full_height),
    }];

    let mut offset = tiles[0].draw_height;
    while offset < geometry.full_height {
        let draw_height = geometry.viewport_height.min(geometry.full_height - offset);
        tiles.push(Tile {
            index: tiles.len(),
            scroll_offset: offset,
            draw_height,
        });
        offset += draw_height;
    }

    Ok(TilePlan { tiles })
}
