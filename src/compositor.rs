//! Tile compositing
//!
//! The compositor owns a single RGBA surface sized (viewport width, full
//! document height) and paints each tile's authoritative slice at its
//! planned offset. Every tile after the first may contain, below the
//! fold, content that the next tile re-captures, so only the first
//! `draw_height` rows of a captured image are used.

use crate::geometry::{PageGeometry, Tile};
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use log::debug;
use std::borrow::Cow;
use std::io::Cursor;

/// Single mutable output surface, exclusively owned until `finish`.
#[derive(Debug)]
pub struct Compositor {
    surface: RgbaImage,
    viewport_width: u32,
    full_height: u32,
}

impl Compositor {
    /// Allocate the output surface. Fails before any page mutation if
    /// the surface would be empty.
    pub fn new(geometry: &PageGeometry) -> Result<Self> {
        if geometry.viewport_width == 0 || geometry.full_height == 0 {
            return Err(Error::InvalidGeometry(format!(
                "cannot allocate a {}x{} surface",
                geometry.viewport_width, geometry.full_height
            )));
        }
        Ok(Self {
            surface: RgbaImage::new(geometry.viewport_width, geometry.full_height),
            viewport_width: geometry.viewport_width,
            full_height: geometry.full_height,
        })
    }

    /// Decode one captured tile and paint rows `[0, draw_height)` of it
    /// at the tile's scroll offset.
    pub fn paste(&mut self, tile: &Tile, payload: &[u8]) -> Result<()> {
        let bytes = strip_data_url(payload)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| Error::DecodeFailed(format!("tile {}: {}", tile.index, e)))?
            .to_rgba8();

        if decoded.width() < self.viewport_width || decoded.height() < tile.draw_height {
            return Err(Error::DecodeFailed(format!(
                "tile {}: image is {}x{}, plan needs at least {}x{}",
                tile.index,
                decoded.width(),
                decoded.height(),
                self.viewport_width,
                tile.draw_height
            )));
        }
        if tile.scroll_offset + tile.draw_height > self.full_height {
            return Err(Error::DecodeFailed(format!(
                "tile {}: slice ends at row {} beyond the {}-row surface",
                tile.index,
                tile.scroll_offset + tile.draw_height,
                self.full_height
            )));
        }

        let slice = imageops::crop_imm(&decoded, 0, 0, self.viewport_width, tile.draw_height).to_image();
        imageops::replace(&mut self.surface, &slice, 0, i64::from(tile.scroll_offset));
        debug!(
            "composited tile {} into rows {}..{}",
            tile.index,
            tile.scroll_offset,
            tile.scroll_offset + tile.draw_height
        );
        Ok(())
    }

    /// Borrow the surface; used by tests to inspect painted rows.
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Encode the finished surface as PNG, transferring ownership of the
    /// pixels to the caller.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(self.surface)
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::Other(format!("PNG encode failed: {e}")))?;
        Ok(out.into_inner())
    }
}

/// Capture hosts that hand back `data:` URLs (browser extension capture
/// primitives do) get their base64 payload stripped here; raw image
/// bytes pass through untouched.
fn strip_data_url(payload: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !payload.starts_with(b"data:") {
        return Ok(Cow::Borrowed(payload));
    }
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::DecodeFailed("data URL is not valid UTF-8".to_string()))?;
    let (_, b64) = text
        .split_once(";base64,")
        .ok_or_else(|| Error::DecodeFailed("data URL is not base64-encoded".to_string()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| Error::DecodeFailed(format!("data URL payload: {e}")))?;
    Ok(Cow::Owned(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn geometry(viewport_width: u32, viewport_height: u32, full_height: u32) -> PageGeometry {
        PageGeometry { viewport_width, viewport_height, full_height }
    }

    /// Encode a viewport-sized PNG whose every pixel is `marker`.
    fn stamped_png(width: u32, height: u32, marker: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([marker, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn every_row_is_painted_exactly_once() {
        let g = geometry(4, 8, 20);
        let mut compositor = Compositor::new(&g).unwrap();

        // Plan: {0,8}, {8,8}, {16,4}; each tile image carries a unique marker.
        let tiles = [
            Tile { index: 0, scroll_offset: 0, draw_height: 8 },
            Tile { index: 1, scroll_offset: 8, draw_height: 8 },
            Tile { index: 2, scroll_offset: 16, draw_height: 4 },
        ];
        for tile in &tiles {
            compositor.paste(tile, &stamped_png(4, 8, 10 + tile.index as u8)).unwrap();
        }

        for y in 0..20 {
            let expected = match y {
                0..=7 => 10,
                8..=15 => 11,
                _ => 12,
            };
            for x in 0..4 {
                assert_eq!(compositor.surface().get_pixel(x, y)[0], expected, "row {y} col {x}");
            }
        }
    }

    #[test]
    fn only_the_authoritative_rows_of_a_tall_image_are_used() {
        let g = geometry(4, 8, 10);
        let mut compositor = Compositor::new(&g).unwrap();

        compositor
            .paste(&Tile { index: 0, scroll_offset: 0, draw_height: 8 }, &stamped_png(4, 8, 1))
            .unwrap();
        // Final tile: full viewport image, but only 2 rows belong to it.
        compositor
            .paste(&Tile { index: 1, scroll_offset: 8, draw_height: 2 }, &stamped_png(4, 8, 2))
            .unwrap();

        assert_eq!(compositor.surface().get_pixel(0, 7)[0], 1);
        assert_eq!(compositor.surface().get_pixel(0, 8)[0], 2);
        assert_eq!(compositor.surface().get_pixel(0, 9)[0], 2);
    }

    #[test]
    fn data_url_payloads_are_accepted() {
        let g = geometry(4, 8, 8);
        let mut compositor = Compositor::new(&g).unwrap();
        let data_url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(stamped_png(4, 8, 9))
        );
        compositor
            .paste(&Tile { index: 0, scroll_offset: 0, draw_height: 8 }, data_url.as_bytes())
            .unwrap();
        assert_eq!(compositor.surface().get_pixel(3, 7)[0], 9);
    }

    #[test]
    fn undecodable_tile_fails_with_decode_error() {
        let g = geometry(4, 8, 8);
        let mut compositor = Compositor::new(&g).unwrap();
        let err = compositor
            .paste(&Tile { index: 0, scroll_offset: 0, draw_height: 8 }, b"not a png")
            .unwrap_err();
        assert!(matches!(err, Error::DecodeFailed(_)));
    }

    #[test]
    fn image_smaller_than_the_planned_slice_is_rejected() {
        let g = geometry(4, 8, 8);
        let mut compositor = Compositor::new(&g).unwrap();
        let err = compositor
            .paste(&Tile { index: 0, scroll_offset: 0, draw_height: 8 }, &stamped_png(4, 4, 1))
            .unwrap_err();
        assert!(matches!(err, Error::DecodeFailed(_)));
    }

    #[test]
    fn finish_produces_a_png_with_the_surface_dimensions() {
        let g = geometry(4, 8, 12);
        let mut compositor = Compositor::new(&g).unwrap();
        compositor
            .paste(&Tile { index: 0, scroll_offset: 0, draw_height: 8 }, &stamped_png(4, 8, 1))
            .unwrap();
        compositor
            .paste(&Tile { index: 1, scroll_offset: 8, draw_height: 4 }, &stamped_png(4, 8, 2))
            .unwrap();

        let png = compositor.finish().unwrap();
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        let round = image::load_from_memory(&png).unwrap();
        assert_eq!((round.width(), round.height()), (4, 12));
    }

    #[test]
    fn zero_height_surface_is_rejected_before_any_mutation() {
        let err = Compositor::new(&geometry(4, 8, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }
}
