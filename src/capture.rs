//! Tile capture orchestration
//!
//! One tile at a time: scroll, wait for layout and paint to settle, then
//! issue a single bounded capture request. The capture service returns
//! whatever is currently visible, so it is a global resource tied to the
//! scroll state; the orchestrator never has more than one request in
//! flight and tiles are captured strictly in ascending index order.

use crate::dom::PageDom;
use crate::geometry::Tile;
use crate::{Error, Result};
use log::debug;
use std::time::Duration;

/// Identifier of the window whose visible region is captured.
pub type WindowId = u32;

/// External privileged primitive that snapshots the currently visible
/// region of a window. Must reflect the document's scroll state at call
/// time. The returned bytes are either a raw encoded image or a base64
/// `data:` URL; the compositor accepts both.
#[allow(async_fn_in_trait)]
pub trait CaptureService {
    async fn capture_visible(&mut self, window: WindowId) -> Result<Vec<u8>>;
}

/// Raw image for one tile, consumed by the compositor in index order and
/// discarded afterward.
#[derive(Debug, Clone)]
pub struct CapturedTile {
    pub tile_index: usize,
    pub bytes: Vec<u8>,
}

/// Drives the scroll → settle → capture cycle for individual tiles.
#[derive(Debug, Clone, Copy)]
pub struct TileOrchestrator {
    settle_delay: Duration,
    capture_timeout: Duration,
    window: WindowId,
}

impl TileOrchestrator {
    pub fn new(settle_delay: Duration, capture_timeout: Duration, window: WindowId) -> Self {
        Self { settle_delay, capture_timeout, window }
    }

    /// Capture one tile: scroll to its offset, wait the settle delay so
    /// layout, paint, and any suppression transition complete, then
    /// issue exactly one capture request and await it within the
    /// configured bound. A failure aborts the remaining plan; there are
    /// no retries at this layer.
    pub async fn capture_tile<D, C>(&self, dom: &mut D, service: &mut C, tile: &Tile) -> Result<CapturedTile>
    where
        D: PageDom,
        C: CaptureService,
    {
        debug!("capturing tile {} at offset {}", tile.index, tile.scroll_offset);
        dom.scroll_to(tile.scroll_offset).await?;
        tokio::time::sleep(self.settle_delay).await;

        let bytes = match tokio::time::timeout(self.capture_timeout, service.capture_visible(self.window)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err @ Error::CaptureFailed(_))) => return Err(err),
            Ok(Err(err)) => {
                return Err(Error::CaptureFailed(format!("tile {}: {}", tile.index, err)));
            }
            Err(_) => {
                return Err(Error::CaptureFailed(format!(
                    "tile {}: no response within {}ms",
                    tile.index,
                    self.capture_timeout.as_millis()
                )));
            }
        };

        Ok(CapturedTile { tile_index: tile.index, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementId, ElementStyle};
    use crate::geometry::PageGeometry;

    struct ScrollLog {
        offsets: Vec<u32>,
    }

    impl PageDom for ScrollLog {
        async fn geometry(&mut self) -> Result<PageGeometry> {
            Ok(PageGeometry { viewport_width: 10, viewport_height: 10, full_height: 30 })
        }

        async fn scroll_position(&mut self) -> Result<u32> {
            Ok(*self.offsets.last().unwrap_or(&0))
        }

        async fn scroll_to(&mut self, y: u32) -> Result<()> {
            self.offsets.push(y);
            Ok(())
        }

        async fn pinned_elements(&mut self) -> Result<Vec<(ElementId, ElementStyle)>> {
            Ok(Vec::new())
        }

        async fn hide_element(&mut self, _id: ElementId) -> Result<bool> {
            Ok(true)
        }

        async fn apply_style(&mut self, _id: ElementId, _style: &ElementStyle) -> Result<bool> {
            Ok(true)
        }
    }

    struct InstantCapture;

    impl CaptureService for InstantCapture {
        async fn capture_visible(&mut self, _window: WindowId) -> Result<Vec<u8>> {
            Ok(vec![1, 2, 3])
        }
    }

    struct StalledCapture;

    impl CaptureService for StalledCapture {
        async fn capture_visible(&mut self, _window: WindowId) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    struct FailingCapture;

    impl CaptureService for FailingCapture {
        async fn capture_visible(&mut self, _window: WindowId) -> Result<Vec<u8>> {
            Err(Error::Dom("tab went away".to_string()))
        }
    }

    fn tile(index: usize, scroll_offset: u32) -> Tile {
        Tile { index, scroll_offset, draw_height: 10 }
    }

    #[tokio::test(start_paused = true)]
    async fn scrolls_before_capturing() {
        let mut dom = ScrollLog { offsets: Vec::new() };
        let mut service = InstantCapture;
        let orchestrator =
            TileOrchestrator::new(Duration::from_millis(150), Duration::from_secs(10), 0);

        let captured = orchestrator.capture_tile(&mut dom, &mut service, &tile(1, 800)).await.unwrap();
        assert_eq!(captured.tile_index, 1);
        assert_eq!(captured.bytes, vec![1, 2, 3]);
        assert_eq!(dom.offsets, vec![800]);
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_service_becomes_capture_failed() {
        let mut dom = ScrollLog { offsets: Vec::new() };
        let mut service = StalledCapture;
        let orchestrator =
            TileOrchestrator::new(Duration::from_millis(150), Duration::from_millis(500), 0);

        let err = orchestrator.capture_tile(&mut dom, &mut service, &tile(0, 0)).await.unwrap_err();
        assert!(matches!(err, Error::CaptureFailed(_)), "got {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn service_errors_propagate_as_capture_failed() {
        let mut dom = ScrollLog { offsets: Vec::new() };
        let mut service = FailingCapture;
        let orchestrator =
            TileOrchestrator::new(Duration::from_millis(150), Duration::from_secs(10), 0);

        let err = orchestrator.capture_tile(&mut dom, &mut service, &tile(2, 1600)).await.unwrap_err();
        match err {
            Error::CaptureFailed(msg) => assert!(msg.contains("tab went away")),
            other => panic!("expected CaptureFailed, got {other:?}"),
        }
    }
}
