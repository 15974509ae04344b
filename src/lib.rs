//! Pagestitch
//!
//! Full-page screenshot pipeline: captures a document taller than the
//! visible viewport by scrolling through viewport-sized tiles, hides
//! fixed/sticky elements after the first tile so they appear exactly
//! once, and losslessly reassembles the tiles into one PNG.
//!
//! The pipeline talks to the page and to the privileged capture
//! primitive through the [`dom::PageDom`], [`capture::CaptureService`],
//! and [`delivery::Delivery`] traits, so it runs unchanged against a
//! CDP tab (feature `cdp`), a different host, or an in-memory test
//! double.
//!
//! # Example
//!
//! ```no_run
//! use pagestitch::{CaptureConfig, Pipeline};
//! use pagestitch::delivery::FileDelivery;
//!
//! # async fn capture(dom: impl pagestitch::dom::PageDom,
//! #                  service: impl pagestitch::capture::CaptureService)
//! #     -> pagestitch::Result<()> {
//! let config = CaptureConfig {
//!     settle_delay_ms: 150,
//!     ..Default::default()
//! };
//! let mut pipeline = Pipeline::new(dom, service, FileDelivery::new("."), config);
//! let outcome = pipeline.run().await?;
//! println!("captured {} tiles into {}", outcome.tile_count, outcome.filename);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod compositor;
pub mod delivery;
pub mod dom;
pub mod geometry;
pub mod pipeline;
pub mod suppress;

// Progress-overlay arithmetic for the companion widget
pub mod overlay;

// CDP backend (feature-gated)
#[cfg(feature = "cdp")]
pub mod cdp;

pub use capture::{CaptureService, CapturedTile, TileOrchestrator, WindowId};
pub use compositor::Compositor;
pub use geometry::{plan_tiles, PageGeometry, Tile, TilePlan};
pub use pipeline::{CancelHandle, CaptureOutcome, Pipeline, PipelineState};

/// Configuration for one capture run
///
/// Defaults mirror the observed behavior of in-browser capture hosts: a
/// 150 ms settle delay after each scroll and a 10 s bound on each
/// capture round trip. The settle delay is a heuristic, not a
/// paint-complete signal; very tall pages or slow-rendering content may
/// need a larger value.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Wait after each scroll before capturing, in milliseconds
    pub settle_delay_ms: u64,
    /// Bound on each capture-service round trip, in milliseconds;
    /// expiry is reported as `CaptureFailed`
    pub capture_timeout_ms: u64,
    /// Window whose visible region the capture service snapshots
    pub window: WindowId,
    /// Suggested output filename; a timestamped name is generated when
    /// unset
    pub filename: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 150,
            capture_timeout_ms: 10_000,
            window: 0,
            filename: None,
        }
    }
}
