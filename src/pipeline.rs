//! Pipeline controller
//!
//! Sequences planning → suppression → per-tile capture/composite →
//! restoration → export. Restoration of scroll position and suppressed
//! styles runs on every path out of the capture loop, success, failure,
//! or cancellation; only afterward is the first error re-surfaced.
//! Delivery is fire-and-forget: a delivery failure is logged but the
//! capture still succeeds.

use crate::capture::{CaptureService, TileOrchestrator};
use crate::compositor::Compositor;
use crate::delivery::{self, Delivery};
use crate::dom::PageDom;
use crate::geometry::{self, TilePlan};
use crate::suppress::{self, SuppressedElement};
use crate::{CaptureConfig, Error, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Controller states. `Failed` is reachable from every non-terminal
/// state; `Restoring` is entered on every path out of `Capturing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PlanningGeometry,
    Suppressing,
    Capturing(usize),
    Compositing,
    Restoring,
    Exporting,
    Done,
    Failed,
}

/// Cooperative cancellation flag, checked between tiles. Cancelling
/// mid-tile takes effect before the next tile starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    /// Encoded composite
    pub png: Vec<u8>,
    /// Number of tiles captured
    pub tile_count: usize,
    /// Composite width in device-independent pixels
    pub width: u32,
    /// Composite height in device-independent pixels
    pub height: u32,
    /// Filename suggested to the delivery collaborator
    pub filename: String,
}

/// Full-page capture pipeline over a document, a capture service, and a
/// delivery collaborator.
///
/// The pipeline exclusively owns the document's scroll position and the
/// suppressed-element styles for the duration of `run`; no other caller
/// may mutate them concurrently.
pub struct Pipeline<D, C, Y> {
    dom: D,
    service: C,
    delivery: Y,
    config: CaptureConfig,
    cancel: CancelHandle,
    state: PipelineState,
}

impl<D, C, Y> Pipeline<D, C, Y>
where
    D: PageDom,
    C: CaptureService,
    Y: Delivery,
{
    pub fn new(dom: D, service: C, delivery: Y, config: CaptureConfig) -> Self {
        Self {
            dom,
            service,
            delivery,
            config,
            cancel: CancelHandle::new(),
            state: PipelineState::Idle,
        }
    }

    /// Handle for requesting a cooperative abort between tiles.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Make a finished pipeline runnable again. Running state is only
    /// ever touched here and at run start, so re-entry is an explicit
    /// reset rather than undefined behavior.
    pub fn reset(&mut self) {
        self.cancel.reset();
        self.set_state(PipelineState::Idle);
    }

    /// Capture the page, composite the tiles, restore the page, and
    /// hand the PNG to the delivery collaborator.
    ///
    /// Returns the composite on success; on failure the first error is
    /// surfaced after restoration has already happened. A second call
    /// without `reset` is rejected.
    pub async fn run(&mut self) -> Result<CaptureOutcome> {
        if self.state != PipelineState::Idle {
            return Err(Error::Other(
                "pipeline already ran; call reset() or build a new pipeline".to_string(),
            ));
        }
        let outcome = self.run_inner().await;
        match &outcome {
            Ok(_) => self.set_state(PipelineState::Done),
            Err(_) => self.set_state(PipelineState::Failed),
        }
        outcome
    }

    async fn run_inner(&mut self) -> Result<CaptureOutcome> {
        self.set_state(PipelineState::PlanningGeometry);
        let geometry = self.dom.geometry().await?;
        let plan = geometry::plan_tiles(&geometry)?;
        let mut compositor = Compositor::new(&geometry)?;
        info!(
            "capturing {}x{} page as {} tile(s)",
            geometry.viewport_width,
            geometry.full_height,
            plan.len()
        );

        self.set_state(PipelineState::Suppressing);
        let original_scroll = self.dom.scroll_position().await?;
        let pinned = suppress::discover(&mut self.dom).await?;

        // Everything from here on mutates the page, so the result is
        // held until restoration has run.
        let captured = self.capture_all(&plan, &pinned, &mut compositor).await;

        self.set_state(PipelineState::Restoring);
        suppress::restore(&mut self.dom, &pinned).await;
        if let Err(err) = self.dom.scroll_to(original_scroll).await {
            warn!("failed to restore scroll position: {err}");
        }
        captured?;

        self.set_state(PipelineState::Exporting);
        let png = compositor.finish()?;
        let filename = self
            .config
            .filename
            .clone()
            .unwrap_or_else(|| delivery::suggested_filename(chrono::Local::now()));
        if let Err(err) = self.delivery.deliver(&png, &filename).await {
            warn!("delivery of {filename} failed: {err}");
        }

        Ok(CaptureOutcome {
            tile_count: plan.len(),
            width: geometry.viewport_width,
            height: geometry.full_height,
            filename,
            png,
        })
    }

    /// Capture every tile in ascending index order and composite each
    /// as it arrives. Pinned elements are hidden only after tile 0 so
    /// they appear exactly once in the output.
    async fn capture_all(
        &mut self,
        plan: &TilePlan,
        pinned: &[SuppressedElement],
        compositor: &mut Compositor,
    ) -> Result<()> {
        let orchestrator = TileOrchestrator::new(
            Duration::from_millis(self.config.settle_delay_ms),
            Duration::from_millis(self.config.capture_timeout_ms),
            self.config.window,
        );

        for tile in plan.tiles() {
            if self.cancel.is_cancelled() {
                debug!("cancellation observed before tile {}", tile.index);
                return Err(Error::Cancelled);
            }
            self.set_state(PipelineState::Capturing(tile.index));
            let captured = orchestrator
                .capture_tile(&mut self.dom, &mut self.service, tile)
                .await?;
            compositor.paste(tile, &captured.bytes)?;

            if tile.index == 0 && !pinned.is_empty() {
                suppress::suppress(&mut self.dom, pinned).await?;
            }
        }

        self.set_state(PipelineState::Compositing);
        Ok(())
    }

    fn set_state(&mut self, next: PipelineState) {
        debug!("pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
