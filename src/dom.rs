//! Document seam consumed by the capture pipeline
//!
//! Backends adapt a real page (a CDP tab, a WebDriver session, a test
//! double) to this trait. The pipeline is the only caller for the
//! duration of a run: scroll position and element styles are exclusively
//! owned by it, so implementations do not need internal locking for
//! correctness, only for their own transport.

use crate::geometry::PageGeometry;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Opaque handle for an element discovered during a run. Handles are
/// only meaningful to the backend that issued them and only for the
/// lifetime of one capture.
pub type ElementId = u32;

/// Inline style snapshot for one pinned element, recorded before any
/// mutation and re-applied verbatim at restore time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementStyle {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub top: String,
    #[serde(default, rename = "zIndex")]
    pub z_index: String,
    #[serde(default)]
    pub display: String,
}

/// Read/write access to the document under capture.
///
/// All operations are async because real backends reach the page over a
/// message round trip. The pipeline awaits them strictly sequentially.
#[allow(async_fn_in_trait)]
pub trait PageDom {
    /// Current page geometry in device-independent pixels.
    async fn geometry(&mut self) -> Result<PageGeometry>;

    /// Current vertical scroll offset.
    async fn scroll_position(&mut self) -> Result<u32>;

    /// Scroll the document so `y` is at the top of the viewport.
    async fn scroll_to(&mut self, y: u32) -> Result<()>;

    /// Elements whose computed position is `fixed` or `sticky`, paired
    /// with their pre-mutation inline styles.
    async fn pinned_elements(&mut self) -> Result<Vec<(ElementId, ElementStyle)>>;

    /// Set `display: none` on an element. Returns `Ok(false)` if the
    /// element no longer exists in the document.
    async fn hide_element(&mut self, id: ElementId) -> Result<bool>;

    /// Re-apply a saved inline style to an element. Returns `Ok(false)`
    /// if the element no longer exists in the document.
    async fn apply_style(&mut self, id: ElementId, style: &ElementStyle) -> Result<bool>;
}
