//! Fixed-element suppression
//!
//! Fixed and sticky elements render at a constant screen location, so
//! they would repeat in every tile of a scrolled capture. The pipeline
//! captures them once in the first tile, hides them for the remaining
//! tiles, and always re-applies the recorded styles afterward. The
//! suppressed set is append-only during discovery and is only read at
//! restore time.

use crate::dom::{ElementId, ElementStyle, PageDom};
use crate::Result;
use log::{debug, warn};

/// Pre-mutation record for one pinned element.
#[derive(Debug, Clone)]
pub struct SuppressedElement {
    pub id: ElementId,
    pub style: ElementStyle,
}

/// Scan the document for pinned elements and record their inline styles.
/// No mutation happens here.
pub async fn discover<D: PageDom>(dom: &mut D) -> Result<Vec<SuppressedElement>> {
    let pinned = dom.pinned_elements().await?;
    debug!("discovered {} pinned element(s)", pinned.len());
    Ok(pinned
        .into_iter()
        .map(|(id, style)| SuppressedElement { id, style })
        .collect())
}

/// Hide every recorded element. Runs only after the first tile has been
/// captured, so pinned elements appear exactly once in the composite.
/// An element removed since discovery is skipped.
pub async fn suppress<D: PageDom>(dom: &mut D, set: &[SuppressedElement]) -> Result<()> {
    for element in set {
        if !dom.hide_element(element.id).await? {
            debug!("pinned element {} vanished before suppression", element.id);
        }
    }
    Ok(())
}

/// Re-apply every recorded style, unconditionally. This is the release
/// half of the suppression scope and must run on every exit path, so it
/// never fails: individual restore errors are logged and the loop keeps
/// going. Elements removed since discovery are skipped without error.
pub async fn restore<D: PageDom>(dom: &mut D, set: &[SuppressedElement]) {
    for element in set {
        match dom.apply_style(element.id, &element.style).await {
            Ok(true) => {}
            Ok(false) => debug!("pinned element {} vanished before restore", element.id),
            Err(err) => warn!("failed to restore element {}: {}", element.id, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageGeometry;
    use std::collections::HashMap;

    /// Minimal in-memory document: a style table plus a tombstone set.
    #[derive(Default)]
    struct TableDom {
        styles: HashMap<ElementId, ElementStyle>,
        removed: Vec<ElementId>,
        restore_calls: usize,
    }

    impl PageDom for TableDom {
        async fn geometry(&mut self) -> Result<PageGeometry> {
            Ok(PageGeometry { viewport_width: 100, viewport_height: 100, full_height: 100 })
        }

        async fn scroll_position(&mut self) -> Result<u32> {
            Ok(0)
        }

        async fn scroll_to(&mut self, _y: u32) -> Result<()> {
            Ok(())
        }

        async fn pinned_elements(&mut self) -> Result<Vec<(ElementId, ElementStyle)>> {
            let mut out: Vec<_> = self.styles.iter().map(|(id, s)| (*id, s.clone())).collect();
            out.sort_by_key(|(id, _)| *id);
            Ok(out)
        }

        async fn hide_element(&mut self, id: ElementId) -> Result<bool> {
            if self.removed.contains(&id) {
                return Ok(false);
            }
            if let Some(style) = self.styles.get_mut(&id) {
                style.display = "none".to_string();
                return Ok(true);
            }
            Ok(false)
        }

        async fn apply_style(&mut self, id: ElementId, style: &ElementStyle) -> Result<bool> {
            self.restore_calls += 1;
            if self.removed.contains(&id) {
                return Ok(false);
            }
            self.styles.insert(id, style.clone());
            Ok(true)
        }
    }

    fn header_style() -> ElementStyle {
        ElementStyle {
            position: "fixed".to_string(),
            top: "0px".to_string(),
            z_index: "100".to_string(),
            display: "block".to_string(),
        }
    }

    #[tokio::test]
    async fn suppress_then_restore_round_trips_styles() {
        let mut dom = TableDom::default();
        dom.styles.insert(7, header_style());

        let set = discover(&mut dom).await.unwrap();
        assert_eq!(set.len(), 1);

        suppress(&mut dom, &set).await.unwrap();
        assert_eq!(dom.styles[&7].display, "none");

        restore(&mut dom, &set).await;
        assert_eq!(dom.styles[&7], header_style());
    }

    #[tokio::test]
    async fn removed_element_is_skipped_without_error() {
        let mut dom = TableDom::default();
        dom.styles.insert(1, header_style());
        dom.styles.insert(2, header_style());

        let set = discover(&mut dom).await.unwrap();
        dom.removed.push(1);

        suppress(&mut dom, &set).await.unwrap();
        restore(&mut dom, &set).await;

        // Both elements were attempted exactly once on restore.
        assert_eq!(dom.restore_calls, 2);
        assert_eq!(dom.styles[&2], header_style());
    }
}
