//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)
//!
//! Adapts one headless Chrome tab to the pipeline's seams: `CdpSession`
//! implements [`PageDom`] via injected script round trips, and the
//! capture handle it hands out implements [`CaptureService`] over the
//! CDP screenshot command.

use crate::capture::{CaptureService, WindowId};
use crate::dom::{ElementId, ElementStyle, PageDom};
use crate::geometry::PageGeometry;
use crate::{Error, Result};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use serde::Deserialize;
use std::sync::Arc;

/// Marker attribute used to address discovered elements from later
/// hide/restore scripts.
const ID_ATTR: &str = "data-pagestitch-id";

/// One headless Chrome tab, addressed through the pipeline's `PageDom`
/// seam.
pub struct CdpSession {
    // Dropping the browser tears the tab down, so it rides along even
    // though only the tab is used after launch.
    _browser: Browser,
    tab: Arc<headless_chrome::browser::tab::Tab>,
}

/// Capture handle sharing the session's tab. Separate from the session
/// so the pipeline can own both a document seam and a capture seam.
pub struct CdpCapture {
    tab: Arc<headless_chrome::browser::tab::Tab>,
}

#[derive(Deserialize)]
struct GeometryReply {
    width: u32,
    height: u32,
    full: u32,
}

#[derive(Deserialize)]
struct PinnedReply {
    id: ElementId,
    #[serde(flatten)]
    style: ElementStyle,
}

impl CdpSession {
    /// Launch headless Chrome with the given window size and navigate
    /// to `url`.
    pub fn launch(url: &str, width: u32, height: u32) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((width, height)))
            .build()
            .map_err(|e| Error::Dom(format!("failed to build launch options: {e}")))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Dom(format!("failed to launch browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| Error::Dom(format!("failed to create tab: {e}")))?;

        tab.navigate_to(url)
            .map_err(|e| Error::Dom(format!("navigation failed: {e}")))?;
        tab.wait_until_navigated()
            .map_err(|e| Error::Dom(format!("wait for navigation failed: {e}")))?;

        Ok(Self { _browser: browser, tab })
    }

    /// Capture seam backed by the same tab.
    pub fn capture_handle(&self) -> CdpCapture {
        CdpCapture { tab: self.tab.clone() }
    }

    fn eval_json(&self, script: &str) -> Result<serde_json::Value> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::Dom(format!("evaluation failed: {e}")))?;
        let value = eval
            .value
            .ok_or_else(|| Error::Dom("no value returned from evaluation".to_string()))?;
        // Scripts return JSON.stringify output, which CDP surfaces as a
        // string value.
        if let Some(text) = value.as_str() {
            serde_json::from_str(text).map_err(|e| Error::Dom(format!("malformed reply: {e}")))
        } else {
            Ok(value)
        }
    }
}

impl PageDom for CdpSession {
    async fn geometry(&mut self) -> Result<PageGeometry> {
        let reply: GeometryReply = serde_json::from_value(self.eval_json(
            r#"JSON.stringify({
                width: window.innerWidth,
                height: window.innerHeight,
                full: Math.max(
                    document.documentElement.scrollHeight,
                    document.body ? document.body.scrollHeight : 0
                )
            })"#,
        )?)
        .map_err(|e| Error::Dom(format!("geometry reply: {e}")))?;

        Ok(PageGeometry {
            viewport_width: reply.width,
            viewport_height: reply.height,
            full_height: reply.full,
        })
    }

    async fn scroll_position(&mut self) -> Result<u32> {
        let value = self.eval_json("JSON.stringify(Math.round(window.scrollY))")?;
        value
            .as_u64()
            .map(|y| y as u32)
            .ok_or_else(|| Error::Dom(format!("unexpected scrollY reply: {value}")))
    }

    async fn scroll_to(&mut self, y: u32) -> Result<()> {
        self.eval_json(&format!("JSON.stringify((window.scrollTo(0, {y}), true))"))?;
        Ok(())
    }

    async fn pinned_elements(&mut self) -> Result<Vec<(ElementId, ElementStyle)>> {
        let script = format!(
            r#"JSON.stringify((function() {{
                const out = [];
                let next = 0;
                document.querySelectorAll('*').forEach(el => {{
                    const style = window.getComputedStyle(el);
                    if (style.position === 'fixed' || style.position === 'sticky') {{
                        const id = next++;
                        el.setAttribute('{ID_ATTR}', String(id));
                        out.push({{
                            id: id,
                            position: el.style.position,
                            top: el.style.top,
                            zIndex: el.style.zIndex,
                            display: el.style.display
                        }});
                    }}
                }});
                return out;
            }})())"#
        );
        let pinned: Vec<PinnedReply> = serde_json::from_value(self.eval_json(&script)?)
            .map_err(|e| Error::Dom(format!("pinned-element reply: {e}")))?;
        Ok(pinned.into_iter().map(|p| (p.id, p.style)).collect())
    }

    async fn hide_element(&mut self, id: ElementId) -> Result<bool> {
        let script = format!(
            r#"JSON.stringify((function() {{
                const el = document.querySelector('[{ID_ATTR}="{id}"]');
                if (!el) return false;
                el.style.display = 'none';
                return true;
            }})())"#
        );
        let value = self.eval_json(&script)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn apply_style(&mut self, id: ElementId, style: &ElementStyle) -> Result<bool> {
        // serde_json quoting keeps arbitrary inline-style strings safe
        // to splice into the script.
        let script = format!(
            r#"JSON.stringify((function() {{
                const el = document.querySelector('[{ID_ATTR}="{id}"]');
                if (!el) return false;
                el.style.position = {position};
                el.style.top = {top};
                el.style.zIndex = {z_index};
                el.style.display = {display};
                el.removeAttribute('{ID_ATTR}');
                return true;
            }})())"#,
            position = quote(&style.position),
            top = quote(&style.top),
            z_index = quote(&style.z_index),
            display = quote(&style.display),
        );
        let value = self.eval_json(&script)?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

impl CaptureService for CdpCapture {
    async fn capture_visible(&mut self, _window: WindowId) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::CaptureFailed(format!("screenshot failed: {e}")))
    }
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
