//! Delivery collaborators for finished composites
//!
//! Delivery is fire-and-forget from the pipeline's perspective: a
//! capture is considered successful once the composite exists, even if
//! handing it off fails. Failures are logged by the controller, never
//! propagated.

use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Accepts a finished PNG and a suggested filename.
#[allow(async_fn_in_trait)]
pub trait Delivery {
    async fn deliver(&mut self, image: &[u8], suggested_filename: &str) -> Result<()>;
}

/// Writes composites into a directory.
#[derive(Debug, Clone)]
pub struct FileDelivery {
    dir: PathBuf,
}

impl FileDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Delivery for FileDelivery {
    async fn deliver(&mut self, image: &[u8], suggested_filename: &str) -> Result<()> {
        let path = self.dir.join(suggested_filename);
        tokio::fs::write(&path, image)
            .await
            .map_err(|e| Error::Delivery(format!("{}: {}", path.display(), e)))
    }
}

/// Discards composites; a safe default for tests and dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDelivery;

impl Delivery for NullDelivery {
    async fn deliver(&mut self, _image: &[u8], _suggested_filename: &str) -> Result<()> {
        Ok(())
    }
}

/// Default output name for a capture finished at `now`.
pub fn suggested_filename(now: DateTime<Local>) -> String {
    format!("capture-{}.png", now.format("%Y%m%d-%H%M%S"))
}
