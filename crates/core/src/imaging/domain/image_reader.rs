use std::path::Path;

use crate::shared::frame::Frame;

/// Decodes an uploaded image into an in-memory [`Frame`].
pub trait ImageReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error + Send + Sync>>;
}
