use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub type DetectError = Box<dyn std::error::Error + Send + Sync>;

/// Domain interface for face detection.
///
/// Returns regions in the detector's own order; callers keep that order.
/// An empty result means no faces, an `Err` means detection itself failed.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Region>, DetectError>;
}
