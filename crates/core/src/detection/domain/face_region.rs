use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// A detected face: the pixels to classify plus where they came from.
#[derive(Clone, Debug, Serialize)]
pub struct FaceRegion {
    #[serde(skip)]
    crop: Frame,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<Region>,
    /// Where the crop was saved for display, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    stored_path: Option<PathBuf>,
}

impl FaceRegion {
    /// Crops `region` out of `frame`. A region outside the frame yields an
    /// empty crop, which extraction later rejects.
    pub fn from_detection(frame: &Frame, region: Region) -> Self {
        Self {
            crop: frame.crop(&region),
            bounds: Some(region),
            stored_path: None,
        }
    }

    pub fn with_stored_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stored_path = Some(path.into());
        self
    }

    pub fn crop(&self) -> &Frame {
        &self.crop
    }

    pub fn bounds(&self) -> Option<&Region> {
        self.bounds.as_ref()
    }

    pub fn stored_path(&self) -> Option<&Path> {
        self.stored_path.as_deref()
    }

    /// `<dir>/<stem>_downscaled.<ext>` for the stored crop, or for
    /// `face<index>.png` when the crop was never stored.
    ///
    /// `dir` defaults to the stored crop's directory.
    pub fn artifact_path(&self, dir: Option<&Path>, index: usize) -> Option<PathBuf> {
        let (parent, stem, ext) = match &self.stored_path {
            Some(p) => (
                p.parent().map(Path::to_path_buf),
                p.file_stem()?.to_string_lossy().into_owned(),
                p.extension()
                    .map_or_else(|| "png".to_string(), |e| e.to_string_lossy().into_owned()),
            ),
            None => (None, format!("face{index}"), "png".to_string()),
        };
        let dir = dir.map(Path::to_path_buf).or(parent)?;
        Some(dir.join(format!("{stem}_downscaled.{ext}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::new(vec![7u8; 10 * 8 * 3], 10, 8, 3)
    }

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region {
            x,
            y,
            width: w,
            height: h,
            confidence: Some(0.9),
        }
    }

    #[test]
    fn test_from_detection_crops_region() {
        let face = FaceRegion::from_detection(&frame(), region(2, 1, 4, 3));
        assert_eq!(face.crop().width(), 4);
        assert_eq!(face.crop().height(), 3);
        assert_eq!(face.bounds().unwrap().x, 2);
        assert!(face.stored_path().is_none());
    }

    #[test]
    fn test_detection_outside_frame_gives_empty_crop() {
        let face = FaceRegion::from_detection(&frame(), region(50, 50, 4, 4));
        assert!(face.crop().is_empty());
    }

    #[test]
    fn test_artifact_path_follows_stored_crop() {
        let face = FaceRegion::from_detection(&frame(), region(0, 0, 2, 2)).with_stored_path("/tmp/faces/photo_face0.jpg");
        assert_eq!(
            face.artifact_path(None, 0),
            Some(PathBuf::from("/tmp/faces/photo_face0_downscaled.jpg"))
        );
    }

    #[test]
    fn test_artifact_path_prefers_explicit_dir() {
        let face = FaceRegion::from_detection(&frame(), region(0, 0, 2, 2)).with_stored_path("/tmp/faces/a.png");
        assert_eq!(
            face.artifact_path(Some(Path::new("/debug")), 3),
            Some(PathBuf::from("/debug/a_downscaled.png"))
        );
    }

    #[test]
    fn test_artifact_path_for_unstored_crop() {
        let face = FaceRegion::from_detection(&frame(), region(0, 0, 2, 2));
        assert_eq!(face.artifact_path(None, 1), None);
        assert_eq!(
            face.artifact_path(Some(Path::new("/debug")), 1),
            Some(PathBuf::from("/debug/face1_downscaled.png"))
        );
    }

    #[test]
    fn test_serializes_without_pixels() {
        let face = FaceRegion::from_detection(&frame(), region(0, 0, 2, 2));
        let json = serde_json::to_value(&face).unwrap();
        assert!(json.get("crop").is_none());
        assert_eq!(json["bounds"]["width"], 2);
    }
}
