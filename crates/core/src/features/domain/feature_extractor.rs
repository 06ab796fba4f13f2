use std::path::Path;

use image::imageops::FilterType;
use image::{ImageBuffer, Luma};
use thiserror::Error;

use crate::features::domain::feature_vector::{CanonicalSize, FeatureVector, RescaleRule};
use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Single-channel floating intensity image in `[0.0, 1.0]`.
pub type GrayImage = ImageBuffer<Luma<f32>, Vec<f32>>;

// ITU-R BT.709 luma weights.
const LUMA_R: f32 = 0.2125;
const LUMA_G: f32 = 0.7154;
const LUMA_B: f32 = 0.0721;

/// Crops narrower or shorter than this carry no usable face signal.
pub const DEFAULT_MIN_SIDE: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid face region: {width}x{height} crop")]
    InvalidRegion { width: u32, height: u32 },
}

/// Turns a face crop into the canonical feature vector the classifiers use.
///
/// grayscale → stretch-resize to the canonical size → row-major flatten →
/// rescale to `[0, 255]`. Resizing never crops: the classifiers were
/// trained on identically stretched faces.
pub struct FeatureExtractor {
    size: CanonicalSize,
    rescale: RescaleRule,
    min_side: u32,
    debug_writer: Option<Box<dyn ImageWriter>>,
}

impl FeatureExtractor {
    pub fn new(size: CanonicalSize, rescale: RescaleRule) -> Self {
        assert!(!size.is_empty(), "canonical size must be non-zero");
        Self {
            size,
            rescale,
            min_side: DEFAULT_MIN_SIDE,
            debug_writer: None,
        }
    }

    /// Persists the canonical grayscale image of every face that is
    /// extracted with an artifact path.
    pub fn with_debug_writer(mut self, writer: Box<dyn ImageWriter>) -> Self {
        self.debug_writer = Some(writer);
        self
    }

    pub fn with_min_side(mut self, min_side: u32) -> Self {
        self.min_side = min_side.max(1);
        self
    }

    pub fn size(&self) -> CanonicalSize {
        self.size
    }

    pub fn extract(&self, face: &Frame) -> Result<FeatureVector, ExtractError> {
        self.extract_with_artifact(face, None)
    }

    /// Like [`extract`](Self::extract), additionally writing the canonical
    /// grayscale image to `artifact_path` when a debug writer is set.
    ///
    /// Artifact write failures are logged and never affect the result.
    pub fn extract_with_artifact(
        &self,
        face: &Frame,
        artifact_path: Option<&Path>,
    ) -> Result<FeatureVector, ExtractError> {
        if face.is_empty() || face.width() < self.min_side || face.height() < self.min_side {
            return Err(ExtractError::InvalidRegion {
                width: face.width(),
                height: face.height(),
            });
        }

        let gray = to_grayscale(face);
        let canonical = resize(&gray, self.size);

        if let (Some(writer), Some(path)) = (&self.debug_writer, artifact_path) {
            let preview = to_frame(&canonical, self.rescale);
            if let Err(e) = writer.write(path, &preview) {
                log::warn!("Failed to write debug image {}: {e}", path.display());
            }
        }

        Ok(flatten(&canonical, self.rescale))
    }
}

/// Luminance-weighted grayscale conversion, normalised to `[0.0, 1.0]`.
///
/// Frames with fewer than three channels use their first channel as-is.
pub fn to_grayscale(frame: &Frame) -> GrayImage {
    let channels = frame.channels() as usize;
    let data = frame.data();
    let mut out = Vec::with_capacity(frame.width() as usize * frame.height() as usize);

    for px in data.chunks_exact(channels) {
        let intensity = if channels >= 3 {
            LUMA_R * px[0] as f32 + LUMA_G * px[1] as f32 + LUMA_B * px[2] as f32
        } else {
            px[0] as f32
        };
        out.push((intensity / 255.0).clamp(0.0, 1.0));
    }

    ImageBuffer::from_raw(frame.width(), frame.height(), out)
        .expect("grayscale buffer length matches frame dimensions")
}

/// Interpolated stretch to `size`, with area-aware filtering when shrinking.
pub fn resize(gray: &GrayImage, size: CanonicalSize) -> GrayImage {
    image::imageops::resize(gray, size.width, size.height, FilterType::Triangle)
}

/// Row-major flatten with each intensity rescaled to `[0, 255]`.
pub fn flatten(gray: &GrayImage, rule: RescaleRule) -> FeatureVector {
    FeatureVector::new(gray.pixels().map(|p| rule.apply(p.0[0])).collect())
}

fn to_frame(gray: &GrayImage, rule: RescaleRule) -> Frame {
    let data = gray.pixels().map(|p| rule.apply(p.0[0])).collect();
    Frame::new(data, gray.width(), gray.height(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct RecordingWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for RecordingWriter {
        fn write(
            &self,
            path: &Path,
            frame: &Frame,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    struct FailingWriter;

    impl ImageWriter for FailingWriter {
        fn write(
            &self,
            _path: &Path,
            _frame: &Frame,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("disk full".into())
        }
    }

    // --- Helpers ---

    fn solid_frame(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..w * h {
            data.extend_from_slice(&rgb);
        }
        Frame::new(data, w, h, 3)
    }

    /// Horizontal gradient so resizing has real structure to interpolate.
    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..h {
            for x in 0..w {
                let v = (x * 255 / w.max(1)) as u8;
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        Frame::new(data, w, h, 3)
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(CanonicalSize::DEFAULT, RescaleRule::Truncate)
    }

    // --- Tests ---

    #[rstest]
    #[case::downscale(gradient_frame(200, 160))]
    #[case::upscale(gradient_frame(20, 30))]
    #[case::already_canonical(gradient_frame(48, 48))]
    #[case::tall_and_thin(gradient_frame(7, 300))]
    fn test_output_length_is_canonical(#[case] face: Frame) {
        let v = extractor().extract(&face).unwrap();
        assert_eq!(v.len(), 48 * 48);
    }

    #[test]
    fn test_custom_canonical_size() {
        let ex = FeatureExtractor::new(CanonicalSize::new(24, 12), RescaleRule::Truncate);
        let v = ex.extract(&gradient_frame(100, 100)).unwrap();
        assert_eq!(v.len(), 24 * 12);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let face = gradient_frame(123, 97);
        let a = extractor().extract(&face).unwrap();
        let b = extractor().extract(&face).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_black_face_is_all_zero() {
        let v = extractor().extract(&solid_frame(60, 60, [0, 0, 0])).unwrap();
        assert!(v.values().iter().all(|&x| x == 0));
    }

    #[test]
    fn test_uniform_gray_stays_uniform() {
        let v = extractor()
            .extract(&solid_frame(90, 70, [128, 128, 128]))
            .unwrap();
        assert!(v.values().iter().all(|&x| (127..=128).contains(&x)));
    }

    #[test]
    fn test_row_major_order() {
        // Top half black, bottom half white: first row dark, last row bright.
        let mut data = vec![0u8; 48 * 24 * 3];
        data.extend(vec![255u8; 48 * 24 * 3]);
        let face = Frame::new(data, 48, 48, 3);
        let v = extractor().extract(&face).unwrap();
        assert!(v.values()[..48].iter().all(|&x| x < 10));
        assert!(v.values()[48 * 47..].iter().all(|&x| x > 245));
    }

    #[test]
    fn test_grayscale_uses_luminance_weights() {
        let gray = to_grayscale(&solid_frame(1, 1, [255, 0, 0]));
        assert_relative_eq!(gray.get_pixel(0, 0).0[0], LUMA_R, epsilon = 1e-6);

        let gray = to_grayscale(&solid_frame(1, 1, [0, 255, 0]));
        assert_relative_eq!(gray.get_pixel(0, 0).0[0], LUMA_G, epsilon = 1e-6);

        let gray = to_grayscale(&solid_frame(1, 1, [255, 255, 255]));
        assert_relative_eq!(gray.get_pixel(0, 0).0[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_grayscale_single_channel_passthrough() {
        let frame = Frame::new(vec![51], 1, 1, 1);
        assert_relative_eq!(to_grayscale(&frame).get_pixel(0, 0).0[0], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_grayscale_does_not_touch_source() {
        let face = gradient_frame(10, 10);
        let before = face.clone();
        let _ = to_grayscale(&face);
        assert_eq!(face, before);
    }

    #[test]
    fn test_flatten_truncates() {
        let gray = GrayImage::from_raw(2, 1, vec![0.999, 0.5]).unwrap();
        assert_eq!(flatten(&gray, RescaleRule::Truncate).values(), &[254, 127]);
        assert_eq!(flatten(&gray, RescaleRule::Round).values(), &[255, 128]);
    }

    #[rstest]
    #[case::zero_width(Frame::new(Vec::new(), 0, 10, 3))]
    #[case::zero_height(Frame::new(Vec::new(), 10, 0, 3))]
    #[case::one_pixel_wide(solid_frame(1, 40, [90, 90, 90]))]
    #[case::one_pixel_tall(solid_frame(40, 1, [90, 90, 90]))]
    #[case::no_channels(Frame::new(Vec::new(), 4, 4, 0))]
    fn test_degenerate_crops_are_invalid(#[case] face: Frame) {
        let err = extractor().extract(&face).unwrap_err();
        assert_eq!(
            err,
            ExtractError::InvalidRegion {
                width: face.width(),
                height: face.height()
            }
        );
    }

    #[test]
    fn test_min_side_can_be_lowered() {
        let ex = extractor().with_min_side(1);
        assert!(ex.extract(&solid_frame(1, 40, [90, 90, 90])).is_ok());
        assert!(ex.extract(&Frame::new(Vec::new(), 0, 40, 3)).is_err());
    }

    #[test]
    fn test_debug_artifact_is_canonical_grayscale() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let ex = extractor().with_debug_writer(Box::new(RecordingWriter {
            written: written.clone(),
        }));

        let v = ex
            .extract_with_artifact(&gradient_frame(80, 80), Some(Path::new("face_downscaled.png")))
            .unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        let (path, frame) = &written[0];
        assert_eq!(path, Path::new("face_downscaled.png"));
        assert_eq!((frame.width(), frame.height(), frame.channels()), (48, 48, 1));
        assert_eq!(frame.data(), v.values());
    }

    #[test]
    fn test_no_artifact_without_path() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let ex = extractor().with_debug_writer(Box::new(RecordingWriter {
            written: written.clone(),
        }));
        ex.extract(&gradient_frame(80, 80)).unwrap();
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_artifact_write_failure_is_swallowed() {
        let ex = extractor().with_debug_writer(Box::new(FailingWriter));
        let with_failure = ex
            .extract_with_artifact(&gradient_frame(80, 80), Some(Path::new("x.png")))
            .unwrap();
        let plain = extractor().extract(&gradient_frame(80, 80)).unwrap();
        assert_eq!(with_failure, plain);
    }

    #[test]
    #[should_panic(expected = "canonical size must be non-zero")]
    fn test_zero_canonical_size_panics() {
        FeatureExtractor::new(CanonicalSize::new(0, 48), RescaleRule::Truncate);
    }
}
