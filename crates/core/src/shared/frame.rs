use ndarray::ArrayView3;

use crate::shared::region::Region;

/// An in-memory image: contiguous bytes in row-major order, either
/// grayscale (1 channel) or RGB (3 channels).
///
/// Frames are immutable. Every transform (crop, grayscale, resize) builds a
/// new frame so pipeline stages can be composed and tested independently.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// True when the frame has no pixels (zero width or zero height).
    /// True when the frame holds no pixel data.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.channels == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the part of the frame covered by `region`, clamped to bounds.
    ///
    /// A region that lies entirely outside the frame yields an empty frame
    /// rather than an error; callers decide what an empty crop means.
    pub fn crop(&self, region: &Region) -> Frame {
        let clamped = region.clamp_to(self.width, self.height);
        let x1 = clamped.x as usize;
        let y1 = clamped.y as usize;
        let crop_w = clamped.width as usize;
        let crop_h = clamped.height as usize;
        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;

        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1..y1 + crop_h {
            let start = row * row_len + x1 * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.channels)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
