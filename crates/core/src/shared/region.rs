use serde::Serialize;

/// Axis-aligned face bounding box in source-frame pixel coordinates.
///
/// Detectors may report boxes that extend past the frame edges; use
/// [`Region::clamp_to`] before reading pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Region {
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Intersects the region with a `frame_width` × `frame_height` frame.
    ///
    /// Non-overlapping regions collapse to a zero-sized region anchored
    /// inside the frame, so the result is always safe to index with.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Region {
        let fw = frame_width as i32;
        let fh = frame_height as i32;

        let x1 = self.x.clamp(0, fw);
        let y1 = self.y.clamp(0, fh);
        let x2 = (self.x.saturating_add(self.width.max(0))).clamp(x1, fw);
        let y2 = (self.y.saturating_add(self.height.max(0))).clamp(y1, fh);

        Region {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: self.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region {
            x,
            y,
            width: w,
            height: h,
            confidence: None,
        }
    }

    #[test]
    fn test_area() {
        assert_eq!(region(0, 0, 10, 20).area(), 200);
    }

    #[test]
    fn test_negative_dimensions_have_zero_area() {
        assert_eq!(region(0, 0, -5, 20).area(), 0);
        assert!(region(0, 0, -5, 20).is_empty());
    }

    #[test]
    fn test_clamp_inside_frame_is_identity() {
        let r = region(10, 10, 30, 40);
        assert_eq!(r.clamp_to(100, 100), r);
    }

    #[test]
    fn test_clamp_preserves_confidence() {
        let r = Region {
            confidence: Some(0.9),
            ..region(-10, 0, 30, 30)
        };
        assert_eq!(r.clamp_to(100, 100).confidence, Some(0.9));
    }

    #[rstest]
    #[case::left_edge(region(-10, 0, 30, 30), region(0, 0, 20, 30))]
    #[case::top_edge(region(0, -5, 30, 30), region(0, 0, 30, 25))]
    #[case::right_edge(region(90, 0, 30, 30), region(90, 0, 10, 30))]
    #[case::bottom_edge(region(0, 90, 30, 30), region(0, 90, 30, 10))]
    #[case::covers_frame(region(-50, -50, 500, 500), region(0, 0, 100, 100))]
    fn test_clamp_at_edges(#[case] input: Region, #[case] expected: Region) {
        assert_eq!(input.clamp_to(100, 100), expected);
    }

    #[rstest]
    #[case::right_of_frame(region(150, 10, 20, 20))]
    #[case::below_frame(region(10, 150, 20, 20))]
    #[case::left_of_frame(region(-50, 10, 20, 20))]
    #[case::zero_width(region(10, 10, 0, 20))]
    fn test_clamp_outside_is_empty(#[case] input: Region) {
        let clamped = input.clamp_to(100, 100);
        assert!(clamped.is_empty());
        assert!(clamped.x >= 0 && clamped.x <= 100);
        assert!(clamped.y >= 0 && clamped.y <= 100);
    }
}
