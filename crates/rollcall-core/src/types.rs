/// Face location in frame pixels, in (top, right, bottom, left) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceBox {
    /// Build a box from float corner coordinates, clamped to a `width`×`height` frame.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32, width: u32, height: u32) -> Self {
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;
        let clamp = |v: f32, max: f32| v.clamp(0.0, max).round() as u32;
        Self {
            top: clamp(y1.min(y2), max_y),
            right: clamp(x1.max(x2), max_x),
            bottom: clamp(y1.max(y2), max_y),
            left: clamp(x1.min(x2), max_x),
        }
    }
}

/// Face feature vector. The ONNX encoder produces 512 L2-normalized values.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Euclidean distance between two embeddings. Lower = more similar.
    ///
    /// NaN when the lengths differ, so a mismatched vector never wins a match.
    pub fn distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::NAN;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A face found in one frame together with its feature vector.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub location: FaceBox,
    pub embedding: Embedding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical_is_zero() {
        let a = Embedding::new(vec![0.3, 0.4, 0.5]);
        assert!(a.distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_distance_known_value() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_length_mismatch_is_nan() {
        let probe = Embedding::new(vec![0.3, 0.4]);
        assert!(probe.distance(&Embedding::new(vec![])).is_nan());
        assert!(probe.distance(&Embedding::new(vec![0.3, 0.4, 0.0])).is_nan());
    }

    #[test]
    fn test_face_box_from_corners_clamps_to_frame() {
        let b = FaceBox::from_corners(-10.0, 5.0, 700.0, 90.4, 640, 480);
        assert_eq!(b, FaceBox { top: 5, right: 639, bottom: 90, left: 0 });
    }

    #[test]
    fn test_face_box_from_swapped_corners() {
        let b = FaceBox::from_corners(50.0, 60.0, 10.0, 20.0, 100, 100);
        assert_eq!(b, FaceBox { top: 20, right: 50, bottom: 60, left: 10 });
    }
}
