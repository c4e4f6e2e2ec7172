//! Face encoding capability: find faces in an RGB frame and describe each
//! one with a feature vector.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{DetectedFace, FaceBox};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("encoder unavailable: {0}")]
    Unavailable(String),
}

/// Locates and encodes faces.
///
/// Implementations receive frames in RGB order. Gallery images and captured
/// frames both go through this trait, so they are always encoded the same way.
pub trait FaceEncoder {
    /// All faces in `frame`, most confident first. No faces is `Ok(vec![])`.
    fn faces(&mut self, frame: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError>;
}

/// SCRFD + ArcFace encoder backed by ONNX Runtime.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    /// Load both models from `model_dir`. Fails fast if either is missing.
    pub fn load(model_dir: &Path) -> Result<Self, EncoderError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(RECOGNIZER_MODEL_FILE))?;
        Ok(Self { detector, recognizer })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn faces(&mut self, frame: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError> {
        let detections = self.detector.detect(frame)?;
        tracing::debug!(count = detections.len(), "faces detected");

        let mut faces = Vec::with_capacity(detections.len());
        for det in detections {
            // SCRFD always emits landmarks; a truncated kps tensor is the only way to miss them.
            let Some(landmarks) = det.landmarks else {
                tracing::warn!(confidence = det.confidence, "detection without landmarks, skipping");
                continue;
            };
            let embedding = self.recognizer.extract(frame, &landmarks)?;
            faces.push(DetectedFace {
                location: FaceBox::from_corners(det.x1, det.y1, det.x2, det.y2, frame.width(), frame.height()),
                embedding,
            });
        }
        Ok(faces)
    }
}

impl<E: FaceEncoder + ?Sized> FaceEncoder for Box<E> {
    fn faces(&mut self, frame: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError> {
        (**self).faces(frame)
    }
}
