//! Test doubles shared by the module tests.
//!
//! `ColorEncoder` reads faces off solid-colored image halves: the left half
//! is the first face, the right half an optional second one. Black means no
//! face. The embedding of a face is its color scaled to [0, 1].

use crate::encoder::{EncoderError, FaceEncoder};
use crate::types::{DetectedFace, Embedding, FaceBox};
use image::{Rgb, RgbImage};
use std::path::Path;

const SIZE: u32 = 8;
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Default)]
pub struct ColorEncoder {
    pub fail_on: Option<Rgb<u8>>,
}

impl FaceEncoder for ColorEncoder {
    fn faces(&mut self, frame: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError> {
        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 {
            return Ok(Vec::new());
        }
        let first = *frame.get_pixel(0, 0);
        if Some(first) == self.fail_on {
            return Err(EncoderError::Unavailable("scripted failure".into()));
        }

        let halves = [(first, 0, w / 2), (*frame.get_pixel(w - 1, 0), w / 2, w - 1)];
        Ok(halves
            .into_iter()
            .filter(|(color, _, _)| *color != BLACK)
            .map(|(color, left, right)| DetectedFace {
                location: FaceBox { top: 0, right, bottom: h - 1, left },
                embedding: color_embedding(color),
            })
            .collect())
    }
}

pub fn color_embedding(color: Rgb<u8>) -> Embedding {
    Embedding::new(color.0.iter().map(|&c| c as f32 / 255.0).collect())
}

/// A frame whose left half is `first` and right half `second` (or black).
pub fn face_frame(first: Rgb<u8>, second: Option<Rgb<u8>>) -> RgbImage {
    let second = second.unwrap_or(BLACK);
    RgbImage::from_fn(SIZE, SIZE, |x, _| if x < SIZE / 2 { first } else { second })
}

pub fn write_face_image(path: &Path, first: Rgb<u8>, second: Option<Rgb<u8>>) {
    face_frame(first, second).save(path).unwrap();
}
