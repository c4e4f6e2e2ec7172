//! Frame matching: encode the faces in one frame and resolve each against the gallery.

use crate::encoder::{EncoderError, FaceEncoder};
use crate::gallery::Gallery;
use crate::roster::Roster;
use crate::types::{Embedding, FaceBox};
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Maximum Euclidean distance accepted as the same person.
///
/// For L2-normalized ArcFace vectors, 1.10 corresponds to a cosine
/// similarity of about 0.40.
pub const DEFAULT_TOLERANCE: f32 = 1.10;

const MATCHED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const UNMATCHED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: u32 = 2;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("cannot decode frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

/// Best gallery candidate for one probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryMatch {
    pub index: usize,
    pub distance: f32,
}

/// Strategy for comparing a probe against the gallery.
pub trait Matcher {
    /// The accepted best candidate, or `None` when nothing is close enough.
    fn best_match(&self, probe: &Embedding, gallery: &Gallery) -> Option<GalleryMatch>;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// The nearest entry is taken first; it is accepted only if the tolerance
/// test also accepts that same entry.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub tolerance: f32,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

impl EuclideanMatcher {
    /// Tolerance verdict for every gallery entry, in gallery order.
    pub fn within_tolerance(&self, distances: &[f32]) -> Vec<bool> {
        distances.iter().map(|&d| d <= self.tolerance).collect()
    }
}

impl Matcher for EuclideanMatcher {
    fn best_match(&self, probe: &Embedding, gallery: &Gallery) -> Option<GalleryMatch> {
        let distances: Vec<f32> = gallery.entries().iter().map(|e| probe.distance(&e.embedding)).collect();
        let accepted = self.within_tolerance(&distances);

        // First minimum wins; NaN never does.
        let mut best: Option<GalleryMatch> = None;
        for (index, &distance) in distances.iter().enumerate() {
            if best.map_or(!distance.is_nan(), |b| distance < b.distance) {
                best = Some(GalleryMatch { index, distance });
            }
        }

        best.filter(|b| accepted[b.index])
    }
}

/// A face in the frame that resolved to an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub display_name: String,
    pub student_id: String,
    pub location: FaceBox,
    pub distance: f32,
    pub gallery_index: usize,
}

/// Result of matching one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMatches {
    /// Matched faces in detection order.
    pub matches: Vec<FaceMatch>,
    /// Faces that matched no one. They are drawn but never recorded.
    pub unmatched: Vec<FaceBox>,
}

/// Decode an encoded still (JPEG, PNG, ...) into RGB order.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, MatchError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Encode the faces in `frame` and resolve each against `gallery`.
pub fn match_frame<E, M>(
    frame: &RgbImage,
    encoder: &mut E,
    matcher: &M,
    gallery: &Gallery,
    roster: &Roster,
) -> Result<FrameMatches, MatchError>
where
    E: FaceEncoder + ?Sized,
    M: Matcher + ?Sized,
{
    let faces = encoder.faces(frame)?;
    let mut result = FrameMatches::default();

    for face in faces {
        let found = matcher
            .best_match(&face.embedding, gallery)
            .and_then(|m| gallery.get(m.index).map(|entry| (m, entry)));

        match found {
            Some((m, entry)) => {
                let identity = roster.resolve(entry, m.index);
                tracing::debug!(
                    student_id = %identity.student_id,
                    distance = m.distance,
                    "face matched"
                );
                result.matches.push(FaceMatch {
                    display_name: identity.display_name,
                    student_id: identity.student_id,
                    location: face.location,
                    distance: m.distance,
                    gallery_index: m.index,
                });
            }
            None => result.unmatched.push(face.location),
        }
    }

    Ok(result)
}

/// Copy of `frame` with matched faces boxed in green and unmatched in red.
pub fn annotate(frame: &RgbImage, matches: &FrameMatches) -> RgbImage {
    let mut out = frame.clone();
    for m in &matches.matches {
        draw_box(&mut out, &m.location, MATCHED_COLOR);
    }
    for b in &matches.unmatched {
        draw_box(&mut out, b, UNMATCHED_COLOR);
    }
    out
}

fn draw_box(img: &mut RgbImage, b: &FaceBox, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let left = b.left.min(w - 1);
    let right = b.right.min(w - 1);
    let top = b.top.min(h - 1);
    let bottom = b.bottom.min(h - 1);

    for t in 0..BOX_THICKNESS {
        let (x0, x1) = (left + t, right.saturating_sub(t));
        let (y0, y1) = (top + t, bottom.saturating_sub(t));
        if x0 > x1 || y0 > y1 {
            break;
        }
        for x in x0..=x1 {
            img.put_pixel(x, y0, color);
            img.put_pixel(x, y1, color);
        }
        for y in y0..=y1 {
            img.put_pixel(x0, y, color);
            img.put_pixel(x1, y, color);
        }
    }
}
