//! rollcall-core: face-matched attendance.
//!
//! Encodes a gallery of reference portraits, matches captured frames
//! against it, keeps a de-duplicated attendance ledger per session and
//! exports it as a spreadsheet.

pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod gallery;
pub mod ledger;
pub mod matcher;
pub mod recognizer;
pub mod report;
pub mod roster;
pub mod station;
pub mod types;

#[cfg(test)]
mod testing;

pub use encoder::{EncoderError, FaceEncoder, OnnxFaceEncoder};
pub use gallery::{Gallery, GalleryEntry, GalleryError};
pub use ledger::{AttendanceEntry, Session};
pub use matcher::{EuclideanMatcher, FaceMatch, FrameMatches, Matcher, DEFAULT_TOLERANCE};
pub use report::{AttendanceReport, Course, ReportError};
pub use roster::{Identity, Roster, RosterError};
pub use station::{Clock, Command, LocalClock, Outcome, Station, StationError};
pub use types::{DetectedFace, Embedding, FaceBox};

use std::path::PathBuf;

/// Default ONNX model directory: `$XDG_DATA_HOME/rollcall/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall/models")
}
