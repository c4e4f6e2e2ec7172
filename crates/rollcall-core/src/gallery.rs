//! Enrolled gallery: one feature vector per reference image.

use crate::encoder::FaceEncoder;
use crate::types::Embedding;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One enrolled identity.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    /// File name without extension.
    pub identity_key: String,
    /// File name including extension, used for roster lookup.
    pub file_name: String,
    pub embedding: Embedding,
}

/// Immutable set of enrolled identities, ordered by file name.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn from_entries(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    /// Encode every reference image in `dir`.
    ///
    /// Files that do not decode, images with no face and images the encoder
    /// fails on are left out. Only the first face of a multi-face image is used.
    pub fn load<E: FaceEncoder + ?Sized>(dir: &Path, encoder: &mut E) -> Result<Self, GalleryError> {
        let read_err = |source| GalleryError::Directory { path: dir.to_path_buf(), source };

        let mut paths = Vec::new();
        for item in std::fs::read_dir(dir).map_err(read_err)? {
            let path = item.map_err(read_err)?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let (Some(stem), Some(file_name)) = (path.file_stem(), path.file_name()) else {
                continue;
            };
            let identity_key = stem.to_string_lossy().into_owned();
            let file_name = file_name.to_string_lossy().into_owned();

            let image = match image::open(&path) {
                Ok(img) => img.to_rgb8(),
                Err(e) => {
                    tracing::debug!(file = %file_name, error = %e, "not a decodable image, skipping");
                    continue;
                }
            };

            let faces = match encoder.faces(&image) {
                Ok(faces) => faces,
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "encoding failed, skipping");
                    continue;
                }
            };

            let face_count = faces.len();
            let Some(first) = faces.into_iter().next() else {
                tracing::debug!(file = %file_name, "no face found, skipping");
                continue;
            };
            if face_count > 1 {
                tracing::warn!(file = %file_name, faces = face_count, "multiple faces in reference image, using the first");
            }

            entries.push(GalleryEntry {
                identity_key,
                file_name,
                embedding: first.embedding,
            });
        }

        tracing::info!(dir = %dir.display(), enrolled = entries.len(), "gallery loaded");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&GalleryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ColorEncoder};
    use image::Rgb;

    #[test]
    fn test_load_skips_non_images_and_faceless_images() {
        let dir = tempfile::tempdir().unwrap();
        testing::write_face_image(&dir.path().join("bob.png"), Rgb([0, 200, 0]), None);
        testing::write_face_image(&dir.path().join("alice.png"), Rgb([200, 0, 0]), None);
        testing::write_face_image(&dir.path().join("empty.png"), Rgb([0, 0, 0]), None);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        std::fs::create_dir(dir.path().join("archive.png")).unwrap();

        let gallery = Gallery::load(dir.path(), &mut ColorEncoder::default()).unwrap();

        let keys: Vec<&str> = gallery.entries().iter().map(|e| e.identity_key.as_str()).collect();
        assert_eq!(keys, vec!["alice", "bob"]);
        assert_eq!(gallery.get(0).unwrap().file_name, "alice.png");
        assert_eq!(gallery.get(1).unwrap().embedding, testing::color_embedding(Rgb([0, 200, 0])));
    }

    #[test]
    fn test_load_uses_first_face_of_group_photo() {
        let dir = tempfile::tempdir().unwrap();
        testing::write_face_image(&dir.path().join("pair.png"), Rgb([10, 20, 30]), Some(Rgb([90, 90, 90])));

        let gallery = Gallery::load(dir.path(), &mut ColorEncoder::default()).unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].embedding, testing::color_embedding(Rgb([10, 20, 30])));
    }

    #[test]
    fn test_load_skips_images_the_encoder_rejects() {
        let dir = tempfile::tempdir().unwrap();
        testing::write_face_image(&dir.path().join("bad.png"), Rgb([1, 2, 3]), None);
        testing::write_face_image(&dir.path().join("good.png"), Rgb([4, 5, 6]), None);

        let mut encoder = ColorEncoder { fail_on: Some(Rgb([1, 2, 3])) };
        let gallery = Gallery::load(dir.path(), &mut encoder).unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.entries()[0].identity_key, "good");
    }

    #[test]
    fn test_load_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = Gallery::load(&missing, &mut ColorEncoder::default()).unwrap_err();
        assert!(matches!(err, GalleryError::Directory { .. }));
    }

    #[test]
    fn test_empty_directory_gives_empty_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::load(dir.path(), &mut ColorEncoder::default()).unwrap();
        assert!(gallery.is_empty());
    }
}
