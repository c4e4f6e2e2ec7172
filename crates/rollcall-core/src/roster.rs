//! Student roster: maps gallery image file names to display name and student id.
//!
//! The roster file is JSON of the form
//! `{"jdoe.jpg": {"name": "Jane Doe", "id": "S042"}}`.

use crate::gallery::GalleryEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Extension assumed for roster keys when the exact file name is not listed.
const ROSTER_KEY_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("cannot read roster {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed roster {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub id: String,
}

/// Display name and student id resolved for one gallery entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub student_id: String,
    /// False when the roster had no record and the identity was synthesized.
    pub enrolled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    records: HashMap<String, StudentRecord>,
}

impl Roster {
    pub fn from_records(records: HashMap<String, StudentRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::from_records)
    }

    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: display.clone(),
            source,
        })?;
        let roster = Self::from_json(&text).map_err(|source| RosterError::Parse { path: display, source })?;
        tracing::info!(path = %path.display(), students = roster.len(), "roster loaded");
        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve the identity of the gallery entry at `index`.
    ///
    /// Looks up the entry's file name, then `<identity key>.jpg`. Unlisted
    /// entries get the upper-cased key as name and `Unknown-<index>` as id.
    pub fn resolve(&self, entry: &GalleryEntry, index: usize) -> Identity {
        let record = self
            .records
            .get(&entry.file_name)
            .or_else(|| self.records.get(&format!("{}.{ROSTER_KEY_EXTENSION}", entry.identity_key)));

        match record {
            Some(r) => Identity {
                display_name: r.name.clone(),
                student_id: r.id.clone(),
                enrolled: true,
            },
            None => Identity {
                display_name: entry.identity_key.to_uppercase(),
                student_id: format!("Unknown-{index:03}"),
                enrolled: false,
            },
        }
    }
}
