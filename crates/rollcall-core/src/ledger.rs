//! Attendance ledger for one session.
//!
//! Holds at most one entry per student id. The first sighting wins: later
//! captures of the same student never change the recorded time.

use chrono::NaiveTime;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEntry {
    pub display_name: String,
    pub student_id: String,
    pub capture_time: NaiveTime,
}

#[derive(Debug, Default)]
pub struct Session {
    entries: Vec<AttendanceEntry>,
    seen: HashSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `student_id` unless already present.
    ///
    /// Returns the new entry, or `None` when the student was already recorded.
    pub fn record_if_new(
        &mut self,
        student_id: &str,
        display_name: &str,
        time: NaiveTime,
    ) -> Option<&AttendanceEntry> {
        if !self.seen.insert(student_id.to_string()) {
            return None;
        }
        self.entries.push(AttendanceEntry {
            display_name: display_name.to_string(),
            student_id: student_id.to_string(),
            capture_time: time,
        });
        self.entries.last()
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }

    /// Entries in first-seen order.
    pub fn list(&self) -> &[AttendanceEntry] {
        &self.entries
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.seen.contains(student_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
