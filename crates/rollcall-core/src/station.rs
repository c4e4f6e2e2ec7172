//! Attendance station: the command dispatcher that owns one session.
//!
//! Every command runs to completion before the next one is accepted. The
//! gallery is only rebuilt when a `ReloadGallery` command asks for it.

use crate::encoder::FaceEncoder;
use crate::gallery::{Gallery, GalleryError};
use crate::ledger::{AttendanceEntry, Session};
use crate::matcher::{self, FaceMatch, MatchError, Matcher};
use crate::report::{AttendanceReport, Course, ReportError};
use crate::roster::Roster;
use chrono::{Local, NaiveDateTime};
use image::RgbImage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("course name and course code are required")]
    CourseRequired,
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Source of wall-clock time for capture stamps and export names.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of day, as shown to the operator.
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug)]
pub enum Command {
    SetCourse { name: String, code: String },
    Capture(RgbImage),
    /// Encoded still image, decoded before matching.
    CaptureBytes(Vec<u8>),
    List,
    Export { dir: PathBuf },
    Reset,
    ReloadGallery { dir: PathBuf },
}

#[derive(Debug)]
pub enum Outcome {
    CourseSet(Course),
    Captured {
        /// Matches recorded for the first time by this capture.
        recorded: Vec<AttendanceEntry>,
        /// Matches of students already in the ledger.
        repeated: Vec<FaceMatch>,
        unmatched: usize,
        annotated: RgbImage,
        /// Clock reading stamped on every entry this capture recorded.
        captured_at: NaiveDateTime,
    },
    Entries(Vec<AttendanceEntry>),
    Exported { path: PathBuf, students: usize },
    /// Export requested with an empty ledger; no file was written.
    NothingToExport,
    Reset,
    GalleryReloaded { enrolled: usize },
}

pub struct Station<E, M, C = LocalClock> {
    gallery: Gallery,
    roster: Roster,
    encoder: E,
    matcher: M,
    clock: C,
    course: Option<Course>,
    session: Session,
}

impl<E: FaceEncoder, M: Matcher, C: Clock> Station<E, M, C> {
    pub fn new(gallery: Gallery, roster: Roster, encoder: E, matcher: M, clock: C) -> Self {
        Self {
            gallery,
            roster,
            encoder,
            matcher,
            clock,
            course: None,
            session: Session::new(),
        }
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn handle(&mut self, command: Command) -> Result<Outcome, StationError> {
        match command {
            Command::SetCourse { name, code } => {
                let course = Course::new(&name, &code).ok_or(StationError::CourseRequired)?;
                tracing::info!(name = course.name(), code = course.code(), "course set");
                self.course = Some(course.clone());
                Ok(Outcome::CourseSet(course))
            }
            Command::Capture(frame) => self.capture(&frame),
            Command::CaptureBytes(bytes) => {
                self.require_course()?;
                let frame = matcher::decode_frame(&bytes)?;
                self.capture(&frame)
            }
            Command::List => Ok(Outcome::Entries(self.session.list().to_vec())),
            Command::Export { dir } => self.export(dir),
            Command::Reset => {
                self.session.reset();
                tracing::info!("session reset");
                Ok(Outcome::Reset)
            }
            Command::ReloadGallery { dir } => {
                self.gallery = Gallery::load(&dir, &mut self.encoder)?;
                Ok(Outcome::GalleryReloaded { enrolled: self.gallery.len() })
            }
        }
    }

    fn require_course(&self) -> Result<&Course, StationError> {
        self.course.as_ref().ok_or(StationError::CourseRequired)
    }

    fn capture(&mut self, frame: &RgbImage) -> Result<Outcome, StationError> {
        self.require_course()?;

        let matches = matcher::match_frame(frame, &mut self.encoder, &self.matcher, &self.gallery, &self.roster)?;
        let captured_at = self.clock.now();
        let time = captured_at.time();

        let mut recorded = Vec::new();
        let mut repeated = Vec::new();
        for m in &matches.matches {
            match self.session.record_if_new(&m.student_id, &m.display_name, time) {
                Some(entry) => {
                    tracing::info!(student_id = %entry.student_id, name = %entry.display_name, "attendance recorded");
                    recorded.push(entry.clone());
                }
                None => repeated.push(m.clone()),
            }
        }

        tracing::debug!(
            recorded = recorded.len(),
            repeated = repeated.len(),
            unmatched = matches.unmatched.len(),
            "capture processed"
        );

        Ok(Outcome::Captured {
            recorded,
            repeated,
            unmatched: matches.unmatched.len(),
            annotated: matcher::annotate(frame, &matches),
            captured_at,
        })
    }

    fn export(&self, dir: PathBuf) -> Result<Outcome, StationError> {
        let course = self.require_course()?;
        let now = self.clock.now();

        match AttendanceReport::build(self.session.list(), course, now.date()) {
            Ok(report) => {
                let path = report.write_xlsx(&dir, now)?;
                Ok(Outcome::Exported { path, students: report.student_count() })
            }
            Err(ReportError::NothingToExport) => {
                tracing::warn!("export requested with no students captured");
                Ok(Outcome::NothingToExport)
            }
            Err(e) => Err(e.into()),
        }
    }
}
