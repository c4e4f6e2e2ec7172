//! Interactive attendance session: reads one command per line and
//! dispatches it to the station.

use crate::config::Config;
use chrono::NaiveDateTime;
use rollcall_core::{AttendanceEntry, Clock, Command, FaceEncoder, Matcher, Outcome, Station};
use rollcall_hw::Camera;
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  capture <image>   match faces in an image file and record attendance
  snap              take a camera snapshot and record attendance
  list              show captured students
  export            write the attendance workbook
  reset             clear all captured students
  reload            re-encode the gallery directory
  help              show this text
  quit              end the session";

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Capture(PathBuf),
    Snap,
    List,
    Export,
    Reset,
    Reload,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    match (word, rest.is_empty()) {
        ("", _) => ShellCommand::Empty,
        ("capture", false) => ShellCommand::Capture(PathBuf::from(rest)),
        ("capture", true) => ShellCommand::Invalid("capture needs an image path".into()),
        ("snap", true) => ShellCommand::Snap,
        ("list", true) => ShellCommand::List,
        ("export", true) => ShellCommand::Export,
        ("reset", true) => ShellCommand::Reset,
        ("reload", true) => ShellCommand::Reload,
        ("help", true) | ("?", true) => ShellCommand::Help,
        ("quit", true) | ("exit", true) => ShellCommand::Quit,
        _ => ShellCommand::Invalid(format!("unknown command: {line} (try `help`)")),
    }
}

/// File name for the annotated copy of a capture taken at `captured_at`.
pub fn annotated_file_name(captured_at: NaiveDateTime) -> String {
    format!("capture_{}.png", captured_at.format("%Y%m%d_%H%M%S%.3f"))
}

pub fn format_entry(entry: &AttendanceEntry) -> String {
    format!(
        "{} ({}) - Captured at {}",
        entry.display_name,
        entry.student_id,
        entry.capture_time.format("%H:%M:%S")
    )
}

/// Run the session loop until `quit` or end of input.
///
/// Command failures are reported and the session continues.
pub fn run<E, M, C>(
    station: &mut Station<E, M, C>,
    config: &Config,
    input: impl BufRead,
    mut out: impl Write,
) -> anyhow::Result<()>
where
    E: FaceEncoder,
    M: Matcher,
    C: Clock,
{
    let mut camera: Option<Camera> = None;
    writeln!(out, "{HELP}")?;

    for line in input.lines() {
        let command = match parse_line(&line?) {
            ShellCommand::Empty => continue,
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            ShellCommand::Invalid(msg) => {
                writeln!(out, "{msg}")?;
                continue;
            }
            ShellCommand::Capture(path) => match std::fs::read(&path) {
                Ok(bytes) => Command::CaptureBytes(bytes),
                Err(e) => {
                    writeln!(out, "cannot read {}: {e}", path.display())?;
                    continue;
                }
            },
            ShellCommand::Snap => match snapshot(&mut camera, config) {
                Ok(frame) => Command::Capture(frame),
                Err(e) => {
                    writeln!(out, "camera: {e}")?;
                    continue;
                }
            },
            ShellCommand::List => Command::List,
            ShellCommand::Export => Command::Export { dir: config.export_dir.clone() },
            ShellCommand::Reset => Command::Reset,
            ShellCommand::Reload => Command::ReloadGallery { dir: config.gallery_dir.clone() },
        };

        match station.handle(command) {
            Ok(outcome) => report(&mut out, outcome, config)?,
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                writeln!(out, "error: {e}")?;
            }
        }
    }

    Ok(())
}

fn snapshot(camera: &mut Option<Camera>, config: &Config) -> Result<image::RgbImage, rollcall_hw::CameraError> {
    let cam = match camera.take() {
        Some(cam) => cam,
        None => Camera::open(&config.camera_device)?,
    };
    let frame = cam.snapshot(config.warmup_frames);
    *camera = Some(cam);
    frame
}

fn report(out: &mut impl Write, outcome: Outcome, config: &Config) -> anyhow::Result<()> {
    match outcome {
        Outcome::Captured { recorded, repeated, unmatched, annotated, captured_at } => {
            for entry in &recorded {
                writeln!(out, "recorded: {}", format_entry(entry))?;
            }
            for m in &repeated {
                writeln!(out, "already recorded: {} ({})", m.display_name, m.student_id)?;
            }
            if unmatched > 0 {
                writeln!(out, "{unmatched} face(s) did not match anyone")?;
            }
            if recorded.is_empty() && repeated.is_empty() && unmatched == 0 {
                writeln!(out, "no faces found")?;
            }
            if let Some(dir) = &config.annotate_dir {
                let path = dir.join(annotated_file_name(captured_at));
                match std::fs::create_dir_all(dir).map_err(image::ImageError::IoError).and_then(|_| annotated.save(&path)) {
                    Ok(()) => writeln!(out, "annotated frame: {}", path.display())?,
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save annotated frame"),
                }
            }
        }
        Outcome::Entries(entries) if entries.is_empty() => writeln!(out, "no students captured yet")?,
        Outcome::Entries(entries) => {
            writeln!(out, "Captured Students")?;
            for entry in &entries {
                writeln!(out, "  {}", format_entry(entry))?;
            }
        }
        Outcome::Exported { path, students } => {
            writeln!(out, "Attendance generated for {students} students: {}", path.display())?;
        }
        Outcome::NothingToExport => {
            writeln!(out, "No students captured yet. Please capture students before generating attendance.")?;
        }
        Outcome::Reset => writeln!(out, "Session reset. All captured students cleared.")?,
        Outcome::GalleryReloaded { enrolled } => writeln!(out, "gallery reloaded: {enrolled} enrolled")?,
        Outcome::CourseSet(course) => writeln!(out, "Attendance for {} ({})", course.name(), course.code())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use image::{Rgb, RgbImage};
    use rollcall_core::{
        DetectedFace, Embedding, EncoderError, EuclideanMatcher, FaceBox, Gallery, GalleryEntry, Roster,
    };
    use std::io::Cursor;

    /// One face per non-black frame, described by the top-left pixel color.
    struct SolidColorEncoder;

    impl FaceEncoder for SolidColorEncoder {
        fn faces(&mut self, frame: &RgbImage) -> Result<Vec<DetectedFace>, EncoderError> {
            let Some(px) = frame.pixels().next() else {
                return Ok(vec![]);
            };
            if px.0 == [0, 0, 0] {
                return Ok(vec![]);
            }
            Ok(vec![DetectedFace {
                location: FaceBox {
                    top: 0,
                    right: frame.width() - 1,
                    bottom: frame.height() - 1,
                    left: 0,
                },
                embedding: color_embedding(*px),
            }])
        }
    }

    fn color_embedding(color: Rgb<u8>) -> Embedding {
        Embedding::new(color.0.iter().map(|&c| c as f32 / 255.0).collect())
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2026, 3, 9)
                .and_then(|d| d.and_hms_opt(9, 15, 30))
                .unwrap()
        }
    }

    fn test_config(export_dir: &std::path::Path) -> Config {
        Config {
            gallery_dir: export_dir.join("gallery"),
            roster_path: export_dir.join("roster.json"),
            model_dir: export_dir.join("models"),
            match_tolerance: rollcall_core::DEFAULT_TOLERANCE,
            export_dir: export_dir.to_path_buf(),
            camera_device: "/dev/rollcall-no-such-camera".into(),
            warmup_frames: 0,
            annotate_dir: None,
        }
    }

    #[test]
    fn test_session_loop_reports_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let alice = Rgb([200, 0, 0]);
        RgbImage::from_pixel(4, 4, alice).save(dir.path().join("alice.png")).unwrap();
        std::fs::write(dir.path().join("junk.png"), b"not an image").unwrap();

        let gallery = Gallery::from_entries(vec![GalleryEntry {
            identity_key: "alice".into(),
            file_name: "alice.jpg".into(),
            embedding: color_embedding(alice),
        }]);
        let roster = Roster::from_json(r#"{"alice.jpg": {"name": "Alice A", "id": "S001"}}"#).unwrap();
        let mut station = Station::new(gallery, roster, SolidColorEncoder, EuclideanMatcher::default(), FixedClock);
        station.handle(Command::SetCourse { name: "Operating Systems".into(), code: "CS-350".into() }).unwrap();

        let script = format!(
            "capture {missing}\ncapture {junk}\ncapture {alice}\nexport\nreset\nlist\nexport\nquit\ncapture {alice}\nlist\n",
            missing = dir.path().join("missing.png").display(),
            junk = dir.path().join("junk.png").display(),
            alice = dir.path().join("alice.png").display(),
        );
        let config = test_config(dir.path());
        let mut out = Vec::new();
        run(&mut station, &config, Cursor::new(script), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("cannot read"), "{out}");
        assert!(out.contains("error: "), "{out}");
        assert!(out.contains("recorded: Alice A (S001) - Captured at 09:15:30"), "{out}");
        assert!(out.contains("Attendance generated for 1 students"), "{out}");
        assert!(out.contains("Session reset. All captured students cleared."), "{out}");
        assert!(out.contains("No students captured yet. Please capture students"), "{out}");
        assert!(dir.path().join("attendance_20260309_091530.xlsx").exists());

        // Nothing after `quit` runs.
        assert_eq!(out.matches("no students captured yet").count(), 1, "{out}");
        assert_eq!(out.matches("recorded: ").count(), 1, "{out}");
        assert!(station.session().is_empty());
    }

    #[test]
    fn test_annotated_file_name_uses_capture_time() {
        let at = FixedClock.now();
        assert_eq!(annotated_file_name(at), "capture_20260309_091530.000.png");
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("  capture  shots/one.jpg "), ShellCommand::Capture(PathBuf::from("shots/one.jpg")));
        assert_eq!(parse_line("snap"), ShellCommand::Snap);
        assert_eq!(parse_line("list"), ShellCommand::List);
        assert_eq!(parse_line("export"), ShellCommand::Export);
        assert_eq!(parse_line("reset"), ShellCommand::Reset);
        assert_eq!(parse_line("reload"), ShellCommand::Reload);
        assert_eq!(parse_line("?"), ShellCommand::Help);
        assert_eq!(parse_line("exit"), ShellCommand::Quit);
        assert_eq!(parse_line("   "), ShellCommand::Empty);
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(matches!(parse_line("capture"), ShellCommand::Invalid(_)));
        assert!(matches!(parse_line("list everyone"), ShellCommand::Invalid(_)));
        assert!(matches!(parse_line("dance"), ShellCommand::Invalid(_)));
    }

    #[test]
    fn test_format_entry() {
        let entry = AttendanceEntry {
            display_name: "Alice A".into(),
            student_id: "S001".into(),
            capture_time: NaiveTime::from_hms_opt(9, 5, 7).unwrap(),
        };
        assert_eq!(format_entry(&entry), "Alice A (S001) - Captured at 09:05:07");
    }
}
