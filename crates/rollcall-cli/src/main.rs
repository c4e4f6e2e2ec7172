use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{matcher, Command, EuclideanMatcher, Gallery, LocalClock, OnnxFaceEncoder, Roster, Station};
use rollcall_hw::Camera;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod shell;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face recognition attendance")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive attendance session
    Session {
        /// Course name, printed in the export header
        #[arg(long)]
        course_name: String,
        /// Course code, printed in the export header
        #[arg(long)]
        course_code: String,
    },
    /// List enrolled identities and the names they resolve to
    Gallery,
    /// Match the faces in one image without recording attendance
    Identify {
        /// Image file to match
        image: PathBuf,
    },
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration resolved");

    match cli.command {
        Commands::Session { course_name, course_code } => {
            let (gallery, roster, encoder) = load_enrollment(&config)?;
            let nearest = EuclideanMatcher { tolerance: config.match_tolerance };
            let mut station = Station::new(gallery, roster, encoder, nearest, LocalClock);

            // Course fields gate every capture; reject blanks before the loop starts.
            station.handle(Command::SetCourse { name: course_name, code: course_code })?;
            if let Some(course) = station.course() {
                println!("Attendance for {} ({})", course.name(), course.code());
            }
            println!("{} students enrolled", station.gallery().len());

            shell::run(&mut station, &config, std::io::stdin().lock(), std::io::stdout())?;
            tracing::info!(captured = station.session().len(), "session ended");
        }
        Commands::Gallery => {
            let (gallery, roster, _) = load_enrollment(&config)?;
            if gallery.is_empty() {
                println!("No faces enrolled in {}", config.gallery_dir.display());
            }
            for (index, entry) in gallery.entries().iter().enumerate() {
                let identity = roster.resolve(entry, index);
                let note = if identity.enrolled { "" } else { "  (not in roster)" };
                println!(
                    "{index:>3}  {:<24} {:<16} {}{note}",
                    entry.file_name, identity.student_id, identity.display_name
                );
            }
        }
        Commands::Identify { image } => {
            let (gallery, roster, mut encoder) = load_enrollment(&config)?;
            let bytes = std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let frame = matcher::decode_frame(&bytes)?;
            let nearest = EuclideanMatcher { tolerance: config.match_tolerance };
            let result = matcher::match_frame(&frame, &mut encoder, &nearest, &gallery, &roster)?;

            for m in &result.matches {
                println!(
                    "{} ({})  distance {:.3}  box top={} right={} bottom={} left={}",
                    m.display_name,
                    m.student_id,
                    m.distance,
                    m.location.top,
                    m.location.right,
                    m.location.bottom,
                    m.location.left
                );
            }
            if !result.unmatched.is_empty() {
                println!("{} face(s) did not match anyone", result.unmatched.len());
            }
            if result.matches.is_empty() && result.unmatched.is_empty() {
                println!("No faces found");
            }
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for d in devices {
                println!("{}  {} [{}] {}", d.path, d.name, d.driver, d.bus);
            }
        }
    }

    Ok(())
}

/// Load the roster, the ONNX encoder and the encoded gallery.
fn load_enrollment(config: &Config) -> Result<(Gallery, Roster, OnnxFaceEncoder)> {
    let roster = load_roster(&config.roster_path)?;
    let mut encoder = OnnxFaceEncoder::load(&config.model_dir)
        .with_context(|| format!("loading face models from {}", config.model_dir.display()))?;
    let gallery = Gallery::load(&config.gallery_dir, &mut encoder)?;
    Ok((gallery, roster, encoder))
}

/// A missing roster file is tolerated: every match then gets a synthesized identity.
fn load_roster(path: &Path) -> Result<Roster> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "roster not found, students will be listed by file name");
        return Ok(Roster::default());
    }
    Ok(Roster::load(path)?)
}
