use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional TOML overrides; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub gallery_dir: Option<PathBuf>,
    pub roster_path: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub match_tolerance: Option<f32>,
    pub export_dir: Option<PathBuf>,
    pub camera_device: Option<String>,
    pub warmup_frames: Option<usize>,
    pub annotate_dir: Option<PathBuf>,
}

/// Resolved configuration: defaults, then the TOML file, then `ROLLCALL_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory of reference portraits, one per student.
    pub gallery_dir: PathBuf,
    /// JSON roster mapping image file names to name and id.
    pub roster_path: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum embedding distance accepted as a match.
    pub match_tolerance: f32,
    /// Where attendance workbooks are written.
    pub export_dir: PathBuf,
    /// V4L2 device used by `snap`.
    pub camera_device: String,
    /// Frames discarded before a snapshot (exposure settling).
    pub warmup_frames: usize,
    /// If set, annotated capture frames are saved here.
    pub annotate_dir: Option<PathBuf>,
}

impl Config {
    /// Load from an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing config {}", p.display()))?
            }
            None => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, from_file: Option<PathBuf>, default: PathBuf| {
            env(key).map(PathBuf::from).or(from_file).unwrap_or(default)
        };
        let mut match_tolerance = parse_var::<f32>(&env, "ROLLCALL_MATCH_TOLERANCE")
            .or(file.match_tolerance)
            .unwrap_or(rollcall_core::DEFAULT_TOLERANCE);
        if !(match_tolerance.is_finite() && match_tolerance > 0.0) {
            tracing::warn!(match_tolerance, "match tolerance must be finite and positive, using default");
            match_tolerance = rollcall_core::DEFAULT_TOLERANCE;
        }

        Self {
            gallery_dir: path("ROLLCALL_GALLERY_DIR", file.gallery_dir, PathBuf::from("images")),
            roster_path: path("ROLLCALL_ROSTER_PATH", file.roster_path, PathBuf::from("student_metadata.json")),
            model_dir: path("ROLLCALL_MODEL_DIR", file.model_dir, rollcall_core::default_model_dir()),
            match_tolerance,
            export_dir: path("ROLLCALL_EXPORT_DIR", file.export_dir, PathBuf::from(".")),
            camera_device: env("ROLLCALL_CAMERA_DEVICE")
                .or(file.camera_device)
                .unwrap_or_else(|| "/dev/video0".to_string()),
            warmup_frames: parse_var::<usize>(&env, "ROLLCALL_WARMUP_FRAMES").or(file.warmup_frames).unwrap_or(4),
            annotate_dir: env("ROLLCALL_ANNOTATE_DIR").map(PathBuf::from).or(file.annotate_dir),
        }
    }
}

fn parse_var<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(file: FileConfig, vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::resolve(file, |k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = resolve(FileConfig::default(), &[]);
        assert_eq!(c.gallery_dir, PathBuf::from("images"));
        assert_eq!(c.roster_path, PathBuf::from("student_metadata.json"));
        assert_eq!(c.match_tolerance, rollcall_core::DEFAULT_TOLERANCE);
        assert_eq!(c.camera_device, "/dev/video0");
        assert_eq!(c.warmup_frames, 4);
        assert!(c.annotate_dir.is_none());
    }

    #[test]
    fn test_file_then_env_precedence() {
        let file: FileConfig = toml::from_str(
            r#"
            gallery_dir = "/srv/portraits"
            match_tolerance = 0.9
            warmup_frames = 2
            "#,
        )
        .unwrap();
        let c = resolve(file, &[("ROLLCALL_GALLERY_DIR", "/env/portraits"), ("ROLLCALL_ANNOTATE_DIR", "/tmp/frames")]);
        assert_eq!(c.gallery_dir, PathBuf::from("/env/portraits"));
        assert_eq!(c.match_tolerance, 0.9);
        assert_eq!(c.warmup_frames, 2);
        assert_eq!(c.annotate_dir, Some(PathBuf::from("/tmp/frames")));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let c = resolve(
            FileConfig::default(),
            &[("ROLLCALL_WARMUP_FRAMES", "lots"), ("ROLLCALL_MATCH_TOLERANCE", "-1")],
        );
        assert_eq!(c.warmup_frames, 4);
        assert_eq!(c.match_tolerance, rollcall_core::DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_non_finite_tolerance_falls_back_to_default() {
        for value in ["inf", "NaN", "0"] {
            let c = resolve(FileConfig::default(), &[("ROLLCALL_MATCH_TOLERANCE", value)]);
            assert_eq!(c.match_tolerance, rollcall_core::DEFAULT_TOLERANCE, "{value}");
        }
        let file = FileConfig { match_tolerance: Some(f32::INFINITY), ..FileConfig::default() };
        assert_eq!(resolve(file, &[]).match_tolerance, rollcall_core::DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_unknown_file_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("gallery = \"typo\"").is_err());
    }

    #[test]
    fn test_load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.toml");
        std::fs::write(&path, "export_dir = \"/srv/exports\"\n").unwrap();
        assert!(Config::load(Some(&path)).is_ok());
        std::fs::write(&path, "export_dir = [1, 2]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
