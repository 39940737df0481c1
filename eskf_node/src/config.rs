//! Configuration parsing and validation for the replay node.

use eskf_dispatch::DispatchConfig;
use eyre::{Result, WrapErr, ensure};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Fusion mask, publish rate and frame id.
    #[serde(flatten)]
    pub dispatch: DispatchConfig,

    /// Recorded sensor stream to feed in.
    pub replay: ReplayConfig,

    /// Where published poses go.
    #[serde(default)]
    pub output: OutputConfig,

    /// How long to keep publishing after the recording is exhausted.
    #[serde(default, with = "humantime_serde")]
    pub linger: Duration,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Relative paths inside the file are resolved against the directory
    /// containing it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = serde_yaml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.replay.path);
        if let Some(out) = self.output.path.as_mut() {
            resolve(out);
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        self.dispatch.validate()?;

        ensure!(
            !self.replay.path.as_os_str().is_empty(),
            "replay.path cannot be empty"
        );
        ensure!(
            !self.replay.realtime || !self.replay.max_gap.is_zero(),
            "replay.max_gap must be greater than zero in realtime mode"
        );
        if let Some(out) = &self.output.path {
            ensure!(!out.as_os_str().is_empty(), "output.path cannot be empty");
        }

        Ok(())
    }
}

/// Recorded input stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    /// JSON-lines file, one tagged sensor record per line.
    pub path: PathBuf,

    /// Pace delivery by the gaps between recorded stamps.
    #[serde(default)]
    pub realtime: bool,

    /// Upper bound on a single pacing delay.
    #[serde(default = "default_max_gap", with = "humantime_serde")]
    pub max_gap: Duration,
}

fn default_max_gap() -> Duration {
    Duration::from_secs(1)
}

/// Pose output destination.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// JSON-lines file to write; standard output when omitted.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use eskf_dispatch::FusionMask;

    #[test]
    fn test_parse_example_config() {
        let yaml = r#"
fusion_mask: 7
publish_rate: 50
frame_id: /pose

replay:
  path: flight.jsonl
  realtime: true
  max_gap: 250ms

output:
  path: poses.jsonl

linger: 500ms
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.dispatch.fusion_mask, FusionMask::VISION);
        assert_eq!(config.dispatch.publish_rate, 50.0);
        assert_eq!(config.dispatch.frame_id, "/pose");
        assert_eq!(config.replay.path, PathBuf::from("flight.jsonl"));
        assert!(config.replay.realtime);
        assert_eq!(config.replay.max_gap, Duration::from_millis(250));
        assert_eq!(config.output.path, Some(PathBuf::from("poses.jsonl")));
        assert_eq!(config.linger, Duration::from_millis(500));
    }

    #[test]
    fn test_defaults() {
        let yaml = r#"
replay:
  path: flight.jsonl
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.dispatch, DispatchConfig::default());
        assert!(!config.replay.realtime);
        assert_eq!(config.replay.max_gap, Duration::from_secs(1));
        assert_eq!(config.output.path, None);
        assert_eq!(config.linger, Duration::ZERO);
    }

    #[test]
    fn test_mask_as_flag_names() {
        let yaml = r#"
fusion_mask: [gps_position, gps_height, optical_flow]
replay:
  path: flight.jsonl
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.dispatch.fusion_mask,
            FusionMask::GPS_POSITION | FusionMask::GPS_HEIGHT | FusionMask::OPTICAL_FLOW
        );
    }

    #[test]
    fn test_reject_unknown_mask_bits() {
        let yaml = r#"
fusion_mask: 1024
replay:
  path: flight.jsonl
"#;

        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_reject_zero_publish_rate() {
        let yaml = r#"
publish_rate: 0
replay:
  path: flight.jsonl
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_zero_max_gap_in_realtime() {
        let yaml = r#"
replay:
  path: flight.jsonl
  realtime: true
  max_gap: 0s
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let yaml = r#"
replay:
  path: data/flight.jsonl
output:
  path: /tmp/poses.jsonl
"#;

        let mut config: Config = serde_yaml::from_str(yaml).unwrap();
        config.resolve_paths(Path::new("/etc/eskf"));

        assert_eq!(config.replay.path, PathBuf::from("/etc/eskf/data/flight.jsonl"));
        assert_eq!(config.output.path, Some(PathBuf::from("/tmp/poses.jsonl")));
    }
}
