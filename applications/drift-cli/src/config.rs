//! Drift configuration
//!
//! Layered: defaults, then an optional TOML file, then `DRIFT_` environment
//! variables (`DRIFT_PLAYER__AUDIO_QUALITY=low`, `DRIFT_SIMULATION__TIME_SCALE=60`).

use anyhow::{bail, Context, Result};
use drift_playback::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationConfig,
}

/// Settings of the simulated resolver, engine and catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Seed for the generated catalog and failure injection
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_catalog_size")]
    pub catalog_size: usize,

    /// Virtual seconds that pass per wall-clock second
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Engine clock resolution
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_resolve_latency_ms")]
    pub resolve_latency_ms: u64,

    #[serde(default = "default_related_latency_ms")]
    pub related_latency_ms: u64,

    /// Lifetime of resolved stream URLs
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,

    /// Probability that a resolution fails, 0.0 to 1.0
    #[serde(default)]
    pub failure_rate: f64,

    /// Directory holding downloaded copies named `<track id>.opus`
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Stop after this many tracks have started playing
    #[serde(default = "default_max_tracks")]
    pub max_tracks: usize,
}

impl DriftConfig {
    /// Load configuration from `path` (or `./drift.toml` if present) and the
    /// environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = Self::file_sources(path).add_source(
            config::Environment::with_prefix("DRIFT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self::finish(settings)
    }

    /// Load configuration from a file only, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::finish(Self::file_sources(Some(path)))
    }

    fn file_sources(path: Option<&Path>) -> config::ConfigBuilder<config::builder::DefaultState> {
        let settings = config::Config::builder();
        match path {
            Some(path) => settings.add_source(config::File::from(path).required(true)),
            None => settings.add_source(config::File::with_name("drift").required(false)),
        }
    }

    fn finish(settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Self = settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;

        let sim = &self.simulation;
        if sim.catalog_size == 0 {
            bail!("simulation.catalog_size must be at least 1");
        }
        if !(sim.time_scale.is_finite() && sim.time_scale > 0.0) {
            bail!("simulation.time_scale must be positive, got {}", sim.time_scale);
        }
        if sim.tick_ms == 0 {
            bail!("simulation.tick_ms must be at least 1");
        }
        if !(0.0..=1.0).contains(&sim.failure_rate) {
            bail!("simulation.failure_rate must be within 0.0..=1.0, got {}", sim.failure_rate);
        }
        Ok(())
    }
}

impl SimulationConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn resolve_latency(&self) -> Duration {
        Duration::from_millis(self.resolve_latency_ms)
    }

    pub fn related_latency(&self) -> Duration {
        Duration::from_millis(self.related_latency_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        default_simulation()
    }
}

// Default values
fn default_simulation() -> SimulationConfig {
    SimulationConfig {
        seed: default_seed(),
        catalog_size: default_catalog_size(),
        time_scale: default_time_scale(),
        tick_ms: default_tick_ms(),
        resolve_latency_ms: default_resolve_latency_ms(),
        related_latency_ms: default_related_latency_ms(),
        validity_secs: default_validity_secs(),
        failure_rate: 0.0,
        download_dir: None,
        max_tracks: default_max_tracks(),
    }
}

fn default_seed() -> u64 {
    7
}

fn default_catalog_size() -> usize {
    48
}

fn default_time_scale() -> f64 {
    30.0
}

fn default_tick_ms() -> u64 {
    100
}

fn default_resolve_latency_ms() -> u64 {
    80
}

fn default_related_latency_ms() -> u64 {
    150
}

fn default_validity_secs() -> u64 {
    600
}

fn default_max_tracks() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{AudioQuality, LoopMode};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = DriftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.catalog_size, 48);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [player]
            audio_quality = "low"
            loop_mode = "all"

            [player.radio]
            batch_size = 10

            [simulation]
            time_scale = 120.0
            "#,
        );

        let config = DriftConfig::from_file(file.path()).unwrap();
        assert_eq!(config.player.audio_quality, AudioQuality::Low);
        assert_eq!(config.player.loop_mode, LoopMode::All);
        assert_eq!(config.player.radio.batch_size, 10);
        assert_eq!(config.player.radio.low_watermark, 5);
        assert_eq!(config.player.prefetch_threshold_secs, 30);
        assert_eq!(config.simulation.time_scale, 120.0);
        assert_eq!(config.simulation.tick_ms, 100);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DriftConfig::from_file(&dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[simulation]\nfailure_rate = 1.5\n");
        let err = DriftConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failure_rate"));

        let file = write_config("[player.radio]\nbatch_size = 0\n");
        assert!(DriftConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_unknown_quality_is_rejected() {
        let file = write_config("[player]\naudio_quality = \"lossless\"\n");
        assert!(DriftConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = DriftConfig::default();
        config.simulation.download_dir = Some(PathBuf::from("/tmp/drift"));
        let text = toml::to_string(&config).unwrap();
        let file = write_config(&text);

        let loaded = DriftConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.player, config.player);
        assert_eq!(loaded.simulation.download_dir, config.simulation.download_dir);
    }
}
