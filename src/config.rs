//! Configuration management for the voicelink client

use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Default transcription endpoint (local development server)
const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/ws/transcribe";

/// Default capture-to-network handoff depth, in frames
const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket URL of the transcription service
    pub server_url: String,

    /// Capture-to-network handoff queue depth, in frames
    pub queue_depth: usize,

    /// Sample rate for synthesized speech playback
    pub playback_sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            playback_sample_rate: crate::voice::DEFAULT_PLAYBACK_SAMPLE_RATE,
        }
    }
}

/// On-disk configuration file shape (all fields optional)
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    server_url: Option<String>,
    queue_depth: Option<usize>,
    playback_sample_rate: Option<u32>,
}

impl Config {
    /// Load configuration: defaults, then config file, then env overrides
    ///
    /// The file lives at `<config dir>/voicelink/voicelink.toml` and is
    /// optional. Env overrides: `VOICELINK_SERVER_URL`,
    /// `VOICELINK_QUEUE_DEPTH`, `VOICELINK_PLAYBACK_SAMPLE_RATE`.
    ///
    /// # Errors
    ///
    /// Returns error if the config file is malformed or a value fails
    /// validation
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let raw = std::fs::read_to_string(&path)?;
            let file: ConfigFile = toml::from_str(&raw)?;
            tracing::debug!(path = %path.display(), "loaded config file");
            config.apply_file(file);
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Platform config file path, if a home directory can be resolved
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "omni", "voicelink")
            .map(|dirs| dirs.config_dir().join("voicelink.toml"))
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.server_url {
            self.server_url = url;
        }
        if let Some(depth) = file.queue_depth {
            self.queue_depth = depth;
        }
        if let Some(rate) = file.playback_sample_rate {
            self.playback_sample_rate = rate;
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("VOICELINK_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(depth) = std::env::var("VOICELINK_QUEUE_DEPTH") {
            self.queue_depth = depth
                .parse()
                .map_err(|_| Error::Config(format!("invalid VOICELINK_QUEUE_DEPTH: {depth}")))?;
        }
        if let Ok(rate) = std::env::var("VOICELINK_PLAYBACK_SAMPLE_RATE") {
            self.playback_sample_rate = rate.parse().map_err(|_| {
                Error::Config(format!("invalid VOICELINK_PLAYBACK_SAMPLE_RATE: {rate}"))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            return Err(Error::Config(format!(
                "server_url must be a ws:// or wss:// URL, got {}",
                self.server_url
            )));
        }
        if self.queue_depth == 0 {
            return Err(Error::Config("queue_depth must be at least 1".to_string()));
        }
        if self.playback_sample_rate == 0 {
            return Err(Error::Config(
                "playback_sample_rate must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}
