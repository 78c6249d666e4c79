//! Configuration Management

use crate::analysis::rdp_simplification::DEFAULT_TOLERANCE;
use crate::capture::event_window::{
    DEFAULT_DEDUP_RADIUS_M, DEFAULT_DEDUP_TIME_WINDOW_MS, DEFAULT_MAX_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Deduplication window settings
    #[serde(default)]
    pub window: WindowConfig,
    /// Render pass settings
    #[serde(default)]
    pub render: RenderConfig,
}

/// Event window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum buffered events
    pub max_size: usize,
    /// Samples closer than this to a recent event are duplicates (meters)
    pub dedup_radius_m: f64,
    /// How long a buffered event blocks nearby samples (ms)
    pub dedup_time_window_ms: u64,
}

/// Render configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// RDP tolerance (projected units, usually pixels)
    pub simplify_tolerance_px: f64,
    /// Do not draw segments across time gaps longer than this (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_segment_gap_ms: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            dedup_radius_m: DEFAULT_DEDUP_RADIUS_M,
            dedup_time_window_ms: DEFAULT_DEDUP_TIME_WINDOW_MS,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance_px: DEFAULT_TOLERANCE,
            max_segment_gap_ms: None,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.window.max_size == 0 {
            return Err(crate::Error::Config("max_size must be > 0".to_string()));
        }
        if !self.window.dedup_radius_m.is_finite() || self.window.dedup_radius_m < 0.0 {
            return Err(crate::Error::Config(format!(
                "dedup_radius_m must be a finite value >= 0, got {}",
                self.window.dedup_radius_m
            )));
        }
        if !self.render.simplify_tolerance_px.is_finite() || self.render.simplify_tolerance_px < 0.0 {
            return Err(crate::Error::Config(format!(
                "simplify_tolerance_px must be a finite value >= 0, got {}",
                self.render.simplify_tolerance_px
            )));
        }
        if self.render.max_segment_gap_ms == Some(0) {
            return Err(crate::Error::Config("max_segment_gap_ms must be > 0 when set".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Path a command reads: the `--config` override if given, else the default
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit.map(Path::to_path_buf).unwrap_or_else(Self::default_path)
    }

    /// Load from the `--config` override, or from the default location
    pub fn load_from(explicit: Option<&Path>) -> Result<Self, crate::Error> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Write the default configuration to `path`.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn init(path: &Path, force: bool) -> Result<Self, crate::Error> {
        if path.exists() && !force {
            return Err(crate::Error::Config(format!(
                "Config already exists at {:?}. Use --force to overwrite.",
                path
            )));
        }
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".fogtrail").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
