use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    pub robot: RobotConfig,
    pub timing: TimingConfig,
    pub persistence: PersistenceConfig,
}

impl FirmwareConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. Env var overrides are applied after loading.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: FirmwareConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return
    /// defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WREN_STATE_PATH") {
            self.persistence.state_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("WREN_ARCHETYPE") {
            self.robot.archetype = v;
        }
        if let Ok(v) = std::env::var("WREN_STREAM_ON_BOOT") {
            if let Ok(b) = v.parse() {
                self.timing.stream_on_boot = b;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Starting temperament: "balanced", "bold_explorer", "shy_observer"
    /// or "playful_friend". Persisted traits override this on later boots.
    pub archetype: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            archetype: "balanced".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Main loop rate. The protocol and the reflex controller assume 50.
    pub tick_hz: u32,
    /// Cognition tier cadence in seconds.
    pub medium_interval_secs: f32,
    /// Consolidation tier cadence in seconds.
    pub slow_interval_secs: f32,
    /// Telemetry stream cadence in milliseconds.
    pub stream_interval_ms: u64,
    /// Start streaming without waiting for !STREAM:ON.
    pub stream_on_boot: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_hz: 50,
            medium_interval_secs: 5.0,
            slow_interval_secs: 30.0,
            stream_interval_ms: 500,
            stream_on_boot: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub state_path: PathBuf,
    /// Save learned state during the slow tier, not only on shutdown.
    pub autosave: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("wren_state.bin"),
            autosave: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = FirmwareConfig::default();
        assert_eq!(cfg.timing.tick_hz, 50);
        assert_eq!(cfg.timing.stream_interval_ms, 500);
        assert_eq!(cfg.robot.archetype, "balanced");
        assert!(cfg.persistence.autosave);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[robot]
archetype = "bold_explorer"
"#;
        let cfg: FirmwareConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.robot.archetype, "bold_explorer");
        // Defaults for unspecified fields
        assert_eq!(cfg.timing.tick_hz, 50);
        assert_eq!(cfg.persistence.state_path, PathBuf::from("wren_state.bin"));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[robot]
archetype = "shy_observer"

[timing]
tick_hz = 50
medium_interval_secs = 2.0
slow_interval_secs = 10.0
stream_interval_ms = 250
stream_on_boot = true

[persistence]
state_path = "/var/lib/wren/state.bin"
autosave = false
"#;
        let cfg: FirmwareConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.robot.archetype, "shy_observer");
        assert_eq!(cfg.timing.medium_interval_secs, 2.0);
        assert_eq!(cfg.timing.stream_interval_ms, 250);
        assert!(cfg.timing.stream_on_boot);
        assert_eq!(
            cfg.persistence.state_path,
            PathBuf::from("/var/lib/wren/state.bin")
        );
        assert!(!cfg.persistence.autosave);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = FirmwareConfig::load_or_default("/nonexistent/wren.toml");
        assert_eq!(cfg.timing.tick_hz, 50);
    }
}
