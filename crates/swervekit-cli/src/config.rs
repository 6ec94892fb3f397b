//! Simulator configuration – reads/writes `~/.swervekit/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use swervekit_drive::{DriveMode, ModuleTuning};
use swervekit_hal::PidGains;
use swervekit_runtime::{LogFormat, TelemetryConfig};

/// One swerve module as mounted on the simulated chassis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    /// Mount position in metres, robot frame.
    pub x: f64,
    pub y: f64,
    /// Encoder calibration offset, in turns.
    #[serde(default)]
    pub encoder_offset: f64,
    #[serde(default)]
    pub reversed: bool,
}

impl ModuleConfig {
    fn new(name: &str, x: f64, y: f64) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            encoder_offset: 0.0,
            reversed: false,
        }
    }
}

/// Persisted simulator configuration.
///
/// Plain values come before tables so the TOML output stays flat at the top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Run length in seconds; `0` runs until Ctrl-C.
    #[serde(default = "default_duration_s")]
    pub duration_s: f64,

    #[serde(default)]
    pub drive_mode: DriveMode,

    /// IMU mounting offset in degrees.
    #[serde(default)]
    pub imu_offset_deg: f64,

    /// Steering speed of a simulated module at full output, rev/s.
    #[serde(default = "default_steer_turn_rate")]
    pub steer_turn_rate: f64,

    /// Simulated yaw rate at full rotation command, deg/s.
    #[serde(default = "default_max_yaw_rate_deg")]
    pub max_yaw_rate_deg: f64,

    #[serde(default = "default_steering_gains")]
    pub steering: PidGains,

    #[serde(default = "default_hold_gains")]
    pub hold: PidGains,

    #[serde(default)]
    pub tuning: ModuleTuning,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleConfig>,
}

fn default_tick_ms() -> u64 {
    20
}
fn default_duration_s() -> f64 {
    10.0
}
fn default_steer_turn_rate() -> f64 {
    2.0
}
fn default_max_yaw_rate_deg() -> f64 {
    180.0
}
fn default_steering_gains() -> PidGains {
    PidGains::new(1.5, 0.0, 0.02)
}
fn default_hold_gains() -> PidGains {
    PidGains::new(0.8, 0.0, 0.0)
}
fn default_modules() -> Vec<ModuleConfig> {
    vec![
        ModuleConfig::new("front_left", 0.256, 0.312),
        ModuleConfig::new("front_right", 0.256, -0.312),
        ModuleConfig::new("back_left", -0.256, 0.312),
        ModuleConfig::new("back_right", -0.256, -0.312),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            duration_s: default_duration_s(),
            drive_mode: DriveMode::default(),
            imu_offset_deg: 0.0,
            steer_turn_rate: default_steer_turn_rate(),
            max_yaw_rate_deg: default_max_yaw_rate_deg(),
            steering: default_steering_gains(),
            hold: default_hold_gains(),
            tuning: ModuleTuning::default(),
            telemetry: TelemetryConfig::default(),
            modules: default_modules(),
        }
    }
}

impl Config {
    /// Reject settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_ms == 0 {
            return Err("tick_ms must be at least 1".to_string());
        }
        if self.modules.is_empty() {
            return Err("at least one module must be configured".to_string());
        }
        if self.duration_s.is_nan() || self.duration_s < 0.0 {
            return Err(format!("duration_s must be non-negative, got {}", self.duration_s));
        }
        Ok(())
    }
}

/// Return the path to `~/.swervekit/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".swervekit").join("config.toml")
}

/// Load and validate the config at `path`.  A missing file yields the
/// defaults.  Environment overrides are applied either way.
pub fn load(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `SWERVEKIT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SWERVEKIT_TICK_MS` | `tick_ms` |
/// | `SWERVEKIT_DRIVE_MODE` | `drive_mode` (`field_centric` / `robot_centric`) |
/// | `SWERVEKIT_LOG_FORMAT` | `telemetry.log_format` (`compact` / `json`) |
/// | `SWERVEKIT_OTLP_ENDPOINT` | `telemetry.otlp_endpoint` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SWERVEKIT_TICK_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.tick_ms = ms;
    }
    if let Ok(v) = std::env::var("SWERVEKIT_DRIVE_MODE") {
        match v.as_str() {
            "field_centric" => cfg.drive_mode = DriveMode::FieldCentric,
            "robot_centric" => cfg.drive_mode = DriveMode::RobotCentric,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("SWERVEKIT_LOG_FORMAT") {
        match v.as_str() {
            "json" => cfg.telemetry.log_format = LogFormat::Json,
            "compact" => cfg.telemetry.log_format = LogFormat::Compact,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("SWERVEKIT_OTLP_ENDPOINT") {
        cfg.telemetry.otlp_endpoint = Some(v);
    }
}

/// Save the config to a specific path, creating parent directories.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
