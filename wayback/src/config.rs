//! Configuration for navigation thresholds, routing and logging.
//!
//! Every value has a `DEFAULT_*` constant. A config file is optional; keys it
//! omits fall back to those defaults.
//!
//! # File Format
//!
//! ```ini
//! [navigation]
//! arrival_threshold_m = 20
//! step_completion_threshold_m = 30
//! route_update_threshold_m = 50
//! walking_threshold_m = 900
//! lookahead_steps = 2
//! route_request_timeout_secs = 30
//! distance_filter_m = 20
//!
//! [routing]
//! osrm_url = https://router.example.org
//!
//! [logging]
//! level = info
//! file = /var/log/wayback.log
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

// ==================== Navigation Defaults ====================

/// Distance to the destination below which the user has arrived (meters).
///
/// Stricter than the step threshold because arrival ends the episode.
pub const DEFAULT_ARRIVAL_THRESHOLD_M: f64 = 20.0;

/// Distance to a step's end below which the step counts as completed (meters).
pub const DEFAULT_STEP_COMPLETION_THRESHOLD_M: f64 = 30.0;

/// Movement since the last route request that triggers a recompute (meters).
pub const DEFAULT_ROUTE_UPDATE_THRESHOLD_M: f64 = 50.0;

/// Straight-line distance at or below which routes are requested on foot (meters).
pub const DEFAULT_WALKING_THRESHOLD_M: f64 = 900.0;

/// Steps beyond the current one examined when matching a fix.
pub const DEFAULT_LOOKAHEAD_STEPS: usize = 2;

/// Deadline for a single route request.
pub const DEFAULT_ROUTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum movement between delivered fixes (meters).
pub const DEFAULT_DISTANCE_FILTER_M: f64 = 20.0;

/// Default log filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The file is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A key holds a value that cannot be used.
    #[error("Invalid value for [{section}] {key}: '{value}' ({reason})")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Thresholds and timing for a navigation session.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Arrival threshold in meters.
    pub arrival_threshold_m: f64,
    /// Step completion threshold in meters.
    pub step_completion_threshold_m: f64,
    /// Recompute threshold in meters.
    pub route_update_threshold_m: f64,
    /// Walking/automobile switch-over distance in meters.
    pub walking_threshold_m: f64,
    /// Lookahead window size in steps.
    pub lookahead_steps: usize,
    /// Deadline for one route request.
    pub route_request_timeout: Duration,
    /// Fix source distance filter in meters.
    pub distance_filter_m: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrival_threshold_m: DEFAULT_ARRIVAL_THRESHOLD_M,
            step_completion_threshold_m: DEFAULT_STEP_COMPLETION_THRESHOLD_M,
            route_update_threshold_m: DEFAULT_ROUTE_UPDATE_THRESHOLD_M,
            walking_threshold_m: DEFAULT_WALKING_THRESHOLD_M,
            lookahead_steps: DEFAULT_LOOKAHEAD_STEPS,
            route_request_timeout: DEFAULT_ROUTE_REQUEST_TIMEOUT,
            distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
        }
    }
}

impl NavigationConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the arrival threshold.
    pub fn with_arrival_threshold_m(mut self, meters: f64) -> Self {
        self.arrival_threshold_m = meters;
        self
    }

    /// Set the step completion threshold.
    pub fn with_step_completion_threshold_m(mut self, meters: f64) -> Self {
        self.step_completion_threshold_m = meters;
        self
    }

    /// Set the recompute threshold.
    pub fn with_route_update_threshold_m(mut self, meters: f64) -> Self {
        self.route_update_threshold_m = meters;
        self
    }

    /// Set the walking threshold.
    pub fn with_walking_threshold_m(mut self, meters: f64) -> Self {
        self.walking_threshold_m = meters;
        self
    }

    /// Set the lookahead window.
    pub fn with_lookahead_steps(mut self, steps: usize) -> Self {
        self.lookahead_steps = steps;
        self
    }

    /// Set the route request deadline.
    pub fn with_route_request_timeout(mut self, timeout: Duration) -> Self {
        self.route_request_timeout = timeout;
        self
    }

    /// Set the fix distance filter.
    pub fn with_distance_filter_m(mut self, meters: f64) -> Self {
        self.distance_filter_m = meters;
        self
    }

    fn apply_section(&mut self, props: &Properties) -> Result<(), ConfigError> {
        const SECTION: &str = "navigation";

        if let Some(v) = parse_key(props, SECTION, "arrival_threshold_m")? {
            self.arrival_threshold_m = positive(SECTION, "arrival_threshold_m", v)?;
        }
        if let Some(v) = parse_key(props, SECTION, "step_completion_threshold_m")? {
            self.step_completion_threshold_m = positive(SECTION, "step_completion_threshold_m", v)?;
        }
        if let Some(v) = parse_key(props, SECTION, "route_update_threshold_m")? {
            self.route_update_threshold_m = positive(SECTION, "route_update_threshold_m", v)?;
        }
        if let Some(v) = parse_key(props, SECTION, "walking_threshold_m")? {
            self.walking_threshold_m = positive(SECTION, "walking_threshold_m", v)?;
        }
        if let Some(v) = parse_key::<usize>(props, SECTION, "lookahead_steps")? {
            self.lookahead_steps = v;
        }
        if let Some(v) = parse_key::<u64>(props, SECTION, "route_request_timeout_secs")? {
            if v == 0 {
                return Err(invalid(SECTION, "route_request_timeout_secs", "0", "must be at least 1"));
            }
            self.route_request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_key::<f64>(props, SECTION, "distance_filter_m")? {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(SECTION, "distance_filter_m", &v.to_string(), "must be >= 0"));
            }
            self.distance_filter_m = v;
        }

        Ok(())
    }
}

/// Routing provider settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingConfig {
    /// Root URL of an OSRM-compatible routing service.
    pub osrm_url: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive (`RUST_LOG` takes precedence).
    pub level: String,
    /// Optional log file in addition to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// `[navigation]` section.
    pub navigation: NavigationConfig,
    /// `[routing]` section.
    pub routing: RoutingConfig,
    /// `[logging]` section.
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Default config file location (`<config dir>/wayback/config.ini`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wayback").join("config.ini"))
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini_str(&contents)
    }

    /// Load the file at `path` if given, else the default location if it
    /// exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => Ok(Self::default()),
        }
    }

    /// Parse INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(props) = ini.section(Some("navigation")) {
            config.navigation.apply_section(props)?;
        }

        if let Some(props) = ini.section(Some("routing")) {
            config.routing.osrm_url = props
                .get("osrm_url")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from);
        }

        if let Some(props) = ini.section(Some("logging")) {
            if let Some(level) = props.get("level").map(str::trim).filter(|s| !s.is_empty()) {
                config.logging.level = level.to_string();
            }
            config.logging.file = props
                .get("file")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from);
        }

        Ok(config)
    }
}

fn parse_key<T: FromStr>(props: &Properties, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
    match props.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, raw, "not a number")),
    }
}

fn positive(section: &str, key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(section, key, &value.to_string(), "must be > 0"))
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NavigationConfig::default();
        assert_eq!(config.arrival_threshold_m, 20.0);
        assert_eq!(config.step_completion_threshold_m, 30.0);
        assert_eq!(config.route_update_threshold_m, 50.0);
        assert_eq!(config.walking_threshold_m, 900.0);
        assert_eq!(config.lookahead_steps, 2);
        assert_eq!(config.route_request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_setters() {
        let config = NavigationConfig::new()
            .with_arrival_threshold_m(10.0)
            .with_lookahead_steps(3)
            .with_route_request_timeout(Duration::from_secs(5));
        assert_eq!(config.arrival_threshold_m, 10.0);
        assert_eq!(config.lookahead_steps, 3);
        assert_eq!(config.route_request_timeout, Duration::from_secs(5));
        assert_eq!(config.step_completion_threshold_m, 30.0);
    }

    #[test]
    fn test_parse_full_file() {
        let config = ConfigFile::from_ini_str(
            "[navigation]\n\
             arrival_threshold_m = 15\n\
             step_completion_threshold_m = 25.5\n\
             lookahead_steps = 1\n\
             route_request_timeout_secs = 10\n\
             [routing]\n\
             osrm_url = http://localhost:5000\n\
             [logging]\n\
             level = debug\n\
             file = /tmp/wayback.log\n",
        )
        .unwrap();

        assert_eq!(config.navigation.arrival_threshold_m, 15.0);
        assert_eq!(config.navigation.step_completion_threshold_m, 25.5);
        assert_eq!(config.navigation.lookahead_steps, 1);
        assert_eq!(config.navigation.route_request_timeout, Duration::from_secs(10));
        assert_eq!(config.navigation.route_update_threshold_m, 50.0);
        assert_eq!(config.routing.osrm_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/wayback.log")));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ConfigFile::from_ini_str("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_rejects_non_numeric_threshold() {
        let err = ConfigFile::from_ini_str("[navigation]\narrival_threshold_m = near\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "arrival_threshold_m"));
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let err = ConfigFile::from_ini_str("[navigation]\nwalking_threshold_m = -1\n").unwrap_err();
        assert!(err.to_string().contains("walking_threshold_m"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(ConfigFile::from_ini_str("[navigation]\nroute_request_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[navigation]\ndistance_filter_m = 5").unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.navigation.distance_filter_m, 5.0);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/wayback.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
