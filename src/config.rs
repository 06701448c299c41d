//! Application-level configuration loading: room addressing, scoring,
//! countdown/watchdog timing, and the local data directory.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_BOARD_CONFIG_PATH";

/// Points awarded to the answering team on a correct verdict.
const DEFAULT_CORRECT_POINTS: i64 = 4;
/// Consolation points awarded to every other team on a wrong verdict.
const DEFAULT_CONSOLATION_POINTS: i64 = 1;
/// Countdown length used when the moderator does not pass one explicitly.
const DEFAULT_COUNTDOWN_SECONDS: u64 = 3;
/// Watchdog tick; bounds the worst-case delay between a countdown deadline
/// and the visible re-open.
const DEFAULT_WATCHDOG_TICK_MS: u64 = 300;
/// Room the shared buzzer document is addressed under when unset.
const DEFAULT_ROOM: &str = "default";
/// Directory holding the local persistence slots.
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Room identifier namespacing the shared buzzer document.
    pub room: String,
    /// Default countdown length for a timed re-open.
    pub countdown_seconds: u64,
    /// Interval of the buzzer reconciliation watchdog.
    pub watchdog_tick_ms: u64,
    /// Points for a correct answer.
    pub correct_points: i64,
    /// Points every other team receives on a wrong answer.
    pub consolation_points: i64,
    /// Directory for the local slot files.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk, apply environment overrides, and
    /// fall back to built-in defaults on any read or parse failure.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(room) = env::var("QUIZ_ROOM") {
            if !room.trim().is_empty() {
                self.room = room;
            }
        }
        if let Some(seconds) = parse_env("BUZZER_COUNTDOWN_SECONDS") {
            self.countdown_seconds = seconds;
        }
        if let Some(tick) = parse_env("BUZZER_TICK_MS") {
            self.watchdog_tick_ms = tick;
        }
        if let Some(dir) = env::var_os("QUIZ_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            watchdog_tick_ms: DEFAULT_WATCHDOG_TICK_MS,
            correct_points: DEFAULT_CORRECT_POINTS,
            consolation_points: DEFAULT_CONSOLATION_POINTS,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`]. Every field is optional.
struct RawConfig {
    room: Option<String>,
    countdown_seconds: Option<u64>,
    watchdog_tick_ms: Option<u64>,
    correct_points: Option<i64>,
    consolation_points: Option<i64>,
    data_dir: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            room: raw.room.unwrap_or(defaults.room),
            countdown_seconds: raw.countdown_seconds.unwrap_or(defaults.countdown_seconds),
            watchdog_tick_ms: raw.watchdog_tick_ms.unwrap_or(defaults.watchdog_tick_ms),
            correct_points: raw.correct_points.unwrap_or(defaults.correct_points),
            consolation_points: raw
                .consolation_points
                .unwrap_or(defaults.consolation_points),
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|value| value.parse().ok())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_quiz_rules() {
        let config = AppConfig::default();
        assert_eq!(config.room, "default");
        assert_eq!(config.correct_points, 4);
        assert_eq!(config.consolation_points, 1);
        assert_eq!(config.countdown_seconds, 3);
        assert_eq!(config.watchdog_tick_ms, 300);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"room": "pubquiz", "correctPoints": 10}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.room, "pubquiz");
        assert_eq!(config.correct_points, 10);
        assert_eq!(config.consolation_points, 1);
        assert_eq!(config.watchdog_tick_ms, 300);
    }
}
