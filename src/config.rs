use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "HABITUST_DIR";

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `tasks.json`, `templates.json` and `events.json`.
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolves the configuration from the environment.
    ///
    /// The data directory is determined in the following order:
    /// 1. `HABITUST_DIR` environment variable.
    /// 2. `~/.local/share/habitust` (on Linux).
    /// 3. `.` (fallback).
    pub fn from_env() -> Config {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
                p.push("habitust");
                p
            });
        Config { data_dir }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Config {
        Config { data_dir: data_dir.into() }
    }
}
