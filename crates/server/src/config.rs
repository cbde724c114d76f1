//! Environment-driven server settings.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Engine TOML file. Defaults apply when unset.
    pub config_path: Option<PathBuf>,
    /// Directory of `<name>.ron` templates.
    pub templates_dir: PathBuf,
    /// Directory for the log file. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
    /// Scheduler period; countdowns assume one tick per second.
    pub tick_millis: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            templates_dir: PathBuf::from("templates"),
            log_dir: None,
            tick_millis: 1000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.config_path = env::var("DUNGEON_CONFIG").ok().map(PathBuf::from);
        if let Ok(dir) = env::var("DUNGEON_TEMPLATES") {
            config.templates_dir = PathBuf::from(dir);
        }
        config.log_dir = env::var("DUNGEON_LOG_DIR").ok().map(PathBuf::from);
        if let Some(millis) = read_env::<u64>("DUNGEON_TICK_MILLIS") {
            config.tick_millis = millis.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
