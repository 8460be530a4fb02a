use std::fs;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown log level `{0}`")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Top-level commands are looked up among the commands of this owner.
    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default)]
    pub log: LogConfig,

    /// Print the value results of each line.
    #[serde(default = "default_true")]
    pub echo_results: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LogConfig {
    /// Defaults to `~/.cmdtree.log`.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default)]
    pub level: Option<String>,
}

fn default_prompt() -> String {
    "> ".to_owned()
}

fn default_owner() -> String {
    "console".to_owned()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Config {
        Config {
            prompt: default_prompt(),
            owner: default_owner(),
            log: LogConfig::default(),
            echo_results: default_true(),
        }
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> Result<Option<LevelFilter>, ConfigError> {
        match &self.level {
            Some(level) => level
                .parse::<LevelFilter>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidLogLevel(level.clone())),
            None => Ok(None),
        }
    }
}

/// `~/.cmdtree.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cmdtree.toml"))
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;

        config.log.level_filter()?;
        Ok(config)
    }

    /// Loads `~/.cmdtree.toml` if it exists.
    pub fn load_or_default() -> Result<Config, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Config::load(&path),
            _ => Ok(Config::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        assert_eq!(Config::load(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn overrides() {
        let file = write_config(
            r#"
            prompt = "$ "
            echo_results = false

            [log]
            file = "/tmp/console.log"
            level = "debug"
            "#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.owner, "console");
        assert!(!config.echo_results);
        assert_eq!(config.log.file, Some(PathBuf::from("/tmp/console.log")));
        assert_eq!(config.log.level_filter().unwrap(), Some(LevelFilter::Debug));
    }

    #[test]
    fn errors() {
        let file = write_config("[log]\nlevel = \"loud\"\n");
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::InvalidLogLevel(level)) if level == "loud"
        ));

        let file = write_config("prompt = ");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));

        let missing = file.path().with_extension("missing");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));
    }
}
