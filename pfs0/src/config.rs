use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::progress::{DEFAULT_INTERVAL_MS, DEFAULT_WIDTH};
use crate::{wrap_io_err, Error, DEFAULT_BUFFER_SIZE};

/// Builder settings. Can be loaded from a TOML file, where every key is
/// optional:
///
/// ```toml
/// buffer_size = 65536
/// progress = true
/// progress_interval_ms = 250
/// progress_width = 40
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bytes per read/write chunk when copying entry data
    pub buffer_size: usize,
    /// Draw a progress bar on stdout while copying
    pub progress: bool,
    /// Minimum wall-clock time between two progress bar updates
    pub progress_interval_ms: u64,
    /// Number of cells in the progress bar
    pub progress_width: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress: false,
            progress_interval_ms: DEFAULT_INTERVAL_MS,
            progress_width: DEFAULT_WIDTH,
        }
    }
}

impl Config {
    /// Helper function to deserialize.
    pub fn open(file: &Path) -> Result<Config, Error> {
        let s = fs::read_to_string(file).map_err(wrap_io_err!(file, "Read config"))?;
        Config::from_toml(&s).map_err(|source| Error::Config {
            path: file.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(s: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Config;

    #[test]
    fn missing_keys_use_defaults() {
        let config = Config::from_toml("progress = true\n").unwrap();
        assert!(config.progress);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.progress_interval(), Duration::from_millis(100));
        assert_eq!(config.progress_width, 50);

        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("bufer_size = 12\n").is_err());
    }
}
