//! Input and checkpoint locations.

use std::path::PathBuf;

use lfscheck_core::checkpoint::DEFAULT_MAP_GLOB;
use serde::{Deserialize, Serialize};

fn default_map_directory() -> String {
    String::from(".")
}

fn default_input_glob() -> String {
    String::from(DEFAULT_MAP_GLOB)
}

fn default_input_file() -> String {
    String::from("lfsrepos.txt")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Directory object maps are written to and read from.
    #[serde(default = "default_map_directory")]
    pub map_directory: String,

    /// Glob selecting object map files inside `map_directory`.
    #[serde(default = "default_input_glob")]
    pub input_glob: String,

    /// Repository list, one URL per line.
    #[serde(default = "default_input_file")]
    pub input_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            map_directory: default_map_directory(),
            input_glob: default_input_glob(),
            input_file: default_input_file(),
        }
    }
}

impl PathsConfig {
    #[must_use]
    pub fn map_directory(&self) -> PathBuf {
        PathBuf::from(&self.map_directory)
    }

    #[must_use]
    pub fn input_file(&self) -> PathBuf {
        PathBuf::from(&self.input_file)
    }
}
