// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Run configuration (spec §6 "Configuration surface"). Grounded on
//! `moss::config`'s serde-based, single-optional-file-merged-over-defaults
//! layering, simplified from its vendor/admin split since this crate has
//! no installed-system notion to layer over.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::ApiVersion;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// The full configuration surface (spec §6), deserialised from an optional
/// YAML file and merged over [`Configuration::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub no_net: bool,
    #[serde(with = "api_version_serde")]
    pub api_version: ApiVersion,
    pub add_cache_id: bool,
    pub hidpi_enabled: bool,
    pub embedded_icons: bool,
    pub max_threads: usize,
    pub min_icon_size: u32,
    pub basename: String,
    pub old_metadata: Option<PathBuf>,
    pub extra_appstream: Option<PathBuf>,
    pub extra_appdata: Option<PathBuf>,
    pub extra_screenshots: Option<PathBuf>,
    pub screenshot_uri: Option<String>,
    pub log_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub ignore_missing_info: bool,
    pub ignore_missing_parents: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            no_net: false,
            api_version: ApiVersion::CURRENT,
            add_cache_id: true,
            hidpi_enabled: true,
            embedded_icons: false,
            max_threads: num_cpus(),
            min_icon_size: 32,
            basename: "appstream".to_string(),
            old_metadata: None,
            extra_appstream: None,
            extra_appdata: None,
            extra_screenshots: None,
            screenshot_uri: None,
            log_dir: PathBuf::from("./logs"),
            screenshot_dir: PathBuf::from("./screenshots"),
            cache_dir: PathBuf::from("./cache"),
            temp_dir: PathBuf::from("./tmp"),
            output_dir: PathBuf::from("./output"),
            ignore_missing_info: false,
            ignore_missing_parents: false,
        }
    }
}

impl Configuration {
    /// Load a YAML configuration file, falling back to all-default values
    /// for any field it doesn't set (spec §6).
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = fs_err::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source: source.into() })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

mod api_version_serde {
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    use crate::catalog::ApiVersion;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ApiVersion, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ApiVersion::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_use_current_api_version_and_add_cache_id() {
        let config = Configuration::default();
        assert_eq!(config.api_version, ApiVersion::CURRENT);
        assert!(config.add_cache_id);
    }

    #[test]
    fn loads_partial_yaml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs_err::write(&path, "basename: myapps\napi_version: \"0.61\"\n").unwrap();

        let config = Configuration::load(&path).unwrap();
        assert_eq!(config.basename, "myapps");
        assert_eq!(config.api_version, ApiVersion::new(0, 61));
        assert!(config.add_cache_id);
    }
}
