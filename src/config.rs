// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use memodeck_core::error::ErrorReport;
use memodeck_core::error::Fallible;
use memodeck_core::error::fail;
use serde::Deserialize;

/// Read from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "memodeck.toml";

const DEFAULT_DATABASE: &str = "memodeck.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

/// The contents of a config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    database: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    open_browser: Option<bool>,
}

#[derive(Debug, PartialEq)]
pub struct Config {
    /// Path to the SQLite database.
    pub database: PathBuf,
    /// Address the web servers bind to.
    pub host: String,
    pub port: u16,
    /// Whether `drill` opens a browser tab.
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            open_browser: true,
        }
    }
}

impl Config {
    /// Load the config. An explicit path must exist; the default file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                return fail(format!("config file {} does not exist.", path.display()));
            }
            log::debug!("No config file, using defaults");
            return Ok(Self::default());
        }
        log::debug!("Loading config from {}", path.display());
        Self::parse(&read_to_string(&path)?)
    }

    pub fn parse(text: &str) -> Fallible<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| ErrorReport::new(format!("invalid config file: {e}")))?;
        let defaults = Self::default();
        Ok(Self {
            database: file.database.unwrap_or(defaults.database),
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            open_browser: file.open_browser.unwrap_or(defaults.open_browser),
        })
    }
}
