use super::PanelConfig;
// Global vars
use super::CONFIG_DIR;

// Config
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// Error Handling
use log::info;
use miette::Result;
use vmpanel_error::{PanelError, TomlError};

impl PanelConfig {
    /*
     * Get config from crate directory
     */
    fn debug_path() -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("./vmpanel.config.toml");
        return path;
    }
    /*
     * Get config from FHS path.
     */
    fn release_path() -> PathBuf {
        let mut path = PathBuf::new();
        path.push(CONFIG_DIR.to_owned() + "/config.toml");
        return path;
    }
    pub fn get() -> Result<Self, PanelError> {
        info!("Search config file.");

        #[cfg(debug_assertions)]
        let path = Self::debug_path();

        #[cfg(not(debug_assertions))]
        let path = Self::release_path();

        if !path.exists() {
            // No config file is fine, the default host is used.
            return Ok(Self::default());
        }

        let path = path.display().to_string();
        let config = Self::from_file(&path)?;

        Ok(config)
    }
    pub fn from_file(path: &str) -> Result<Self, PanelError> {
        let string = fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, PanelError> {
        let res = toml::from_str::<Self>(&string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = TomlError::new(e, &string);
                return Err(err.into());
            }
        };
        Ok(item)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Host {
    pub name: String,
    pub url: String,
}
impl Default for Host {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            url: "http://localhost:8080".to_owned(),
        }
    }
}
