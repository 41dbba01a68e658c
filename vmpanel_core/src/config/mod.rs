pub mod load;

// Reexport
pub use load::Host;

// Config
use serde::{Deserialize, Serialize};

// Error Handling
use miette::Result;
use vmpanel_error::PanelError;

pub const CONFIG_DIR: &'static str = "/etc/vmpanel";

/*
* The main vmpanel configuration struct.
* Names the management host the panel talks to.
*/
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PanelConfig {
    pub host: Option<Host>,
}
impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            host: Some(Host::default()),
        }
    }
}
impl PanelConfig {
    /*
     * Return the configured management host, or the default one
     * when the config file doesn't name any.
     */
    pub fn get_host(&self) -> Result<Host, PanelError> {
        match &self.host {
            Some(host) => Ok(host.to_owned()),
            None => Ok(Host::default()),
        }
    }
}
