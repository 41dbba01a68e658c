pub mod overrides;
pub mod resolve;

// Reexports
pub use overrides::OverrideStore;
pub use resolve::{resolve, Pairing};

// Globals
use once_cell::sync::Lazy;

use serde::{Deserialize, Serialize};

/// The key that means "no template": nothing is applied, any prior
/// image selection is cleared.
pub const CUSTOM: &str = "custom";

/*
* A named default hardware profile offered to simplify vm creation.
* The image hint drives the heuristic disk auto-match.
*/
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct OsTemplate {
    pub key: String,
    pub profile: Option<HardwareProfile>,
    pub image_hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct HardwareProfile {
    pub sockets: u64,
    pub cores: u64,
    pub threads: u64,
    pub memory_mb: u64,
    pub is_windows: bool,
}

impl OsTemplate {
    fn new(key: &str, profile: HardwareProfile, image_hint: &str) -> Self {
        Self {
            key: key.to_owned(),
            profile: Some(profile),
            image_hint: Some(image_hint.to_owned()),
        }
    }
    pub fn find(key: &str) -> Option<&'static OsTemplate> {
        REGISTRY.iter().find(|e| e.key == key)
    }
    pub fn all() -> &'static [OsTemplate] {
        &REGISTRY
    }
    pub fn is_sentinel(&self) -> bool {
        self.key == CUSTOM
    }
}

fn profile(sockets: u64, cores: u64, threads: u64, memory_mb: u64, is_windows: bool) -> HardwareProfile {
    HardwareProfile {
        sockets,
        cores,
        threads,
        memory_mb,
        is_windows,
    }
}

// Compiled-in, immutable for the process lifetime.
pub static REGISTRY: Lazy<Vec<OsTemplate>> = Lazy::new(|| {
    vec![
        OsTemplate {
            key: CUSTOM.to_owned(),
            profile: None,
            image_hint: None,
        },
        OsTemplate::new("ubuntu-server", profile(1, 2, 1, 2048, false), "ubuntu-server"),
        OsTemplate::new("ubuntu-desktop", profile(1, 4, 1, 4096, false), "ubuntu-desktop"),
        OsTemplate::new("debian", profile(1, 2, 1, 1024, false), "debian"),
        OsTemplate::new("centos-rocky", profile(1, 2, 1, 2048, false), "centos"),
        OsTemplate::new("windows-desktop", profile(1, 4, 2, 4096, true), "windows-10"),
        OsTemplate::new("windows-server", profile(1, 4, 2, 8192, true), "windows-server"),
        OsTemplate::new("macos", profile(1, 4, 2, 8192, false), "macos"),
        OsTemplate::new("minimal-linux", profile(1, 1, 1, 512, false), "minimal"),
    ]
});

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;

    #[test]
    fn registry_keys_are_unique() -> Result<()> {
        let mut keys: Vec<&str> = OsTemplate::all().iter().map(|e| e.key.as_str()).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(before, keys.len());
        Ok(())
    }

    #[test]
    fn sentinel_has_no_profile() -> Result<()> {
        let custom = OsTemplate::find(CUSTOM).unwrap();
        assert!(custom.is_sentinel());
        assert!(custom.profile.is_none());
        assert!(custom.image_hint.is_none());
        Ok(())
    }
}
