/*
* Persisted template-to-image bindings.
* One json map under a fixed per-user path, written through on every
* change. The sole source of user overrides.
*/

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

// Error Handling
use log::debug;
use miette::Result;
use vmpanel_error::{LibError, PanelError};

// Relative to the user data dir.
const STORE_FILE: &str = "vmpanel/os_template_images.json";

#[derive(Debug, Clone)]
pub struct OverrideStore {
    path: PathBuf,
}

impl OverrideStore {
    /// Store at the default per-user location.
    pub fn open() -> Result<Self, PanelError> {
        let data_dir = match dirs::data_dir() {
            Some(dir) => dir,
            None => {
                let message = "Couldn't locate a user data directory.";
                let help = "Set XDG_DATA_HOME or HOME.";
                return Err(LibError::new(message, help).into());
            }
        };
        Ok(Self {
            path: data_dir.join(STORE_FILE),
        })
    }

    /// Store at an explicit path.
    pub fn at(path: &PathBuf) -> Self {
        Self {
            path: path.to_owned(),
        }
    }

    /*
     * Read the whole mapping.
     * A missing file or an undecodable one is an empty mapping,
     * not an error (the store is self-healing).
     */
    pub fn load(&self) -> HashMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(string) => serde_json::from_str(&string).unwrap_or_else(|e| {
                debug!("Override store didn't decode ({}), starting empty.", e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    pub fn get(&self, template_key: &str) -> Option<String> {
        self.load().get(template_key).map(|e| e.to_owned())
    }

    /*
     * Bind a template to a disk name, or drop the binding when the
     * selection is empty. Written immediately.
     */
    pub fn record(&self, template_key: &str, disk_name: Option<&str>) -> Result<(), PanelError> {
        let mut map = self.load();
        match disk_name {
            Some(name) if !name.is_empty() => {
                map.insert(template_key.to_owned(), name.to_owned());
            }
            _ => {
                map.remove(template_key);
            }
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&map)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn temp_store(name: &str) -> OverrideStore {
        let mut path = std::env::temp_dir();
        path.push(format!("vmpanel-test-{}-{}", name, std::process::id()));
        path.push("overrides.json");
        let _ = fs::remove_file(&path);
        OverrideStore::at(&path)
    }

    #[test]
    fn missing_file_is_an_empty_mapping() -> Result<()> {
        let store = temp_store("missing");
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn record_and_read_back() -> Result<()> {
        let store = temp_store("roundtrip");
        store.record("ubuntu-server", Some("ubuntu-24.04"))?;
        assert_eq!(store.get("ubuntu-server"), Some("ubuntu-24.04".to_owned()));
        Ok(())
    }

    #[test]
    fn empty_selection_removes_the_entry() -> Result<()> {
        let store = temp_store("remove");
        store.record("debian", Some("debian-12"))?;
        store.record("debian", None)?;
        assert_eq!(store.get("debian"), None);

        store.record("debian", Some("debian-12"))?;
        store.record("debian", Some(""))?;
        assert_eq!(store.get("debian"), None);
        Ok(())
    }

    #[test]
    fn garbage_on_disk_heals_to_empty() -> Result<()> {
        let store = temp_store("garbage");
        if let Some(parent) = store.path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&store.path, "not json at all").unwrap();
        assert!(store.load().is_empty());
        // And the next write repairs the file.
        store.record("macos", Some("macos-sonoma"))?;
        assert_eq!(store.get("macos"), Some("macos-sonoma".to_owned()));
        Ok(())
    }
}
