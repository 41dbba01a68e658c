use super::{OsTemplate, CUSTOM};
use crate::catalog::Disk;

use std::collections::HashMap;

/*
* How a template ended up paired (or not) with a disk image.
* Surfaced next to the template selector.
*/
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pairing {
    pub image: Option<String>,
    // True when the image comes from a recorded user override.
    pub saved: bool,
}

impl Pairing {
    pub fn new(
        template_key: &str,
        image: Option<String>,
        overrides: &HashMap<String, String>,
    ) -> Self {
        let saved = match &image {
            Some(name) => overrides.get(template_key) == Some(name),
            None => false,
        };
        Self { image, saved }
    }
}

/*
* Resolve a template key to a disk image name.
* In order, first success wins:
*   1. the sentinel resolves to nothing (clears any prior selection),
*   2. a recorded override whose disk still exists in the catalog,
*   3. heuristic auto-match on the template's image hint,
*   4. nothing.
*/
pub fn resolve(
    template_key: &str,
    disks: &[Disk],
    overrides: &HashMap<String, String>,
) -> Option<String> {
    if template_key == CUSTOM {
        return None;
    }
    let template = OsTemplate::find(template_key)?;

    if let Some(name) = overrides.get(template_key) {
        // Only trust an override that still points at a real disk.
        if disks.iter().any(|d| &d.name == name) {
            return Some(name.to_owned());
        }
    }

    match &template.image_hint {
        Some(hint) => auto_match(hint, disks),
        None => None,
    }
}

/*
* Case-insensitive match against the catalog's disk names.
* Exact equality beats a prefix match beats a contains match; the
* first catalog-order hit wins within each tier.
*/
pub fn auto_match(hint: &str, disks: &[Disk]) -> Option<String> {
    let pat = hint.to_lowercase();

    for d in disks {
        if d.name.to_lowercase() == pat {
            return Some(d.name.to_owned());
        }
    }
    for d in disks {
        if d.name.to_lowercase().starts_with(&pat) {
            return Some(d.name.to_owned());
        }
    }
    for d in disks {
        if d.name.to_lowercase().contains(&pat) {
            return Some(d.name.to_owned());
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn disks(names: &[&str]) -> Vec<Disk> {
        names
            .iter()
            .map(|name| Disk {
                name: name.to_string(),
                size: 0,
                disk_size: None,
                owner: None,
            })
            .collect()
    }

    fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sentinel_resolves_to_nothing() -> Result<()> {
        let catalog = disks(&["ubuntu-server"]);
        let saved = overrides(&[(CUSTOM, "ubuntu-server")]);
        assert_eq!(resolve(CUSTOM, &catalog, &saved), None);
        Ok(())
    }

    #[test]
    fn override_beats_exact_heuristic_match() -> Result<()> {
        // Even with an exact-name candidate in the catalog, a
        // recorded override wins.
        let catalog = disks(&["ubuntu-server", "my-golden-image"]);
        let saved = overrides(&[("ubuntu-server", "my-golden-image")]);
        assert_eq!(
            resolve("ubuntu-server", &catalog, &saved),
            Some("my-golden-image".to_owned())
        );
        Ok(())
    }

    #[test]
    fn vanished_override_falls_back_to_heuristic() -> Result<()> {
        let catalog = disks(&["ubuntu-server"]);
        let saved = overrides(&[("ubuntu-server", "deleted-image")]);
        assert_eq!(
            resolve("ubuntu-server", &catalog, &saved),
            Some("ubuntu-server".to_owned())
        );
        Ok(())
    }

    #[test]
    fn no_override_no_match_resolves_to_nothing() -> Result<()> {
        let catalog = disks(&["freebsd-14"]);
        assert_eq!(resolve("ubuntu-server", &catalog, &HashMap::new()), None);
        Ok(())
    }

    #[test]
    fn exact_match_beats_prefix_match() -> Result<()> {
        let catalog = disks(&["ubuntu-server-v2", "ubuntu-server"]);
        assert_eq!(
            auto_match("ubuntu-server", &catalog),
            Some("ubuntu-server".to_owned())
        );
        Ok(())
    }

    #[test]
    fn prefix_tier_beats_contains_tier() -> Result<()> {
        // Both disks qualify for the prefix tier; catalog order
        // decides, and the contains tier is never consulted.
        let catalog = disks(&["ubuntu-old", "ubuntu-2024"]);
        assert_eq!(auto_match("ubuntu", &catalog), Some("ubuntu-old".to_owned()));
        Ok(())
    }

    #[test]
    fn contains_tier_is_the_last_resort() -> Result<()> {
        let catalog = disks(&["golden-debian-12", "plain"]);
        assert_eq!(
            auto_match("debian", &catalog),
            Some("golden-debian-12".to_owned())
        );
        Ok(())
    }

    #[test]
    fn matching_is_case_insensitive() -> Result<()> {
        let catalog = disks(&["Ubuntu-Server"]);
        assert_eq!(
            auto_match("ubuntu-server", &catalog),
            Some("Ubuntu-Server".to_owned())
        );
        Ok(())
    }

    #[test]
    fn pairing_reports_saved_overrides() -> Result<()> {
        let saved = overrides(&[("debian", "debian-12")]);
        let pairing = Pairing::new("debian", Some("debian-12".to_owned()), &saved);
        assert!(pairing.saved);
        let pairing = Pairing::new("debian", Some("debian-13".to_owned()), &saved);
        assert!(!pairing.saved);
        Ok(())
    }
}
