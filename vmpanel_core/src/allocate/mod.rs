/*
* Ownership and allocation engine.
* Decides which disks may be offered for selection, and hands out
* fleet-unique identifiers and private addresses.
*/

use crate::catalog::{Disk, VmRecord};

use human_bytes::human_bytes;
use macaddr::MacAddr6;
use std::net::Ipv4Addr;

// Time
use chrono::Utc;

// Random
use rand::Rng;

// Error Handling
use log::warn;
use miette::Result;
use vmpanel_error::{LibError, PanelError};

const HEX: &[u8] = b"0123456789abcdef";

// Instance ids are a fixed prefix plus exactly 17 hex digits.
const INSTANCE_ID_HEX_LEN: usize = 17;
const IMAGE_ID_HEX_LEN: usize = 8;

// How often an id generator retries before giving up.
pub const ID_RETRY_LIMIT: usize = 16;

/*
* The subset of disks a vm form may select.
* A disk is eligible when it is free, owned by the vm being edited,
* or already the control's current selection (a chosen disk is never
* silently dropped from its own dropdown, whatever the cache says).
*/
pub fn eligible_disks<'a>(
    disks: &'a [Disk],
    editing_vm: Option<&str>,
    current: Option<&str>,
) -> Vec<&'a Disk> {
    disks
        .iter()
        .filter(|d| match &d.owner {
            None => true,
            Some(owner) => {
                Some(owner.as_str()) == editing_vm || Some(d.name.as_str()) == current
            }
        })
        .collect()
}

/*
* Label a disk for selection lists.
* Disks owned by a different vm surface their owner in brackets.
*/
pub fn disk_label(disk: &Disk, editing_vm: Option<&str>) -> String {
    let size = match &disk.disk_size {
        Some(label) => label.to_owned(),
        None => human_bytes(disk.size as f64),
    };
    let mut label = format!("{} ({})", disk.name, size);
    if let Some(owner) = &disk.owner {
        if Some(owner.as_str()) != editing_vm {
            label += &format!(" [{}]", owner);
        }
    }
    label
}

/// Instance ids already claimed by the fleet's mds records.
pub fn known_instance_ids(vms: &[VmRecord]) -> Vec<String> {
    vms.iter()
        .filter_map(|e| e.config.mds.as_ref())
        .map(|e| e.instance_id.to_owned())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Image ids already claimed by the fleet's mds records.
pub fn known_image_ids(vms: &[VmRecord]) -> Vec<String> {
    vms.iter()
        .filter_map(|e| e.config.mds.as_ref())
        .map(|e| e.ami_id.to_owned())
        .filter(|e| !e.is_empty())
        .collect()
}

/*
* Instance id: "i-" plus 17 hex digits, the current epoch millis in
* hex right-padded with random hex digits.
*/
pub fn generate_instance_id(existing: &[String]) -> Result<String, PanelError> {
    fresh_id("instance id", existing, || {
        let mut rng = rand::rng();
        let mut hex = format!("{:x}", Utc::now().timestamp_millis());
        while hex.len() < INSTANCE_ID_HEX_LEN {
            hex.push(HEX[rng.random_range(0..HEX.len())] as char);
        }
        hex.truncate(INSTANCE_ID_HEX_LEN);
        format!("i-{}", hex)
    })
}

/// Image id: "ami-" plus 8 random hex digits.
pub fn generate_image_id(existing: &[String]) -> Result<String, PanelError> {
    fresh_id("image id", existing, || {
        let mut rng = rand::rng();
        let mut hex = String::new();
        for _ in 0..IMAGE_ID_HEX_LEN {
            hex.push(HEX[rng.random_range(0..HEX.len())] as char);
        }
        format!("ami-{}", hex)
    })
}

/*
* Draw candidates until one is unused by the live fleet.
* Bails out after a bounded number of retries instead of silently
* accepting a collision.
*/
fn fresh_id<F>(what: &str, existing: &[String], mut candidate: F) -> Result<String, PanelError>
where
    F: FnMut() -> String,
{
    for _ in 0..ID_RETRY_LIMIT {
        let id = candidate();
        if !existing.contains(&id) {
            return Ok(id);
        }
        warn!("Generated {} collides with the fleet, retrying.", what);
    }
    let message = format!("Couldn't allocate a fresh {}.", what);
    let help = format!("Gave up after {} collisions with existing ids.", ID_RETRY_LIMIT);
    Err(LibError::new(&message, &help).into())
}

/*
* Every private address claimed by the fleet's mds records,
* except the one belonging to the vm being edited.
*/
pub fn used_ipv4s(vms: &[VmRecord], exclude: Option<&str>) -> Vec<Ipv4Addr> {
    vms.iter()
        .filter(|vm| Some(vm.smac.as_str()) != exclude)
        .filter_map(|vm| vm.config.mds.as_ref())
        .filter_map(|mds| mds.local_ipv4.parse().ok())
        .collect()
}

/*
* Lowest unused address on the 10.0.{1..254}.10 pattern.
* An exhausted range is an explicit error, never a duplicate.
*/
pub fn allocate_ipv4(vms: &[VmRecord], exclude: Option<&str>) -> Result<Ipv4Addr, PanelError> {
    let used = used_ipv4s(vms, exclude);
    for n in 1..=254u8 {
        let address = Ipv4Addr::new(10, 0, n, 10);
        if !used.contains(&address) {
            return Ok(address);
        }
    }
    let message = "Private address space exhausted.";
    let help = "All of 10.0.1.10 to 10.0.254.10 is taken. Free an address first.";
    Err(LibError::new(message, help).into())
}

/// Random mac on the usual kvm prefix (52:54:00).
pub fn random_mac() -> MacAddr6 {
    let mut rng = rand::rng();
    MacAddr6::new(
        0x52,
        0x54,
        0x00,
        rng.random(),
        rng.random(),
        rng.random(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::VmConfig;
    use crate::catalog::VmState;
    use crate::mds::MdsRecord;
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn disk(name: &str, owner: Option<&str>) -> Disk {
        Disk {
            name: name.to_owned(),
            size: 10 * 1024 * 1024 * 1024,
            disk_size: None,
            owner: owner.map(|e| e.to_owned()),
        }
    }

    fn vm_with_ipv4(smac: &str, ipv4: &str) -> VmRecord {
        let mut config = VmConfig::default();
        config.mds = Some(MdsRecord {
            local_ipv4: ipv4.to_owned(),
            ..Default::default()
        });
        VmRecord {
            smac: smac.to_owned(),
            status: VmState::Stopped,
            config,
        }
    }

    #[test]
    fn foreign_disk_is_excluded() -> Result<()> {
        let disks = vec![disk("a-disk", Some("A")), disk("free-disk", None)];

        let names: Vec<&str> = eligible_disks(&disks, Some("B"), None)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["free-disk"]);
        Ok(())
    }

    #[test]
    fn own_disk_is_included() -> Result<()> {
        let disks = vec![disk("a-disk", Some("A")), disk("free-disk", None)];

        let names: Vec<&str> = eligible_disks(&disks, Some("A"), None)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a-disk", "free-disk"]);
        Ok(())
    }

    #[test]
    fn current_selection_is_never_dropped() -> Result<()> {
        // Vm C inherited a disk owned by B: the selection stays
        // visible in its own dropdown.
        let disks = vec![disk("b-disk", Some("B")), disk("free-disk", None)];

        let names: Vec<&str> = eligible_disks(&disks, Some("C"), Some("b-disk"))
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["b-disk", "free-disk"]);
        Ok(())
    }

    #[test]
    fn label_surfaces_foreign_owner() -> Result<()> {
        let owned = disk("data", Some("A"));
        assert!(disk_label(&owned, Some("B")).ends_with("[A]"));
        assert!(!disk_label(&owned, Some("A")).contains("[A]"));
        Ok(())
    }

    #[test]
    fn instance_id_shape() -> Result<()> {
        let id = generate_instance_id(&[])?;
        assert!(id.starts_with("i-"));
        assert_eq!(id.len(), 2 + 17);
        assert!(id[2..].chars().all(|c| c.is_ascii_hexdigit()));
        Ok(())
    }

    #[test]
    fn image_id_shape() -> Result<()> {
        let id = generate_image_id(&[])?;
        assert!(id.starts_with("ami-"));
        assert_eq!(id.len(), 4 + 8);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
        Ok(())
    }

    #[test]
    fn id_generation_gives_up_after_bounded_retries() -> Result<()> {
        let existing = vec!["stuck".to_owned()];
        let res = fresh_id("test id", &existing, || "stuck".to_owned());
        assert!(res.is_err());
        Ok(())
    }

    #[test]
    fn lowest_free_address_wins() -> Result<()> {
        let fleet = vec![
            vm_with_ipv4("a", "10.0.1.10"),
            vm_with_ipv4("b", "10.0.2.10"),
        ];
        let address = allocate_ipv4(&fleet, None)?;
        assert_eq!(address, Ipv4Addr::new(10, 0, 3, 10));
        Ok(())
    }

    #[test]
    fn own_address_is_excluded_from_used_set() -> Result<()> {
        // Re-saving vm b without change must reallocate its own slot.
        let fleet = vec![
            vm_with_ipv4("a", "10.0.1.10"),
            vm_with_ipv4("b", "10.0.2.10"),
        ];
        let address = allocate_ipv4(&fleet, Some("b"))?;
        assert_eq!(address, Ipv4Addr::new(10, 0, 2, 10));
        Ok(())
    }

    #[test]
    fn exhausted_range_is_an_error() -> Result<()> {
        let fleet: Vec<VmRecord> = (1..=254u16)
            .map(|n| vm_with_ipv4(&format!("vm{}", n), &format!("10.0.{}.10", n)))
            .collect();
        assert!(allocate_ipv4(&fleet, None).is_err());
        Ok(())
    }

    #[test]
    fn mac_has_kvm_prefix() -> Result<()> {
        let mac = random_mac();
        let octets = mac.into_array();
        assert_eq!(&octets[..3], &[0x52, 0x54, 0x00]);
        Ok(())
    }
}
