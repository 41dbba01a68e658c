/*
* Per-vm metadata-service record.
* Consumed by guest provisioning on the host side; the panel only
* edits it and enforces fleet-wide address uniqueness at save time.
*/

use crate::allocate;
use crate::catalog::VmRecord;

use serde::{Deserialize, Serialize};

// Error Handling
use miette::Result;
use vmpanel_error::{PanelError, ValidationError};

// Factory placeholders the host seeds new records with.
// A field still carrying one is treated as never configured.
pub const PLACEHOLDER_INSTANCE_ID: &str = "i-0000000000000001";
pub const PLACEHOLDER_AMI_ID: &str = "ami-00000001";
pub const PLACEHOLDER_HOSTNAME_PREFIX: &str = "vm";
pub const PLACEHOLDER_LOCAL_IPV4: &str = "10.0.0.1";

pub const MIN_PASSWORD_LEN: usize = 6;

fn default_vlan() -> String {
    "0".to_owned()
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct MdsRecord {
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub ami_id: String,
    #[serde(default)]
    pub hostname_prefix: String,
    #[serde(default)]
    pub local_ipv4: String,
    #[serde(default = "default_vlan")]
    pub vlan: String,
    #[serde(default)]
    pub default_mac: String,
    #[serde(default)]
    pub ssh_pubkey: String,
    // Write-only: never redisplayed once saved.
    #[serde(default)]
    pub root_password: String,
    #[serde(default)]
    pub userdata_extra: String,
}

impl MdsRecord {
    /*
     * Prepare a fetched record for the edit form.
     * Placeholder fields get freshly allocated values so the operator
     * never has to invent identifiers by hand, and the saved password
     * is blanked (enter a new one to change it).
     */
    pub fn prepare_for_edit(
        mut self,
        smac: &str,
        vms: &[VmRecord],
    ) -> Result<Self, PanelError> {
        if self.instance_id.is_empty() || self.instance_id == PLACEHOLDER_INSTANCE_ID {
            let existing = allocate::known_instance_ids(vms);
            self.instance_id = allocate::generate_instance_id(&existing)?;
        }
        if self.ami_id.is_empty() || self.ami_id == PLACEHOLDER_AMI_ID {
            let existing = allocate::known_image_ids(vms);
            self.ami_id = allocate::generate_image_id(&existing)?;
        }
        if self.hostname_prefix.is_empty() || self.hostname_prefix == PLACEHOLDER_HOSTNAME_PREFIX {
            self.hostname_prefix = smac.to_owned();
        }
        if self.local_ipv4.is_empty() || self.local_ipv4 == PLACEHOLDER_LOCAL_IPV4 {
            self.local_ipv4 = allocate::allocate_ipv4(vms, Some(smac))?.to_string();
        }
        if self.vlan.is_empty() {
            self.vlan = default_vlan();
        }
        // Default mac comes from the vm's first network adapter.
        if let Some(vm) = vms.iter().find(|e| e.smac == smac) {
            if let Some(adapter) = vm.config.network_adapters.first() {
                if !adapter.mac.is_empty() {
                    self.default_mac = adapter.mac.to_owned();
                }
            }
        }
        self.root_password = String::new();
        Ok(self)
    }

    /*
     * Pre-flight checks, run before the record is sent to the host.
     */
    pub fn validate(&self, smac: &str, vms: &[VmRecord]) -> Result<(), PanelError> {
        if !self.root_password.is_empty() && self.root_password.len() < MIN_PASSWORD_LEN {
            let message = "Root password must be at least 6 characters.";
            let help = "Leave the field empty to keep the saved password.";
            return Err(ValidationError::new(message, help).into());
        }
        if !self.local_ipv4.is_empty() {
            let used = allocate::used_ipv4s(vms, Some(smac));
            if used.iter().any(|e| e.to_string() == self.local_ipv4) {
                let message = format!(
                    "Local ipv4 {} is already used by another vm.",
                    self.local_ipv4
                );
                let help = "Pick a different address or let the panel allocate one.";
                return Err(ValidationError::new(&message, help).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::{VmConfig, VmState};
    use miette::Result;

    fn vm_with_mds(smac: &str, ipv4: &str) -> VmRecord {
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
    fn placeholders_are_replaced_on_edit() -> Result<()> {
        let record = MdsRecord {
            instance_id: PLACEHOLDER_INSTANCE_ID.to_owned(),
            ami_id: PLACEHOLDER_AMI_ID.to_owned(),
            hostname_prefix: PLACEHOLDER_HOSTNAME_PREFIX.to_owned(),
            local_ipv4: PLACEHOLDER_LOCAL_IPV4.to_owned(),
            root_password: "changeme".to_owned(),
            ..Default::default()
        };
        let record = record.prepare_for_edit("vm1", &[])?;

        assert!(record.instance_id.starts_with("i-"));
        assert_ne!(record.instance_id, PLACEHOLDER_INSTANCE_ID);
        assert!(record.ami_id.starts_with("ami-"));
        assert_ne!(record.ami_id, PLACEHOLDER_AMI_ID);
        assert_eq!(record.hostname_prefix, "vm1");
        assert_eq!(record.local_ipv4, "10.0.1.10");
        // The saved password is never redisplayed.
        assert!(record.root_password.is_empty());
        Ok(())
    }

    #[test]
    fn configured_fields_survive_edit() -> Result<()> {
        let record = MdsRecord {
            instance_id: "i-abc0123456789def0".to_owned(),
            ami_id: "ami-deadbeef".to_owned(),
            hostname_prefix: "web".to_owned(),
            local_ipv4: "10.0.7.10".to_owned(),
            ..Default::default()
        };
        let record = record.clone().prepare_for_edit("vm1", &[])?;
        assert_eq!(record.instance_id, "i-abc0123456789def0");
        assert_eq!(record.ami_id, "ami-deadbeef");
        assert_eq!(record.hostname_prefix, "web");
        assert_eq!(record.local_ipv4, "10.0.7.10");
        Ok(())
    }

    #[test]
    fn short_password_is_rejected() -> Result<()> {
        let record = MdsRecord {
            root_password: "abc".to_owned(),
            ..Default::default()
        };
        assert!(record.validate("vm1", &[]).is_err());
        Ok(())
    }

    #[test]
    fn duplicate_ipv4_is_rejected() -> Result<()> {
        let fleet = vec![vm_with_mds("other", "10.0.2.10")];
        let record = MdsRecord {
            local_ipv4: "10.0.2.10".to_owned(),
            ..Default::default()
        };
        assert!(record.validate("vm1", &fleet).is_err());
        Ok(())
    }

    #[test]
    fn own_address_is_not_a_collision() -> Result<()> {
        // Re-saving a vm without changing its address must not trip
        // the uniqueness check against itself.
        let fleet = vec![vm_with_mds("vm1", "10.0.2.10")];
        let record = MdsRecord {
            local_ipv4: "10.0.2.10".to_owned(),
            ..Default::default()
        };
        record.validate("vm1", &fleet)?;
        Ok(())
    }
}
