// Struct
use crate::mds::MdsRecord;

use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use strum::{Display, EnumString};

// Wire defaults.
// The host stores every hardware field as a string.
fn default_one() -> String {
    "1".to_owned()
}
fn default_cores() -> String {
    "2".to_owned()
}
fn default_memory() -> String {
    "2048".to_owned()
}
fn default_zero() -> String {
    "0".to_owned()
}
fn default_iops_total() -> String {
    "9600".to_owned()
}
fn default_iops_total_max() -> String {
    "11520".to_owned()
}
fn default_iops_total_max_length() -> String {
    "60".to_owned()
}

/*
* A virtual machine as reported by the management host.
* The identifier is historically a mac derived token (smac) and is
* unique across the fleet.
*/
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct VmRecord {
    pub smac: String,
    #[serde(default)]
    pub status: VmState,
    // Older hosts ship the config blob as an embedded json string,
    // newer ones as a plain object.
    #[serde(default, deserialize_with = "string_or_struct")]
    pub config: VmConfig,
}

#[derive(Default, Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VmState {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct VmConfig {
    #[serde(default)]
    pub cpu: CpuTopology,
    #[serde(default)]
    pub memory: MemorySize,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub network_adapters: Vec<NetworkAdapter>,
    #[serde(default)]
    pub disks: Vec<DiskSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnc_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mds: Option<MdsRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct CpuTopology {
    #[serde(default = "default_one")]
    pub sockets: String,
    #[serde(default = "default_cores")]
    pub cores: String,
    #[serde(default = "default_one")]
    pub threads: String,
}
impl Default for CpuTopology {
    fn default() -> Self {
        Self {
            sockets: default_one(),
            cores: default_cores(),
            threads: default_one(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct MemorySize {
    #[serde(default = "default_memory")]
    pub size: String,
}
impl Default for MemorySize {
    fn default() -> Self {
        Self {
            size: default_memory(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct Features {
    #[serde(default = "default_zero")]
    pub is_windows: String,
}
impl Default for Features {
    fn default() -> Self {
        Self {
            is_windows: default_zero(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct NetworkAdapter {
    #[serde(default = "default_zero")]
    pub netid: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default = "default_zero")]
    pub vlan: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct DiskSlot {
    #[serde(default = "default_zero")]
    pub diskid: String,
    #[serde(default)]
    pub diskname: String,
    #[serde(rename = "iops-total", default = "default_iops_total")]
    pub iops_total: String,
    #[serde(rename = "iops-total-max", default = "default_iops_total_max")]
    pub iops_total_max: String,
    #[serde(
        rename = "iops-total-max-length",
        default = "default_iops_total_max_length"
    )]
    pub iops_total_max_length: String,
}
impl Default for DiskSlot {
    fn default() -> Self {
        Self {
            diskid: default_zero(),
            diskname: String::new(),
            iops_total: default_iops_total(),
            iops_total_max: default_iops_total_max(),
            iops_total_max_length: default_iops_total_max_length(),
        }
    }
}

impl fmt::Display for VmRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.smac, self.status)
    }
}

/*
* Accept a config blob either as a json string or as a plain object.
* A string that doesn't parse falls back to the default blob, so a
* half-written record still renders.
*/
fn string_or_struct<'de, D>(deserializer: D) -> Result<VmConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(serde_json::from_str(&s).unwrap_or_default()),
        Value::Null => Ok(VmConfig::default()),
        other => serde_json::from_value(other).map_err(DeError::custom),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_record_with_stringified_config() -> Result<()> {
        let json = r#"{
            "smac": "52-54-c4-ca-42-38",
            "status": "running",
            "config": "{\"cpu\":{\"sockets\":\"1\",\"cores\":\"4\",\"threads\":\"2\"},\"memory\":{\"size\":\"4096\"},\"features\":{\"is_windows\":\"0\"},\"network_adapters\":[],\"disks\":[],\"vnc_port\":15900}"
        }"#;
        let vm: VmRecord = serde_json::from_str(json).unwrap();
        assert_eq!(vm.status, VmState::Running);
        assert_eq!(vm.config.cpu.cores, "4");
        assert_eq!(vm.config.vnc_port, Some(15900));
        Ok(())
    }

    #[test]
    fn decode_record_with_inline_config() -> Result<()> {
        let json = r#"{
            "smac": "vm1",
            "config": { "memory": { "size": "1024" } }
        }"#;
        let vm: VmRecord = serde_json::from_str(json).unwrap();
        assert_eq!(vm.status, VmState::Stopped);
        assert_eq!(vm.config.memory.size, "1024");
        // Missing fields land on the creation baseline.
        assert_eq!(vm.config.cpu.sockets, "1");
        assert_eq!(vm.config.cpu.cores, "2");
        Ok(())
    }

    #[test]
    fn disk_slot_defaults() -> Result<()> {
        let slot: DiskSlot = serde_json::from_str(r#"{"diskid":"0","diskname":"vm1"}"#).unwrap();
        assert_eq!(slot.iops_total, "9600");
        assert_eq!(slot.iops_total_max, "11520");
        assert_eq!(slot.iops_total_max_length, "60");
        Ok(())
    }
}
