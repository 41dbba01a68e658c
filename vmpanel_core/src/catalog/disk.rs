use serde::{Deserialize, Serialize};

/*
* A qcow2 disk reported by the management host.
* The owner field carries the identifier of the vm the disk belongs
* to, or nothing when the disk is free for selection.
*/
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct Disk {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    // Precomputed human readable size, when the host provides one.
    #[serde(default)]
    pub disk_size: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ImageFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct IsoFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct BackupFile {
    pub filename: String,
    pub vm_name: String,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub size: u64,
}
