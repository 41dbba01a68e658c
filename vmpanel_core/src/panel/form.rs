use crate::allocate;
use crate::catalog::{CpuTopology, DiskSlot, Features, MemorySize, NetworkAdapter, VmConfig};
use crate::template::{HardwareProfile, CUSTOM};

/*
* The active create/edit form.
* Mirrors the backend's string-typed wire fields so collecting a
* config is a plain restructure.
*/
#[derive(Debug, Clone)]
pub struct VmForm {
    pub name: String,
    pub template: String,
    pub base_image: Option<String>,

    pub sockets: String,
    pub cores: String,
    pub threads: String,
    pub memory: String,
    pub is_windows: String,

    pub adapters: Vec<NetworkAdapter>,
    pub disks: Vec<DiskSlot>,
}

impl Default for VmForm {
    fn default() -> Self {
        let mut form = Self {
            name: String::new(),
            template: CUSTOM.to_owned(),
            base_image: None,
            sockets: "1".to_owned(),
            cores: "2".to_owned(),
            threads: "1".to_owned(),
            memory: "2048".to_owned(),
            is_windows: "0".to_owned(),
            adapters: vec![],
            disks: vec![],
        };
        form.add_adapter();
        form.add_disk_slot();
        form
    }
}

impl VmForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an adapter row with a fresh random mac.
    pub fn add_adapter(&mut self) {
        self.adapters.push(NetworkAdapter {
            netid: self.adapters.len().to_string(),
            mac: allocate::random_mac().to_string(),
            vlan: "0".to_owned(),
        });
    }

    /// Append an empty disk row with the iops baseline.
    pub fn add_disk_slot(&mut self) {
        self.disks.push(DiskSlot {
            diskid: self.disks.len().to_string(),
            ..Default::default()
        });
    }

    /*
     * A template's hardware profile overwrites the form
     * unconditionally, whatever was typed before.
     */
    pub fn apply_profile(&mut self, profile: &HardwareProfile) {
        self.sockets = profile.sockets.to_string();
        self.cores = profile.cores.to_string();
        self.threads = profile.threads.to_string();
        self.memory = profile.memory_mb.to_string();
        self.is_windows = if profile.is_windows { "1" } else { "0" }.to_owned();
    }

    /// Point the primary disk slot at the given image.
    pub fn apply_base_image(&mut self, image: &str) {
        if self.disks.is_empty() {
            self.add_disk_slot();
        }
        self.disks[0].diskname = image.to_owned();
    }

    /*
     * Populate the form from a fetched vm, for edit mode.
     * The template resets to the sentinel: editing starts from the
     * vm's real config, not from a profile.
     */
    pub fn populate(&mut self, smac: &str, config: &VmConfig) {
        *self = Self {
            name: smac.to_owned(),
            template: CUSTOM.to_owned(),
            base_image: None,
            sockets: config.cpu.sockets.to_owned(),
            cores: config.cpu.cores.to_owned(),
            threads: config.cpu.threads.to_owned(),
            memory: config.memory.size.to_owned(),
            is_windows: config.features.is_windows.to_owned(),
            adapters: config.network_adapters.to_owned(),
            disks: config.disks.to_owned(),
        };
        if self.adapters.is_empty() {
            self.add_adapter();
        }
        if self.disks.is_empty() {
            self.add_disk_slot();
        }
    }

    /// Collect the form into a config blob for the wire.
    pub fn collect(&self) -> VmConfig {
        VmConfig {
            cpu: CpuTopology {
                sockets: self.sockets.to_owned(),
                cores: self.cores.to_owned(),
                threads: self.threads.to_owned(),
            },
            memory: MemorySize {
                size: self.memory.to_owned(),
            },
            features: Features {
                is_windows: self.is_windows.to_owned(),
            },
            network_adapters: self.adapters.to_owned(),
            disks: self.disks.to_owned(),
            vnc_port: None,
            mds: None,
        }
    }

    /// Back to creation defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
