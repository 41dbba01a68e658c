pub mod disk;
pub mod vm;

// Reexports
pub use disk::{BackupFile, Disk, ImageFile, IsoFile};
pub use vm::{CpuTopology, DiskSlot, Features, MemorySize, NetworkAdapter, VmConfig, VmRecord, VmState};

/*
* In-memory snapshot of the backend reported resources.
* Replaced wholesale on refresh, never mutated in place:
* the management host is the single source of truth.
*/
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub disks: Vec<Disk>,
    pub images: Vec<ImageFile>,
    pub isos: Vec<IsoFile>,
    pub backups: Vec<BackupFile>,
    pub vms: Vec<VmRecord>,
}

impl Catalog {
    pub fn disk(&self, name: &str) -> Option<&Disk> {
        self.disks.iter().find(|e| e.name == name)
    }
    pub fn has_disk(&self, name: &str) -> bool {
        self.disk(name).is_some()
    }
    pub fn vm(&self, smac: &str) -> Option<&VmRecord> {
        self.vms.iter().find(|e| e.smac == smac)
    }
}
