use strum::{Display, EnumString};

/*
* Every mutating operation the management api accepts.
* The wire name doubles as the endpoint suffix.
*/
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString)]
pub enum Operation {
    // Vm lifecycle
    #[strum(serialize = "create-config")]
    CreateConfig,
    #[strum(serialize = "update-config")]
    UpdateConfig,
    #[strum(serialize = "start")]
    Start,
    #[strum(serialize = "stop")]
    Stop,
    #[strum(serialize = "reset")]
    Reset,
    #[strum(serialize = "powerdown")]
    Powerdown,
    #[strum(serialize = "delete")]
    Delete,

    // Removable media and migration
    #[strum(serialize = "mountiso")]
    MountIso,
    #[strum(serialize = "unmountiso")]
    UnmountIso,
    #[strum(serialize = "livemigrate")]
    LiveMigrate,

    // Backups
    #[strum(serialize = "backup")]
    Backup,
    #[strum(serialize = "backup/delete")]
    BackupDelete,

    // Disks
    #[strum(serialize = "disk/create")]
    DiskCreate,
    #[strum(serialize = "disk/delete")]
    DiskDelete,
    #[strum(serialize = "disk/clone")]
    DiskClone,

    // Disk images and isos
    #[strum(serialize = "image/delete")]
    ImageDelete,
    #[strum(serialize = "iso/delete")]
    IsoDelete,

    // Console sessions
    #[strum(serialize = "vnc/start")]
    VncStart,
    #[strum(serialize = "vnc/stop")]
    VncStop,
}

/// Which part of the catalog a successful operation invalidates.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RefreshScope {
    Vm,
    Disk,
    Image,
    Iso,
    Backup,
    // Console marking is sequenced by the caller, around the refresh.
    Console,
}

impl Operation {
    /*
     * Operations on non-vm resources live under their own prefix,
     * everything else under /api/vm.
     */
    pub fn path(&self) -> String {
        let name = self.to_string();
        let prefixed = ["vnc/", "disk/", "iso/", "image/", "backup/"]
            .iter()
            .any(|p| name.starts_with(p));
        if prefixed {
            format!("/api/{}", name)
        } else {
            format!("/api/vm/{}", name)
        }
    }

    pub fn refresh_scope(&self) -> RefreshScope {
        match self {
            Operation::CreateConfig
            | Operation::UpdateConfig
            | Operation::Start
            | Operation::Stop
            | Operation::Reset
            | Operation::Powerdown
            | Operation::Delete
            | Operation::MountIso
            | Operation::UnmountIso
            | Operation::LiveMigrate => RefreshScope::Vm,
            Operation::Backup | Operation::BackupDelete => RefreshScope::Backup,
            Operation::DiskCreate | Operation::DiskDelete | Operation::DiskClone => {
                RefreshScope::Disk
            }
            Operation::ImageDelete => RefreshScope::Image,
            Operation::IsoDelete => RefreshScope::Iso,
            Operation::VncStart | Operation::VncStop => RefreshScope::Console,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn vm_operations_post_under_the_vm_prefix() -> Result<()> {
        assert_eq!(Operation::CreateConfig.path(), "/api/vm/create-config");
        assert_eq!(Operation::Start.path(), "/api/vm/start");
        assert_eq!(Operation::Backup.path(), "/api/vm/backup");
        Ok(())
    }

    #[test]
    fn resource_operations_post_under_their_own_prefix() -> Result<()> {
        assert_eq!(Operation::DiskClone.path(), "/api/disk/clone");
        assert_eq!(Operation::VncStart.path(), "/api/vnc/start");
        assert_eq!(Operation::BackupDelete.path(), "/api/backup/delete");
        assert_eq!(Operation::IsoDelete.path(), "/api/iso/delete");
        Ok(())
    }
}
