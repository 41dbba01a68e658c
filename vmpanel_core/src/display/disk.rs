use super::utils::*;
use crate::catalog::{BackupFile, Disk, ImageFile, IsoFile};

use tabled::{settings::Style, Table, Tabled};

// Error Handling
use miette::Result;
use vmpanel_error::PanelError;

#[derive(Default, Debug, Clone, Eq, PartialEq, Tabled)]
pub struct DiskTable {
    pub name: String,
    pub size: String,
    #[tabled(display("display_owner"))]
    pub owner: Option<String>,
}

impl DiskTable {
    pub fn from(disk: &Disk) -> Self {
        let size = match &disk.disk_size {
            Some(label) => label.to_owned(),
            None => display_size(&disk.size),
        };
        Self {
            name: format!("{}.qcow2", disk.name),
            size,
            owner: disk.owner.to_owned(),
        }
    }
    pub fn from_vec(disks: &[Disk]) -> Vec<Self> {
        disks.iter().map(DiskTable::from).collect()
    }
    pub fn display(items: Vec<Self>) -> Result<(), PanelError> {
        let mut res = Table::new(&items);
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Tabled)]
pub struct FileTable {
    pub name: String,
    pub size: String,
}

impl FileTable {
    pub fn from_images(images: &[ImageFile]) -> Vec<Self> {
        images
            .iter()
            .map(|e| Self {
                name: e.name.to_owned(),
                size: display_size(&e.size),
            })
            .collect()
    }
    pub fn from_isos(isos: &[IsoFile]) -> Vec<Self> {
        isos.iter()
            .map(|e| Self {
                name: e.name.to_owned(),
                size: display_size(&e.size),
            })
            .collect()
    }
    pub fn display(items: Vec<Self>) -> Result<(), PanelError> {
        let mut res = Table::new(&items);
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}

#[derive(Default, Debug, Clone, Eq, PartialEq, Tabled)]
pub struct BackupTable {
    pub vm: String,
    #[tabled(display("display_optional"))]
    pub datetime: Option<String>,
    pub size: String,
    pub filename: String,
}

impl BackupTable {
    pub fn from_vec(backups: &[BackupFile]) -> Vec<Self> {
        backups
            .iter()
            .map(|e| Self {
                vm: e.vm_name.to_owned(),
                datetime: e.datetime.to_owned(),
                size: display_size(&e.size),
                filename: e.filename.to_owned(),
            })
            .collect()
    }
    pub fn display(items: Vec<Self>) -> Result<(), PanelError> {
        let mut res = Table::new(&items);
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use miette::Result;

    #[test]
    fn disk_rows_carry_the_owner() -> Result<()> {
        let disks = vec![
            Disk {
                name: "vm1".to_owned(),
                size: 10 * 1024 * 1024 * 1024,
                disk_size: None,
                owner: Some("vm1".to_owned()),
            },
            Disk {
                name: "scratch".to_owned(),
                size: 0,
                disk_size: Some("2.5G".to_owned()),
                owner: None,
            },
        ];
        let rows = DiskTable::from_vec(&disks);
        assert_eq!(rows[0].name, "vm1.qcow2");
        assert_eq!(rows[1].size, "2.5G");
        assert!(rows[1].owner.is_none());
        println!();
        DiskTable::display(rows)?;
        Ok(())
    }
}
