use super::utils::*;
use crate::catalog::{VmRecord, VmState};
use crate::session::SessionState;

use owo_colors::OwoColorize;
use tabled::{
    settings::{disable::Remove, location::ByColumnName, Style},
    Table, Tabled,
};

// Error Handling
use log::{log_enabled, Level};
use miette::Result;
use vmpanel_error::PanelError;

#[derive(Default, Debug, Clone, Eq, PartialEq, Tabled)]
pub struct VmTable {
    pub name: String,

    pub cpu: String,
    pub memory: String,
    pub disks: String,

    pub console: String,

    #[tabled(display("display_state"))]
    pub state: VmState,
}

impl VmTable {
    pub fn from(vm: &VmRecord, session: &SessionState) -> Self {
        let config = &vm.config;
        let cpu = format!("{}c/{}t", config.cpu.cores, config.cpu.threads);
        let memory = format!("{}MB", config.memory.size);
        let disks = if config.disks.is_empty() {
            "-".to_owned()
        } else {
            config
                .disks
                .iter()
                .map(|d| {
                    if d.diskname.is_empty() {
                        "-".to_owned()
                    } else {
                        d.diskname.to_owned()
                    }
                })
                .collect::<Vec<String>>()
                .join(", ")
        };
        let console = match config.vnc_port {
            Some(port) if session.is_console_active(&vm.smac) => {
                format!(":{} {}", port, "active".green())
            }
            Some(port) => format!(":{}", port),
            None => "-".to_owned(),
        };

        Self {
            name: vm.smac.to_owned(),
            cpu,
            memory,
            disks,
            console,
            state: vm.status.to_owned(),
        }
    }
    pub fn from_vec(vms: &[VmRecord], session: &SessionState) -> Vec<Self> {
        vms.iter().map(|vm| VmTable::from(vm, session)).collect()
    }

    pub fn display(items: Vec<Self>) -> Result<(), PanelError> {
        let mut res = Table::new(&items);
        if !log_enabled!(Level::Debug) {
            // Console ports are plumbing, keep the default view lean.
            if items.iter().all(|e| e.console == "-") {
                res.with(Remove::column(ByColumnName::new("console")));
            }
        }
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}
