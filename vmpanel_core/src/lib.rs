pub mod allocate;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod display;
pub mod http_cli;
pub mod mds;
pub mod panel;
pub mod session;
pub mod template;

// Reexports
pub use catalog::{Catalog, Disk, VmRecord, VmState};
pub use config::PanelConfig;
pub use panel::{Operation, Panel};
