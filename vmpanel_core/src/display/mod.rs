pub mod disk;
pub mod template;
pub mod utils;
pub mod vm;

// Reexports
pub use disk::{BackupTable, DiskTable, FileTable};
pub use template::TemplateTable;
pub use vm::VmTable;

use crate::panel::{StatusArea, StatusKind};

use owo_colors::OwoColorize;

/*
* Render the status area under the tables: one colored indicator
* line, then the raw backend output.
*/
pub fn display_status(status: &StatusArea) {
    match status.kind {
        StatusKind::Idle => {}
        StatusKind::Loading => println!("{}", status.message.yellow()),
        StatusKind::Success => println!("{}", status.message.green()),
        StatusKind::Error => eprintln!("{}", status.message.red()),
    }
    if !status.output.is_empty() {
        println!("{}", status.output);
    }
}
