use crate::template::{OsTemplate, Pairing};

use owo_colors::OwoColorize;
use tabled::{settings::Style, Table, Tabled};

// Error Handling
use miette::Result;
use vmpanel_error::PanelError;

#[derive(Default, Debug, Clone, Eq, PartialEq, Tabled)]
pub struct TemplateTable {
    pub key: String,
    pub profile: String,
    pub image: String,
}

impl TemplateTable {
    pub fn from(template: &OsTemplate, pairing: &Pairing) -> Self {
        let profile = match &template.profile {
            Some(p) => format!(
                "{}s/{}c/{}t {}MB{}",
                p.sockets,
                p.cores,
                p.threads,
                p.memory_mb,
                if p.is_windows { " (windows)" } else { "" }
            ),
            None => "-".to_owned(),
        };
        let image = if template.is_sentinel() {
            "-".to_owned()
        } else {
            match &pairing.image {
                Some(image) if pairing.saved => format!("{} {}", image, "(saved)".blue()),
                Some(image) => image.to_owned(),
                None => format!("{}", "unpaired".yellow()),
            }
        };
        Self {
            key: template.key.to_owned(),
            profile,
            image,
        }
    }
    pub fn display(items: Vec<Self>) -> Result<(), PanelError> {
        let mut res = Table::new(&items);
        res.with(Style::rounded());
        println!("{}", res);
        Ok(())
    }
}
