use crate::config::PanelConfig;
use crate::display::{
    display_status, BackupTable, DiskTable, FileTable, TemplateTable, VmTable,
};
use crate::panel::{Operation, Panel};
use crate::template::{resolve, OsTemplate, Pairing};

use std::path::Path;

// Logger
use env_logger::Builder;

// Error Handling
use miette::Result;
use vmpanel_error::{LibError, PanelError};

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub commands: Commands,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Cli {
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        Self::switch(cli).await?;
        Ok(())
    }

    pub async fn switch(cli: Cli) -> Result<()> {
        // Set verbosity
        let verbosity = cli.verbose.log_level_filter();
        std::env::set_var("VMPANEL_LOG", verbosity.to_string().to_lowercase());
        Builder::from_env("VMPANEL_LOG").init();

        let config = PanelConfig::get()?;
        let mut panel = Panel::new(&config)?;

        match cli.commands {
            Commands::Vm(args) => Self::vm(&mut panel, args.command).await?,
            Commands::Disk(args) => Self::disk(&mut panel, args.command).await?,
            Commands::Image(args) => Self::image(&mut panel, args.command).await?,
            Commands::Iso(args) => Self::iso(&mut panel, args.command).await?,
            Commands::Console(args) => Self::console(&mut panel, args.command).await?,
            Commands::Backup(args) => Self::backup(&mut panel, args.command).await?,
            Commands::Mds(args) => Self::mds(&mut panel, args.command).await?,
            Commands::Template(args) => Self::template(&mut panel, args.command).await?,
        };
        Ok(())
    }

    async fn vm(panel: &mut Panel, command: VmCommands) -> Result<(), PanelError> {
        match command {
            VmCommands::Ls => {
                panel.refresh_vms().await?;
                let rows = VmTable::from_vec(&panel.catalog().vms, panel.session());
                VmTable::display(rows)?;
            }
            VmCommands::Create(args) => {
                // The catalog feeds template resolution and the
                // eligible disk check.
                panel.refresh_all().await?;
                Self::fill_form(panel, &args)?;
                panel.create_vm().await?;
                display_status(panel.status());
            }
            VmCommands::Update(args) => {
                panel.refresh_all().await?;
                let name = args.name.to_owned();
                panel.begin_edit(&name).await?;
                Self::fill_form(panel, &args)?;
                panel.update_vm().await?;
                display_status(panel.status());
            }
            VmCommands::Start(args) => {
                panel.vm_action(Operation::Start, &args.smac).await?;
                display_status(panel.status());
            }
            VmCommands::Stop(args) => {
                panel.vm_action(Operation::Stop, &args.smac).await?;
                display_status(panel.status());
            }
            VmCommands::Reset(args) => {
                panel.vm_action(Operation::Reset, &args.smac).await?;
                display_status(panel.status());
            }
            VmCommands::Powerdown(args) => {
                panel.vm_action(Operation::Powerdown, &args.smac).await?;
                display_status(panel.status());
            }
            VmCommands::Delete(args) => {
                panel.vm_action(Operation::Delete, &args.smac).await?;
                display_status(panel.status());
            }
            VmCommands::MountIso(args) => {
                panel.mount_iso(&args.smac, &args.isoname).await?;
                display_status(panel.status());
            }
            VmCommands::UnmountIso(args) => {
                panel.unmount_iso(&args.smac).await?;
                display_status(panel.status());
            }
            VmCommands::Migrate(args) => {
                panel.live_migrate(&args.smac, &args.to_node_ip).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    /// Apply create/update flags onto the form.
    fn fill_form(panel: &mut Panel, args: &VmFormArgs) -> Result<(), PanelError> {
        panel.form_mut().name = args.name.to_owned();
        if let Some(template) = &args.template {
            if OsTemplate::find(template).is_none() {
                let message = format!("Unknown template: {}", template);
                let keys = OsTemplate::all()
                    .iter()
                    .map(|e| e.key.to_owned())
                    .collect::<Vec<String>>()
                    .join(",");
                let help = format!("Available templates are:\n[{keys}]");
                return Err(LibError::new(&message, &help).into());
            }
            panel.apply_template(template);
        }
        if let Some(image) = &args.image {
            panel.select_base_image(Some(image))?;
        }
        if let Some(memory) = &args.memory {
            panel.form_mut().memory = memory.to_owned();
        }
        if let Some(cores) = &args.cores {
            panel.form_mut().cores = cores.to_owned();
        }
        if let Some(disk) = &args.disk {
            panel.form_mut().apply_base_image(disk);
        }
        Ok(())
    }

    async fn disk(panel: &mut Panel, command: DiskCommands) -> Result<(), PanelError> {
        match command {
            DiskCommands::Ls => {
                panel.refresh_disks().await?;
                DiskTable::display(DiskTable::from_vec(&panel.catalog().disks))?;
            }
            DiskCommands::Create(args) => {
                panel.create_disk(&args.name, &args.size).await?;
                display_status(panel.status());
            }
            DiskCommands::Delete(args) => {
                panel.delete_disk(&args.name).await?;
                display_status(panel.status());
            }
            DiskCommands::Clone(args) => {
                panel.clone_disk(&args.source, &args.name).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    async fn image(panel: &mut Panel, command: FileCommands) -> Result<(), PanelError> {
        match command {
            FileCommands::Ls => {
                panel.refresh_images().await?;
                FileTable::display(FileTable::from_images(&panel.catalog().images))?;
            }
            FileCommands::Delete(args) => {
                panel.delete_image(&args.name).await?;
                display_status(panel.status());
            }
            FileCommands::Upload(args) => {
                let (filename, bytes) = Self::read_upload(&args.file).await?;
                panel.upload_image(&filename, bytes).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    async fn iso(panel: &mut Panel, command: FileCommands) -> Result<(), PanelError> {
        match command {
            FileCommands::Ls => {
                panel.refresh_isos().await?;
                FileTable::display(FileTable::from_isos(&panel.catalog().isos))?;
            }
            FileCommands::Delete(args) => {
                panel.delete_iso(&args.name).await?;
                display_status(panel.status());
            }
            FileCommands::Upload(args) => {
                let (filename, bytes) = Self::read_upload(&args.file).await?;
                panel.upload_iso(&filename, bytes).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    async fn read_upload(file: &str) -> Result<(String, Vec<u8>), PanelError> {
        let filename = match Path::new(file).file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => {
                let message = format!("Not a file path: {}", file);
                return Err(LibError::new(&message, "").into());
            }
        };
        let bytes = tokio::fs::read(file).await?;
        Ok((filename, bytes))
    }

    async fn console(panel: &mut Panel, command: ConsoleCommands) -> Result<(), PanelError> {
        match command {
            ConsoleCommands::Start(args) => {
                // The console port lives in the vm's config blob.
                panel.refresh_vms().await?;
                panel.console_start(&args.smac).await?;
                display_status(panel.status());
            }
            ConsoleCommands::Stop(args) => {
                panel.refresh_vms().await?;
                panel.console_stop(&args.smac).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    async fn backup(panel: &mut Panel, command: BackupCommands) -> Result<(), PanelError> {
        match command {
            BackupCommands::Ls => {
                panel.refresh_backups().await?;
                BackupTable::display(BackupTable::from_vec(&panel.catalog().backups))?;
            }
            BackupCommands::Create(args) => {
                panel.backup_vm(&args.smac).await?;
                display_status(panel.status());
            }
            BackupCommands::Delete(args) => {
                panel.delete_backup(&args.filename).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    async fn mds(panel: &mut Panel, command: MdsCommands) -> Result<(), PanelError> {
        match command {
            MdsCommands::Show(args) => {
                panel.refresh_vms().await?;
                let record = panel.load_mds(&args.smac).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            MdsCommands::Set(args) => {
                panel.refresh_vms().await?;
                let mut record = panel.load_mds(&args.smac).await?;
                if let Some(value) = args.instance_id {
                    record.instance_id = value;
                }
                if let Some(value) = args.ami_id {
                    record.ami_id = value;
                }
                if let Some(value) = args.hostname_prefix {
                    record.hostname_prefix = value;
                }
                if let Some(value) = args.ipv4 {
                    record.local_ipv4 = value;
                }
                if let Some(value) = args.vlan {
                    record.vlan = value;
                }
                if let Some(value) = args.mac {
                    record.default_mac = value;
                }
                if let Some(value) = args.ssh_pubkey {
                    record.ssh_pubkey = value;
                }
                if let Some(value) = args.password {
                    record.root_password = value;
                }
                if let Some(value) = args.userdata {
                    record.userdata_extra = value;
                }
                panel.save_mds(&args.smac, &record).await?;
                display_status(panel.status());
            }
        };
        Ok(())
    }

    async fn template(panel: &mut Panel, command: TemplateCommands) -> Result<(), PanelError> {
        match command {
            TemplateCommands::Ls => {
                panel.refresh_disks().await?;
                let overrides = panel.overrides().load();
                let rows = OsTemplate::all()
                    .iter()
                    .map(|t| {
                        let image = resolve(&t.key, &panel.catalog().disks, &overrides);
                        TemplateTable::from(t, &Pairing::new(&t.key, image, &overrides))
                    })
                    .collect();
                TemplateTable::display(rows)?;
            }
            TemplateCommands::Pair(args) => {
                if OsTemplate::find(&args.key).is_none() {
                    let message = format!("Unknown template: {}", args.key);
                    return Err(LibError::new(&message, "See: vmpanel template ls").into());
                }
                panel.refresh_disks().await?;
                panel.apply_template(&args.key);
                let pairing = panel.select_base_image(args.image.as_deref())?;
                match pairing.image {
                    Some(image) => println!("{} -> {}", args.key, image),
                    None => println!("{} -> (cleared)", args.key),
                }
            }
        };
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage virtual machines.
    Vm(VmArgs),
    /// Manage qcow2 disks.
    Disk(DiskArgs),
    /// Manage disk image files.
    Image(FileArgs),
    /// Manage removable media.
    Iso(FileArgs),
    /// Manage remote console sessions.
    Console(ConsoleArgs),
    /// Manage vm backups.
    Backup(BackupArgs),
    /// Manage per-vm metadata service records.
    Mds(MdsArgs),
    /// Inspect os templates and their image pairings.
    Template(TemplateArgs),
}

#[derive(Debug, Args)]
pub struct VmArgs {
    #[command(subcommand)]
    pub command: VmCommands,
}

#[derive(Debug, Subcommand)]
pub enum VmCommands {
    /// List the fleet.
    Ls,
    #[command(arg_required_else_help = true)]
    Create(VmFormArgs),
    #[command(arg_required_else_help = true)]
    Update(VmFormArgs),
    Start(SmacArg),
    Stop(SmacArg),
    Reset(SmacArg),
    Powerdown(SmacArg),
    Delete(SmacArg),
    MountIso(MountIsoArgs),
    UnmountIso(SmacArg),
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
pub struct VmFormArgs {
    /// The vm identifier.
    pub name: String,
    /// Os template to apply (profile + image pairing).
    #[arg(long)]
    pub template: Option<String>,
    /// Base image, recorded as an override for the template.
    #[arg(long)]
    pub image: Option<String>,
    /// Memory size in MB.
    #[arg(long)]
    pub memory: Option<String>,
    /// Core count.
    #[arg(long)]
    pub cores: Option<String>,
    /// Primary disk name.
    #[arg(long)]
    pub disk: Option<String>,
}

#[derive(Debug, Args)]
pub struct SmacArg {
    pub smac: String,
}

#[derive(Debug, Args)]
pub struct MountIsoArgs {
    pub smac: String,
    pub isoname: String,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    pub smac: String,
    pub to_node_ip: String,
}

#[derive(Debug, Args)]
pub struct DiskArgs {
    #[command(subcommand)]
    pub command: DiskCommands,
}

#[derive(Debug, Subcommand)]
pub enum DiskCommands {
    Ls,
    Create(DiskCreateArgs),
    Delete(NameArg),
    Clone(DiskCloneArgs),
}

#[derive(Debug, Args)]
pub struct DiskCreateArgs {
    pub name: String,
    #[arg(default_value = "10G")]
    pub size: String,
}

#[derive(Debug, Args)]
pub struct DiskCloneArgs {
    pub source: String,
    pub name: String,
}

#[derive(Debug, Args)]
pub struct NameArg {
    pub name: String,
}

#[derive(Debug, Args)]
pub struct FileArgs {
    #[command(subcommand)]
    pub command: FileCommands,
}

#[derive(Debug, Subcommand)]
pub enum FileCommands {
    Ls,
    Delete(NameArg),
    Upload(UploadArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Path of the file to stream to the host.
    pub file: String,
}

#[derive(Debug, Args)]
pub struct ConsoleArgs {
    #[command(subcommand)]
    pub command: ConsoleCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConsoleCommands {
    Start(SmacArg),
    Stop(SmacArg),
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommands,
}

#[derive(Debug, Subcommand)]
pub enum BackupCommands {
    Ls,
    Create(SmacArg),
    Delete(BackupDeleteArgs),
}

#[derive(Debug, Args)]
pub struct BackupDeleteArgs {
    pub filename: String,
}

#[derive(Debug, Args)]
pub struct MdsArgs {
    #[command(subcommand)]
    pub command: MdsCommands,
}

#[derive(Debug, Subcommand)]
pub enum MdsCommands {
    /// Fetch the record, placeholders filled in.
    Show(SmacArg),
    /// Update fields of the record.
    Set(MdsSetArgs),
}

#[derive(Debug, Args)]
pub struct MdsSetArgs {
    pub smac: String,
    #[arg(long)]
    pub instance_id: Option<String>,
    #[arg(long)]
    pub ami_id: Option<String>,
    #[arg(long)]
    pub hostname_prefix: Option<String>,
    #[arg(long)]
    pub ipv4: Option<String>,
    #[arg(long)]
    pub vlan: Option<String>,
    #[arg(long)]
    pub mac: Option<String>,
    #[arg(long)]
    pub ssh_pubkey: Option<String>,
    /// Write-only: at least 6 characters, never redisplayed.
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub userdata: Option<String>,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub command: TemplateCommands,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommands {
    /// List templates with their resolved images.
    Ls,
    /// Record (or clear) a template's image override.
    Pair(TemplatePairArgs),
}

#[derive(Debug, Args)]
pub struct TemplatePairArgs {
    pub key: String,
    /// Omit to clear the recorded override.
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use miette::Result;

    #[test]
    fn parse_command_line() -> Result<()> {
        let e = "vmpanel vm ls";
        let os_str: Vec<&str> = e.split(' ').collect();
        let cli = Cli::parse_from(os_str);
        assert!(matches!(cli.commands, Commands::Vm(_)));
        Ok(())
    }

    #[test]
    fn parse_vm_create_flags() -> Result<()> {
        let e = "vmpanel vm create vm1 --template ubuntu-server --memory 4096";
        let os_str: Vec<&str> = e.split(' ').collect();
        let cli = Cli::parse_from(os_str);
        match cli.commands {
            Commands::Vm(args) => match args.command {
                VmCommands::Create(args) => {
                    assert_eq!(args.name, "vm1");
                    assert_eq!(args.template, Some("ubuntu-server".to_owned()));
                    assert_eq!(args.memory, Some("4096".to_owned()));
                }
                _ => panic!("expected create"),
            },
            _ => panic!("expected vm"),
        };
        Ok(())
    }

    #[test]
    fn parse_console_and_mds() -> Result<()> {
        let e = "vmpanel console start 52-54-c4-ca-42-38";
        let os_str: Vec<&str> = e.split(' ').collect();
        let cli = Cli::parse_from(os_str);
        assert!(matches!(cli.commands, Commands::Console(_)));

        let e = "vmpanel mds set vm1 --ipv4 10.0.3.10 --password secret1";
        let os_str: Vec<&str> = e.split(' ').collect();
        let cli = Cli::parse_from(os_str);
        match cli.commands {
            Commands::Mds(args) => match args.command {
                MdsCommands::Set(args) => {
                    assert_eq!(args.ipv4, Some("10.0.3.10".to_owned()));
                    assert_eq!(args.password, Some("secret1".to_owned()));
                }
                _ => panic!("expected set"),
            },
            _ => panic!("expected mds"),
        };
        Ok(())
    }
}
