pub mod actions;
pub mod form;
pub mod operation;

// Reexports
pub use form::VmForm;
pub use operation::{Operation, RefreshScope};

use crate::allocate;
use crate::catalog::{BackupFile, Catalog, Disk, ImageFile, IsoFile, VmRecord};
use crate::config::{Host, PanelConfig};
use crate::http_cli::{ApiResponse, HostConnection, HttpRequest};
use crate::session::SessionState;
use crate::template::OverrideStore;

// Serde
use serde::de::DeserializeOwned;
use serde::Serialize;

// Error Handling
use log::{debug, info};
use miette::Result;
use vmpanel_error::PanelError;

/*
* The reconciliation controller.
* Single writer of the catalog snapshot and the session state; every
* other component reads them through the accessors below. A user
* action calls the backend, and on success only, refreshes the
* catalog domain the operation touched so derived state is
* recomputed from fresh truth.
*/
pub struct Panel {
    host: Host,
    overrides: OverrideStore,

    catalog: Catalog,
    session: SessionState,
    form: VmForm,
    status: StatusArea,

    // Refresh requests are tagged so a slow, stale snapshot can
    // never overwrite a newer one (last request wins).
    refresh_seq: u64,
    applied: AppliedSeq,
}

#[derive(Debug, Default, Clone, Copy)]
struct AppliedSeq {
    vms: u64,
    disks: u64,
    images: u64,
    isos: u64,
    backups: u64,
}

/*
* The status area: one line of operation feedback plus the raw
* backend output, exactly what the operator last triggered.
*/
#[derive(Debug, Default, Clone)]
pub struct StatusArea {
    pub kind: StatusKind,
    pub message: String,
    pub output: String,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum StatusKind {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl StatusArea {
    pub fn loading(&mut self, message: &str) {
        self.kind = StatusKind::Loading;
        self.message = message.to_owned();
        self.output = String::new();
    }
    pub fn success(&mut self, message: &str, output: Option<&str>) {
        self.kind = StatusKind::Success;
        self.message = message.to_owned();
        self.output = output.unwrap_or("(no output)").to_owned();
    }
    pub fn error(&mut self, message: &str, output: Option<&str>) {
        self.kind = StatusKind::Error;
        self.message = message.to_owned();
        self.output = output.unwrap_or("").to_owned();
    }
}

/// One selectable disk entry, label ready for display.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiskOption {
    pub name: String,
    pub label: String,
}

impl Panel {
    pub fn new(config: &PanelConfig) -> Result<Self, PanelError> {
        let host = config.get_host()?;
        let overrides = OverrideStore::open()?;
        Ok(Self::with_store(host, overrides))
    }

    /// Wire the panel onto an explicit host and override store.
    pub fn with_store(host: Host, overrides: OverrideStore) -> Self {
        Self {
            host,
            overrides,
            catalog: Catalog::default(),
            session: SessionState::new(),
            form: VmForm::new(),
            status: StatusArea::default(),
            refresh_seq: 0,
            applied: AppliedSeq::default(),
        }
    }

    // Read accessors ////////////////////////////////////////////

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
    pub fn session(&self) -> &SessionState {
        &self.session
    }
    pub fn status(&self) -> &StatusArea {
        &self.status
    }
    pub fn form(&self) -> &VmForm {
        &self.form
    }
    /// The form is the one piece the operator edits directly.
    pub fn form_mut(&mut self) -> &mut VmForm {
        &mut self.form
    }
    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    // Http //////////////////////////////////////////////////////

    pub(crate) async fn fetch<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, PanelError> {
        let mut conn = HostConnection::new(&self.host)?;
        conn.open().await?;
        let value = conn.get(endpoint).await?.to_value().await?;
        Ok(value)
    }

    pub(crate) async fn post<T>(
        &self,
        endpoint: &str,
        payload: T,
    ) -> Result<ApiResponse, PanelError>
    where
        T: Serialize + Send,
    {
        let mut conn = HostConnection::new(&self.host)?;
        conn.open().await?;
        let value = conn.post(endpoint, Some(payload)).await?.to_value().await?;
        Ok(value)
    }

    /*
     * Send a mutating operation and surface the outcome.
     * On success the operation's catalog domain is refreshed so
     * stale selections are corrected; on failure nothing is
     * refreshed and the message is the sole visible effect.
     */
    pub async fn perform<T>(&mut self, op: Operation, payload: T) -> Result<bool, PanelError>
    where
        T: Serialize + Send,
    {
        info!("[start] {}", op);
        self.status.loading(&format!("Executing {}...", op));

        let data = match self.post(&op.path(), payload).await {
            Ok(data) => data,
            Err(e) => {
                self.status.error(&format!("Error [{}]: {}", op, e), None);
                return Err(e);
            }
        };

        if data.success {
            self.status.success(&data.message, data.output.as_deref());
            self.refresh(op.refresh_scope()).await?;
            info!("[end] {}", op);
            Ok(true)
        } else {
            self.status
                .error(&format!("Error: {}", data.message), data.output.as_deref());
            Ok(false)
        }
    }

    // Catalog refresh ///////////////////////////////////////////

    pub async fn refresh(&mut self, scope: RefreshScope) -> Result<(), PanelError> {
        match scope {
            // Disk ownership is a backend side effect of vm
            // create/update/delete, so vm operations refresh both.
            RefreshScope::Vm => {
                self.refresh_vms().await?;
                self.refresh_disks().await
            }
            RefreshScope::Disk => self.refresh_disks().await,
            RefreshScope::Image => self.refresh_images().await,
            RefreshScope::Iso => self.refresh_isos().await,
            RefreshScope::Backup => self.refresh_backups().await,
            // Console marking is sequenced by the caller.
            RefreshScope::Console => self.refresh_vms().await,
        }
    }

    /// Initial load: everything the panel renders at startup.
    pub async fn refresh_all(&mut self) -> Result<(), PanelError> {
        self.refresh_disks().await?;
        self.refresh_vms().await?;
        self.refresh_isos().await?;
        Ok(())
    }

    pub async fn refresh_vms(&mut self) -> Result<(), PanelError> {
        let seq = self.next_seq();
        let vms: Vec<VmRecord> = self.fetch("/api/vm/list").await?;
        self.apply_vms(seq, vms);
        Ok(())
    }
    pub async fn refresh_disks(&mut self) -> Result<(), PanelError> {
        let seq = self.next_seq();
        let disks: Vec<Disk> = self.fetch("/api/disk/list").await?;
        self.apply_disks(seq, disks);
        Ok(())
    }
    pub async fn refresh_images(&mut self) -> Result<(), PanelError> {
        let seq = self.next_seq();
        let images: Vec<ImageFile> = self.fetch("/api/image/list").await?;
        self.apply_images(seq, images);
        Ok(())
    }
    pub async fn refresh_isos(&mut self) -> Result<(), PanelError> {
        let seq = self.next_seq();
        let isos: Vec<IsoFile> = self.fetch("/api/iso/list").await?;
        self.apply_isos(seq, isos);
        Ok(())
    }
    pub async fn refresh_backups(&mut self) -> Result<(), PanelError> {
        let seq = self.next_seq();
        let backups: Vec<BackupFile> = self.fetch("/api/backup/list").await?;
        self.apply_backups(seq, backups);
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        self.refresh_seq += 1;
        self.refresh_seq
    }

    pub(crate) fn apply_vms(&mut self, seq: u64, vms: Vec<VmRecord>) {
        if seq <= self.applied.vms {
            debug!("Discarding stale vm snapshot (seq {}).", seq);
            return;
        }
        self.applied.vms = seq;
        self.catalog.vms = vms;
        // A vm observed stopped drops its console marker here.
        self.session.sync_with_vms(&self.catalog.vms);
    }
    pub(crate) fn apply_disks(&mut self, seq: u64, disks: Vec<Disk>) {
        if seq <= self.applied.disks {
            debug!("Discarding stale disk snapshot (seq {}).", seq);
            return;
        }
        self.applied.disks = seq;
        self.catalog.disks = disks;
    }
    pub(crate) fn apply_images(&mut self, seq: u64, images: Vec<ImageFile>) {
        if seq <= self.applied.images {
            return;
        }
        self.applied.images = seq;
        self.catalog.images = images;
    }
    pub(crate) fn apply_isos(&mut self, seq: u64, isos: Vec<IsoFile>) {
        if seq <= self.applied.isos {
            return;
        }
        self.applied.isos = seq;
        self.catalog.isos = isos;
    }
    pub(crate) fn apply_backups(&mut self, seq: u64, backups: Vec<BackupFile>) {
        if seq <= self.applied.backups {
            return;
        }
        self.applied.backups = seq;
        self.catalog.backups = backups;
    }

    // Derived state /////////////////////////////////////////////

    /*
     * The selectable set for one disk slot of the form.
     * Free disks, disks owned by the vm being edited, and whatever
     * the slot already selected.
     */
    pub fn disk_options_for_slot(&self, slot: usize) -> Vec<DiskOption> {
        let current = self
            .form
            .disks
            .get(slot)
            .map(|e| e.diskname.as_str())
            .filter(|e| !e.is_empty());
        let editing = self.session.editing();
        allocate::eligible_disks(&self.catalog.disks, editing, current)
            .into_iter()
            .map(|d| DiskOption {
                name: d.name.to_owned(),
                label: allocate::disk_label(d, editing),
            })
            .collect()
    }

    /*
     * The base-image selector offers every disk, owners included:
     * a template may legitimately point at an owned golden image.
     */
    pub fn base_image_options(&self) -> Vec<DiskOption> {
        let editing = self.session.editing();
        self.catalog
            .disks
            .iter()
            .map(|d| DiskOption {
                name: d.name.to_owned(),
                label: allocate::disk_label(d, editing),
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::{VmConfig, VmState};
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn test_panel(name: &str) -> Panel {
        let mut path = std::env::temp_dir();
        path.push(format!("vmpanel-panel-{}-{}", name, std::process::id()));
        path.push("overrides.json");
        let _ = std::fs::remove_file(&path);
        Panel::with_store(Host::default(), OverrideStore::at(&path))
    }

    fn disk(name: &str, owner: Option<&str>) -> Disk {
        Disk {
            name: name.to_owned(),
            size: 1024,
            disk_size: None,
            owner: owner.map(|e| e.to_owned()),
        }
    }

    fn vm(smac: &str, status: VmState) -> VmRecord {
        VmRecord {
            smac: smac.to_owned(),
            status,
            config: VmConfig::default(),
        }
    }

    #[test]
    fn recomputing_options_is_idempotent() -> Result<()> {
        let mut panel = test_panel("idempotent");
        let disks = vec![disk("free", None), disk("taken", Some("other"))];

        let seq = panel.next_seq();
        panel.apply_disks(seq, disks.clone());
        let first = panel.disk_options_for_slot(0);

        // Same snapshot applied again: identical selectable set.
        let seq = panel.next_seq();
        panel.apply_disks(seq, disks);
        let second = panel.disk_options_for_slot(0);

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn stale_snapshot_is_discarded() -> Result<()> {
        let mut panel = test_panel("stale");
        // Two overlapping refreshes: the later-issued request
        // returns first, then the slow early one arrives and loses.
        let first_issued = panel.next_seq();
        let second_issued = panel.next_seq();
        panel.apply_disks(second_issued, vec![disk("new", None)]);
        panel.apply_disks(first_issued, vec![disk("old", None)]);

        let names: Vec<String> = panel
            .catalog()
            .disks
            .iter()
            .map(|e| e.name.to_owned())
            .collect();
        assert_eq!(names, vec!["new".to_owned()]);
        Ok(())
    }

    #[test]
    fn vm_refresh_drops_stopped_console_markers() -> Result<()> {
        let mut panel = test_panel("console");
        panel.session.mark_console_active("vm1");

        let seq = panel.next_seq();
        panel.apply_vms(seq, vec![vm("vm1", VmState::Stopped)]);
        assert!(!panel.session().is_console_active("vm1"));
        Ok(())
    }

    #[test]
    fn slot_options_keep_the_current_selection() -> Result<()> {
        let mut panel = test_panel("slot");
        let seq = panel.next_seq();
        panel.apply_disks(
            seq,
            vec![disk("b-disk", Some("B")), disk("free-disk", None)],
        );
        panel.form_mut().disks[0].diskname = "b-disk".to_owned();

        let names: Vec<String> = panel
            .disk_options_for_slot(0)
            .iter()
            .map(|e| e.name.to_owned())
            .collect();
        assert_eq!(names, vec!["b-disk".to_owned(), "free-disk".to_owned()]);
        Ok(())
    }

    #[test]
    fn deleting_a_vm_frees_its_disk_for_selection() -> Result<()> {
        let mut panel = test_panel("delete-frees");

        // Snapshot after "create vm1": the disk is owned.
        let seq = panel.next_seq();
        panel.apply_vms(seq, vec![vm("vm1", VmState::Stopped)]);
        let seq = panel.next_seq();
        panel.apply_disks(seq, vec![disk("vm1", Some("vm1"))]);
        assert!(panel.disk_options_for_slot(0).is_empty());

        // Snapshot after "delete vm1": gone from the fleet, disk free.
        let seq = panel.next_seq();
        panel.apply_vms(seq, vec![]);
        let seq = panel.next_seq();
        panel.apply_disks(seq, vec![disk("vm1", None)]);

        assert!(panel.catalog().vms.is_empty());
        let names: Vec<String> = panel
            .disk_options_for_slot(0)
            .iter()
            .map(|e| e.name.to_owned())
            .collect();
        assert_eq!(names, vec!["vm1".to_owned()]);
        Ok(())
    }

    #[test]
    fn base_image_options_include_owned_disks() -> Result<()> {
        let mut panel = test_panel("base");
        let seq = panel.next_seq();
        panel.apply_disks(
            seq,
            vec![disk("golden", Some("A")), disk("scratch", None)],
        );

        let options = panel.base_image_options();
        assert_eq!(options.len(), 2);
        assert!(options[0].label.contains("[A]"));
        Ok(())
    }
}
