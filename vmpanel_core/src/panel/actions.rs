use super::{Operation, Panel, VmForm};
use crate::catalog::{VmConfig, VmRecord};
use crate::http_cli::{ApiResponse, HostConnection, HttpRequest};
use crate::mds::MdsRecord;
use crate::template::{resolve, OsTemplate, Pairing, CUSTOM};

use serde_json::json;

// Error Handling
use log::info;
use miette::Result;
use vmpanel_error::{LibError, PanelError, ValidationError};

/*
* Collect the form for submission.
* A blank primary disk name defaults to the vm name, so a bare
* "create" always lands on a disk the operator can find.
*/
pub(crate) fn config_for_submit(name: &str, form: &VmForm) -> VmConfig {
    let mut config = form.collect();
    if let Some(first) = config.disks.first_mut() {
        if first.diskname.is_empty() {
            first.diskname = name.to_owned();
        }
    }
    config
}

impl Panel {
    // Templates /////////////////////////////////////////////////

    /*
     * Activate a template on the form.
     * The hardware profile overwrites the form unconditionally; the
     * image resolves override-first and lands on the primary disk
     * slot. The sentinel clears the selection instead.
     */
    pub fn apply_template(&mut self, key: &str) -> Pairing {
        self.form.template = key.to_owned();

        let template = match OsTemplate::find(key) {
            Some(t) if !t.is_sentinel() => t,
            _ => {
                self.form.base_image = None;
                return Pairing {
                    image: None,
                    saved: false,
                };
            }
        };

        if let Some(profile) = &template.profile {
            self.form.apply_profile(profile);
        }

        let overrides = self.overrides.load();
        let image = resolve(key, &self.catalog.disks, &overrides);
        self.form.base_image = image.to_owned();
        if let Some(image) = &image {
            self.form.apply_base_image(image);
        }
        Pairing::new(key, image, &overrides)
    }

    /*
     * The operator picked (or cleared) a base image by hand.
     * Recorded as an override for the active template, unless the
     * sentinel is active.
     */
    pub fn select_base_image(&mut self, selection: Option<&str>) -> Result<Pairing, PanelError> {
        let key = self.form.template.to_owned();
        if !key.is_empty() && key != CUSTOM {
            self.overrides.record(&key, selection)?;
        }
        let selection = selection.filter(|e| !e.is_empty()).map(|e| e.to_owned());
        self.form.base_image = selection.to_owned();
        if let Some(image) = &selection {
            self.form.apply_base_image(image);
        }
        Ok(Pairing::new(&key, selection, &self.overrides.load()))
    }

    // Vm lifecycle //////////////////////////////////////////////

    /// Create a vm from the current form.
    pub async fn create_vm(&mut self) -> Result<bool, PanelError> {
        self.submit_form(Operation::CreateConfig).await
    }

    /// Save the current form over the vm being edited.
    pub async fn update_vm(&mut self) -> Result<bool, PanelError> {
        self.submit_form(Operation::UpdateConfig).await
    }

    async fn submit_form(&mut self, op: Operation) -> Result<bool, PanelError> {
        let name = self.form.name.trim().to_owned();
        if name.is_empty() {
            let err = ValidationError::new("A vm name is required.", "Fill the name field first.");
            return Err(err.into());
        }
        let config = config_for_submit(&name, &self.form);
        let ok = self
            .perform(op, json!({ "smac": name, "config": config }))
            .await?;
        if ok {
            // Back to create mode.
            self.session.end_edit();
            self.form.reset();
        }
        Ok(ok)
    }

    /*
     * Load a vm into the form for editing.
     * The template resets to the sentinel: the form shows the vm's
     * real config, with missing fields on the creation baseline.
     */
    pub async fn begin_edit(&mut self, smac: &str) -> Result<(), PanelError> {
        let vm: VmRecord = self.fetch(&format!("/api/vm/get/{}", smac)).await?;
        info!("Editing vm {}.", vm.smac);
        self.session.begin_edit(&vm.smac);
        self.form.populate(&vm.smac, &vm.config);
        Ok(())
    }

    /// Simple lifecycle commands: start, stop, reset, powerdown, delete.
    pub async fn vm_action(&mut self, op: Operation, smac: &str) -> Result<bool, PanelError> {
        self.perform(op, json!({ "smac": smac })).await
    }

    pub async fn mount_iso(&mut self, smac: &str, isoname: &str) -> Result<bool, PanelError> {
        self.perform(
            Operation::MountIso,
            json!({ "smac": smac, "isoname": isoname }),
        )
        .await
    }

    pub async fn unmount_iso(&mut self, smac: &str) -> Result<bool, PanelError> {
        self.perform(Operation::UnmountIso, json!({ "smac": smac })).await
    }

    pub async fn live_migrate(&mut self, smac: &str, to_node_ip: &str) -> Result<bool, PanelError> {
        self.perform(
            Operation::LiveMigrate,
            json!({ "smac": smac, "to_node_ip": to_node_ip }),
        )
        .await
    }

    // Console sessions //////////////////////////////////////////

    fn console_port(&self, smac: &str) -> Result<u16, PanelError> {
        match self.catalog.vm(smac).and_then(|vm| vm.config.vnc_port) {
            Some(port) => Ok(port),
            None => {
                let message = format!("No console port assigned for {}.", smac);
                let help = "The vm config carries no vnc_port.";
                Err(ValidationError::new(&message, help).into())
            }
        }
    }

    /*
     * The vm is marked console-active only after the host confirmed
     * the session, and the marker is re-checked against the fresh
     * vm list right away.
     */
    pub async fn console_start(&mut self, smac: &str) -> Result<bool, PanelError> {
        let port = self.console_port(smac)?;
        let ok = self
            .perform(
                Operation::VncStart,
                json!({ "smac": smac, "novncport": port.to_string() }),
            )
            .await?;
        if ok {
            self.session.mark_console_active(smac);
        }
        Ok(ok)
    }

    pub async fn console_stop(&mut self, smac: &str) -> Result<bool, PanelError> {
        let port = self.console_port(smac)?;
        let ok = self
            .perform(
                Operation::VncStop,
                json!({ "smac": smac, "novncport": port.to_string() }),
            )
            .await?;
        if ok {
            self.session.clear_console_active(smac);
        }
        Ok(ok)
    }

    // Mds ///////////////////////////////////////////////////////

    /*
     * Fetch a vm's metadata-service record, ready for the edit
     * form: placeholders replaced with allocated values, password
     * blanked.
     */
    pub async fn load_mds(&mut self, smac: &str) -> Result<MdsRecord, PanelError> {
        self.status
            .loading(&format!("Loading mds config for {}...", smac));
        let data: ApiResponse = self.fetch(&format!("/api/vm/{}/mds", smac)).await?;

        if !data.success {
            self.status.error(&format!("Error: {}", data.message), None);
            return Err(LibError::new(&data.message, "").into());
        }

        let raw = data.output.unwrap_or_default();
        let record: MdsRecord = serde_json::from_str(&raw).unwrap_or_default();
        let record = record.prepare_for_edit(smac, &self.catalog.vms)?;
        self.status
            .success(&format!("Mds config loaded for {}", smac), Some(&raw));
        Ok(record)
    }

    /*
     * Save a vm's metadata-service record.
     * Pre-flight checks (password length, fleet-unique address) run
     * before anything is sent.
     */
    pub async fn save_mds(&mut self, smac: &str, record: &MdsRecord) -> Result<bool, PanelError> {
        record.validate(smac, &self.catalog.vms)?;

        self.status
            .loading(&format!("Saving mds config for {}...", smac));
        let data = match self.post(&format!("/api/vm/{}/mds", smac), record).await {
            Ok(data) => data,
            Err(e) => {
                self.status.error(&format!("Error: {}", e), None);
                return Err(e);
            }
        };

        if data.success {
            self.status.success(&data.message, data.output.as_deref());
            // The fleet view feeds the address uniqueness check.
            self.refresh_vms().await?;
            Ok(true)
        } else {
            self.status
                .error(&format!("Error: {}", data.message), data.output.as_deref());
            Ok(false)
        }
    }

    // Disks /////////////////////////////////////////////////////

    pub async fn create_disk(&mut self, name: &str, size: &str) -> Result<bool, PanelError> {
        let name = name.trim();
        if name.is_empty() {
            let err = ValidationError::new("A disk name is required.", "Fill the name field first.");
            return Err(err.into());
        }
        self.perform(Operation::DiskCreate, json!({ "name": name, "size": size }))
            .await
    }

    pub async fn delete_disk(&mut self, name: &str) -> Result<bool, PanelError> {
        self.perform(Operation::DiskDelete, json!({ "name": name })).await
    }

    pub async fn clone_disk(&mut self, source: &str, name: &str) -> Result<bool, PanelError> {
        let name = name.trim();
        if name.is_empty() {
            let err = ValidationError::new("A clone name is required.", "Fill the name field first.");
            return Err(err.into());
        }
        self.perform(
            Operation::DiskClone,
            json!({ "source": source, "name": name }),
        )
        .await
    }

    // Disk images and isos //////////////////////////////////////

    pub async fn delete_image(&mut self, name: &str) -> Result<bool, PanelError> {
        self.perform(Operation::ImageDelete, json!({ "name": name })).await
    }

    pub async fn delete_iso(&mut self, name: &str) -> Result<bool, PanelError> {
        self.perform(Operation::IsoDelete, json!({ "name": name })).await
    }

    /*
     * Uploads are a raw byte stream, the filename travels in a
     * header, not in a json body.
     */
    pub async fn upload_image(&mut self, filename: &str, bytes: Vec<u8>) -> Result<bool, PanelError> {
        self.upload("/api/image/upload", filename, bytes).await
    }

    pub async fn upload_iso(&mut self, filename: &str, bytes: Vec<u8>) -> Result<bool, PanelError> {
        if !filename.ends_with(".iso") {
            let err = ValidationError::new(
                "Removable media must be an .iso file.",
                "Rename the file or pick another one.",
            );
            return Err(err.into());
        }
        self.upload("/api/iso/upload", filename, bytes).await
    }

    async fn upload(
        &mut self,
        endpoint: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<bool, PanelError> {
        self.status.loading(&format!("Uploading {}...", filename));

        let mut conn = HostConnection::new(&self.host)?;
        conn.open().await?;
        let data: ApiResponse = conn
            .post_raw(endpoint, filename, bytes)
            .await?
            .to_value()
            .await?;

        if data.success {
            self.status.success(&data.message, data.output.as_deref());
            match endpoint {
                "/api/iso/upload" => self.refresh_isos().await?,
                _ => self.refresh_images().await?,
            }
            Ok(true)
        } else {
            self.status
                .error(&format!("Error: {}", data.message), data.output.as_deref());
            Ok(false)
        }
    }

    // Backups ///////////////////////////////////////////////////

    pub async fn backup_vm(&mut self, smac: &str) -> Result<bool, PanelError> {
        self.perform(Operation::Backup, json!({ "smac": smac })).await
    }

    pub async fn delete_backup(&mut self, filename: &str) -> Result<bool, PanelError> {
        self.perform(Operation::BackupDelete, json!({ "filename": filename }))
            .await
    }
}
