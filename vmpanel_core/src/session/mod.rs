/*
* Ui-scoped state: which vm is loaded in the edit form, and which
* vms have an active remote console session.
* Rebuilt from scratch on startup, never persisted, never
* backend-authoritative.
*/

use crate::catalog::{VmRecord, VmState};

use std::collections::HashSet;

// Error Handling
use log::debug;

#[derive(Debug, Default, Clone)]
pub struct SessionState {
    edit_target: Option<String>,
    console_active: HashSet<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // Edit mode /////////////////////////////////////////////////

    pub fn begin_edit(&mut self, smac: &str) {
        self.edit_target = Some(smac.to_owned());
    }
    /// Back to create mode.
    pub fn end_edit(&mut self) {
        self.edit_target = None;
    }
    pub fn editing(&self) -> Option<&str> {
        self.edit_target.as_deref()
    }

    // Console sessions //////////////////////////////////////////

    /// Only called after a successful console start.
    pub fn mark_console_active(&mut self, smac: &str) {
        self.console_active.insert(smac.to_owned());
    }
    pub fn clear_console_active(&mut self, smac: &str) {
        self.console_active.remove(smac);
    }
    pub fn is_console_active(&self, smac: &str) -> bool {
        self.console_active.contains(smac)
    }

    /*
     * Reconcile the console markers against a fresh vm list.
     * A vm observed stopped (or gone) cannot keep a stale "active"
     * marker, whatever path shut it down. Soft consistency: corrected
     * here, at every refresh, not on a timer.
     */
    pub fn sync_with_vms(&mut self, vms: &[VmRecord]) {
        let before = self.console_active.len();
        self.console_active.retain(|smac| {
            vms.iter()
                .any(|vm| &vm.smac == smac && vm.status == VmState::Running)
        });
        if self.console_active.len() != before {
            debug!("Dropped stale console markers on refresh.");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::VmConfig;
    use miette::Result;

    fn vm(smac: &str, status: VmState) -> VmRecord {
        VmRecord {
            smac: smac.to_owned(),
            status,
            config: VmConfig::default(),
        }
    }

    #[test]
    fn console_marker_follows_start_and_stop() -> Result<()> {
        let mut session = SessionState::new();
        session.mark_console_active("vm1");
        assert!(session.is_console_active("vm1"));
        session.clear_console_active("vm1");
        assert!(!session.is_console_active("vm1"));
        Ok(())
    }

    #[test]
    fn stopped_vm_loses_its_marker_on_refresh() -> Result<()> {
        let mut session = SessionState::new();
        session.mark_console_active("vm1");

        // Shut down through some other path, observed at refresh.
        session.sync_with_vms(&[vm("vm1", VmState::Stopped)]);
        assert!(!session.is_console_active("vm1"));
        Ok(())
    }

    #[test]
    fn running_vm_keeps_its_marker() -> Result<()> {
        let mut session = SessionState::new();
        session.mark_console_active("vm1");
        session.sync_with_vms(&[vm("vm1", VmState::Running)]);
        assert!(session.is_console_active("vm1"));
        Ok(())
    }

    #[test]
    fn deleted_vm_loses_its_marker() -> Result<()> {
        let mut session = SessionState::new();
        session.mark_console_active("vm1");
        session.sync_with_vms(&[]);
        assert!(!session.is_console_active("vm1"));
        Ok(())
    }
}
