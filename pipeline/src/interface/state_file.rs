use std::path::Path;

use ship_defs::{DeployError, PipelineRecord, StateStore};
use ship_utils::{config_path::get_state_path, get_timestamp};

/// Stores the record as JSON under `<workdir>/.callship/state.json`.
#[derive(Default)]
pub struct FileStateStore;

impl StateStore for FileStateStore {
    fn load(&self, workdir: &Path) -> Result<Option<PipelineRecord>, DeployError> {
        let path = get_state_path(workdir);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| DeployError::State(format!("{}: {}", path.display(), e)))?;
        let record = serde_json::from_str(&content)
            .map_err(|e| DeployError::State(format!("{}: {}", path.display(), e)))?;
        Ok(Some(record))
    }

    fn save(&self, record: &PipelineRecord) -> Result<(), DeployError> {
        let path = get_state_path(&record.target.workdir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DeployError::State(format!("{}: {}", parent.display(), e)))?;
        }
        let mut record = record.clone();
        record.updated_at = get_timestamp();
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| DeployError::State(e.to_string()))?;

        // Atomic replace.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| DeployError::State(format!("{}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| DeployError::State(format!("{}: {}", path.display(), e)))?;
        log::debug!("Saved pipeline state {} to {}", record.state, path.display());
        Ok(())
    }
}
