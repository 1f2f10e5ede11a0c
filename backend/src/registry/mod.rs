//! Config Registry - saved mapping configurations on disk.
//!
//! One pretty-printed JSON file per configuration (`{id}.json`). Files that
//! fail to parse are skipped on load with a warning, so one corrupt file never
//! hides the rest.
//!
//! A file is only loaded when its name matches the id it contains, so every
//! loaded entry can be deleted again.
//!
//! Saving goes through the required-field gate: an incomplete set is refused
//! with [`RegistryError::Blocked`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_scoped, LogLevel};
use crate::config::DEFAULT_REGISTRY_DIR;
use crate::error::{RegistryError, RegistryResult};
use crate::models::{Direction, FieldDefinition, MappingSet};
use crate::validation::ensure_saveable;

const SCOPE: &str = "registry";

/// A saved configuration with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    pub id: String,
    pub config: MappingSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry of saved mapping configurations
#[derive(Debug)]
pub struct ConfigRegistry {
    registry_dir: PathBuf,
    configs: HashMap<String, StoredConfig>,
}

impl ConfigRegistry {
    /// Registry in the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_REGISTRY_DIR)
    }

    /// Registry in a custom directory, loading whatever is already there
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: dir.as_ref().to_path_buf(),
            configs: HashMap::new(),
        };
        registry.load_all();
        registry
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.registry_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(RegistryError::from)
                .and_then(|content| Ok(serde_json::from_str::<StoredConfig>(&content)?));
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            match parsed {
                Ok(stored) if stored.id != stem => log_scoped(
                    LogLevel::Warning,
                    SCOPE,
                    format!("Skipped {}: id '{}' does not match the file name", path.display(), stored.id),
                ),
                Ok(stored) => {
                    self.configs.insert(stored.id.clone(), stored);
                }
                Err(e) => log_scoped(
                    LogLevel::Warning,
                    SCOPE,
                    format!("Skipped {}: {}", path.display(), e),
                ),
            }
        }
    }

    /// All configurations, most recently updated first
    pub fn list(&self) -> Vec<&StoredConfig> {
        let mut configs: Vec<&StoredConfig> = self.configs.values().collect();
        configs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        configs
    }

    pub fn get(&self, id: &str) -> RegistryResult<&StoredConfig> {
        self.configs
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Latest configuration for a (direction, entity, endpoint) scope.
    ///
    /// Entity comparison ignores case.
    pub fn find(&self, direction: Direction, entity: &str, endpoint_id: Option<&str>) -> Option<&StoredConfig> {
        self.list().into_iter().find(|s| {
            s.config.direction == direction
                && s.config.entity.eq_ignore_ascii_case(entity)
                && s.config.endpoint_id.as_deref() == endpoint_id
        })
    }

    /// Persist a new configuration. Returns its id.
    pub fn save(&mut self, set: MappingSet, fields: &[FieldDefinition]) -> RegistryResult<String> {
        ensure_saveable(&set, fields)?;

        let id = generate_id(&set);
        let now = Utc::now();
        let stored = StoredConfig {
            id: id.clone(),
            config: set,
            created_at: now,
            updated_at: now,
        };
        self.write(&stored)?;
        log_scoped(
            LogLevel::Success,
            SCOPE,
            format!("Saved {} ({} mappings)", id, stored.config.mappings.len()),
        );
        self.configs.insert(id.clone(), stored);
        Ok(id)
    }

    /// Replace the set stored under `id`.
    pub fn update(&mut self, id: &str, set: MappingSet, fields: &[FieldDefinition]) -> RegistryResult<&StoredConfig> {
        ensure_saveable(&set, fields)?;

        let mut stored = self.get(id)?.clone();
        stored.config = set;
        stored.updated_at = Utc::now();
        self.write(&stored)?;
        log_scoped(LogLevel::Success, SCOPE, format!("Updated {}", id));

        self.configs.insert(id.to_string(), stored);
        self.get(id)
    }

    /// Remove the file, then the entry. A failed removal keeps the entry.
    pub fn delete(&mut self, id: &str) -> RegistryResult<()> {
        if !self.configs.contains_key(id) {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.configs.remove(id);
        log_scoped(LogLevel::Info, SCOPE, format!("Deleted {}", id));
        Ok(())
    }

    /// Delimited text of a saved configuration
    pub fn export_text(&self, id: &str) -> RegistryResult<String> {
        Ok(self.get(id)?.config.export_to_delimited())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.registry_dir.join(format!("{}.json", id))
    }

    fn write(&self, stored: &StoredConfig) -> RegistryResult<()> {
        fs::create_dir_all(&self.registry_dir)?;
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.id), content)?;
        Ok(())
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `{slug}-{8 hex}` where the slug comes from the name, or the scope when unnamed
fn generate_id(set: &MappingSet) -> String {
    let base = if set.name.trim().is_empty() {
        format!("{}-{}", set.direction, set.entity)
    } else {
        set.name.clone()
    };

    let slug: String = base
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", slug, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::error::ValidationError;
    use tempfile::tempdir;

    fn asset_fields() -> Vec<FieldDefinition> {
        FieldCatalog::builtin().get_fields("Asset").unwrap().to_vec()
    }

    fn complete_asset_set(endpoint: Option<&str>) -> MappingSet {
        let mut set = MappingSet::create(Direction::Import, "Asset", endpoint).with_name("Asset feed");
        for f in asset_fields().iter().filter(|f| f.required) {
            set.add_or_replace(&f.name.to_uppercase(), &f.name, f.data_type.as_str())
                .unwrap();
        }
        set
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let id = {
            let mut registry = ConfigRegistry::with_dir(dir.path());
            registry.save(complete_asset_set(None), &asset_fields()).unwrap()
        };
        assert!(id.starts_with("asset-feed-"));

        let registry = ConfigRegistry::with_dir(dir.path());
        let stored = registry.get(&id).unwrap();
        assert_eq!(stored.config, complete_asset_set(None));
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[test]
    fn test_incomplete_set_is_blocked() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let set = MappingSet::create(Direction::Import, "Asset", None);

        let err = registry.save(set, &asset_fields()).unwrap_err();
        match err {
            RegistryError::Blocked(ValidationError::MissingRequired { labels }) => {
                assert_eq!(labels, vec!["Asset Tag", "Description", "Category"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.list().is_empty());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_find_by_scope() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let a = registry.save(complete_asset_set(Some("ep-1")), &asset_fields()).unwrap();
        registry.save(complete_asset_set(Some("ep-2")), &asset_fields()).unwrap();

        let found = registry.find(Direction::Import, "asset", Some("ep-1")).unwrap();
        assert_eq!(found.id, a);
        assert!(registry.find(Direction::Export, "Asset", Some("ep-1")).is_none());
        assert!(registry.find(Direction::Import, "Asset", None).is_none());
    }

    #[test]
    fn test_update_and_delete() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let id = registry.save(complete_asset_set(None), &asset_fields()).unwrap();

        let mut changed = complete_asset_set(None);
        changed.add_or_replace("LOC", "location", "string").unwrap();
        let stored = registry.update(&id, changed, &asset_fields()).unwrap();
        assert!(stored.config.is_mapped("location"));
        assert!(stored.updated_at >= stored.created_at);

        registry.delete(&id).unwrap();
        assert!(matches!(registry.get(&id), Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.delete(&id), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_update_unknown_id() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let err = registry
            .update("nope", complete_asset_set(None), &asset_fields())
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_corrupt_files_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = ConfigRegistry::with_dir(dir.path());
        registry.save(complete_asset_set(None), &asset_fields()).unwrap();

        let reloaded = ConfigRegistry::with_dir(dir.path());
        assert_eq!(reloaded.list().len(), 1);
    }

    #[test]
    fn test_renamed_file_skipped() {
        let dir = tempdir().unwrap();
        let id = ConfigRegistry::with_dir(dir.path())
            .save(complete_asset_set(None), &asset_fields())
            .unwrap();
        fs::rename(dir.path().join(format!("{}.json", id)), dir.path().join("renamed.json")).unwrap();

        let registry = ConfigRegistry::with_dir(dir.path());
        assert!(registry.list().is_empty());
        assert!(matches!(registry.get(&id), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_failed_delete_keeps_entry() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let id = registry.save(complete_asset_set(None), &asset_fields()).unwrap();

        let path = dir.path().join(format!("{}.json", id));
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(registry.delete(&id), Err(RegistryError::IoError(_))));
        assert!(registry.get(&id).is_ok());
    }

    #[test]
    fn test_delete_with_file_already_gone() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let id = registry.save(complete_asset_set(None), &asset_fields()).unwrap();
        fs::remove_file(dir.path().join(format!("{}.json", id))).unwrap();

        registry.delete(&id).unwrap();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_export_text() {
        let dir = tempdir().unwrap();
        let mut registry = ConfigRegistry::with_dir(dir.path());
        let id = registry.save(complete_asset_set(None), &asset_fields()).unwrap();
        let text = registry.export_text(&id).unwrap();
        assert!(text.starts_with(crate::mapping::HEADER));
        assert!(text.contains("ASSETTAG,assetTag,string,direct"));
    }

    #[test]
    fn test_unnamed_id_uses_scope() {
        let set = MappingSet::create(Direction::Export, "BEO", None);
        assert!(generate_id(&set).starts_with("export-beo-"));
    }
}
