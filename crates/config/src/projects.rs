// Named projects and the last-active autosave slot on top of a KeyValueStore
//
// Layout (compatible with the browser build's local storage):
//   ide_project_<name>  -> {"html","css","js","savedAt"}
//   ide_last_project    -> {"html","css","js"}

use chrono::{DateTime, Utc};

use playground_core::{validate_project_name, Project, ProjectError, ProjectRecord, SourceTriple};

use crate::storage::{KeyValueStore, StoreError};

pub const PROJECT_KEY_PREFIX: &str = "ide_project_";
pub const LAST_PROJECT_KEY: &str = "ide_last_project";

fn project_key(name: &str) -> String {
    format!("{}{}", PROJECT_KEY_PREFIX, name)
}

impl From<StoreError> for ProjectError {
    fn from(e: StoreError) -> Self {
        ProjectError::Storage(e.to_string())
    }
}

/// Project persistence plus the cached list of saved names.
///
/// The name list is rebuilt from the store on open and kept in step with
/// `save`/`delete`, so listing never touches the backing store.
pub struct ProjectStore<K: KeyValueStore> {
    store: K,
    names: Vec<String>,
}

impl<K: KeyValueStore> ProjectStore<K> {
    pub fn new(store: K) -> Self {
        let mut projects = Self {
            store,
            names: Vec::new(),
        };
        projects.refresh_names();
        projects
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Re-read saved names from the backing store.
    pub fn refresh_names(&mut self) {
        self.names = self
            .store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(PROJECT_KEY_PREFIX).map(str::to_string))
            .filter(|name| !name.is_empty())
            .collect();
        self.names.sort();
    }

    /// Saved project names, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name.trim())
    }

    /// Save `triple` under `name`, overwriting any existing project.
    pub fn save(&mut self, name: &str, triple: &SourceTriple) -> Result<Project, ProjectError> {
        self.save_at(name, triple, Utc::now())
    }

    pub fn save_at(&mut self, name: &str, triple: &SourceTriple, at: DateTime<Utc>) -> Result<Project, ProjectError> {
        let name = validate_project_name(name)?;
        let record = ProjectRecord::new(triple.clone(), at);
        let json = serde_json::to_string(&record).map_err(|e| ProjectError::Storage(e.to_string()))?;
        self.store.set(&project_key(name), json)?;
        if let Err(pos) = self.names.binary_search_by(|n| n.as_str().cmp(name)) {
            self.names.insert(pos, name.to_string());
        }
        log::info!("Saved project '{}'", name);
        Ok(record.into_project(name))
    }

    /// Load a saved project.
    ///
    /// A stored value that does not parse yields an empty triple rather
    /// than an error, so a damaged entry can still be opened and resaved.
    pub fn load(&self, name: &str) -> Result<Project, ProjectError> {
        let name = validate_project_name(name)?;
        let raw = self
            .store
            .get(&project_key(name))
            .ok_or_else(|| ProjectError::NotFound(name.to_string()))?;
        match serde_json::from_str::<ProjectRecord>(&raw) {
            Ok(record) => Ok(record.into_project(name)),
            Err(e) => {
                log::warn!("Project '{}' is malformed ({}); loading empty sources", name, e);
                Ok(Project {
                    name: name.to_string(),
                    triple: SourceTriple::default(),
                    saved_at: None,
                })
            }
        }
    }

    pub fn delete(&mut self, name: &str) -> Result<(), ProjectError> {
        let name = validate_project_name(name)?;
        let key = project_key(name);
        if self.store.get(&key).is_none() {
            return Err(ProjectError::NotFound(name.to_string()));
        }
        self.store.remove(&key)?;
        self.names.retain(|n| n != name);
        log::info!("Deleted project '{}'", name);
        Ok(())
    }

    /// The autosaved working triple, if present and readable.
    pub fn restore_last_active(&self) -> Option<SourceTriple> {
        let raw = self.store.get(LAST_PROJECT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(triple) => Some(triple),
            Err(e) => {
                log::warn!("Ignoring malformed {}: {}", LAST_PROJECT_KEY, e);
                None
            }
        }
    }

    pub fn write_last_active(&mut self, triple: &SourceTriple) -> Result<(), ProjectError> {
        let json = serde_json::to_string(triple).map_err(|e| ProjectError::Storage(e.to_string()))?;
        self.store.set(LAST_PROJECT_KEY, json)?;
        log::debug!("Autosaved working sources");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use chrono::TimeZone;

    fn triple(tag: &str) -> SourceTriple {
        SourceTriple::new(format!("<p>{tag}</p>"), "p{color:red}", format!("console.log('{tag}')"))
    }

    #[test]
    fn test_save_then_load() {
        let mut projects = ProjectStore::new(MemoryStore::new());
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let saved = projects.save_at("  demo ", &triple("a"), at).unwrap();
        assert_eq!(saved.name, "demo");

        let loaded = projects.load("demo").unwrap();
        assert_eq!(loaded.triple, triple("a"));
        assert_eq!(loaded.saved_at, Some(at));
        assert_eq!(projects.names(), &["demo".to_string()]);

        let raw = projects.store().get("ide_project_demo").unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["savedAt"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut projects = ProjectStore::new(MemoryStore::new());
        assert_eq!(projects.save("   ", &triple("a")).unwrap_err(), ProjectError::BlankName);
        assert!(projects.names().is_empty());
        assert!(projects.store().keys().is_empty());
    }

    #[test]
    fn test_save_overwrites_existing() {
        let mut projects = ProjectStore::new(MemoryStore::new());
        projects.save("demo", &triple("a")).unwrap();
        projects.save("demo", &triple("b")).unwrap();
        assert_eq!(projects.names().len(), 1);
        assert_eq!(projects.load("demo").unwrap().triple, triple("b"));
    }

    #[test]
    fn test_missing_and_malformed_projects() {
        let mut store = MemoryStore::new();
        store.set("ide_project_broken", "{{nope".to_string()).unwrap();
        let projects = ProjectStore::new(store);

        assert_eq!(projects.load("ghost").unwrap_err(), ProjectError::NotFound("ghost".into()));
        let broken = projects.load("broken").unwrap();
        assert!(broken.triple.is_empty());
        assert_eq!(projects.names(), &["broken".to_string()]);
    }

    #[test]
    fn test_delete_updates_names() {
        let mut projects = ProjectStore::new(MemoryStore::new());
        projects.save("b", &triple("b")).unwrap();
        projects.save("a", &triple("a")).unwrap();
        assert_eq!(projects.names(), &["a".to_string(), "b".to_string()]);

        projects.delete("a").unwrap();
        assert_eq!(projects.names(), &["b".to_string()]);
        assert_eq!(projects.delete("a").unwrap_err(), ProjectError::NotFound("a".into()));
    }

    #[test]
    fn test_last_active_slot() {
        let mut projects = ProjectStore::new(MemoryStore::new());
        assert_eq!(projects.restore_last_active(), None);

        projects.write_last_active(&triple("x")).unwrap();
        assert_eq!(projects.restore_last_active(), Some(triple("x")));
        // The slot is not a named project.
        assert!(projects.names().is_empty());

        let mut store = MemoryStore::new();
        store.set(LAST_PROJECT_KEY, "not json".to_string()).unwrap();
        assert_eq!(ProjectStore::new(store).restore_last_active(), None);
    }

    #[test]
    fn test_projects_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        {
            let mut projects = ProjectStore::new(FileStore::open(&path));
            projects.save("kept", &triple("k")).unwrap();
            projects.write_last_active(&triple("w")).unwrap();
        }
        let projects = ProjectStore::new(FileStore::open(&path));
        assert_eq!(projects.names(), &["kept".to_string()]);
        assert_eq!(projects.load("kept").unwrap().triple, triple("k"));
        assert_eq!(projects.restore_last_active(), Some(triple("w")));
    }
}
