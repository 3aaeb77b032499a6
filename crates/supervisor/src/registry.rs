// SPDX-License-Identifier: MIT

//! Registry file: the supervisor's on-disk record of every agent it knows
//! about, so a fresh `oa` CLI invocation can discover agents started by an
//! earlier supervisor process (spec §6, SPEC_FULL §10.4).
//!
//! Reads and writes take an advisory `fs2` lock on the file for the
//! duration of the operation, so two CLI processes racing a `start`/`stop`
//! against the same registry never interleave a read with another's write.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use oa_core::record::AgentProcessRecord;

use crate::config::SupervisorError;

/// On-disk, lock-guarded map of agent name to its current process record.
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn at_default_path() -> Self {
        Self::new(oa_core::paths::registry_path())
    }

    fn open_for_write(&self) -> Result<File, SupervisorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().read(true).write(true).create(true).open(&self.path)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read_locked(file: &mut File) -> Result<HashMap<String, AgentProcessRecord>, SupervisorError> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read the full registry under a shared lock.
    pub fn load(&self) -> Result<HashMap<String, AgentProcessRecord>, SupervisorError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let mut file = File::open(&self.path)?;
        file.lock_shared()?;
        let result = Self::read_locked(&mut file);
        FileExt::unlock(&file)?;
        result
    }

    /// Apply `mutate` to the registry under an exclusive lock and persist
    /// the result atomically (truncate + rewrite while still holding the
    /// lock, so no other process observes a half-written file).
    pub fn mutate<F>(&self, mutate: F) -> Result<(), SupervisorError>
    where
        F: FnOnce(&mut HashMap<String, AgentProcessRecord>) -> Result<(), SupervisorError>,
    {
        let mut file = self.open_for_write()?;
        let mut records = Self::read_locked(&mut file)?;
        mutate(&mut records)?;

        let serialized = serde_json::to_string_pretty(&records)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        FileExt::unlock(&file)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oa_core::descriptor::AgentDescriptor;
    use oa_core::name::AgentName;

    fn record(name: &str) -> AgentProcessRecord {
        AgentProcessRecord::new(
            AgentDescriptor::new(AgentName::new(name).unwrap(), 9001, "mock", "mock-1", "role"),
            format!("/tmp/agent-{name}.sock"),
        )
    }

    #[test]
    fn load_on_missing_file_returns_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("registry.json"));
        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn mutate_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("registry.json"));

        registry
            .mutate(|records| {
                records.insert("alice".into(), record("alice"));
                Ok(())
            })
            .unwrap();

        let loaded = registry.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("alice"));
    }

    #[test]
    fn mutate_can_remove_entries() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("registry.json"));
        registry
            .mutate(|records| {
                records.insert("alice".into(), record("alice"));
                Ok(())
            })
            .unwrap();
        registry
            .mutate(|records| {
                records.remove("alice");
                Ok(())
            })
            .unwrap();
        assert!(registry.load().unwrap().is_empty());
    }
}
