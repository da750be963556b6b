//! Flat-file persistence for the persona roster.
//!
//! Every document is a whole file, rewritten in full through a temporary
//! sibling and an atomic rename:
//!
//! ```text
//! <root>/
//!   residents/npc001/{profile.yaml, state.json, memory.json}
//!   relationships/{groups.yaml, pairs.yaml, watchers.yaml}
//!   relationships/affinity/npc001.json
//!   queue/{pending,approved,rejected,posted,dry_run}.json
//!   tick_state.json
//! ```
//!
//! Mutable documents that are missing or unreadable load as defaults with a
//! warning; a bad read never aborts a tick. Profiles are the exception: a
//! persona whose profile cannot be loaded is skipped by the caller.
//!
//! There is no locking. Each document has one logical owner and the last
//! writer wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{NpczError, Result};
use crate::memory::PersonaMemory;
use crate::persona::{PersonaProfile, PersonaState};
use crate::queue::QueueStore;
use crate::relationship::graph::{Group, Pair, Watcher};
use crate::relationship::{AffinityRecord, RelationshipGraph};
use crate::tick::TickState;
use crate::types::PersonaId;

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> NpczError + '_ {
    move |source| NpczError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `bytes` to `path` via a temporary sibling and rename.
///
/// # Errors
/// Returns [`NpczError::Persistence`] if the directory or file cannot be written.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(io_err(path))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

/// Read and parse a document. Missing files give `Ok(None)`.
fn read_document<T, F>(path: &Path, parse: F) -> Result<Option<T>>
where
    F: FnOnce(&str) -> Result<T>,
{
    match fs::read_to_string(path) {
        Ok(text) => parse(&text).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(NpczError::Persistence {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a JSON document, treating absence or corruption as `None`.
pub(crate) fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match read_document(path, |text| Ok(serde_json::from_str::<T>(text)?)) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable document, using default");
            None
        }
    }
}

fn read_yaml_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match read_document(path, |text| Ok(serde_yaml::from_str::<T>(text)?)) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable document, using default");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Relationship document wrappers
// ---------------------------------------------------------------------------

#[derive(Default, Serialize, Deserialize)]
struct GroupsDocument {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Default, Serialize, Deserialize)]
struct PairsDocument {
    #[serde(default)]
    pairs: Vec<Pair>,
}

#[derive(Default, Serialize, Deserialize)]
struct WatchersDocument {
    #[serde(default)]
    watchers: Vec<Watcher>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle on a roster directory tree.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open (or lay out) a roster directory.
    ///
    /// # Errors
    /// Returns [`NpczError::Persistence`] if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for dir in [store.residents_dir(), store.affinity_dir(), store.queue_dir()] {
            fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        }
        debug!(root = %store.root.display(), "Opened roster store");
        Ok(store)
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn residents_dir(&self) -> PathBuf {
        self.root.join("residents")
    }

    fn resident_dir(&self, id: PersonaId) -> PathBuf {
        self.residents_dir().join(id.to_string())
    }

    fn relationships_dir(&self) -> PathBuf {
        self.root.join("relationships")
    }

    fn affinity_dir(&self) -> PathBuf {
        self.relationships_dir().join("affinity")
    }

    fn queue_dir(&self) -> PathBuf {
        self.root.join("queue")
    }

    fn tick_state_path(&self) -> PathBuf {
        self.root.join("tick_state.json")
    }

    /// Queue partitions under this root.
    #[must_use]
    pub fn queue(&self) -> QueueStore {
        QueueStore::new(self.queue_dir())
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Every resident directory whose name is a valid persona id, ascending.
    ///
    /// # Errors
    /// Returns [`NpczError::Persistence`] if the residents directory cannot be listed.
    pub fn list_residents(&self) -> Result<Vec<PersonaId>> {
        let dir = self.residents_dir();
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let entry = entry.map_err(io_err(&dir))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match name.parse::<PersonaId>() {
                Ok(id) if entry.path().is_dir() => ids.push(id),
                Ok(_) => {}
                Err(_) => debug!(name, "Skipping non-resident directory entry"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Load and validate a profile.
    ///
    /// # Errors
    /// Returns [`NpczError::InvalidProfile`] if the document is missing or invalid.
    pub fn load_profile(&self, id: PersonaId) -> Result<PersonaProfile> {
        let path = self.resident_dir(id).join("profile.yaml");
        let text = fs::read_to_string(&path).map_err(|e| NpczError::InvalidProfile {
            persona: id.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        let profile = PersonaProfile::from_yaml(&text).map_err(|e| match e {
            NpczError::InvalidProfile { reason, .. } => NpczError::InvalidProfile {
                persona: id.to_string(),
                reason,
            },
            other => other,
        })?;
        if profile.id != id {
            return Err(NpczError::InvalidProfile {
                persona: id.to_string(),
                reason: format!("profile declares id {}", profile.id),
            });
        }
        Ok(profile)
    }

    /// Write a profile.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_profile(&self, profile: &PersonaProfile) -> Result<()> {
        let yaml = serde_yaml::to_string(profile)?;
        write_atomic(&self.resident_dir(profile.id).join("profile.yaml"), yaml.as_bytes())
    }

    /// Load runtime state, or a fresh one.
    #[must_use]
    pub fn load_state(&self, id: PersonaId) -> PersonaState {
        let path = self.resident_dir(id).join("state.json");
        let mut state = read_json_lenient::<PersonaState>(&path).unwrap_or_else(|| PersonaState::new(id));
        state.normalize();
        state
    }

    /// Write runtime state.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_state(&self, state: &PersonaState) -> Result<()> {
        write_json(&self.resident_dir(state.id).join("state.json"), state)
    }

    /// Load memory, or memory seeded from the profile.
    #[must_use]
    pub fn load_memory(&self, profile: &PersonaProfile) -> PersonaMemory {
        let start = Instant::now();
        let path = self.resident_dir(profile.id).join("memory.json");
        let mut memory =
            read_json_lenient::<PersonaMemory>(&path).unwrap_or_else(|| PersonaMemory::seeded(profile));
        memory.normalize();
        debug!(
            persona = %profile.id,
            short_term = memory.short_term.len(),
            long_term = memory.long_term.acquired.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded memory"
        );
        memory
    }

    /// Write memory.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_memory(&self, memory: &PersonaMemory) -> Result<()> {
        write_json(&self.resident_dir(memory.id).join("memory.json"), memory)
    }

    // ------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------

    /// Load affinity, or an empty record.
    #[must_use]
    pub fn load_affinity(&self, id: PersonaId) -> AffinityRecord {
        let path = self.affinity_dir().join(format!("{id}.json"));
        let mut record = read_json_lenient::<AffinityRecord>(&path).unwrap_or_else(|| AffinityRecord::new(id));
        record.normalize();
        record
    }

    /// Write affinity.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_affinity(&self, record: &AffinityRecord) -> Result<()> {
        write_json(&self.affinity_dir().join(format!("{}.json", record.id)), record)
    }

    /// Load the relationship graph. Missing documents contribute nothing.
    ///
    /// # Errors
    /// Returns [`NpczError::Config`] if the combined graph fails validation.
    pub fn load_graph(&self) -> Result<RelationshipGraph> {
        let dir = self.relationships_dir();
        let groups = read_yaml_lenient::<GroupsDocument>(&dir.join("groups.yaml")).unwrap_or_default();
        let pairs = read_yaml_lenient::<PairsDocument>(&dir.join("pairs.yaml")).unwrap_or_default();
        let watchers = read_yaml_lenient::<WatchersDocument>(&dir.join("watchers.yaml")).unwrap_or_default();
        let graph = RelationshipGraph {
            groups: groups.groups,
            pairs: pairs.pairs,
            watchers: watchers.watchers,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Write the relationship graph as three documents.
    ///
    /// # Errors
    /// Returns an error if serialization or a write fails.
    pub fn save_graph(&self, graph: &RelationshipGraph) -> Result<()> {
        let dir = self.relationships_dir();
        let groups = serde_yaml::to_string(&GroupsDocument { groups: graph.groups.clone() })?;
        let pairs = serde_yaml::to_string(&PairsDocument { pairs: graph.pairs.clone() })?;
        let watchers = serde_yaml::to_string(&WatchersDocument { watchers: graph.watchers.clone() })?;
        write_atomic(&dir.join("groups.yaml"), groups.as_bytes())?;
        write_atomic(&dir.join("pairs.yaml"), pairs.as_bytes())?;
        write_atomic(&dir.join("watchers.yaml"), watchers.as_bytes())
    }

    // ------------------------------------------------------------------
    // Tick cursor
    // ------------------------------------------------------------------

    /// Load the tick cursor, or a fresh one.
    #[must_use]
    pub fn load_tick_state(&self) -> TickState {
        read_json_lenient(&self.tick_state_path()).unwrap_or_default()
    }

    /// Write the tick cursor.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_tick_state(&self, state: &TickState) -> Result<()> {
        write_json(&self.tick_state_path(), state)
    }
}
