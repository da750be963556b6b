//! The set of residents loaded for a run.

use std::collections::BTreeMap;

use npcz_core::{PersonaId, PersonaProfile, Store};
use tracing::{info, warn};

use crate::error::Result;

/// Every resident whose profile loaded, in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    profiles: BTreeMap<PersonaId, PersonaProfile>,
}

impl Roster {
    /// Load every resident under the store.
    ///
    /// A resident whose profile is missing or invalid is skipped with a
    /// warning; the rest of the roster still loads.
    ///
    /// # Errors
    /// Returns an error only if the residents directory cannot be listed.
    pub fn load(store: &Store) -> Result<Self> {
        let mut profiles = BTreeMap::new();
        let ids = store.list_residents()?;
        let listed = ids.len();
        for id in ids {
            match store.load_profile(id) {
                Ok(profile) => {
                    profiles.insert(id, profile);
                }
                Err(e) => warn!(persona = %id, error = %e, "Skipping resident with invalid profile"),
            }
        }
        info!(loaded = profiles.len(), listed, "Roster loaded");
        Ok(Self { profiles })
    }

    /// Roster from already-validated profiles.
    #[must_use]
    pub fn from_profiles(profiles: impl IntoIterator<Item = PersonaProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Sorted resident ids.
    #[must_use]
    pub fn ids(&self) -> Vec<PersonaId> {
        self.profiles.keys().copied().collect()
    }

    /// Profile of `id`.
    #[must_use]
    pub fn get(&self, id: PersonaId) -> Option<&PersonaProfile> {
        self.profiles.get(&id)
    }

    /// Whether `id` is a resident.
    #[must_use]
    pub fn contains(&self, id: PersonaId) -> bool {
        self.profiles.contains_key(&id)
    }

    /// Number of residents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Display name of `id`, or its canonical id when unknown.
    #[must_use]
    pub fn display_name(&self, id: PersonaId) -> String {
        self.get(id).map_or_else(|| id.to_string(), |p| p.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_profile(root: &std::path::Path, id: &str, body: &str) {
        let dir = root.join("residents").join(id);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("profile.yaml"), body).expect("write");
    }

    #[test]
    fn invalid_profiles_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path()).expect("open");
        write_profile(
            dir.path(),
            "npc001",
            "id: npc001\nname: Aki\nbehavior:\n  post_frequency: 3\n  active_hours: [9]\n",
        );
        write_profile(dir.path(), "npc002", "id: npc002\nname: ''\n");
        write_profile(dir.path(), "npc003", ": not yaml [");

        let roster = Roster::load(&store).expect("load");
        assert_eq!(roster.ids(), vec![PersonaId(1)]);
        assert_eq!(roster.display_name(PersonaId(1)), "Aki");
        assert_eq!(roster.display_name(PersonaId(9)), "npc009");
    }
}
