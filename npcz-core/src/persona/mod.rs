//! Persona documents: the YAML profile and the JSON runtime state.

pub mod profile;
pub mod state;

pub use profile::PersonaProfile;
pub use state::{PersonaState, PostRecord};
