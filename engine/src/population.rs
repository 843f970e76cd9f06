//! Read-only access to the population database.
//!
//! The database is a JSON document of [`Person`] records, either a bare array
//! or wrapped as `{"people": [...]}`. Records are indexed by normalized name
//! and by numeric id at load time; the store never mutates a record after
//! loading, so lookups hand out shared references.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use probate_types::{Person, PersonId, clean_name};

/// Failure to load or parse the population database.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    #[error("could not read population database at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("population database is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// Accepts both the wrapped and the bare on-disk layout.
#[derive(Deserialize)]
#[serde(untagged)]
enum PopulationFile {
    Wrapped { people: Vec<Person> },
    Bare(Vec<Person>),
}

/// Immutable, indexed view of the population database.
///
/// Name lookups key on [`clean_name`] output so that punctuation and accent
/// differences between will text and database records do not break matching.
/// When two records normalize to the same name, the later record wins.
pub struct PopulationStore {
    people: Vec<Person>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<PersonId, usize>,
}

impl PopulationStore {
    /// Builds a store from already-deserialized records.
    pub fn from_people(people: Vec<Person>) -> Self {
        let mut by_name = HashMap::with_capacity(people.len());
        let mut by_id = HashMap::with_capacity(people.len());
        for (idx, person) in people.iter().enumerate() {
            by_name.insert(clean_name(&person.full_name), idx);
            by_id.insert(person.id, idx);
        }
        Self {
            people,
            by_name,
            by_id,
        }
    }

    /// Parses a population database from JSON text.
    pub fn from_json(json: &str) -> Result<Self, PopulationError> {
        let file: PopulationFile = serde_json::from_str(json)?;
        let people = match file {
            PopulationFile::Wrapped { people } | PopulationFile::Bare(people) => people,
        };
        Ok(Self::from_people(people))
    }

    /// Loads a population database from disk.
    pub fn load(path: &Path) -> Result<Self, PopulationError> {
        let json = fs::read_to_string(path).map_err(|source| PopulationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            people = store.len(),
            "Population database loaded"
        );
        Ok(store)
    }

    /// Looks a person up by display name, tolerant of punctuation and accents.
    pub fn find_by_name(&self, name: &str) -> Option<&Person> {
        self.by_name
            .get(&clean_name(name))
            .map(|&idx| &self.people[idx])
    }

    /// Looks a person up by database id.
    pub fn find_by_id(&self, id: PersonId) -> Option<&Person> {
        self.by_id.get(&id).map(|&idx| &self.people[idx])
    }

    /// Returns the children of `person` that exist in the database, in the
    /// order their ids appear on the record. Dangling child ids are skipped.
    pub fn children_of(&self, person: &Person) -> Vec<&Person> {
        person
            .children_ids
            .iter()
            .filter_map(|id| self.find_by_id(*id))
            .collect()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}
