//! In-process person store with hash indexes for the uniqueness checks.
//!
//! All state sits behind one `RwLock`; a mutation, including both halves of
//! a sibling link, is applied inside a single write guard so readers never
//! observe an asymmetric relation. The whole registry can be written to and
//! restored from a JSON snapshot.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use kin_core::{KinError, NewPerson, Person, PersonId, PersonUpdate, Result};

use crate::store::{reconcile_relations, PersonStore};
use crate::validation::{self, Probe};

/// Serialized form of a memory registry, people in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub people: Vec<Person>,
}

#[derive(Debug, Default)]
struct Registry {
    people: HashMap<PersonId, Person>,
    /// Registration order.
    order: Vec<PersonId>,
    by_username: HashMap<String, PersonId>,
    /// Keyed by lower-cased email.
    by_email: HashMap<String, PersonId>,
}

impl Registry {
    fn person(&self, id: &PersonId) -> Result<&Person> {
        self.people.get(id).ok_or(KinError::not_found(*id))
    }

    fn missing(&self, ids: impl IntoIterator<Item = PersonId>) -> Vec<PersonId> {
        let mut missing: Vec<PersonId> = Vec::new();
        for id in ids {
            if !self.people.contains_key(&id) && !missing.contains(&id) {
                missing.push(id);
            }
        }
        missing
    }

    /// Insert a validated record and link the reverse side of its siblings.
    fn insert(&mut self, person: Person) {
        let id = person.id;
        self.by_username.insert(person.username.clone(), id);
        self.by_email.insert(email_key(&person.email), id);
        for sibling in &person.siblings {
            if let Some(other) = self.people.get_mut(sibling) {
                if !other.siblings.contains(&id) {
                    other.siblings.push(id);
                }
            }
        }
        self.order.push(id);
        self.people.insert(id, person);
    }

    /// Replace `id`'s siblings, mirroring every addition and removal on the
    /// other side.
    fn set_siblings(&mut self, id: PersonId, desired: &[PersonId]) {
        let current = self
            .people
            .get(&id)
            .map(|p| p.siblings.clone())
            .unwrap_or_default();
        let merged = reconcile_relations(&current, desired);

        for dropped in current.iter().filter(|s| !merged.contains(s)) {
            if let Some(other) = self.people.get_mut(dropped) {
                other.siblings.retain(|s| *s != id);
            }
        }
        for added in merged.iter().filter(|s| !current.contains(s)) {
            if let Some(other) = self.people.get_mut(added) {
                if !other.siblings.contains(&id) {
                    other.siblings.push(id);
                }
            }
        }
        if let Some(person) = self.people.get_mut(&id) {
            person.siblings = merged;
        }
    }

    fn remove(&mut self, id: &PersonId) -> Option<Person> {
        let person = self.people.remove(id)?;
        self.order.retain(|p| p != id);
        self.by_username.remove(&person.username);
        self.by_email.remove(&email_key(&person.email));
        for other in self.people.values_mut() {
            other.siblings.retain(|s| s != id);
            other.parents.retain(|p| p != id);
        }
        Some(person)
    }

    fn people_in_order(&self) -> impl Iterator<Item = &Person> {
        self.order.iter().filter_map(|id| self.people.get(id))
    }
}

/// Person store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Registry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot, rejecting data that breaks the
    /// registry invariants.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut registry = Registry::default();
        for person in &snapshot.people {
            if registry.people.contains_key(&person.id) {
                return Err(corrupt(format!("duplicate person id {}", person.id)));
            }
            if registry.by_username.contains_key(&person.username) {
                return Err(corrupt(format!("duplicate username {}", person.username)));
            }
            if registry.by_email.contains_key(&email_key(&person.email)) {
                return Err(corrupt(format!("duplicate email {}", person.email)));
            }
            registry.people.insert(person.id, person.clone());
            registry.order.push(person.id);
            registry
                .by_username
                .insert(person.username.clone(), person.id);
            registry.by_email.insert(email_key(&person.email), person.id);
        }

        for person in registry.people.values() {
            if person.parents.contains(&person.id) || person.siblings.contains(&person.id) {
                return Err(corrupt(format!("{} is related to themselves", person.id)));
            }
            if let Some(unknown) = registry
                .missing(person.siblings.iter().chain(&person.parents).copied())
                .first()
            {
                return Err(corrupt(format!(
                    "{} references unknown person {unknown}",
                    person.id
                )));
            }
            for sibling in &person.siblings {
                let mirrored = registry
                    .people
                    .get(sibling)
                    .is_some_and(|s| s.siblings.contains(&person.id));
                if !mirrored {
                    return Err(corrupt(format!(
                        "sibling link {} -> {sibling} is not symmetric",
                        person.id
                    )));
                }
            }
        }

        Ok(Self {
            inner: RwLock::new(registry),
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        let registry = self.inner.read().await;
        Snapshot {
            people: registry.people_in_order().cloned().collect(),
        }
    }

    /// Load a store from a JSON snapshot file; a missing file is an empty
    /// registry.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No registry file, starting empty");
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            people = snapshot.people.len(),
            "Registry loaded"
        );
        Self::from_snapshot(snapshot)
    }

    /// Write the registry to `path`, replacing it only once fully written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot().await)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, path)?;
        tracing::debug!(path = %path.display(), "Registry saved");
        Ok(())
    }
}

#[async_trait]
impl PersonStore for MemoryStore {
    async fn get(&self, id: &PersonId) -> Result<Person> {
        self.inner.read().await.person(id).cloned()
    }

    async fn list(&self) -> Result<Vec<Person>> {
        Ok(self.inner.read().await.people_in_order().cloned().collect())
    }

    async fn create(&self, new: NewPerson) -> Result<Person> {
        let mut registry = self.inner.write().await;

        let probe = Probe {
            username_owner: registry.by_username.get(new.username.trim()).copied(),
            email_owner: registry.by_email.get(&email_key(&new.email)).copied(),
            missing: registry.missing(new.siblings.iter().chain(&new.parents).copied()),
        };
        validation::check_new(&new, &probe)?;

        let person = new.into_person(PersonId::new(), Utc::now());
        registry.insert(person.clone());
        Ok(person)
    }

    async fn update(&self, id: &PersonId, update: PersonUpdate) -> Result<Person> {
        let mut registry = self.inner.write().await;

        let current = registry.person(id)?.clone();
        let missing = registry.missing(update.relation_ids());
        validation::check_update(&current, &update, &missing)?;

        if let Some(person) = registry.people.get_mut(id) {
            update.apply_fields(person);
            if let Some(parents) = &update.parents {
                person.parents = reconcile_relations(&current.parents, parents);
            }
        }
        if let Some(siblings) = &update.siblings {
            registry.set_siblings(*id, siblings);
        }

        registry.person(id).cloned()
    }

    async fn delete(&self, id: &PersonId) -> Result<()> {
        let mut registry = self.inner.write().await;
        registry
            .remove(id)
            .map(|_| ())
            .ok_or(KinError::not_found(*id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<PersonId>> {
        Ok(self.inner.read().await.by_username.get(username.trim()).copied())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PersonId>> {
        Ok(self.inner.read().await.by_email.get(&email_key(email)).copied())
    }

    async fn get_many(&self, ids: &[PersonId]) -> Result<Vec<Person>> {
        let registry = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| registry.people.get(id))
            .cloned()
            .collect())
    }

    async fn children_of(&self, id: &PersonId) -> Result<Vec<Person>> {
        let registry = self.inner.read().await;
        registry.person(id)?;
        Ok(registry
            .people_in_order()
            .filter(|p| p.parents.contains(id))
            .cloned()
            .collect())
    }

    // Single-link edits read and write under one guard so concurrent adds
    // on the same person never drop each other's links.

    async fn add_sibling(&self, a: &PersonId, b: &PersonId) -> Result<()> {
        if a == b {
            return Err(KinError::invalid(
                "siblings",
                "A person cannot be their own sibling",
            ));
        }
        let mut registry = self.inner.write().await;
        registry.person(b)?;
        let mut siblings = registry.person(a)?.siblings.clone();
        if !siblings.contains(b) {
            siblings.push(*b);
            registry.set_siblings(*a, &siblings);
        }
        Ok(())
    }

    async fn remove_sibling(&self, a: &PersonId, b: &PersonId) -> Result<()> {
        let mut registry = self.inner.write().await;
        registry.person(b)?;
        let siblings: Vec<PersonId> = registry
            .person(a)?
            .siblings
            .iter()
            .filter(|s| *s != b)
            .copied()
            .collect();
        registry.set_siblings(*a, &siblings);
        Ok(())
    }

    async fn add_parent(&self, child: &PersonId, parent: &PersonId) -> Result<()> {
        if child == parent {
            return Err(KinError::invalid(
                "parents",
                "A person cannot be their own parent",
            ));
        }
        let mut registry = self.inner.write().await;
        registry.person(parent)?;
        registry.person(child)?;
        if let Some(person) = registry.people.get_mut(child) {
            if !person.parents.contains(parent) {
                person.parents.push(*parent);
            }
        }
        Ok(())
    }

    async fn remove_parent(&self, child: &PersonId, parent: &PersonId) -> Result<()> {
        let mut registry = self.inner.write().await;
        registry.person(parent)?;
        registry.person(child)?;
        if let Some(person) = registry.people.get_mut(child) {
            person.parents.retain(|p| p != parent);
        }
        Ok(())
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn corrupt(detail: String) -> KinError {
    KinError::Internal(format!("Corrupt registry snapshot: {detail}"))
}
