//! Query service over a person store.

use kin_core::{
    ChildTree, Deleted, Grandparents, KinError, Lookup, NewPerson, Person, PersonDetail, PersonId,
    PersonSummary, PersonUpdate, Result,
};

use crate::derive::{self, DeriveLimits};
use crate::store::PersonStore;

/// Every registry read and mutation, with uniform empty-result and error
/// handling.
pub struct RegistryService<S: PersonStore> {
    store: S,
    limits: DeriveLimits,
}

impl<S: PersonStore> RegistryService<S> {
    /// Create a service with the default derivation limits.
    pub fn new(store: S) -> Self {
        Self {
            store,
            limits: DeriveLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: DeriveLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn limits(&self) -> DeriveLimits {
        self.limits
    }

    // ── People ───────────────────────────────────────────────────

    pub async fn list_people(&self) -> Result<Vec<PersonSummary>> {
        let people = self.store.list().await?;
        tracing::debug!(count = people.len(), "Listed people");
        Ok(people.iter().map(Person::summary).collect())
    }

    pub async fn get_person(&self, id: &PersonId) -> Result<PersonDetail> {
        let person = self.store.get(id).await?;
        self.detail(person).await
    }

    /// Register a new person. All field, uniqueness, and relation violations
    /// are reported together.
    pub async fn register_person(&self, new: NewPerson) -> Result<PersonDetail> {
        let username = new.username.trim().to_string();
        let person = self.store.create(new).await;
        let person = logged("register", &username, person)?;

        tracing::info!(
            person_id = %person.id,
            username = %person.username,
            siblings = person.siblings.len(),
            parents = person.parents.len(),
            "Person registered"
        );
        self.detail(person).await
    }

    /// Apply a partial edit. Username and email may be resubmitted but not
    /// changed.
    pub async fn edit_person(&self, id: &PersonId, update: PersonUpdate) -> Result<PersonDetail> {
        let person = self.store.update(id, update).await;
        let person = logged("edit", &id.to_string(), person)?;

        tracing::info!(person_id = %person.id, "Person updated");
        self.detail(person).await
    }

    /// Delete a person and every relation mentioning them. Deleting again
    /// is `NotFound`.
    pub async fn delete_person(&self, id: &PersonId) -> Result<Deleted> {
        let deleted = self.store.delete(id).await;
        logged("delete", &id.to_string(), deleted)?;

        tracing::info!(person_id = %id, "Person deleted");
        Ok(Deleted::new(*id))
    }

    // ── Relationships ────────────────────────────────────────────

    pub async fn get_siblings(&self, id: &PersonId) -> Result<Lookup<Vec<PersonSummary>>> {
        let result = derive::siblings(&self.store, id).await?;
        log_lookup("siblings", id, &result);
        Ok(result)
    }

    pub async fn get_parents(&self, id: &PersonId) -> Result<Lookup<Vec<PersonSummary>>> {
        let result = derive::parents(&self.store, id).await?;
        log_lookup("parents", id, &result);
        Ok(result)
    }

    pub async fn get_children(&self, id: &PersonId) -> Result<Lookup<ChildTree>> {
        let result = derive::children(&self.store, id, self.limits).await?;
        log_lookup("children", id, &result);
        Ok(result)
    }

    pub async fn get_grandparents(&self, id: &PersonId) -> Result<Lookup<Grandparents>> {
        let result = derive::grandparents(&self.store, id, self.limits).await?;
        log_lookup("grandparents", id, &result);
        Ok(result)
    }

    pub async fn get_cousins(&self, id: &PersonId) -> Result<Lookup<Vec<PersonSummary>>> {
        let result = derive::cousins(&self.store, id).await?;
        log_lookup("cousins", id, &result);
        Ok(result)
    }

    async fn detail(&self, person: Person) -> Result<PersonDetail> {
        let siblings = self.store.get_many(&person.siblings).await?;
        let parents = self.store.get_many(&person.parents).await?;
        Ok(PersonDetail::new(
            person,
            siblings.iter().map(Person::summary).collect(),
            parents.iter().map(Person::summary).collect(),
        ))
    }
}

/// Log a failed mutation: rejections at warn, backend failures at error.
fn logged<T>(operation: &str, subject: &str, result: Result<T>) -> Result<T> {
    match &result {
        Err(error @ KinError::Internal(_)) => {
            tracing::error!(operation, subject, error = %error, "Registry mutation failed")
        }
        Err(error) => {
            tracing::warn!(operation, subject, error = %error, "Registry mutation rejected")
        }
        Ok(_) => {}
    }
    result
}

fn log_lookup<T>(relation: &str, id: &PersonId, result: &Lookup<T>) {
    tracing::debug!(
        relation,
        person_id = %id,
        empty = result.is_empty(),
        "Relationship lookup"
    );
}
