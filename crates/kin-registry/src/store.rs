//! Person storage: the trait every registry backend implements.

use async_trait::async_trait;

use kin_core::{KinError, NewPerson, Person, PersonId, PersonUpdate, Result};

/// Persistence backend for people and their stored relations.
///
/// Implementations own the data-model invariants:
/// - username and email are unique (email case-insensitively);
/// - the sibling relation is symmetric after every write, applied as one
///   atomic unit;
/// - nobody is their own parent or sibling;
/// - deleting a person removes them from every relation.
///
/// Relation lists come back in recorded order; `list` and `children_of` in
/// registration order.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Fetch a person, or `NotFound`.
    async fn get(&self, id: &PersonId) -> Result<Person>;

    /// All people in registration order.
    async fn list(&self) -> Result<Vec<Person>>;

    /// Validate and store a new person, linking any initial relations.
    async fn create(&self, new: NewPerson) -> Result<Person>;

    /// Validate and apply a partial edit.
    async fn update(&self, id: &PersonId, update: PersonUpdate) -> Result<Person>;

    /// Remove a person and every relation that mentions them.
    async fn delete(&self, id: &PersonId) -> Result<()>;

    async fn find_by_username(&self, username: &str) -> Result<Option<PersonId>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<PersonId>>;

    /// Resolve ids, keeping their order. Unknown ids are skipped.
    async fn get_many(&self, ids: &[PersonId]) -> Result<Vec<Person>>;

    /// Everyone recording `id` as a parent (reverse lookup on `parents`).
    async fn children_of(&self, id: &PersonId) -> Result<Vec<Person>>;

    async fn siblings_of(&self, id: &PersonId) -> Result<Vec<Person>> {
        let person = self.get(id).await?;
        self.get_many(&person.siblings).await
    }

    async fn parents_of(&self, id: &PersonId) -> Result<Vec<Person>> {
        let person = self.get(id).await?;
        self.get_many(&person.parents).await
    }

    /// Record `a` and `b` as siblings of each other.
    async fn add_sibling(&self, a: &PersonId, b: &PersonId) -> Result<()> {
        self.get(b).await?;
        let person = self.get(a).await?;
        if person.siblings.contains(b) {
            return Ok(());
        }
        let mut siblings = person.siblings;
        siblings.push(*b);
        self.update(
            a,
            PersonUpdate {
                siblings: Some(siblings),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Drop the sibling link between `a` and `b`, both directions.
    async fn remove_sibling(&self, a: &PersonId, b: &PersonId) -> Result<()> {
        self.get(b).await?;
        let person = self.get(a).await?;
        if !person.siblings.contains(b) {
            return Ok(());
        }
        let siblings = person.siblings.into_iter().filter(|s| s != b).collect();
        self.update(
            a,
            PersonUpdate {
                siblings: Some(siblings),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Record `parent` as a parent of `child`.
    async fn add_parent(&self, child: &PersonId, parent: &PersonId) -> Result<()> {
        if child == parent {
            return Err(KinError::invalid(
                "parents",
                "A person cannot be their own parent",
            ));
        }
        self.get(parent).await?;
        let person = self.get(child).await?;
        if person.parents.contains(parent) {
            return Ok(());
        }
        let mut parents = person.parents;
        parents.push(*parent);
        self.update(
            child,
            PersonUpdate {
                parents: Some(parents),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    async fn remove_parent(&self, child: &PersonId, parent: &PersonId) -> Result<()> {
        self.get(parent).await?;
        let person = self.get(child).await?;
        if !person.parents.contains(parent) {
            return Ok(());
        }
        let parents = person.parents.into_iter().filter(|p| p != parent).collect();
        self.update(
            child,
            PersonUpdate {
                parents: Some(parents),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }
}

/// Merge a requested relation list into the stored one: survivors keep their
/// recorded position, newcomers are appended in request order.
pub fn reconcile_relations(current: &[PersonId], desired: &[PersonId]) -> Vec<PersonId> {
    let mut merged: Vec<PersonId> = current
        .iter()
        .filter(|id| desired.contains(id))
        .copied()
        .collect();
    for id in desired {
        if !merged.contains(id) {
            merged.push(*id);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_keeps_survivor_order() {
        let (a, b, c, d) = (PersonId::new(), PersonId::new(), PersonId::new(), PersonId::new());
        let merged = reconcile_relations(&[a, b, c], &[d, c, a]);
        assert_eq!(merged, vec![a, c, d]);
    }

    #[test]
    fn test_reconcile_dedups_request() {
        let (a, b) = (PersonId::new(), PersonId::new());
        assert_eq!(reconcile_relations(&[], &[b, a, b]), vec![b, a]);
        assert!(reconcile_relations(&[a, b], &[]).is_empty());
    }
}
