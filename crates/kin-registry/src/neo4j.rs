//! Person store backed by Neo4j.
//!
//! Validation runs here against probes read from the graph; the writes
//! themselves go through `kin_graph`, which applies each mutation in one
//! transaction. The uniqueness constraints created at connect time catch any
//! registration that races past the probe.

use async_trait::async_trait;
use chrono::Utc;

use kin_core::{KinError, NewPerson, Person, PersonId, PersonUpdate, Result};
use kin_graph::GraphClient;

use crate::store::{reconcile_relations, PersonStore};
use crate::validation::{self, Probe};

pub struct Neo4jStore {
    client: GraphClient,
}

impl Neo4jStore {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    async fn require(&self, id: &PersonId) -> Result<Person> {
        self.client
            .get_person(id)
            .await?
            .ok_or(KinError::not_found(*id))
    }
}

#[async_trait]
impl PersonStore for Neo4jStore {
    async fn get(&self, id: &PersonId) -> Result<Person> {
        self.require(id).await
    }

    async fn list(&self) -> Result<Vec<Person>> {
        Ok(self.client.list_people().await?)
    }

    async fn create(&self, new: NewPerson) -> Result<Person> {
        let related: Vec<PersonId> = new.siblings.iter().chain(&new.parents).copied().collect();
        let probe = Probe {
            username_owner: self
                .client
                .find_person_by_username(new.username.trim())
                .await?,
            email_owner: self.client.find_person_by_email(&new.email).await?,
            missing: self.client.missing_people(&related).await?,
        };
        validation::check_new(&new, &probe)?;

        let person = new.into_person(PersonId::new(), Utc::now());
        self.client.create_person(&person).await?;
        Ok(person)
    }

    async fn update(&self, id: &PersonId, update: PersonUpdate) -> Result<Person> {
        let current = self.require(id).await?;
        let missing = self.client.missing_people(&update.relation_ids()).await?;
        validation::check_update(&current, &update, &missing)?;

        let mut person = current.clone();
        update.apply_fields(&mut person);
        if let Some(siblings) = &update.siblings {
            person.siblings = reconcile_relations(&current.siblings, siblings);
        }
        if let Some(parents) = &update.parents {
            person.parents = reconcile_relations(&current.parents, parents);
        }

        self.client
            .update_person(&person, update.siblings.is_some(), update.parents.is_some())
            .await?;
        self.require(id).await
    }

    async fn delete(&self, id: &PersonId) -> Result<()> {
        if self.client.delete_person(id).await? {
            Ok(())
        } else {
            Err(KinError::not_found(*id))
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<PersonId>> {
        Ok(self.client.find_person_by_username(username.trim()).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PersonId>> {
        Ok(self.client.find_person_by_email(email).await?)
    }

    async fn get_many(&self, ids: &[PersonId]) -> Result<Vec<Person>> {
        Ok(self.client.people_by_ids(ids).await?)
    }

    async fn children_of(&self, id: &PersonId) -> Result<Vec<Person>> {
        self.require(id).await?;
        let ids = self.client.child_ids(id).await?;
        Ok(self.client.people_by_ids(&ids).await?)
    }

    // Single-link edits skip the full relation rewrite.

    async fn add_sibling(&self, a: &PersonId, b: &PersonId) -> Result<()> {
        if a == b {
            return Err(KinError::invalid(
                "siblings",
                "A person cannot be their own sibling",
            ));
        }
        self.require(a).await?;
        self.require(b).await?;
        self.client.link_siblings(a, b).await?;
        Ok(())
    }

    async fn remove_sibling(&self, a: &PersonId, b: &PersonId) -> Result<()> {
        self.require(a).await?;
        self.require(b).await?;
        self.client.unlink_siblings(a, b).await?;
        Ok(())
    }
}
