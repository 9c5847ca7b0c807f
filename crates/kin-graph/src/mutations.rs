//! Write operations for the family graph.
//!
//! Every mutation that touches more than one node runs in a single
//! transaction, so a sibling link is either present in both directions or
//! in neither. Relations are written with MERGE so re-linking an existing
//! pair keeps its original `recorded_at`.

use chrono::Utc;
use neo4rs::{query, Query};

use kin_core::{Person, PersonId};

use crate::client::{GraphClient, GraphError};
use crate::queries::email_key;

impl GraphClient {
    // ── Person Writes ────────────────────────────────────────────

    /// Create a person node together with its initial relations.
    pub async fn create_person(&self, person: &Person) -> Result<(), GraphError> {
        let q = query(
            "CREATE (p:Person {
               id: $id, username: $username, email: $email, email_key: $email_key,
               first_name: $first_name, last_name: $last_name, phone: $phone,
               address: $address, birth_date: $birth_date, joined_at: $joined_at
             })",
        )
        .param("id", person.id.to_string())
        .param("username", person.username.clone())
        .param("email", person.email.clone())
        .param("email_key", email_key(&person.email))
        .param("joined_at", person.joined_at.to_rfc3339());

        let mut queries = vec![with_contact_fields(q, person)];
        queries.extend(relation_writes(person, true, true));
        self.run_in_txn(queries).await?;

        tracing::debug!(person_id = %person.id, "Person node created");
        Ok(())
    }

    /// Overwrite contact fields and, when asked, reconcile the sibling and
    /// parent relations with the lists on `person`.
    ///
    /// Username and email are never rewritten.
    pub async fn update_person(
        &self,
        person: &Person,
        sync_siblings: bool,
        sync_parents: bool,
    ) -> Result<(), GraphError> {
        let q = query(
            "MATCH (p:Person {id: $id})
             SET p.first_name = $first_name, p.last_name = $last_name,
                 p.phone = $phone, p.address = $address, p.birth_date = $birth_date",
        )
        .param("id", person.id.to_string());

        let mut queries = vec![with_contact_fields(q, person)];

        if sync_siblings {
            queries.push(
                query(
                    "MATCH (p:Person {id: $id})-[s:SIBLING_OF]-(o:Person)
                     WHERE NOT o.id IN $keep
                     DELETE s",
                )
                .param("id", person.id.to_string())
                .param("keep", id_strings(&person.siblings)),
            );
        }
        if sync_parents {
            queries.push(
                query(
                    "MATCH (o:Person)-[r:PARENT_OF]->(p:Person {id: $id})
                     WHERE NOT o.id IN $keep
                     DELETE r",
                )
                .param("id", person.id.to_string())
                .param("keep", id_strings(&person.parents)),
            );
        }
        queries.extend(relation_writes(person, sync_siblings, sync_parents));

        self.run_in_txn(queries).await
    }

    /// Delete a person and every relation touching them.
    /// Returns false when no such person exists.
    pub async fn delete_person(&self, id: &PersonId) -> Result<bool, GraphError> {
        let q = query(
            "MATCH (p:Person {id: $id})
             DETACH DELETE p
             RETURN count(*) AS cnt",
        )
        .param("id", id.to_string());

        let deleted = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("cnt").unwrap_or(0),
            None => 0,
        };
        Ok(deleted > 0)
    }

    // ── Relation Writes ──────────────────────────────────────────

    /// Link two people as siblings in both directions.
    pub async fn link_siblings(&self, a: &PersonId, b: &PersonId) -> Result<(), GraphError> {
        self.run_in_txn(vec![sibling_link(a, b, now_micros())]).await
    }

    /// Remove the sibling link between two people, both directions.
    pub async fn unlink_siblings(&self, a: &PersonId, b: &PersonId) -> Result<(), GraphError> {
        let q = query(
            "MATCH (a:Person {id: $a})-[s:SIBLING_OF]-(b:Person {id: $b})
             DELETE s",
        )
        .param("a", a.to_string())
        .param("b", b.to_string());
        self.run(q).await
    }

    /// Run queries as one unit; any failure rolls the whole batch back.
    async fn run_in_txn(&self, queries: Vec<Query>) -> Result<(), GraphError> {
        let mut txn = self.start_txn().await?;

        for q in queries {
            if let Err(e) = txn.run(q).await {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                return Err(e.into());
            }
        }

        txn.commit().await?;
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn with_contact_fields(q: Query, person: &Person) -> Query {
    q.param("first_name", person.first_name.clone())
        .param("last_name", person.last_name.clone())
        .param("phone", person.phone.clone().unwrap_or_default())
        .param("address", person.address.clone())
        .param(
            "birth_date",
            person
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        )
}

/// MERGE writes for the person's sibling and/or parent lists. Stamps
/// increase along each list so new links sort in list order.
fn relation_writes(person: &Person, siblings: bool, parents: bool) -> Vec<Query> {
    let base = now_micros();
    let mut queries = Vec::new();

    if siblings {
        for (i, sibling) in person.siblings.iter().enumerate() {
            queries.push(sibling_link(&person.id, sibling, base + i as i64));
        }
    }
    if parents {
        for (i, parent) in person.parents.iter().enumerate() {
            queries.push(
                query(
                    "MATCH (par:Person {id: $parent}), (c:Person {id: $child})
                     MERGE (par)-[r:PARENT_OF]->(c)
                     ON CREATE SET r.recorded_at = $at",
                )
                .param("parent", parent.to_string())
                .param("child", person.id.to_string())
                .param("at", base + i as i64),
            );
        }
    }

    queries
}

fn sibling_link(a: &PersonId, b: &PersonId, at: i64) -> Query {
    query(
        "MATCH (a:Person {id: $a}), (b:Person {id: $b})
         MERGE (a)-[r1:SIBLING_OF]->(b) ON CREATE SET r1.recorded_at = $at
         MERGE (b)-[r2:SIBLING_OF]->(a) ON CREATE SET r2.recorded_at = $at",
    )
    .param("a", a.to_string())
    .param("b", b.to_string())
    .param("at", at)
}

fn id_strings(ids: &[PersonId]) -> Vec<String> {
    ids.iter().map(PersonId::to_string).collect()
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}
