//! Read operations for the family graph.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use neo4rs::query;

use kin_core::{Person, PersonId};

use crate::client::{GraphClient, GraphError};

/// Collects a matched `p`'s sibling and parent ids in recorded order.
const RELATIONS: &str = "
    OPTIONAL MATCH (p)-[s:SIBLING_OF]->(sib:Person)
    WITH p, sib, s ORDER BY s.recorded_at
    WITH p, collect(sib.id) AS siblings
    OPTIONAL MATCH (par:Person)-[r:PARENT_OF]->(p)
    WITH p, siblings, par, r ORDER BY r.recorded_at
    WITH p, siblings, collect(par.id) AS parents";

impl GraphClient {
    // ── Single Person Lookups ────────────────────────────────────

    /// Get a person with their sibling and parent ids.
    pub async fn get_person(&self, id: &PersonId) -> Result<Option<Person>, GraphError> {
        let cypher = format!(
            "MATCH (p:Person {{id: $id}})
             {RELATIONS}
             RETURN p, siblings, parents"
        );
        let q = query(&cypher).param("id", id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(row_to_person(&row)?)),
            None => Ok(None),
        }
    }

    /// Id of the person holding `username`, if any.
    pub async fn find_person_by_username(
        &self,
        username: &str,
    ) -> Result<Option<PersonId>, GraphError> {
        self.find_person_by_property("username", username).await
    }

    /// Id of the person holding `email`, compared case-insensitively.
    pub async fn find_person_by_email(&self, email: &str) -> Result<Option<PersonId>, GraphError> {
        self.find_person_by_property("email_key", &email_key(email)).await
    }

    async fn find_person_by_property(
        &self,
        property: &str,
        value: &str,
    ) -> Result<Option<PersonId>, GraphError> {
        let cypher = format!(
            "MATCH (p:Person {{{property}: $value}})
             RETURN p.id AS id LIMIT 1"
        );
        let q = query(&cypher).param("value", value.to_string());

        match self.query_one(q).await? {
            Some(row) => {
                let id: String = row.get("id").map_err(|e| {
                    GraphError::Serialization(format!("Failed to read person id: {e}"))
                })?;
                Ok(Some(parse_id(&id)?))
            }
            None => Ok(None),
        }
    }

    // ── List Queries ─────────────────────────────────────────────

    /// All people in registration order.
    pub async fn list_people(&self) -> Result<Vec<Person>, GraphError> {
        let cypher = format!(
            "MATCH (p:Person)
             {RELATIONS}
             RETURN p, siblings, parents
             ORDER BY p.joined_at, p.id"
        );

        let rows = self.query_rows(query(&cypher)).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(row_to_person(&row)?);
        }
        Ok(results)
    }

    /// Resolve ids to people, preserving the order of `ids`. Unknown ids are
    /// skipped.
    pub async fn people_by_ids(&self, ids: &[PersonId]) -> Result<Vec<Person>, GraphError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cypher = format!(
            "MATCH (p:Person) WHERE p.id IN $ids
             {RELATIONS}
             RETURN p, siblings, parents"
        );
        let q = query(&cypher).param("ids", id_strings(ids));

        let mut found = HashMap::with_capacity(ids.len());
        for row in self.query_rows(q).await? {
            let person = row_to_person(&row)?;
            found.insert(person.id, person);
        }
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Which of `ids` have no person node.
    pub async fn missing_people(&self, ids: &[PersonId]) -> Result<Vec<PersonId>, GraphError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let q = query(
            "MATCH (p:Person) WHERE p.id IN $ids
             RETURN collect(p.id) AS present",
        )
        .param("ids", id_strings(ids));

        let present: Vec<String> = match self.query_one(q).await? {
            Some(row) => row.get("present").unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(ids
            .iter()
            .filter(|id| !present.contains(&id.to_string()))
            .copied()
            .collect())
    }

    // ── Relation Queries ─────────────────────────────────────────

    /// Ids of everyone who records `id` as a parent, in registration order.
    pub async fn child_ids(&self, id: &PersonId) -> Result<Vec<PersonId>, GraphError> {
        let q = query(
            "MATCH (:Person {id: $id})-[:PARENT_OF]->(c:Person)
             RETURN c.id AS id
             ORDER BY c.joined_at, c.id",
        )
        .param("id", id.to_string());

        let rows = self.query_rows(q).await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("id").map_err(|e| {
                GraphError::Serialization(format!("Failed to read child id: {e}"))
            })?;
            ids.push(parse_id(&raw)?);
        }
        Ok(ids)
    }
}

// ── Row Mapping ──────────────────────────────────────────────────

/// Lower-cased email used for the uniqueness index.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn id_strings(ids: &[PersonId]) -> Vec<String> {
    ids.iter().map(PersonId::to_string).collect()
}

fn parse_id(raw: &str) -> Result<PersonId, GraphError> {
    raw.parse()
        .map_err(|e| GraphError::Serialization(format!("Invalid person id {raw:?}: {e}")))
}

fn parse_ids(raw: &[String]) -> Result<Vec<PersonId>, GraphError> {
    raw.iter().map(|s| parse_id(s)).collect()
}

/// Convert a `p, siblings, parents` row into a `Person`.
fn row_to_person(row: &neo4rs::Row) -> Result<Person, GraphError> {
    let node: neo4rs::Node = row
        .get("p")
        .map_err(|e| GraphError::Serialization(format!("Failed to deserialize person: {e}")))?;
    let siblings: Vec<String> = row.get("siblings").unwrap_or_default();
    let parents: Vec<String> = row.get("parents").unwrap_or_default();

    let id: String = node.get("id").unwrap_or_default();
    let phone: String = node.get("phone").unwrap_or_default();
    let birth_date: String = node.get("birth_date").unwrap_or_default();
    let joined_at: String = node.get("joined_at").unwrap_or_default();

    Ok(Person {
        id: parse_id(&id)?,
        username: node.get("username").unwrap_or_default(),
        first_name: node.get("first_name").unwrap_or_default(),
        last_name: node.get("last_name").unwrap_or_default(),
        email: node.get("email").unwrap_or_default(),
        phone: (!phone.is_empty()).then_some(phone),
        address: node.get("address").unwrap_or_default(),
        birth_date: parse_date(&birth_date)?,
        joined_at: parse_timestamp(&joined_at)?,
        siblings: parse_ids(&siblings)?,
        parents: parse_ids(&parents)?,
    })
}

fn parse_date(raw: &str) -> Result<Option<NaiveDate>, GraphError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| GraphError::Serialization(format!("Invalid birth_date {raw:?}: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, GraphError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GraphError::Serialization(format!("Invalid joined_at {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_key_normalizes() {
        assert_eq!(email_key("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("").unwrap(), None);
        assert_eq!(
            parse_date("1815-12-10").unwrap(),
            NaiveDate::from_ymd_opt(1815, 12, 10)
        );
        assert!(parse_date("10/12/1815").is_err());
    }

    #[test]
    fn test_parse_ids_rejects_garbage() {
        let id = PersonId::new();
        assert_eq!(parse_ids(&[id.to_string()]).unwrap(), vec![id]);
        assert!(parse_ids(&["nope".to_string()]).is_err());
    }
}
