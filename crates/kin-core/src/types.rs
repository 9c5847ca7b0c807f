//! Core domain types for the Kin family registry.
//!
//! A `Person` carries its stored relations (siblings, parents) as id lists in
//! the order they were recorded. Children, grandparents, and cousins are never
//! stored; they are derived by the registry's relationship queries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identity ──────────────────────────────────────────────────────

/// Unique identifier for a person in the registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PersonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

// ── Person ────────────────────────────────────────────────────────

/// A registered person and their stored relations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: PersonId,
    /// Unique; immutable once set.
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Unique (case-insensitive); immutable once set.
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub address: String,
    pub birth_date: Option<NaiveDate>,
    pub joined_at: DateTime<Utc>,
    /// Symmetric: every id here also lists this person as a sibling.
    #[serde(default)]
    pub siblings: Vec<PersonId>,
    /// Recorded parents, never including this person.
    #[serde(default)]
    pub parents: Vec<PersonId>,
}

impl Person {
    /// "First Last", the way the registry displays a person.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The `{id, username}` pair every relation query returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PersonSummary {
    pub id: PersonId,
    pub username: String,
}

/// All person fields plus resolved sibling and parent summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonDetail {
    pub id: PersonId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub birth_date: Option<NaiveDate>,
    pub joined_at: DateTime<Utc>,
    pub siblings: Vec<PersonSummary>,
    pub parents: Vec<PersonSummary>,
}

impl PersonDetail {
    pub fn new(person: Person, siblings: Vec<PersonSummary>, parents: Vec<PersonSummary>) -> Self {
        Self {
            id: person.id,
            username: person.username,
            first_name: person.first_name,
            last_name: person.last_name,
            email: person.email,
            phone: person.phone,
            address: person.address,
            birth_date: person.birth_date,
            joined_at: person.joined_at,
            siblings,
            parents,
        }
    }
}

// ── Mutation Requests ─────────────────────────────────────────────

/// Registration request.
///
/// The password pair is only checked for confirmation; credential storage
/// belongs to the authentication layer and the secret is never persisted or
/// serialized back out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(skip_serializing, default)]
    pub confirm_password: String,
    #[serde(default)]
    pub siblings: Vec<PersonId>,
    #[serde(default)]
    pub parents: Vec<PersonId>,
}

impl NewPerson {
    /// Build the stored record for this request under a freshly minted id.
    ///
    /// Relation lists are de-duplicated, keeping first occurrence.
    pub fn into_person(self, id: PersonId, joined_at: DateTime<Utc>) -> Person {
        Person {
            id,
            username: self.username.trim().to_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.trim().to_string(),
            phone: normalize_phone(self.phone),
            address: self.address,
            birth_date: self.birth_date,
            joined_at,
            siblings: dedup_ids(&self.siblings),
            parents: dedup_ids(&self.parents),
        }
    }
}

/// Partial edit of a person. Absent fields are left untouched.
///
/// `username` and `email` may be resubmitted unchanged but never altered.
/// `siblings` / `parents`, when present, replace the stored set wholesale.
/// An empty `phone` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub siblings: Option<Vec<PersonId>>,
    pub parents: Option<Vec<PersonId>>,
}

impl PersonUpdate {
    /// Apply the contact fields. Relations are the store's business since
    /// sibling edits touch more than one record.
    pub fn apply_fields(&self, person: &mut Person) {
        if let Some(first_name) = &self.first_name {
            person.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            person.last_name = last_name.clone();
        }
        if self.phone.is_some() {
            person.phone = normalize_phone(self.phone.clone());
        }
        if let Some(address) = &self.address {
            person.address = address.clone();
        }
        if self.birth_date.is_some() {
            person.birth_date = self.birth_date;
        }
    }

    /// Every relation id this update names, siblings first.
    pub fn relation_ids(&self) -> Vec<PersonId> {
        self.siblings
            .iter()
            .chain(self.parents.iter())
            .flatten()
            .copied()
            .collect()
    }
}

// ── Query Results ─────────────────────────────────────────────────

/// A person and their descendants, nested one level per generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildTree {
    pub id: PersonId,
    pub username: String,
    pub children: Vec<ChildTree>,
}

impl ChildTree {
    /// Number of people in the tree below the root.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// Grandparents of a person, capped by the registry's configured limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grandparents {
    pub id: PersonId,
    pub username: String,
    pub grandparents: Vec<PersonSummary>,
}

/// Which relation came back empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRelation {
    NoSiblings,
    NoParents,
    NoChildren,
    NoGrandparents,
    NoCousins,
}

impl EmptyRelation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoSiblings => "No siblings",
            Self::NoParents => "No parents",
            Self::NoChildren => "No children",
            Self::NoGrandparents => "No grandparents",
            Self::NoCousins => "No cousins",
        }
    }
}

impl fmt::Display for EmptyRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a relationship query for a person that exists.
///
/// `Empty` is not an error: the person was found but the relation has no
/// members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    Empty(EmptyRelation),
}

impl<T> Lookup<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::Empty(_) => None,
        }
    }
}

impl<T> Lookup<Vec<T>> {
    /// `Found` for a non-empty list, otherwise the given empty marker.
    pub fn from_list(items: Vec<T>, empty: EmptyRelation) -> Self {
        if items.is_empty() {
            Self::Empty(empty)
        } else {
            Self::Found(items)
        }
    }
}

/// Acknowledgement of a deleted person.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deleted {
    pub id: PersonId,
    pub message: String,
}

impl Deleted {
    pub fn new(id: PersonId) -> Self {
        Self {
            id,
            message: format!("Person deleted with id {id}"),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

/// Drop repeated ids, keeping the first occurrence.
pub fn dedup_ids(ids: &[PersonId]) -> Vec<PersonId> {
    let mut out: Vec<PersonId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
