//! Relationship derivation.
//!
//! Read-only functions that compute a person's relatives from the stored
//! sibling and parent relations. Each returns `Lookup::Empty` with the
//! matching marker when the person exists but has no such relatives, and
//! propagates `NotFound` for an unknown id.

use std::collections::{HashMap, HashSet, VecDeque};

use kin_core::config::RegistryConfig;
use kin_core::{
    ChildTree, EmptyRelation, Grandparents, Lookup, Person, PersonId, PersonSummary, Result,
};

use crate::store::PersonStore;

/// Limits applied by the derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveLimits {
    /// Most grandparents returned, taken in natural order (parents in
    /// recorded order, then each parent's parents in recorded order).
    pub max_grandparents: usize,
    /// Generations expanded below the subject in the children tree.
    /// `None` expands every generation.
    pub max_descendant_depth: Option<usize>,
}

impl Default for DeriveLimits {
    fn default() -> Self {
        Self {
            max_grandparents: 2,
            max_descendant_depth: None,
        }
    }
}

impl From<&RegistryConfig> for DeriveLimits {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            max_grandparents: config.max_grandparents,
            max_descendant_depth: config.max_descendant_depth,
        }
    }
}

pub async fn siblings<S>(store: &S, id: &PersonId) -> Result<Lookup<Vec<PersonSummary>>>
where
    S: PersonStore + ?Sized,
{
    let siblings = summaries(&store.siblings_of(id).await?);
    Ok(Lookup::from_list(siblings, EmptyRelation::NoSiblings))
}

pub async fn parents<S>(store: &S, id: &PersonId) -> Result<Lookup<Vec<PersonSummary>>>
where
    S: PersonStore + ?Sized,
{
    let parents = summaries(&store.parents_of(id).await?);
    Ok(Lookup::from_list(parents, EmptyRelation::NoParents))
}

/// The subject's descendants as a nested tree rooted at the subject.
///
/// Descendants are fetched breadth-first, once per person. The depth bound
/// is applied again while building, since a person reachable along several
/// lines may sit deeper in one branch than where they were first fetched. A
/// person already on the path from the root is not expanded again, so
/// corrupt cyclic data still terminates.
pub async fn children<S>(store: &S, id: &PersonId, limits: DeriveLimits) -> Result<Lookup<ChildTree>>
where
    S: PersonStore + ?Sized,
{
    let root = store.get(id).await?.summary();

    let mut children_by_parent: HashMap<PersonId, Vec<PersonSummary>> = HashMap::new();
    let mut queue = VecDeque::from([(root.id, 0usize)]);
    while let Some((current, depth)) = queue.pop_front() {
        if children_by_parent.contains_key(&current) {
            continue;
        }
        if limits.max_descendant_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        let children = summaries(&store.children_of(&current).await?);
        queue.extend(children.iter().map(|c| (c.id, depth + 1)));
        children_by_parent.insert(current, children);
    }

    if children_by_parent
        .get(&root.id)
        .map_or(true, |c| c.is_empty())
    {
        return Ok(Lookup::Empty(EmptyRelation::NoChildren));
    }

    let mut path = Vec::new();
    Ok(Lookup::Found(build_tree(
        root,
        &children_by_parent,
        limits.max_descendant_depth,
        &mut path,
    )))
}

fn build_tree(
    person: PersonSummary,
    children_by_parent: &HashMap<PersonId, Vec<PersonSummary>>,
    max_depth: Option<usize>,
    path: &mut Vec<PersonId>,
) -> ChildTree {
    let depth = path.len();
    path.push(person.id);

    let mut children = Vec::new();
    let expand = max_depth.map_or(true, |max| depth < max);
    let below = if expand {
        children_by_parent.get(&person.id)
    } else {
        None
    };
    for child in below.into_iter().flatten() {
        if path.contains(&child.id) {
            tracing::warn!(
                person_id = %person.id,
                child_id = %child.id,
                "Parent cycle in registry data; not expanding"
            );
            continue;
        }
        children.push(build_tree(
            child.clone(),
            children_by_parent,
            max_depth,
            path,
        ));
    }

    path.pop();
    ChildTree {
        id: person.id,
        username: person.username,
        children,
    }
}

/// Parents of the subject's parents, capped at `limits.max_grandparents`.
///
/// Duplicates are dropped before the cap is applied: when both parents share
/// a grandparent, that person is listed once and the cap is filled with the
/// next distinct grandparent. This differs from taking the first entries
/// encountered, which can return the shared grandparent twice.
pub async fn grandparents<S>(
    store: &S,
    id: &PersonId,
    limits: DeriveLimits,
) -> Result<Lookup<Grandparents>>
where
    S: PersonStore + ?Sized,
{
    let person = store.get(id).await?;

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    'parents: for parent in store.get_many(&person.parents).await? {
        for grandparent in store.parents_of(&parent.id).await? {
            if found.len() >= limits.max_grandparents {
                break 'parents;
            }
            if seen.insert(grandparent.id) {
                found.push(grandparent.summary());
            }
        }
    }

    if found.is_empty() {
        return Ok(Lookup::Empty(EmptyRelation::NoGrandparents));
    }
    Ok(Lookup::Found(Grandparents {
        id: person.id,
        username: person.username,
        grandparents: found,
    }))
}

/// Children of the siblings of the subject's parents, de-duplicated. The
/// subject is never their own cousin.
pub async fn cousins<S>(store: &S, id: &PersonId) -> Result<Lookup<Vec<PersonSummary>>>
where
    S: PersonStore + ?Sized,
{
    let mut seen = HashSet::new();
    let mut cousins = Vec::new();

    for parent in store.parents_of(id).await? {
        for aunt_or_uncle in store.siblings_of(&parent.id).await? {
            for cousin in store.children_of(&aunt_or_uncle.id).await? {
                if cousin.id != *id && seen.insert(cousin.id) {
                    cousins.push(cousin.summary());
                }
            }
        }
    }

    Ok(Lookup::from_list(cousins, EmptyRelation::NoCousins))
}

fn summaries(people: &[Person]) -> Vec<PersonSummary> {
    people.iter().map(Person::summary).collect()
}
