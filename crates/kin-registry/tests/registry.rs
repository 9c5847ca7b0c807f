//! End-to-end registry behaviour over the in-memory store, including the
//! JSON data file round trip used by the CLI.

use kin_core::{EmptyRelation, ErrorKind, Lookup, NewPerson, PersonId, PersonUpdate};
use kin_registry::{MemoryStore, PersonStore, RegistryService};

fn registration(username: &str, parents: &[PersonId], siblings: &[PersonId]) -> NewPerson {
    NewPerson {
        username: username.to_string(),
        first_name: username.to_string(),
        last_name: "Family".to_string(),
        email: format!("{username}@family.test"),
        password: "hunter2".to_string(),
        confirm_password: "hunter2".to_string(),
        parents: parents.to_vec(),
        siblings: siblings.to_vec(),
        ..Default::default()
    }
}

async fn register(
    svc: &RegistryService<MemoryStore>,
    username: &str,
    parents: &[PersonId],
    siblings: &[PersonId],
) -> PersonId {
    svc.register_person(registration(username, parents, siblings))
        .await
        .unwrap()
        .id
}

async fn assert_siblings_symmetric(svc: &RegistryService<MemoryStore>) {
    for person in svc.store().list().await.unwrap() {
        for sibling in &person.siblings {
            let other = svc.store().get(sibling).await.unwrap();
            assert!(
                other.siblings.contains(&person.id),
                "{} -> {} not mirrored",
                person.username,
                other.username
            );
        }
    }
}

#[tokio::test]
async fn test_family_queries() {
    let svc = RegistryService::new(MemoryStore::new());

    let grandma = register(&svc, "grandma", &[], &[]).await;
    let grandpa = register(&svc, "grandpa", &[], &[]).await;
    let p1 = register(&svc, "p1", &[grandma, grandpa], &[]).await;
    let p2 = register(&svc, "p2", &[], &[]).await;
    let s1 = register(&svc, "s1", &[grandma, grandpa], &[p1]).await;
    let x = register(&svc, "x", &[p1, p2], &[]).await;
    let c1 = register(&svc, "c1", &[s1], &[]).await;
    let c2 = register(&svc, "c2", &[s1], &[c1]).await;

    let cousins = svc.get_cousins(&x).await.unwrap().found().unwrap();
    let cousin_ids: Vec<_> = cousins.iter().map(|c| c.id).collect();
    assert_eq!(cousin_ids, vec![c1, c2]);

    let grandparents = svc.get_grandparents(&x).await.unwrap().found().unwrap();
    assert_eq!(grandparents.grandparents.len(), 2);

    let tree = svc.get_children(&grandma).await.unwrap().found().unwrap();
    let generation: Vec<_> = tree.children.iter().map(|c| c.id).collect();
    assert_eq!(generation, vec![p1, s1]);
    assert_eq!(tree.descendant_count(), 5);

    assert_eq!(
        svc.get_parents(&grandma).await.unwrap(),
        Lookup::Empty(EmptyRelation::NoParents)
    );
    assert_eq!(
        svc.get_cousins(&grandma).await.unwrap(),
        Lookup::Empty(EmptyRelation::NoCousins)
    );
    let back = svc.get_cousins(&c1).await.unwrap().found().unwrap();
    assert_eq!(back[0].id, x);
    assert_siblings_symmetric(&svc).await;
}

#[tokio::test]
async fn test_children_is_reverse_of_parents() {
    let svc = RegistryService::new(MemoryStore::new());
    let a = register(&svc, "a", &[], &[]).await;
    let b = register(&svc, "b", &[], &[]).await;
    let kid1 = register(&svc, "kid1", &[a], &[]).await;
    let kid2 = register(&svc, "kid2", &[b, a], &[]).await;
    register(&svc, "other", &[b], &[]).await;

    let direct: Vec<_> = svc
        .store()
        .children_of(&a)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(direct, vec![kid1, kid2]);
    for child in &direct {
        assert!(svc.store().get(child).await.unwrap().parents.contains(&a));
    }
}

#[tokio::test]
async fn test_sibling_edits_stay_symmetric() {
    let svc = RegistryService::new(MemoryStore::new());
    let a = register(&svc, "a", &[], &[]).await;
    let b = register(&svc, "b", &[], &[a]).await;
    let c = register(&svc, "c", &[], &[]).await;
    assert_siblings_symmetric(&svc).await;

    // Replace a's siblings: b dropped, c added.
    svc.edit_person(
        &a,
        PersonUpdate {
            siblings: Some(vec![c]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_siblings_symmetric(&svc).await;
    assert!(svc.store().get(&b).await.unwrap().siblings.is_empty());

    svc.store().add_sibling(&b, &c).await.unwrap();
    svc.store().remove_sibling(&c, &a).await.unwrap();
    assert_siblings_symmetric(&svc).await;

    svc.delete_person(&c).await.unwrap();
    assert_siblings_symmetric(&svc).await;
    for person in svc.store().list().await.unwrap() {
        assert!(!person.siblings.contains(&c));
    }
}

#[tokio::test]
async fn test_self_relations_rejected() {
    let svc = RegistryService::new(MemoryStore::new());
    let a = register(&svc, "a", &[], &[]).await;

    let err = svc.store().add_parent(&a, &a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = svc
        .edit_person(
            &a,
            PersonUpdate {
                siblings: Some(vec![a]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(svc.store().get(&a).await.unwrap().siblings.is_empty());
}

#[tokio::test]
async fn test_data_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");

    let (mum, kid) = {
        let svc = RegistryService::new(MemoryStore::load(&path).await.unwrap());
        let mum = register(&svc, "mum", &[], &[]).await;
        let kid = register(&svc, "kid", &[mum], &[]).await;
        svc.store().save(&path).await.unwrap();
        (mum, kid)
    };

    let svc = RegistryService::new(MemoryStore::load(&path).await.unwrap());
    let parents = svc.get_parents(&kid).await.unwrap().found().unwrap();
    assert_eq!(parents[0].id, mum);
    assert_eq!(parents[0].username, "mum");

    // Stored file never carries credentials.
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("hunter2"));
}
