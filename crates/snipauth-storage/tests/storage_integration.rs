//! Storage Integration Tests.
//!
//! These tests exercise backends only through the `DataStore` trait so that
//! any future backend can be plugged into the same helpers.

use std::sync::Arc;

use tokio::sync::Barrier;

use snipauth_storage::{
    DataStore, GrantStore, MemoryDataStore, PageRequest, PermissionKind, Rule, RuleType,
    StorageError, TestCase,
};

/// Create an in-memory store for testing.
fn create_memory_store() -> Arc<MemoryDataStore> {
    MemoryDataStore::new_shared()
}

/// Grants only ever grow, whichever order kinds arrive in.
async fn run_grant_growth_test<S: DataStore>(store: &S) {
    let order = [
        PermissionKind::Read,
        PermissionKind::Owner,
        PermissionKind::Read,
        PermissionKind::Write,
    ];

    let mut previous = 0;
    for kind in order {
        let grant = store.add_kind("alice", "snippet-1", kind).await.unwrap();
        assert!(grant.has(kind));
        assert!(grant.kinds.len() >= previous, "kind set must not shrink");
        previous = grant.kinds.len();
    }

    let grant = store.get_grant("alice", "snippet-1").await.unwrap().unwrap();
    assert_eq!(grant.kinds.len(), 3);
}

async fn run_rule_scoping_test<S: DataStore>(store: &S) {
    store
        .save_rules(vec![
            Rule::new("alice", "semicolon", RuleType::Format, true, None),
            Rule::new("alice", "semicolon", RuleType::Lint, false, None),
            Rule::new("bob", "semicolon", RuleType::Format, true, Some("x".into())),
        ])
        .await
        .unwrap();

    assert_eq!(store.list_rules("alice", RuleType::Format).await.unwrap().len(), 1);
    assert_eq!(store.list_rules("alice", RuleType::Lint).await.unwrap().len(), 1);
    assert_eq!(store.list_rules("bob", RuleType::Format).await.unwrap().len(), 1);
    assert!(store.list_rules("bob", RuleType::Lint).await.unwrap().is_empty());
}

async fn run_test_case_crud_test<S: DataStore>(store: &S) {
    let saved = store
        .save_test_case(TestCase::new("t", "snippet-1", vec![], vec![]))
        .await
        .unwrap();
    assert!(store.get_test_case(&saved.id).await.unwrap().is_some());

    store.delete_test_case(&saved.id).await.unwrap();
    assert!(matches!(
        store.delete_test_case(&saved.id).await,
        Err(StorageError::TestCaseNotFound { .. })
    ));
}

#[tokio::test]
async fn test_memory_grant_growth() {
    run_grant_growth_test(create_memory_store().as_ref()).await;
}

#[tokio::test]
async fn test_memory_rule_scoping() {
    run_rule_scoping_test(create_memory_store().as_ref()).await;
}

#[tokio::test]
async fn test_memory_test_case_crud() {
    run_test_case_crud_test(create_memory_store().as_ref()).await;
}

#[tokio::test]
async fn test_shared_grant_total_counts_every_kind() {
    let store = create_memory_store();
    store
        .add_kind("alice", "snippet-1", PermissionKind::Owner)
        .await
        .unwrap();
    store
        .add_kind("bob", "snippet-1", PermissionKind::Read)
        .await
        .unwrap();
    store
        .add_kind("carol", "snippet-1", PermissionKind::Write)
        .await
        .unwrap();

    let page = store
        .page_shared_grants("alice", &PageRequest::new(0, 10))
        .await
        .unwrap();
    // WRITE-only rows are still counted
    assert_eq!(page.total, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shares_create_one_grant() {
    let store = create_memory_store();
    let barrier = Arc::new(Barrier::new(32));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                store
                    .insert_if_absent("bob", "snippet-1", PermissionKind::Read)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let created = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Some(_))))
        .count();
    assert_eq!(created, 1);
}

/// Racing writers on many pairs: one share wins per pair and concurrent
/// kind additions all land.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_grant_writes_stay_atomic_per_pair() {
    const PAIRS: usize = 64;
    const RACERS: usize = 4;
    let store = create_memory_store();
    let kinds = [
        PermissionKind::Owner,
        PermissionKind::Read,
        PermissionKind::Write,
    ];
    let barrier = Arc::new(Barrier::new(PAIRS * RACERS * 2));

    let mut shares = Vec::new();
    let mut additions = Vec::new();
    for pair in 0..PAIRS {
        for racer in 0..RACERS {
            let (share_store, share_barrier) = (Arc::clone(&store), Arc::clone(&barrier));
            shares.push(tokio::spawn(async move {
                share_barrier.wait().await;
                share_store
                    .insert_if_absent(&format!("friend-{pair}"), "shared", PermissionKind::Read)
                    .await
                    .unwrap()
                    .map(|_| pair)
            }));

            let (add_store, add_barrier) = (Arc::clone(&store), Arc::clone(&barrier));
            let kind = kinds[racer % kinds.len()];
            additions.push(tokio::spawn(async move {
                add_barrier.wait().await;
                add_store
                    .add_kind(&format!("user-{pair}"), "snippet", kind)
                    .await
                    .unwrap();
            }));
        }
    }

    let mut winners: Vec<usize> = futures::future::join_all(shares)
        .await
        .into_iter()
        .filter_map(|r| r.unwrap())
        .collect();
    winners.sort_unstable();
    assert_eq!(winners, (0..PAIRS).collect::<Vec<_>>());

    for r in futures::future::join_all(additions).await {
        r.unwrap();
    }
    for pair in 0..PAIRS {
        let grant = store
            .get_grant(&format!("user-{pair}"), "snippet")
            .await
            .unwrap()
            .unwrap();
        for kind in kinds {
            assert!(grant.has(kind), "pair {pair} lost {kind:?}");
        }
    }
}
