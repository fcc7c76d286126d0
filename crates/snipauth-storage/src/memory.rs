//! In-memory storage implementation.
//!
//! Grants and test cases live in `DashMap`s so that per-key updates use the
//! entry API and never race. Rules sit behind a single `RwLock` because a
//! batch save has to apply atomically against the (user, name, type) index.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_identifier, validate_page, DataStore, Grant, GrantStore, Page, PageRequest,
    PermissionKind, Rule, RuleStore, RuleType, TestCase, TestCaseStore,
};

type GrantKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    user_id: String,
    name: String,
    rule_type: RuleType,
}

impl RuleKey {
    fn of(rule: &Rule) -> Self {
        Self {
            user_id: rule.user_id.clone(),
            name: rule.name.clone(),
            rule_type: rule.rule_type,
        }
    }
}

#[derive(Debug, Default)]
struct RuleTable {
    rows: HashMap<String, Rule>,
    by_key: HashMap<RuleKey, String>,
}

/// In-memory implementation of all three stores.
///
/// # Performance Characteristics
///
/// - **Grant lookup / add kind**: O(1) average (DashMap entry)
/// - **Shared grant page**: O(N) over all grants (linear scan + sort)
/// - **Rule batch save**: O(B) for a batch of B rules under one write lock
/// - **Test case CRUD**: O(1) average; listing is O(N log N) for ordering
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    grants: DashMap<GrantKey, Grant>,
    rules: RwLock<RuleTable>,
    test_cases: DashMap<String, TestCase>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read_rules(&self) -> StorageResult<RwLockReadGuard<'_, RuleTable>> {
        self.rules.read().map_err(|_| StorageError::InternalError {
            message: "rule table lock poisoned".to_string(),
        })
    }

    fn write_rules(&self) -> StorageResult<RwLockWriteGuard<'_, RuleTable>> {
        self.rules.write().map_err(|_| StorageError::InternalError {
            message: "rule table lock poisoned".to_string(),
        })
    }
}

fn grant_key(user_id: &str, resource_id: &str) -> GrantKey {
    (user_id.to_string(), resource_id.to_string())
}

#[async_trait]
impl GrantStore for MemoryDataStore {
    async fn get_grant(&self, user_id: &str, resource_id: &str) -> StorageResult<Option<Grant>> {
        Ok(self
            .grants
            .get(&grant_key(user_id, resource_id))
            .map(|g| g.value().clone()))
    }

    #[instrument(skip(self))]
    async fn add_kind(
        &self,
        user_id: &str,
        resource_id: &str,
        kind: PermissionKind,
    ) -> StorageResult<Grant> {
        validate_identifier("user_id", user_id)?;
        validate_identifier("resource_id", resource_id)?;

        // The entry guard holds the shard lock for the whole read-modify-write.
        let grant = match self.grants.entry(grant_key(user_id, resource_id)) {
            Entry::Occupied(mut entry) => {
                let grant = entry.get_mut();
                if grant.kinds.insert(kind) {
                    grant.updated_at = Utc::now();
                    debug!("kind added to existing grant");
                }
                grant.clone()
            }
            Entry::Vacant(entry) => {
                debug!("grant created");
                entry
                    .insert(Grant::new(user_id, resource_id, kind))
                    .value()
                    .clone()
            }
        };

        Ok(grant)
    }

    #[instrument(skip(self))]
    async fn insert_if_absent(
        &self,
        user_id: &str,
        resource_id: &str,
        kind: PermissionKind,
    ) -> StorageResult<Option<Grant>> {
        validate_identifier("user_id", user_id)?;
        validate_identifier("resource_id", resource_id)?;

        match self.grants.entry(grant_key(user_id, resource_id)) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(entry) => Ok(Some(
                entry
                    .insert(Grant::new(user_id, resource_id, kind))
                    .value()
                    .clone(),
            )),
        }
    }

    async fn page_shared_grants(
        &self,
        owner_id: &str,
        page: &PageRequest,
    ) -> StorageResult<Page<Grant>> {
        validate_page(page)?;

        let owned: HashSet<String> = self
            .grants
            .iter()
            .filter(|g| g.user_id == owner_id && g.has(PermissionKind::Owner))
            .map(|g| g.resource_id.clone())
            .collect();

        let mut shared: Vec<Grant> = self
            .grants
            .iter()
            .filter(|g| g.user_id != owner_id && owned.contains(&g.resource_id))
            .map(|g| g.value().clone())
            .collect();
        shared.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = shared.len() as u64;
        let items = shared
            .into_iter()
            .skip(page.offset())
            .take(page.page_size as usize)
            .collect();

        Ok(Page { items, total })
    }
}

#[async_trait]
impl RuleStore for MemoryDataStore {
    async fn get_rule(&self, rule_id: &str) -> StorageResult<Option<Rule>> {
        Ok(self.read_rules()?.rows.get(rule_id).cloned())
    }

    async fn find_rule(
        &self,
        user_id: &str,
        name: &str,
        rule_type: RuleType,
    ) -> StorageResult<Option<Rule>> {
        let table = self.read_rules()?;
        let key = RuleKey {
            user_id: user_id.to_string(),
            name: name.to_string(),
            rule_type,
        };
        Ok(table
            .by_key
            .get(&key)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    #[instrument(skip(self, rules), fields(batch_size = rules.len()))]
    async fn save_rules(&self, rules: Vec<Rule>) -> StorageResult<Vec<Rule>> {
        // Validate the whole batch before touching the table.
        for rule in &rules {
            validate_identifier("user_id", &rule.user_id)?;
            validate_identifier("rule name", &rule.name)?;
        }

        let mut table = self.write_rules()?;
        let mut saved: Vec<Rule> = Vec::with_capacity(rules.len());
        let mut positions: HashMap<RuleKey, usize> = HashMap::new();

        for mut rule in rules {
            let key = RuleKey::of(&rule);

            // Unique key: a new row for an existing key collapses onto it.
            if let Some(existing_id) = table.by_key.get(&key) {
                rule.id = existing_id.clone();
            }

            let previous_key = table.rows.get(&rule.id).map(RuleKey::of);
            if let Some(previous_key) = previous_key {
                if previous_key != key {
                    table.by_key.remove(&previous_key);
                }
            }

            table.by_key.insert(key.clone(), rule.id.clone());
            table.rows.insert(rule.id.clone(), rule.clone());

            // One entry per key; a repeated key reports its last write.
            match positions.get(&key) {
                Some(&at) => saved[at] = rule,
                None => {
                    positions.insert(key, saved.len());
                    saved.push(rule);
                }
            }
        }

        Ok(saved)
    }

    async fn list_rules(&self, user_id: &str, rule_type: RuleType) -> StorageResult<Vec<Rule>> {
        let table = self.read_rules()?;
        let mut rules: Vec<Rule> = table
            .rows
            .values()
            .filter(|r| r.user_id == user_id && r.rule_type == rule_type)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rules)
    }

    #[instrument(skip(self))]
    async fn delete_rule(&self, rule_id: &str) -> StorageResult<()> {
        let mut table = self.write_rules()?;
        let rule = table
            .rows
            .remove(rule_id)
            .ok_or_else(|| StorageError::RuleNotFound {
                rule_id: rule_id.to_string(),
            })?;
        table.by_key.remove(&RuleKey::of(&rule));
        Ok(())
    }
}

#[async_trait]
impl TestCaseStore for MemoryDataStore {
    #[instrument(skip(self, test_case), fields(test_case_id = %test_case.id))]
    async fn save_test_case(&self, test_case: TestCase) -> StorageResult<TestCase> {
        validate_identifier("test case id", &test_case.id)?;
        validate_identifier("resource_id", &test_case.resource_id)?;

        self.test_cases.insert(test_case.id.clone(), test_case.clone());
        Ok(test_case)
    }

    async fn get_test_case(&self, id: &str) -> StorageResult<Option<TestCase>> {
        Ok(self.test_cases.get(id).map(|t| t.value().clone()))
    }

    async fn list_test_cases(&self) -> StorageResult<Vec<TestCase>> {
        let mut test_cases: Vec<TestCase> =
            self.test_cases.iter().map(|t| t.value().clone()).collect();
        test_cases.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(test_cases)
    }

    #[instrument(skip(self))]
    async fn delete_test_case(&self, id: &str) -> StorageResult<()> {
        self.test_cases
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::TestCaseNotFound {
                test_case_id: id.to_string(),
            })
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn health_check(&self) -> StorageResult<()> {
        self.read_rules().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_can_be_created() {
        let store = MemoryDataStore::new();
        assert!(store.list_test_cases().await.unwrap().is_empty());
        assert!(store.get_grant("alice", "s1").await.unwrap().is_none());
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_shared() {
        let store = MemoryDataStore::new_shared();
        store
            .add_kind("alice", "s1", PermissionKind::Owner)
            .await
            .unwrap();

        let store2 = Arc::clone(&store);
        let grant = store2.get_grant("alice", "s1").await.unwrap().unwrap();
        assert!(grant.has(PermissionKind::Owner));
    }

    #[tokio::test]
    async fn test_add_kind_creates_then_unions() {
        let store = MemoryDataStore::new();

        let created = store
            .add_kind("alice", "s1", PermissionKind::Read)
            .await
            .unwrap();
        assert_eq!(created.kinds.len(), 1);

        let updated = store
            .add_kind("alice", "s1", PermissionKind::Write)
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert!(updated.has(PermissionKind::Read));
        assert!(updated.has(PermissionKind::Write));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_add_existing_kind_leaves_grant_untouched() {
        let store = MemoryDataStore::new();
        let first = store
            .add_kind("alice", "s1", PermissionKind::Read)
            .await
            .unwrap();
        let second = store
            .add_kind("alice", "s1", PermissionKind::Read)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_add_kind_rejects_empty_ids() {
        let store = MemoryDataStore::new();
        let result = store.add_kind("", "s1", PermissionKind::Read).await;
        assert!(matches!(result, Err(StorageError::InvalidInput { .. })));
        let result = store.add_kind("alice", "", PermissionKind::Read).await;
        assert!(matches!(result, Err(StorageError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_add_kind_loses_nothing() {
        let store = MemoryDataStore::new_shared();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                let kind = PermissionKind::ALL[i % PermissionKind::ALL.len()];
                tokio::spawn(async move { store.add_kind("bob", "s1", kind).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let grant = store.get_grant("bob", "s1").await.unwrap().unwrap();
        assert_eq!(grant.kinds.len(), 3);
    }

    #[tokio::test]
    async fn test_insert_if_absent_only_creates_once() {
        let store = MemoryDataStore::new();
        store
            .add_kind("bob", "s1", PermissionKind::Write)
            .await
            .unwrap();

        let result = store
            .insert_if_absent("bob", "s1", PermissionKind::Read)
            .await
            .unwrap();
        assert!(result.is_none());
        let grant = store.get_grant("bob", "s1").await.unwrap().unwrap();
        assert!(!grant.has(PermissionKind::Read));

        let created = store
            .insert_if_absent("carol", "s1", PermissionKind::Read)
            .await
            .unwrap();
        assert!(created.is_some());
    }

    #[tokio::test]
    async fn test_page_shared_grants_only_covers_owned_resources() {
        let store = MemoryDataStore::new();
        store
            .add_kind("alice", "s1", PermissionKind::Owner)
            .await
            .unwrap();
        store
            .add_kind("bob", "s1", PermissionKind::Read)
            .await
            .unwrap();
        store
            .add_kind("carol", "s1", PermissionKind::Write)
            .await
            .unwrap();
        // alice only reads s2, so grants on it are not hers to list
        store
            .add_kind("alice", "s2", PermissionKind::Read)
            .await
            .unwrap();
        store
            .add_kind("dave", "s2", PermissionKind::Owner)
            .await
            .unwrap();

        let page = store
            .page_shared_grants("alice", &PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        let mut users: Vec<_> = page.items.iter().map(|g| g.user_id.as_str()).collect();
        users.sort();
        assert_eq!(users, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_page_shared_grants_pages() {
        let store = MemoryDataStore::new();
        store
            .add_kind("alice", "s1", PermissionKind::Owner)
            .await
            .unwrap();
        for i in 0..5 {
            store
                .add_kind(&format!("user-{i}"), "s1", PermissionKind::Read)
                .await
                .unwrap();
        }

        let page = store
            .page_shared_grants("alice", &PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);

        let beyond = store
            .page_shared_grants("alice", &PageRequest::new(9, 2))
            .await
            .unwrap();
        assert_eq!(beyond.total, 5);
        assert!(beyond.items.is_empty());

        let zero = store
            .page_shared_grants("alice", &PageRequest::new(0, 0))
            .await;
        assert!(matches!(zero, Err(StorageError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_save_rules_and_find_by_key() {
        let store = MemoryDataStore::new();
        let saved = store
            .save_rules(vec![
                Rule::new("alice", "indent", RuleType::Format, true, Some("4".into())),
                Rule::new("alice", "camelCase", RuleType::Lint, false, None),
            ])
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);

        let found = store
            .find_rule("alice", "indent", RuleType::Format)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.value.as_deref(), Some("4"));

        assert!(store
            .find_rule("alice", "indent", RuleType::Lint)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_rule("bob", "indent", RuleType::Format)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_rules_collapses_duplicate_keys() {
        let store = MemoryDataStore::new();
        let first = store
            .save_rules(vec![Rule::new("alice", "indent", RuleType::Format, true, None)])
            .await
            .unwrap();

        let second = store
            .save_rules(vec![Rule::new(
                "alice",
                "indent",
                RuleType::Format,
                false,
                Some("2".into()),
            )])
            .await
            .unwrap();

        assert_eq!(second[0].id, first[0].id);
        let rules = store.list_rules("alice", RuleType::Format).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].is_active);
        assert_eq!(rules[0].value.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_save_rules_repeated_name_in_batch_returns_last_write() {
        let store = MemoryDataStore::new();
        let saved = store
            .save_rules(vec![
                Rule::new("alice", "indent", RuleType::Format, true, Some("2".into())),
                Rule::new("alice", "quotes", RuleType::Format, true, None),
                Rule::new("alice", "indent", RuleType::Format, false, Some("4".into())),
            ])
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        let indent = saved.iter().find(|r| r.name == "indent").unwrap();
        assert!(!indent.is_active);
        assert_eq!(indent.value.as_deref(), Some("4"));

        let rules = store.list_rules("alice", RuleType::Format).await.unwrap();
        assert_eq!(rules.len(), 2);
        let stored = rules.iter().find(|r| r.name == "indent").unwrap();
        assert_eq!(stored, indent);
    }

    #[tokio::test]
    async fn test_save_rules_rejects_invalid_batch_atomically() {
        let store = MemoryDataStore::new();
        let result = store
            .save_rules(vec![
                Rule::new("alice", "indent", RuleType::Format, true, None),
                Rule::new("alice", "", RuleType::Format, true, None),
            ])
            .await;
        assert!(matches!(result, Err(StorageError::InvalidInput { .. })));
        assert!(store
            .list_rules("alice", RuleType::Format)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_rule() {
        let store = MemoryDataStore::new();
        let saved = store
            .save_rules(vec![Rule::new("alice", "indent", RuleType::Format, true, None)])
            .await
            .unwrap();

        store.delete_rule(&saved[0].id).await.unwrap();
        assert!(store.get_rule(&saved[0].id).await.unwrap().is_none());
        assert!(store
            .find_rule("alice", "indent", RuleType::Format)
            .await
            .unwrap()
            .is_none());

        let again = store.delete_rule(&saved[0].id).await;
        assert!(matches!(again, Err(StorageError::RuleNotFound { .. })));
    }

    #[tokio::test]
    async fn test_test_case_crud() {
        let store = MemoryDataStore::new();
        let saved = store
            .save_test_case(TestCase::new(
                "hello",
                "s1",
                vec!["print('Hello')".into()],
                vec!["Hello".into()],
            ))
            .await
            .unwrap();

        let fetched = store.get_test_case(&saved.id).await.unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert_eq!(store.list_test_cases().await.unwrap().len(), 1);

        store.delete_test_case(&saved.id).await.unwrap();
        assert!(store.get_test_case(&saved.id).await.unwrap().is_none());

        let again = store.delete_test_case(&saved.id).await;
        assert!(matches!(again, Err(StorageError::TestCaseNotFound { .. })));
    }
}
