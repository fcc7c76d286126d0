//! Application state for HTTP handlers.

use std::sync::Arc;

use snipauth_domain::{
    AuthorizationEngine, ExecutionClient, ResourceClient, RuleEngine, TestCaseEngine,
};
use snipauth_storage::DataStore;

/// Engines shared across all HTTP handlers.
///
/// One store backs all three engines; each engine only touches its own
/// table through the matching store trait.
pub struct AppState<S: DataStore> {
    /// The storage backend, used directly only for readiness checks.
    pub storage: Arc<S>,
    pub authorization: Arc<AuthorizationEngine<S>>,
    pub rules: Arc<RuleEngine<S>>,
    pub test_cases: Arc<TestCaseEngine<S, S>>,
}

impl<S: DataStore> AppState<S> {
    pub fn new(
        storage: Arc<S>,
        resources: Arc<dyn ResourceClient>,
        executor: Arc<dyn ExecutionClient>,
    ) -> Self {
        let authorization = Arc::new(AuthorizationEngine::new(Arc::clone(&storage), resources));
        let rules = Arc::new(RuleEngine::new(Arc::clone(&storage)));
        let test_cases = Arc::new(TestCaseEngine::new(
            Arc::clone(&storage),
            Arc::clone(&authorization),
            executor,
        ));

        Self {
            storage,
            authorization,
            rules,
            test_cases,
        }
    }
}
