//! Test-case engine.
//!
//! Persists test-case definitions and runs them against the execution
//! service. A run never writes to local storage; the verdict is computed
//! from the remote output alone.

use std::sync::Arc;

use snipauth_storage::{GrantStore, StorageError, TestCase, TestCaseStore};
use tracing::{debug, error, info, instrument};

use crate::authorization::AuthorizationEngine;
use crate::clients::ExecutionClient;
use crate::error::{DomainError, DomainResult};
use crate::model::{ExecutionRequest, TestCaseDefinition, TestCaseResult};

const EXECUTION_SERVICE: &str = "execution service";

/// Message attached to a passing verdict.
pub const TEST_PASSED: &str = "Test passed";
/// Message attached to a failing verdict.
pub const TEST_FAILED: &str = "Test failed";

/// Stores test cases and executes them remotely.
pub struct TestCaseEngine<T, G> {
    test_cases: Arc<T>,
    authorization: Arc<AuthorizationEngine<G>>,
    executor: Arc<dyn ExecutionClient>,
}

impl<T, G> TestCaseEngine<T, G>
where
    T: TestCaseStore,
    G: GrantStore,
{
    pub fn new(
        test_cases: Arc<T>,
        authorization: Arc<AuthorizationEngine<G>>,
        executor: Arc<dyn ExecutionClient>,
    ) -> Self {
        Self {
            test_cases,
            authorization,
            executor,
        }
    }

    /// Persists a test case after checking its resource exists.
    #[instrument(skip(self, definition, auth_token), fields(resource_id = %definition.resource_id))]
    pub async fn create_test_case(
        &self,
        definition: TestCaseDefinition,
        auth_token: &str,
    ) -> DomainResult<TestCase> {
        self.authorization
            .resolve_resource(&definition.resource_id, auth_token)
            .await?;

        let test_case = TestCase::new(
            definition.name,
            definition.resource_id,
            definition.input,
            definition.output,
        );
        let saved = self.test_cases.save_test_case(test_case).await?;
        info!(test_case_id = %saved.id, "test case created");
        Ok(saved)
    }

    /// Returns the test case, or `None` when it does not exist.
    pub async fn get_test_case(&self, id: &str) -> DomainResult<Option<TestCase>> {
        Ok(self.test_cases.get_test_case(id).await?)
    }

    /// Lists every stored test case.
    pub async fn list_test_cases(&self) -> DomainResult<Vec<TestCase>> {
        Ok(self.test_cases.list_test_cases().await?)
    }

    /// Deletes a test case, failing with `TestCaseNotFound` when absent.
    #[instrument(skip(self))]
    pub async fn delete_test_case(&self, id: &str) -> DomainResult<()> {
        self.test_cases
            .delete_test_case(id)
            .await
            .map_err(|err| match err {
                StorageError::TestCaseNotFound { test_case_id } => {
                    DomainError::TestCaseNotFound { test_case_id }
                }
                other => other.into(),
            })?;
        info!("test case deleted");
        Ok(())
    }

    /// Runs a definition against the execution service and compares output.
    ///
    /// The input lines are joined with `\n` and submitted with the bound
    /// resource's language and version. The test passes iff the remote
    /// output equals the expected lines exactly, in order and length.
    #[instrument(skip(self, definition, auth_token), fields(resource_id = %definition.resource_id))]
    pub async fn execute_test_case(
        &self,
        definition: TestCaseDefinition,
        auth_token: &str,
    ) -> DomainResult<TestCaseResult> {
        let resource = self
            .authorization
            .resolve_resource(&definition.resource_id, auth_token)
            .await?;

        let request = ExecutionRequest {
            name: definition.name.clone(),
            content: definition.input.join("\n"),
            language: resource.language,
            language_version: resource.language_version,
        };
        debug!(language = %request.language, version = %request.language_version, "submitting test run");

        let reply = self
            .executor
            .execute(&request, auth_token)
            .await
            .map_err(|source| DomainError::Upstream {
                service: EXECUTION_SERVICE,
                source,
            })?;

        if !reply.is_success() {
            error!(status = reply.status, "execution service returned failure status");
            return Err(DomainError::ExecutionFailed {
                reason: format!("execution service returned status {}", reply.status),
            });
        }
        let output = reply.body.ok_or_else(|| {
            error!("execution service returned no body");
            DomainError::ExecutionFailed {
                reason: "execution service returned an empty body".to_string(),
            }
        })?;

        let actual_output = output.output;
        let success = actual_output == definition.output;
        info!(success, "test case executed");

        Ok(TestCaseResult {
            test_case_id: definition.id.unwrap_or(definition.resource_id),
            success,
            actual_output,
            expected_output: definition.output,
            message: if success { TEST_PASSED } else { TEST_FAILED }.to_string(),
        })
    }

    /// Loads a stored test case and runs it.
    pub async fn run_stored_test_case(
        &self,
        id: &str,
        auth_token: &str,
    ) -> DomainResult<TestCaseResult> {
        let test_case = self
            .get_test_case(id)
            .await?
            .ok_or_else(|| DomainError::TestCaseNotFound {
                test_case_id: id.to_string(),
            })?;

        let definition = TestCaseDefinition {
            id: Some(test_case.id),
            name: test_case.name,
            resource_id: test_case.resource_id,
            input: test_case.input,
            output: test_case.output,
        };
        self.execute_test_case(definition, auth_token).await
    }
}
