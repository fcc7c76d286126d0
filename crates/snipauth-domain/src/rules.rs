//! Rule engine for per-user formatting and linting preferences.

use std::sync::Arc;

use snipauth_storage::{Rule, RuleStore, RuleType, StorageError};
use tracing::{info, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::model::RuleInput;

/// Maintains each user's named rule set per rule type.
pub struct RuleEngine<R> {
    rules: Arc<R>,
}

impl<R> RuleEngine<R>
where
    R: RuleStore,
{
    pub fn new(rules: Arc<R>) -> Self {
        Self { rules }
    }

    /// Creates or updates a batch of rules for one user and rule type.
    ///
    /// An item carrying an `id` is matched against the user's existing rule
    /// of the same name and type and overwritten in place. Anything else
    /// becomes a new rule. The batch is saved in one step; the returned order
    /// is unspecified, so match results by name or id.
    #[instrument(skip(self, items), fields(batch_size = items.len()))]
    pub async fn upsert_rules(
        &self,
        user_id: &str,
        rule_type: RuleType,
        items: Vec<RuleInput>,
    ) -> DomainResult<Vec<Rule>> {
        let mut batch = Vec::with_capacity(items.len());

        for item in items {
            let existing = match item.id {
                Some(_) => self.rules.find_rule(user_id, &item.name, rule_type).await?,
                None => None,
            };

            let rule = match existing {
                Some(mut rule) => {
                    rule.is_active = item.is_active;
                    rule.value = item.value;
                    rule
                }
                None => Rule::new(user_id, item.name, rule_type, item.is_active, item.value),
            };
            batch.push(rule);
        }

        let saved = self.rules.save_rules(batch).await?;
        info!(saved = saved.len(), "rules upserted");
        Ok(saved)
    }

    /// Deletes a rule owned by `user_id`.
    ///
    /// Fails with `RuleNotFound` when no such rule exists and with
    /// `UnauthorizedAccess` when it belongs to someone else.
    #[instrument(skip(self))]
    pub async fn delete_rule(&self, user_id: &str, rule_id: &str) -> DomainResult<()> {
        let rule = self
            .rules
            .get_rule(rule_id)
            .await?
            .ok_or_else(|| DomainError::RuleNotFound {
                rule_id: rule_id.to_string(),
            })?;

        if rule.user_id != user_id {
            warn!(owner = %rule.user_id, "rule delete rejected: not owner");
            return Err(DomainError::UnauthorizedAccess {
                user_id: user_id.to_string(),
                rule_id: rule_id.to_string(),
            });
        }

        self.rules.delete_rule(rule_id).await.map_err(|err| match err {
            StorageError::RuleNotFound { rule_id } => DomainError::RuleNotFound { rule_id },
            other => other.into(),
        })
    }

    /// Lists a user's rules of one type.
    pub async fn list_rules(&self, user_id: &str, rule_type: RuleType) -> DomainResult<Vec<Rule>> {
        Ok(self.rules.list_rules(user_id, rule_type).await?)
    }
}
