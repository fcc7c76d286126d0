//! Authorization engine.
//!
//! Answers "what may user U do with resource R", enforces ownership before
//! sharing, and proxies resource lookups to the resource-metadata service.
//!
//! # Grant semantics
//!
//! - A grant's kind set only grows. Asserting a kind unions it into the set;
//!   asserting a kind already present is a no-op.
//! - Sharing is at-most-once escalation: a target with no grant receives
//!   READ, a target with any grant is left untouched, whatever it holds.
//! - Store updates go through `GrantStore::add_kind` and
//!   `GrantStore::insert_if_absent`, which are atomic per (user, resource)
//!   pair, so concurrent writers never drop each other's kinds.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use snipauth_storage::{Grant, GrantStore, PageRequest, PermissionKind};
use tracing::{debug, info, instrument, warn};

use crate::clients::ResourceClient;
use crate::error::{DomainError, DomainResult};
use crate::model::{AccessibleUsers, ResourceDescriptor, ResourcePage};

const RESOURCE_SERVICE: &str = "resource service";

/// Grants, checks and shares per-user access to resources.
pub struct AuthorizationEngine<G> {
    grants: Arc<G>,
    resources: Arc<dyn ResourceClient>,
}

impl<G> AuthorizationEngine<G>
where
    G: GrantStore,
{
    /// Creates a new authorization engine.
    pub fn new(grants: Arc<G>, resources: Arc<dyn ResourceClient>) -> Self {
        Self { grants, resources }
    }

    /// Adds the named kind to the (user, resource) grant and returns the result.
    ///
    /// Fails with `UnknownPermissionKind` when `kind_name` is not one of
    /// `READ`, `WRITE` or `OWNER`. Creates the grant if the pair has none.
    #[instrument(skip(self))]
    pub async fn assert_permission(
        &self,
        user_id: &str,
        resource_id: &str,
        kind_name: &str,
    ) -> DomainResult<Grant> {
        let kind = PermissionKind::from_name(kind_name).ok_or_else(|| {
            DomainError::UnknownPermissionKind {
                value: kind_name.to_string(),
            }
        })?;

        let grant = self.grants.add_kind(user_id, resource_id, kind).await?;
        info!(kinds = ?grant.kinds, "permission asserted");
        Ok(grant)
    }

    /// Returns the kinds held by the pair, or an empty set if it has no grant.
    pub async fn list_granted_kinds(
        &self,
        user_id: &str,
        resource_id: &str,
    ) -> DomainResult<BTreeSet<PermissionKind>> {
        let kinds = self
            .grants
            .get_grant(user_id, resource_id)
            .await?
            .map(|grant| grant.kinds)
            .unwrap_or_default();
        Ok(kinds)
    }

    /// Fetches a resource descriptor, `None` when the service does not know it.
    pub async fn get_resource(
        &self,
        resource_id: &str,
        auth_token: &str,
    ) -> DomainResult<Option<ResourceDescriptor>> {
        self.resources
            .get_resource(resource_id, auth_token)
            .await
            .map_err(|source| DomainError::Upstream {
                service: RESOURCE_SERVICE,
                source,
            })
    }

    /// Fetches a resource descriptor, failing with `ResourceNotFound` when absent.
    pub async fn resolve_resource(
        &self,
        resource_id: &str,
        auth_token: &str,
    ) -> DomainResult<ResourceDescriptor> {
        self.get_resource(resource_id, auth_token)
            .await?
            .ok_or_else(|| DomainError::ResourceNotFound {
                resource_id: resource_id.to_string(),
            })
    }

    /// Lists the resources visible to a user through the resource service.
    pub async fn list_resources(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        auth_token: &str,
    ) -> DomainResult<ResourcePage> {
        self.resources
            .list_resources(user_id, page, page_size, auth_token)
            .await
            .map_err(|source| DomainError::Upstream {
                service: RESOURCE_SERVICE,
                source,
            })
    }

    /// Shares a resource the requester owns with another user.
    ///
    /// 1. The resource must exist (`ResourceNotFound`).
    /// 2. The requester must hold OWNER (`NotOwner`).
    /// 3. A target without a grant receives READ; an existing grant is kept
    ///    as-is.
    ///
    /// Returns the resource descriptor. Nothing is written unless both
    /// checks pass.
    #[instrument(skip(self, auth_token))]
    pub async fn share_resource(
        &self,
        resource_id: &str,
        requester_id: &str,
        target_user_id: &str,
        auth_token: &str,
    ) -> DomainResult<ResourceDescriptor> {
        let resource = self.resolve_resource(resource_id, auth_token).await?;

        let requester_kinds = self.list_granted_kinds(requester_id, resource_id).await?;
        if !requester_kinds.contains(&PermissionKind::Owner) {
            warn!(kinds = ?requester_kinds, "share rejected: requester is not owner");
            return Err(DomainError::NotOwner {
                user_id: requester_id.to_string(),
                resource_id: resource_id.to_string(),
            });
        }

        match self
            .grants
            .insert_if_absent(target_user_id, resource_id, PermissionKind::Read)
            .await?
        {
            Some(_) => info!("read access granted to share target"),
            None => debug!("share target already holds a grant, left unchanged"),
        }

        Ok(resource)
    }

    /// Lists users holding READ or OWNER on any resource `owner_id` owns.
    ///
    /// `page` is zero-based and `page_size` bounds the underlying grant
    /// query. `total` counts every shared grant row for the owner before the
    /// kind filter, so a WRITE-only grant is counted but its user is not
    /// returned. A user sharing several resources appears once per page.
    pub async fn list_accessible_users(
        &self,
        owner_id: &str,
        page: u32,
        page_size: u32,
    ) -> DomainResult<AccessibleUsers> {
        let rows = self
            .grants
            .page_shared_grants(owner_id, &PageRequest::new(page, page_size))
            .await?;

        let mut seen = HashSet::new();
        let users = rows
            .items
            .into_iter()
            .filter(|grant| grant.has(PermissionKind::Read) || grant.has(PermissionKind::Owner))
            .map(|grant| grant.user_id)
            .filter(|user_id| seen.insert(user_id.clone()))
            .collect();

        Ok(AccessibleUsers {
            users,
            total: rows.total,
        })
    }
}
