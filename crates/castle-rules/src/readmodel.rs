//! # Read-Model Seams
//!
//! Synchronous, tenant-scoped lookups the rules depend on. Implementations
//! live with the persistence layer; tests use in-memory stubs.
//!
//! A missing record may be reported either as `Ok(None)` or as
//! [`LookupError::NotFound`]; rules treat both the same way. Any other
//! error is an execution fault.

use castle_core::{
    Assignment, CatalogEntity, CatalogRecord, LookupError, Organization, OrganizationNode, Position,
    TenantId, TimelineEntry,
};
use chrono::NaiveDate;
use uuid::Uuid;

/// Organization hierarchy queries.
pub trait HierarchyReadModel: Send + Sync {
    /// Current version of an organization.
    fn organization(&self, tenant: TenantId, code: &str) -> Result<Option<Organization>, LookupError>;

    /// Depth of an organization; roots are at depth 1.
    fn organization_depth(&self, tenant: TenantId, code: &str) -> Result<u32, LookupError>;

    /// Ancestors of an organization, nearest first. The organization itself
    /// is not included.
    fn ancestor_chain(&self, tenant: TenantId, code: &str) -> Result<Vec<OrganizationNode>, LookupError>;

    /// The version of an organization in effect on `date`.
    fn organization_at(
        &self,
        tenant: TenantId,
        code: &str,
        date: NaiveDate,
    ) -> Result<Option<OrganizationNode>, LookupError>;
}

/// Organization lookups by business code.
pub trait OrganizationReadModel: Send + Sync {
    /// Current version of an organization.
    fn organization_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Organization>, LookupError>;
}

/// Current job catalog versions.
pub trait JobCatalogReadModel: Send + Sync {
    /// Current job family group.
    fn current_family_group(&self, tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError>;

    /// Current job family.
    fn current_job_family(&self, tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError>;

    /// Current job role.
    fn current_job_role(&self, tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError>;

    /// Current job level.
    fn current_job_level(&self, tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError>;

    /// Dispatch to the lookup for `entity`.
    fn current(
        &self,
        tenant: TenantId,
        entity: CatalogEntity,
        code: &str,
    ) -> Result<Option<CatalogRecord>, LookupError> {
        match entity {
            CatalogEntity::JobFamilyGroup => self.current_family_group(tenant, code),
            CatalogEntity::JobFamily => self.current_job_family(tenant, code),
            CatalogEntity::JobRole => self.current_job_role(tenant, code),
            CatalogEntity::JobLevel => self.current_job_level(tenant, code),
        }
    }
}

/// Job catalog version histories.
pub trait JobCatalogTimelineReadModel: Send + Sync {
    /// All versions of one catalog entry, ordered by effective date
    /// ascending. The last entry is the latest version.
    fn timeline(
        &self,
        tenant: TenantId,
        entity: CatalogEntity,
        code: &str,
    ) -> Result<Vec<TimelineEntry>, LookupError>;
}

/// Position lookups.
pub trait PositionReadModel: Send + Sync {
    /// Current version of a position.
    fn current_position(&self, tenant: TenantId, code: &str) -> Result<Option<Position>, LookupError>;
}

/// Assignment lookups.
pub trait AssignmentReadModel: Send + Sync {
    /// Sum of FTE over the position's ACTIVE assignments.
    fn sum_active_fte(&self, tenant: TenantId, position_code: &str) -> Result<f64, LookupError>;

    /// One assignment by ID.
    fn assignment_by_id(&self, tenant: TenantId, id: Uuid) -> Result<Option<Assignment>, LookupError>;
}

/// Collapse "not found" errors into `Ok(None)`, keeping other failures.
pub(crate) fn found<T>(lookup: Result<Option<T>, LookupError>) -> Result<Option<T>, LookupError> {
    match lookup {
        Err(err) if err.is_not_found() => Ok(None),
        other => other,
    }
}
