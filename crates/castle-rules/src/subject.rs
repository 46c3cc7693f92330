//! # Rule Subjects
//!
//! The closed set of inputs rule handlers evaluate. Validator services load
//! read-model state up front and pack it into a [`Subject`]; rules match the
//! variants they understand and fault with
//! [`RuleError::UnsupportedSubject`] on anything else.

use castle_chain::RuleError;
use castle_core::request::{
    CreateOrganizationRequest, PositionRequest, TransferPositionRequest, UpdateOrganizationRequest,
};
use castle_core::{Assignment, CatalogEntity, Organization, Position, TenantId, TimelineEntry};
use chrono::NaiveDate;
use uuid::Uuid;

/// Assignment being created, either by filling a position or through the
/// assignment API.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCreationSubject {
    /// Tenant scope.
    pub tenant: TenantId,
    /// Current version of the target position.
    pub position: Position,
    /// Organization owning the position.
    pub organization: Organization,
    /// FTE already held by ACTIVE assignments.
    pub current_fte: f64,
    /// FTE the new assignment asks for.
    pub requested_fte: f64,
    /// Start date, if the request carried a parseable one.
    pub effective_date: Option<NaiveDate>,
}

/// Change to an existing assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentUpdateSubject {
    /// Tenant scope.
    pub tenant: TenantId,
    /// Current version of the position.
    pub position: Position,
    /// Organization owning the position.
    pub organization: Organization,
    /// The assignment as stored.
    pub assignment: Assignment,
    /// FTE held by ACTIVE assignments, including this one.
    pub current_fte: f64,
    /// FTE after the update.
    pub requested_fte: f64,
    /// FTE before the update.
    pub original_fte: f64,
}

/// Closing an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCloseSubject {
    /// Tenant scope.
    pub tenant: TenantId,
    /// The assignment as stored.
    pub assignment: Assignment,
}

/// New version of a job catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCatalogVersionSubject {
    /// Tenant scope.
    pub tenant: TenantId,
    /// Normalized catalog code.
    pub code: String,
    /// Catalog level.
    pub entity: CatalogEntity,
    /// Requested start of validity.
    pub effective_date: NaiveDate,
    /// Existing versions, oldest first.
    pub timeline: Vec<TimelineEntry>,
    /// Version the caller believes is the latest.
    pub parent_record_id: Option<Uuid>,
}

impl JobCatalogVersionSubject {
    /// The latest existing version.
    pub fn latest(&self) -> Option<&TimelineEntry> {
        self.timeline.last()
    }
}

/// Input to one chain execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// Organization creation.
    OrganizationCreate {
        /// Tenant scope.
        tenant: TenantId,
        /// Normalized request.
        request: CreateOrganizationRequest,
    },
    /// Organization update.
    OrganizationUpdate {
        /// Tenant scope.
        tenant: TenantId,
        /// Code of the organization being updated.
        code: String,
        /// Normalized request.
        request: UpdateOrganizationRequest,
        /// The organization as stored.
        existing: Organization,
    },
    /// Standalone check that a parent is active on a date.
    TemporalParent {
        /// Tenant scope.
        tenant: TenantId,
    },
    /// Position creation.
    PositionCreate {
        /// Tenant scope.
        tenant: TenantId,
        /// Request payload.
        request: PositionRequest,
    },
    /// Replacement of a position's current version.
    PositionReplace {
        /// Tenant scope.
        tenant: TenantId,
        /// Position code.
        code: String,
        /// Request payload.
        request: PositionRequest,
    },
    /// New position version.
    PositionVersion {
        /// Tenant scope.
        tenant: TenantId,
        /// Position code.
        code: String,
        /// Organization of the current version, if the position exists.
        organization_code: Option<String>,
    },
    /// Position transfer.
    PositionTransfer {
        /// Tenant scope.
        tenant: TenantId,
        /// Position code.
        code: String,
        /// Request payload with a trimmed target.
        request: TransferPositionRequest,
    },
    /// Filling a position.
    PositionFill(AssignmentCreationSubject),
    /// Creating an assignment.
    AssignmentCreate(AssignmentCreationSubject),
    /// Updating an assignment.
    AssignmentUpdate(AssignmentUpdateSubject),
    /// Closing an assignment.
    AssignmentClose(AssignmentCloseSubject),
    /// New job catalog version.
    JobCatalogVersion(JobCatalogVersionSubject),
}

impl Subject {
    /// Variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrganizationCreate { .. } => "OrganizationCreate",
            Self::OrganizationUpdate { .. } => "OrganizationUpdate",
            Self::TemporalParent { .. } => "TemporalParent",
            Self::PositionCreate { .. } => "PositionCreate",
            Self::PositionReplace { .. } => "PositionReplace",
            Self::PositionVersion { .. } => "PositionVersion",
            Self::PositionTransfer { .. } => "PositionTransfer",
            Self::PositionFill(_) => "PositionFill",
            Self::AssignmentCreate(_) => "AssignmentCreate",
            Self::AssignmentUpdate(_) => "AssignmentUpdate",
            Self::AssignmentClose(_) => "AssignmentClose",
            Self::JobCatalogVersion(_) => "JobCatalogVersion",
        }
    }

    /// Operation name reported in rule diagnostics.
    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::OrganizationCreate { .. } => "CreateOrganization",
            Self::OrganizationUpdate { .. } => "UpdateOrganization",
            Self::TemporalParent { .. } => "TemporalParentAvailability",
            Self::PositionCreate { .. } => "CreatePosition",
            Self::PositionReplace { .. } => "ReplacePosition",
            Self::PositionVersion { .. } => "CreatePositionVersion",
            Self::PositionTransfer { .. } => "TransferPosition",
            Self::PositionFill(_) => "FillPosition",
            Self::AssignmentCreate(_) => "CreateAssignment",
            Self::AssignmentUpdate(_) => "UpdateAssignment",
            Self::AssignmentClose(_) => "CloseAssignment",
            Self::JobCatalogVersion(_) => "CreateJobCatalogVersion",
        }
    }

    /// Tenant the subject is scoped to.
    pub fn tenant_id(&self) -> TenantId {
        match self {
            Self::OrganizationCreate { tenant, .. }
            | Self::OrganizationUpdate { tenant, .. }
            | Self::TemporalParent { tenant }
            | Self::PositionCreate { tenant, .. }
            | Self::PositionReplace { tenant, .. }
            | Self::PositionVersion { tenant, .. }
            | Self::PositionTransfer { tenant, .. } => *tenant,
            Self::PositionFill(s) | Self::AssignmentCreate(s) => s.tenant,
            Self::AssignmentUpdate(s) => s.tenant,
            Self::AssignmentClose(s) => s.tenant,
            Self::JobCatalogVersion(s) => s.tenant,
        }
    }

    /// Fault returned by a rule that does not handle this variant.
    pub fn unsupported(&self, rule_id: &str, expected: &'static str) -> RuleError {
        RuleError::UnsupportedSubject {
            rule_id: rule_id.to_string(),
            expected,
            actual: self.kind(),
        }
    }
}
