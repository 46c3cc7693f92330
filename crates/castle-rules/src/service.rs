//! # Validation Service Seams
//!
//! What the command services call before mutating state. Each method builds
//! a fresh chain, runs it, and hands back the result; turning an invalid
//! result into an error is the caller's choice (see
//! [`castle_core::ValidationResult::into_failure`]).

use castle_chain::ExecutionContext;
use castle_core::request::{
    CloseAssignmentRequest, CreateAssignmentRequest, FillPositionRequest, JobCatalogVersionRequest,
    PositionEventRequest, PositionRequest, PositionVersionRequest, TransferPositionRequest,
    UpdateAssignmentRequest, VacatePositionRequest,
};
use castle_core::{TenantId, ValidationResult};
use uuid::Uuid;

/// Position mutations.
pub trait PositionValidationService: Send + Sync {
    /// Create a position.
    fn validate_create_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        request: &PositionRequest,
    ) -> ValidationResult;

    /// Replace the current version of position `code`.
    fn validate_replace_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &PositionRequest,
    ) -> ValidationResult;

    /// Insert a new version of position `code`.
    fn validate_create_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &PositionVersionRequest,
    ) -> ValidationResult;

    /// Fill position `code` with an employee.
    fn validate_fill_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &FillPositionRequest,
    ) -> ValidationResult;

    /// Vacate position `code`.
    fn validate_vacate_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &VacatePositionRequest,
    ) -> ValidationResult;

    /// Move position `code` to another organization.
    fn validate_transfer_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &TransferPositionRequest,
    ) -> ValidationResult;

    /// Apply a lifecycle event to position `code`.
    fn validate_apply_event(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &PositionEventRequest,
    ) -> ValidationResult;
}

/// Assignment mutations.
pub trait AssignmentValidationService: Send + Sync {
    /// Create an assignment on `position_code`.
    fn validate_create_assignment(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        position_code: &str,
        request: &CreateAssignmentRequest,
    ) -> ValidationResult;

    /// Update assignment `assignment_id` on `position_code`.
    fn validate_update_assignment(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        position_code: &str,
        assignment_id: Uuid,
        request: &UpdateAssignmentRequest,
    ) -> ValidationResult;

    /// Close assignment `assignment_id` on `position_code`.
    fn validate_close_assignment(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        position_code: &str,
        assignment_id: Uuid,
        request: &CloseAssignmentRequest,
    ) -> ValidationResult;
}

/// Job catalog version creation.
pub trait JobCatalogValidationService: Send + Sync {
    /// New job family group version.
    fn validate_create_family_group_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
    ) -> ValidationResult;

    /// New job family version linked to `parent_record_id`.
    fn validate_create_job_family_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
        parent_record_id: Option<Uuid>,
    ) -> ValidationResult;

    /// New job role version linked to `parent_record_id`.
    fn validate_create_job_role_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
        parent_record_id: Option<Uuid>,
    ) -> ValidationResult;

    /// New job level version linked to `parent_record_id`.
    fn validate_create_job_level_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
        parent_record_id: Option<Uuid>,
    ) -> ValidationResult;
}
