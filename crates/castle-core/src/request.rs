//! # Mutation Requests
//!
//! Request payloads the validators inspect. They mirror the JSON bodies the
//! API layer accepts (camelCase on the wire). Dates stay as text here so that
//! validators can report malformed input instead of failing deserialization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// Create an organization unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    /// Requested code. `None` lets the backend allocate one.
    #[serde(default)]
    pub code: Option<String>,
    /// Parent code; `"0"` or absent for a root.
    #[serde(default)]
    pub parent_code: Option<String>,
    /// Display name.
    pub name: String,
    /// Unit type text.
    pub unit_type: String,
    /// Sibling ordering.
    #[serde(default)]
    pub sort_order: i32,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Start of validity, `YYYY-MM-DD`.
    #[serde(default)]
    pub effective_date: Option<String>,
    /// End of validity, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Partial update of an organization unit. Absent fields are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New unit type.
    #[serde(default)]
    pub unit_type: Option<String>,
    /// New parent code.
    #[serde(default)]
    pub parent_code: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<String>,
    /// New sibling ordering.
    #[serde(default)]
    pub sort_order: Option<i32>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New start of validity.
    #[serde(default)]
    pub effective_date: Option<String>,
    /// New end of validity.
    #[serde(default)]
    pub end_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Create a position, or replace the current version of one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRequest {
    /// Position title.
    pub title: String,
    /// Job family group code.
    pub job_family_group_code: String,
    /// Job family code.
    pub job_family_code: String,
    /// Job role code.
    pub job_role_code: String,
    /// Job level code.
    pub job_level_code: String,
    /// Owning organization code.
    pub organization_code: String,
    /// Position type.
    #[serde(default)]
    pub position_type: String,
    /// Employment type.
    #[serde(default)]
    pub employment_type: String,
    /// Requested status.
    #[serde(default)]
    pub status: Option<String>,
    /// Maximum total FTE.
    pub headcount_capacity: f64,
    /// Start of validity.
    pub effective_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// Insert a new version of an existing position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionVersionRequest {
    /// Position title.
    pub title: String,
    /// Job family group code.
    pub job_family_group_code: String,
    /// Job family code.
    pub job_family_code: String,
    /// Job role code.
    pub job_role_code: String,
    /// Job level code.
    pub job_level_code: String,
    /// New maximum total FTE.
    #[serde(default)]
    pub headcount_capacity: Option<f64>,
    /// Start of validity.
    pub effective_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// Move a position to another organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPositionRequest {
    /// Destination organization code.
    pub target_organization_code: String,
    /// Start of validity.
    pub effective_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// Activate, suspend or delete a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEventRequest {
    /// Event name.
    pub event_type: String,
    /// Version the event applies to.
    #[serde(default)]
    pub record_id: Option<String>,
    /// Start of validity.
    pub effective_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// Release an assignment from a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacatePositionRequest {
    /// Assignment to end.
    pub assignment_id: Uuid,
    /// Date the position becomes vacant.
    pub effective_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Fill a position with an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillPositionRequest {
    /// Employee being assigned.
    pub employee_id: Uuid,
    /// Employee display name.
    pub employee_name: String,
    /// Assignment type (PRIMARY, SECONDARY, ACTING).
    pub assignment_type: String,
    /// Requested FTE; 1.0 when absent.
    #[serde(default)]
    pub fte: Option<f64>,
    /// Assignment start date.
    pub effective_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// Create an assignment through the assignment API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    /// Employee being assigned.
    pub employee_id: Uuid,
    /// Employee display name.
    pub employee_name: String,
    /// Assignment type.
    pub assignment_type: String,
    /// Requested FTE; 1.0 when absent.
    #[serde(default)]
    pub fte: Option<f64>,
    /// Assignment start date.
    pub effective_date: String,
    /// Last day of an acting assignment.
    #[serde(default)]
    pub acting_until: Option<String>,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// Adjust an existing assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    /// New FTE; the current FTE is kept when absent.
    #[serde(default)]
    pub fte: Option<f64>,
    /// New acting end date.
    #[serde(default)]
    pub acting_until: Option<String>,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

/// End an assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseAssignmentRequest {
    /// Last day of the assignment.
    pub end_date: String,
    /// Why the change is made.
    #[serde(default)]
    pub operation_reason: String,
}

// ---------------------------------------------------------------------------
// Job Catalog
// ---------------------------------------------------------------------------

/// Add a version to a job catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCatalogVersionRequest {
    /// Version name.
    #[serde(default)]
    pub name: String,
    /// Requested status.
    #[serde(default)]
    pub status: String,
    /// Start of validity, `YYYY-MM-DD`.
    pub effective_date: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}
