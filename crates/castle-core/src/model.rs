//! # Read-Model Records
//!
//! Snapshots returned by read-model collaborators. Status fields are kept as
//! the raw text the backend stored: rules must be able to report an
//! unrecognized status verbatim, so parsing into the typed enums happens at
//! the point of use via the `parse` helpers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalize raw status text: trim and upper-case.
pub fn normalize_status(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// Lifecycle status of an organization unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    /// In operation.
    Active,
    /// Suspended, may be reactivated.
    Inactive,
    /// Scheduled but not yet in operation.
    Planned,
    /// Soft-deleted. Terminal.
    Deleted,
}

impl OrganizationStatus {
    /// All statuses.
    pub const ALL: [OrganizationStatus; 4] = [
        OrganizationStatus::Active,
        OrganizationStatus::Inactive,
        OrganizationStatus::Planned,
        OrganizationStatus::Deleted,
    ];

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Planned => "PLANNED",
            Self::Deleted => "DELETED",
        }
    }

    /// Parse status text, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_status(raw).as_str() {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "PLANNED" => Some(Self::Planned),
            "DELETED" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Statuses reachable from this one. `DELETED` has no outgoing
    /// transitions.
    pub fn allowed_transitions(&self) -> &'static [OrganizationStatus] {
        match self {
            Self::Active => &[Self::Inactive, Self::Deleted],
            Self::Inactive => &[Self::Active, Self::Deleted],
            Self::Planned => &[Self::Active, Self::Deleted],
            Self::Deleted => &[],
        }
    }

    /// Whether moving to `target` is permitted. Staying put always is.
    pub fn can_transition_to(&self, target: OrganizationStatus) -> bool {
        *self == target || self.allowed_transitions().contains(&target)
    }
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of organization unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    /// A department.
    Department,
    /// A generic organization unit.
    OrganizationUnit,
    /// A legal entity.
    Company,
    /// A temporary project team.
    ProjectTeam,
}

impl UnitType {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "DEPARTMENT",
            Self::OrganizationUnit => "ORGANIZATION_UNIT",
            Self::Company => "COMPANY",
            Self::ProjectTeam => "PROJECT_TEAM",
        }
    }

    /// Parse unit type text, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DEPARTMENT" => Some(Self::Department),
            "ORGANIZATION_UNIT" => Some(Self::OrganizationUnit),
            "COMPANY" => Some(Self::Company),
            "PROJECT_TEAM" => Some(Self::ProjectTeam),
            _ => None,
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current version of an organization unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Seven-digit business code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Unit type as stored.
    pub unit_type: String,
    /// Status as stored.
    pub status: String,
    /// Parent code, `None` for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
    /// Depth in the hierarchy; roots are level 1.
    pub level: u32,
    /// Start of validity of this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    /// End of validity, if closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Organization {
    /// Parsed status, `None` if the stored text is unrecognized.
    pub fn status(&self) -> Option<OrganizationStatus> {
        OrganizationStatus::parse(&self.status)
    }

    /// Whether the organization is currently ACTIVE.
    pub fn is_active(&self) -> bool {
        self.status() == Some(OrganizationStatus::Active)
    }
}

/// Lightweight hierarchy node used for ancestor chains and point-in-time
/// lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationNode {
    /// Business code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Status as stored.
    pub status: String,
    /// Depth in the hierarchy.
    pub level: u32,
    /// Start of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    /// End of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl OrganizationNode {
    /// Whether the node is ACTIVE.
    pub fn is_active(&self) -> bool {
        OrganizationStatus::parse(&self.status) == Some(OrganizationStatus::Active)
    }
}

// ---------------------------------------------------------------------------
// Position & Assignment
// ---------------------------------------------------------------------------

/// Lifecycle status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    /// Open for staffing.
    Active,
    /// Temporarily closed.
    Inactive,
    /// Scheduled.
    Planned,
    /// Soft-deleted.
    Deleted,
}

impl PositionStatus {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Planned => "PLANNED",
            Self::Deleted => "DELETED",
        }
    }

    /// Parse status text, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_status(raw).as_str() {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "PLANNED" => Some(Self::Planned),
            "DELETED" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// INACTIVE and DELETED positions accept no assignment changes.
    pub fn blocks_assignments(&self) -> bool {
        matches!(self, Self::Inactive | Self::Deleted)
    }
}

/// Current version of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Position code.
    pub code: String,
    /// Owning organization code.
    pub organization_code: String,
    /// Status as stored.
    pub status: String,
    /// Maximum total FTE the position can hold.
    pub headcount_capacity: f64,
    /// Job family group code.
    pub job_family_group_code: String,
    /// Job family code.
    pub job_family_code: String,
    /// Job role code.
    pub job_role_code: String,
    /// Job level code.
    pub job_level_code: String,
    /// Start of validity of this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
}

impl Position {
    /// Parsed status.
    pub fn status(&self) -> Option<PositionStatus> {
        PositionStatus::parse(&self.status)
    }

    /// Whether the position is INACTIVE or DELETED.
    pub fn blocks_assignments(&self) -> bool {
        self.status().is_some_and(|s| s.blocks_assignments())
    }
}

/// Lifecycle status of a position assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    /// Starts in the future.
    Pending,
    /// In effect.
    Active,
    /// Closed. Terminal.
    Ended,
}

impl AssignmentStatus {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Ended => "ENDED",
        }
    }

    /// Parse status text, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_status(raw).as_str() {
            "PENDING" => Some(Self::Pending),
            "ACTIVE" => Some(Self::Active),
            "ENDED" => Some(Self::Ended),
            _ => None,
        }
    }
}

/// A person's assignment to a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Assignment identifier.
    pub id: Uuid,
    /// Position the assignment belongs to.
    pub position_code: String,
    /// Status as stored.
    pub status: String,
    /// Full-time equivalent, in (0, 1].
    pub fte: f64,
    /// Start date.
    pub effective_date: NaiveDate,
}

impl Assignment {
    /// Parsed status.
    pub fn status(&self) -> Option<AssignmentStatus> {
        AssignmentStatus::parse(&self.status)
    }

    /// Whether the assignment has ended.
    pub fn is_ended(&self) -> bool {
        self.status() == Some(AssignmentStatus::Ended)
    }
}

// ---------------------------------------------------------------------------
// Job Catalog
// ---------------------------------------------------------------------------

/// The four levels of the job catalog, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogEntity {
    /// Top level. Has no parent.
    JobFamilyGroup,
    /// Child of a family group.
    JobFamily,
    /// Child of a family.
    JobRole,
    /// Child of a role.
    JobLevel,
}

impl CatalogEntity {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobFamilyGroup => "JOB_FAMILY_GROUP",
            Self::JobFamily => "JOB_FAMILY",
            Self::JobRole => "JOB_ROLE",
            Self::JobLevel => "JOB_LEVEL",
        }
    }

    /// Name used in messages and `catalogEntity` context entries.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::JobFamilyGroup => "JobFamilyGroup",
            Self::JobFamily => "JobFamily",
            Self::JobRole => "JobRole",
            Self::JobLevel => "JobLevel",
        }
    }

    /// Request field carrying this entity's code on position requests.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::JobFamilyGroup => "jobFamilyGroupCode",
            Self::JobFamily => "jobFamilyCode",
            Self::JobRole => "jobRoleCode",
            Self::JobLevel => "jobLevelCode",
        }
    }

    /// New versions of every level but the family group must link to the
    /// latest existing version.
    pub fn requires_parent(&self) -> bool {
        !matches!(self, Self::JobFamilyGroup)
    }
}

impl std::fmt::Display for CatalogEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current version of a job catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Catalog code.
    pub code: String,
    /// Version record ID.
    pub record_id: Uuid,
    /// Status as stored.
    pub status: String,
    /// Start of validity.
    pub effective_date: NaiveDate,
}

impl CatalogRecord {
    /// Whether the record is ACTIVE.
    pub fn is_active(&self) -> bool {
        normalize_status(&self.status) == "ACTIVE"
    }
}

/// One version in a job catalog entry's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// Version record ID.
    pub record_id: Uuid,
    /// Start of validity.
    pub effective_date: NaiveDate,
    /// End of validity, `None` for the open-ended latest version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Whether this is the version in effect today.
    pub is_current: bool,
    /// Status as stored.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_transition_table() {
        use OrganizationStatus::*;
        assert!(Active.can_transition_to(Inactive));
        assert!(Active.can_transition_to(Deleted));
        assert!(!Active.can_transition_to(Planned));
        assert!(Inactive.can_transition_to(Active));
        assert!(Planned.can_transition_to(Active));
        assert!(!Planned.can_transition_to(Inactive));
        assert!(!Deleted.can_transition_to(Active));
        assert!(Deleted.can_transition_to(Deleted));
    }

    #[test]
    fn status_parse_trims_and_ignores_case() {
        assert_eq!(OrganizationStatus::parse(" active "), Some(OrganizationStatus::Active));
        assert_eq!(OrganizationStatus::parse("ARCHIVED"), None);
        assert_eq!(AssignmentStatus::parse("ended"), Some(AssignmentStatus::Ended));
        assert_eq!(UnitType::parse("project_team"), Some(UnitType::ProjectTeam));
    }

    #[test]
    fn position_blocking_statuses() {
        assert!(PositionStatus::Inactive.blocks_assignments());
        assert!(PositionStatus::Deleted.blocks_assignments());
        assert!(!PositionStatus::Active.blocks_assignments());
        assert!(!PositionStatus::Planned.blocks_assignments());
    }

    #[test]
    fn only_family_group_has_no_parent() {
        assert!(!CatalogEntity::JobFamilyGroup.requires_parent());
        assert!(CatalogEntity::JobFamily.requires_parent());
        assert!(CatalogEntity::JobRole.requires_parent());
        assert!(CatalogEntity::JobLevel.requires_parent());
    }

    #[test]
    fn organization_deserializes_from_camel_case() {
        let org: Organization = serde_json::from_value(serde_json::json!({
            "code": "1000001",
            "name": "Engineering",
            "unitType": "DEPARTMENT",
            "status": "ACTIVE",
            "level": 2,
            "effectiveDate": "2024-01-01"
        }))
        .unwrap();
        assert!(org.is_active());
        assert_eq!(org.parent_code, None);
        assert_eq!(org.effective_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }
}
