//! # Organization Hierarchy Rules
//!
//! ORG-DEPTH, ORG-CIRC, ORG-STATUS and ORG-TEMPORAL. Each builder returns a
//! [`Rule`] with its severity and stop behaviour set; the caller assigns the
//! priority for the operation it is assembling.
//!
//! The parent code and effective date are bound into the handler when the
//! rule is built, so the same subject can be evaluated against different
//! candidate parents.

use std::sync::Arc;

use castle_chain::{Rule, RuleError, RuleOutcome};
use castle_core::{
    format_date, normalize_status, OrganizationStatus, Severity, TenantId, ValidationError,
    ValidationWarning,
};
use chrono::NaiveDate;

use crate::readmodel::HierarchyReadModel;
use crate::subject::Subject;

/// ORG-DEPTH rule ID.
pub const ORG_DEPTH: &str = "ORG-DEPTH";
/// ORG-CIRC rule ID.
pub const ORG_CIRC: &str = "ORG-CIRC";
/// ORG-STATUS rule ID.
pub const ORG_STATUS: &str = "ORG-STATUS";
/// ORG-TEMPORAL rule ID.
pub const ORG_TEMPORAL: &str = "ORG-TEMPORAL";

/// Default maximum hierarchy depth.
pub const DEFAULT_MAX_DEPTH: u32 = 17;
/// Default depth at which a warning is raised.
pub const DEFAULT_DEPTH_WARNING: u32 = 15;

const PARENT_FIELD: &str = "parentCode";

/// Depth limits for the organization tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyLimits {
    /// Deepest level a unit may occupy.
    pub max_depth: u32,
    /// Level from which placements draw a warning.
    pub warning_threshold: u32,
}

impl Default for HierarchyLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            warning_threshold: DEFAULT_DEPTH_WARNING,
        }
    }
}

/// Builds the hierarchy rules over a shared read model.
#[derive(Clone)]
pub struct HierarchyRules {
    read_model: Arc<dyn HierarchyReadModel>,
    limits: HierarchyLimits,
}

impl std::fmt::Debug for HierarchyRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyRules")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl HierarchyRules {
    /// Rules with the default limits.
    pub fn new(read_model: Arc<dyn HierarchyReadModel>) -> Self {
        Self {
            read_model,
            limits: HierarchyLimits::default(),
        }
    }

    /// Override the depth limits.
    pub fn with_limits(mut self, limits: HierarchyLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Configured limits.
    pub fn limits(&self) -> HierarchyLimits {
        self.limits
    }

    /// ORG-DEPTH: placing a unit under `parent_code` must not exceed the
    /// maximum depth. Warns from the warning threshold upward.
    pub fn depth_rule(&self, parent_code: &str) -> Rule<Subject> {
        let read_model = Arc::clone(&self.read_model);
        let limits = self.limits;
        let parent = parent_code.trim().to_string();
        Rule::new(ORG_DEPTH)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(move |_, subject: &Subject| {
                let tenant = match subject {
                    Subject::OrganizationCreate { tenant, .. }
                    | Subject::OrganizationUpdate { tenant, .. } => *tenant,
                    other => return Err(other.unsupported(ORG_DEPTH, "OrganizationCreate|OrganizationUpdate")),
                };
                evaluate_depth(read_model.as_ref(), limits, tenant, &parent)
            })
    }

    /// ORG-CIRC: the new parent must be neither the unit itself nor one of
    /// its descendants. Update only.
    pub fn circular_rule(&self, parent_code: &str) -> Rule<Subject> {
        let read_model = Arc::clone(&self.read_model);
        let parent = parent_code.trim().to_string();
        Rule::new(ORG_CIRC)
            .severity(Severity::Critical)
            .short_circuit(true)
            .handler(move |_, subject: &Subject| {
                let Subject::OrganizationUpdate { tenant, code, .. } = subject else {
                    return Err(subject.unsupported(ORG_CIRC, "OrganizationUpdate"));
                };
                if parent.is_empty() {
                    return Ok(None);
                }
                if parent.eq_ignore_ascii_case(code) {
                    return Ok(Some(RuleOutcome::error(
                        ValidationError::new("ORG_CYCLE_DETECTED", "Organization cannot be its own parent")
                            .with_field(PARENT_FIELD)
                            .with_context("attemptedParent", parent.as_str()),
                    )));
                }

                let ancestors = match read_model.ancestor_chain(*tenant, &parent) {
                    Ok(ancestors) => ancestors,
                    Err(err) if err.is_not_found() => {
                        return Ok(Some(RuleOutcome::error(invalid_parent(&parent))));
                    }
                    Err(err) => return Err(RuleError::lookup("fetch ancestor chain", err)),
                };

                let cycle = ancestors
                    .iter()
                    .find(|ancestor| ancestor.code.eq_ignore_ascii_case(code));
                Ok(cycle.map(|ancestor| {
                    RuleOutcome::error(
                        ValidationError::new(
                            "ORG_CYCLE_DETECTED",
                            format!("Detected circular reference: {code} -> {parent}"),
                        )
                        .with_field(PARENT_FIELD)
                        .with_context("attemptedParent", parent.as_str())
                        .with_context("ancestorDetected", ancestor.code.as_str()),
                    )
                }))
            })
    }

    /// ORG-STATUS: requested status changes must follow the transition
    /// table. Update only.
    pub fn status_rule(&self) -> Rule<Subject> {
        Rule::new(ORG_STATUS)
            .severity(Severity::Critical)
            .handler(|_, subject: &Subject| {
                let Subject::OrganizationUpdate {
                    request, existing, ..
                } = subject
                else {
                    return Err(subject.unsupported(ORG_STATUS, "OrganizationUpdate"));
                };
                let Some(requested) = request.status.as_deref() else {
                    return Ok(None);
                };
                Ok(evaluate_status(&existing.status, requested))
            })
    }

    /// ORG-TEMPORAL: the parent must be ACTIVE on `effective_date`.
    pub fn temporal_rule(&self, parent_code: &str, effective_date: NaiveDate) -> Rule<Subject> {
        let read_model = Arc::clone(&self.read_model);
        let parent = parent_code.trim().to_string();
        Rule::new(ORG_TEMPORAL)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(move |_, subject: &Subject| {
                let tenant = match subject {
                    Subject::OrganizationCreate { tenant, .. }
                    | Subject::OrganizationUpdate { tenant, .. }
                    | Subject::TemporalParent { tenant } => *tenant,
                    other => {
                        return Err(other.unsupported(
                            ORG_TEMPORAL,
                            "OrganizationCreate|OrganizationUpdate|TemporalParent",
                        ))
                    }
                };
                if parent.is_empty() {
                    return Ok(None);
                }

                let node = match read_model.organization_at(tenant, &parent, effective_date) {
                    Ok(node) => node,
                    Err(err) if err.is_not_found() => {
                        return Ok(Some(RuleOutcome::error(invalid_parent(&parent))));
                    }
                    Err(err) => return Err(RuleError::lookup("fetch temporal parent", err)),
                };

                if node.as_ref().is_some_and(|n| n.is_active()) {
                    return Ok(None);
                }
                let day = format_date(effective_date);
                Ok(Some(RuleOutcome::error(
                    ValidationError::new(
                        "ORG_TEMPORAL_PARENT_INACTIVE",
                        format!("Parent {parent} is not active at {day}"),
                    )
                    .with_field(PARENT_FIELD)
                    .with_context("parentCode", parent.as_str())
                    .with_context("effective", day),
                )))
            })
    }
}

fn evaluate_depth(
    read_model: &dyn HierarchyReadModel,
    limits: HierarchyLimits,
    tenant: TenantId,
    parent: &str,
) -> Result<Option<RuleOutcome>, RuleError> {
    let depth = match read_model.organization_depth(tenant, parent) {
        Ok(depth) => depth,
        Err(err) if err.is_not_found() => return Ok(Some(RuleOutcome::error(invalid_parent(parent)))),
        Err(err) => return Err(RuleError::lookup("fetch parent depth", err)),
    };
    let attempted = depth.saturating_add(1);

    if attempted > limits.max_depth {
        return Ok(Some(RuleOutcome::error(
            ValidationError::new(
                "ORG_DEPTH_LIMIT",
                format!(
                    "Organization depth exceeds maximum of {} levels",
                    limits.max_depth
                ),
            )
            .with_field(PARENT_FIELD)
            .with_context("maxDepth", limits.max_depth)
            .with_context("attemptedDepth", attempted),
        )));
    }

    if attempted >= limits.warning_threshold {
        return Ok(Some(
            RuleOutcome::warning(
                ValidationWarning::new(
                    "ORG_DEPTH_NEAR_LIMIT",
                    format!(
                        "Organization depth is near the limit ({attempted}/{})",
                        limits.max_depth
                    ),
                )
                .with_field(PARENT_FIELD)
                .with_value(attempted),
            )
            .with_context("attemptedDepth", attempted),
        ));
    }

    Ok(None)
}

fn evaluate_status(current_raw: &str, requested_raw: &str) -> Option<RuleOutcome> {
    let current = normalize_status(current_raw);
    let requested = normalize_status(requested_raw);
    if current.is_empty() || requested.is_empty() || current == requested {
        return None;
    }

    let guard = |message: String| {
        RuleOutcome::error(
            ValidationError::new("ORG_STATUS_GUARD", message)
                .with_field("status")
                .with_context("currentStatus", current.as_str())
                .with_context("requestedStatus", requested.as_str()),
        )
    };

    let from = OrganizationStatus::parse(&current).filter(|s| !s.allowed_transitions().is_empty());
    let Some(from) = from else {
        return Some(guard(format!("Unsupported current status {current} for transition")));
    };
    match OrganizationStatus::parse(&requested) {
        Some(to) if from.can_transition_to(to) => None,
        _ => Some(guard(format!("Cannot transition from {current} to {requested}"))),
    }
}

pub(crate) fn invalid_parent(parent: &str) -> ValidationError {
    ValidationError::new(
        "INVALID_PARENT",
        format!("Parent organization {parent} does not exist"),
    )
    .with_field(PARENT_FIELD)
    .with_severity(Severity::High)
}
