//! # Organization Validator
//!
//! Request-level checks around the hierarchy chain for organization
//! create and update, plus the standalone temporal parent check.
//!
//! Requests are normalized in place: names and descriptions are trimmed,
//! unit types and statuses upper-cased, and blank codes dropped. Callers
//! persist the normalized request.

use std::sync::{Arc, LazyLock};

use castle_chain::{ChainOptions, ExecutionContext, NoopMetrics, ValidationChain, ValidationMetrics};
use castle_core::request::{CreateOrganizationRequest, UpdateOrganizationRequest};
use castle_core::result::OPERATION_KEY;
use castle_core::{
    normalize_status, parse_effective_date, OrganizationStatus, Severity, TenantId, UnitType,
    ValidationError, ValidationResult, ValidationWarning,
};
use chrono::NaiveDate;
use regex::Regex;
use tracing::{error, warn};

use crate::hierarchy::{invalid_parent, HierarchyLimits, HierarchyRules};
use crate::readmodel::{found, HierarchyReadModel};
use crate::subject::Subject;

/// Maximum organization name length, in characters.
pub const NAME_MAX_LENGTH: usize = 100;
/// Maximum description length, in characters.
pub const DESCRIPTION_MAX_LENGTH: usize = 500;
/// Largest accepted sort order.
pub const SORT_ORDER_MAX: i32 = 9999;

/// Parent code that marks a root unit.
pub const ROOT_PARENT_CODE: &str = "0";

const CREATE_OPERATION: &str = "CreateOrganization";
const UPDATE_OPERATION: &str = "UpdateOrganization";
const TEMPORAL_OPERATION: &str = "TemporalParentAvailability";

static CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{6}$").ok());
static PARENT_CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(0|[1-9][0-9]{6})$").ok());
static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}\s\-\(\)（）]+$").ok());

fn is_match(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Parent code that actually names another unit: trimmed, non-empty, and
/// not the root marker.
fn effective_parent(parent: Option<&str>) -> Option<&str> {
    parent
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != ROOT_PARENT_CODE)
}

/// Validates organization mutations.
#[derive(Clone)]
pub struct OrganizationValidator {
    read_model: Arc<dyn HierarchyReadModel>,
    rules: HierarchyRules,
    metrics: Arc<dyn ValidationMetrics>,
}

impl std::fmt::Debug for OrganizationValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizationValidator")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl OrganizationValidator {
    /// Validator with default limits and no metrics.
    pub fn new(read_model: Arc<dyn HierarchyReadModel>) -> Self {
        Self {
            rules: HierarchyRules::new(Arc::clone(&read_model)),
            read_model,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Override the depth limits.
    pub fn with_limits(mut self, limits: HierarchyLimits) -> Self {
        self.rules = self.rules.with_limits(limits);
        self
    }

    /// Record chain metrics through `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn ValidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn chain(&self, operation: &str) -> ValidationChain<Subject> {
        ValidationChain::new(
            ChainOptions::new()
                .with_operation(operation)
                .with_context(OPERATION_KEY, operation)
                .with_metrics(Arc::clone(&self.metrics)),
        )
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Validate an organization creation request.
    pub fn validate_creation(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        request: &mut CreateOrganizationRequest,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        validate_create_basics(request, &mut result);

        let self_referential = match (request.code.as_deref(), request.parent_code.as_deref()) {
            (Some(code), Some(parent)) => code.eq_ignore_ascii_case(parent),
            _ => false,
        };
        if self_referential {
            let parent = request.parent_code.clone().unwrap_or_default();
            result.add_error(
                ValidationError::new("ORG_CYCLE_DETECTED", "Organization cannot be its own parent")
                    .with_field("parentCode")
                    .with_severity(Severity::Critical)
                    .with_context("ruleId", crate::hierarchy::ORG_CIRC)
                    .with_context("attemptedParent", parent),
            );
            return result;
        }

        let parent = effective_parent(request.parent_code.as_deref()).map(String::from);
        if let Some(parent) = parent.as_deref() {
            match found(self.read_model.organization(tenant, parent)) {
                Ok(Some(existing)) => {
                    if let Ok(snapshot) = serde_json::to_value(&existing) {
                        result.set_context("parentOrganization", snapshot);
                    }
                    if matches!(
                        existing.status(),
                        Some(OrganizationStatus::Inactive | OrganizationStatus::Deleted)
                    ) {
                        result.add_warning(
                            ValidationWarning::new(
                                "PARENT_INACTIVE",
                                format!(
                                    "Parent organization status is {}, child units may be affected",
                                    existing.status
                                ),
                            )
                            .with_field("parentCode")
                            .with_value(existing.status.clone()),
                        );
                    }
                }
                Ok(None) => {
                    result.add_error(invalid_parent(parent));
                    return result;
                }
                Err(err) => {
                    error!(operation = CREATE_OPERATION, code = %parent, error = %err, "parent lookup failed");
                    result.add_error(invalid_parent(parent));
                    return result;
                }
            }
        }

        let chain = self.chain(CREATE_OPERATION);
        if let Some(parent) = parent.as_deref() {
            self.register(&chain, self.rules.depth_rule(parent).priority(10));
            if let Some(effective) = parsed_date(request.effective_date.as_deref()) {
                self.register(&chain, self.rules.temporal_rule(parent, effective).priority(15));
            }
        }
        let subject = Subject::OrganizationCreate {
            tenant,
            request: request.clone(),
        };
        result.merge(chain.execute(ctx, &subject));

        if let Some(code) = request.code.as_deref() {
            self.check_code_uniqueness(tenant, code, &mut result);
        }
        validate_temporal_data(
            request.effective_date.as_deref(),
            request.end_date.as_deref(),
            &mut result,
        );

        result.recompute_validity();
        result
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Validate a partial update of organization `code`.
    pub fn validate_update(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &mut UpdateOrganizationRequest,
    ) -> ValidationResult {
        let code = code.trim();
        let mut result = ValidationResult::new();

        let existing = match found(self.read_model.organization(tenant, code)) {
            Ok(Some(existing)) => existing,
            Ok(None) => return organization_not_found(code),
            Err(err) => {
                error!(operation = UPDATE_OPERATION, code = %code, error = %err, "organization lookup failed");
                return organization_not_found(code);
            }
        };
        if let Ok(snapshot) = serde_json::to_value(&existing) {
            result.set_context("existingOrganization", snapshot);
        }

        validate_update_basics(request, &mut result, &existing.status);
        if request.effective_date.is_some() || request.end_date.is_some() {
            validate_temporal_data(
                request.effective_date.as_deref(),
                request.end_date.as_deref(),
                &mut result,
            );
        }

        let chain = self.chain(UPDATE_OPERATION);
        let parent = effective_parent(request.parent_code.as_deref()).map(String::from);
        if let Some(parent) = parent.as_deref() {
            self.register(&chain, self.rules.depth_rule(parent).priority(10));
            self.register(&chain, self.rules.circular_rule(parent).priority(20));
        }
        if request.status.is_some() {
            self.register(&chain, self.rules.status_rule().priority(30));
        }
        if let Some(parent) = parent.as_deref() {
            let effective = match request.effective_date.as_deref() {
                Some(raw) => parse_effective_date(raw).ok(),
                None => existing.effective_date,
            };
            if let Some(effective) = effective {
                self.register(&chain, self.rules.temporal_rule(parent, effective).priority(25));
            }
        }

        let subject = Subject::OrganizationUpdate {
            tenant,
            code: code.to_string(),
            request: request.clone(),
            existing,
        };
        result.merge(chain.execute(ctx, &subject));
        result.recompute_validity();
        result
    }

    // -----------------------------------------------------------------------
    // Temporal parent availability
    // -----------------------------------------------------------------------

    /// Check that `parent_code` is ACTIVE on `effective_date`.
    pub fn validate_temporal_parent_availability(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        parent_code: &str,
        effective_date: NaiveDate,
    ) -> ValidationResult {
        let chain = self.chain(TEMPORAL_OPERATION);
        self.register(
            &chain,
            self.rules.temporal_rule(parent_code, effective_date).priority(10),
        );
        chain.execute(ctx, &Subject::TemporalParent { tenant })
    }

    fn register(&self, chain: &ValidationChain<Subject>, rule: castle_chain::Rule<Subject>) {
        let rule_id = rule.id().to_string();
        if let Err(err) = chain.register(rule) {
            error!(rule_id = %rule_id, error = %err, "rule registration failed");
        }
    }

    fn check_code_uniqueness(&self, tenant: TenantId, code: &str, result: &mut ValidationResult) {
        match found(self.read_model.organization(tenant, code)) {
            Ok(Some(_)) => result.add_error(
                ValidationError::new("DUPLICATE_CODE", format!("Organization code {code} already exists"))
                    .with_field("code")
                    .with_value(code)
                    .with_severity(Severity::High),
            ),
            Ok(None) => {}
            Err(err) => {
                warn!(operation = CREATE_OPERATION, code = %code, error = %err, "code uniqueness check skipped");
            }
        }
    }
}

fn organization_not_found(code: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.add_error(
        ValidationError::new("ORGANIZATION_NOT_FOUND", format!("Organization {code} does not exist"))
            .with_value(code)
            .with_severity(Severity::Critical),
    );
    result
}

fn parsed_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|r| parse_effective_date(r).ok())
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

fn high(code: &str, message: impl Into<String>, field: &str) -> ValidationError {
    ValidationError::new(code, message)
        .with_field(field)
        .with_severity(Severity::High)
}

fn check_name(name: &str, result: &mut ValidationResult) {
    if name.is_empty() {
        result.add_error(high("ORG_NAME_REQUIRED", "Organization name is required", "name"));
        return;
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        result.add_error(high(
            "ORG_NAME_TOO_LONG",
            format!("Organization name must not exceed {NAME_MAX_LENGTH} characters"),
            "name",
        ));
    }
    if !is_match(&NAME_PATTERN, name) {
        result.add_error(high(
            "ORG_NAME_INVALID",
            "Organization name may only contain letters, digits, spaces, hyphens and parentheses",
            "name",
        ));
    }
}

/// Returns the upper-cased unit type when valid.
fn check_unit_type(raw: &str, result: &mut ValidationResult) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        result.add_error(high("ORG_UNIT_TYPE_REQUIRED", "Unit type is required", "unitType"));
        return None;
    }
    match UnitType::parse(trimmed) {
        Some(unit_type) => Some(unit_type.as_str().to_string()),
        None => {
            result.add_error(
                high("ORG_UNIT_TYPE_INVALID", format!("Invalid unit type: {trimmed}"), "unitType")
                    .with_value(trimmed),
            );
            None
        }
    }
}

/// Returns the trimmed parent code, or `None` when blank or malformed.
fn check_parent_code(raw: &str, result: &mut ValidationResult) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !is_match(&PARENT_CODE_PATTERN, trimmed) {
        result.add_error(
            high(
                "ORG_PARENT_INVALID",
                "Parent code must be 0 or a 7-digit code not starting with 0",
                "parentCode",
            )
            .with_value(trimmed),
        );
        return None;
    }
    Some(trimmed.to_string())
}

fn check_sort_order(sort_order: i32, result: &mut ValidationResult) {
    if !(0..=SORT_ORDER_MAX).contains(&sort_order) {
        result.add_error(
            high(
                "ORG_SORT_ORDER_INVALID",
                format!("Sort order must be between 0 and {SORT_ORDER_MAX}"),
                "sortOrder",
            )
            .with_value(sort_order),
        );
    }
}

fn check_description(description: &str, result: &mut ValidationResult) {
    if description.chars().count() > DESCRIPTION_MAX_LENGTH {
        result.add_error(high(
            "ORG_DESCRIPTION_TOO_LONG",
            format!("Description must not exceed {DESCRIPTION_MAX_LENGTH} characters"),
            "description",
        ));
    }
}

fn validate_create_basics(request: &mut CreateOrganizationRequest, result: &mut ValidationResult) {
    request.name = request.name.trim().to_string();
    check_name(&request.name, result);

    if let Some(unit_type) = check_unit_type(&request.unit_type, result) {
        request.unit_type = unit_type;
    }

    request.code = match request.code.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) if !is_match(&CODE_PATTERN, code) => {
            result.add_error(
                high(
                    "ORG_CODE_INVALID",
                    "Organization code must be 7 digits not starting with 0",
                    "code",
                )
                .with_value(code),
            );
            Some(code.to_string())
        }
        Some(code) => Some(code.to_string()),
    };

    request.parent_code = request
        .parent_code
        .as_deref()
        .and_then(|raw| check_parent_code(raw, result));

    check_sort_order(request.sort_order, result);

    request.description = request.description.trim().to_string();
    check_description(&request.description, result);
}

fn validate_update_basics(
    request: &mut UpdateOrganizationRequest,
    result: &mut ValidationResult,
    existing_status: &str,
) {
    if let Some(name) = request.name.as_deref() {
        let trimmed = name.trim().to_string();
        check_name(&trimmed, result);
        if !trimmed.is_empty() {
            request.name = Some(trimmed);
        }
    }

    if let Some(raw) = request.unit_type.as_deref() {
        if let Some(unit_type) = check_unit_type(raw, result) {
            request.unit_type = Some(unit_type);
        }
    }

    request.parent_code = request
        .parent_code
        .as_deref()
        .and_then(|raw| check_parent_code(raw, result));

    if let Some(sort_order) = request.sort_order {
        check_sort_order(sort_order, result);
    }

    if let Some(raw) = request.status.as_deref() {
        let status = normalize_status(raw);
        if status.is_empty() {
            result.add_error(high("ORG_STATUS_REQUIRED", "Status is required", "status"));
        } else if OrganizationStatus::parse(&status).is_none() {
            result.add_error(
                high("ORG_STATUS_INVALID", format!("Invalid organization status: {status}"), "status")
                    .with_value(status),
            );
        } else {
            request.status = Some(status);
        }
    }

    if let Some(description) = request.description.as_deref() {
        let trimmed = description.trim().to_string();
        check_description(&trimmed, result);
        request.description = Some(trimmed);
    }

    if request.status.is_none() {
        result.set_context("existingStatus", normalize_status(existing_status));
    }
}

fn validate_temporal_data(effective: Option<&str>, end: Option<&str>, result: &mut ValidationResult) {
    let Some(effective_raw) = effective.map(str::trim).filter(|r| !r.is_empty()) else {
        result.add_warning(
            ValidationWarning::new(
                "MISSING_EFFECTIVE_DATE",
                "No effective date given, the current date will be used",
            )
            .with_field("effectiveDate"),
        );
        return;
    };
    let Ok(effective) = parse_effective_date(effective_raw) else {
        result.add_error(
            high("INVALID_EFFECTIVE_DATE", "effectiveDate must follow format YYYY-MM-DD", "effectiveDate")
                .with_value(effective_raw),
        );
        return;
    };

    let Some(end_raw) = end.map(str::trim).filter(|r| !r.is_empty()) else {
        return;
    };
    match parse_effective_date(end_raw) {
        Err(_) => result.add_error(
            high("INVALID_END_DATE", "endDate must follow format YYYY-MM-DD", "endDate").with_value(end_raw),
        ),
        Ok(end) if end < effective => result.add_error(
            ValidationError::new("TEMPORAL_CONFLICT", "End date must not be before the effective date")
                .with_field("endDate")
                .with_value(end_raw)
                .with_severity(Severity::Medium),
        ),
        Ok(_) => {}
    }
}
