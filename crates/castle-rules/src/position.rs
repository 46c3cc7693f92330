//! # Position & Assignment Rules
//!
//! Rule builders for position mutations (POS-ORG, POS-JC-LINK) and
//! assignment mutations (ASSIGN-FTE, ASSIGN-STATE, CROSS-ACTIVE,
//! POS-HEADCOUNT), and the [`PositionAssignmentValidator`] that wires them
//! into per-operation chains.
//!
//! ## Chains
//!
//! | Operation                     | Rules (priority)                                        |
//! |-------------------------------|---------------------------------------------------------|
//! | create / replace position     | POS-ORG (10), POS-JC-LINK (20)                          |
//! | create version, transfer      | POS-ORG (10)                                            |
//! | fill position / create assign | ASSIGN-FTE (5), ASSIGN-STATE (8), CROSS-ACTIVE (10), POS-HEADCOUNT (20) |
//! | update assignment             | ASSIGN-FTE (5), ASSIGN-STATE (8), POS-HEADCOUNT (15)    |
//! | close assignment              | ASSIGN-STATE (10)                                       |
//!
//! Assignment operations load the position, its organization and the
//! active FTE before the chain runs. If the position or organization does
//! not exist the validator returns a valid, empty result and leaves the
//! not-found response to the caller. If the lookup itself fails the result
//! carries `POSITION_CONTEXT_UNAVAILABLE`.

use std::sync::Arc;

use castle_chain::{
    ChainOptions, ExecutionContext, NoopMetrics, Rule, RuleError, RuleOutcome, ValidationChain,
    ValidationMetrics,
};
use castle_core::request::{
    CloseAssignmentRequest, CreateAssignmentRequest, FillPositionRequest, PositionEventRequest,
    PositionRequest, PositionVersionRequest, TransferPositionRequest, UpdateAssignmentRequest,
    VacatePositionRequest,
};
use castle_core::result::{EXECUTED_RULES_KEY, INTERNAL_KEY, OPERATION_KEY};
use castle_core::{
    normalize_status, parse_effective_date, AssignmentStatus, CatalogEntity, CatalogRecord,
    ContextMap, LookupError, Organization, Position, Severity, TenantId, ValidationError,
    ValidationResult,
};
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use crate::readmodel::{
    found, AssignmentReadModel, JobCatalogReadModel, OrganizationReadModel, PositionReadModel,
};
use crate::service::{AssignmentValidationService, PositionValidationService};
use crate::subject::{
    AssignmentCloseSubject, AssignmentCreationSubject, AssignmentUpdateSubject, Subject,
};

/// POS-ORG rule ID.
pub const POS_ORG: &str = "POS-ORG";
/// POS-JC-LINK rule ID.
pub const POS_JC_LINK: &str = "POS-JC-LINK";
/// POS-HEADCOUNT rule ID.
pub const POS_HEADCOUNT: &str = "POS-HEADCOUNT";
/// ASSIGN-FTE rule ID.
pub const ASSIGN_FTE: &str = "ASSIGN-FTE";
/// ASSIGN-STATE rule ID.
pub const ASSIGN_STATE: &str = "ASSIGN-STATE";
/// CROSS-ACTIVE rule ID.
pub const CROSS_ACTIVE: &str = "CROSS-ACTIVE";

/// Code reported when position context cannot be loaded.
pub const POSITION_CONTEXT_UNAVAILABLE: &str = "POSITION_CONTEXT_UNAVAILABLE";

/// FTE assumed when a request omits it.
pub const DEFAULT_FTE: f64 = 1.0;

const FTE_TOLERANCE: f64 = 1e-9;
const ASSIGNMENT_SUBJECTS: &str = "PositionFill|AssignmentCreate|AssignmentUpdate";

// ---------------------------------------------------------------------------
// Rule builders
// ---------------------------------------------------------------------------

/// Builds the position and assignment rules.
#[derive(Clone)]
pub struct PositionRules {
    organizations: Arc<dyn OrganizationReadModel>,
    job_catalog: Arc<dyn JobCatalogReadModel>,
}

impl std::fmt::Debug for PositionRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionRules").finish_non_exhaustive()
    }
}

impl PositionRules {
    /// Rules over the given read models.
    pub fn new(
        organizations: Arc<dyn OrganizationReadModel>,
        job_catalog: Arc<dyn JobCatalogReadModel>,
    ) -> Self {
        Self {
            organizations,
            job_catalog,
        }
    }

    /// POS-ORG: the organization a position belongs to (or moves to) must
    /// exist and be ACTIVE.
    pub fn organization_rule(&self) -> Rule<Subject> {
        let organizations = Arc::clone(&self.organizations);
        Rule::new(POS_ORG)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(move |_, subject: &Subject| {
                let code = match subject {
                    Subject::PositionCreate { request, .. } | Subject::PositionReplace { request, .. } => {
                        request.organization_code.trim()
                    }
                    Subject::PositionVersion {
                        organization_code, ..
                    } => organization_code.as_deref().unwrap_or_default().trim(),
                    Subject::PositionTransfer { request, .. } => request.target_organization_code.trim(),
                    Subject::PositionFill(s) | Subject::AssignmentCreate(s) => {
                        s.position.organization_code.trim()
                    }
                    Subject::AssignmentUpdate(s) => s.position.organization_code.trim(),
                    other => return Err(other.unsupported(POS_ORG, "position or assignment subject")),
                };
                if code.is_empty() {
                    return Ok(None);
                }

                let organization = found(organizations.organization_by_code(subject.tenant_id(), code))
                    .map_err(|err| RuleError::lookup(format!("fetch organization {code}"), err))?;
                Ok(Some(organization_outcome(code, organization.as_ref())))
            })
    }

    /// POS-JC-LINK: every level of the job catalog chain the position
    /// references must exist and be ACTIVE. Checked outermost first; the
    /// first broken link is reported.
    pub fn job_catalog_rule(&self) -> Rule<Subject> {
        let job_catalog = Arc::clone(&self.job_catalog);
        Rule::new(POS_JC_LINK)
            .severity(Severity::Medium)
            .handler(move |_, subject: &Subject| {
                let (tenant, request) = match subject {
                    Subject::PositionCreate { tenant, request }
                    | Subject::PositionReplace {
                        tenant, request, ..
                    } => (*tenant, request),
                    other => return Err(other.unsupported(POS_JC_LINK, "PositionCreate|PositionReplace")),
                };

                for (entity, code) in catalog_links(request) {
                    let record = found(job_catalog.current(tenant, entity, code)).map_err(|err| {
                        RuleError::lookup(format!("fetch {}", entity.display_name()), err)
                    })?;
                    if !record.as_ref().is_some_and(CatalogRecord::is_active) {
                        return Ok(Some(RuleOutcome::error(job_catalog_violation(entity, code))));
                    }
                }

                Ok(Some(
                    RuleOutcome::new()
                        .with_context("jobFamilyGroup", request.job_family_group_code.as_str())
                        .with_context("jobFamily", request.job_family_code.as_str())
                        .with_context("jobRole", request.job_role_code.as_str())
                        .with_context("jobLevel", request.job_level_code.as_str()),
                ))
            })
    }

    /// ASSIGN-FTE: requested FTE must lie in `(0, 1]`.
    pub fn fte_rule() -> Rule<Subject> {
        Rule::new(ASSIGN_FTE)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(|_, subject: &Subject| {
                let requested = match subject {
                    Subject::PositionFill(s) | Subject::AssignmentCreate(s) => s.requested_fte,
                    Subject::AssignmentUpdate(s) => s.requested_fte,
                    other => return Err(other.unsupported(ASSIGN_FTE, ASSIGNMENT_SUBJECTS)),
                };
                if requested > 0.0 && requested <= 1.0 {
                    return Ok(None);
                }
                Ok(Some(RuleOutcome::error(
                    ValidationError::new(
                        "ASSIGN_FTE_LIMIT",
                        format!("Assignment FTE {requested:.2} must be between 0 and 1"),
                    )
                    .with_field("fte")
                    .with_value(requested)
                    .with_context("requestedFTE", requested)
                    .with_context("allowedRange", "[0,1]")
                    .with_context("operationType", subject.operation_name()),
                )))
            })
    }

    /// ASSIGN-STATE: new assignments need a position that is not INACTIVE
    /// or DELETED. Updates need an assignment that has not ENDED, and only
    /// ACTIVE assignments can be closed.
    pub fn state_rule() -> Rule<Subject> {
        Rule::new(ASSIGN_STATE)
            .severity(Severity::Critical)
            .short_circuit(true)
            .handler(|_, subject: &Subject| {
                let blocked = match subject {
                    Subject::PositionFill(s) | Subject::AssignmentCreate(s) => {
                        s.position.blocks_assignments().then_some(s.position.status.as_str())
                    }
                    Subject::AssignmentUpdate(s) => {
                        s.assignment.is_ended().then_some(s.assignment.status.as_str())
                    }
                    Subject::AssignmentClose(s) => {
                        let closable = s.assignment.status() == Some(AssignmentStatus::Active);
                        (!closable).then_some(s.assignment.status.as_str())
                    }
                    other => {
                        return Err(other.unsupported(
                            ASSIGN_STATE,
                            "PositionFill|AssignmentCreate|AssignmentUpdate|AssignmentClose",
                        ))
                    }
                };
                Ok(blocked.map(|status| {
                    RuleOutcome::error(assign_state_violation(status, subject.operation_name()))
                }))
            })
    }

    /// CROSS-ACTIVE: the position must accept assignments, and an
    /// assignment already in effect needs an ACTIVE organization.
    pub fn cross_active_rule() -> Rule<Subject> {
        Rule::new(CROSS_ACTIVE)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(|ctx: &ExecutionContext, subject: &Subject| {
                let (position, organization, start) = match subject {
                    Subject::PositionFill(s) | Subject::AssignmentCreate(s) => {
                        (&s.position, &s.organization, s.effective_date)
                    }
                    Subject::AssignmentUpdate(s) => {
                        (&s.position, &s.organization, Some(s.assignment.effective_date))
                    }
                    other => return Err(other.unsupported(CROSS_ACTIVE, ASSIGNMENT_SUBJECTS)),
                };

                if position.blocks_assignments() {
                    return Ok(Some(RuleOutcome::error(position_conflict(position))));
                }

                let today = ctx.today();
                let starts_by_today = start.map_or(true, |day| day <= today);
                if starts_by_today && !organization.is_active() {
                    return Ok(Some(RuleOutcome::error(organization_conflict(organization))));
                }
                Ok(None)
            })
    }

    /// POS-HEADCOUNT: active FTE after the change must stay within the
    /// position's capacity.
    pub fn headcount_rule() -> Rule<Subject> {
        Rule::new(POS_HEADCOUNT)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(|_, subject: &Subject| {
                let (position, current, requested, original) = match subject {
                    Subject::PositionFill(s) | Subject::AssignmentCreate(s) => {
                        (&s.position, s.current_fte, s.requested_fte, None)
                    }
                    Subject::AssignmentUpdate(s) => {
                        (&s.position, s.current_fte, s.requested_fte, Some(s.original_fte))
                    }
                    other => return Err(other.unsupported(POS_HEADCOUNT, ASSIGNMENT_SUBJECTS)),
                };

                let projected = match original {
                    Some(original) => current - original + requested,
                    None => current + requested,
                };
                let limit = position.headcount_capacity;

                if projected > limit + FTE_TOLERANCE {
                    return Ok(Some(RuleOutcome::error(
                        ValidationError::new(
                            "POS_HEADCOUNT_EXCEEDED",
                            format!("Projected headcount {projected:.2} exceeds capacity {limit:.2}"),
                        )
                        .with_field("fte")
                        .with_value(requested)
                        .with_context("positionCode", position.code.as_str())
                        .with_context("headcountLimit", limit)
                        .with_context("currentFTE", current)
                        .with_context("requestedFTE", requested)
                        .with_context("projectedFTE", projected),
                    )));
                }

                Ok(Some(
                    RuleOutcome::new()
                        .with_context("currentFTE", current)
                        .with_context("requestedFTE", requested)
                        .with_context("projectedFTE", projected)
                        .with_context("headcountLimit", limit),
                ))
            })
    }
}

fn catalog_links(request: &PositionRequest) -> [(CatalogEntity, &str); 4] {
    [
        (CatalogEntity::JobFamilyGroup, request.job_family_group_code.trim()),
        (CatalogEntity::JobFamily, request.job_family_code.trim()),
        (CatalogEntity::JobRole, request.job_role_code.trim()),
        (CatalogEntity::JobLevel, request.job_level_code.trim()),
    ]
}

fn organization_outcome(code: &str, organization: Option<&Organization>) -> RuleOutcome {
    let Some(organization) = organization else {
        return RuleOutcome::error(
            ValidationError::new(
                "POS_ORG_INACTIVE",
                format!("Organization {code} does not exist or is inactive"),
            )
            .with_field("organizationCode")
            .with_context("organizationCode", code)
            .with_context("status", "UNKNOWN"),
        );
    };

    let status = normalize_status(&organization.status);
    if !organization.is_active() {
        return RuleOutcome::error(
            ValidationError::new(
                "POS_ORG_INACTIVE",
                format!("Organization {code} status {status} is not ACTIVE"),
            )
            .with_field("organizationCode")
            .with_value(status.as_str())
            .with_context("organizationCode", code)
            .with_context("status", status),
        );
    }
    RuleOutcome::new()
        .with_context("organizationCode", code)
        .with_context("status", status)
}

fn job_catalog_violation(entity: CatalogEntity, code: &str) -> ValidationError {
    ValidationError::new(
        "JOB_CATALOG_NOT_FOUND",
        format!("{} {code} is inactive or missing", entity.display_name()),
    )
    .with_field(entity.field_name())
    .with_value(code)
    .with_severity(Severity::Medium)
    .with_context("catalogEntity", entity.display_name())
    .with_context("referenceCode", code)
}

fn assign_state_violation(status: &str, operation: &str) -> ValidationError {
    let state = normalize_status(status);
    ValidationError::new(
        "ASSIGN_INVALID_STATE",
        format!("Assignment state {state} does not allow {operation}"),
    )
    .with_field("assignmentStatus")
    .with_value(state.as_str())
    .with_severity(Severity::Critical)
    .with_context("currentState", state)
    .with_context("operation", operation)
}

fn position_conflict(position: &Position) -> ValidationError {
    let status = normalize_status(&position.status);
    ValidationError::new(
        "CROSS_ACTIVATION_CONFLICT",
        format!(
            "Position {} status {status} does not allow assignment operations",
            position.code
        ),
    )
    .with_field("status")
    .with_value(status.as_str())
    .with_context("positionCode", position.code.as_str())
    .with_context("positionStatus", status)
}

fn organization_conflict(organization: &Organization) -> ValidationError {
    let status = normalize_status(&organization.status);
    ValidationError::new(
        "CROSS_ACTIVATION_CONFLICT",
        format!(
            "Organization {} status {status} does not allow assignment operations",
            organization.code
        ),
    )
    .with_field("organizationCode")
    .with_value(status.as_str())
    .with_context("organizationCode", organization.code.as_str())
    .with_context("organizationStatus", status)
}

// ---------------------------------------------------------------------------
// Validator service
// ---------------------------------------------------------------------------

/// Position, organization and active FTE loaded ahead of an assignment
/// chain.
#[derive(Debug, Clone)]
struct PositionContext {
    position: Position,
    organization: Organization,
    current_fte: f64,
}

/// Validates position and assignment mutations.
#[derive(Clone)]
pub struct PositionAssignmentValidator {
    rules: PositionRules,
    organizations: Arc<dyn OrganizationReadModel>,
    positions: Arc<dyn PositionReadModel>,
    assignments: Arc<dyn AssignmentReadModel>,
    metrics: Arc<dyn ValidationMetrics>,
}

impl std::fmt::Debug for PositionAssignmentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionAssignmentValidator")
            .finish_non_exhaustive()
    }
}

impl PositionAssignmentValidator {
    /// Validator over the given read models, without metrics.
    pub fn new(
        organizations: Arc<dyn OrganizationReadModel>,
        job_catalog: Arc<dyn JobCatalogReadModel>,
        positions: Arc<dyn PositionReadModel>,
        assignments: Arc<dyn AssignmentReadModel>,
    ) -> Self {
        Self {
            rules: PositionRules::new(Arc::clone(&organizations), job_catalog),
            organizations,
            positions,
            assignments,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Record chain metrics through `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn ValidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn chain(&self, base: ContextMap) -> ValidationChain<Subject> {
        ValidationChain::new(
            ChainOptions::new()
                .with_base_context(base)
                .with_metrics(Arc::clone(&self.metrics)),
        )
    }

    fn register(chain: &ValidationChain<Subject>, rule: Rule<Subject>) {
        let rule_id = rule.id().to_string();
        if let Err(err) = chain.register(rule) {
            error!(rule_id = %rule_id, error = %err, "rule registration failed");
        }
    }

    fn register_position_rules(&self, chain: &ValidationChain<Subject>) {
        Self::register(chain, self.rules.organization_rule().priority(10));
        Self::register(chain, self.rules.job_catalog_rule().priority(20));
    }

    fn register_creation_rules(chain: &ValidationChain<Subject>) {
        Self::register(chain, PositionRules::fte_rule().priority(5));
        Self::register(chain, PositionRules::state_rule().priority(8));
        Self::register(chain, PositionRules::cross_active_rule().priority(10));
        Self::register(chain, PositionRules::headcount_rule().priority(20));
    }

    fn register_update_rules(chain: &ValidationChain<Subject>) {
        Self::register(chain, PositionRules::fte_rule().priority(5));
        Self::register(chain, PositionRules::state_rule().priority(8));
        Self::register(chain, PositionRules::headcount_rule().priority(15));
    }

    fn load_position_context(
        &self,
        tenant: TenantId,
        code: &str,
    ) -> Result<Option<PositionContext>, LookupError> {
        let Some(position) = found(self.positions.current_position(tenant, code.trim()))? else {
            return Ok(None);
        };
        let Some(organization) = found(
            self.organizations
                .organization_by_code(tenant, position.organization_code.trim()),
        )?
        else {
            return Ok(None);
        };
        let current_fte = self.assignments.sum_active_fte(tenant, &position.code)?;
        Ok(Some(PositionContext {
            position,
            organization,
            current_fte,
        }))
    }

    fn validate_assignment_creation(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        operation: &'static str,
        wrap: fn(AssignmentCreationSubject) -> Subject,
        position_code: &str,
        fte: Option<f64>,
        effective_date: &str,
    ) -> ValidationResult {
        let loaded = match self.load_position_context(tenant, position_code) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return ValidationResult::new(),
            Err(err) => return context_unavailable(operation, position_code, &err),
        };

        let chain = self.chain(context_map([
            (OPERATION_KEY, json!(operation)),
            ("positionCode", json!(loaded.position.code)),
            ("tenantId", json!(tenant.to_string())),
        ]));
        Self::register_creation_rules(&chain);

        let creation = AssignmentCreationSubject {
            tenant,
            position: loaded.position,
            organization: loaded.organization,
            current_fte: loaded.current_fte,
            requested_fte: fte.unwrap_or(DEFAULT_FTE),
            effective_date: parse_effective_date(effective_date).ok(),
        };
        chain.execute(ctx, &wrap(creation))
    }
}

fn context_map<const N: usize>(entries: [(&str, Value); N]) -> ContextMap {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn merge_job_catalog_context(result: &mut ValidationResult, tenant: TenantId, request: &PositionRequest) {
    result.set_context(
        "jobCatalog",
        json!({
            "group": request.job_family_group_code,
            "family": request.job_family_code,
            "role": request.job_role_code,
            "level": request.job_level_code,
        }),
    );
    result.set_context("tenantId", tenant.to_string());
}

/// Fail-closed result for a position context lookup failure.
fn context_unavailable(operation: &str, position_code: &str, err: &LookupError) -> ValidationResult {
    error!(operation = %operation, code = %position_code, error = %err, "load position context failed");
    let mut result = ValidationResult::with_context(context_map([
        (OPERATION_KEY, json!(operation)),
        ("positionCode", json!(position_code.trim())),
        (EXECUTED_RULES_KEY, json!([])),
    ]));
    result.add_error(
        ValidationError::new(
            POSITION_CONTEXT_UNAVAILABLE,
            format!("Unable to load position {} for validation", position_code.trim()),
        )
        .with_severity(Severity::Critical)
        .with_context("positionCode", position_code.trim())
        .with_context(INTERNAL_KEY, true)
        .with_context("error", err.to_string()),
    );
    result
}

impl PositionValidationService for PositionAssignmentValidator {
    fn validate_create_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        request: &PositionRequest,
    ) -> ValidationResult {
        let chain = self.chain(context_map([(OPERATION_KEY, json!("CreatePosition"))]));
        self.register_position_rules(&chain);

        let subject = Subject::PositionCreate {
            tenant,
            request: request.clone(),
        };
        let mut result = chain.execute(ctx, &subject);
        merge_job_catalog_context(&mut result, tenant, request);
        result
    }

    fn validate_replace_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &PositionRequest,
    ) -> ValidationResult {
        let code = code.trim();
        let chain = self.chain(context_map([
            (OPERATION_KEY, json!("ReplacePosition")),
            ("positionCode", json!(code)),
            ("tenantId", json!(tenant.to_string())),
            ("targetVersion", json!("CURRENT")),
        ]));
        self.register_position_rules(&chain);

        let subject = Subject::PositionReplace {
            tenant,
            code: code.to_string(),
            request: request.clone(),
        };
        let mut result = chain.execute(ctx, &subject);
        merge_job_catalog_context(&mut result, tenant, request);
        result
    }

    fn validate_create_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        _request: &PositionVersionRequest,
    ) -> ValidationResult {
        const OPERATION: &str = "CreatePositionVersion";
        let code = code.trim();
        let organization_code = match found(self.positions.current_position(tenant, code)) {
            Ok(position) => position.map(|p| p.organization_code),
            Err(err) => return context_unavailable(OPERATION, code, &err),
        };

        let chain = self.chain(context_map([
            (OPERATION_KEY, json!(OPERATION)),
            ("positionCode", json!(code)),
            ("tenantId", json!(tenant.to_string())),
        ]));
        Self::register(&chain, self.rules.organization_rule().priority(10));

        let subject = Subject::PositionVersion {
            tenant,
            code: code.to_string(),
            organization_code,
        };
        chain.execute(ctx, &subject)
    }

    fn validate_fill_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &FillPositionRequest,
    ) -> ValidationResult {
        self.validate_assignment_creation(
            ctx,
            tenant,
            "FillPosition",
            Subject::PositionFill,
            code,
            request.fte,
            &request.effective_date,
        )
    }

    fn validate_vacate_position(
        &self,
        _ctx: &ExecutionContext,
        _tenant: TenantId,
        _code: &str,
        _request: &VacatePositionRequest,
    ) -> ValidationResult {
        ValidationResult::new()
    }

    fn validate_transfer_position(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &TransferPositionRequest,
    ) -> ValidationResult {
        let target = request.target_organization_code.trim();
        if target.is_empty() {
            return ValidationResult::new();
        }
        let code = code.trim();

        let chain = self.chain(context_map([
            (OPERATION_KEY, json!("TransferPosition")),
            ("positionCode", json!(code)),
            ("targetOrg", json!(target)),
            ("tenantId", json!(tenant.to_string())),
            ("requestedAt", json!(request.effective_date)),
            ("crossDomainRule", json!(true)),
        ]));
        Self::register(&chain, self.rules.organization_rule().priority(10));

        let subject = Subject::PositionTransfer {
            tenant,
            code: code.to_string(),
            request: TransferPositionRequest {
                target_organization_code: target.to_string(),
                ..request.clone()
            },
        };
        chain.execute(ctx, &subject)
    }

    fn validate_apply_event(
        &self,
        _ctx: &ExecutionContext,
        _tenant: TenantId,
        _code: &str,
        _request: &PositionEventRequest,
    ) -> ValidationResult {
        ValidationResult::new()
    }
}

impl AssignmentValidationService for PositionAssignmentValidator {
    fn validate_create_assignment(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        position_code: &str,
        request: &CreateAssignmentRequest,
    ) -> ValidationResult {
        self.validate_assignment_creation(
            ctx,
            tenant,
            "CreateAssignment",
            Subject::AssignmentCreate,
            position_code,
            request.fte,
            &request.effective_date,
        )
    }

    fn validate_update_assignment(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        position_code: &str,
        assignment_id: Uuid,
        request: &UpdateAssignmentRequest,
    ) -> ValidationResult {
        const OPERATION: &str = "UpdateAssignment";
        let loaded = match self.load_position_context(tenant, position_code) {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return ValidationResult::new(),
            Err(err) => return context_unavailable(OPERATION, position_code, &err),
        };
        let assignment = match found(self.assignments.assignment_by_id(tenant, assignment_id)) {
            Ok(Some(assignment)) => assignment,
            Ok(None) => return ValidationResult::new(),
            Err(err) => return context_unavailable(OPERATION, position_code, &err),
        };

        let requested_fte = request.fte.unwrap_or(assignment.fte);
        let chain = self.chain(context_map([
            (OPERATION_KEY, json!(OPERATION)),
            ("positionCode", json!(loaded.position.code)),
            ("assignmentId", json!(assignment_id.to_string())),
            ("tenantId", json!(tenant.to_string())),
            ("currentStatus", json!(assignment.status)),
            ("requestedFTE", json!(requested_fte)),
            ("existingFTE", json!(assignment.fte)),
            ("existingStatus", json!(assignment.status)),
        ]));
        Self::register_update_rules(&chain);

        let subject = Subject::AssignmentUpdate(AssignmentUpdateSubject {
            tenant,
            position: loaded.position,
            organization: loaded.organization,
            current_fte: loaded.current_fte,
            requested_fte,
            original_fte: assignment.fte,
            assignment,
        });
        chain.execute(ctx, &subject)
    }

    fn validate_close_assignment(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        position_code: &str,
        assignment_id: Uuid,
        _request: &CloseAssignmentRequest,
    ) -> ValidationResult {
        const OPERATION: &str = "CloseAssignment";
        let assignment = match found(self.assignments.assignment_by_id(tenant, assignment_id)) {
            Ok(Some(assignment)) => assignment,
            Ok(None) => return ValidationResult::new(),
            Err(err) => return context_unavailable(OPERATION, position_code, &err),
        };

        let chain = self.chain(context_map([
            (OPERATION_KEY, json!(OPERATION)),
            ("positionCode", json!(position_code.trim())),
            ("assignmentId", json!(assignment_id.to_string())),
            ("tenantId", json!(tenant.to_string())),
        ]));
        Self::register(&chain, PositionRules::state_rule().priority(10));

        chain.execute(ctx, &Subject::AssignmentClose(AssignmentCloseSubject { tenant, assignment }))
    }
}

#[cfg(test)]
mod tests {
    use castle_core::Assignment;
    use chrono::NaiveDate;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn position(status: &str, capacity: f64) -> Position {
        Position {
            code: "P1000001".into(),
            organization_code: "1000001".into(),
            status: status.into(),
            headcount_capacity: capacity,
            job_family_group_code: "PROF".into(),
            job_family_code: "PROF-IT".into(),
            job_role_code: "PROF-IT-DEV".into(),
            job_level_code: "P5".into(),
            effective_date: Some(day(2024, 1, 1)),
        }
    }

    fn organization(status: &str) -> Organization {
        Organization {
            code: "1000001".into(),
            name: "Engineering".into(),
            unit_type: "DEPARTMENT".into(),
            status: status.into(),
            parent_code: None,
            level: 1,
            effective_date: Some(day(2024, 1, 1)),
            end_date: None,
        }
    }

    fn assignment(status: &str, fte: f64) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            position_code: "P1000001".into(),
            status: status.into(),
            fte,
            effective_date: day(2025, 1, 1),
        }
    }

    fn creation(position: Position, organization: Organization, current: f64, requested: f64) -> Subject {
        Subject::AssignmentCreate(AssignmentCreationSubject {
            tenant: TenantId::new(),
            position,
            organization,
            current_fte: current,
            requested_fte: requested,
            effective_date: Some(day(2025, 3, 1)),
        })
    }

    fn update(assignment: Assignment, current: f64, requested: f64) -> Subject {
        Subject::AssignmentUpdate(AssignmentUpdateSubject {
            tenant: TenantId::new(),
            position: position("ACTIVE", 1.0),
            organization: organization("ACTIVE"),
            original_fte: assignment.fte,
            assignment,
            current_fte: current,
            requested_fte: requested,
        })
    }

    fn run(rule: Rule<Subject>, subject: &Subject) -> ValidationResult {
        let chain = ValidationChain::new(ChainOptions::new());
        chain.register(rule).unwrap();
        chain.execute(&ExecutionContext::new().with_reference_date(day(2025, 6, 1)), subject)
    }

    #[test]
    fn fte_bounds() {
        for (fte, valid) in [(-0.5, false), (0.0, false), (0.5, true), (1.0, true), (1.5, false), (f64::NAN, false)] {
            let subject = creation(position("ACTIVE", 2.0), organization("ACTIVE"), 0.0, fte);
            let result = run(PositionRules::fte_rule(), &subject);
            assert_eq!(result.valid, valid, "fte {fte}");
            if !valid {
                assert_eq!(result.error_codes(), vec!["ASSIGN_FTE_LIMIT"]);
                assert_eq!(result.errors[0].context["operationType"], "CreateAssignment");
            }
        }
    }

    #[test]
    fn headcount_projection_on_create() {
        let subject = creation(position("ACTIVE", 1.0), organization("ACTIVE"), 0.9, 0.2);
        let result = run(PositionRules::headcount_rule(), &subject);
        assert_eq!(result.error_codes(), vec!["POS_HEADCOUNT_EXCEEDED"]);
        let projected = result.errors[0].context["projectedFTE"].as_f64().unwrap();
        assert!((projected - 1.1).abs() < 1e-9);

        let subject = creation(position("ACTIVE", 1.0), organization("ACTIVE"), 0.7, 0.3);
        let result = run(PositionRules::headcount_rule(), &subject);
        assert!(result.valid);
        assert_eq!(result.context["rule:POS-HEADCOUNT"]["headcountLimit"], 1.0);
    }

    #[test]
    fn headcount_projection_on_update_replaces_original() {
        let result = run(PositionRules::headcount_rule(), &update(assignment("ACTIVE", 0.5), 1.0, 0.5));
        assert!(result.valid);

        let result = run(PositionRules::headcount_rule(), &update(assignment("ACTIVE", 0.5), 1.0, 0.8));
        assert!(result.has_error("POS_HEADCOUNT_EXCEEDED"));
    }

    #[test]
    fn ended_assignment_blocks_update_and_close() {
        let result = run(PositionRules::state_rule(), &update(assignment("ENDED", 0.5), 0.0, 0.5));
        assert_eq!(result.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
        assert_eq!(result.errors[0].context["operation"], "UpdateAssignment");

        let close = Subject::AssignmentClose(AssignmentCloseSubject {
            tenant: TenantId::new(),
            assignment: assignment("ended", 1.0),
        });
        let result = run(PositionRules::state_rule(), &close);
        assert_eq!(result.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
        assert_eq!(result.errors[0].context["currentState"], "ENDED");
        assert_eq!(result.errors[0].severity, Some(Severity::Critical));

        let active = Subject::AssignmentClose(AssignmentCloseSubject {
            tenant: TenantId::new(),
            assignment: assignment("active", 1.0),
        });
        assert!(run(PositionRules::state_rule(), &active).valid);
    }

    #[test]
    fn only_active_assignments_can_close() {
        let pending = Subject::AssignmentClose(AssignmentCloseSubject {
            tenant: TenantId::new(),
            assignment: assignment("PENDING", 1.0),
        });
        let result = run(PositionRules::state_rule(), &pending);
        assert_eq!(result.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
        assert_eq!(result.errors[0].context["currentState"], "PENDING");
        assert_eq!(result.errors[0].context["operation"], "CloseAssignment");

        // Updates still accept a PENDING assignment.
        let result = run(PositionRules::state_rule(), &update(assignment("PENDING", 0.5), 0.0, 0.5));
        assert!(result.valid);
    }

    #[test]
    fn inactive_position_blocks_new_assignments() {
        for status in ["INACTIVE", "DELETED"] {
            let subject = creation(position(status, 1.0), organization("ACTIVE"), 0.0, 0.5);
            let result = run(PositionRules::state_rule(), &subject);
            assert_eq!(result.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
        }
        let subject = creation(position("PLANNED", 1.0), organization("ACTIVE"), 0.0, 0.5);
        assert!(run(PositionRules::state_rule(), &subject).valid);
    }

    #[test]
    fn cross_active_checks_position_then_organization() {
        let subject = creation(position("DELETED", 1.0), organization("INACTIVE"), 0.0, 0.5);
        let result = run(PositionRules::cross_active_rule(), &subject);
        assert_eq!(result.error_codes(), vec!["CROSS_ACTIVATION_CONFLICT"]);
        assert_eq!(result.errors[0].context["positionStatus"], "DELETED");

        let subject = creation(position("ACTIVE", 1.0), organization("INACTIVE"), 0.0, 0.5);
        let result = run(PositionRules::cross_active_rule(), &subject);
        assert_eq!(result.errors[0].context["organizationStatus"], "INACTIVE");
    }

    #[test]
    fn cross_active_allows_future_start_in_inactive_organization() {
        let fill = |effective_date| {
            Subject::PositionFill(AssignmentCreationSubject {
                tenant: TenantId::new(),
                position: position("ACTIVE", 1.0),
                organization: organization("PLANNED"),
                current_fte: 0.0,
                requested_fte: 1.0,
                effective_date,
            })
        };
        assert!(run(PositionRules::cross_active_rule(), &fill(Some(day(2025, 9, 1)))).valid);

        // Undated starts are treated as today.
        let result = run(PositionRules::cross_active_rule(), &fill(None));
        assert!(result.has_error("CROSS_ACTIVATION_CONFLICT"));
    }

    #[test]
    fn assignment_rules_reject_position_subjects() {
        let subject = Subject::PositionVersion {
            tenant: TenantId::new(),
            code: "P1".into(),
            organization_code: None,
        };
        for rule in [
            PositionRules::fte_rule(),
            PositionRules::state_rule(),
            PositionRules::cross_active_rule(),
            PositionRules::headcount_rule(),
        ] {
            let result = run(rule, &subject);
            assert_eq!(result.error_codes(), vec![castle_chain::RULE_EXECUTION_ERROR]);
        }
    }
}
