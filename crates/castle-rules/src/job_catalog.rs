//! # Job Catalog Version Sequencing
//!
//! New job catalog versions must start strictly after the latest existing
//! version (JC-TEMPORAL). Below the family group level they must also link
//! to that latest version by record ID (JC-SEQUENCE), so concurrent editors
//! cannot fork a catalog entry's history.

use std::sync::Arc;

use castle_chain::{
    ChainOptions, ExecutionContext, NoopMetrics, Rule, RuleOutcome, ValidationChain,
    ValidationMetrics,
};
use castle_core::request::JobCatalogVersionRequest;
use castle_core::result::{EXECUTED_RULES_KEY, INTERNAL_KEY, OPERATION_KEY, RULE_ID_KEY};
use castle_core::{
    format_date, parse_effective_date, CatalogEntity, ContextMap, LookupError, Severity, TenantId,
    ValidationError, ValidationResult,
};
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use crate::readmodel::JobCatalogTimelineReadModel;
use crate::service::JobCatalogValidationService;
use crate::subject::{JobCatalogVersionSubject, Subject};

/// JC-TEMPORAL rule ID.
pub const JC_TEMPORAL: &str = "JC-TEMPORAL";
/// JC-SEQUENCE rule ID.
pub const JC_SEQUENCE: &str = "JC-SEQUENCE";

const TIMELINE_UNAVAILABLE: &str = "JOB_CATALOG_TIMELINE_UNAVAILABLE";
const TEMPORAL_CONFLICT: &str = "JOB_CATALOG_TEMPORAL_CONFLICT";
const SEQUENCE_MISSING_BASE: &str = "JOB_CATALOG_SEQUENCE_MISSING_BASE";
const SEQUENCE_MISSING_PARENT: &str = "JOB_CATALOG_SEQUENCE_MISSING_PARENT";
const SEQUENCE_MISMATCH: &str = "JOB_CATALOG_SEQUENCE_MISMATCH";

/// Validates new job catalog versions against the entry's timeline.
#[derive(Clone)]
pub struct JobCatalogValidator {
    timeline: Arc<dyn JobCatalogTimelineReadModel>,
    metrics: Arc<dyn ValidationMetrics>,
}

impl std::fmt::Debug for JobCatalogValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCatalogValidator").finish_non_exhaustive()
    }
}

/// One version-creation call, resolved to its catalog level.
struct VersionRequest<'a> {
    operation: &'static str,
    entity: CatalogEntity,
    tenant: TenantId,
    code: &'a str,
    request: &'a JobCatalogVersionRequest,
    parent_record_id: Option<Uuid>,
}

impl JobCatalogValidator {
    /// Validator over `timeline`, without metrics.
    pub fn new(timeline: Arc<dyn JobCatalogTimelineReadModel>) -> Self {
        Self {
            timeline,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Record chain metrics through `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn ValidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// JC-TEMPORAL: the new version must start after the latest one.
    pub fn temporal_rule() -> Rule<Subject> {
        Rule::new(JC_TEMPORAL)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(|_, subject: &Subject| {
                let Subject::JobCatalogVersion(version) = subject else {
                    return Err(subject.unsupported(JC_TEMPORAL, "JobCatalogVersion"));
                };

                let effective = format_date(version.effective_date);
                let mut outcome = RuleOutcome::new()
                    .with_context("timelineSize", version.timeline.len())
                    .with_context("catalogCode", version.code.as_str())
                    .with_context("entity", version.entity.as_str())
                    .with_context("effectiveDate", effective.as_str());

                let Some(latest) = version.latest() else {
                    return Ok(Some(outcome));
                };
                let latest_effective = format_date(latest.effective_date);
                let latest_record = latest.record_id.to_string();
                outcome = outcome
                    .with_context("latestEffective", latest_effective.as_str())
                    .with_context("latestRecordId", latest_record.as_str());

                if version.effective_date <= latest.effective_date {
                    outcome.errors.push(
                        ValidationError::new(
                            TEMPORAL_CONFLICT,
                            format!(
                                "effectiveDate {effective} must be after latest version {latest_effective}"
                            ),
                        )
                        .with_field("effectiveDate")
                        .with_severity(Severity::High)
                        .with_context("catalogCode", version.code.as_str())
                        .with_context("latestEffective", latest_effective)
                        .with_context("attemptedEffective", effective)
                        .with_context("latestRecordId", latest_record),
                    );
                }
                Ok(Some(outcome))
            })
    }

    /// JC-SEQUENCE: the caller must name the latest version as parent.
    pub fn sequence_rule() -> Rule<Subject> {
        Rule::new(JC_SEQUENCE)
            .severity(Severity::High)
            .short_circuit(true)
            .handler(|_, subject: &Subject| {
                let Subject::JobCatalogVersion(version) = subject else {
                    return Err(subject.unsupported(JC_SEQUENCE, "JobCatalogVersion"));
                };
                Ok(Some(sequence_outcome(version)))
            })
    }

    fn validate_version(&self, ctx: &ExecutionContext, call: VersionRequest<'_>) -> ValidationResult {
        let code = call.code.trim().to_uppercase();

        let mut base = ContextMap::new();
        base.insert(OPERATION_KEY.into(), json!(call.operation));
        base.insert("catalogCode".into(), json!(code));
        base.insert("tenantId".into(), json!(call.tenant.to_string()));
        if let Some(parent) = call.parent_record_id {
            base.insert("parentRecordId".into(), json!(parent.to_string()));
        }

        let Ok(effective_date) = parse_effective_date(&call.request.effective_date) else {
            return invalid_effective_date(call.operation, &code, &call.request.effective_date);
        };

        let timeline = match self.timeline.timeline(call.tenant, call.entity, &code) {
            Ok(timeline) => timeline,
            Err(err) => {
                error!(operation = call.operation, code = %code, error = %err, "load job catalog timeline failed");
                return timeline_unavailable(call.operation, &code, &err);
            }
        };

        let chain = ValidationChain::new(
            ChainOptions::new()
                .with_base_context(base)
                .with_metrics(Arc::clone(&self.metrics)),
        );
        let mut rules = vec![Self::temporal_rule().priority(10)];
        if call.entity.requires_parent() {
            rules.push(Self::sequence_rule().priority(20));
        }
        for rule in rules {
            let rule_id = rule.id().to_string();
            if let Err(err) = chain.register(rule) {
                error!(operation = call.operation, rule_id = %rule_id, error = %err, "rule registration failed");
            }
        }

        let subject = Subject::JobCatalogVersion(JobCatalogVersionSubject {
            tenant: call.tenant,
            code,
            entity: call.entity,
            effective_date,
            timeline,
            parent_record_id: call.parent_record_id,
        });
        chain.execute(ctx, &subject)
    }
}

fn sequence_outcome(version: &JobCatalogVersionSubject) -> RuleOutcome {
    let mut outcome = RuleOutcome::new()
        .with_context("catalogCode", version.code.as_str())
        .with_context("requiresParent", version.entity.requires_parent());
    if !version.entity.requires_parent() {
        return outcome;
    }

    let Some(latest) = version.latest() else {
        outcome.errors.push(
            ValidationError::new(
                SEQUENCE_MISSING_BASE,
                "cannot create version without existing timeline entries",
            )
            .with_severity(Severity::High)
            .with_context("catalogCode", version.code.as_str()),
        );
        return outcome;
    };

    let expected = latest.record_id.to_string();
    outcome = outcome.with_context("expectedParentRecordId", expected.as_str());

    let Some(provided) = version.parent_record_id else {
        outcome.errors.push(
            ValidationError::new(
                SEQUENCE_MISSING_PARENT,
                "parentRecordId is required to link version sequence",
            )
            .with_field("parentRecordId")
            .with_severity(Severity::High)
            .with_context("expectedParentRecordId", expected),
        );
        return outcome;
    };

    let provided_text = provided.to_string();
    outcome = outcome.with_context("providedParentRecordId", provided_text.as_str());
    if provided != latest.record_id {
        outcome.errors.push(
            ValidationError::new(
                SEQUENCE_MISMATCH,
                "parentRecordId does not match latest version record",
            )
            .with_field("parentRecordId")
            .with_value(provided_text.as_str())
            .with_severity(Severity::High)
            .with_context("expectedParentRecordId", expected)
            .with_context("providedParentRecordId", provided_text),
        );
    }
    outcome
}

/// Result for an operation that never reached the chain.
fn early_result(operation: &str, code: &str, error: ValidationError) -> ValidationResult {
    let mut context = ContextMap::new();
    context.insert(OPERATION_KEY.into(), json!(operation));
    context.insert("catalogCode".into(), json!(code));
    context.insert(EXECUTED_RULES_KEY.into(), Value::Array(Vec::new()));
    let mut result = ValidationResult::with_context(context);
    result.add_error(error);
    result
}

fn invalid_effective_date(operation: &str, code: &str, attempted: &str) -> ValidationResult {
    let attempted = attempted.trim();
    early_result(
        operation,
        code,
        ValidationError::new("INVALID_EFFECTIVE_DATE", "effectiveDate must follow format YYYY-MM-DD")
            .with_field("effectiveDate")
            .with_value(attempted)
            .with_severity(Severity::High)
            .with_context(RULE_ID_KEY, JC_TEMPORAL)
            .with_context("catalogCode", code)
            .with_context("attemptedDate", attempted),
    )
}

fn timeline_unavailable(operation: &str, code: &str, err: &LookupError) -> ValidationResult {
    early_result(
        operation,
        code,
        ValidationError::new(
            TIMELINE_UNAVAILABLE,
            "Unable to load the job catalog timeline for validation",
        )
        .with_severity(Severity::Critical)
        .with_context(RULE_ID_KEY, JC_TEMPORAL)
        .with_context("catalogCode", code)
        .with_context(INTERNAL_KEY, true)
        .with_context("error", err.to_string()),
    )
}

impl JobCatalogValidationService for JobCatalogValidator {
    fn validate_create_family_group_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
    ) -> ValidationResult {
        self.validate_version(
            ctx,
            VersionRequest {
                operation: "CreateJobFamilyGroupVersion",
                entity: CatalogEntity::JobFamilyGroup,
                tenant,
                code,
                request,
                parent_record_id: None,
            },
        )
    }

    fn validate_create_job_family_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
        parent_record_id: Option<Uuid>,
    ) -> ValidationResult {
        self.validate_version(
            ctx,
            VersionRequest {
                operation: "CreateJobFamilyVersion",
                entity: CatalogEntity::JobFamily,
                tenant,
                code,
                request,
                parent_record_id,
            },
        )
    }

    fn validate_create_job_role_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
        parent_record_id: Option<Uuid>,
    ) -> ValidationResult {
        self.validate_version(
            ctx,
            VersionRequest {
                operation: "CreateJobRoleVersion",
                entity: CatalogEntity::JobRole,
                tenant,
                code,
                request,
                parent_record_id,
            },
        )
    }

    fn validate_create_job_level_version(
        &self,
        ctx: &ExecutionContext,
        tenant: TenantId,
        code: &str,
        request: &JobCatalogVersionRequest,
        parent_record_id: Option<Uuid>,
    ) -> ValidationResult {
        self.validate_version(
            ctx,
            VersionRequest {
                operation: "CreateJobLevelVersion",
                entity: CatalogEntity::JobLevel,
                tenant,
                code,
                request,
                parent_record_id,
            },
        )
    }
}
