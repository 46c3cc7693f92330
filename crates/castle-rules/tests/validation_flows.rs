//! End-to-end validator flows over an in-memory directory.
//!
//! One store backs every read model so organization, position, assignment
//! and job catalog validators see a consistent tenant.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use castle_chain::{ChainOutcome, ExecutionContext, PrometheusMetrics, RuleOutcomeKind};
use castle_core::request::{
    CloseAssignmentRequest, CreateAssignmentRequest, CreateOrganizationRequest, FillPositionRequest,
    JobCatalogVersionRequest, PositionRequest, TransferPositionRequest, UpdateAssignmentRequest,
    UpdateOrganizationRequest,
};
use castle_core::{
    Assignment, CatalogEntity, CatalogRecord, LookupError, Organization, OrganizationNode, Position,
    Severity, TenantId, TimelineEntry, ValidationResult,
};
use castle_rules::{
    AssignmentReadModel, AssignmentValidationService, HierarchyReadModel, JobCatalogReadModel,
    JobCatalogTimelineReadModel, JobCatalogValidationService, JobCatalogValidator,
    OrganizationReadModel, OrganizationValidator, PositionAssignmentValidator, PositionReadModel,
    PositionValidationService,
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("test dates are well formed")
}

fn ctx() -> ExecutionContext {
    ExecutionContext::new().with_reference_date(day("2025-06-01"))
}

// ---------------------------------------------------------------------------
// In-memory directory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Directory {
    organizations: RwLock<HashMap<String, Organization>>,
    positions: RwLock<HashMap<String, Position>>,
    assignments: RwLock<HashMap<Uuid, Assignment>>,
    catalog: RwLock<HashMap<(CatalogEntity, String), CatalogRecord>>,
    timelines: RwLock<HashMap<(CatalogEntity, String), Vec<TimelineEntry>>>,
    offline: AtomicBool,
}

impl Directory {
    fn add_organization(&self, code: &str, parent: Option<&str>, status: &str) {
        let level = parent.map_or(1, |p| self.depth_of(p).unwrap_or(0) + 1);
        self.organizations.write().insert(
            code.to_string(),
            Organization {
                code: code.to_string(),
                name: format!("Unit {code}"),
                unit_type: "DEPARTMENT".into(),
                status: status.into(),
                parent_code: parent.map(String::from),
                level,
                effective_date: Some(day("2020-01-01")),
                end_date: None,
            },
        );
    }

    /// Chain of `levels` units, 1000001 at the root.
    fn with_chain(levels: u32) -> Self {
        let directory = Self::default();
        for level in 1..=levels {
            let code = (1_000_000 + level).to_string();
            let parent = (level > 1).then(|| (1_000_000 + level - 1).to_string());
            directory.add_organization(&code, parent.as_deref(), "ACTIVE");
        }
        directory
    }

    fn add_position(&self, code: &str, organization: &str, status: &str, capacity: f64) {
        self.positions.write().insert(
            code.to_string(),
            Position {
                code: code.to_string(),
                organization_code: organization.to_string(),
                status: status.into(),
                headcount_capacity: capacity,
                job_family_group_code: "PROF".into(),
                job_family_code: "PROF-IT".into(),
                job_role_code: "PROF-IT-DEV".into(),
                job_level_code: "P5".into(),
                effective_date: Some(day("2024-01-01")),
            },
        );
    }

    fn add_assignment(&self, position: &str, status: &str, fte: f64) -> Uuid {
        let id = Uuid::new_v4();
        self.assignments.write().insert(
            id,
            Assignment {
                id,
                position_code: position.to_string(),
                status: status.into(),
                fte,
                effective_date: day("2025-01-01"),
            },
        );
        id
    }

    fn add_catalog(&self, entity: CatalogEntity, code: &str, status: &str) {
        self.catalog.write().insert(
            (entity, code.to_string()),
            CatalogRecord {
                code: code.to_string(),
                record_id: Uuid::new_v4(),
                status: status.into(),
                effective_date: day("2024-01-01"),
            },
        );
    }

    fn add_version(&self, entity: CatalogEntity, code: &str, effective: &str) -> Uuid {
        let record_id = Uuid::new_v4();
        self.timelines
            .write()
            .entry((entity, code.to_string()))
            .or_default()
            .push(TimelineEntry {
                record_id,
                effective_date: day(effective),
                end_date: None,
                is_current: true,
                status: "ACTIVE".into(),
            });
        record_id
    }

    fn with_catalog(self) -> Self {
        self.add_catalog(CatalogEntity::JobFamilyGroup, "PROF", "ACTIVE");
        self.add_catalog(CatalogEntity::JobFamily, "PROF-IT", "ACTIVE");
        self.add_catalog(CatalogEntity::JobRole, "PROF-IT-DEV", "ACTIVE");
        self.add_catalog(CatalogEntity::JobLevel, "P5", "ACTIVE");
        self
    }

    fn check_online(&self) -> Result<(), LookupError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LookupError::backend("connection refused"));
        }
        Ok(())
    }

    fn depth_of(&self, code: &str) -> Option<u32> {
        let organizations = self.organizations.read();
        let mut depth = 0;
        let mut cursor = organizations.get(code);
        while let Some(org) = cursor {
            depth += 1;
            cursor = org.parent_code.as_deref().and_then(|p| organizations.get(p));
        }
        (depth > 0).then_some(depth)
    }

    fn node(org: &Organization) -> OrganizationNode {
        OrganizationNode {
            code: org.code.clone(),
            name: org.name.clone(),
            status: org.status.clone(),
            level: org.level,
            effective_date: org.effective_date,
            end_date: org.end_date,
        }
    }
}

impl HierarchyReadModel for Directory {
    fn organization(&self, _tenant: TenantId, code: &str) -> Result<Option<Organization>, LookupError> {
        self.check_online()?;
        Ok(self.organizations.read().get(code).cloned())
    }

    fn organization_depth(&self, _tenant: TenantId, code: &str) -> Result<u32, LookupError> {
        self.check_online()?;
        self.depth_of(code)
            .ok_or_else(|| LookupError::not_found("organization", code))
    }

    fn ancestor_chain(&self, _tenant: TenantId, code: &str) -> Result<Vec<OrganizationNode>, LookupError> {
        self.check_online()?;
        let organizations = self.organizations.read();
        let start = organizations
            .get(code)
            .ok_or_else(|| LookupError::not_found("organization", code))?;
        let mut chain = Vec::new();
        let mut cursor = start.parent_code.as_deref().and_then(|p| organizations.get(p));
        while let Some(org) = cursor {
            chain.push(Self::node(org));
            cursor = org.parent_code.as_deref().and_then(|p| organizations.get(p));
        }
        Ok(chain)
    }

    fn organization_at(
        &self,
        _tenant: TenantId,
        code: &str,
        date: NaiveDate,
    ) -> Result<Option<OrganizationNode>, LookupError> {
        self.check_online()?;
        Ok(self
            .organizations
            .read()
            .get(code)
            .filter(|org| org.effective_date.map_or(true, |start| start <= date))
            .map(Self::node))
    }
}

impl OrganizationReadModel for Directory {
    fn organization_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Organization>, LookupError> {
        HierarchyReadModel::organization(self, tenant, code)
    }
}

impl JobCatalogReadModel for Directory {
    fn current_family_group(&self, _tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError> {
        Ok(self.catalog.read().get(&(CatalogEntity::JobFamilyGroup, code.to_string())).cloned())
    }

    fn current_job_family(&self, _tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError> {
        Ok(self.catalog.read().get(&(CatalogEntity::JobFamily, code.to_string())).cloned())
    }

    fn current_job_role(&self, _tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError> {
        Ok(self.catalog.read().get(&(CatalogEntity::JobRole, code.to_string())).cloned())
    }

    fn current_job_level(&self, _tenant: TenantId, code: &str) -> Result<Option<CatalogRecord>, LookupError> {
        // Some backends only report missing levels as driver errors.
        self.catalog
            .read()
            .get(&(CatalogEntity::JobLevel, code.to_string()))
            .cloned()
            .map(Some)
            .ok_or_else(|| LookupError::backend(format!("job level {code} not found")))
    }
}

impl JobCatalogTimelineReadModel for Directory {
    fn timeline(
        &self,
        _tenant: TenantId,
        entity: CatalogEntity,
        code: &str,
    ) -> Result<Vec<TimelineEntry>, LookupError> {
        self.check_online()?;
        Ok(self
            .timelines
            .read()
            .get(&(entity, code.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

impl PositionReadModel for Directory {
    fn current_position(&self, _tenant: TenantId, code: &str) -> Result<Option<Position>, LookupError> {
        self.check_online()?;
        Ok(self.positions.read().get(code).cloned())
    }
}

impl AssignmentReadModel for Directory {
    fn sum_active_fte(&self, _tenant: TenantId, position_code: &str) -> Result<f64, LookupError> {
        self.check_online()?;
        Ok(self
            .assignments
            .read()
            .values()
            .filter(|a| a.position_code == position_code && a.status == "ACTIVE")
            .map(|a| a.fte)
            .sum())
    }

    fn assignment_by_id(&self, _tenant: TenantId, id: Uuid) -> Result<Option<Assignment>, LookupError> {
        self.check_online()?;
        Ok(self.assignments.read().get(&id).cloned())
    }
}

fn staffing(directory: &Arc<Directory>) -> PositionAssignmentValidator {
    PositionAssignmentValidator::new(
        directory.clone(),
        directory.clone(),
        directory.clone(),
        directory.clone(),
    )
}

fn assignment_request(fte: Option<f64>) -> CreateAssignmentRequest {
    CreateAssignmentRequest {
        employee_id: Uuid::new_v4(),
        employee_name: "Ada Lovelace".into(),
        assignment_type: "PRIMARY".into(),
        fte,
        effective_date: "2025-03-01".into(),
        acting_until: None,
        operation_reason: String::new(),
    }
}

fn position_request(organization: &str) -> PositionRequest {
    PositionRequest {
        title: "Backend Engineer".into(),
        job_family_group_code: "PROF".into(),
        job_family_code: "PROF-IT".into(),
        job_role_code: "PROF-IT-DEV".into(),
        job_level_code: "P5".into(),
        organization_code: organization.into(),
        headcount_capacity: 1.0,
        effective_date: "2025-03-01".into(),
        ..PositionRequest::default()
    }
}

fn projected_fte(result: &ValidationResult) -> f64 {
    result.errors[0].context["projectedFTE"]
        .as_f64()
        .expect("projectedFTE is numeric")
}

// ---------------------------------------------------------------------------
// Organization hierarchy
// ---------------------------------------------------------------------------

#[test]
fn creation_below_deepest_level_is_rejected() {
    init_tracing();
    let directory = Arc::new(Directory::with_chain(17));
    let validator = OrganizationValidator::new(directory);

    let mut request = CreateOrganizationRequest {
        parent_code: Some("1000017".into()),
        name: "Platform Team".into(),
        unit_type: "department".into(),
        effective_date: Some("2025-03-01".into()),
        ..CreateOrganizationRequest::default()
    };
    let result = validator.validate_creation(&ctx(), TenantId::new(), &mut request);

    assert!(!result.valid);
    assert_eq!(result.error_codes(), vec!["ORG_DEPTH_LIMIT"]);
    assert_eq!(result.errors[0].context["attemptedDepth"], 18);
    assert_eq!(request.unit_type, "DEPARTMENT");
}

#[test]
fn creation_near_the_limit_warns_but_passes() {
    init_tracing();
    let directory = Arc::new(Directory::with_chain(14));
    let validator = OrganizationValidator::new(directory);

    let mut request = CreateOrganizationRequest {
        parent_code: Some("1000014".into()),
        name: "Platform Team".into(),
        unit_type: "DEPARTMENT".into(),
        effective_date: Some("2025-03-01".into()),
        ..CreateOrganizationRequest::default()
    };
    let result = validator.validate_creation(&ctx(), TenantId::new(), &mut request);

    assert!(result.valid, "{:?}", result.errors);
    assert!(result.has_warning("ORG_DEPTH_NEAR_LIMIT"));
}

#[test]
fn reparenting_under_a_descendant_is_a_cycle() {
    init_tracing();
    let directory = Arc::new(Directory::with_chain(5));
    let validator = OrganizationValidator::new(directory);

    let mut request = UpdateOrganizationRequest {
        parent_code: Some("1000005".into()),
        ..UpdateOrganizationRequest::default()
    };
    let result = validator.validate_update(&ctx(), TenantId::new(), "1000002", &mut request);

    assert!(result.has_error("ORG_CYCLE_DETECTED"));
    assert_eq!(result.highest_severity(), Some(Severity::Critical));
}

#[test]
fn updating_a_missing_organization_is_critical() {
    let validator = OrganizationValidator::new(Arc::new(Directory::default()));
    let mut request = UpdateOrganizationRequest {
        name: Some("Renamed".into()),
        ..UpdateOrganizationRequest::default()
    };
    let result = validator.validate_update(&ctx(), TenantId::new(), "1999999", &mut request);
    assert_eq!(result.error_codes(), vec!["ORGANIZATION_NOT_FOUND"]);
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[test]
fn position_in_inactive_organization_stops_at_organization_check() {
    init_tracing();
    let directory = Arc::new(Directory::default().with_catalog());
    directory.add_organization("1000001", None, "INACTIVE");

    let result = staffing(&directory).validate_create_position(
        &ctx(),
        TenantId::new(),
        &position_request("1000001"),
    );

    assert_eq!(result.error_codes(), vec!["POS_ORG_INACTIVE"]);
    assert_eq!(result.executed_rules(), vec!["POS-ORG"]);
    assert_eq!(result.context["jobCatalog"]["role"], "PROF-IT-DEV");
}

#[test]
fn inactive_job_role_is_a_medium_violation() {
    init_tracing();
    let directory = Arc::new(Directory::default().with_catalog());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_catalog(CatalogEntity::JobRole, "PROF-IT-DEV", "INACTIVE");

    let result = staffing(&directory).validate_create_position(
        &ctx(),
        TenantId::new(),
        &position_request("1000001"),
    );

    assert!(!result.valid);
    assert_eq!(result.error_codes(), vec!["JOB_CATALOG_NOT_FOUND"]);
    let error = &result.errors[0];
    assert_eq!(error.severity, Some(Severity::Medium));
    assert_eq!(error.context["catalogEntity"], "JobRole");
    assert_eq!(error.field.as_deref(), Some("jobRoleCode"));
}

#[test]
fn job_level_missing_as_backend_text_is_reclassified() {
    let directory = Arc::new(Directory::default().with_catalog());
    directory.add_organization("1000001", None, "ACTIVE");
    let mut request = position_request("1000001");
    request.job_level_code = "P9".into();

    let result = staffing(&directory).validate_create_position(&ctx(), TenantId::new(), &request);

    assert_eq!(result.error_codes(), vec!["JOB_CATALOG_NOT_FOUND"]);
    assert_eq!(result.errors[0].context["referenceCode"], "P9");
}

#[test]
fn valid_position_echoes_catalog_and_tenant() {
    let directory = Arc::new(Directory::default().with_catalog());
    directory.add_organization("1000001", None, "ACTIVE");
    let tenant = TenantId::new();

    let result = staffing(&directory).validate_replace_position(&ctx(), tenant, "P1000001", &position_request("1000001"));

    assert!(result.valid, "{:?}", result.errors);
    assert_eq!(result.executed_rules(), vec!["POS-ORG", "POS-JC-LINK"]);
    assert_eq!(result.context["tenantId"], tenant.to_string());
    assert_eq!(result.context["targetVersion"], "CURRENT");
}

#[test]
fn transfer_checks_target_organization() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_organization("1000002", None, "PLANNED");
    let validator = staffing(&directory);

    let blocked = validator.validate_transfer_position(
        &ctx(),
        TenantId::new(),
        "P1000001",
        &TransferPositionRequest {
            target_organization_code: " 1000002 ".into(),
            effective_date: "2025-07-01".into(),
            operation_reason: String::new(),
        },
    );
    assert_eq!(blocked.error_codes(), vec!["POS_ORG_INACTIVE"]);
    assert_eq!(blocked.context["targetOrg"], "1000002");
    assert_eq!(blocked.context["crossDomainRule"], true);

    let untargeted = validator.validate_transfer_position(
        &ctx(),
        TenantId::new(),
        "P1000001",
        &TransferPositionRequest::default(),
    );
    assert!(untargeted.valid);
    assert!(untargeted.executed_rules().is_empty());
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

#[test]
fn headcount_overflow_reports_projection() {
    init_tracing();
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    directory.add_assignment("P1000001", "ACTIVE", 0.9);

    let result = staffing(&directory).validate_create_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        &assignment_request(Some(0.2)),
    );

    assert_eq!(result.error_codes(), vec!["POS_HEADCOUNT_EXCEEDED"]);
    assert!((projected_fte(&result) - 1.1).abs() < 1e-9);
    assert_eq!(
        result.executed_rules(),
        vec!["ASSIGN-FTE", "ASSIGN-STATE", "CROSS-ACTIVE", "POS-HEADCOUNT"]
    );
}

#[test]
fn fte_outside_unit_interval_is_rejected() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 2.0);
    let validator = staffing(&directory);

    for fte in [-0.5, 1.5] {
        let result = validator.validate_create_assignment(&ctx(), TenantId::new(), "P1000001", &assignment_request(Some(fte)));
        assert_eq!(result.error_codes(), vec!["ASSIGN_FTE_LIMIT"], "fte {fte}");
        assert_eq!(result.executed_rules(), vec!["ASSIGN-FTE"]);
    }

    let result = validator.validate_create_assignment(&ctx(), TenantId::new(), "P1000001", &assignment_request(Some(0.5)));
    assert!(result.valid, "{:?}", result.errors);
}

#[test]
fn fill_defaults_to_full_time() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    directory.add_assignment("P1000001", "ACTIVE", 0.5);

    let request = FillPositionRequest {
        employee_id: Uuid::new_v4(),
        employee_name: "Grace Hopper".into(),
        assignment_type: "PRIMARY".into(),
        fte: None,
        effective_date: "2025-03-01".into(),
        operation_reason: String::new(),
    };
    let result = staffing(&directory).validate_fill_position(&ctx(), TenantId::new(), "P1000001", &request);

    assert_eq!(result.error_codes(), vec!["POS_HEADCOUNT_EXCEEDED"]);
    assert!((projected_fte(&result) - 1.5).abs() < 1e-9);
    assert_eq!(result.context["operation"], "FillPosition");
}

#[test]
fn ended_assignment_cannot_change() {
    init_tracing();
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    let ended = directory.add_assignment("P1000001", "ENDED", 1.0);
    let validator = staffing(&directory);

    let update = validator.validate_update_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        ended,
        &UpdateAssignmentRequest {
            fte: Some(0.5),
            ..UpdateAssignmentRequest::default()
        },
    );
    assert_eq!(update.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
    assert_eq!(update.context["existingStatus"], "ENDED");

    let close = validator.validate_close_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        ended,
        &CloseAssignmentRequest::default(),
    );
    assert_eq!(close.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
    assert_eq!(close.executed_rules(), vec!["ASSIGN-STATE"]);
}

#[test]
fn pending_assignment_cannot_close() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    let pending = directory.add_assignment("P1000001", "PENDING", 1.0);
    let active = directory.add_assignment("P1000001", "ACTIVE", 0.5);
    let validator = staffing(&directory);

    let close = validator.validate_close_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        pending,
        &CloseAssignmentRequest::default(),
    );
    assert_eq!(close.error_codes(), vec!["ASSIGN_INVALID_STATE"]);
    assert_eq!(close.errors[0].context["currentState"], "PENDING");

    let close = validator.validate_close_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        active,
        &CloseAssignmentRequest::default(),
    );
    assert!(close.valid, "{:?}", close.errors);
}

#[test]
fn update_projection_replaces_original_fte() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    let id = directory.add_assignment("P1000001", "ACTIVE", 0.6);
    directory.add_assignment("P1000001", "ACTIVE", 0.4);

    let result = staffing(&directory).validate_update_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        id,
        &UpdateAssignmentRequest {
            fte: Some(0.5),
            ..UpdateAssignmentRequest::default()
        },
    );

    assert!(result.valid, "{:?}", result.errors);
    let projected = result.context["rule:POS-HEADCOUNT"]["projectedFTE"]
        .as_f64()
        .expect("projection recorded");
    assert!((projected - 0.9).abs() < 1e-9);
}

#[test]
fn assignment_into_inactive_organization_conflicts() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "INACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);

    let result = staffing(&directory).validate_create_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        &assignment_request(Some(1.0)),
    );

    assert_eq!(result.error_codes(), vec!["CROSS_ACTIVATION_CONFLICT"]);
    assert_eq!(result.errors[0].context["organizationStatus"], "INACTIVE");
}

#[test]
fn missing_position_passes_through() {
    let directory = Arc::new(Directory::default());
    let result = staffing(&directory).validate_create_assignment(
        &ctx(),
        TenantId::new(),
        "P404",
        &assignment_request(Some(1.0)),
    );
    assert!(result.valid);
    assert!(result.errors.is_empty());
}

#[test]
fn backend_outage_fails_closed() {
    init_tracing();
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    directory.offline.store(true, Ordering::SeqCst);

    let result = staffing(&directory).validate_create_assignment(
        &ctx(),
        TenantId::new(),
        "P1000001",
        &assignment_request(Some(1.0)),
    );

    assert_eq!(result.error_codes(), vec!["POSITION_CONTEXT_UNAVAILABLE"]);
    assert!(result.errors[0].is_internal());
    assert_eq!(result.highest_severity(), Some(Severity::Critical));
}

#[test]
fn cancelled_context_runs_no_rules() {
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);

    let ctx = ctx();
    ctx.cancel();
    let result = staffing(&directory).validate_create_assignment(
        &ctx,
        TenantId::new(),
        "P1000001",
        &assignment_request(Some(5.0)),
    );

    assert!(result.is_cancelled());
    assert!(result.executed_rules().is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn staffing_chains_report_to_prometheus() {
    let metrics = Arc::new(PrometheusMetrics::new().expect("collectors build"));
    let directory = Arc::new(Directory::default());
    directory.add_organization("1000001", None, "ACTIVE");
    directory.add_position("P1000001", "1000001", "ACTIVE", 1.0);
    let validator = staffing(&directory).with_metrics(metrics.clone());

    validator.validate_create_assignment(&ctx(), TenantId::new(), "P1000001", &assignment_request(Some(1.5)));

    assert_eq!(metrics.rule_outcome_count("ASSIGN-FTE", RuleOutcomeKind::Failed), 1);
    assert_eq!(metrics.chain_outcome_count("CreateAssignment", ChainOutcome::Failed), 1);
}

// ---------------------------------------------------------------------------
// Job catalog
// ---------------------------------------------------------------------------

#[test]
fn job_catalog_versions_follow_the_timeline() {
    init_tracing();
    let directory = Arc::new(Directory::default());
    let latest = directory.add_version(CatalogEntity::JobFamily, "PROF-IT", "2025-01-01");
    let service: Arc<dyn JobCatalogValidationService> = Arc::new(JobCatalogValidator::new(directory.clone()));
    let tenant = TenantId::new();
    let request = |date: &str| JobCatalogVersionRequest {
        effective_date: date.into(),
        ..JobCatalogVersionRequest::default()
    };

    let first_group = service.validate_create_family_group_version(&ctx(), tenant, "prof", &request("2025-01-01"));
    assert!(first_group.valid);

    let same_day = service.validate_create_job_family_version(&ctx(), tenant, "prof-it", &request("2025-01-01"), Some(latest));
    assert_eq!(same_day.error_codes(), vec!["JOB_CATALOG_TEMPORAL_CONFLICT"]);

    let wrong_parent = service.validate_create_job_family_version(
        &ctx(),
        tenant,
        "PROF-IT",
        &request("2025-04-01"),
        Some(Uuid::new_v4()),
    );
    assert_eq!(wrong_parent.error_codes(), vec!["JOB_CATALOG_SEQUENCE_MISMATCH"]);

    let no_parent = service.validate_create_job_family_version(&ctx(), tenant, "PROF-IT", &request("2025-04-01"), None);
    assert_eq!(no_parent.error_codes(), vec!["JOB_CATALOG_SEQUENCE_MISSING_PARENT"]);

    let linked = service.validate_create_job_family_version(&ctx(), tenant, "PROF-IT", &request("2025-04-01"), Some(latest));
    assert!(linked.valid, "{:?}", linked.errors);
}
