#![deny(missing_docs)]

//! # castle-rules: Business-Rule Catalogs and Validator Services
//!
//! The domain rules that run inside [`castle_chain::ValidationChain`]s, and
//! the validator services that assemble a chain per operation.
//!
//! ## Catalogs
//!
//! | Module          | Rules                                                        |
//! |-----------------|--------------------------------------------------------------|
//! | [`hierarchy`]   | ORG-DEPTH, ORG-CIRC, ORG-STATUS, ORG-TEMPORAL                |
//! | [`position`]    | POS-ORG, POS-JC-LINK, POS-HEADCOUNT, ASSIGN-FTE, ASSIGN-STATE, CROSS-ACTIVE |
//! | [`job_catalog`] | JC-TEMPORAL, JC-SEQUENCE                                     |
//!
//! ## Services
//!
//! - [`OrganizationValidator`] validates organization create/update requests
//!   and temporal parent availability.
//! - [`PositionAssignmentValidator`] implements
//!   [`PositionValidationService`] and [`AssignmentValidationService`].
//! - [`JobCatalogValidator`] implements [`JobCatalogValidationService`].
//!
//! Every service reads through the traits in [`readmodel`] and returns a
//! [`castle_core::ValidationResult`]. Rules receive a [`Subject`], the closed
//! set of inputs the catalogs understand.

pub mod config;
pub mod hierarchy;
pub mod job_catalog;
pub mod organization;
pub mod position;
pub mod readmodel;
pub mod service;
pub mod subject;

pub use config::{ConfigError, ValidationConfig};
pub use hierarchy::{HierarchyLimits, HierarchyRules};
pub use job_catalog::JobCatalogValidator;
pub use organization::OrganizationValidator;
pub use position::{PositionAssignmentValidator, PositionRules};
pub use readmodel::{
    AssignmentReadModel, HierarchyReadModel, JobCatalogReadModel, JobCatalogTimelineReadModel,
    OrganizationReadModel, PositionReadModel,
};
pub use service::{AssignmentValidationService, JobCatalogValidationService, PositionValidationService};
pub use subject::Subject;
