#![deny(missing_docs)]

//! # castle-core: Foundational Types for Business-Rule Validation
//!
//! This crate defines the vocabulary every rule, chain, and caller exchanges.
//! It has no internal crate dependencies. External dependencies are limited to
//! `serde`, `serde_json`, `thiserror`, `chrono` and `uuid`.
//!
//! ## Design Principles
//!
//! 1. **Validation failures are data.** A business-rule violation is a
//!    [`ValidationError`] inside a [`ValidationResult`], never a panic and
//!    never an `Err` from the engine.
//!
//! 2. **Severity is presentation, not validity.** [`Severity`] drives
//!    [`severity_to_http_status`] only. A result with nothing but warnings is
//!    still valid.
//!
//! 3. **One failure type for callers.** [`ValidationFailedError`] is the only
//!    error the service layer is expected to branch on.
//!
//! 4. **"Not found" is a kind, not a string.** [`LookupError::NotFound`]
//!    lets rule catalogs reclassify missing references into specific
//!    validation codes.

pub mod error;
pub mod identity;
pub mod model;
pub mod request;
pub mod result;
pub mod severity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{LookupError, ValidationFailedError};
pub use identity::TenantId;
pub use model::{
    normalize_status, Assignment, AssignmentStatus, CatalogEntity, CatalogRecord, Organization,
    OrganizationNode, OrganizationStatus, Position, PositionStatus, TimelineEntry, UnitType,
};
pub use result::{ContextMap, ValidationError, ValidationResult, ValidationWarning};
pub use severity::{severity_to_http_status, Severity};
pub use temporal::{format_date, parse_effective_date, DateParseError, DATE_LAYOUT};
