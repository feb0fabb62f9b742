//! Role-based, attribute-granular authorization.
//!
//! Every reading or mutating operation, issued as a structured request or as
//! a parsed SQL statement, is resolved here against the caller's
//! materialized role tree before execution. Two thin adapters (operation and
//! statement) normalize their input into `{schema→tables, attribute set,
//! action}` and run one shared pipeline: catalog lookup → bypass checks →
//! table pass → attribute pass → report. Keep each concern in a small
//! sub-module; the engine sits on the hot path of every request.

pub mod attr_check;
pub mod catalog;
pub mod extract;
pub mod operation;
pub mod report;
pub mod request;
pub mod role;
pub mod statement;
pub mod table_check;

// Re-exports for a thin public surface
pub use catalog::{CatalogEntry, OperationId, Permission, PermissionCatalog};
pub use operation::authorize_operation;
pub use report::{AttributeViolation, DenialBody, TableViolation, ViolationReport, DENIAL_ERROR};
pub use request::{BulkAction, OperationRequest, SearchCondition};
pub use role::{AttributePermission, RolePermissionTree, SchemaPerm, StructureUser, TablePerm};
pub use statement::{authorize_statement, StatementAnalyzer, StatementSummary};
