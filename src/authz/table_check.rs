//! Schema/table pass of the shared decision core.
//!
//! Ordering matters and is part of the contract: super-user short-circuit,
//! then the super-user-required refusal, then the system-schema mutation
//! hard rule, then schema visibility, table visibility, and table CRUD.
//! Visibility failures never descend further, so a caller cannot learn
//! whether a hidden schema contains tables.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EngineError, EngineResult};
use crate::ident::{is_system_schema, SYSTEM_SCHEMA};

use super::catalog::{self, OperationId, Permission};
use super::report::{schema_missing_msg, table_missing_msg, ViolationReport};
use super::request::BulkAction;
use super::role::RolePermissionTree;

/// Outcome of the table pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableVerdict {
    /// A bypass applied; no further checks are needed.
    Authorized,
    /// A superseding refusal was recorded; skip the attribute pass.
    Denied,
    /// Proceed to the attribute pass; the report may still grow. Requests
    /// spanning several schema/table pairs only become final afterward.
    Continue,
}

/// Hard rule, independent of any role grant: mutating operations never touch
/// the reserved system schema. Raised (403), not reported, so bypass paths
/// must consult it too.
pub fn system_schema_guard(
    op: OperationId,
    schema_tables: &BTreeMap<String, BTreeSet<String>>,
) -> EngineResult<()> {
    if op.is_system_guarded_mutation() && schema_tables.keys().any(|s| is_system_schema(s)) {
        return Err(EngineError::forbidden(
            "system_schema_mutation".to_string(),
            format!("operation '{}' is not permitted against schema '{}'", op.as_str(), SYSTEM_SCHEMA),
        ));
    }
    Ok(())
}

/// Evaluate schema/table existence, visibility, and table-level CRUD rights
/// for every pair in the map, accumulating denials into `report`.
pub fn check_table_permissions(
    role: &RolePermissionTree,
    op: OperationId,
    schema_tables: &BTreeMap<String, BTreeSet<String>>,
    action: Option<BulkAction>,
    report: &mut ViolationReport,
) -> EngineResult<TableVerdict> {
    let entry = catalog::lookup(op)?;
    let touches_system = schema_tables.keys().any(|s| is_system_schema(s));

    // Super-user short-circuit. Operations that touch the system schema fall
    // through to the hard rule below; entries that themselves require
    // super-user are administrative and bypass unconditionally.
    if role.super_user && (!touches_system || entry.requires_super_user) {
        tracing::debug!(op = op.as_str(), "super-user bypass");
        return Ok(TableVerdict::Authorized);
    }

    if entry.requires_super_user {
        report.super_user_required(op);
        return Ok(TableVerdict::Denied);
    }

    system_schema_guard(op, schema_tables)?;

    for (schema, tables) in schema_tables {
        let Some(schema_perm) = role.schema(schema) else {
            // No visibility: identical message to a truly absent schema, and
            // no descent into its tables.
            report.invalid(schema_missing_msg(schema));
            continue;
        };
        if !schema_perm.describe {
            report.invalid(schema_missing_msg(schema));
            continue;
        }
        for table in tables {
            let table_perm = match schema_perm.tables.get(table) {
                Some(p) if p.describe => p,
                _ => {
                    report.invalid(table_missing_msg(schema, table));
                    continue;
                }
            };
            let required: &[Permission] = match action {
                Some(a) => a.required_permissions(),
                None => &entry.required_permissions,
            };
            let missing: Vec<Permission> =
                required.iter().copied().filter(|p| !table_perm.allows(*p)).collect();
            if !missing.is_empty() {
                report.require_table_permissions(schema, table, missing);
            }
        }
    }
    Ok(TableVerdict::Continue)
}
