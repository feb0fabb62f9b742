//! Direct-operation entry point of the authorizer.
//!
//! Thin adapter over the shared table/attribute checkers: normalizes the
//! request into the `{schema → tables}` map, applies the structure-user
//! bypass, rewrites wildcard projections in place, and finalizes the
//! per-call report.

use crate::error::EngineResult;
use crate::ident::WILDCARD_ATTR;

use super::catalog::{self, OperationId};
use super::extract::extract_attributes;
use super::report::{ViolationReport, NO_PERMISSIONS_MSG};
use super::request::OperationRequest;
use super::role::RolePermissionTree;
use super::attr_check;
use super::table_check::{check_table_permissions, system_schema_guard, TableVerdict};

/// Authorize one direct operation request. `Ok(None)` means authorized; a
/// returned report is an ordinary denial; hard policy violations and
/// configuration faults are raised.
///
/// The request is taken mutably because an authorized wildcard projection is
/// rewritten in place to the exact attribute set the role may read.
pub fn authorize_operation(
    role: Option<&RolePermissionTree>,
    op: OperationId,
    req: &mut OperationRequest,
) -> EngineResult<Option<ViolationReport>> {
    // Fail closed before anything else: an unregistered operation is a
    // configuration fault, not a permission outcome.
    catalog::lookup(op)?;

    let mut report = ViolationReport::new();
    let Some(role) = role.filter(|r| !r.is_empty()) else {
        report.invalid(NO_PERMISSIONS_MSG);
        return Ok(report.finish());
    };

    let schema_tables = req.schema_table_map();

    // Structure-user bypass: DDL without full CRUD checks, scoped to the
    // named schemas when the flag is a list. The system-schema hard rule
    // still applies.
    if op.is_ddl()
        && !schema_tables.is_empty()
        && schema_tables.keys().all(|s| role.structure_user.covers(s))
    {
        system_schema_guard(op, &schema_tables)?;
        tracing::debug!(op = op.as_str(), "structure-user bypass");
        return Ok(None);
    }

    rewrite_wildcard_projection(role, req);

    match check_table_permissions(role, op, &schema_tables, req.action, &mut report)? {
        TableVerdict::Authorized => return Ok(None),
        TableVerdict::Denied => return Ok(report.finish()),
        TableVerdict::Continue => {}
    }

    let attributes = extract_attributes(req);
    if !attributes.is_empty() {
        for (schema, tables) in &schema_tables {
            let Some(schema_perm) = role.schema(schema).filter(|s| s.describe) else {
                continue; // already an invalid item; nothing to consult
            };
            for table in tables {
                let Some(table_perm) = schema_perm.tables.get(table).filter(|t| t.describe) else {
                    continue;
                };
                attr_check::check_attribute_permissions(
                    &attributes,
                    table_perm,
                    op,
                    schema,
                    table,
                    &mut report,
                    req.action,
                )?;
            }
        }
    }

    if !report.is_clean() {
        tracing::debug!(op = op.as_str(), "operation denied");
    }
    Ok(report.finish())
}

/// Rewrite `get_attributes: ["*"]` to the exact set the role may read, or to
/// the table's full known attribute list when no attribute restrictions
/// exist. Downstream execution never sees an un-authorized wildcard.
fn rewrite_wildcard_projection(role: &RolePermissionTree, req: &mut OperationRequest) {
    if !req.wants_all_attributes() {
        return;
    }
    let (Some(schema), Some(table)) = (req.schema_name(), req.table_name()) else {
        return;
    };
    let Some(table_perm) = role.table(&schema, &table) else {
        return;
    };
    if !table_perm.read {
        return;
    }
    if table_perm.restricted() {
        // Always substitute the readable subset, even when it is empty: an
        // allow-list that grants read on nothing narrows the projection to
        // nothing. Leaving the wildcard in place would hand the executor
        // every attribute of the table.
        req.get_attributes = table_perm.readable_attributes();
        return;
    }
    let known: Vec<String> = req
        .known_attributes
        .iter()
        .filter(|a| *a != WILDCARD_ATTR)
        .cloned()
        .collect();
    // No restrictions and no catalog knowledge: the wildcard stays for the
    // executor's own projection handling.
    if !known.is_empty() {
        req.get_attributes = known;
    }
}
