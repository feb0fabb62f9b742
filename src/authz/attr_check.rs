//! Attribute pass of the shared decision core.
//!
//! Only runs meaningfully against tables that carry attribute-level
//! restrictions; an unrestricted table is already fully gated by the table
//! pass. Unknown or invisible attributes go to the invalid list; placing
//! them under unauthorized access would confirm their existence.

use std::collections::BTreeSet;

use crate::error::{EngineError, EngineResult};
use crate::ident::is_timestamp_attr;

use super::catalog::{self, OperationId, Permission};
use super::report::{attribute_missing_msg, ViolationReport};
use super::request::BulkAction;
use super::role::TablePerm;

/// Evaluate per-attribute CRUD rights for one schema/table pair, merging
/// denials into the shared report. No return value on success; the caller
/// inspects the report afterward.
pub fn check_attribute_permissions(
    attributes: &BTreeSet<String>,
    table_perm: &TablePerm,
    op: OperationId,
    schema: &str,
    table: &str,
    report: &mut ViolationReport,
    action: Option<BulkAction>,
) -> EngineResult<()> {
    if !table_perm.restricted() {
        return Ok(());
    }
    let entry = catalog::lookup(op)?;
    let required: &[Permission] = match action {
        Some(a) => a.required_permissions(),
        None => &entry.required_permissions,
    };
    let wants_write = required.iter().any(|p| *p != Permission::Read);

    for attribute in attributes {
        let attr_perm = match table_perm.attribute(attribute) {
            Some(p) if p.describe => p,
            // Allow-list law: absent from the list means fully denied, and
            // invisible reads the same as absent.
            _ => {
                report.invalid(attribute_missing_msg(schema, table, attribute));
                continue;
            }
        };
        // Engine-maintained timestamps are never user-writable, regardless
        // of what the role claims to grant.
        if wants_write && is_timestamp_attr(attribute) {
            return Err(EngineError::forbidden(
                "timestamp_attribute_write".to_string(),
                format!("attribute '{}' is maintained by the engine and is read-only", attribute),
            ));
        }
        let missing: Vec<Permission> =
            required.iter().copied().filter(|p| !attr_perm.allows(*p)).collect();
        if !missing.is_empty() {
            report.require_attribute_permissions(schema, table, attribute, missing);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::role::AttributePermission;
    use crate::ident::UPDATED_TIME_ATTR;

    fn attrs(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn restricted_table() -> TablePerm {
        let mut perm = TablePerm::default();
        let mut name = AttributePermission::named("name");
        name.read = Some(true);
        name.insert = Some(true);
        let mut age = AttributePermission::named("age");
        age.read = Some(true);
        perm.attribute_permissions = vec![name, age];
        perm
    }

    #[test]
    fn unrestricted_table_is_a_no_op() {
        let mut report = ViolationReport::new();
        check_attribute_permissions(
            &attrs(&["anything"]),
            &TablePerm::default(),
            OperationId::Insert,
            "dev",
            "dog",
            &mut report,
            None,
        )
        .unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn absent_attribute_goes_to_invalid_items_only() {
        let mut report = ViolationReport::new();
        check_attribute_permissions(
            &attrs(&["breed"]),
            &restricted_table(),
            OperationId::SearchByValue,
            "dev",
            "dog",
            &mut report,
            None,
        )
        .unwrap();
        assert_eq!(report.invalid_items(), [attribute_missing_msg("dev", "dog", "breed")]);
        assert_eq!(report.unauthorized().count(), 0);
    }

    #[test]
    fn invisible_attribute_reads_identically_to_absent() {
        let mut table = restricted_table();
        let mut hidden = AttributePermission::named("breed");
        hidden.describe = false;
        hidden.read = Some(true);
        table.attribute_permissions.push(hidden);
        let mut with_entry = ViolationReport::new();
        check_attribute_permissions(
            &attrs(&["breed"]),
            &table,
            OperationId::SearchByValue,
            "dev",
            "dog",
            &mut with_entry,
            None,
        )
        .unwrap();
        let mut without_entry = ViolationReport::new();
        check_attribute_permissions(
            &attrs(&["breed"]),
            &restricted_table(),
            OperationId::SearchByValue,
            "dev",
            "dog",
            &mut without_entry,
            None,
        )
        .unwrap();
        assert_eq!(with_entry.invalid_items(), without_entry.invalid_items());
    }

    #[test]
    fn missing_permissions_accumulate_per_attribute() {
        let mut report = ViolationReport::new();
        check_attribute_permissions(
            &attrs(&["name", "age"]),
            &restricted_table(),
            OperationId::Update,
            "dev",
            "dog",
            &mut report,
            None,
        )
        .unwrap();
        let v = report.unauthorized_for("dev", "dog").unwrap();
        assert_eq!(v.required_attribute_permissions.len(), 2);
        for a in &v.required_attribute_permissions {
            assert_eq!(a.required_permissions, vec![Permission::Update]);
        }
    }

    #[test]
    fn timestamp_write_is_rejected_even_when_granted() {
        let mut table = restricted_table();
        let mut ts = AttributePermission::named(UPDATED_TIME_ATTR);
        ts.read = Some(true);
        ts.update = Some(true); // explicit grant changes nothing
        table.attribute_permissions.push(ts);
        let mut report = ViolationReport::new();
        let err = check_attribute_permissions(
            &attrs(&[UPDATED_TIME_ATTR]),
            &table,
            OperationId::Update,
            "dev",
            "dog",
            &mut report,
            None,
        )
        .unwrap_err();
        assert_eq!(err.http_status(), 403);
        assert_eq!(err.code_str(), "timestamp_attribute_write");
    }

    #[test]
    fn timestamp_read_is_allowed() {
        let mut table = restricted_table();
        let mut ts = AttributePermission::named(UPDATED_TIME_ATTR);
        ts.read = Some(true);
        table.attribute_permissions.push(ts);
        let mut report = ViolationReport::new();
        check_attribute_permissions(
            &attrs(&[UPDATED_TIME_ATTR]),
            &table,
            OperationId::SearchByValue,
            "dev",
            "dog",
            &mut report,
            None,
        )
        .unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn bulk_action_narrows_required_permissions() {
        let mut report = ViolationReport::new();
        // name grants insert; update would be missing, but the action says insert.
        check_attribute_permissions(
            &attrs(&["name"]),
            &restricted_table(),
            OperationId::BulkLoad,
            "dev",
            "dog",
            &mut report,
            Some(BulkAction::Insert),
        )
        .unwrap();
        assert!(report.is_clean());
    }
}
