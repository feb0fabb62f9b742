//! Violation report: the per-call accumulator both checkers write into.
//!
//! Two disjoint collections with a deliberate security property between them:
//! `invalid_items` carries existence/visibility denials whose message is
//! identical whether the object truly does not exist or is merely invisible
//! to the role, while `unauthorized` carries permission detail only for
//! objects the role is allowed to know about.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ident::table_key;

use super::catalog::{OperationId, Permission};

/// Fixed top-level error string of the client-facing denial body.
pub const DENIAL_ERROR: &str = "insufficient permissions to execute operation";

/// Invalid-item message an unassigned or unmaterialized role receives.
pub const NO_PERMISSIONS_MSG: &str = "no permissions assigned to this role";

pub fn schema_missing_msg(schema: &str) -> String {
    format!("schema '{}' does not exist", schema)
}

pub fn table_missing_msg(schema: &str, table: &str) -> String {
    format!("table '{}' does not exist", table_key(schema, table))
}

pub fn attribute_missing_msg(schema: &str, table: &str, attribute: &str) -> String {
    format!("attribute '{}.{}' does not exist", table_key(schema, table), attribute)
}

pub fn super_user_required_msg(op: OperationId) -> String {
    format!("operation '{}' is restricted to super-user roles", op.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeViolation {
    pub attribute_name: String,
    pub required_permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableViolation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub schema: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub table: String,
    pub required_table_permissions: Vec<Permission>,
    pub required_attribute_permissions: Vec<AttributeViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TableViolation {
    fn new(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            required_table_permissions: Vec::new(),
            required_attribute_permissions: Vec::new(),
            message: None,
        }
    }
}

/// Client-facing denial body, serialized exactly as the API returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialBody {
    pub error: &'static str,
    pub invalid_schema_items: Vec<String>,
    pub unauthorized_access: Vec<TableViolation>,
}

/// Created fresh per authorization call and owned exclusively by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationReport {
    invalid_items: Vec<String>,
    unauthorized: BTreeMap<String, TableViolation>,
}

impl ViolationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an existence/visibility denial. Deduplicated: the table and
    /// attribute passes may both touch the same invisible object.
    pub fn invalid(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.invalid_items.contains(&msg) {
            self.invalid_items.push(msg);
        }
    }

    /// Record that the operation is reserved for super-user roles. This
    /// entry supersedes all table-level detail.
    pub fn super_user_required(&mut self, op: OperationId) {
        let mut v = TableViolation::new("", "");
        v.message = Some(super_user_required_msg(op));
        self.unauthorized.insert(op.as_str().to_string(), v);
    }

    /// Merge missing table-level permissions into the table's entry.
    pub fn require_table_permissions(&mut self, schema: &str, table: &str, perms: Vec<Permission>) {
        let entry = self
            .unauthorized
            .entry(table_key(schema, table))
            .or_insert_with(|| TableViolation::new(schema, table));
        for p in perms {
            if !entry.required_table_permissions.contains(&p) {
                entry.required_table_permissions.push(p);
            }
        }
    }

    /// Merge missing attribute-level permissions into the table's entry,
    /// creating it if the table pass did not already.
    pub fn require_attribute_permissions(
        &mut self,
        schema: &str,
        table: &str,
        attribute: &str,
        perms: Vec<Permission>,
    ) {
        let entry = self
            .unauthorized
            .entry(table_key(schema, table))
            .or_insert_with(|| TableViolation::new(schema, table));
        if let Some(existing) = entry
            .required_attribute_permissions
            .iter_mut()
            .find(|a| a.attribute_name == attribute)
        {
            for p in perms {
                if !existing.required_permissions.contains(&p) {
                    existing.required_permissions.push(p);
                }
            }
        } else {
            entry.required_attribute_permissions.push(AttributeViolation {
                attribute_name: attribute.to_string(),
                required_permissions: perms,
            });
        }
    }

    pub fn invalid_items(&self) -> &[String] {
        &self.invalid_items
    }

    pub fn unauthorized(&self) -> impl Iterator<Item = &TableViolation> {
        self.unauthorized.values()
    }

    pub fn unauthorized_for(&self, schema: &str, table: &str) -> Option<&TableViolation> {
        self.unauthorized.get(&table_key(schema, table))
    }

    pub fn is_clean(&self) -> bool {
        self.invalid_items.is_empty() && self.unauthorized.is_empty()
    }

    /// Finalize: `None` means authorized.
    pub fn finish(self) -> Option<ViolationReport> {
        if self.is_clean() {
            None
        } else {
            Some(self)
        }
    }

    /// Convert into the client-facing body.
    pub fn into_body(self) -> DenialBody {
        DenialBody {
            error: DENIAL_ERROR,
            invalid_schema_items: self.invalid_items,
            unauthorized_access: self.unauthorized.into_values().collect(),
        }
    }
}
