//! Static operation catalog: which permissions each operation demands.
//!
//! Built once at startup behind a `Lazy` and never mutated afterward, so it
//! is freely shared across in-flight requests. Lookup fails closed: an
//! operation with no entry is a configuration fault, never an implicit
//! grant.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Table- and attribute-level CRUD rights a role may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Insert,
    Update,
    Delete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Insert => "insert",
            Permission::Update => "update",
            Permission::Delete => "delete",
        }
    }
}

/// Stable identifiers for every operation the dispatcher can route.
/// Keyed as an enum rather than by handler name so renames cannot silently
/// detach an operation from its catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationId {
    SearchById,
    SearchByValue,
    SearchByConditions,
    Insert,
    Update,
    Upsert,
    Delete,
    BulkLoad,
    DescribeAll,
    DescribeSchema,
    DescribeTable,
    CreateSchema,
    DropSchema,
    CreateTable,
    DropTable,
    CreateAttribute,
    DropAttribute,
    AddUser,
    AlterUser,
    DropUser,
    ListUsers,
    AddRole,
    AlterRole,
    DropRole,
    ListRoles,
}

impl OperationId {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationId::SearchById => "search_by_id",
            OperationId::SearchByValue => "search_by_value",
            OperationId::SearchByConditions => "search_by_conditions",
            OperationId::Insert => "insert",
            OperationId::Update => "update",
            OperationId::Upsert => "upsert",
            OperationId::Delete => "delete",
            OperationId::BulkLoad => "bulk_load",
            OperationId::DescribeAll => "describe_all",
            OperationId::DescribeSchema => "describe_schema",
            OperationId::DescribeTable => "describe_table",
            OperationId::CreateSchema => "create_schema",
            OperationId::DropSchema => "drop_schema",
            OperationId::CreateTable => "create_table",
            OperationId::DropTable => "drop_table",
            OperationId::CreateAttribute => "create_attribute",
            OperationId::DropAttribute => "drop_attribute",
            OperationId::AddUser => "add_user",
            OperationId::AlterUser => "alter_user",
            OperationId::DropUser => "drop_user",
            OperationId::ListUsers => "list_users",
            OperationId::AddRole => "add_role",
            OperationId::AlterRole => "alter_role",
            OperationId::DropRole => "drop_role",
            OperationId::ListRoles => "list_roles",
        }
    }

    /// Mutations that are rejected outright against the reserved system
    /// schema, independent of any role grant.
    pub fn is_system_guarded_mutation(&self) -> bool {
        matches!(
            self,
            OperationId::Delete
                | OperationId::Update
                | OperationId::Upsert
                | OperationId::DropSchema
                | OperationId::DropTable
                | OperationId::DropAttribute
        )
    }

    /// Structure-definition operations eligible for the structure-user bypass.
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            OperationId::CreateSchema
                | OperationId::DropSchema
                | OperationId::CreateTable
                | OperationId::DropTable
                | OperationId::CreateAttribute
                | OperationId::DropAttribute
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub requires_super_user: bool,
    /// Ordered list; order is preserved into denial reports.
    pub required_permissions: Vec<Permission>,
}

#[derive(Debug, Default)]
pub struct PermissionCatalog {
    entries: HashMap<OperationId, CatalogEntry>,
}

impl PermissionCatalog {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn register(&mut self, op: OperationId, requires_super_user: bool, perms: &[Permission]) {
        self.entries.insert(op, CatalogEntry { requires_super_user, required_permissions: perms.to_vec() });
    }

    pub fn lookup(&self, op: OperationId) -> EngineResult<&CatalogEntry> {
        self.entries.get(&op).ok_or_else(|| {
            EngineError::user(
                "operation_not_registered".to_string(),
                format!("operation '{}' is not registered", op.as_str()),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide catalog, assembled once on first use.
static CATALOG: Lazy<PermissionCatalog> = Lazy::new(default_catalog);

pub fn lookup(op: OperationId) -> EngineResult<&'static CatalogEntry> {
    CATALOG.lookup(op)
}

fn default_catalog() -> PermissionCatalog {
    use OperationId as Op;
    use Permission as P;
    let mut c = PermissionCatalog::new();
    // Reads
    c.register(Op::SearchById, false, &[P::Read]);
    c.register(Op::SearchByValue, false, &[P::Read]);
    c.register(Op::SearchByConditions, false, &[P::Read]);
    // Record mutations
    c.register(Op::Insert, false, &[P::Insert]);
    c.register(Op::Update, false, &[P::Update]);
    c.register(Op::Upsert, false, &[P::Insert, P::Update]);
    c.register(Op::Delete, false, &[P::Delete]);
    // Bulk loads carry an explicit action that substitutes for this list
    c.register(Op::BulkLoad, false, &[P::Insert, P::Update]);
    // Visibility: empty permission lists so failures surface only as
    // invalid items, never as unauthorized-access detail
    c.register(Op::DescribeAll, false, &[]);
    c.register(Op::DescribeSchema, false, &[]);
    c.register(Op::DescribeTable, false, &[]);
    // Structure definition
    c.register(Op::CreateSchema, false, &[P::Insert]);
    c.register(Op::DropSchema, false, &[P::Delete]);
    c.register(Op::CreateTable, false, &[P::Insert]);
    c.register(Op::DropTable, false, &[P::Delete]);
    c.register(Op::CreateAttribute, false, &[P::Insert]);
    c.register(Op::DropAttribute, false, &[P::Delete]);
    // Administrative surface, super-user only
    c.register(Op::AddUser, true, &[]);
    c.register(Op::AlterUser, true, &[]);
    c.register(Op::DropUser, true, &[]);
    c.register(Op::ListUsers, true, &[]);
    c.register(Op::AddRole, true, &[]);
    c.register(Op::AlterRole, true, &[]);
    c.register(Op::DropRole, true, &[]);
    c.register(Op::ListRoles, true, &[]);
    c
}
