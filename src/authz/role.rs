//! Materialized role permission tree.
//!
//! Role documents are resolved and materialized by an external role resolver;
//! this engine only ever reads a snapshot passed per call and never caches or
//! mutates it. `describe` flags default to `true` when an entry exists (an
//! entry that names an object implies visibility unless explicitly revoked);
//! CRUD flags default to denied.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::Permission;

fn default_true() -> bool {
    true
}

/// Structure-user flag: `true`/`false`, or an allow-list of schema names the
/// DDL bypass is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructureUser {
    Flag(bool),
    Schemas(Vec<String>),
}

impl Default for StructureUser {
    fn default() -> Self {
        StructureUser::Flag(false)
    }
}

impl StructureUser {
    /// Whether the DDL bypass applies to the given schema.
    pub fn covers(&self, schema: &str) -> bool {
        match self {
            StructureUser::Flag(enabled) => *enabled,
            StructureUser::Schemas(list) => list.iter().any(|s| s.eq_ignore_ascii_case(schema)),
        }
    }
}

/// Per-attribute rights. Once a table carries any of these, every attribute
/// absent from the list is implicitly fully denied (allow-list semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePermission {
    pub attribute_name: String,
    #[serde(default = "default_true")]
    pub describe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
}

impl AttributePermission {
    pub fn named(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            describe: true,
            read: None,
            insert: None,
            update: None,
            delete: None,
        }
    }

    /// Unset permissions count as denied.
    pub fn allows(&self, perm: Permission) -> bool {
        let flag = match perm {
            Permission::Read => self.read,
            Permission::Insert => self.insert,
            Permission::Update => self.update,
            Permission::Delete => self.delete,
        };
        flag.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePerm {
    #[serde(default = "default_true")]
    pub describe: bool,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub insert: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub attribute_permissions: Vec<AttributePermission>,
}

impl Default for TablePerm {
    fn default() -> Self {
        Self {
            describe: true,
            read: false,
            insert: false,
            update: false,
            delete: false,
            attribute_permissions: Vec::new(),
        }
    }
}

impl TablePerm {
    pub fn allows(&self, perm: Permission) -> bool {
        match perm {
            Permission::Read => self.read,
            Permission::Insert => self.insert,
            Permission::Update => self.update,
            Permission::Delete => self.delete,
        }
    }

    /// True once any attribute-level permission is configured; from that
    /// point attribute access is allow-list gated.
    pub fn restricted(&self) -> bool {
        !self.attribute_permissions.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributePermission> {
        self.attribute_permissions.iter().find(|a| a.attribute_name == name)
    }

    /// Attributes this table grants visible read access to, in declaration order.
    pub fn readable_attributes(&self) -> Vec<String> {
        self.attribute_permissions
            .iter()
            .filter(|a| a.describe && a.read == Some(true))
            .map(|a| a.attribute_name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaPerm {
    #[serde(default = "default_true")]
    pub describe: bool,
    #[serde(default)]
    pub tables: BTreeMap<String, TablePerm>,
}

impl Default for SchemaPerm {
    fn default() -> Self {
        Self { describe: true, tables: BTreeMap::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionTree {
    #[serde(default)]
    pub super_user: bool,
    #[serde(default)]
    pub structure_user: StructureUser,
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaPerm>,
}

impl RolePermissionTree {
    pub fn schema(&self, name: &str) -> Option<&SchemaPerm> {
        self.schemas.get(name)
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&TablePerm> {
        self.schemas.get(schema).and_then(|s| s.tables.get(table))
    }

    /// A role with no bypass and no schema grants has nothing materialized.
    pub fn is_empty(&self) -> bool {
        !self.super_user && self.structure_user == StructureUser::Flag(false) && self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_role_document_with_defaults() {
        let doc = r#"{
            "super_user": false,
            "structure_user": ["dev"],
            "schemas": {
                "dev": {
                    "tables": {
                        "dog": {
                            "insert": true,
                            "attribute_permissions": [
                                {"attribute_name": "name", "read": true}
                            ]
                        }
                    }
                }
            }
        }"#;
        let role: RolePermissionTree = serde_json::from_str(doc).unwrap();
        assert!(!role.super_user);
        assert!(role.structure_user.covers("dev"));
        assert!(!role.structure_user.covers("prod"));
        let table = role.table("dev", "dog").unwrap();
        // describe defaults true when an entry exists
        assert!(table.describe);
        assert!(table.allows(Permission::Insert));
        assert!(!table.allows(Permission::Read));
        let attr = table.attribute("name").unwrap();
        assert!(attr.describe);
        assert!(attr.allows(Permission::Read));
        // unset flags are denied
        assert!(!attr.allows(Permission::Update));
    }

    #[test]
    fn structure_user_boolean_forms() {
        let all: RolePermissionTree = serde_json::from_str(r#"{"structure_user": true}"#).unwrap();
        assert!(all.structure_user.covers("anything"));
        let none: RolePermissionTree = serde_json::from_str(r#"{"structure_user": false}"#).unwrap();
        assert!(!none.structure_user.covers("anything"));
    }

    #[test]
    fn readable_attributes_follow_declaration_order() {
        let mut perm = TablePerm::default();
        let mut a = AttributePermission::named("name");
        a.read = Some(true);
        let mut b = AttributePermission::named("age");
        b.read = Some(true);
        let mut hidden = AttributePermission::named("owner");
        hidden.read = Some(true);
        hidden.describe = false;
        let denied = AttributePermission::named("breed");
        perm.attribute_permissions = vec![a, b, hidden, denied];
        assert_eq!(perm.readable_attributes(), vec!["name".to_string(), "age".to_string()]);
    }

    #[test]
    fn empty_role_is_detected() {
        assert!(RolePermissionTree::default().is_empty());
        let mut role = RolePermissionTree::default();
        role.super_user = true;
        assert!(!role.is_empty());
    }
}
