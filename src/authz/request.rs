//! Normalized direct-operation request shape.
//!
//! The dispatcher deserializes incoming operation bodies into this one
//! struct; the authorizer and the attribute extractor read it and the
//! wildcard-projection rewrite mutates it in place, so downstream execution
//! never sees an un-authorized `*`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ident::normalize_identifier;

use super::catalog::Permission;

/// Bulk-load action. Its presence marks a streaming-load request whose
/// attribute checks are deferred to the loader; its value substitutes for
/// the catalog's required-permission list during the table pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Insert,
    Update,
    Upsert,
}

impl BulkAction {
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            BulkAction::Insert => &[Permission::Insert],
            BulkAction::Update => &[Permission::Update],
            BulkAction::Upsert => &[Permission::Insert, Permission::Update],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCondition {
    #[serde(default)]
    pub search_attribute: Option<String>,
    #[serde(default)]
    pub search_type: Option<String>,
    #[serde(default)]
    pub search_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Target schema; `database` is accepted as an equivalent field name.
    #[serde(default, alias = "database")]
    pub schema: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub action: Option<BulkAction>,
    #[serde(default)]
    pub records: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub conditions: Vec<SearchCondition>,
    #[serde(default)]
    pub search_attribute: Option<String>,
    #[serde(default)]
    pub get_attributes: Vec<String>,
    /// Full attribute list of the target table as known to the dispatcher's
    /// schema catalog. Consulted only by the wildcard-projection rewrite
    /// when the role carries no attribute restrictions.
    #[serde(default)]
    pub known_attributes: Vec<String>,
}

impl OperationRequest {
    /// Normalized schema name, if the request targets one.
    pub fn schema_name(&self) -> Option<String> {
        self.schema.as_deref().map(normalize_identifier)
    }

    /// Normalized table name, if the request targets one.
    pub fn table_name(&self) -> Option<String> {
        self.table.as_deref().map(normalize_identifier)
    }

    /// The `{schema → tables}` map the shared pipeline runs over. Direct
    /// requests target at most one pair; SQL statements may span several.
    pub fn schema_table_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        if let Some(schema) = self.schema_name() {
            let tables = map.entry(schema).or_default();
            if let Some(table) = self.table_name() {
                tables.insert(table);
            }
        }
        map
    }

    pub fn wants_all_attributes(&self) -> bool {
        self.get_attributes.iter().any(|a| a == crate::ident::WILDCARD_ATTR)
    }
}
