//! SQL-statement entry point of the authorizer.
//!
//! SQL text parsing lives outside this engine; statements arrive through a
//! `StatementAnalyzer`, the introspection seam an AST adapter implements.
//! Beyond extraction, the statement path is the *same* decision core as the
//! direct-operation path: identical bypass rules, the same table and
//! attribute checkers, the same report.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EngineError, EngineResult};
use crate::ident::{normalize_identifier, WILDCARD_ATTR};

use super::attr_check::check_attribute_permissions;
use super::catalog::{self, OperationId};
use super::report::{ViolationReport, NO_PERMISSIONS_MSG};
use super::role::RolePermissionTree;
use super::table_check::{check_table_permissions, system_schema_guard, TableVerdict};

/// Introspection surface of a parsed, analyzed SQL statement.
pub trait StatementAnalyzer {
    /// Schemas the statement resolves, after default-schema qualification.
    fn schemas(&self) -> Vec<String>;
    fn tables_for_schema(&self, schema: &str) -> Vec<String>;
    fn attributes_for_schema_table(&self, schema: &str, table: &str) -> Vec<String>;
    /// Rewrite `SELECT *` projections to the attribute set the role may
    /// read, mirroring the direct-request wildcard rewrite.
    fn rewrite_wildcard_projections(&mut self, role: &RolePermissionTree);
    /// Whether the statement references any attribute at all. Used to reject
    /// the malformed shape of attributes with no resolvable schema.
    fn references_attributes(&self) -> bool;
}

/// Authorize one parsed SQL statement. Same contract as the operation path:
/// `Ok(None)` authorized, report for ordinary denials, raised errors for
/// hard policy violations.
pub fn authorize_statement<A: StatementAnalyzer + ?Sized>(
    role: Option<&RolePermissionTree>,
    op: OperationId,
    analyzer: &mut A,
) -> EngineResult<Option<ViolationReport>> {
    catalog::lookup(op)?;

    let mut report = ViolationReport::new();
    let Some(role) = role.filter(|r| !r.is_empty()) else {
        report.invalid(NO_PERMISSIONS_MSG);
        return Ok(report.finish());
    };

    let schemas = analyzer.schemas();
    if schemas.is_empty() {
        if analyzer.references_attributes() {
            return Err(EngineError::user(
                "malformed_statement",
                "statement references attributes but resolves no schema",
            ));
        }
        return Ok(report.finish());
    }

    let mut schema_tables: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for schema in schemas {
        let schema = normalize_identifier(&schema);
        let tables = analyzer
            .tables_for_schema(&schema)
            .into_iter()
            .map(|t| normalize_identifier(&t))
            .collect::<BTreeSet<_>>();
        schema_tables.entry(schema).or_default().extend(tables);
    }

    if op.is_ddl() && schema_tables.keys().all(|s| role.structure_user.covers(s)) {
        system_schema_guard(op, &schema_tables)?;
        tracing::debug!(op = op.as_str(), "structure-user bypass (statement)");
        return Ok(None);
    }

    analyzer.rewrite_wildcard_projections(role);

    match check_table_permissions(role, op, &schema_tables, None, &mut report)? {
        TableVerdict::Authorized => return Ok(None),
        TableVerdict::Denied => return Ok(report.finish()),
        TableVerdict::Continue => {}
    }

    for (schema, tables) in &schema_tables {
        let Some(schema_perm) = role.schema(schema).filter(|s| s.describe) else {
            continue;
        };
        for table in tables {
            let Some(table_perm) = schema_perm.tables.get(table).filter(|t| t.describe) else {
                continue;
            };
            let attributes: BTreeSet<String> = analyzer
                .attributes_for_schema_table(schema, table)
                .into_iter()
                .filter(|a| a != WILDCARD_ATTR)
                .collect();
            check_attribute_permissions(&attributes, table_perm, op, schema, table, &mut report, None)?;
        }
    }

    if !report.is_clean() {
        tracing::debug!(op = op.as_str(), "statement denied");
    }
    Ok(report.finish())
}

/// Introspected view of one analyzed statement, as a concrete carrier an AST
/// adapter populates: which schema/table pairs it touches, which attributes
/// it references per pair, and each table's full attribute list from the
/// parser's catalog lookup (consulted when `SELECT *` expands against a
/// table without attribute restrictions).
#[derive(Debug, Clone, Default)]
pub struct StatementSummary {
    tables: BTreeMap<String, BTreeSet<String>>,
    attributes: BTreeMap<(String, String), BTreeSet<String>>,
    catalog_attributes: BTreeMap<(String, String), Vec<String>>,
}

impl StatementSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, schema: &str, table: &str) {
        self.tables
            .entry(normalize_identifier(schema))
            .or_default()
            .insert(normalize_identifier(table));
    }

    pub fn add_attribute(&mut self, schema: &str, table: &str, attribute: &str) {
        self.add_table(schema, table);
        self.attributes
            .entry((normalize_identifier(schema), normalize_identifier(table)))
            .or_default()
            .insert(attribute.to_string());
    }

    /// An attribute reference the analyzer could not resolve to any schema.
    /// Statements carrying these are rejected as malformed.
    pub fn add_dangling_attribute(&mut self, attribute: &str) {
        self.attributes
            .entry((String::new(), String::new()))
            .or_default()
            .insert(attribute.to_string());
    }

    /// Record the table's full attribute list from catalog introspection.
    pub fn set_catalog_attributes(&mut self, schema: &str, table: &str, attributes: Vec<String>) {
        self.catalog_attributes
            .insert((normalize_identifier(schema), normalize_identifier(table)), attributes);
    }

    pub fn attributes(&self, schema: &str, table: &str) -> Vec<String> {
        self.attributes
            .get(&(schema.to_string(), table.to_string()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl StatementAnalyzer for StatementSummary {
    fn schemas(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    fn tables_for_schema(&self, schema: &str) -> Vec<String> {
        self.tables
            .get(schema)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn attributes_for_schema_table(&self, schema: &str, table: &str) -> Vec<String> {
        self.attributes(schema, table)
    }

    fn rewrite_wildcard_projections(&mut self, role: &RolePermissionTree) {
        for ((schema, table), attrs) in self.attributes.iter_mut() {
            if !attrs.remove(WILDCARD_ATTR) {
                continue;
            }
            let Some(table_perm) = role.table(schema, table) else {
                attrs.insert(WILDCARD_ATTR.to_string());
                continue;
            };
            if !table_perm.read {
                attrs.insert(WILDCARD_ATTR.to_string());
                continue;
            }
            if table_perm.restricted() {
                // Always substitute the readable subset, even when it is
                // empty: the projection narrows to nothing rather than
                // leaving an un-authorized wildcard in the statement.
                attrs.extend(table_perm.readable_attributes());
                continue;
            }
            let catalog = self
                .catalog_attributes
                .get(&(schema.clone(), table.clone()))
                .cloned()
                .unwrap_or_default();
            if catalog.is_empty() {
                // No restrictions and no catalog knowledge: keep the
                // wildcard for the executor's own projection handling.
                attrs.insert(WILDCARD_ATTR.to_string());
            } else {
                attrs.extend(catalog);
            }
        }
    }

    fn references_attributes(&self) -> bool {
        self.attributes.values().any(|set| !set.is_empty())
    }
}
