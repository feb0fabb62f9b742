//! Authorization integration tests for the SQL-statement path. The key
//! property under test is that both entry points share one decision core: a
//! statement and an equivalent direct request must produce the same verdicts.

use anyhow::Result;

use strata_authz::authz::{
    authorize_operation, authorize_statement, OperationId, OperationRequest, Permission,
    RolePermissionTree, StatementSummary,
};
use strata_authz::ident::{SYSTEM_SCHEMA, UPDATED_TIME_ATTR};

fn role_from_json(doc: &str) -> RolePermissionTree {
    serde_json::from_str(doc).expect("role document")
}

#[test]
fn select_on_granted_table_authorizes() -> Result<()> {
    let role = role_from_json(
        r#"{"schemas": {"dev": {"tables": {"dog": {"read": true}}}}}"#,
    );
    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", "name");
    let result = authorize_statement(Some(&role), OperationId::SearchByConditions, &mut stmt)?;
    assert!(result.is_none());
    Ok(())
}

#[test]
fn missing_role_reports_no_permissions() -> Result<()> {
    let mut stmt = StatementSummary::new();
    stmt.add_table("dev", "dog");
    let report = authorize_statement(None, OperationId::SearchByConditions, &mut stmt)?
        .expect("expected a denial report");
    assert!(report.invalid_items()[0].contains("no permissions assigned"));
    Ok(())
}

#[test]
fn cross_schema_join_collects_all_violations_at_once() -> Result<()> {
    // read on dev.dog, nothing on prod: one response carries both problems.
    let role = role_from_json(
        r#"{"schemas": {"dev": {"tables": {"dog": {"read": false,
            "attribute_permissions": [{"attribute_name": "name", "read": false}]}}}}}"#,
    );
    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", "name");
    stmt.add_attribute("prod", "cat", "id");
    let report = authorize_statement(Some(&role), OperationId::SearchByConditions, &mut stmt)?
        .expect("expected a denial report");
    // prod is invisible
    assert_eq!(report.invalid_items(), ["schema 'prod' does not exist".to_string()]);
    // dev.dog carries table and attribute detail in one merged entry
    let v = report.unauthorized_for("dev", "dog").expect("merged entry");
    assert_eq!(v.required_table_permissions, vec![Permission::Read]);
    assert_eq!(v.required_attribute_permissions[0].attribute_name, "name");
    Ok(())
}

#[test]
fn statement_and_request_paths_agree() -> Result<()> {
    let role = role_from_json(
        r#"{"schemas": {"dev": {"tables": {"dog": {"read": false,
            "attribute_permissions": [{"attribute_name": "name", "read": false}]}}}}}"#,
    );

    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", "name");
    let from_statement =
        authorize_statement(Some(&role), OperationId::SearchByConditions, &mut stmt)?
            .expect("denial");

    let mut req = OperationRequest::default();
    req.schema = Some("dev".to_string());
    req.table = Some("dog".to_string());
    req.conditions = vec![serde_json::from_str(
        r#"{"search_attribute": "name", "search_type": "equals", "search_value": "rex"}"#,
    )?];
    let from_request = authorize_operation(Some(&role), OperationId::SearchByConditions, &mut req)?
        .expect("denial");

    assert_eq!(from_statement, from_request);
    Ok(())
}

#[test]
fn super_user_statement_bypass() -> Result<()> {
    let role = role_from_json(r#"{"super_user": true}"#);
    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", "name");
    let result = authorize_statement(Some(&role), OperationId::Delete, &mut stmt)?;
    assert!(result.is_none());
    Ok(())
}

#[test]
fn system_schema_statement_mutation_is_hard_rejected() {
    let role = role_from_json(r#"{"super_user": true}"#);
    let mut stmt = StatementSummary::new();
    stmt.add_table(SYSTEM_SCHEMA, "catalog");
    let err = authorize_statement(Some(&role), OperationId::Update, &mut stmt).unwrap_err();
    assert_eq!(err.http_status(), 403);
    assert_eq!(err.code_str(), "system_schema_mutation");
}

#[test]
fn structure_user_ddl_statement_bypass_is_scoped() -> Result<()> {
    let role = role_from_json(r#"{"structure_user": ["dev"]}"#);

    let mut in_scope = StatementSummary::new();
    in_scope.add_table("dev", "dog");
    assert!(authorize_statement(Some(&role), OperationId::DropTable, &mut in_scope)?.is_none());

    let mut out_of_scope = StatementSummary::new();
    out_of_scope.add_table("prod", "cat");
    let report = authorize_statement(Some(&role), OperationId::DropTable, &mut out_of_scope)?
        .expect("expected a denial report");
    assert_eq!(report.invalid_items(), ["schema 'prod' does not exist".to_string()]);
    Ok(())
}

#[test]
fn timestamp_write_in_statement_is_hard_rejected() {
    let role = role_from_json(&format!(
        r#"{{"schemas": {{"dev": {{"tables": {{"dog": {{
            "update": true,
            "attribute_permissions": [{{"attribute_name": "{ts}", "read": true, "update": true}}]}}}}}}}}}}"#,
        ts = UPDATED_TIME_ATTR
    ));
    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", UPDATED_TIME_ATTR);
    let err = authorize_statement(Some(&role), OperationId::Update, &mut stmt).unwrap_err();
    assert_eq!(err.http_status(), 403);
    assert_eq!(err.code_str(), "timestamp_attribute_write");
}

#[test]
fn select_star_expands_before_attribute_checks() -> Result<()> {
    let role = role_from_json(
        r#"{"schemas": {"dev": {"tables": {"dog": {
            "read": true,
            "attribute_permissions": [
                {"attribute_name": "name", "read": true},
                {"attribute_name": "owner", "read": false}
            ]}}}}}"#,
    );
    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", "*");
    // The rewrite replaces * with the readable subset, so the attribute pass
    // sees only attributes the role may read and the statement authorizes.
    let result = authorize_statement(Some(&role), OperationId::SearchByConditions, &mut stmt)?;
    assert!(result.is_none());
    assert_eq!(stmt.attributes("dev", "dog"), vec!["name".to_string()]);
    Ok(())
}

#[test]
fn select_star_with_no_readable_attributes_projects_nothing() -> Result<()> {
    // Same boundary as the direct-request path: an allow-list granting read
    // on no attribute rewrites * to an empty projection instead of leaking
    // the wildcard into the authorized statement.
    let role = role_from_json(
        r#"{"schemas": {"dev": {"tables": {"dog": {
            "read": true,
            "attribute_permissions": [{"attribute_name": "name", "read": false}]}}}}}"#,
    );
    let mut stmt = StatementSummary::new();
    stmt.add_attribute("dev", "dog", "*");
    let result = authorize_statement(Some(&role), OperationId::SearchByConditions, &mut stmt)?;
    assert!(result.is_none());
    assert!(stmt.attributes("dev", "dog").is_empty());
    Ok(())
}

#[test]
fn unresolved_attribute_references_are_malformed() {
    let role = role_from_json(r#"{"schemas": {"dev": {"tables": {}}}}"#);
    let mut stmt = StatementSummary::new();
    stmt.add_dangling_attribute("name");
    let err =
        authorize_statement(Some(&role), OperationId::SearchByConditions, &mut stmt).unwrap_err();
    assert_eq!(err.http_status(), 400);
    assert_eq!(err.code_str(), "malformed_statement");
}

#[test]
fn identical_statement_calls_are_idempotent() -> Result<()> {
    let role = role_from_json(
        r#"{"schemas": {"dev": {"tables": {"dog": {"read": false}}}}}"#,
    );
    let build = || {
        let mut stmt = StatementSummary::new();
        stmt.add_attribute("dev", "dog", "name");
        stmt
    };
    let mut a = build();
    let mut b = build();
    let ra = authorize_statement(Some(&role), OperationId::SearchByConditions, &mut a)?.unwrap();
    let rb = authorize_statement(Some(&role), OperationId::SearchByConditions, &mut b)?.unwrap();
    assert_eq!(ra, rb);
    Ok(())
}
