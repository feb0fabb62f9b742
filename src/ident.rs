//! Identifier normalization and reserved-name registry
//! ---------------------------------------------------
//! Single source of truth for schema/table/attribute naming rules used by the
//! authorization pipeline: the reserved system schema, the protected internal
//! timestamp attributes, and the canonical `schema.table` compound key.

/// Schema reserved for engine-internal catalogs. Mutations against it are
/// rejected outright, including for super-user roles.
pub const SYSTEM_SCHEMA: &str = "system";

/// Internal timestamp attributes the engine maintains on every record.
/// Readable when the role allows it; never user-writable.
pub const CREATED_TIME_ATTR: &str = "__createdtime__";
pub const UPDATED_TIME_ATTR: &str = "__updatedtime__";

/// Projection token requesting every attribute of a table.
pub const WILDCARD_ATTR: &str = "*";

/// Normalize an identifier according to SQL rules:
/// - If enclosed in double-quotes, strip quotes and preserve case
/// - Otherwise, convert to lowercase for case-insensitive matching
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Canonical `schema.table` compound key used by violation reports.
pub fn table_key(schema: &str, table: &str) -> String {
    format!("{}.{}", schema, table)
}

pub fn is_system_schema(schema: &str) -> bool {
    schema.eq_ignore_ascii_case(SYSTEM_SCHEMA)
}

pub fn is_timestamp_attr(attribute: &str) -> bool {
    attribute == CREATED_TIME_ATTR || attribute == UPDATED_TIME_ATTR
}
