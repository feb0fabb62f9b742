//! Touched-attribute derivation from a normalized request, by shape.
//!
//! Extraction is deliberately infallible: on a malformed piece of input it
//! warns and contributes nothing, so a request that defeats extraction is
//! still subject to table-level checks but skips attribute-level ones. This
//! is a known under-validation gap preserved for compatibility (see
//! DESIGN.md); do not silently tighten it.

use std::collections::BTreeSet;

use crate::ident::WILDCARD_ATTR;

use super::request::OperationRequest;

/// Compute the set of attribute names a request touches.
///
/// Shape precedence: bulk loads (an explicit `action`) return an empty set;
/// their attribute pass is deferred to the streaming loader once the file's
/// column set is known; then condition searches, single-value searches,
/// record batches, and finally projections. The wildcard token is never an
/// attribute name; resolving it is the authorizer's job.
pub fn extract_attributes(req: &OperationRequest) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    if req.action.is_some() {
        return out;
    }

    if !req.conditions.is_empty() {
        for cond in &req.conditions {
            match &cond.search_attribute {
                Some(attr) => {
                    out.insert(attr.clone());
                }
                None => {
                    tracing::warn!(
                        search_type = cond.search_type.as_deref().unwrap_or("unknown"),
                        "search condition carries no attribute; skipping it during extraction"
                    );
                }
            }
        }
        return out;
    }

    if let Some(attr) = &req.search_attribute {
        out.insert(attr.clone());
        return out;
    }

    if !req.records.is_empty() {
        for record in &req.records {
            for key in record.keys() {
                out.insert(key.clone());
            }
        }
        return out;
    }

    for attr in &req.get_attributes {
        if attr != WILDCARD_ATTR {
            out.insert(attr.clone());
        }
    }
    out
}
