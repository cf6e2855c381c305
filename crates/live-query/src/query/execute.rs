//! Query evaluation over in-process documents: filter matching, ordering,
//! and limit truncation. Used by store implementations that hold their
//! documents locally.

use std::cmp::Ordering;

use serde_json::Value;

use crate::types::StoreDocument;

use super::types::{Filter, FilterOp, SortDirection, StoreQuery};

// ============================================================================
// Value Comparison
// ============================================================================

/// Compare two JSON values for ordering.
///
/// - Both Null → Equal
/// - a is Null → Greater (nulls and missing fields sort to the end)
/// - b is Null → Less
/// - Both numbers → f64 comparison (NaN treated as Equal)
/// - Both strings → lexicographic (codepoint order)
/// - Both booleans → false < true
/// - Cross-type → type rank: number(0), string(1), bool(2), other(3)
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(na), Value::Number(nb)) => {
            let fa = na.as_f64().unwrap_or(f64::NAN);
            let fb = nb.as_f64().unwrap_or(f64::NAN);
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        }
        (Value::String(sa), Value::String(sb)) => sa.cmp(sb),
        (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        _ => 3,
    }
}

// ============================================================================
// Filter Matching
// ============================================================================

/// Evaluate one filter against a document. Missing fields never match
/// equality or membership.
fn matches_filter(doc: &StoreDocument, filter: &Filter) -> bool {
    let value = match doc.fields.get(&filter.field) {
        Some(v) => v,
        None => return false,
    };

    match filter.op {
        FilterOp::Eq => value == &filter.value,
        FilterOp::In => match filter.value.as_array() {
            Some(items) => items.iter().any(|item| item == value),
            None => false,
        },
    }
}

/// True when the document satisfies every filter.
pub fn matches_filters(doc: &StoreDocument, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_filter(doc, f))
}

// ============================================================================
// Query Execution
// ============================================================================

/// Run a query over a document set: filter, sort, then truncate to the
/// limit. The input order is preserved for documents that compare equal.
pub fn run_query(docs: Vec<StoreDocument>, query: &StoreQuery) -> Vec<StoreDocument> {
    let mut matched: Vec<StoreDocument> = docs
        .into_iter()
        .filter(|d| matches_filters(d, &query.filters))
        .collect();

    if !query.order_by.is_empty() {
        matched.sort_by(|a, b| {
            for order in &query.order_by {
                let missing = Value::Null;
                let va = a.fields.get(&order.field).unwrap_or(&missing);
                let vb = b.fields.get(&order.field).unwrap_or(&missing);
                let cmp = match order.direction {
                    SortDirection::Asc => compare_values(va, vb),
                    SortDirection::Desc => compare_values(vb, va),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });
    }

    if let Some(limit) = query.limit {
        matched.truncate(limit);
    }

    matched
}

// ============================================================================
// Tests
// ============================================================================
