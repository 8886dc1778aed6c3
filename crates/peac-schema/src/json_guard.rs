//! DoS-bounded JSON safety checks: an iterative (non-recursive,
//! explicit-stack) walk bounding max depth, max object/array key count,
//! max array length, and max total node count in one pass.
//!
//! Bounds four independent dimensions, not just depth and total serialized
//! size, so a payload with many small objects at shallow depth (which a
//! size-only check would miss relative to its depth) is still rejected.

use serde_json::Value;

/// The bounds a JSON value's shape must stay within.
#[derive(Debug, Clone, Copy)]
pub struct JsonGuardLimits {
    /// Maximum nesting depth (an object/array inside another counts as +1).
    pub max_depth: usize,
    /// Maximum number of keys in any single object.
    pub max_object_keys: usize,
    /// Maximum number of elements in any single array.
    pub max_array_len: usize,
    /// Maximum total number of nodes (scalars + containers) across the
    /// whole value.
    pub max_total_nodes: usize,
}

impl JsonGuardLimits {
    /// Construct a limits set.
    #[must_use]
    pub const fn new(
        max_depth: usize,
        max_object_keys: usize,
        max_array_len: usize,
        max_total_nodes: usize,
    ) -> Self {
        Self {
            max_depth,
            max_object_keys,
            max_array_len,
            max_total_nodes,
        }
    }
}

/// A bound that was exceeded.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum JsonGuardError {
    /// Nesting exceeded [`JsonGuardLimits::max_depth`].
    #[error("depth {found} exceeds limit {limit}")]
    DepthExceeded {
        /// The limit configured.
        limit: usize,
        /// The depth actually reached.
        found: usize,
    },
    /// An object had more keys than [`JsonGuardLimits::max_object_keys`].
    #[error("object key count {found} exceeds limit {limit}")]
    ObjectKeysExceeded {
        /// The limit configured.
        limit: usize,
        /// The key count actually found.
        found: usize,
    },
    /// An array had more elements than [`JsonGuardLimits::max_array_len`].
    #[error("array length {found} exceeds limit {limit}")]
    ArrayLenExceeded {
        /// The limit configured.
        limit: usize,
        /// The length actually found.
        found: usize,
    },
    /// Total node count exceeded [`JsonGuardLimits::max_total_nodes`].
    #[error("total node count {found} exceeds limit {limit}")]
    TotalNodesExceeded {
        /// The limit configured.
        limit: usize,
        /// The node count actually found.
        found: usize,
    },
}

impl From<JsonGuardError> for peac_problem::Problem {
    fn from(err: JsonGuardError) -> Self {
        peac_problem::Problem::new(
            peac_problem::ErrorCode::SchemaPayloadTooComplex,
            "JSON payload exceeded a bounded-safety limit",
        )
        .with_detail(err.to_string())
    }
}

/// Walk `value` iteratively, failing on the first bound exceeded.
pub fn check(value: &Value, limits: JsonGuardLimits) -> Result<(), JsonGuardError> {
    let mut stack: Vec<(&Value, usize)> = vec![(value, 0)];
    let mut total_nodes: usize = 0;

    while let Some((node, depth)) = stack.pop() {
        total_nodes += 1;
        if total_nodes > limits.max_total_nodes {
            return Err(JsonGuardError::TotalNodesExceeded {
                limit: limits.max_total_nodes,
                found: total_nodes,
            });
        }
        if depth > limits.max_depth {
            return Err(JsonGuardError::DepthExceeded {
                limit: limits.max_depth,
                found: depth,
            });
        }
        match node {
            Value::Object(map) => {
                if map.len() > limits.max_object_keys {
                    return Err(JsonGuardError::ObjectKeysExceeded {
                        limit: limits.max_object_keys,
                        found: map.len(),
                    });
                }
                for v in map.values() {
                    stack.push((v, depth + 1));
                }
            }
            Value::Array(items) => {
                if items.len() > limits.max_array_len {
                    return Err(JsonGuardError::ArrayLenExceeded {
                        limit: limits.max_array_len,
                        found: items.len(),
                    });
                }
                for v in items {
                    stack.push((v, depth + 1));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> JsonGuardLimits {
        JsonGuardLimits::new(4, 8, 8, 64)
    }

    #[test]
    fn accepts_small_well_formed_value() {
        assert!(check(&json!({"a": [1, 2, 3]}), limits()).is_ok());
    }

    #[test]
    fn rejects_excessive_depth() {
        let mut v = json!(1);
        for _ in 0..10 {
            v = json!({"n": v});
        }
        assert!(matches!(
            check(&v, limits()),
            Err(JsonGuardError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn rejects_excessive_object_keys() {
        let mut map = serde_json::Map::new();
        for i in 0..20 {
            map.insert(format!("k{i}"), json!(i));
        }
        assert!(matches!(
            check(&Value::Object(map), limits()),
            Err(JsonGuardError::ObjectKeysExceeded { .. })
        ));
    }

    #[test]
    fn rejects_excessive_array_length() {
        let v = json!((0..20).collect::<Vec<_>>());
        assert!(matches!(
            check(&v, limits()),
            Err(JsonGuardError::ArrayLenExceeded { .. })
        ));
    }

    #[test]
    fn rejects_excessive_total_nodes_even_when_shallow() {
        // Many small sibling objects at depth 1: within depth/keys/len
        // bounds individually, but the total node count blows the budget.
        let items: Vec<Value> = (0..40).map(|i| json!({"k": i})).collect();
        let v = json!({"list": items});
        assert!(matches!(
            check(&v, limits()),
            Err(JsonGuardError::TotalNodesExceeded { .. })
        ));
    }
}
