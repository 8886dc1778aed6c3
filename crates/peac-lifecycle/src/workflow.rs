//! Workflow-graph ordering used when synthesising a `peac/workflow-summary`
//! attestation.

use peac_schema::{WorkflowGraph, WorkflowValidationError};
use std::collections::{HashMap, HashSet};

/// Validate `graph`, then return its steps' ids in a parents-before-children
/// (topological) order. Ties are broken by the steps' declaration order, so
/// the result is deterministic for a given graph.
pub fn topological_order(graph: &WorkflowGraph) -> Result<Vec<String>, WorkflowValidationError> {
    graph.validate()?;

    let mut remaining: HashMap<&str, HashSet<&str>> = graph
        .steps
        .iter()
        .map(|s| (s.id.as_str(), s.parents.iter().map(String::as_str).collect()))
        .collect();
    let mut order = Vec::with_capacity(graph.steps.len());

    while !remaining.is_empty() {
        let ready: Vec<&str> = graph
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .filter(|id| remaining.get(id).is_some_and(HashSet::is_empty))
            .collect();
        // `validate` already rejected cycles and dangling parents, so
        // `ready` cannot be empty here.
        for id in &ready {
            remaining.remove(id);
            order.push((*id).to_string());
        }
        for parents in remaining.values_mut() {
            for id in &ready {
                parents.remove(id);
            }
        }
    }

    Ok(order)
}
