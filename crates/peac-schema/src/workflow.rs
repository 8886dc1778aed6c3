//! Multi-agent workflow summaries and attribution graphs.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Status of one step in a [`WorkflowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Skipped (e.g. a conditional branch not taken).
    Skipped,
}

/// One node in a [`WorkflowGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// This step's own identifier, unique within the graph.
    pub id: String,
    /// The agent that executed (or will execute) this step.
    pub agent: String,
    /// This step's current status.
    pub status: WorkflowStatus,
    /// The ids of steps that must complete before this one runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// A directed acyclic graph of [`WorkflowStep`]s (evidence payload for a
/// `peac/workflow-summary` attestation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// The steps making up this workflow.
    pub steps: Vec<WorkflowStep>,
}

/// Errors from [`WorkflowGraph::validate`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WorkflowValidationError {
    /// Two steps shared the same `id`.
    #[error("duplicate step id {0:?}")]
    DuplicateStepId(String),
    /// A step listed itself as a parent.
    #[error("step {0:?} lists itself as a parent")]
    SelfParent(String),
    /// A step listed a parent id that duplicates another entry in its own
    /// `parents`.
    #[error("step {0:?} lists parent {1:?} more than once")]
    DuplicateParent(String, String),
    /// A step referenced a parent id not present in the graph.
    #[error("step {0:?} references unknown parent {1:?}")]
    UnknownParent(String, String),
    /// The parent relation contains a cycle.
    #[error("workflow graph contains a cycle involving step {0:?}")]
    Cycle(String),
}

impl WorkflowGraph {
    /// Validate structural well-formedness: unique ids, no self-parents,
    /// no duplicate parent entries, no dangling parent references, and no
    /// cycles.
    pub fn validate(&self) -> Result<(), WorkflowValidationError> {
        let mut seen_ids = HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(step.id.as_str()) {
                return Err(WorkflowValidationError::DuplicateStepId(step.id.clone()));
            }
        }

        for step in &self.steps {
            let mut seen_parents = HashSet::new();
            for parent in &step.parents {
                if parent == &step.id {
                    return Err(WorkflowValidationError::SelfParent(step.id.clone()));
                }
                if !seen_parents.insert(parent.as_str()) {
                    return Err(WorkflowValidationError::DuplicateParent(
                        step.id.clone(),
                        parent.clone(),
                    ));
                }
                if !seen_ids.contains(parent.as_str()) {
                    return Err(WorkflowValidationError::UnknownParent(
                        step.id.clone(),
                        parent.clone(),
                    ));
                }
            }
        }

        detect_cycle(&self.steps).map_err(WorkflowValidationError::Cycle)?;
        Ok(())
    }
}

/// DFS cycle detection shared by workflow parent graphs and attribution
/// graphs: both are "each node names its predecessors" DAGs, so the same
/// three-colour walk applies to both.
fn detect_cycle(steps: &[WorkflowStep]) -> Result<(), String> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }

    let by_id: HashMap<&str, &WorkflowStep> =
        steps.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a WorkflowStep>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), String> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(id.to_string()),
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        if let Some(step) = by_id.get(id) {
            for parent in &step.parents {
                visit(parent.as_str(), by_id, marks)?;
            }
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }

    for step in steps {
        visit(step.id.as_str(), &by_id, &mut marks)?;
    }
    Ok(())
}

/// One contributing source in an attribution graph (evidence payload for
/// a `peac/attribution` attestation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionSource {
    /// This source's own identifier, unique within the graph.
    pub id: String,
    /// This source's credited share, in `[0, 1]`.
    pub weight: f64,
    /// The ids of sources this one was derived from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_from: Vec<String>,
}

/// A derivation graph of [`AttributionSource`]s. Structurally a DAG: a
/// cycle in `derived_from` would mean two sources credit each other
/// transitively, which has no well-defined resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionGraph {
    /// The sources making up this graph, in the order they were accepted.
    pub sources: Vec<AttributionSource>,
}

/// Errors from [`AttributionGraph::accept`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AttributionError {
    /// A source's `weight` fell outside `[0, 1]`.
    #[error("source {0:?} has weight outside [0,1]")]
    WeightOutOfRange(String),
    /// A source named itself in `derived_from`.
    #[error("source {0:?} lists itself in derived_from")]
    SelfDerived(String),
    /// `derived_from` named a source not (yet) present in the graph.
    #[error("source {0:?} derives from unknown source {1:?}")]
    UnknownSource(String, String),
    /// Accepting the candidate source would introduce a cycle.
    #[error("accepting source {0:?} would introduce a derivation cycle")]
    Cycle(String),
}

impl AttributionGraph {
    /// Validate `candidate` against the sources already accepted into
    /// `self`, then accept it by DFS-checking its `derived_from` edges
    /// for a cycle before it is pushed onto `sources`. Rejects before
    /// mutating `self` so a caller can retry with a corrected source. A
    /// candidate whose `id` already exists replaces the prior entry —
    /// this is the path that lets a previously-accepted source's
    /// `derived_from` later close a cycle, which is why the cycle check
    /// runs on every acceptance rather than only on first insertion.
    pub fn accept(&mut self, candidate: AttributionSource) -> Result<(), AttributionError> {
        if !(0.0..=1.0).contains(&candidate.weight) {
            return Err(AttributionError::WeightOutOfRange(candidate.id.clone()));
        }
        if candidate.derived_from.contains(&candidate.id) {
            return Err(AttributionError::SelfDerived(candidate.id.clone()));
        }
        let known: HashSet<&str> = self.sources.iter().map(|s| s.id.as_str()).collect();
        for parent in &candidate.derived_from {
            if !known.contains(parent.as_str()) && parent != &candidate.id {
                return Err(AttributionError::UnknownSource(
                    candidate.id.clone(),
                    parent.clone(),
                ));
            }
        }

        let mut probe: Vec<AttributionSource> = self
            .sources
            .iter()
            .filter(|s| s.id != candidate.id)
            .cloned()
            .collect();
        probe.push(candidate.clone());
        let steps: Vec<WorkflowStep> = probe
            .iter()
            .map(|s| WorkflowStep {
                id: s.id.clone(),
                agent: s.id.clone(),
                status: WorkflowStatus::Completed,
                parents: s.derived_from.clone(),
            })
            .collect();
        detect_cycle(&steps).map_err(|_| AttributionError::Cycle(candidate.id.clone()))?;

        self.sources.retain(|s| s.id != candidate.id);
        self.sources.push(candidate);
        Ok(())
    }
}

impl From<WorkflowValidationError> for peac_problem::Problem {
    fn from(err: WorkflowValidationError) -> Self {
        peac_problem::Problem::new(peac_problem::ErrorCode::SchemaInvalid, "workflow graph invalid")
            .with_detail(err.to_string())
    }
}

impl From<AttributionError> for peac_problem::Problem {
    fn from(err: AttributionError) -> Self {
        let code = match err {
            AttributionError::Cycle(_) => peac_problem::ErrorCode::AttributionCycle,
            _ => peac_problem::ErrorCode::SchemaInvalid,
        };
        peac_problem::Problem::new(code, "attribution source rejected").with_detail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, parents: &[&str]) -> WorkflowStep {
        WorkflowStep {
            id: id.to_string(),
            agent: "agent:x".to_string(),
            status: WorkflowStatus::Pending,
            parents: parents.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn linear_chain_is_valid() {
        let graph = WorkflowGraph {
            steps: vec![step("a", &[]), step("b", &["a"]), step("c", &["b"])],
        };
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let graph = WorkflowGraph {
            steps: vec![step("a", &[]), step("a", &[])],
        };
        assert!(matches!(
            graph.validate(),
            Err(WorkflowValidationError::DuplicateStepId(_))
        ));
    }

    #[test]
    fn self_parent_rejected() {
        let graph = WorkflowGraph {
            steps: vec![step("a", &["a"])],
        };
        assert!(matches!(
            graph.validate(),
            Err(WorkflowValidationError::SelfParent(_))
        ));
    }

    #[test]
    fn unknown_parent_rejected() {
        let graph = WorkflowGraph {
            steps: vec![step("a", &["ghost"])],
        };
        assert!(matches!(
            graph.validate(),
            Err(WorkflowValidationError::UnknownParent(_, _))
        ));
    }

    #[test]
    fn duplicate_parent_rejected() {
        let graph = WorkflowGraph {
            steps: vec![step("a", &[]), step("b", &["a", "a"])],
        };
        assert!(matches!(
            graph.validate(),
            Err(WorkflowValidationError::DuplicateParent(_, _))
        ));
    }

    #[test]
    fn two_cycle_rejected() {
        let graph = WorkflowGraph {
            steps: vec![step("a", &["b"]), step("b", &["a"])],
        };
        assert!(matches!(
            graph.validate(),
            Err(WorkflowValidationError::Cycle(_))
        ));
    }

    fn source(id: &str, weight: f64, derived_from: &[&str]) -> AttributionSource {
        AttributionSource {
            id: id.to_string(),
            weight,
            derived_from: derived_from.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn chain_of_sources_accepted_in_order() {
        let mut graph = AttributionGraph { sources: vec![] };
        graph.accept(source("a", 1.0, &[])).unwrap();
        graph.accept(source("b", 0.5, &["a"])).unwrap();
        graph.accept(source("c", 0.5, &["b"])).unwrap();
        assert_eq!(graph.sources.len(), 3);
    }

    #[test]
    fn weight_out_of_range_rejected() {
        let mut graph = AttributionGraph { sources: vec![] };
        let err = graph.accept(source("a", 1.5, &[])).unwrap_err();
        assert!(matches!(err, AttributionError::WeightOutOfRange(_)));
    }

    #[test]
    fn self_derived_source_rejected() {
        let mut graph = AttributionGraph { sources: vec![] };
        let err = graph.accept(source("a", 1.0, &["a"])).unwrap_err();
        assert!(matches!(err, AttributionError::SelfDerived(_)));
    }

    #[test]
    fn derivation_from_unknown_source_rejected() {
        let mut graph = AttributionGraph { sources: vec![] };
        let err = graph.accept(source("a", 1.0, &["ghost"])).unwrap_err();
        assert!(matches!(err, AttributionError::UnknownSource(_, _)));
    }

    #[test]
    fn re_deriving_a_source_into_a_cycle_is_rejected() {
        let mut graph = AttributionGraph { sources: vec![] };
        graph.accept(source("a", 1.0, &[])).unwrap();
        graph.accept(source("b", 0.5, &["a"])).unwrap();
        let err = graph
            .accept(source("a", 1.0, &["b"]))
            .expect_err("re-deriving a from b, which derives from a, must cycle");
        assert!(matches!(err, AttributionError::Cycle(_)));
        assert_eq!(graph.sources.len(), 2);
        assert!(graph.sources[0].derived_from.is_empty());
    }
}
