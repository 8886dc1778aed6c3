//! Projecting a [`SpoolEntry`] into `InteractionEvidenceV01`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use peac_schema::spool::{PayloadDigest, SpoolEntry};

/// The reserved extension namespace the spool anchor is recorded under.
pub const SPOOL_ANCHOR_NAMESPACE: &str = "peac/spool-anchor";

/// Options controlling [`to_interaction_evidence`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ToEvidenceOptions {
    /// Add a `peac/spool-anchor` extension carrying
    /// `{spool_head_digest, sequence}`.
    pub include_spool_anchor: bool,
}

/// Evidence of a single captured interaction, derived from one
/// [`SpoolEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvidenceV01 {
    /// Always `"peac/interaction@0.1"`.
    #[serde(rename = "type")]
    pub type_: String,
    /// When the underlying action completed (or started).
    pub captured_at: DateTime<Utc>,
    /// The captured action payload, verbatim.
    pub action: Value,
    /// Digest of the action's input, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<PayloadDigest>,
    /// Digest of the action's output, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_digest: Option<PayloadDigest>,
    /// Unrecognised/extension fields, including the spool anchor when
    /// requested.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Project `entry` into `InteractionEvidenceV01`, optionally anchoring it
/// to the spool chain via `opts.include_spool_anchor`.
#[must_use]
pub fn to_interaction_evidence(
    entry: &SpoolEntry,
    opts: ToEvidenceOptions,
) -> InteractionEvidenceV01 {
    let mut extensions = BTreeMap::new();
    if opts.include_spool_anchor {
        extensions.insert(
            SPOOL_ANCHOR_NAMESPACE.to_string(),
            serde_json::json!({
                "spool_head_digest": entry.entry_digest,
                "sequence": entry.sequence,
            }),
        );
    }
    InteractionEvidenceV01 {
        type_: "peac/interaction@0.1".to_string(),
        captured_at: entry.captured_at,
        action: entry.action.clone(),
        input_digest: entry.input_digest.clone(),
        output_digest: entry.output_digest.clone(),
        extensions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peac_schema::spool::GENESIS_DIGEST;

    fn entry() -> SpoolEntry {
        SpoolEntry {
            captured_at: Utc::now(),
            action: serde_json::json!({"kind": "fetch"}),
            input_digest: None,
            output_digest: None,
            prev_entry_digest: GENESIS_DIGEST.to_string(),
            entry_digest: "a".repeat(64),
            sequence: 3,
        }
    }

    #[test]
    fn without_anchor_has_no_extensions() {
        let evidence = to_interaction_evidence(&entry(), ToEvidenceOptions::default());
        assert!(evidence.extensions.is_empty());
    }

    #[test]
    fn with_anchor_records_head_digest_and_sequence() {
        let evidence = to_interaction_evidence(
            &entry(),
            ToEvidenceOptions {
                include_spool_anchor: true,
            },
        );
        let anchor = evidence.extensions.get(SPOOL_ANCHOR_NAMESPACE).unwrap();
        assert_eq!(anchor["spool_head_digest"], "a".repeat(64));
        assert_eq!(anchor["sequence"], 3);
    }

    #[test]
    fn type_tag_is_stable() {
        let evidence = to_interaction_evidence(&entry(), ToEvidenceOptions::default());
        assert_eq!(evidence.type_, "peac/interaction@0.1");
    }
}
