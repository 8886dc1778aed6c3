//! Configuration loading, validation, and merging for the PEAC protocol
//! stack.
//!
//! This crate provides [`PeacConfig`] — the top-level runtime settings —
//! together with helpers for loading from TOML files, merging overlays, and
//! producing advisory [`ConfigWarning`]s. Dangerous verifier toggles are
//! never bare booleans even at the config-file layer: see
//! [`verifier::VerifierSection`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod verifier;

pub use verifier::VerifierSection;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },
    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

impl From<ConfigError> for peac_problem::Problem {
    fn from(err: ConfigError) -> Self {
        peac_problem::Problem::new(peac_problem::ErrorCode::ConfigInvalid, "configuration rejected")
            .with_detail(err.to_string())
    }
}

/// Advisory-level issues that do not prevent operation but deserve
/// attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The verifier is configured to allow any issuer, tolerate unknown
    /// tags, or skip replay protection.
    VerifierOperatingUnsafely {
        /// Which dangerous toggle is active.
        detail: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            Self::VerifierOperatingUnsafely { detail } => {
                write!(f, "verifier is operating unsafely: {detail}")
            }
        }
    }
}

/// Top-level runtime configuration for the PEAC protocol stack.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct PeacConfig {
    /// Default receipt issuer URL (the `iss` claim), if this process mints
    /// receipts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_issuer: Option<String>,
    /// Active signing key id (`YYYY-MM-DD/nn`), if this process mints
    /// receipts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Directory for persisting issued/captured receipt JSON, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipts_dir: Option<String>,
    /// Edge verifier configuration.
    #[serde(default)]
    pub verifier: VerifierSection,
}

impl Default for PeacConfig {
    fn default() -> Self {
        Self {
            default_issuer: None,
            kid: None,
            log_level: Some("info".to_string()),
            receipts_dir: None,
            verifier: VerifierSection::default(),
        }
    }
}

/// Load a [`PeacConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`PeacConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<PeacConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => PeacConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`PeacConfig`].
pub fn parse_toml(content: &str) -> Result<PeacConfig, ConfigError> {
    toml::from_str::<PeacConfig>(content).map_err(|e| ConfigError::ParseError { reason: e.to_string() })
}

/// Apply environment variable overrides.
///
/// Recognised variables: `PEAC_ISSUER`, `PEAC_KID`, `PEAC_LOG_LEVEL`,
/// `PEAC_RECEIPTS_DIR`.
pub fn apply_env_overrides(config: &mut PeacConfig) {
    if let Ok(val) = std::env::var("PEAC_ISSUER") {
        config.default_issuer = Some(val);
    }
    if let Ok(val) = std::env::var("PEAC_KID") {
        config.kid = Some(val);
    }
    if let Ok(val) = std::env::var("PEAC_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("PEAC_RECEIPTS_DIR") {
        config.receipts_dir = Some(val);
    }
}

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (invalid `log_level`, a `verifier` section that fails its
/// own ack checks) are returned as a [`ConfigError::ValidationError`]; soft
/// issues come back as warnings.
pub fn validate_config(config: &PeacConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    match config.verifier.to_verifier_config() {
        Ok(verifier_config) => {
            if verifier_config.operating_unsafely() {
                warnings.push(ConfigWarning::VerifierOperatingUnsafely {
                    detail: "one or more dangerous ack toggles are active".to_string(),
                });
            }
        }
        Err(ConfigError::ValidationError { reasons }) => errors.extend(reasons),
        Err(other) => errors.push(other.to_string()),
    }

    if config.default_issuer.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "default_issuer".to_string(),
            hint: "this process cannot mint receipts without one".to_string(),
        });
    }
    if config.receipts_dir.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "receipts_dir".to_string(),
            hint: "receipts will not be persisted to disk".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

/// Merge two configurations. Values in `overlay` take precedence over
/// `base`; list-valued verifier fields are unioned.
pub fn merge_configs(base: PeacConfig, overlay: PeacConfig) -> PeacConfig {
    let mut bypass_prefixes = base.verifier.bypass_prefixes;
    for p in overlay.verifier.bypass_prefixes {
        if !bypass_prefixes.contains(&p) {
            bypass_prefixes.push(p);
        }
    }
    let mut jwks_host_allowlist = base.verifier.jwks_host_allowlist;
    for h in overlay.verifier.jwks_host_allowlist {
        if !jwks_host_allowlist.contains(&h) {
            jwks_host_allowlist.push(h);
        }
    }
    let mut issuers = base.verifier.issuers;
    for i in overlay.verifier.issuers {
        if !issuers.contains(&i) {
            issuers.push(i);
        }
    }

    PeacConfig {
        default_issuer: overlay.default_issuer.or(base.default_issuer),
        kid: overlay.kid.or(base.kid),
        log_level: overlay.log_level.or(base.log_level),
        receipts_dir: overlay.receipts_dir.or(base.receipts_dir),
        verifier: VerifierSection {
            issuers,
            allow_any_issuer_ack: overlay
                .verifier
                .allow_any_issuer_ack
                .or(base.verifier.allow_any_issuer_ack),
            allow_unknown_tags_ack: overlay
                .verifier
                .allow_unknown_tags_ack
                .or(base.verifier.allow_unknown_tags_ack),
            allow_no_replay_ack: overlay
                .verifier
                .allow_no_replay_ack
                .or(base.verifier.allow_no_replay_ack),
            skew_secs: overlay.verifier.skew_secs,
            bypass_prefixes,
            jwks_host_allowlist,
        },
    }
}
