//! RFC 9421-style `Signature-Input`/`Signature` header parsing and
//! signature-base construction.
//!
//! The component ordering and `@signature-params` placement follow the
//! Talus `signed_http` reference: each declared component is rendered in
//! the header's declared order, with the `@signature-params` pseudo-header
//! appended as the final line.

use std::collections::HashMap;

/// A parsed `Signature-Input` entry for one labeled signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInput {
    /// The signature label (e.g. `sig1`).
    pub label: String,
    /// The covered components, in declared order (e.g. `@authority`,
    /// `signature-agent`).
    pub components: Vec<String>,
    /// `created` parameter, Unix seconds.
    pub created: i64,
    /// `expires` parameter, Unix seconds.
    pub expires: i64,
    /// `keyid` parameter.
    pub keyid: String,
    /// `alg` parameter.
    pub alg: String,
    /// `nonce` parameter.
    pub nonce: String,
}

/// Failure modes of [`parse_signature_input`] / [`parse_signature`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignatureParseError {
    /// The header was empty or structurally malformed.
    #[error("malformed signature header: {0}")]
    Malformed(String),
    /// A required parameter (`created`, `expires`, `keyid`, `alg`, or
    /// `nonce`) was missing.
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),
    /// A required component (`@authority` or `signature-agent`) was not
    /// covered, or a covered component could not be resolved against the
    /// request.
    #[error("missing required component: {0}")]
    MissingComponent(String),
}

/// Components every TAP signature MUST cover.
pub const REQUIRED_COMPONENTS: &[&str] = &["signature-agent", "@authority"];

fn split_label_and_rest(header: &str) -> Result<(&str, &str), SignatureParseError> {
    let (label, rest) = header
        .split_once('=')
        .ok_or_else(|| SignatureParseError::Malformed("missing '='".to_string()))?;
    Ok((label.trim(), rest.trim()))
}

fn parse_component_list(rest: &str) -> Result<(Vec<String>, &str), SignatureParseError> {
    let rest = rest
        .strip_prefix('(')
        .ok_or_else(|| SignatureParseError::Malformed("expected '(' after label".to_string()))?;
    let close = rest
        .find(')')
        .ok_or_else(|| SignatureParseError::Malformed("unterminated component list".to_string()))?;
    let (list, after) = rest.split_at(close);
    let after = &after[1..]; // drop ')'
    let components = list
        .split_whitespace()
        .map(|tok| tok.trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok((components, after))
}

fn parse_params(rest: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for part in rest.trim_start_matches(';').split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((key, value)) = part.split_once('=') {
            params.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
        }
    }
    params
}

/// Parse one labeled `Signature-Input` entry, e.g.
/// `sig1=("@authority" "signature-agent");created=1;expires=301;keyid="k";alg="ed25519";nonce="n"`.
pub fn parse_signature_input(header: &str) -> Result<SignatureInput, SignatureParseError> {
    let (label, rest) = split_label_and_rest(header)?;
    let (components, rest) = parse_component_list(rest)?;
    let params = parse_params(rest);

    for required in REQUIRED_COMPONENTS {
        if !components.iter().any(|c| c == required) {
            return Err(SignatureParseError::MissingComponent((*required).to_string()));
        }
    }

    let created = params
        .get("created")
        .ok_or(SignatureParseError::MissingParam("created"))?
        .parse::<i64>()
        .map_err(|_| SignatureParseError::Malformed("created is not an integer".to_string()))?;
    let expires = params
        .get("expires")
        .ok_or(SignatureParseError::MissingParam("expires"))?
        .parse::<i64>()
        .map_err(|_| SignatureParseError::Malformed("expires is not an integer".to_string()))?;
    let keyid = params
        .get("keyid")
        .ok_or(SignatureParseError::MissingParam("keyid"))?
        .clone();
    let alg = params
        .get("alg")
        .ok_or(SignatureParseError::MissingParam("alg"))?
        .clone();
    let nonce = params
        .get("nonce")
        .ok_or(SignatureParseError::MissingParam("nonce"))?
        .clone();

    Ok(SignatureInput {
        label: label.to_string(),
        components,
        created,
        expires,
        keyid,
        alg,
        nonce,
    })
}

/// Parse the `Signature` header's `:base64:` envelope for `label`,
/// returning the raw signature bytes' base64 text (decoding is left to
/// the caller, which already has a base64 engine in scope).
pub fn parse_signature<'a>(
    header: &'a str,
    label: &str,
) -> Result<&'a str, SignatureParseError> {
    for entry in header.split(',') {
        let entry = entry.trim();
        if let Some((entry_label, value)) = entry.split_once('=') {
            if entry_label.trim() == label {
                let value = value.trim();
                return value
                    .strip_prefix(':')
                    .and_then(|v| v.strip_suffix(':'))
                    .ok_or_else(|| {
                        SignatureParseError::Malformed("signature value must be :base64:".to_string())
                    });
            }
        }
    }
    Err(SignatureParseError::Malformed(format!(
        "no signature found for label {label:?}"
    )))
}

/// Resolve the literal value of one covered component against a request.
/// Derived components start with `@`; everything else is an ordinary
/// (case-insensitive) header lookup.
pub trait ComponentSource {
    /// Resolve `component`'s value, or `None` if this request doesn't
    /// carry it.
    fn resolve(&self, component: &str) -> Option<String>;
}

/// Build the RFC 9421 signature base: one line per covered component in
/// declared order, followed by the `@signature-params` pseudo-header line.
pub fn build_signature_base(
    input: &SignatureInput,
    source: &impl ComponentSource,
) -> Result<String, SignatureParseError> {
    let mut lines = Vec::with_capacity(input.components.len() + 1);
    for component in &input.components {
        let value = source
            .resolve(component)
            .ok_or_else(|| SignatureParseError::MissingComponent(component.clone()))?;
        lines.push(format!("\"{component}\": {value}"));
    }

    let component_list = input
        .components
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(format!(
        "\"@signature-params\": ({component_list});created={};expires={};keyid=\"{}\";alg=\"{}\";nonce=\"{}\"",
        input.created, input.expires, input.keyid, input.alg, input.nonce
    ));

    Ok(lines.join("\n"))
}
