//! nfy-config
//!
//! Layered YAML configuration for notification sources.
//!
//! - YAML documents are merged in order (later documents override earlier
//!   ones) into one JSON value.
//! - The merged value is canonicalized and hashed so two hosts can compare
//!   configurations by `config_hash` alone.
//! - Secrets never appear as literals: YAML stores env var NAMES, and
//!   [`settings::ClientSettings`] resolves them at startup.

pub mod settings;

pub use settings::ClientSettings;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Leaf strings starting with one of these abort loading with
/// CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "AKIA",       // AWS access key ID
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "sk-",        // OpenAI style API keys
    "sk_live",
    "sk_test",
    "xoxb-", // Slack bot token
    "xoxp-", // Slack user token
];

/// Values shorter than this are never treated as secrets.
const SECRET_MIN_LEN: usize = 8;

/// JSON pointers read by the workspace today. Keep in sync with the reads in
/// `settings.rs`; every other leaf is reported as unused.
pub const CONSUMED_PREFIXES: &[&str] = &[
    "/notifications/url",
    "/notifications/username",
    "/notifications/password_env",
    "/notifications/client_name",
    "/notifications/max_attempts",
    "/notifications/timeout_secs",
];

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

/// Effective configuration after merging every layer.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| {
            std::fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))
        })
        .collect::<Result<Vec<String>>>()?;

    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let layer = serde_json::to_value(layer)
            .with_context(|| format!("yaml->json conversion failed in layer {i}"))?;
        merge_into(&mut merged, layer);
    }

    reject_secret_literals(&merged)?;

    // serde_json's default map keeps keys sorted, so this is key-order stable.
    let canonical_json =
        serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; any other value in `layer` replaces `base`.
fn merge_into(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                match base_map.get_mut(&k) {
                    Some(slot) => merge_into(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn reject_secret_literals(config: &Value) -> Result<()> {
    for (ptr, leaf) in leaves(config) {
        if leaf.as_str().is_some_and(looks_like_secret) {
            bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let s = s.trim();
    s.len() >= SECRET_MIN_LEN && SECRET_PREFIXES.iter().any(|p| s.starts_with(p))
}

// ---------------------------------------------------------------------------
// Unused keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Normalized consumed prefixes (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Leaf pointers no prefix covers (sorted, unique).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Report leaves not covered by [`CONSUMED_PREFIXES`]. `Fail` turns a
/// non-empty report into CONFIG_UNUSED_KEYS.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    report_unused_keys_against(CONSUMED_PREFIXES, config_json, policy)
}

/// [`report_unused_keys`] with an explicit consumed-prefix registry.
pub fn report_unused_keys_against(
    consumed: &[&str],
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let mut consumed_prefixes: Vec<String> = consumed.iter().map(|p| normalize_pointer(p)).collect();
    consumed_prefixes.sort();
    consumed_prefixes.dedup();

    let mut unused: Vec<String> = leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !consumed_prefixes.iter().any(|c| covers(c, ptr)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let first: Vec<&String> = report.unused_leaf_pointers.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
             Remove them or add them to the consumed registry. First few: {:?}",
            report.unused_leaf_pointers.len(),
            first
        );
    }

    Ok(report)
}

// ---------------------------------------------------------------------------
// JSON pointers
// ---------------------------------------------------------------------------

/// Leading `/` added, trailing `/` removed; empty input is the root `/`.
fn normalize_pointer(p: &str) -> String {
    let trimmed = p.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    format!("/{trimmed}")
}

/// `/a/b` covers `/a/b` and `/a/b/c` but not `/a/bc`. `/` covers everything.
fn covers(prefix: &str, ptr: &str) -> bool {
    prefix == "/"
        || match ptr.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
}

/// Every scalar (and null) in `v` with its JSON pointer. A scalar root is `/`.
fn leaves(v: &Value) -> Vec<(String, &Value)> {
    fn walk<'a>(v: &'a Value, path: &mut String, out: &mut Vec<(String, &'a Value)>) {
        let len = path.len();
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    path.push('/');
                    path.push_str(&k.replace('~', "~0").replace('/', "~1"));
                    walk(child, path, out);
                    path.truncate(len);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    path.push('/');
                    path.push_str(&i.to_string());
                    walk(child, path, out);
                    path.truncate(len);
                }
            }
            scalar => {
                let ptr = if path.is_empty() { "/".to_string() } else { path.clone() };
                out.push((ptr, scalar));
            }
        }
    }

    let mut out = Vec::new();
    walk(v, &mut String::new(), &mut out);
    out
}
