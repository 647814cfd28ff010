use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use nfy_event::Event;

use crate::matcher::RuleMatcher;

/// Version token meaning "no rules configured for this source".
pub const EMPTY_RULES_VERSION: &str = "";

/// Metadata of one server-side event rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    /// Object filter deciding which objects the rule applies to. `None` (or
    /// an empty expression on the wire) means every object.
    #[serde(default)]
    object_filter_expr: Option<String>,
}

impl Rule {
    /// The object filter, if the rule has a non-empty one.
    pub fn object_filter(&self) -> Option<&str> {
        self.object_filter_expr
            .as_deref()
            .filter(|expr| !expr.trim().is_empty())
    }
}

/// One complete, immutable rule configuration at a point in time.
///
/// Versions are opaque and compared for equality only; no ordering between
/// two versions is implied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RulesSnapshot {
    version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    rules: HashMap<String, Rule>,
}

/// Servers may send `"rules": null` for a source without rules.
fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, Rule>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, Rule>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RulesSnapshot {
    /// Decode a snapshot from a `412 Precondition Failed` response body.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `true` when the server has no rules configured for this source.
    pub fn is_empty_version(&self) -> bool {
        self.version == EMPTY_RULES_VERSION
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Every rule in the snapshot, in no particular order.
    ///
    /// Each call returns a fresh iterator, so the caller can walk the rule set
    /// as often as it needs to.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    /// IDs of all rules that `matcher` says apply to `event`.
    ///
    /// The result is meant to go straight into
    /// `event.with_rules(snapshot.version(), ids)`.
    pub fn matching_rule_ids<M>(&self, event: &Event, matcher: &M) -> Result<BTreeSet<String>>
    where
        M: RuleMatcher + ?Sized,
    {
        let mut ids = BTreeSet::new();
        for rule in self.rules() {
            let applies = matcher
                .matches(rule, event)
                .with_context(|| format!("evaluating rule id={} name={:?}", rule.id, rule.name))?;
            if applies {
                ids.insert(rule.id.clone());
            }
        }
        Ok(ids)
    }
}
