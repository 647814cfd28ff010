//! The event envelope: one occurrence on one object, submitted once.
//!
//! The envelope also carries the caller's view of the server rule set:
//! `rules_version` names the cached rule snapshot and `rule_ids` lists the
//! rules from that snapshot the caller decided apply to this event. The two
//! fields are a unit and are only ever replaced together (see
//! [`Event::with_rules`]).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::kind::{Severity, Type};

/// Event envelope as sent to `POST <base>/process-event`.
///
/// Omission rules on the wire:
/// - `severity` is left out entirely when absent (never `"severity": null`)
/// - `mute` is left out unless explicitly set
/// - `mute_reason` is left out when empty
///
/// No semantic validation happens here. A mute without a reason is sent as
/// is and rejected by the server; the envelope never invents a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Name of the object the event is about (e.g. `"web-01!http"`).
    pub name: String,
    /// Absolute or relative URL of the object in the source's UI.
    pub url: String,
    /// Tags disambiguating the object when the name is not enough.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub kind: Type,
    #[serde(default, skip_serializing_if = "Severity::is_absent")]
    pub severity: Severity,
    /// Acting user, if any (e.g. who set an acknowledgement).
    pub username: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mute_reason: String,
    /// Version of the rule snapshot used to compute `rule_ids`.
    pub rules_version: String,
    /// Rules (from `rules_version`) that apply to this event. Order is not
    /// significant.
    #[serde(default)]
    pub rule_ids: BTreeSet<String>,
}

impl Event {
    /// A bare envelope for `name` with every optional field unset and an
    /// empty rule version.
    pub fn new(name: impl Into<String>, kind: Type) -> Self {
        Self {
            name: name.into(),
            url: String::new(),
            tags: BTreeMap::new(),
            kind,
            severity: Severity::None,
            username: String::new(),
            message: String::new(),
            mute: None,
            mute_reason: String::new(),
            rules_version: String::new(),
            rule_ids: BTreeSet::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Explicitly set the mute flag. `reason` is passed through verbatim,
    /// including when empty.
    pub fn with_mute(mut self, muted: bool, reason: impl Into<String>) -> Self {
        self.mute = Some(muted);
        self.mute_reason = reason.into();
        self
    }

    /// Replace the rule version and matched rule IDs together.
    pub fn with_rules<I, S>(mut self, version: impl Into<String>, rule_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules_version = version.into();
        self.rule_ids = rule_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Canonical JSON body for submission.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> Event {
        Event::new("web-01!http", Type::State)
            .with_url("/icingaweb2/icingadb/service?name=http&host.name=web-01")
            .with_tag("host", "web-01")
            .with_tag("service", "http")
            .with_severity(Severity::Crit)
            .with_message("connection refused")
            .with_rules("0x1", ["3", "1"])
    }

    fn encode(ev: &Event) -> Value {
        serde_json::from_slice(&ev.to_json().unwrap()).unwrap()
    }

    #[test]
    fn encodes_fixed_field_names() {
        let v = encode(&sample());
        assert_eq!(
            v,
            json!({
                "name": "web-01!http",
                "url": "/icingaweb2/icingadb/service?name=http&host.name=web-01",
                "tags": {"host": "web-01", "service": "http"},
                "type": "state",
                "severity": "crit",
                "username": "",
                "message": "connection refused",
                "rules_version": "0x1",
                "rule_ids": ["1", "3"],
            })
        );
    }

    #[test]
    fn unset_severity_is_omitted_not_null() {
        let v = encode(&Event::new("web-01", Type::Custom));
        let obj = v.as_object().unwrap();
        assert!(!obj.contains_key("severity"));

        let v = encode(&sample().with_severity(Severity::None));
        assert!(!v.as_object().unwrap().contains_key("severity"));
    }

    #[test]
    fn mute_fields_follow_omission_rules() {
        let v = encode(&sample());
        assert!(v.get("mute").is_none());
        assert!(v.get("mute_reason").is_none());

        let v = encode(&sample().with_mute(false, ""));
        assert_eq!(v["mute"], json!(false));
        assert!(v.get("mute_reason").is_none());

        let v = encode(&sample().with_mute(true, "maintenance window"));
        assert_eq!(v["mute"], json!(true));
        assert_eq!(v["mute_reason"], json!("maintenance window"));
    }

    #[test]
    fn mute_without_reason_is_sent_verbatim() {
        let v = encode(&sample().with_mute(true, ""));
        assert_eq!(v["mute"], json!(true));
        assert!(v.get("mute_reason").is_none());
    }

    #[test]
    fn unknown_type_encodes_as_null() {
        let v = encode(&Event::new("x", Type::Unknown));
        assert_eq!(v["type"], Value::Null);
    }

    #[test]
    fn rule_ids_compare_as_a_set() {
        let a = sample().with_rules("0x1", ["1", "2", "3"]);
        let b = sample().with_rules("0x1", ["3", "1", "2", "2"]);
        assert_eq!(a, b);
        assert_eq!(b.rule_ids.len(), 3);
    }

    #[test]
    fn with_rules_replaces_version_and_ids_together() {
        let ev = sample().with_rules("0x2", Vec::<String>::new());
        assert_eq!(ev.rules_version, "0x2");
        assert!(ev.rule_ids.is_empty());
        assert_eq!(encode(&ev)["rule_ids"], json!([]));
    }

    #[test]
    fn decodes_what_it_encodes() {
        let ev = sample().with_mute(true, "planned");
        let back: Event = serde_json::from_slice(&ev.to_json().unwrap()).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn decoding_rejects_unknown_enum_tokens() {
        let raw = r#"{"name":"a","url":"","type":"state","severity":"fatal",
                      "username":"","message":"","rules_version":""}"#;
        let err = serde_json::from_str::<Event>(raw).unwrap_err();
        assert!(err.to_string().contains("fatal"));
    }
}
