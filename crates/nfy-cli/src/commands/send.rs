//! `nfy send`: build one envelope, submit it, and reconcile the rule version.
//!
//! A fresh process knows no rule snapshot, so the first submission carries the
//! empty version. When the server answers with a newer snapshot the envelope's
//! rule IDs are recomputed from it and the event is resubmitted, at most
//! `max_attempts` submissions in total.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use nfy_client::{Client, Delivery, SubmitError};
use nfy_event::{Event, Severity, Type};
use nfy_rules::{RuleMatcher, UnfilteredRules};
use uuid::Uuid;

/// Event fields as given on the command line.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub name: String,
    pub kind: Type,
    pub severity: Severity,
    pub url: String,
    /// Raw `KEY=VALUE` pairs.
    pub tags: Vec<String>,
    pub username: String,
    pub message: String,
    pub mute: Option<bool>,
    pub mute_reason: String,
}

impl SendRequest {
    pub fn into_event(self) -> Result<Event> {
        let mut ev = Event::new(self.name, self.kind)
            .with_url(self.url)
            .with_severity(self.severity)
            .with_username(self.username)
            .with_message(self.message);
        for raw in &self.tags {
            let (k, v) = parse_tag(raw)?;
            ev = ev.with_tag(k, v);
        }
        if let Some(muted) = self.mute {
            ev = ev.with_mute(muted, self.mute_reason);
        } else if !self.mute_reason.is_empty() {
            bail!("--mute-reason requires --mute");
        }
        Ok(ev)
    }
}

fn parse_tag(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim(), v)),
        _ => bail!("invalid --tag {raw:?}; expected KEY=VALUE"),
    }
}

/// Final state of a reconcile loop that ended in a delivery.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub delivery: Delivery,
    /// Submissions made, counting the first.
    pub attempts: u32,
    /// The envelope as last submitted (with reconciled rules).
    pub event: Event,
}

/// Submit `event` until it is accepted or deemed irrelevant.
///
/// Outdated-rules responses rebuild the envelope from the returned snapshot
/// using `matcher`. Any other error ends the loop immediately. Gives up with
/// `RULES_NOT_CONVERGED` after `max_attempts` submissions.
pub async fn deliver<M>(
    client: &Client,
    mut event: Event,
    matcher: &M,
    max_attempts: u32,
    timeout: Option<Duration>,
) -> Result<Delivered>
where
    M: RuleMatcher + ?Sized,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let res = match timeout {
            Some(t) => client.submit_with_timeout(&event, t).await,
            None => client.submit(&event).await,
        };

        match res {
            Ok(delivery) => {
                return Ok(Delivered {
                    delivery,
                    attempts: attempt,
                    event,
                })
            }
            Err(SubmitError::RulesOutdated(snapshot)) => {
                let ids = snapshot
                    .matching_rule_ids(&event, matcher)
                    .context("re-evaluating rules against fresh snapshot failed")?;
                tracing::info!(
                    attempt,
                    stale = %event.rules_version,
                    current = %snapshot.version(),
                    matched = ids.len(),
                    "rules outdated; resubmitting"
                );
                event = event.with_rules(snapshot.version(), ids);
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("event submission failed on attempt {attempt}")))
            }
        }
    }

    bail!(
        "RULES_NOT_CONVERGED: rules version still outdated after {} attempt(s); last seen version {:?}",
        max_attempts,
        event.rules_version
    )
}

pub async fn run(config_paths: &[String], req: SendRequest, record: bool) -> Result<()> {
    let (loaded, settings) = super::load_settings(config_paths)?;
    tracing::info!(config_hash = %loaded.config_hash, url = %settings.url, "config loaded");

    let event = req.into_event()?;
    let client = Client::with_basic_auth(
        &settings.url,
        &settings.username,
        &settings.password,
        &settings.client_name,
    )?;

    let out = deliver(
        &client,
        event,
        &UnfilteredRules,
        settings.max_attempts,
        settings.timeout,
    )
    .await?;

    let delivery = match out.delivery {
        Delivery::Accepted => "accepted",
        Delivery::Irrelevant => "irrelevant",
    };
    println!("delivery={delivery}");
    println!("attempts={}", out.attempts);
    println!("rules_version={}", out.event.rules_version);

    if record {
        let pool = nfy_db::connect_from_env().await?;
        let event_id = Uuid::new_v4();
        nfy_db::insert_event(&pool, event_id, Utc::now(), &out.event).await?;
        println!("event_id={event_id}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const SNAPSHOT: &str = r#"{"version":"0x2","rules":{"1":{"id":"1","name":"all","object_filter_expr":""},"2":{"id":"2","name":"filtered","object_filter_expr":"host.name==\"db\""}}}"#;

    fn request() -> SendRequest {
        SendRequest {
            name: "web-01".to_string(),
            kind: Type::State,
            severity: Severity::Crit,
            url: String::new(),
            tags: vec!["host=web-01".to_string()],
            username: String::new(),
            message: "down".to_string(),
            mute: None,
            mute_reason: String::new(),
        }
    }

    fn client_for(server: &MockServer) -> Client {
        Client::with_basic_auth(&server.base_url(), "source-1", "pw", "nfy-test").unwrap()
    }

    #[test]
    fn tags_must_be_key_value() {
        let mut req = request();
        req.tags = vec!["service=http=alt".to_string()];
        let ev = req.into_event().unwrap();
        assert_eq!(ev.tags["service"], "http=alt");

        let mut req = request();
        req.tags = vec!["=x".to_string()];
        assert!(req.into_event().is_err());

        let mut req = request();
        req.tags = vec!["novalue".to_string()];
        assert!(req.into_event().unwrap_err().to_string().contains("KEY=VALUE"));
    }

    #[test]
    fn mute_reason_without_mute_is_rejected() {
        let mut req = request();
        req.mute_reason = "maintenance".to_string();
        assert!(req.into_event().is_err());

        let mut req = request();
        req.mute = Some(true);
        req.mute_reason = "maintenance".to_string();
        let ev = req.into_event().unwrap();
        assert_eq!(ev.mute, Some(true));
        assert_eq!(ev.mute_reason, "maintenance");
    }

    #[tokio::test]
    async fn outdated_then_accepted() {
        let server = MockServer::start_async().await;
        let stale = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/process-event")
                    .json_body_partial(r#"{"rules_version":""}"#);
                then.status(412).body(SNAPSHOT);
            })
            .await;
        let current = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/process-event")
                    .json_body_partial(r#"{"rules_version":"0x2","rule_ids":["1"]}"#);
                then.status(202);
            })
            .await;

        let out = deliver(
            &client_for(&server),
            request().into_event().unwrap(),
            &UnfilteredRules,
            3,
            None,
        )
        .await
        .unwrap();

        assert_eq!(out.delivery, Delivery::Accepted);
        assert_eq!(out.attempts, 2);
        assert_eq!(out.event.rules_version, "0x2");
        assert_eq!(out.event.rule_ids.len(), 1);
        stale.assert_hits_async(1).await;
        current.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start_async().await;
        let churn = server
            .mock_async(|when, then| {
                when.method(POST).path("/process-event");
                then.status(412).body(r#"{"version":"0x9","rules":{}}"#);
            })
            .await;

        let err = deliver(
            &client_for(&server),
            request().into_event().unwrap(),
            &UnfilteredRules,
            2,
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("RULES_NOT_CONVERGED"), "{err}");
        churn.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn fatal_status_stops_immediately() {
        let server = MockServer::start_async().await;
        let fail = server
            .mock_async(|when, then| {
                when.method(POST).path("/process-event");
                then.status(400).body("mute_reason must not be empty");
            })
            .await;

        let err = deliver(
            &client_for(&server),
            request().into_event().unwrap(),
            &UnfilteredRules,
            5,
            None,
        )
        .await
        .unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("attempt 1"), "{msg}");
        assert!(msg.contains("mute_reason must not be empty"), "{msg}");
        let status = err.downcast_ref::<SubmitError>().and_then(SubmitError::status);
        assert_eq!(status.map(|s| s.as_u16()), Some(400));
        fail.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn irrelevant_is_a_delivery() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process-event");
                then.status(406);
            })
            .await;

        let out = deliver(
            &client_for(&server),
            request().into_event().unwrap(),
            &UnfilteredRules,
            1,
            None,
        )
        .await
        .unwrap();
        assert_eq!(out.delivery, Delivery::Irrelevant);
        assert_eq!(out.attempts, 1);
    }
}
