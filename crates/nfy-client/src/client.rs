use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Request, StatusCode, Url};
use tracing::debug;

use nfy_event::Event;
use nfy_rules::RulesSnapshot;

use crate::body::{drain, excerpt, read_capped, read_limited};
use crate::error::{SubmitError, MAX_ERROR_BODY_BYTES, MAX_SNAPSHOT_BYTES};
use crate::transport::{BasicAuthTransport, Transport};

/// Endpoint, relative to the base URL, that accepts event envelopes.
pub const PROCESS_EVENT_PATH: &str = "process-event";

/// Successful outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// `2xx`: the server accepted the event under the caller's rules version.
    Accepted,
    /// `406 Not Acceptable`: the server deemed the event irrelevant, e.g. a
    /// state change with nothing to compare against.
    Irrelevant,
}

/// Notification service client.
///
/// Holds no per-call state: cloning is cheap and one instance may serve any
/// number of concurrent [`Client::submit`] calls. Concurrent calls are not
/// ordered with respect to each other.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    process_event_url: Url,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("process_event_url", &self.process_event_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// `base_url` is the API root; a trailing `/` is optional.
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("invalid notifications base url {base_url:?}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("notifications base url {base_url:?} cannot have a path");
        }

        let joined = format!("{}/{PROCESS_EVENT_PATH}", base.as_str().trim_end_matches('/'));
        let process_event_url = Url::parse(&joined)
            .with_context(|| format!("invalid process-event url {joined:?}"))?;

        Ok(Self {
            base_url: base,
            process_event_url,
            transport,
        })
    }

    /// Client authenticating with HTTP basic credentials on behalf of the
    /// source named `client_name`.
    pub fn with_basic_auth(
        base_url: &str,
        username: &str,
        password: &str,
        client_name: &str,
    ) -> Result<Self> {
        let transport = BasicAuthTransport::new(username, password, client_name)?;
        Self::new(base_url, Arc::new(transport))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn process_event_url(&self) -> &Url {
        &self.process_event_url
    }

    /// Submit one event. Exactly one HTTP exchange, no retries.
    ///
    /// `Err(SubmitError::RulesOutdated(snapshot))` is the only outcome that
    /// carries a snapshot and the only one meant to be retried, after the
    /// caller rebuilt `event` against the snapshot.
    ///
    /// Dropping the returned future aborts the in-flight request.
    pub async fn submit(&self, event: &Event) -> Result<Delivery, SubmitError> {
        let body = event.to_json().map_err(SubmitError::Encode)?;

        let mut req = Request::new(Method::POST, self.process_event_url.clone());
        let headers = req.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.into());

        debug!(
            name = %event.name,
            kind = %event.kind,
            rules_version = %event.rules_version,
            rule_ids = event.rule_ids.len(),
            "submitting event"
        );

        let resp = self
            .transport
            .execute(req)
            .await
            .map_err(SubmitError::Transport)?;
        let status = resp.status();
        debug!(status = status.as_u16(), "process-event responded");

        if status == StatusCode::PRECONDITION_FAILED {
            let raw = read_limited(resp, MAX_SNAPSHOT_BYTES)
                .await
                .map_err(SubmitError::Transport)?
                .ok_or_else(|| {
                    SubmitError::Protocol(<serde_json::Error as serde::de::Error>::custom(
                        format!("rules snapshot exceeds {MAX_SNAPSHOT_BYTES} bytes"),
                    ))
                })?;
            let snapshot = RulesSnapshot::from_json(&raw).map_err(SubmitError::Protocol)?;
            return Err(SubmitError::RulesOutdated(snapshot));
        }

        if status.is_success() {
            drain(resp).await;
            return Ok(Delivery::Accepted);
        }

        if status == StatusCode::NOT_ACCEPTABLE {
            drain(resp).await;
            return Ok(Delivery::Irrelevant);
        }

        let raw = read_capped(resp, MAX_ERROR_BODY_BYTES).await;
        Err(SubmitError::UnexpectedStatus {
            status,
            body: excerpt(&raw),
        })
    }

    /// [`Client::submit`], abandoned with [`SubmitError::Cancelled`] as soon as
    /// `cancel` completes. The in-flight request is dropped, which closes its
    /// connection.
    pub async fn submit_until<F>(&self, event: &Event, cancel: F) -> Result<Delivery, SubmitError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => Err(SubmitError::Cancelled),
            res = self.submit(event) => res,
        }
    }

    /// [`Client::submit_until`] with a deadline `timeout` from now.
    pub async fn submit_with_timeout(
        &self,
        event: &Event,
        timeout: Duration,
    ) -> Result<Delivery, SubmitError> {
        self.submit_until(event, tokio::time::sleep(timeout)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Result<Client> {
        Client::new(base, Arc::new(reqwest::Client::new()))
    }

    #[test]
    fn process_event_url_is_joined_onto_base() {
        let c = client("http://localhost:5680").unwrap();
        assert_eq!(
            c.process_event_url().as_str(),
            "http://localhost:5680/process-event"
        );

        let c = client("https://notifications.example.com/api/").unwrap();
        assert_eq!(
            c.process_event_url().as_str(),
            "https://notifications.example.com/api/process-event"
        );

        let c = client("https://notifications.example.com/api").unwrap();
        assert_eq!(
            c.process_event_url().as_str(),
            "https://notifications.example.com/api/process-event"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(client("").is_err());
        assert!(client("localhost:5680").is_err());
        assert!(client("mailto:ops@example.com").is_err());
    }

    #[test]
    fn client_is_shareable_across_tasks() {
        fn assert_send_sync_clone<T: Send + Sync + Clone>() {}
        assert_send_sync_clone::<Client>();
    }
}
