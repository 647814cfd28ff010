use std::fmt;

use reqwest::StatusCode;

use nfy_rules::RulesSnapshot;

/// Upper bound on how much of an unexpected response body is kept for the
/// error message. The remainder is read and discarded.
pub const MAX_ERROR_BODY_BYTES: usize = 1 << 20;

/// Upper bound on a `412` rules snapshot body. Larger bodies are rejected as
/// [`SubmitError::Protocol`] without being buffered.
pub const MAX_SNAPSHOT_BYTES: usize = 16 << 20;

/// Why a submission did not end in a [`crate::Delivery`].
///
/// Only [`SubmitError::RulesOutdated`] is an expected, recoverable outcome;
/// every other variant is fatal to the attempt.
#[derive(Debug)]
pub enum SubmitError {
    /// The envelope could not be serialized. Indicates a programming error
    /// upstream; never retryable.
    Encode(serde_json::Error),
    /// Building, sending, or reading the HTTP exchange failed.
    Transport(reqwest::Error),
    /// The caller's cancellation signal fired before the exchange finished.
    Cancelled,
    /// The caller's rules version is stale. Carries the server's current
    /// snapshot; re-evaluate against it and resubmit.
    RulesOutdated(RulesSnapshot),
    /// The server reported outdated rules but the body was not a snapshot.
    Protocol(serde_json::Error),
    /// Any other non-success status. `body` is a whitespace-trimmed excerpt of
    /// at most [`MAX_ERROR_BODY_BYTES`] of the response body.
    UnexpectedStatus { status: StatusCode, body: String },
}

impl SubmitError {
    pub fn is_rules_outdated(&self) -> bool {
        matches!(self, SubmitError::RulesOutdated(_))
    }

    pub fn rules_snapshot(&self) -> Option<&RulesSnapshot> {
        match self {
            SubmitError::RulesOutdated(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn into_rules_snapshot(self) -> Option<RulesSnapshot> {
        match self {
            SubmitError::RulesOutdated(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SubmitError::RulesOutdated(_) | SubmitError::Protocol(_) => {
                Some(StatusCode::PRECONDITION_FAILED)
            }
            SubmitError::UnexpectedStatus { status, .. } => Some(*status),
            SubmitError::Transport(e) => e.status(),
            SubmitError::Encode(_) | SubmitError::Cancelled => None,
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Encode(e) => write!(f, "cannot encode event: {e}"),
            SubmitError::Transport(e) => write!(f, "cannot submit event: {e}"),
            SubmitError::Cancelled => write!(f, "event submission cancelled"),
            SubmitError::RulesOutdated(snapshot) => write!(
                f,
                "rules outdated: server rules version is {:?}",
                snapshot.version()
            ),
            SubmitError::Protocol(e) => write!(
                f,
                "server reported outdated rules but sent an undecodable snapshot: {e}"
            ),
            SubmitError::UnexpectedStatus { status, body } if body.is_empty() => {
                write!(f, "unexpected HTTP status {status}")
            }
            SubmitError::UnexpectedStatus { status, body } => {
                write!(f, "unexpected HTTP status {status}: {body}")
            }
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Encode(e) | SubmitError::Protocol(e) => Some(e),
            SubmitError::Transport(e) => Some(e),
            _ => None,
        }
    }
}
