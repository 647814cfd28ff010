//! nfy-client
//!
//! Submits event envelopes to a notification service and reconciles the
//! caller's cached rule version through the response, without a separate
//! fetch round trip.
//!
//! One call to [`Client::submit`] is exactly one `POST <base>/process-event`
//! exchange. Outcomes:
//! - `2xx`: [`Delivery::Accepted`]
//! - `406 Not Acceptable`: [`Delivery::Irrelevant`], the server found nothing
//!   to do for the event; not an error
//! - `412 Precondition Failed`: [`SubmitError::RulesOutdated`] carrying the
//!   server's current [`nfy_rules::RulesSnapshot`] (bodies over
//!   [`MAX_SNAPSHOT_BYTES`] are a protocol error)
//! - anything else: [`SubmitError::UnexpectedStatus`]
//!
//! # Caller obligations
//! The client never retries. On `RulesOutdated` the caller re-evaluates its
//! rules against the attached snapshot, rebuilds the envelope with
//! `Event::with_rules(snapshot.version(), ids)` and submits again. Bounding
//! that loop is also the caller's job: if the server's rules change between
//! every attempt, an unbounded loop never ends.

mod body;
mod client;
mod error;
mod transport;

pub use client::{Client, Delivery, PROCESS_EVENT_PATH};
pub use error::{SubmitError, MAX_ERROR_BODY_BYTES, MAX_SNAPSHOT_BYTES};
pub use transport::{user_agent, BasicAuthTransport, Transport};
