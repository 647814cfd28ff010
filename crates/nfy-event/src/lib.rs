//! nfy-event
//!
//! The event envelope submitted to the notification service and the closed
//! enumerations it carries.
//!
//! - `kind`: `Type` / `Severity`, their wire tokens, JSON and storage codecs
//! - `event`: the `Event` envelope and its JSON shape
//! - `storage`: sqlx (Postgres) column codec for the enumerations
//!
//! Pure value types. No IO, no HTTP.

pub mod event;
pub mod kind;
mod storage;

pub use event::Event;
pub use kind::{ParseError, Severity, Type};
