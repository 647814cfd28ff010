//! nfy-rules
//!
//! The server's authoritative rule configuration as the client sees it.
//!
//! A [`RulesSnapshot`] is only ever obtained by decoding a server response
//! and is always a complete replacement for whatever the caller held before.
//! Deciding which rules apply to an event is the caller's job; this crate
//! only provides the [`RuleMatcher`] seam for it.

mod matcher;
mod snapshot;

pub use matcher::{RuleMatcher, UnfilteredRules};
pub use snapshot::{Rule, RulesSnapshot, EMPTY_RULES_VERSION};
