use anyhow::Result;

use nfy_event::Event;

use crate::snapshot::Rule;

/// Decides whether a rule applies to an event.
///
/// Implemented by the caller, usually by evaluating
/// [`Rule::object_filter`] against its own view of the object. Must be pure
/// with respect to the snapshot: re-running it against the same snapshot and
/// event yields the same answer, which is what makes concurrent
/// re-evaluation after an outdated-rules response safe.
pub trait RuleMatcher {
    fn matches(&self, rule: &Rule, event: &Event) -> Result<bool>;
}

/// Matches exactly the rules without an object filter, i.e. the rules that
/// apply to every object of the source.
///
/// Rules with a filter never match. Callers that can evaluate filter
/// expressions should provide their own [`RuleMatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnfilteredRules;

impl RuleMatcher for UnfilteredRules {
    fn matches(&self, rule: &Rule, _event: &Event) -> Result<bool> {
        Ok(rule.object_filter().is_none())
    }
}

impl<F> RuleMatcher for F
where
    F: Fn(&Rule, &Event) -> Result<bool>,
{
    fn matches(&self, rule: &Rule, event: &Event) -> Result<bool> {
        self(rule, event)
    }
}
