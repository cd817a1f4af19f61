use std::fmt;
use std::sync::Arc;

use crate::entity::Entity;

/// Highest priority a match may carry.
pub const MAX_PRIORITY: u8 = 100;

/// Boolean judgment paired with a priority in `[0, 100]`.
///
/// A non-matching result always reports priority `0`, whatever it was built
/// with, so combinators never need to special-case it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchResult {
    matched: bool,
    priority: u8,
}

impl MatchResult {
    pub const NO_MATCH: MatchResult = MatchResult::new(false, 0);
    pub const DEFAULT_CARD: MatchResult = MatchResult::new(true, 1);
    pub const WEAK: MatchResult = MatchResult::new(true, 10);
    pub const CATEGORY: MatchResult = MatchResult::new(true, 20);
    pub const FEATURE: MatchResult = MatchResult::new(true, 30);
    pub const MANUFACTURER: MatchResult = MatchResult::new(true, 40);
    pub const ENTITY_TYPE: MatchResult = MatchResult::new(true, 50);
    pub const DEVICE_CLASS: MatchResult = MatchResult::new(true, 60);
    pub const MODEL: MatchResult = MatchResult::new(true, 70);
    pub const DOMAIN_EXACT: MatchResult = MatchResult::new(true, 80);
    pub const ID_EXACT: MatchResult = MatchResult::new(true, 90);
    pub const USER_SPECIFIED: MatchResult = MatchResult::new(true, 100);

    /// Identity element of [`MatchResult::all`].
    pub const ALL_IDENTITY: MatchResult = MatchResult::new(true, 0);

    pub const fn new(matched: bool, priority: u8) -> Self {
        if !matched {
            return Self {
                matched: false,
                priority: 0,
            };
        }
        let priority = if priority > MAX_PRIORITY {
            MAX_PRIORITY
        } else {
            priority
        };
        Self {
            matched: true,
            priority,
        }
    }

    /// A positive match at `priority`, clamped to 100.
    pub const fn custom(priority: u8) -> Self {
        Self::new(true, priority)
    }

    pub const fn is_match(&self) -> bool {
        self.matched
    }

    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Every input matches; priority is the maximum among them. Empty input
    /// yields [`MatchResult::ALL_IDENTITY`].
    pub fn all<I>(results: I) -> MatchResult
    where
        I: IntoIterator<Item = MatchResult>,
    {
        let mut priority = 0;
        for result in results {
            if !result.matched {
                return MatchResult::NO_MATCH;
            }
            priority = priority.max(result.priority);
        }
        MatchResult::new(true, priority)
    }

    /// At least one input matches; priority is the maximum among the
    /// matching subset. Empty input yields [`MatchResult::NO_MATCH`].
    pub fn any<I>(results: I) -> MatchResult
    where
        I: IntoIterator<Item = MatchResult>,
    {
        results
            .into_iter()
            .filter(|result| result.matched)
            .max_by_key(|result| result.priority)
            .unwrap_or(MatchResult::NO_MATCH)
    }

    /// First matching input in declaration order. Inputs after it are never
    /// pulled from the iterator.
    pub fn first_match<I>(results: I) -> MatchResult
    where
        I: IntoIterator<Item = MatchResult>,
    {
        results
            .into_iter()
            .find(|result| result.matched)
            .unwrap_or(MatchResult::NO_MATCH)
    }

    /// `self` when the condition holds, otherwise [`MatchResult::NO_MATCH`].
    pub const fn when(self, condition: bool) -> MatchResult {
        if condition { self } else { MatchResult::NO_MATCH }
    }
}

impl Default for MatchResult {
    fn default() -> Self {
        MatchResult::NO_MATCH
    }
}

type MatchFn = dyn Fn(&Entity) -> Result<MatchResult, String> + Send + Sync;

/// Shareable entity predicate producing a [`MatchResult`].
#[derive(Clone)]
pub struct Matcher {
    inner: Arc<MatchFn>,
}

impl Matcher {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Entity) -> MatchResult + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |entity: &Entity| -> Result<MatchResult, String> {
                Ok(f(entity))
            }),
        }
    }

    /// Wrap a predicate that can fail. An `Err` is reported as a matcher
    /// fault by [`Matcher::evaluate`]; combinators propagate it outward.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&Entity) -> Result<MatchResult, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            inner: Arc::new(move |entity: &Entity| -> Result<MatchResult, String> {
                f(entity).map_err(|err| err.to_string())
            }),
        }
    }

    /// Always returns `result`.
    pub fn constant(result: MatchResult) -> Self {
        Self::new(move |_| result)
    }

    pub fn evaluate(&self, entity: &Entity) -> Result<MatchResult, String> {
        (self.inner)(entity)
    }

    pub fn all(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Vec<Matcher> = matchers.into_iter().collect();
        Self::fallible(move |entity: &Entity| -> Result<MatchResult, String> {
            let results = matchers
                .iter()
                .map(|matcher| matcher.evaluate(entity))
                .collect::<Result<Vec<_>, String>>()?;
            Ok(MatchResult::all(results))
        })
    }

    pub fn any(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Vec<Matcher> = matchers.into_iter().collect();
        Self::fallible(move |entity: &Entity| -> Result<MatchResult, String> {
            let results = matchers
                .iter()
                .map(|matcher| matcher.evaluate(entity))
                .collect::<Result<Vec<_>, String>>()?;
            Ok(MatchResult::any(results))
        })
    }

    /// Evaluates sub-matchers in order and stops at the first match.
    pub fn first_match(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Vec<Matcher> = matchers.into_iter().collect();
        Self::fallible(move |entity: &Entity| -> Result<MatchResult, String> {
            for matcher in &matchers {
                let result = matcher.evaluate(entity)?;
                if result.is_match() {
                    return Ok(result);
                }
            }
            Ok(MatchResult::NO_MATCH)
        })
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Matcher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn non_match_discards_priority() {
        let result = MatchResult::new(false, 70);
        assert_eq!(result, MatchResult::NO_MATCH);
        assert_eq!(result.priority(), 0);
    }

    #[test]
    fn custom_priority_is_clamped() {
        assert_eq!(MatchResult::custom(250).priority(), 100);
    }

    #[test]
    fn all_requires_every_input() {
        let hit = MatchResult::all([MatchResult::FEATURE, MatchResult::DEVICE_CLASS]);
        assert!(hit.is_match());
        assert_eq!(hit.priority(), 60);

        let miss = MatchResult::all([MatchResult::ID_EXACT, MatchResult::NO_MATCH]);
        assert_eq!(miss, MatchResult::NO_MATCH);
    }

    #[test]
    fn any_takes_max_of_matching_subset() {
        let result = MatchResult::any([
            MatchResult::NO_MATCH,
            MatchResult::WEAK,
            MatchResult::MANUFACTURER,
        ]);
        assert_eq!(result, MatchResult::MANUFACTURER);
    }

    #[test]
    fn identity_elements() {
        assert_eq!(MatchResult::all([]), MatchResult::ALL_IDENTITY);
        assert_eq!(MatchResult::any([]), MatchResult::NO_MATCH);
        assert_eq!(MatchResult::first_match([]), MatchResult::NO_MATCH);

        let x = MatchResult::DEVICE_CLASS;
        assert_eq!(MatchResult::all([MatchResult::ALL_IDENTITY, x]), x);
        assert_eq!(MatchResult::any([MatchResult::NO_MATCH, x]), x);
    }

    #[test]
    fn all_and_any_are_associative() {
        let (a, b, c) = (MatchResult::WEAK, MatchResult::MODEL, MatchResult::NO_MATCH);
        assert_eq!(
            MatchResult::any([MatchResult::any([a, b]), c]),
            MatchResult::any([a, MatchResult::any([b, c])])
        );
        assert_eq!(
            MatchResult::all([MatchResult::all([a, b]), c]),
            MatchResult::all([a, MatchResult::all([b, c])])
        );
    }

    #[test]
    fn first_match_respects_declaration_order() {
        let result = MatchResult::first_match([
            MatchResult::NO_MATCH,
            MatchResult::WEAK,
            MatchResult::USER_SPECIFIED,
        ]);
        assert_eq!(result, MatchResult::WEAK);
    }

    #[test]
    fn first_match_matcher_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let matcher = Matcher::first_match([
            Matcher::constant(MatchResult::CATEGORY),
            Matcher::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                MatchResult::USER_SPECIFIED
            }),
        ]);

        let result = matcher.evaluate(&Entity::new("switch.hall")).unwrap();
        assert_eq!(result, MatchResult::CATEGORY);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fallible_errors_propagate_through_combinators() {
        let broken = Matcher::fallible(|_| Err::<MatchResult, _>("attribute missing"));
        let matcher = Matcher::any([Matcher::constant(MatchResult::WEAK), broken]);
        let err = matcher.evaluate(&Entity::new("sensor.x")).unwrap_err();
        assert_eq!(err, "attribute missing");
    }
}
