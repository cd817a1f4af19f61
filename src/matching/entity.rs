//! Ready-made predicates over [`Entity`] records.
//!
//! Constructors taking `Option<MatchResult>` fall back to the priority the
//! dashboard conventionally assigns to that kind of evidence: an exact id is
//! `ID_EXACT`, an explicit `card_type` pin is `USER_SPECIFIED`.

use serde_json::Value;

use super::core::{MatchResult, Matcher};
use crate::entity::Entity;

/// Value-level checks returning `result` when the condition holds.
pub mod primitives {
    use super::{MatchResult, Value};

    pub fn when(condition: bool, result: MatchResult) -> MatchResult {
        result.when(condition)
    }

    pub fn starts_with(value: &str, prefix: &str, result: MatchResult) -> MatchResult {
        result.when(value.starts_with(prefix))
    }

    pub fn equals<T>(value: &T, expected: &T, result: MatchResult) -> MatchResult
    where
        T: PartialEq + ?Sized,
    {
        result.when(value == expected)
    }

    pub fn exists(value: Option<&Value>, result: MatchResult) -> MatchResult {
        result.when(matches!(value, Some(v) if !v.is_null()))
    }

    pub fn has_bit_flag(value: Option<u64>, flag: u64, result: MatchResult) -> MatchResult {
        result.when(value.is_some_and(|bits| bits & flag == flag))
    }

    pub fn includes<T: PartialEq>(value: &T, candidates: &[T], result: MatchResult) -> MatchResult {
        result.when(candidates.contains(value))
    }

    pub fn has_property(object: Option<&Value>, key: &str, result: MatchResult) -> MatchResult {
        let present = object
            .and_then(Value::as_object)
            .is_some_and(|map| map.contains_key(key));
        result.when(present)
    }
}

use primitives::{equals, has_bit_flag, starts_with};

/// Id begins with `prefix` (`DOMAIN_EXACT` unless overridden).
pub fn has_id_prefix(prefix: impl Into<String>, priority: Option<MatchResult>) -> Matcher {
    let prefix = prefix.into();
    let result = priority.unwrap_or(MatchResult::DOMAIN_EXACT);
    Matcher::new(move |entity| starts_with(entity.id(), &prefix, result))
}

pub fn has_exact_id(id: impl Into<String>, priority: Option<MatchResult>) -> Matcher {
    let id = id.into();
    let result = priority.unwrap_or(MatchResult::ID_EXACT);
    Matcher::new(move |entity| equals(entity.id(), id.as_str(), result))
}

pub fn has_device_class(class: impl Into<String>, priority: Option<MatchResult>) -> Matcher {
    string_attribute("device_class", class.into(), priority.unwrap_or(MatchResult::DEVICE_CLASS))
}

pub fn has_manufacturer(name: impl Into<String>, priority: Option<MatchResult>) -> Matcher {
    string_attribute("manufacturer", name.into(), priority.unwrap_or(MatchResult::MANUFACTURER))
}

/// Explicit user pin via the `card_type` attribute.
pub fn has_card_type(card_type: impl Into<String>, priority: Option<MatchResult>) -> Matcher {
    string_attribute(
        "card_type",
        card_type.into(),
        priority.unwrap_or(MatchResult::USER_SPECIFIED),
    )
}

/// All bits of `flag` are set in `supported_features`.
pub fn has_feature(flag: u64, priority: Option<MatchResult>) -> Matcher {
    let result = priority.unwrap_or(MatchResult::FEATURE);
    Matcher::new(move |entity| {
        has_bit_flag(entity.attribute_u64("supported_features"), flag, result)
    })
}

pub fn has_state(state: impl Into<String>, result: MatchResult) -> Matcher {
    let state = state.into();
    Matcher::new(move |entity| equals(entity.state.as_str(), state.as_str(), result))
}

/// Attribute `key` equals `value`. `Value::Null` also matches an absent key.
pub fn has_attribute(key: impl Into<String>, value: Value, result: MatchResult) -> Matcher {
    let key = key.into();
    Matcher::new(move |entity| {
        let actual = entity.attribute(&key).unwrap_or(&Value::Null);
        equals(actual, &value, result)
    })
}

pub fn has_attribute_key(key: impl Into<String>, result: MatchResult) -> Matcher {
    let key = key.into();
    Matcher::new(move |entity| result.when(entity.attributes.contains_key(&key)))
}

pub fn custom<F>(predicate: F, result: MatchResult) -> Matcher
where
    F: Fn(&Entity) -> bool + Send + Sync + 'static,
{
    Matcher::new(move |entity| result.when(predicate(entity)))
}

fn string_attribute(key: &'static str, expected: String, result: MatchResult) -> Matcher {
    Matcher::new(move |entity| result.when(entity.attribute_str(key) == Some(expected.as_str())))
}
