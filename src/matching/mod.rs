//! Priority-carrying match results, their combinators and entity predicates.

mod core;
pub mod entity;

pub use core::{MAX_PRIORITY, MatchResult, Matcher};
pub use entity::primitives;
