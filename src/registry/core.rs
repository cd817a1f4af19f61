use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{MatcherFault, RegistryError};
use crate::geometry::Size;
use crate::layout::Footprint;
use crate::matching::{MatchResult, Matcher};

/// Descriptive metadata shown by hosts that list available cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
}

impl WidgetMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A registered card type: how to recognise entities and how big to draw them.
#[derive(Debug, Clone)]
pub struct WidgetSpec {
    id: String,
    default_size: Size,
    sizes: BTreeMap<String, Size>,
    meta: WidgetMeta,
    matcher: Matcher,
}

impl WidgetSpec {
    pub fn new(id: impl Into<String>, default_size: Size, matcher: Matcher) -> Self {
        let id = id.into();
        Self {
            meta: WidgetMeta::named(id.clone()),
            id,
            default_size,
            sizes: BTreeMap::new(),
            matcher,
        }
    }

    pub fn with_meta(mut self, meta: WidgetMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Named alternative footprint such as `compact` or `large`.
    pub fn with_size(mut self, name: impl Into<String>, size: Size) -> Self {
        self.sizes.insert(name.into(), size);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn default_size(&self) -> Size {
        self.default_size
    }

    pub fn size_named(&self, name: &str) -> Option<Size> {
        self.sizes.get(name).copied()
    }

    pub fn sizes(&self) -> &BTreeMap<String, Size> {
        &self.sizes
    }

    pub fn meta(&self) -> &WidgetMeta {
        &self.meta
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.id.clone(), self.default_size)
    }

    /// Run the matcher with panics and reported errors contained.
    pub fn evaluate(&self, entity: &Entity) -> Result<MatchResult, MatcherFault> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.matcher.evaluate(entity)));
        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(self.fault(message)),
            Err(payload) => Err(self.fault(panic_message(payload.as_ref()))),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        let invalid = std::iter::once(&self.default_size)
            .chain(self.sizes.values())
            .find(|size| !size.is_valid());
        match invalid {
            Some(size) => Err(RegistryError::InvalidSize {
                spec: self.id.clone(),
                width: size.width,
                height: size.height,
            }),
            None => Ok(()),
        }
    }

    fn fault(&self, message: String) -> MatcherFault {
        MatcherFault {
            spec: self.id.clone(),
            message,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "matcher panicked".to_string()
    }
}

/// The spec chosen for one entity plus any matcher faults seen on the way.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub spec: Arc<WidgetSpec>,
    pub result: MatchResult,
    pub fallback: bool,
    pub faults: Vec<MatcherFault>,
}

impl Resolution {
    pub fn spec_id(&self) -> &str {
        self.spec.id()
    }
}

/// Ordered, append-only set of widget specs with an always-present default.
#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    specs: Vec<Arc<WidgetSpec>>,
    default: Arc<WidgetSpec>,
}

impl WidgetRegistry {
    pub fn new(default: WidgetSpec) -> Result<Self, RegistryError> {
        default.validate()?;
        Ok(Self {
            specs: Vec::new(),
            default: Arc::new(default),
        })
    }

    pub fn register(&mut self, spec: WidgetSpec) -> Result<(), RegistryError> {
        spec.validate()?;
        if self.get(spec.id()).is_some() {
            return Err(RegistryError::DuplicateSpec(spec.id));
        }
        self.specs.push(Arc::new(spec));
        Ok(())
    }

    pub fn with(mut self, spec: WidgetSpec) -> Result<Self, RegistryError> {
        self.register(spec)?;
        Ok(self)
    }

    pub fn default_spec(&self) -> &Arc<WidgetSpec> {
        &self.default
    }

    pub fn get(&self, id: &str) -> Option<&Arc<WidgetSpec>> {
        if self.default.id() == id {
            return Some(&self.default);
        }
        self.specs.iter().find(|spec| spec.id() == id)
    }

    /// Registered specs in registration order, default excluded.
    pub fn specs(&self) -> impl Iterator<Item = &Arc<WidgetSpec>> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Highest-priority matching spec; the earliest registration wins ties.
    /// Falls back to the default spec when nothing matches.
    pub fn resolve(&self, entity: &Entity) -> Resolution {
        let mut best: Option<(&Arc<WidgetSpec>, MatchResult)> = None;
        let mut faults = Vec::new();

        for spec in &self.specs {
            let result = match spec.evaluate(entity) {
                Ok(result) => result,
                Err(fault) => {
                    faults.push(fault);
                    continue;
                }
            };
            if !result.is_match() {
                continue;
            }
            let better = match best {
                Some((_, current)) => result.priority() > current.priority(),
                None => true,
            };
            if better {
                best = Some((spec, result));
            }
        }

        match best {
            Some((spec, result)) => Resolution {
                spec: Arc::clone(spec),
                result,
                fallback: false,
                faults,
            },
            None => Resolution {
                spec: Arc::clone(&self.default),
                result: MatchResult::DEFAULT_CARD,
                fallback: true,
                faults,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::entity::{has_device_class, has_id_prefix};

    fn default_spec() -> WidgetSpec {
        WidgetSpec::new(
            "default-card",
            Size::new(2, 2),
            Matcher::constant(MatchResult::DEFAULT_CARD),
        )
    }

    fn weak(id: &str, size: Size) -> WidgetSpec {
        WidgetSpec::new(id, size, Matcher::constant(MatchResult::WEAK))
    }

    fn registry() -> WidgetRegistry {
        WidgetRegistry::new(default_spec())
            .unwrap()
            .with(WidgetSpec::new("y-card", Size::new(1, 1), has_device_class("light", None)))
            .unwrap()
            .with(WidgetSpec::new("x-card", Size::new(2, 2), has_id_prefix("light.", None)))
            .unwrap()
    }

    #[test]
    fn higher_priority_wins_regardless_of_order() {
        let entity = Entity::new("light.kitchen").with_attribute("device_class", "light");
        let resolution = registry().resolve(&entity);
        assert_eq!(resolution.spec_id(), "x-card");
        assert_eq!(resolution.result.priority(), 80);
        assert!(!resolution.fallback);
    }

    #[test]
    fn equal_priorities_prefer_first_registered() {
        let registry = WidgetRegistry::new(default_spec())
            .unwrap()
            .with(WidgetSpec::new("first", Size::new(1, 1), Matcher::constant(MatchResult::WEAK)))
            .unwrap()
            .with(WidgetSpec::new("second", Size::new(1, 1), Matcher::constant(MatchResult::WEAK)))
            .unwrap();
        assert_eq!(registry.resolve(&Entity::new("x.y")).spec_id(), "first");
    }

    #[test]
    fn nothing_matching_returns_default() {
        let resolution = registry().resolve(&Entity::new("sensor.outdoor"));
        assert_eq!(resolution.spec_id(), "default-card");
        assert!(resolution.fallback);
        assert!(resolution.faults.is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let registry = registry();
        let entity = Entity::new("light.hall").with_attribute("device_class", "light");
        let first = registry.resolve(&entity).spec_id().to_string();
        for _ in 0..10 {
            assert_eq!(registry.resolve(&entity).spec_id(), first);
        }
    }

    #[test]
    fn panicking_matcher_is_isolated() {
        let mut registry = registry();
        registry
            .register(WidgetSpec::new(
                "broken",
                Size::new(1, 1),
                Matcher::new(|_| panic!("boom")),
            ))
            .unwrap();

        let entity = Entity::new("light.kitchen");
        let resolution = registry.resolve(&entity);
        assert_eq!(resolution.spec_id(), "x-card");
        assert_eq!(resolution.faults.len(), 1);
        assert_eq!(resolution.faults[0].spec, "broken");
        assert_eq!(resolution.faults[0].message, "boom");
    }

    #[test]
    fn failing_matcher_becomes_fault() {
        let registry = WidgetRegistry::new(default_spec())
            .unwrap()
            .with(WidgetSpec::new(
                "strict",
                Size::new(1, 1),
                Matcher::fallible(|_| Err::<MatchResult, _>("missing attribute")),
            ))
            .unwrap();

        let resolution = registry.resolve(&Entity::new("fan.attic"));
        assert!(resolution.fallback);
        assert_eq!(resolution.faults[0].message, "missing attribute");
    }

    #[test]
    fn registration_rejects_bad_specs() {
        let mut registry = registry();
        assert_eq!(
            registry.register(weak("flat", Size::new(3, 0))),
            Err(RegistryError::InvalidSize {
                spec: "flat".into(),
                width: 3,
                height: 0
            })
        );
        assert_eq!(
            registry.register(weak("x-card", Size::new(1, 1))),
            Err(RegistryError::DuplicateSpec("x-card".into()))
        );
        assert_eq!(
            registry.register(weak("default-card", Size::new(1, 1))),
            Err(RegistryError::DuplicateSpec("default-card".into()))
        );
        assert_eq!(
            registry.register(weak(" ", Size::new(1, 1))),
            Err(RegistryError::EmptyId)
        );
        let sized = weak("sized", Size::new(2, 2)).with_size("compact", Size::new(0, 1));
        assert!(matches!(
            registry.register(sized),
            Err(RegistryError::InvalidSize { width: 0, height: 1, .. })
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn named_sizes_are_exposed() {
        let spec = WidgetSpec::new("graph", Size::new(4, 2), Matcher::constant(MatchResult::WEAK))
            .with_size("compact", Size::new(2, 1))
            .with_size("large", Size::new(8, 4));
        assert_eq!(spec.size_named("compact"), Some(Size::new(2, 1)));
        assert_eq!(spec.size_named("huge"), None);
        assert_eq!(spec.footprint(), Footprint::new("graph", Size::new(4, 2)));
    }
}
