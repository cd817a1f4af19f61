//! Built-in card specs for the common device types.

use crate::error::RegistryError;
use crate::geometry::Size;
use crate::matching::entity::{
    custom, has_attribute_key, has_card_type, has_device_class, has_feature, has_id_prefix,
    has_manufacturer,
};
use crate::matching::{MatchResult, Matcher};
use crate::registry::{WidgetMeta, WidgetRegistry, WidgetSpec};

pub const LIGHT_CARD: &str = "light-card";
pub const THERMOSTAT_CARD: &str = "thermostat-card";
pub const DEFAULT_CARD: &str = "default-card";

/// Brightness support bit in `supported_features`.
pub const LIGHT_BRIGHTNESS_FEATURE: u64 = 4;

fn meta(name: &str, description: &str) -> WidgetMeta {
    WidgetMeta {
        name: name.to_string(),
        description: description.to_string(),
        author: "gridboard".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn light_card() -> WidgetSpec {
    let matcher = Matcher::any([
        has_card_type(LIGHT_CARD, None),
        has_id_prefix("light", None),
        has_device_class("light", None),
        has_feature(LIGHT_BRIGHTNESS_FEATURE, None),
        has_manufacturer("philips", None),
    ]);
    WidgetSpec::new(LIGHT_CARD, Size::new(2, 2), matcher)
        .with_meta(meta("Light", "On/off and brightness control"))
        .with_size("compact", Size::new(1, 1))
        .with_size("large", Size::new(4, 2))
}

pub fn thermostat_card() -> WidgetSpec {
    let temperatures = Matcher::all(
        ["current_temperature", "target_temp_high", "target_temp_low"]
            .into_iter()
            .map(|key| has_attribute_key(key, MatchResult::FEATURE)),
    );
    let matcher = Matcher::any([
        has_card_type(THERMOSTAT_CARD, None),
        has_id_prefix("climate.", None),
        temperatures,
        custom(
            |entity| entity.id().contains("temp") && entity.id().contains("control"),
            MatchResult::WEAK,
        ),
    ]);
    WidgetSpec::new(THERMOSTAT_CARD, Size::new(2, 4), matcher)
        .with_meta(meta("Thermostat", "Temperature readout and set points"))
}

/// Matches everything at the lowest priority.
pub fn default_card() -> WidgetSpec {
    WidgetSpec::new(DEFAULT_CARD, Size::new(2, 2), Matcher::constant(MatchResult::DEFAULT_CARD))
        .with_meta(meta("Device", "Generic state card"))
}

/// Registry holding every built-in card with [`default_card`] as fallback.
pub fn builtin_registry() -> Result<WidgetRegistry, RegistryError> {
    WidgetRegistry::new(default_card())?
        .with(light_card())?
        .with(thermostat_card())
}
