use std::collections::BTreeMap;
use std::sync::mpsc::Sender;

use serde_json::json;

use crate::entity::EntityId;
use crate::geometry::Position;
use crate::logging::{LogLevel, Logger, RUNTIME_TARGET, event_with_fields, json_kv, json_str};

use super::LayoutObserver;

/// Logs committed moves and layout changes.
pub struct LoggingObserver {
    logger: Logger,
    level: LogLevel,
    log_positions: bool,
}

impl LoggingObserver {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Info,
            log_positions: false,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Include the full id -> position map in `layout_changed` events.
    pub fn log_positions(mut self, enabled: bool) -> Self {
        self.log_positions = enabled;
        self
    }

    fn emit(&self, message: &str, fields: impl IntoIterator<Item = (String, serde_json::Value)>) {
        let event = event_with_fields(self.level, RUNTIME_TARGET, message, fields);
        let _ = self.logger.log_event(event);
    }
}

impl LayoutObserver for LoggingObserver {
    fn name(&self) -> &str {
        "diagnostics.logging_observer"
    }

    fn on_item_moved(&mut self, id: &str, position: Position) {
        self.emit(
            "item_moved",
            [
                json_str("id", id),
                json_kv("x", position.x),
                json_kv("y", position.y),
            ],
        );
    }

    fn on_layout_changed(&mut self, positions: &BTreeMap<EntityId, Position>) {
        let mut fields = vec![json_kv("items", positions.len())];
        if self.log_positions {
            let map: serde_json::Map<String, serde_json::Value> = positions
                .iter()
                .map(|(id, pos)| (id.clone(), json!([pos.x, pos.y])))
                .collect();
            fields.push(json_kv("positions", serde_json::Value::Object(map)));
        }
        self.emit("layout_changed", fields);
    }
}

/// Observer callbacks as plain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutNotification {
    ItemMoved { id: EntityId, position: Position },
    LayoutChanged(BTreeMap<EntityId, Position>),
}

/// Forwards notifications over a channel, e.g. to a persistence thread.
/// A disconnected receiver is ignored.
pub struct ChannelObserver {
    sender: Sender<LayoutNotification>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<LayoutNotification>) -> Self {
        Self { sender }
    }
}

impl LayoutObserver for ChannelObserver {
    fn name(&self) -> &str {
        "diagnostics.channel_observer"
    }

    fn on_item_moved(&mut self, id: &str, position: Position) {
        let _ = self.sender.send(LayoutNotification::ItemMoved {
            id: id.to_string(),
            position,
        });
    }

    fn on_layout_changed(&mut self, positions: &BTreeMap<EntityId, Position>) {
        let _ = self
            .sender
            .send(LayoutNotification::LayoutChanged(positions.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use std::sync::mpsc;

    #[test]
    fn logging_observer_writes_structured_events() {
        let sink = MemorySink::new();
        let mut observer = LoggingObserver::new(Logger::new(sink.clone())).log_positions(true);

        observer.on_item_moved("light.desk", Position::new(3, 0));
        let mut positions = BTreeMap::new();
        positions.insert("light.desk".to_string(), Position::new(3, 0));
        observer.on_layout_changed(&positions);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "item_moved");
        assert_eq!(events[0].field("x"), Some(&json!(3)));
        assert_eq!(events[1].field("items"), Some(&json!(1)));
        assert_eq!(
            events[1].field("positions"),
            Some(&json!({ "light.desk": [3, 0] }))
        );
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let mut observer = ChannelObserver::new(tx);
        observer.on_item_moved("a", Position::new(1, 1));
        assert_eq!(
            rx.recv().unwrap(),
            LayoutNotification::ItemMoved {
                id: "a".into(),
                position: Position::new(1, 1)
            }
        );
        drop(rx);
        observer.on_layout_changed(&BTreeMap::new());
    }
}
