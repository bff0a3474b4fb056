//! Event stream codec
//!
//! Events carry absolute timestamps on the wire; only the type byte needs
//! validation on decode.

use crate::error::CodecError;
use crate::types::{Event, EventType};
use crate::wire::WireEvent;

#[derive(Debug, Default)]
pub struct EventSerializer;

impl EventSerializer {
    pub fn encode(events: &[Event]) -> Vec<WireEvent> {
        events
            .iter()
            .map(|event| WireEvent {
                timestamp_ms: event.timestamp_ms,
                event_type: event.event_type.wire_number(),
                value: event.value.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct EventDeserializer;

impl EventDeserializer {
    pub fn decode(wire_events: &[WireEvent]) -> Result<Vec<Event>, CodecError> {
        wire_events
            .iter()
            .map(|wire| {
                Ok(Event {
                    timestamp_ms: wire.timestamp_ms,
                    event_type: EventType::from_wire_number(wire.event_type)?,
                    value: wire.value.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modality;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_stream_roundtrip() {
        let events = vec![
            Event::lifecycle(1000, EventType::LifecycleStart),
            Event::modality_change(2500, Modality::Bus),
            Event::lifecycle(4000, EventType::LifecycleStop),
        ];
        let wire = EventSerializer::encode(&events);
        assert_eq!(wire[1].value.as_deref(), Some("BUS"));
        let decoded = EventDeserializer::decode(&wire).unwrap();
        assert_eq!(decoded, events);
    }

    #[test]
    fn test_unknown_event_type_is_a_format_error() {
        let wire = vec![WireEvent {
            timestamp_ms: 1000,
            event_type: 42,
            value: None,
        }];
        assert!(matches!(
            EventDeserializer::decode(&wire),
            Err(CodecError::UnknownEventType(42))
        ));
    }
}
