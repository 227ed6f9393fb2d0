//! Event receiver - wire payloads in, pipeline events out
//!
//! Readings arrive as JSON documents on a message-queue topic:
//!
//! ```json
//! {
//!     "locationId": "abc",
//!     "eventId": "5f64a2e0-...",
//!     "timestamp": 123456789,
//!     "value": 2.5
//! }
//! ```
//!
//! [`decode_event`] turns one payload into a [`plume_core::Event`].
//! `MqttReceiver` (feature `mqtt`) wraps a live subscription as a
//! non-blocking [`plume_core::stream::Stream`]: malformed payloads are
//! counted and skipped, never fatal - the next well-formed reading simply
//! comes through.

use serde::Deserialize;

use plume_core::events::{Event, EventId, LocationId};

use crate::ConnectorError;

/// Wire representation of one sensor reading
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventMessage {
    location_id: LocationId,
    event_id: EventId,
    timestamp: u64,
    value: f64,
}

/// Decode one wire payload into an event
///
/// Fails on invalid JSON, missing fields, or identifiers longer than
/// [`plume_core::events::MAX_ID_LEN`] bytes.
pub fn decode_event(payload: &[u8]) -> Result<Event, ConnectorError> {
    let message: EventMessage = serde_json::from_slice(payload)
        .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
    Ok(Event::from_parts(
        message.location_id,
        message.event_id,
        message.timestamp,
        message.value,
    ))
}

#[cfg(feature = "mqtt")]
pub use mqtt::MqttReceiver;

#[cfg(feature = "mqtt")]
mod mqtt {
    use std::time::Duration;

    use log::debug;
    use rumqttc::{Client, Connection, Event as MqttEvent, MqttOptions, Packet, QoS};

    use plume_core::{
        events::Event,
        stream::{Stream, StreamError},
    };

    use crate::{config::ReceiverConfig, ConnectorError};

    use super::decode_event;

    /// Live event source over an MQTT subscription
    ///
    /// Implements the core [`Stream`] trait: `poll_next` drains the
    /// connection's notification buffer, yields the next decodable
    /// reading, and reports `WouldBlock` while the buffer is empty. The
    /// pipeline pulls from it until its run window ends; dropping the
    /// receiver closes the subscription.
    pub struct MqttReceiver {
        connection: Connection,
        // Held so the session stays open for the lifetime of the receiver
        _client: Client,
        malformed: u64,
    }

    impl MqttReceiver {
        /// Connect and subscribe to the configured topic
        pub fn connect(config: &ReceiverConfig) -> Result<Self, ConnectorError> {
            let mut options = MqttOptions::new(
                config.client_id.clone(),
                config.broker_host.clone(),
                config.broker_port,
            );
            options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

            let (client, connection) = Client::new(options, 64);
            client
                .subscribe(config.topic.clone(), QoS::AtLeastOnce)
                .map_err(|e| ConnectorError::Transport(e.to_string()))?;

            Ok(Self {
                connection,
                _client: client,
                malformed: 0,
            })
        }

        /// Payloads skipped because they could not be decoded
        pub fn malformed_count(&self) -> u64 {
            self.malformed
        }
    }

    impl Stream for MqttReceiver {
        type Item = Event;
        type Error = StreamError<String>;

        fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
            loop {
                match self.connection.try_recv() {
                    Ok(Ok(MqttEvent::Incoming(Packet::Publish(publish)))) => {
                        match decode_event(&publish.payload) {
                            Ok(event) => return Ok(event),
                            Err(e) => {
                                // Bad payloads are the producer's problem;
                                // keep draining
                                debug!("ignoring malformed event payload: {e}");
                                self.malformed += 1;
                            }
                        }
                    }
                    // Pings, acks, connection bookkeeping
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        return Err(nb::Error::Other(StreamError::Transport(e.to_string())))
                    }
                    Err(_) => return Err(nb::Error::WouldBlock),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::events::MAX_ID_LEN;

    const VALID_MESSAGE: &str = r#"
    {
        "locationId": "abc",
        "eventId": "def",
        "timestamp": 123456789,
        "value": 2
    }
    "#;

    const INVALID_MESSAGE: &str = r#"{ "not": "valid" }"#;

    #[test]
    fn decodes_valid_message() {
        let event = decode_event(VALID_MESSAGE.as_bytes()).unwrap();
        assert_eq!(event, Event::new("abc", "def", 123456789, 2.0).unwrap());
    }

    #[test]
    fn rejects_invalid_message() {
        assert!(matches!(
            decode_event(INVALID_MESSAGE.as_bytes()),
            Err(ConnectorError::Malformed(_))
        ));
        assert!(matches!(
            decode_event(b"not json at all"),
            Err(ConnectorError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_oversized_identifier() {
        let long_id = "x".repeat(MAX_ID_LEN + 1);
        let payload = format!(
            r#"{{"locationId": "{long_id}", "eventId": "e", "timestamp": 1, "value": 1.0}}"#
        );
        assert!(matches!(
            decode_event(payload.as_bytes()),
            Err(ConnectorError::Malformed(_))
        ));
    }
}
