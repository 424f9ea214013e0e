//! MQTT client for remote settings and audio spectra
//!
//! Subscribes to a topic and forwards JSON payloads to the main loop.
//! `{"spectrum": [..]}` carries frequency bins for the audio reactor;
//! any other object is merged into the live settings.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "reactink";
const CLIENT_ID: &str = "reactink";

/// A decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteMessage {
    /// Frequency magnitudes, one byte per bin
    Spectrum(Vec<u8>),
    /// Partial settings object
    Patch(serde_json::Value),
}

#[derive(Deserialize)]
struct SpectrumMessage {
    spectrum: Vec<f64>,
}

/// Decode one payload. Non-object JSON and plain text are rejected.
pub fn parse_payload(text: &str) -> Option<RemoteMessage> {
    let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    if value.get("spectrum").is_some() {
        let msg: SpectrumMessage = serde_json::from_value(value).ok()?;
        let bins = msg
            .spectrum
            .into_iter()
            .map(|v| if v.is_finite() { v.round().clamp(0.0, 255.0) as u8 } else { 0 })
            .collect();
        return Some(RemoteMessage::Spectrum(bins));
    }
    Some(RemoteMessage::Patch(value))
}

/// MQTT client that receives messages in a background thread
pub struct MqttClient {
    receiver: Receiver<RemoteMessage>,
    _thread: thread::JoinHandle<()>,
}

impl MqttClient {
    /// Create a new MQTT client and connect to the broker.
    /// Fails immediately if connection cannot be established.
    pub fn new(host: &str, topic: &str) -> Result<Self, String> {
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let topic = if topic.is_empty() { DEFAULT_TOPIC } else { topic };

        let mut options = MqttOptions::new(CLIENT_ID, host, DEFAULT_PORT);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);

        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| format!("Failed to subscribe to topic '{}': {}", topic, e))?;

        // Fail fast if the broker is unreachable
        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(e)) => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - {}",
                    host, DEFAULT_PORT, e
                ));
            },
            None => {
                return Err(format!(
                    "Failed to connect to MQTT broker at {}:{} - connection closed",
                    host, DEFAULT_PORT
                ));
            },
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();

        let handle = thread::spawn(move || {
            Self::message_loop(connection, sender, &topic_owned);
        });

        info!("mqtt connected to {}:{}, subscribed to '{}'", host, DEFAULT_PORT, topic);

        Ok(Self {
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: rumqttc::Connection, sender: Sender<RemoteMessage>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    let Ok(text) = std::str::from_utf8(&publish.payload) else {
                        debug!("mqtt payload is not utf-8, ignored");
                        continue;
                    };
                    match parse_payload(text) {
                        Some(msg) => {
                            if sender.send(msg).is_err() {
                                // Main thread gone
                                break;
                            }
                        },
                        None => debug!("mqtt payload is not a JSON object, ignored"),
                    }
                },
                Ok(_) => {},
                Err(e) => {
                    // rumqttc reconnects on the next iteration
                    warn!("mqtt error: {}", e);
                    thread::sleep(Duration::from_secs(1));
                },
            }
        }
    }

    /// Drain pending messages (non-blocking), oldest first.
    pub fn poll(&self) -> Vec<RemoteMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    pub fn default_host() -> &'static str {
        DEFAULT_HOST
    }

    pub fn default_topic() -> &'static str {
        DEFAULT_TOPIC
    }
}
