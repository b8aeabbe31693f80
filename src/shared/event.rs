/**
 * Relay Wire Events
 *
 * This module defines the JSON envelopes exchanged over relay sockets and
 * published on the broker.
 *
 * # Inbound Frames
 *
 * Every socket frame decodes into a `RelayEvent`:
 *
 * ```json
 * {"event":"subscribe","channel":"location:1","payload":"","subject":"","uuid":""}
 * ```
 *
 * The `event` field selects the action; `subscribe`/`join` and
 * `unsubscribe`/`leave` are aliases of each other. `subject`, `uuid` and
 * `err` are correlation fields carried through untouched and omitted from
 * the encoded form when empty.
 *
 * # Outbound Frames
 *
 * Messages delivered by the broker are written to the socket as a
 * `BrokerMessage`, encoded with capitalised keys
 * (`{"Channel":..,"Pattern":..,"Payload":..}`) so existing clients keep
 * parsing them unchanged.
 */
use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;

/// Payload written back in response to a `ping` frame unless configured otherwise.
pub const PONG_PAYLOAD: &str = "pong";

/// Action requested by an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `subscribe` or `join`
    Subscribe,
    /// `unsubscribe` or `leave`
    Unsubscribe,
    /// `message`
    Message,
    /// `ping`
    Ping,
    /// Anything else; dropped by the router
    Other(String),
}

impl EventKind {
    /// Classify a raw `event` field value
    pub fn parse(event: &str) -> Self {
        match event {
            "subscribe" | "join" => Self::Subscribe,
            "unsubscribe" | "leave" => Self::Unsubscribe,
            "message" => Self::Message,
            "ping" => Self::Ping,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether frames of this kind must name a channel
    pub fn requires_channel(&self) -> bool {
        matches!(self, Self::Subscribe | Self::Unsubscribe | Self::Message)
    }
}

/// Decoded socket frame
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayEvent {
    /// Event name (`subscribe`, `join`, `unsubscribe`, `leave`, `message`, `ping`)
    #[serde(default)]
    pub event: String,
    /// Target broker channel
    #[serde(default)]
    pub channel: String,
    /// Opaque message body
    #[serde(default)]
    pub payload: String,
    /// Correlation subject
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// Sender correlation id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Error text, if any
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err: String,
}

impl RelayEvent {
    /// Create an event with the given name, channel and payload
    pub fn new(
        event: impl Into<String>,
        channel: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            channel: channel.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Decode a raw socket frame
    pub fn decode(raw: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Encode this event as a JSON string
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Classified event kind
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event)
    }

    /// Copy of this event with its payload replaced by `ack`
    pub fn pong(&self, ack: &str) -> Self {
        Self {
            payload: ack.to_string(),
            ..self.clone()
        }
    }

    /// Set the subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the sender correlation id
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }
}

/// Request body for fanning one message out to several channels
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultiChannelMessage {
    /// Event name stamped on every per-channel copy
    #[serde(default)]
    pub event: String,
    /// Destination channels, published in order
    #[serde(default)]
    pub channels: Vec<String>,
    /// Message body
    #[serde(default)]
    pub payload: String,
    /// Correlation subject
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// Sender correlation id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    /// Error text, not propagated to the per-channel copies
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err: String,
}

impl MultiChannelMessage {
    /// The copy of this message addressed to `channel`
    pub fn for_channel(&self, channel: &str) -> RelayEvent {
        RelayEvent {
            event: self.event.clone(),
            channel: channel.to_string(),
            payload: self.payload.clone(),
            subject: self.subject.clone(),
            uuid: self.uuid.clone(),
            err: String::new(),
        }
    }
}

/// Message delivered by the broker to a subscription
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BrokerMessage {
    /// Channel the message was published on
    pub channel: String,
    /// Pattern that matched, empty for plain channel subscriptions
    #[serde(default)]
    pub pattern: String,
    /// Published content, verbatim
    pub payload: String,
}

impl BrokerMessage {
    /// Create a message for a plain channel subscription
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            pattern: String::new(),
            payload: payload.into(),
        }
    }
}
