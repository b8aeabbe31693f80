//! Property-based tests for relay wire events

use proptest::prelude::*;
use relayhub::shared::{EventKind, MultiChannelMessage, RelayEvent};

proptest! {
    #[test]
    fn test_decode_never_panics(raw in ".*") {
        let _ = RelayEvent::decode(&raw);
    }

    #[test]
    fn test_unknown_events_are_other(event in "[a-z]{1,12}") {
        prop_assume!(!["subscribe", "join", "unsubscribe", "leave", "message", "ping"].contains(&event.as_str()));
        let kind = EventKind::parse(&event);
        prop_assert!(!kind.requires_channel());
        prop_assert_eq!(kind, EventKind::Other(event));
    }

    #[test]
    fn test_pong_only_replaces_payload(
        channel in "[a-z]{0,8}(:[0-9]{1,3})?",
        payload in ".*",
        uuid in "[a-f0-9]{0,8}",
    ) {
        let ping = RelayEvent::new("ping", channel.clone(), payload).with_uuid(uuid.clone());
        let pong = ping.pong("pong");
        prop_assert_eq!(pong.event, "ping");
        prop_assert_eq!(pong.channel, channel);
        prop_assert_eq!(pong.uuid, uuid);
        prop_assert_eq!(pong.payload, "pong");
    }

    #[test]
    fn test_for_channel_stamps_each_destination(
        channels in prop::collection::vec("[a-z]{1,6}:[0-9]{1,3}", 0..6),
        payload in ".*",
    ) {
        let message = MultiChannelMessage {
            event: "message".to_string(),
            channels: channels.clone(),
            payload: payload.clone(),
            err: "not forwarded".to_string(),
            ..MultiChannelMessage::default()
        };
        for channel in &channels {
            let event = message.for_channel(channel);
            prop_assert_eq!(&event.channel, channel);
            prop_assert_eq!(&event.payload, &payload);
            prop_assert!(event.err.is_empty());
        }
    }
}
