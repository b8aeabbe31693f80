//! Property-based tests for the connection channel set
//!
//! After any sequence of subscribe/unsubscribe operations the connection's
//! channel list matches a plain list model, and the single live broker
//! subscription covers exactly that list.

use std::sync::Arc;

use proptest::prelude::*;
use relayhub::backend::realtime::Connection;

use crate::common::{RecordingBroker, RecordingSink};

#[derive(Debug, Clone)]
enum Op {
    Subscribe(String),
    Unsubscribe(String),
}

fn op() -> impl Strategy<Value = Op> {
    let channel = prop::sample::select(vec!["guest:1", "guest:2", "location:1", "location:2"]);
    prop_oneof![
        channel.clone().prop_map(|c| Op::Subscribe(c.to_string())),
        channel.prop_map(|c| Op::Unsubscribe(c.to_string())),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_subscription_matches_channel_model(ops in prop::collection::vec(op(), 0..20)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let broker = RecordingBroker::new();
            let sink = RecordingSink::new();
            let mut connection = Connection::connect(&broker, "prop", Arc::new(sink)).await.unwrap();
            let mut model: Vec<String> = Vec::new();

            for op in &ops {
                match op {
                    Op::Subscribe(channel) => {
                        connection.subscribe(&broker, channel).await.unwrap();
                        model.push(channel.clone());
                    }
                    Op::Unsubscribe(channel) => {
                        connection.unsubscribe(&broker, channel).await.unwrap();
                        if let Some(index) = model.iter().position(|c| c == channel) {
                            model.remove(index);
                        }
                    }
                }
                assert_eq!(connection.channels(), model.as_slice());
                assert_eq!(broker.memory().active_subscriptions(), vec![model.clone()]);
            }

            assert_eq!(broker.subscribe_calls(), ops.len() + 1);
            assert_eq!(broker.unsubscribe_calls(), ops.len());

            connection.disconnect().await.unwrap();
            assert_eq!(broker.unsubscribe_calls(), ops.len() + 1);
            assert_eq!(broker.close_calls(), ops.len() + 1);
            assert_eq!(broker.memory().subscription_count(), 0);
        });
    }
}
