//! Relay integration tests

mod router_test;
