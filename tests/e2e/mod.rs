//! End-to-end tests over real sockets

mod relay_suite;
