//! API integration tests
//!
//! Drive the full router through `tower::ServiceExt::oneshot`.

mod publish_test;
