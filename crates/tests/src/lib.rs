//! Integration tests for the Agora client data layer.
//!
//! Every test drives the real reqwest transport against a local mockito server, so
//! status classification, bearer tokens and query strings are checked on the wire.
//!
//! - `executor_tests`: outcome classification and named cache slots
//! - `pagination_tests`: sequential page walking and limits
//! - `coalescing_tests`: concurrent fetches sharing one request
//! - `store_flow_tests`: event, user, friend and notification flows end to end
//! - `runtime_tests`: building an [`AgoraContext`](agora_core::AgoraContext) from config
//! - `mock_infrastructure`: the [`ApiMockBuilder`](mock_infrastructure::ApiMockBuilder) and fixtures
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```

pub mod mock_infrastructure;

#[cfg(test)]
mod coalescing_tests;
#[cfg(test)]
mod executor_tests;
#[cfg(test)]
mod pagination_tests;
#[cfg(test)]
mod runtime_tests;
#[cfg(test)]
mod store_flow_tests;
