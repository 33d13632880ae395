//! Mock infrastructure for exercising the client against a real HTTP server.
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{event_json, ApiMockBuilder};
//!
//! let mut mock = ApiMockBuilder::new().await;
//! mock.mock_json("GET", "/v2/events/e1", 200, &event_json("e1", 3)).await;
//!
//! let context = mock.context(Some("token"));
//! ```

pub mod api_mock;
pub mod test_helpers;

pub use api_mock::ApiMockBuilder;
pub use test_helpers::*;
