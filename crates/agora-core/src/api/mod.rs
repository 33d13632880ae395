//! Access to the upstream REST API and the local cloud proxy.
//!
//! - `transport`: the [`Transport`] trait and request/response types
//! - `http_client`: reqwest-backed transport with bounded concurrency
//! - `errors`: transport errors and status classification
//! - `outcome`: the tagged [`Outcome`] and its serializable [`Envelope`]
//! - `executor`: one request in, one [`Outcome`] out, with optional named cache slots
//! - `pagination`: sequential page walking for list endpoints

pub mod errors;
pub mod executor;
pub mod http_client;
pub mod outcome;
pub mod pagination;
pub mod transport;

pub use errors::{Failure, FailureKind, TransportError};
pub use executor::{json_body, Blob, RequestExecutor, RequestOptions};
pub use http_client::{HttpClient, HttpClientConfig};
pub use outcome::{Envelope, EnvelopeData, Outcome};
pub use pagination::{fetch_all, ListQuery, PAGE_SIZE};
pub use transport::{HttpRequest, HttpResponse, Method, Transport};
