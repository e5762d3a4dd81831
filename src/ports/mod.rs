pub mod http_client;

pub use http_client::{HttpClientError, HttpClientResult, UpstreamClient, UpstreamResponse};
