//! Core validated types.

mod endpoint_url;

pub use endpoint_url::EndpointUrl;
