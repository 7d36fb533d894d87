use thiserror::Error;

/// Infrastructure-level transport failures.
///
/// Domain-level outcomes (wrong code, unsupported mechanism) are not
/// errors at this layer; they travel inside the response envelope.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint URL: {0}")]
    Endpoint(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}
