//! HTTP transport for the authentication flow API.
//!
//! One POST per operation: flow creation plus the per-step execute calls.
//! The service reports domain failures (a rejected code, a bad password)
//! inside the response body, so the client parses the envelope no matter
//! what the HTTP status was and leaves the interpretation to the flow
//! engine. Only connectivity and body-decoding problems become
//! [`TransportError`] faults.

mod client;
mod error;
pub mod types;

pub use client::FlowClient;
pub use error::TransportError;
