//! # Ensaluto (Authentication Flow Client)
//!
//! `ensaluto` drives multi-step login and signup ceremonies against an
//! identity service that announces each step dynamically: every response
//! carries either a list of authentication candidates or a schema of
//! acceptable next inputs, and the client decides the next step from it.
//!
//! ## Flow engine
//!
//! The engine is a closed state machine. Each step of the ceremony is a
//! named [`flow::FlowStep`] with its own payload and its own expected
//! submission; transitions happen by posting the submission to the service
//! and mapping the response onto one of the step's legal successors. Two
//! terminal steps, `Done` and `Error`, are reachable from every step, so
//! an unrecognized server answer can always settle into a terminal state
//! instead of stranding the ceremony.
//!
//! - **Branch selection:** when a response offers several viable
//!   mechanisms, the first one in server order is taken. One path per
//!   response is a deliberate simplification.
//! - **Failure model:** rejected codes, unsupported mechanisms, and
//!   missing candidates resolve to the `Error` terminal as data. Only
//!   connectivity and malformed-body failures surface as
//!   [`transport::TransportError`].
//!
//! ## Layout
//!
//! - [`flow`]: steps, states, executors, schema interpretation, and the
//!   session controller owning one in-progress ceremony.
//! - [`transport`]: typed wire payloads and the HTTP client for the
//!   `/api/v1/authentication_flows` API.
//! - [`cli`]: command-line front end that renders each step in the
//!   terminal.

pub mod cli;
pub mod flow;
pub mod transport;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
