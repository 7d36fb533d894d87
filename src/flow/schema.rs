//! Candidate normalization.
//!
//! The service describes the acceptable next inputs in two shapes: a
//! `candidates` array on the data payload (login) and a `oneOf` list of
//! constant-pinned schema branches (signup). Both normalize here into one
//! ordered sequence so the executors can pattern-match on concrete data
//! instead of walking raw wire structures. Order is preserved exactly as
//! the server listed it; missing or empty lists normalize to an empty
//! sequence, never a failure.

use serde_json::Value;

use super::state::IdentifyData;
use crate::transport::types::{AuthenticationMethod, Candidate, ResponseSchema};

/// A normalized reference to one server-offered continuation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CandidateRef {
    /// The mechanism, or `None` when the server offered something this
    /// client does not understand.
    pub mechanism: Option<AuthenticationMethod>,
    /// Candidate index the follow-up request must name.
    pub index: usize,
    /// Masked destination (candidate arrays only).
    pub display_name: Option<String>,
    /// Configured authenticator count (password candidates only).
    pub count: Option<u32>,
}

/// Normalize a login-style candidate array. The index is positional.
#[must_use]
pub fn from_candidates(candidates: Option<&[Candidate]>) -> Vec<CandidateRef> {
    candidates
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, candidate)| match candidate {
            Candidate::PrimaryOobOtpEmail {
                masked_display_name,
                ..
            } => CandidateRef {
                mechanism: Some(AuthenticationMethod::PrimaryOobOtpEmail),
                index,
                display_name: Some(masked_display_name.clone()),
                count: None,
            },
            Candidate::PrimaryOobOtpSms {
                masked_display_name,
                ..
            } => CandidateRef {
                mechanism: Some(AuthenticationMethod::PrimaryOobOtpSms),
                index,
                display_name: Some(masked_display_name.clone()),
                count: None,
            },
            Candidate::PrimaryPassword { count } => CandidateRef {
                mechanism: Some(AuthenticationMethod::PrimaryPassword),
                index,
                display_name: None,
                count: Some(*count),
            },
            Candidate::SecondaryTotp => CandidateRef {
                mechanism: Some(AuthenticationMethod::SecondaryTotp),
                index,
                display_name: None,
                count: None,
            },
            Candidate::Unknown => CandidateRef {
                mechanism: None,
                index,
                display_name: None,
                count: None,
            },
        })
        .collect()
}

/// Normalize signup-style `oneOf` branches. The mechanism comes from the
/// `authentication` constant, the index from the `index` constant
/// (defaulting to 0).
#[must_use]
pub fn from_branches(schema: &ResponseSchema) -> Vec<CandidateRef> {
    schema
        .one_of
        .iter()
        .map(|branch| {
            let mechanism = branch
                .properties
                .get("authentication")
                .and_then(|property| property.constant.as_ref())
                .and_then(Value::as_str)
                .and_then(AuthenticationMethod::from_wire);
            let index = branch
                .properties
                .get("index")
                .and_then(|property| property.constant.as_ref())
                .and_then(constant_as_index)
                .unwrap_or(0);
            CandidateRef {
                mechanism,
                index,
                display_name: None,
                count: None,
            }
        })
        .collect()
}

/// Which identification kinds a creation response's schema offers.
#[must_use]
pub fn identification_kinds(schema: &ResponseSchema) -> IdentifyData {
    let mut offered = IdentifyData::default();
    for branch in &schema.one_of {
        match branch
            .properties
            .get("identification")
            .and_then(|property| property.constant.as_ref())
            .and_then(Value::as_str)
        {
            Some("email") => offered.allow_email = true,
            Some("phone") => offered.allow_phone = true,
            _ => {}
        }
    }
    offered
}

// Index constants arrive as numbers from some deployments and as strings
// from others.
fn constant_as_index(value: &Value) -> Option<usize> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|raw| raw.parse().ok()))
        .and_then(|index| usize::try_from(index).ok())
}
