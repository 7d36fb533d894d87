//! Wire payloads for the authentication flow API.
//!
//! Responses share one envelope: an optional error object plus a result
//! carrying the flow id, a data payload, and a JSON-schema-like
//! description of the acceptable next inputs. Deserialization is
//! deliberately tolerant (every field defaults) because the set of
//! populated fields varies per step and per service version, and a
//! missing field must settle the flow into a terminal state rather than
//! fail the call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ways the acting party can identify themselves to start a ceremony.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentificationKind {
    Email,
    Phone,
}

/// Authentication mechanisms the service can offer for a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMethod {
    PrimaryOobOtpEmail,
    PrimaryOobOtpSms,
    PrimaryPassword,
    SecondaryTotp,
}

impl AuthenticationMethod {
    /// Parse the wire discriminant; unknown mechanisms are `None`.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "primary_oob_otp_email" => Some(Self::PrimaryOobOtpEmail),
            "primary_oob_otp_sms" => Some(Self::PrimaryOobOtpSms),
            "primary_password" => Some(Self::PrimaryPassword),
            "secondary_totp" => Some(Self::SecondaryTotp),
            _ => None,
        }
    }
}

/// One server-offered way to satisfy the current step, tagged by its
/// authentication mechanism. Mechanisms this client does not understand
/// deserialize as [`Candidate::Unknown`] and keep their position in the
/// list.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "authentication", rename_all = "snake_case")]
pub enum Candidate {
    PrimaryOobOtpEmail {
        #[serde(default)]
        masked_display_name: String,
        #[serde(default)]
        channels: Vec<String>,
    },
    PrimaryOobOtpSms {
        #[serde(default)]
        masked_display_name: String,
        #[serde(default)]
        channels: Vec<String>,
    },
    PrimaryPassword {
        #[serde(default)]
        count: u32,
    },
    SecondaryTotp,
    #[serde(other)]
    Unknown,
}

/// Schema description of the acceptable next inputs: a list of
/// alternative branches, each pinned by constant-valued properties.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResponseSchema {
    #[serde(default, rename = "oneOf")]
    pub one_of: Vec<SchemaBranch>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchemaBranch {
    #[serde(default)]
    pub properties: HashMap<String, SchemaProperty>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SchemaProperty {
    #[serde(default, rename = "const")]
    pub constant: Option<serde_json::Value>,
}

/// Step-specific result payload. Which fields are populated depends on
/// the operation that produced the response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FlowData {
    #[serde(default)]
    pub finish_redirect_uri: Option<String>,
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub can_resend_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub masked_claim_value: Option<String>,
    #[serde(default)]
    pub code_length: Option<u32>,
    #[serde(default)]
    pub otp_form: Option<String>,
    #[serde(default)]
    pub failed_attempt_rate_limit_exceeded: Option<bool>,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FlowResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub data: FlowData,
    #[serde(default)]
    pub json_schema: ResponseSchema,
}

/// Error object the service attaches to failed operations.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub info: serde_json::Value,
}

/// Response envelope shared by every flow operation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FlowResponse {
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub result: FlowResult,
}

/// Request bodies. Execute operations wrap their input either as a
/// single `input` or as a `batch_input` sequence.
#[derive(Debug, Serialize)]
pub struct FlowReference {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CreateFlowRequest {
    pub bind_user_agent: bool,
    pub flow_reference: FlowReference,
}

#[derive(Debug, Serialize)]
pub struct InputBody<T: Serialize> {
    pub input: T,
}

#[derive(Debug, Serialize)]
pub struct BatchInputBody {
    pub batch_input: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct IdentifyInput<'a> {
    pub identification: IdentificationKind,
    pub login_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OtpRequestInput {
    pub authentication: AuthenticationMethod,
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct OtpRequestSmsInput {
    pub authentication: AuthenticationMethod,
    pub index: usize,
    pub channel: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OtpResendInput {
    pub authentication: AuthenticationMethod,
    pub resend: bool,
}

#[derive(Debug, Serialize)]
pub struct OtpCodeInput<'a> {
    pub code: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PasswordInput<'a> {
    pub authentication: AuthenticationMethod,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewPasswordInput<'a> {
    pub authentication: AuthenticationMethod,
    pub new_password: &'a str,
}

/// Selects a mechanism with no further arguments, e.g. asking the
/// service to begin TOTP enrollment.
#[derive(Debug, Serialize)]
pub struct AuthenticationSelectInput {
    pub authentication: AuthenticationMethod,
}

#[derive(Debug, Serialize)]
pub struct TotpInput<'a> {
    pub authentication: AuthenticationMethod,
    pub code: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TotpSetupInput<'a> {
    pub code: &'a str,
    pub display_name: &'a str,
}
