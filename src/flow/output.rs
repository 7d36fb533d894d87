//! Per-step submissions.
//!
//! Each step accepts exactly one output shape; the executors fall back to
//! the `Error` terminal when handed anything else. Passwords stay wrapped
//! in [`SecretString`] until the transport serializes them.

use secrecy::SecretString;

use crate::transport::types::IdentificationKind;

/// Identify-step submission: which kind of identifier and its value.
#[derive(Clone, Debug)]
pub struct IdentifyOutput {
    pub kind: IdentificationKind,
    pub value: String,
}

/// OTP-challenge submission. `resend` wins over `code`; a submission with
/// neither resolves to the `Error` terminal.
#[derive(Clone, Debug, Default)]
pub struct OtpOutput {
    pub resend: bool,
    pub code: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PasswordOutput {
    pub password: SecretString,
}

/// TOTP submission. `display_name` labels the enrolled device and is only
/// meaningful during signup.
#[derive(Clone, Debug)]
pub struct TotpOutput {
    pub code: String,
    pub display_name: Option<String>,
}

/// The submissions the executors accept, one variant per output shape.
#[derive(Clone, Debug)]
pub enum StepOutput {
    /// Nothing to say; accepted by steps that act on stored state alone.
    None,
    Identify(IdentifyOutput),
    RequestOtp,
    Otp(OtpOutput),
    Password(PasswordOutput),
    RequestTotpSetup,
    Totp(TotpOutput),
}
