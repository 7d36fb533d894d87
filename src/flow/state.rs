//! Ceremony state snapshots.
//!
//! A [`FlowState`] is plain data: the flow id the service assigned, the
//! terminal flags, and the current step with the payload that step needs
//! to render and act. It round-trips through serialization unchanged so a
//! caller can stash it in navigation state and rehydrate it later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::step::FlowStep;
use crate::transport::types::FlowResponse;

/// Which identification kinds the service offered at creation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdentifyData {
    pub allow_email: bool,
    pub allow_phone: bool,
}

/// Payload for the "send me a code" steps: where the code would go and
/// which candidate index selects that destination.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OtpRequestData {
    pub display_name: String,
    pub index: usize,
}

/// Payload while a delivered code is pending entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OtpChallengeData {
    pub can_resend_at: DateTime<Utc>,
    pub display_name: String,
}

/// Payload for the login password step.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PasswordData {
    pub index: usize,
}

/// Payload for TOTP enrollment: the server-issued shared secret.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TotpSetupData {
    pub secret: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The current step and its payload. The payload shape is fixed by the
/// step: no step can carry another step's data.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "data", rename_all = "snake_case")]
pub enum StepState {
    Done,
    Error(ErrorData),
    Login(IdentifyData),
    LoginAuthenticateRequestOtpViaEmail(OtpRequestData),
    LoginAuthenticateRequestOtpViaSms(OtpRequestData),
    LoginAuthenticateWithOtp(OtpChallengeData),
    LoginAuthenticateWithPassword(PasswordData),
    LoginAuthenticateWithTotp,
    Signup(IdentifyData),
    SignupAuthenticateRequestOtpViaEmail(OtpRequestData),
    SignupAuthenticateRequestOtpViaSms(OtpRequestData),
    SignupAuthenticateWithOtp(OtpChallengeData),
    SignupAuthenticateWithPassword,
    SignupAuthenticateRequestTotp,
    SignupAuthenticateWithTotp(TotpSetupData),
}

impl StepState {
    #[must_use]
    pub fn step(&self) -> FlowStep {
        match self {
            Self::Done => FlowStep::Done,
            Self::Error(_) => FlowStep::Error,
            Self::Login(_) => FlowStep::Login,
            Self::LoginAuthenticateRequestOtpViaEmail(_) => {
                FlowStep::LoginAuthenticateRequestOtpViaEmail
            }
            Self::LoginAuthenticateRequestOtpViaSms(_) => {
                FlowStep::LoginAuthenticateRequestOtpViaSms
            }
            Self::LoginAuthenticateWithOtp(_) => FlowStep::LoginAuthenticateWithOtp,
            Self::LoginAuthenticateWithPassword(_) => FlowStep::LoginAuthenticateWithPassword,
            Self::LoginAuthenticateWithTotp => FlowStep::LoginAuthenticateWithTotp,
            Self::Signup(_) => FlowStep::Signup,
            Self::SignupAuthenticateRequestOtpViaEmail(_) => {
                FlowStep::SignupAuthenticateRequestOtpViaEmail
            }
            Self::SignupAuthenticateRequestOtpViaSms(_) => {
                FlowStep::SignupAuthenticateRequestOtpViaSms
            }
            Self::SignupAuthenticateWithOtp(_) => FlowStep::SignupAuthenticateWithOtp,
            Self::SignupAuthenticateWithPassword => FlowStep::SignupAuthenticateWithPassword,
            Self::SignupAuthenticateRequestTotp => FlowStep::SignupAuthenticateRequestTotp,
            Self::SignupAuthenticateWithTotp(_) => FlowStep::SignupAuthenticateWithTotp,
        }
    }
}

/// One point-in-time snapshot of an authentication ceremony.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    /// Opaque flow identifier assigned by the service at creation.
    pub id: String,
    /// True only on terminal success.
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_redirect_uri: Option<String>,
    #[serde(flatten)]
    pub step: StepState,
}

impl FlowState {
    /// Project a transport response onto the given next step.
    pub(crate) fn from_response(response: &FlowResponse, step: StepState) -> Self {
        Self {
            id: response.result.id.clone(),
            finished: response.result.finished,
            finish_redirect_uri: response.result.data.finish_redirect_uri.clone(),
            step,
        }
    }

    /// Synthesized terminal success, produced without a transport call.
    #[must_use]
    pub fn done() -> Self {
        Self {
            id: String::new(),
            finished: true,
            finish_redirect_uri: None,
            step: StepState::Done,
        }
    }

    /// Synthesized terminal failure, produced without a transport call.
    #[must_use]
    pub fn error(message: Option<String>) -> Self {
        Self {
            id: String::new(),
            finished: false,
            finish_redirect_uri: None,
            step: StepState::Error(ErrorData { message }),
        }
    }

    #[must_use]
    pub fn step(&self) -> FlowStep {
        self.step.step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roundtrip(state: &FlowState) -> FlowState {
        let json = serde_json::to_string(state).expect("serialize");
        serde_json::from_str(&json).expect("deserialize")
    }

    #[test]
    fn identify_state_roundtrips() {
        let state = FlowState {
            id: "flow-1".to_string(),
            finished: false,
            finish_redirect_uri: None,
            step: StepState::Signup(IdentifyData {
                allow_email: true,
                allow_phone: false,
            }),
        };
        assert_eq!(roundtrip(&state), state);
    }

    #[test]
    fn otp_challenge_state_roundtrips_with_timestamp() {
        let state = FlowState {
            id: "flow-2".to_string(),
            finished: false,
            finish_redirect_uri: None,
            step: StepState::LoginAuthenticateWithOtp(OtpChallengeData {
                can_resend_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
                display_name: "a***@b.com".to_string(),
            }),
        };
        let restored = roundtrip(&state);
        assert_eq!(restored, state);
        assert_eq!(restored.step(), FlowStep::LoginAuthenticateWithOtp);
    }

    #[test]
    fn totp_setup_state_roundtrips() {
        let state = FlowState {
            id: "flow-3".to_string(),
            finished: false,
            finish_redirect_uri: None,
            step: StepState::SignupAuthenticateWithTotp(TotpSetupData {
                secret: "JBSWY3DPEHPK3PXP".to_string(),
            }),
        };
        assert_eq!(roundtrip(&state), state);
    }

    #[test]
    fn unit_step_states_roundtrip() {
        let state = FlowState {
            id: String::new(),
            finished: false,
            finish_redirect_uri: None,
            step: StepState::LoginAuthenticateWithTotp,
        };
        assert_eq!(roundtrip(&state), state);
    }

    #[test]
    fn terminal_constructors_set_flags() {
        let done = FlowState::done();
        assert!(done.finished);
        assert_eq!(done.step(), FlowStep::Done);
        assert_eq!(done.id, "");

        let error = FlowState::error(Some("unsupported".to_string()));
        assert!(!error.finished);
        assert_eq!(error.step(), FlowStep::Error);
    }

    #[test]
    fn from_response_projects_envelope_fields() {
        let response: FlowResponse = serde_json::from_value(serde_json::json!({
            "result": {
                "id": "flow-9",
                "finished": true,
                "data": {"finish_redirect_uri": "https://app.example.com/home"},
                "json_schema": {"type": "object"}
            }
        }))
        .expect("envelope");

        let state = FlowState::from_response(&response, StepState::Done);
        assert_eq!(state.id, "flow-9");
        assert!(state.finished);
        assert_eq!(
            state.finish_redirect_uri.as_deref(),
            Some("https://app.example.com/home")
        );
    }
}
