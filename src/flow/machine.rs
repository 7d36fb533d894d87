//! The executor table: one transition per submission.
//!
//! Dispatch is a total match over the current step, so every step has an
//! executor and every executor returns a state. Domain-level trouble (an
//! unrecognized mechanism, a rejected code, a submission that does not
//! fit the step) resolves to the `Error` terminal as data. Only
//! transport faults propagate as `Err`.
//!
//! When a response offers several mappable continuations, the first one
//! in server order wins, even when that first mapping is the `Error`
//! placeholder. One path per response is a deliberate simplification; a
//! later candidate never rescues an earlier unrecognized one.

use chrono::DateTime;
use tracing::debug;

use super::output::{IdentifyOutput, OtpOutput, PasswordOutput, StepOutput, TotpOutput};
use super::schema::{self, CandidateRef};
use super::state::{FlowState, OtpChallengeData, OtpRequestData, PasswordData, StepState, TotpSetupData};
use super::step::FlowStep;
use crate::transport::types::{AuthenticationMethod, FlowResponse};
use crate::transport::{FlowClient, TransportError};

/// Run the current step's executor against the submission and return the
/// next state. The result's step is always a member of the current
/// step's legal target set; anything else is clamped to `Error`.
///
/// # Errors
/// Returns an error only when the transport fails; every domain-level
/// outcome is a returned state.
pub async fn execute(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let current = state.step();
    let next = dispatch(client, state, output).await?;

    if !current.targets().contains(&next.step()) {
        debug!(from = ?current, to = ?next.step(), "transition outside the legal target set");
        return Ok(FlowState::error(Some("unsupported transition".to_string())));
    }

    Ok(next)
}

async fn dispatch(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    match &state.step {
        StepState::Done => Ok(FlowState::done()),
        StepState::Error(_) => Ok(FlowState::error(None)),
        StepState::Login(_) => login_identify(client, state, output).await,
        StepState::LoginAuthenticateRequestOtpViaEmail(data) => {
            let response = client.request_otp_email(&state.id, data.index).await?;
            Ok(FlowState::from_response(
                &response,
                StepState::LoginAuthenticateWithOtp(otp_challenge_data(&response)),
            ))
        }
        StepState::LoginAuthenticateRequestOtpViaSms(data) => {
            let response = client.request_otp_sms(&state.id, data.index).await?;
            Ok(FlowState::from_response(
                &response,
                StepState::LoginAuthenticateWithOtp(otp_challenge_data(&response)),
            ))
        }
        StepState::LoginAuthenticateWithOtp(_) => login_otp(client, state, output).await,
        StepState::LoginAuthenticateWithPassword(_) => login_password(client, state, output).await,
        StepState::LoginAuthenticateWithTotp => login_totp(client, state, output).await,
        StepState::Signup(_) => signup_identify(client, state, output).await,
        StepState::SignupAuthenticateRequestOtpViaEmail(data) => {
            let response = client.request_otp_email(&state.id, data.index).await?;
            Ok(FlowState::from_response(
                &response,
                StepState::SignupAuthenticateWithOtp(otp_challenge_data(&response)),
            ))
        }
        StepState::SignupAuthenticateRequestOtpViaSms(_) => {
            let response = client.request_otp_sms_setup(&state.id).await?;
            Ok(FlowState::from_response(
                &response,
                StepState::SignupAuthenticateWithOtp(otp_challenge_data(&response)),
            ))
        }
        StepState::SignupAuthenticateWithOtp(_) => signup_otp(client, state, output).await,
        StepState::SignupAuthenticateWithPassword => {
            signup_password(client, state, output).await
        }
        StepState::SignupAuthenticateRequestTotp => {
            let response = client.request_totp_setup(&state.id).await?;
            let secret = response.result.data.secret.clone().unwrap_or_default();
            Ok(FlowState::from_response(
                &response,
                StepState::SignupAuthenticateWithTotp(TotpSetupData { secret }),
            ))
        }
        StepState::SignupAuthenticateWithTotp(_) => signup_totp(client, state, output).await,
    }
}

async fn login_identify(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Identify(IdentifyOutput { kind, value }) = output else {
        return Ok(unexpected_output(FlowStep::Login));
    };
    let response = client.identify(&state.id, kind, &value).await?;
    let candidates = schema::from_candidates(response.result.data.candidates.as_deref());

    Ok(candidates.first().map_or_else(
        || FlowState::error(None),
        |candidate| login_candidate_state(&response, candidate),
    ))
}

fn login_candidate_state(response: &FlowResponse, candidate: &CandidateRef) -> FlowState {
    match candidate.mechanism {
        Some(AuthenticationMethod::PrimaryOobOtpEmail) => FlowState::from_response(
            response,
            StepState::LoginAuthenticateRequestOtpViaEmail(OtpRequestData {
                display_name: candidate.display_name.clone().unwrap_or_default(),
                index: candidate.index,
            }),
        ),
        Some(AuthenticationMethod::PrimaryOobOtpSms) => FlowState::from_response(
            response,
            StepState::LoginAuthenticateRequestOtpViaSms(OtpRequestData {
                display_name: candidate.display_name.clone().unwrap_or_default(),
                index: candidate.index,
            }),
        ),
        Some(AuthenticationMethod::PrimaryPassword) if candidate.count.unwrap_or(0) > 0 => {
            FlowState::from_response(
                response,
                StepState::LoginAuthenticateWithPassword(PasswordData {
                    index: candidate.index,
                }),
            )
        }
        _ => FlowState::error(None),
    }
}

async fn signup_identify(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Identify(IdentifyOutput { kind, value }) = output else {
        return Ok(unexpected_output(FlowStep::Signup));
    };
    let response = client.identify(&state.id, kind, &value).await?;
    let branches = schema::from_branches(&response.result.json_schema);

    Ok(branches.first().map_or_else(
        || FlowState::error(None),
        |branch| signup_branch_state(&response, branch, &value),
    ))
}

fn signup_branch_state(
    response: &FlowResponse,
    branch: &CandidateRef,
    login_id: &str,
) -> FlowState {
    match branch.mechanism {
        Some(AuthenticationMethod::PrimaryOobOtpEmail) => FlowState::from_response(
            response,
            StepState::SignupAuthenticateRequestOtpViaEmail(OtpRequestData {
                display_name: login_id.to_string(),
                index: branch.index,
            }),
        ),
        Some(AuthenticationMethod::PrimaryOobOtpSms) => FlowState::from_response(
            response,
            StepState::SignupAuthenticateRequestOtpViaSms(OtpRequestData {
                display_name: login_id.to_string(),
                index: branch.index,
            }),
        ),
        Some(AuthenticationMethod::PrimaryPassword) => {
            FlowState::from_response(response, StepState::SignupAuthenticateWithPassword)
        }
        _ => FlowState::error(None),
    }
}

async fn login_otp(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Otp(OtpOutput { resend, code }) = output else {
        return Ok(unexpected_output(FlowStep::LoginAuthenticateWithOtp));
    };

    if resend {
        let response = client.resend_otp(&state.id).await?;
        return Ok(FlowState::from_response(
            &response,
            StepState::LoginAuthenticateWithOtp(otp_challenge_data(&response)),
        ));
    }

    let Some(code) = code else {
        return Ok(FlowState::error(None));
    };
    let response = client.submit_otp(&state.id, &code).await?;
    let candidates = schema::from_candidates(response.result.data.candidates.as_deref());

    Ok(candidates.first().map_or_else(
        || FlowState::error(None),
        |candidate| match candidate.mechanism {
            Some(AuthenticationMethod::SecondaryTotp) => {
                FlowState::from_response(&response, StepState::LoginAuthenticateWithTotp)
            }
            _ => FlowState::error(None),
        },
    ))
}

async fn signup_otp(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Otp(OtpOutput { resend, code }) = output else {
        return Ok(unexpected_output(FlowStep::SignupAuthenticateWithOtp));
    };

    if resend {
        let response = client.resend_otp(&state.id).await?;
        return Ok(FlowState::from_response(
            &response,
            StepState::SignupAuthenticateWithOtp(otp_challenge_data(&response)),
        ));
    }

    let Some(code) = code else {
        return Ok(FlowState::error(None));
    };
    let response = client.submit_otp(&state.id, &code).await?;
    let branches = schema::from_branches(&response.result.json_schema);

    // Signup treats "nothing further offered" as success; login above
    // treats the same answer as unsupported.
    Ok(branches.first().map_or_else(FlowState::done, |branch| {
        match branch.mechanism {
            Some(AuthenticationMethod::SecondaryTotp) => {
                FlowState::from_response(&response, StepState::SignupAuthenticateRequestTotp)
            }
            _ => FlowState::error(None),
        }
    }))
}

async fn login_password(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Password(PasswordOutput { password }) = output else {
        return Ok(unexpected_output(FlowStep::LoginAuthenticateWithPassword));
    };
    let response = client.submit_password(&state.id, &password).await?;
    let candidates = schema::from_candidates(response.result.data.candidates.as_deref());

    Ok(candidates.first().map_or_else(
        || FlowState::error(None),
        |candidate| match candidate.mechanism {
            Some(AuthenticationMethod::SecondaryTotp) => {
                FlowState::from_response(&response, StepState::LoginAuthenticateWithTotp)
            }
            _ => FlowState::error(None),
        },
    ))
}

async fn signup_password(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Password(PasswordOutput { password }) = output else {
        return Ok(unexpected_output(FlowStep::SignupAuthenticateWithPassword));
    };
    let response = client.submit_new_password(&state.id, &password).await?;
    let branches = schema::from_branches(&response.result.json_schema);

    Ok(branches.first().map_or_else(FlowState::done, |branch| {
        match branch.mechanism {
            Some(AuthenticationMethod::SecondaryTotp) => {
                FlowState::from_response(&response, StepState::SignupAuthenticateRequestTotp)
            }
            _ => FlowState::error(None),
        }
    }))
}

async fn login_totp(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Totp(TotpOutput { code, .. }) = output else {
        return Ok(unexpected_output(FlowStep::LoginAuthenticateWithTotp));
    };
    let response = client.submit_totp(&state.id, &code).await?;

    // The error object on the envelope decides this step, not candidates.
    Ok(match response.error {
        Some(error) => FlowState::error(Some(error.message)),
        None => FlowState::done(),
    })
}

async fn signup_totp(
    client: &FlowClient,
    state: &FlowState,
    output: StepOutput,
) -> Result<FlowState, TransportError> {
    let StepOutput::Totp(TotpOutput { code, display_name }) = output else {
        return Ok(unexpected_output(FlowStep::SignupAuthenticateWithTotp));
    };
    let response = client
        .submit_totp_setup(&state.id, &code, display_name.as_deref().unwrap_or_default())
        .await?;

    Ok(match response.error {
        Some(error) => FlowState::error(Some(error.message)),
        None => FlowState::done(),
    })
}

fn otp_challenge_data(response: &FlowResponse) -> OtpChallengeData {
    OtpChallengeData {
        can_resend_at: response
            .result
            .data
            .can_resend_at
            .unwrap_or(DateTime::UNIX_EPOCH),
        display_name: response
            .result
            .data
            .masked_claim_value
            .clone()
            .unwrap_or_default(),
    }
}

fn unexpected_output(step: FlowStep) -> FlowState {
    debug!(?step, "submission does not fit the current step");
    FlowState::error(Some("unexpected submission for this step".to_string()))
}
