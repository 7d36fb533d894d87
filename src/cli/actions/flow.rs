//! Terminal front end for one authentication ceremony.
//!
//! Renders the current step, collects the step's submission, and feeds it
//! to the session controller until the ceremony finishes or settles in
//! the unsupported terminal. All flow decisions live in the engine; this
//! module only reads state and produces output.

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;
use std::io::{self, BufRead, Write};
use tracing::debug;

use crate::flow::{
    FlowKind, FlowSession, FlowState, FlowStep, IdentifyData, IdentifyOutput, OtpChallengeData,
    OtpOutput, OtpRequestData, PasswordOutput, StepOutput, StepState, Submission, TotpOutput,
    TotpSetupData,
};
use crate::transport::types::IdentificationKind;
use crate::transport::FlowClient;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[0-9]{4,15}$").expect("phone pattern compiles"));

#[derive(Debug)]
pub struct Args {
    pub endpoint: String,
    pub kind: FlowKind,
    pub redirect: String,
}

/// Drive the ceremony from the terminal until it terminates.
///
/// # Errors
/// Returns an error if the endpoint is invalid or the transport fails.
pub async fn execute(args: Args) -> Result<()> {
    let client = FlowClient::new(&args.endpoint).context("invalid --endpoint")?;
    let mut session = FlowSession::new(client, args.kind, args.redirect);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(output) = prompt(session.current(), &mut lines)? else {
            println!("Aborted.");
            return Ok(());
        };

        match session.submit(output).await? {
            Submission::Finished { redirect_uri } => {
                println!("Done. Continue at {redirect_uri}");
                return Ok(());
            }
            Submission::Continue => {
                if let Some(state) = session.current() {
                    if state.step() == FlowStep::Error {
                        if let StepState::Error(data) = &state.step {
                            debug!(message = ?data.message, "ceremony ended unsupported");
                        }
                        println!("Unsupported. Restart the ceremony to try again.");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Collect the submission for the current step. `None` means the input
/// stream ended.
fn prompt(
    state: Option<&FlowState>,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let Some(state) = state else {
        // No ceremony yet; both identifier kinds are offered until the
        // service says otherwise.
        return prompt_identify(
            IdentifyData {
                allow_email: true,
                allow_phone: true,
            },
            lines,
        );
    };

    match &state.step {
        StepState::Done | StepState::Error(_) => Ok(None),
        StepState::Login(offered) | StepState::Signup(offered) => {
            prompt_identify(*offered, lines)
        }
        StepState::LoginAuthenticateRequestOtpViaEmail(data)
        | StepState::LoginAuthenticateRequestOtpViaSms(data)
        | StepState::SignupAuthenticateRequestOtpViaEmail(data)
        | StepState::SignupAuthenticateRequestOtpViaSms(data) => prompt_otp_request(data, lines),
        StepState::LoginAuthenticateWithOtp(data) | StepState::SignupAuthenticateWithOtp(data) => {
            prompt_otp(data, lines)
        }
        StepState::LoginAuthenticateWithPassword(_) | StepState::SignupAuthenticateWithPassword => {
            prompt_password(lines)
        }
        StepState::LoginAuthenticateWithTotp => prompt_totp(lines),
        StepState::SignupAuthenticateRequestTotp => prompt_totp_setup_request(lines),
        StepState::SignupAuthenticateWithTotp(data) => prompt_totp_setup(data, lines),
    }
}

fn prompt_identify(
    offered: IdentifyData,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let mut use_phone = offered.allow_phone && !offered.allow_email;

    if offered.allow_email && offered.allow_phone {
        let Some(choice) = read_line(lines, "Identify with email or phone? [email] ")? else {
            return Ok(None);
        };
        use_phone = choice.trim().eq_ignore_ascii_case("phone");
    }

    loop {
        let label = if use_phone {
            "Phone number (+<country><number>): "
        } else {
            "Email: "
        };
        let Some(value) = read_line(lines, label)? else {
            return Ok(None);
        };
        let value = value.trim();

        let valid = if use_phone {
            PHONE_PATTERN.is_match(value)
        } else {
            EMAIL_PATTERN.is_match(value)
        };
        if valid {
            return Ok(Some(StepOutput::Identify(IdentifyOutput {
                kind: if use_phone {
                    IdentificationKind::Phone
                } else {
                    IdentificationKind::Email
                },
                value: value.to_string(),
            })));
        }
        println!("That does not look right, try again.");
    }
}

fn prompt_otp_request(
    data: &OtpRequestData,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let Some(_) = read_line(
        lines,
        &format!("Press Enter to send a code to {} ", data.display_name),
    )?
    else {
        return Ok(None);
    };
    Ok(Some(StepOutput::RequestOtp))
}

fn prompt_otp(
    data: &OtpChallengeData,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let wait = (data.can_resend_at - Utc::now()).num_seconds();
    if wait > 0 {
        println!(
            "Code sent to {}. Resend available in {wait}s.",
            data.display_name
        );
    } else {
        println!("Code sent to {}. Type r to resend.", data.display_name);
    }

    let Some(entry) = read_line(lines, "Code: ")? else {
        return Ok(None);
    };
    let entry = entry.trim();

    if entry.eq_ignore_ascii_case("r") || entry.eq_ignore_ascii_case("resend") {
        return Ok(Some(StepOutput::Otp(OtpOutput {
            resend: true,
            code: None,
        })));
    }
    Ok(Some(StepOutput::Otp(OtpOutput {
        resend: false,
        code: Some(entry.to_string()),
    })))
}

fn prompt_password(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let Some(password) = read_line(lines, "Password: ")? else {
        return Ok(None);
    };
    Ok(Some(StepOutput::Password(PasswordOutput {
        password: SecretString::from(password),
    })))
}

fn prompt_totp(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let Some(code) = read_line(lines, "Authenticator code: ")? else {
        return Ok(None);
    };
    Ok(Some(StepOutput::Totp(TotpOutput {
        code: code.trim().to_string(),
        display_name: None,
    })))
}

fn prompt_totp_setup_request(
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    let Some(_) = read_line(lines, "Press Enter to set up two-factor authentication ")? else {
        return Ok(None);
    };
    Ok(Some(StepOutput::RequestTotpSetup))
}

fn prompt_totp_setup(
    data: &TotpSetupData,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<Option<StepOutput>> {
    println!("Add this secret to your authenticator: {}", data.secret);

    let Some(display_name) = read_line(lines, "Device name: ")? else {
        return Ok(None);
    };
    let Some(code) = read_line(lines, "Authenticator code: ")? else {
        return Ok(None);
    };
    Ok(Some(StepOutput::Totp(TotpOutput {
        code: code.trim().to_string(),
        display_name: Some(display_name.trim().to_string()),
    })))
}

fn read_line(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    label: &str,
) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?)),
        None => Ok(None),
    }
}
