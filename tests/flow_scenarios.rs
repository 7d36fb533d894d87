//! End-to-end ceremony scenarios against a mock identity service.

use serde_json::json;
use std::net::TcpListener;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ensaluto::flow::{
    machine, FlowKind, FlowSession, FlowState, FlowStep, IdentifyOutput, OtpChallengeData,
    OtpOutput, PasswordOutput, StepOutput, StepState, Submission, TotpOutput, TotpSetupData,
};
use ensaluto::transport::types::IdentificationKind;
use ensaluto::transport::FlowClient;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn identify_output(value: &str) -> StepOutput {
    StepOutput::Identify(IdentifyOutput {
        kind: IdentificationKind::Email,
        value: value.to_string(),
    })
}

fn state(id: &str, step: StepState) -> FlowState {
    FlowState {
        id: id.to_string(),
        finished: false,
        finish_redirect_uri: None,
        step,
    }
}

async fn client(server: &MockServer) -> FlowClient {
    FlowClient::new(&server.uri()).expect("client")
}

#[tokio::test]
async fn signup_identify_offers_email_otp_with_typed_address() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-1",
                "data": {},
                "json_schema": {
                    "type": "object",
                    "oneOf": [{"properties": {"identification": {"const": "email"}}}]
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-1"))
        .and(body_partial_json(json!({"input": {"login_id": "a@b.com"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-1",
                "data": {},
                "json_schema": {
                    "type": "object",
                    "oneOf": [
                        {"properties": {"authentication": {"const": "primary_oob_otp_email"}, "index": {"const": 0}}}
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let mut session = FlowSession::new(client(&server).await, FlowKind::Signup, "/done");
    let outcome = session
        .submit(identify_output("a@b.com"))
        .await
        .expect("submission");

    assert_eq!(outcome, Submission::Continue);
    let current = session.current().expect("state");
    assert_eq!(
        current.step(),
        FlowStep::SignupAuthenticateRequestOtpViaEmail
    );
    match &current.step {
        StepState::SignupAuthenticateRequestOtpViaEmail(data) => {
            assert_eq!(data.display_name, "a@b.com");
            assert_eq!(data.index, 0);
        }
        other => panic!("unexpected step state: {other:?}"),
    }
}

#[tokio::test]
async fn login_identify_takes_the_first_candidate_in_server_order() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/login-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "login-1",
                "data": {"candidates": [
                    {"authentication": "primary_oob_otp_email", "masked_display_name": "a***@b.com"},
                    {"authentication": "primary_oob_otp_sms", "masked_display_name": "+852****1234"}
                ]},
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let current = state("login-1", StepState::Login(Default::default()));
    let next = machine::execute(&flow_client, &current, identify_output("a@b.com"))
        .await
        .expect("execute");

    assert_eq!(next.step(), FlowStep::LoginAuthenticateRequestOtpViaEmail);
}

#[tokio::test]
async fn login_identify_does_not_rescue_an_unrecognized_first_candidate() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/login-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "login-1",
                "data": {"candidates": [
                    {"authentication": "recovery_code"},
                    {"authentication": "primary_oob_otp_email", "masked_display_name": "a***@b.com"}
                ]},
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let current = state("login-1", StepState::Login(Default::default()));
    let next = machine::execute(&flow_client, &current, identify_output("a@b.com"))
        .await
        .expect("execute");

    assert_eq!(next.step(), FlowStep::Error);
}

#[tokio::test]
async fn resend_never_consumes_the_code_and_refreshes_the_deadline() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    // Exact body match: the resend request must not carry a code.
    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/login-1"))
        .and(body_json(json!({
            "input": {"authentication": "primary_oob_otp_email", "resend": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "login-1",
                "data": {
                    "can_resend_at": "2024-05-01T10:05:00Z",
                    "masked_claim_value": "a***@b.com"
                },
                "json_schema": {"type": "object"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let current = state(
        "login-1",
        StepState::LoginAuthenticateWithOtp(OtpChallengeData {
            can_resend_at: chrono::DateTime::UNIX_EPOCH,
            display_name: "a***@b.com".to_string(),
        }),
    );
    let output = StepOutput::Otp(OtpOutput {
        resend: true,
        code: Some("123456".to_string()),
    });
    let next = machine::execute(&flow_client, &current, output)
        .await
        .expect("execute");

    assert_eq!(next.step(), FlowStep::LoginAuthenticateWithOtp);
    match &next.step {
        StepState::LoginAuthenticateWithOtp(data) => {
            assert_eq!(data.can_resend_at.timestamp(), 1_714_557_900);
        }
        other => panic!("unexpected step state: {other:?}"),
    }
}

#[tokio::test]
async fn login_wrong_password_without_candidates_is_an_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/login-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "login-1",
                "data": {"candidates": []},
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let current = state(
        "login-1",
        StepState::LoginAuthenticateWithPassword(Default::default()),
    );
    let output = StepOutput::Password(PasswordOutput {
        password: secrecy::SecretString::from("wrong".to_string()),
    });
    let next = machine::execute(&flow_client, &current, output)
        .await
        .expect("execute");

    assert_eq!(next.step(), FlowStep::Error);
    assert!(!next.finished);
}

#[tokio::test]
async fn otp_success_without_second_factor_splits_login_and_signup() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    // No candidates and no schema branches after the code is accepted.
    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/flow-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"id": "flow-1", "data": {}, "json_schema": {"type": "object"}}
        })))
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let challenge = OtpChallengeData {
        can_resend_at: chrono::DateTime::UNIX_EPOCH,
        display_name: "a***@b.com".to_string(),
    };
    let code = StepOutput::Otp(OtpOutput {
        resend: false,
        code: Some("123456".to_string()),
    });

    // Login insists on a second factor being offered.
    let current = state(
        "flow-1",
        StepState::LoginAuthenticateWithOtp(challenge.clone()),
    );
    let next = machine::execute(&flow_client, &current, code.clone())
        .await
        .expect("execute");
    assert_eq!(next.step(), FlowStep::Error);

    // Signup treats the same answer as completion.
    let current = state(
        "flow-1",
        StepState::SignupAuthenticateWithOtp(challenge),
    );
    let next = machine::execute(&flow_client, &current, code)
        .await
        .expect("execute");
    assert_eq!(next.step(), FlowStep::Done);
    assert!(next.finished);
}

#[tokio::test]
async fn signup_totp_confirmation_finishes_the_ceremony() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-1"))
        .and(body_json(json!({
            "input": {"code": "123456", "display_name": "phone"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"id": "signup-1", "data": {}, "json_schema": {"type": "object"}}
        })))
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let current = state(
        "signup-1",
        StepState::SignupAuthenticateWithTotp(TotpSetupData {
            secret: "JBSWY3DPEHPK3PXP".to_string(),
        }),
    );
    let output = StepOutput::Totp(TotpOutput {
        code: "123456".to_string(),
        display_name: Some("phone".to_string()),
    });
    let next = machine::execute(&flow_client, &current, output)
        .await
        .expect("execute");

    assert_eq!(next.step(), FlowStep::Done);
    assert!(next.finished);
}

#[tokio::test]
async fn rejected_totp_code_settles_in_the_error_terminal() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/login-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "invalid code", "reason": "InvalidCredentials"},
            "result": {"id": "login-1", "data": {}, "json_schema": {"type": "object"}}
        })))
        .mount(&server)
        .await;

    let flow_client = client(&server).await;
    let current = state("login-1", StepState::LoginAuthenticateWithTotp);
    let output = StepOutput::Totp(TotpOutput {
        code: "000000".to_string(),
        display_name: None,
    });
    let next = machine::execute(&flow_client, &current, output)
        .await
        .expect("a rejected code is data, not a fault");

    assert_eq!(next.step(), FlowStep::Error);
    assert!(!next.finished);
}

#[tokio::test]
async fn full_signup_over_email_reaches_the_server_redirect() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-9",
                "data": {},
                "json_schema": {
                    "type": "object",
                    "oneOf": [{"properties": {"identification": {"const": "email"}}}]
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-9"))
        .and(body_partial_json(json!({"input": {"login_id": "a@b.com"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-9",
                "data": {},
                "json_schema": {
                    "type": "object",
                    "oneOf": [
                        {"properties": {"authentication": {"const": "primary_oob_otp_email"}, "index": {"const": 0}}}
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-9"))
        .and(body_partial_json(
            json!({"input": {"authentication": "primary_oob_otp_email", "index": 0}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-9",
                "data": {
                    "can_resend_at": "2024-05-01T10:00:00Z",
                    "masked_claim_value": "a***@b.com"
                },
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-9"))
        .and(body_partial_json(json!({"input": {"code": "111111"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-9",
                "data": {},
                "json_schema": {
                    "type": "object",
                    "oneOf": [{"properties": {"authentication": {"const": "secondary_totp"}}}]
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-9"))
        .and(body_partial_json(
            json!({"input": {"authentication": "secondary_totp"}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-9",
                "data": {"secret": "JBSWY3DPEHPK3PXP"},
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/signup-9"))
        .and(body_partial_json(json!({"input": {"display_name": "phone"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "signup-9",
                "finished": true,
                "data": {"finish_redirect_uri": "https://app.example.com/welcome"},
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    let mut session = FlowSession::new(client(&server).await, FlowKind::Signup, "/done");

    assert_eq!(
        session.submit(identify_output("a@b.com")).await.expect("identify"),
        Submission::Continue
    );
    assert_eq!(
        session
            .current()
            .map(ensaluto::flow::FlowState::step),
        Some(FlowStep::SignupAuthenticateRequestOtpViaEmail)
    );

    assert_eq!(
        session.submit(StepOutput::RequestOtp).await.expect("request otp"),
        Submission::Continue
    );
    assert_eq!(
        session.current().map(ensaluto::flow::FlowState::step),
        Some(FlowStep::SignupAuthenticateWithOtp)
    );

    assert_eq!(
        session
            .submit(StepOutput::Otp(OtpOutput {
                resend: false,
                code: Some("111111".to_string()),
            }))
            .await
            .expect("submit otp"),
        Submission::Continue
    );
    assert_eq!(
        session.current().map(ensaluto::flow::FlowState::step),
        Some(FlowStep::SignupAuthenticateRequestTotp)
    );

    assert_eq!(
        session
            .submit(StepOutput::RequestTotpSetup)
            .await
            .expect("request totp setup"),
        Submission::Continue
    );
    match session.current().map(|s| &s.step) {
        Some(StepState::SignupAuthenticateWithTotp(data)) => {
            assert_eq!(data.secret, "JBSWY3DPEHPK3PXP");
        }
        other => panic!("unexpected step state: {other:?}"),
    }

    let outcome = session
        .submit(StepOutput::Totp(TotpOutput {
            code: "222222".to_string(),
            display_name: Some("phone".to_string()),
        }))
        .await
        .expect("confirm totp");

    assert_eq!(
        outcome,
        Submission::Finished {
            redirect_uri: "https://app.example.com/welcome".to_string()
        }
    );
    assert!(session.current().is_none());
}

#[tokio::test]
async fn serialized_states_rehydrate_into_a_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/authentication_flows/login-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "login-5",
                "data": {
                    "can_resend_at": "2024-05-01T10:00:00Z",
                    "masked_claim_value": "a***@b.com"
                },
                "json_schema": {"type": "object"}
            }
        })))
        .mount(&server)
        .await;

    let stored = state(
        "login-5",
        StepState::LoginAuthenticateRequestOtpViaEmail(ensaluto::flow::OtpRequestData {
            display_name: "a***@b.com".to_string(),
            index: 0,
        }),
    );
    let snapshot = serde_json::to_string(&stored).expect("serialize");
    let restored: FlowState = serde_json::from_str(&snapshot).expect("deserialize");
    assert_eq!(restored, stored);

    let mut session = FlowSession::new(client(&server).await, FlowKind::Login, "/done");
    session.restore(restored);

    assert_eq!(
        session.submit(StepOutput::RequestOtp).await.expect("request otp"),
        Submission::Continue
    );
    assert_eq!(
        session.current().map(ensaluto::flow::FlowState::step),
        Some(FlowStep::LoginAuthenticateWithOtp)
    );
}
