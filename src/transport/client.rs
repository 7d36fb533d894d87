use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info_span, Instrument};
use url::Url;

use super::error::TransportError;
use super::types::{
    AuthenticationMethod, AuthenticationSelectInput, BatchInputBody, CreateFlowRequest,
    FlowReference, FlowResponse, IdentificationKind, IdentifyInput, InputBody, NewPasswordInput,
    OtpCodeInput, OtpRequestInput, OtpRequestSmsInput, OtpResendInput, PasswordInput, TotpInput,
    TotpSetupInput,
};
use crate::flow::FlowKind;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const FLOWS_PATH: &str = "/api/v1/authentication_flows";

/// Client for the authentication flow API. One POST per operation; the
/// response envelope is parsed regardless of HTTP status because the
/// service reports step failures in the body.
#[derive(Clone, Debug)]
pub struct FlowClient {
    http: Client,
    base_url: String,
}

impl FlowClient {
    /// Build a client for the given service base URL.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be parsed, has no host, or uses
    /// a scheme other than http/https.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let url =
            Url::parse(base_url).map_err(|err| TransportError::Endpoint(err.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::Endpoint(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        if url.host().is_none() {
            return Err(TransportError::Endpoint("no host specified".to_string()));
        }

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        url: String,
        body: &T,
    ) -> Result<FlowResponse, TransportError> {
        let span = info_span!(
            "flow.execute",
            operation,
            http.method = "POST",
            url = %url
        );
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .instrument(span)
            .await?;

        response
            .json::<FlowResponse>()
            .await
            .map_err(TransportError::Decode)
    }

    fn step_url(&self, flow_id: &str) -> String {
        format!("{}{}/{}", self.base_url, FLOWS_PATH, flow_id)
    }

    /// Create a new flow of the given kind. `query` is an opaque query
    /// string forwarded verbatim to the creation endpoint (empty for
    /// none).
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn create_flow(
        &self,
        kind: FlowKind,
        query: &str,
    ) -> Result<FlowResponse, TransportError> {
        let url = format!("{}{}{}", self.base_url, FLOWS_PATH, query);
        let body = CreateFlowRequest {
            bind_user_agent: false,
            flow_reference: FlowReference {
                kind: kind.reference_type(),
                id: "default",
            },
        };
        self.post("create", url, &body).await
    }

    /// Submit the identifying value (email address or phone number).
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn identify(
        &self,
        flow_id: &str,
        kind: IdentificationKind,
        login_id: &str,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: IdentifyInput {
                identification: kind,
                login_id,
            },
        };
        self.post("identify", self.step_url(flow_id), &body).await
    }

    /// Ask the service to deliver a one-time code over email.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn request_otp_email(
        &self,
        flow_id: &str,
        index: usize,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: OtpRequestInput {
                authentication: AuthenticationMethod::PrimaryOobOtpEmail,
                index,
            },
        };
        self.post("request_otp_email", self.step_url(flow_id), &body)
            .await
    }

    /// Ask the service to deliver a one-time code over SMS for an
    /// existing account (the candidate index picks the phone number).
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn request_otp_sms(
        &self,
        flow_id: &str,
        index: usize,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: OtpRequestSmsInput {
                authentication: AuthenticationMethod::PrimaryOobOtpSms,
                index,
                channel: "sms",
            },
        };
        self.post("request_otp_sms", self.step_url(flow_id), &body)
            .await
    }

    /// Ask the service to deliver a one-time code over SMS during signup.
    /// The mechanism and the channel are two separate inputs on the wire,
    /// sent as one batch.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn request_otp_sms_setup(
        &self,
        flow_id: &str,
    ) -> Result<FlowResponse, TransportError> {
        let body = BatchInputBody {
            batch_input: vec![
                json!({"authentication": "primary_oob_otp_sms"}),
                json!({"channel": "sms"}),
            ],
        };
        self.post("request_otp_sms_setup", self.step_url(flow_id), &body)
            .await
    }

    /// Ask for the pending one-time code to be re-delivered.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn resend_otp(&self, flow_id: &str) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: OtpResendInput {
                authentication: AuthenticationMethod::PrimaryOobOtpEmail,
                resend: true,
            },
        };
        self.post("resend_otp", self.step_url(flow_id), &body).await
    }

    /// Submit a received one-time code.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn submit_otp(
        &self,
        flow_id: &str,
        code: &str,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: OtpCodeInput { code },
        };
        self.post("submit_otp", self.step_url(flow_id), &body).await
    }

    /// Submit the account password during login.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn submit_password(
        &self,
        flow_id: &str,
        password: &SecretString,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: PasswordInput {
                authentication: AuthenticationMethod::PrimaryPassword,
                password: password.expose_secret(),
            },
        };
        self.post("submit_password", self.step_url(flow_id), &body)
            .await
    }

    /// Submit the password chosen during signup.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn submit_new_password(
        &self,
        flow_id: &str,
        password: &SecretString,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: NewPasswordInput {
                authentication: AuthenticationMethod::PrimaryPassword,
                new_password: password.expose_secret(),
            },
        };
        self.post("submit_new_password", self.step_url(flow_id), &body)
            .await
    }

    /// Begin TOTP enrollment; the response carries the shared secret.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn request_totp_setup(
        &self,
        flow_id: &str,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: AuthenticationSelectInput {
                authentication: AuthenticationMethod::SecondaryTotp,
            },
        };
        self.post("request_totp_setup", self.step_url(flow_id), &body)
            .await
    }

    /// Submit a TOTP code as the second login factor.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn submit_totp(
        &self,
        flow_id: &str,
        code: &str,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: TotpInput {
                authentication: AuthenticationMethod::SecondaryTotp,
                code,
            },
        };
        self.post("submit_totp", self.step_url(flow_id), &body)
            .await
    }

    /// Confirm TOTP enrollment with a code and a device label.
    ///
    /// # Errors
    /// Returns an error if the request or response decoding fails.
    pub async fn submit_totp_setup(
        &self,
        flow_id: &str,
        code: &str,
        display_name: &str,
    ) -> Result<FlowResponse, TransportError> {
        let body = InputBody {
            input: TotpSetupInput { code, display_name },
        };
        self.post("submit_totp_setup", self.step_url(flow_id), &body)
            .await
    }
}
