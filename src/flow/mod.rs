//! The flow-execution engine.
//!
//! A ceremony progresses through a closed set of named steps
//! ([`FlowStep`]), each carrying its own payload ([`StepState`]) and
//! accepting its own submission ([`StepOutput`]). The executor table in
//! [`machine`] performs one transition per submission: it posts the
//! submission over the transport, normalizes the response's candidates or
//! schema branches ([`schema`]), and picks the next step from the current
//! step's legal target set. [`FlowSession`] owns the single in-progress
//! ceremony and decides continuation vs. finalization.

pub mod machine;
pub mod schema;

mod output;
mod session;
mod state;
mod step;

pub use output::{IdentifyOutput, OtpOutput, PasswordOutput, StepOutput, TotpOutput};
pub use session::{FlowSession, Submission};
pub use state::{
    ErrorData, FlowState, IdentifyData, OtpChallengeData, OtpRequestData, PasswordData, StepState,
    TotpSetupData,
};
pub use step::FlowStep;

use serde::{Deserialize, Serialize};

/// The two supported ceremony kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Login,
    Signup,
}

impl FlowKind {
    /// Wire-level flow reference type used at creation.
    #[must_use]
    pub fn reference_type(self) -> &'static str {
        match self {
            Self::Login => "login_flow",
            Self::Signup => "signup_flow",
        }
    }
}
