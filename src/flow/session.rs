//! Ownership of one in-progress ceremony.
//!
//! The session holds at most one current [`FlowState`]. Submissions go
//! through [`FlowSession::submit`], which creates the remote flow on
//! first use, runs the current step's executor, and either stores the
//! next state or finalizes with a redirect target. The `&mut self`
//! receiver is the single-writer discipline: a second submission cannot
//! start until the first resolves, and presentation code only reads the
//! latest state via [`FlowSession::current`].

use tracing::debug;

use super::machine;
use super::output::StepOutput;
use super::schema;
use super::state::{FlowState, StepState};
use super::FlowKind;
use crate::transport::{FlowClient, TransportError};

/// Outcome of one submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Submission {
    /// The ceremony continues; the session holds the next step's state.
    Continue,
    /// The ceremony finished; no further steps are possible.
    Finished { redirect_uri: String },
}

/// Owns the single in-progress ceremony for one acting party.
pub struct FlowSession {
    client: FlowClient,
    kind: FlowKind,
    default_redirect: String,
    state: Option<FlowState>,
}

impl FlowSession {
    #[must_use]
    pub fn new(client: FlowClient, kind: FlowKind, default_redirect: impl Into<String>) -> Self {
        Self {
            client,
            kind,
            default_redirect: default_redirect.into(),
            state: None,
        }
    }

    /// The latest published state, or `None` before the first submission
    /// and after finalization or reset.
    #[must_use]
    pub fn current(&self) -> Option<&FlowState> {
        self.state.as_ref()
    }

    /// Rehydrate a state captured from an earlier serialization, e.g. a
    /// navigation entry.
    pub fn restore(&mut self, state: FlowState) {
        self.state = Some(state);
    }

    /// Submit the current step's output, creating the remote flow first
    /// if none exists yet. A transport fault leaves the prior state in
    /// place.
    ///
    /// # Errors
    /// Returns an error if flow creation or the step execution fails at
    /// the transport level.
    pub async fn submit(&mut self, output: StepOutput) -> Result<Submission, TransportError> {
        let current = match &self.state {
            Some(state) => state.clone(),
            None => self.create().await?,
        };

        let next = machine::execute(&self.client, &current, output).await?;
        debug!(step = ?next.step(), finished = next.finished, "flow transition");

        if next.finished {
            self.state = None;
            let redirect_uri = next
                .finish_redirect_uri
                .unwrap_or_else(|| self.default_redirect.clone());
            return Ok(Submission::Finished { redirect_uri });
        }

        self.state = Some(next);
        Ok(Submission::Continue)
    }

    /// Drop the in-progress ceremony unconditionally. Used when the
    /// acting party edits an already-submitted identifying value: the
    /// remote flow instance is stale from that point on.
    pub fn reset(&mut self) {
        self.state = None;
    }

    async fn create(&self) -> Result<FlowState, TransportError> {
        let response = self.client.create_flow(self.kind, "").await?;
        let offered = schema::identification_kinds(&response.result.json_schema);
        let step = match self.kind {
            FlowKind::Login => StepState::Login(offered),
            FlowKind::Signup => StepState::Signup(offered),
        };
        debug!(id = %response.result.id, kind = ?self.kind, "flow created");

        Ok(FlowState {
            id: response.result.id.clone(),
            finished: false,
            finish_redirect_uri: None,
            step,
        })
    }
}
