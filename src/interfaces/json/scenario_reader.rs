use crate::domain::interaction::{ChallengePayload, CorrelationToken};
use crate::domain::payment::{PaymentRequest, PaymentRequestStatus};
use crate::domain::ports::GatewayOutcome;
use crate::error::GatewayError;
use serde::Deserialize;
use std::io::Read;
use url::Url;

/// A demo scenario: one payment request plus the ordered gateway outcomes
/// a scripted gateway should replay for it.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub request: PaymentRequest,
    pub outcomes: Vec<ScenarioOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Success,
    Retry,
    Failure,
    TransportError { message: String },
    Rejected { message: String },
    PresentForm { body: serde_json::Value },
    Redirect { target: Url, token: String },
}

impl ScenarioOutcome {
    fn into_gateway_call(self) -> Result<GatewayOutcome, GatewayError> {
        match self {
            ScenarioOutcome::Success => {
                Ok(GatewayOutcome::Terminal(PaymentRequestStatus::Success))
            }
            ScenarioOutcome::Retry => Ok(GatewayOutcome::Terminal(PaymentRequestStatus::Retry)),
            ScenarioOutcome::Failure => {
                Ok(GatewayOutcome::Terminal(PaymentRequestStatus::Failure))
            }
            ScenarioOutcome::TransportError { message } => Err(GatewayError::Transport(message)),
            ScenarioOutcome::Rejected { message } => Err(GatewayError::Rejected(message)),
            ScenarioOutcome::PresentForm { body } => Ok(GatewayOutcome::NeedsPresentController {
                payload: ChallengePayload { body },
            }),
            ScenarioOutcome::Redirect { target, token } => {
                Ok(GatewayOutcome::NeedsExternalRedirect {
                    target,
                    token: CorrelationToken::new(token),
                })
            }
        }
    }
}

impl Scenario {
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    /// The outcomes as the script a `ScriptedGateway` replays.
    pub fn gateway_script(&self) -> Vec<Result<GatewayOutcome, GatewayError>> {
        self.outcomes
            .iter()
            .cloned()
            .map(ScenarioOutcome::into_gateway_call)
            .collect()
    }

    /// Redirect tokens in scenario order, for simulating the external
    /// application's return callbacks.
    pub fn redirect_tokens(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ScenarioOutcome::Redirect { token, .. } => Some(token.clone()),
                _ => None,
            })
            .collect()
    }
}
