use crate::domain::interaction::{
    ChallengePayload, CorrelationToken, InteractionRequest, PresentationStyle,
};
use crate::domain::payment::PaymentRequestStatus;
use crate::domain::ports::GatewayOutcome;
use serde::Deserialize;
use url::Url;

/// Whether the host's rendering context already sits inside a navigation
/// hierarchy. Communicated once at service construction; `Standalone` is
/// the default when the host does not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationContext {
    InsideNavigation,
    #[default]
    Standalone,
}

/// Classification of a gateway outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Terminal(PaymentRequestStatus),
    Present {
        payload: ChallengePayload,
        style: PresentationStyle,
    },
    Redirect {
        target: Url,
        token: CorrelationToken,
    },
}

impl Classified {
    /// The interaction the host must perform, if any.
    pub fn interaction(&self) -> Option<InteractionRequest> {
        match self {
            Classified::Terminal(_) => None,
            Classified::Present { payload, style } => Some(InteractionRequest::PresentController {
                payload: payload.clone(),
                style: *style,
            }),
            Classified::Redirect { target, .. } => Some(InteractionRequest::ExternalRedirect {
                target: target.clone(),
            }),
        }
    }
}

/// Decides, from a gateway outcome, whether the transaction is terminal or
/// requires a further interaction step, and of which kind.
///
/// Pure and deterministic: the same outcome always classifies the same way.
/// Priority order: explicit terminal, then external redirect, then
/// in-process challenge.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionBroker {
    context: PresentationContext,
}

impl InteractionBroker {
    pub fn new(context: PresentationContext) -> Self {
        Self { context }
    }

    pub fn classify(&self, outcome: GatewayOutcome) -> Classified {
        match outcome {
            GatewayOutcome::Terminal(status) => Classified::Terminal(status),
            GatewayOutcome::NeedsExternalRedirect { target, token } => {
                Classified::Redirect { target, token }
            }
            GatewayOutcome::NeedsPresentController { payload } => Classified::Present {
                payload,
                style: self.style(),
            },
        }
    }

    fn style(&self) -> PresentationStyle {
        match self.context {
            PresentationContext::InsideNavigation => PresentationStyle::ModalOverNavigation,
            PresentationContext::Standalone => PresentationStyle::ModalStandalone,
        }
    }
}
