use super::interaction::{ChallengePayload, ContinuationData, CorrelationToken};
use super::payment::{PaymentRequest, PaymentRequestStatus};
use crate::error::{GatewayError, PaymentError};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub type GatewayClientHandle = Arc<dyn GatewayClient>;
pub type AuthorizationDataSourceHandle = Arc<dyn AuthorizationDataSource>;

/// Outcome of a gateway call. Closed set: a submission either reached a
/// terminal status or needs one of the two interaction kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    Terminal(PaymentRequestStatus),
    NeedsPresentController { payload: ChallengePayload },
    NeedsExternalRedirect { target: Url, token: CorrelationToken },
}

/// Credentials and merchant context required to authenticate gateway calls.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationData {
    pub merchant_pos_id: String,
    pub access_token: String,
}

/// The network collaborator performing the actual gateway calls.
///
/// Implementations own transport concerns entirely; the session only sees
/// the closed `GatewayOutcome` set or a `GatewayError`.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn submit(
        &self,
        request: &PaymentRequest,
        auth: &AuthorizationData,
    ) -> Result<GatewayOutcome, GatewayError>;

    async fn continue_authorization(
        &self,
        continuation: &ContinuationData,
        auth: &AuthorizationData,
    ) -> Result<GatewayOutcome, GatewayError>;
}

/// Supplies the credentials needed for gateway calls. Pure data provider.
#[async_trait]
pub trait AuthorizationDataSource: Send + Sync {
    async fn authorization_data(&self) -> Result<AuthorizationData, PaymentError>;
}
