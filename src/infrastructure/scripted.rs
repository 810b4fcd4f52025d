use crate::domain::interaction::ContinuationData;
use crate::domain::payment::PaymentRequest;
use crate::domain::ports::{
    AuthorizationData, AuthorizationDataSource, GatewayClient, GatewayOutcome,
};
use crate::error::{GatewayError, PaymentError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A gateway that replays a fixed script of outcomes, in order.
///
/// Used by the demo binary and the integration tests. Also records every
/// continuation it receives so tests can assert what flowed back from
/// interaction steps.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<GatewayOutcome, GatewayError>>>,
    continuations: Mutex<Vec<ContinuationData>>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Result<GatewayOutcome, GatewayError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            continuations: Mutex::new(Vec::new()),
        }
    }

    pub fn received_continuations(&self) -> Vec<ContinuationData> {
        self.continuations.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> Result<GatewayOutcome, GatewayError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".to_string())))
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn submit(
        &self,
        _request: &PaymentRequest,
        _auth: &AuthorizationData,
    ) -> Result<GatewayOutcome, GatewayError> {
        self.next_outcome()
    }

    async fn continue_authorization(
        &self,
        continuation: &ContinuationData,
        _auth: &AuthorizationData,
    ) -> Result<GatewayOutcome, GatewayError> {
        self.continuations.lock().unwrap().push(continuation.clone());
        self.next_outcome()
    }
}

/// Authorization data source with fixed credentials.
pub struct StaticAuthorizationSource {
    data: AuthorizationData,
}

impl StaticAuthorizationSource {
    pub fn new(data: AuthorizationData) -> Self {
        Self { data }
    }
}

impl Default for StaticAuthorizationSource {
    fn default() -> Self {
        Self::new(AuthorizationData {
            merchant_pos_id: "demo-pos".to_string(),
            access_token: "demo-token".to_string(),
        })
    }
}

#[async_trait]
impl AuthorizationDataSource for StaticAuthorizationSource {
    async fn authorization_data(&self) -> Result<AuthorizationData, PaymentError> {
        Ok(self.data.clone())
    }
}
