#![allow(dead_code)]

use payflow::application::service::PaymentService;
use payflow::application::session::{SessionConfig, SessionEvent, SessionHandle};
use payflow::domain::interaction::{ChallengePayload, CorrelationToken};
use payflow::domain::payment::{Amount, Currency, PaymentRequest, PaymentRequestStatus};
use payflow::domain::ports::GatewayOutcome;
use payflow::error::{GatewayError, PaymentError};
use payflow::infrastructure::scripted::{ScriptedGateway, StaticAuthorizationSource};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use url::Url;

pub type GatewayCall = Result<GatewayOutcome, GatewayError>;

pub fn sample_request() -> PaymentRequest {
    PaymentRequest {
        order_reference: "ORDER-1".to_string(),
        amount: Amount::new(dec!(12.50)).unwrap(),
        currency: Currency::new("PLN").unwrap(),
        method_reference: "card-1234".to_string(),
        merchant_description: Some("integration test order".to_string()),
    }
}

pub fn success() -> GatewayCall {
    Ok(GatewayOutcome::Terminal(PaymentRequestStatus::Success))
}

pub fn challenge() -> GatewayCall {
    Ok(GatewayOutcome::NeedsPresentController {
        payload: ChallengePayload {
            body: json!({"form": "cvv"}),
        },
    })
}

pub fn redirect(token: &str) -> GatewayCall {
    Ok(GatewayOutcome::NeedsExternalRedirect {
        target: "https://bank.example/3ds".parse().unwrap(),
        token: CorrelationToken::new(token),
    })
}

pub fn transport_error() -> GatewayCall {
    Err(GatewayError::Transport("connection reset".to_string()))
}

pub fn rejected() -> GatewayCall {
    Err(GatewayError::Rejected("card blocked".to_string()))
}

pub fn build_service(script: Vec<GatewayCall>) -> (PaymentService, Arc<ScriptedGateway>) {
    build_service_with_config(script, SessionConfig::default())
}

pub fn build_service_with_config(
    script: Vec<GatewayCall>,
    config: SessionConfig,
) -> (PaymentService, Arc<ScriptedGateway>) {
    let gateway = Arc::new(ScriptedGateway::new(script));
    let service = PaymentService::with_config(
        gateway.clone(),
        Arc::new(StaticAuthorizationSource::default()),
        config,
    );
    (service, gateway)
}

pub fn callback_url(token: &str) -> Url {
    format!("merchantapp://payments/return?token={token}&authStatus=ok")
        .parse()
        .unwrap()
}

/// Drains events until the terminal one.
pub async fn wait_for_completion(
    handle: &mut SessionHandle,
) -> (PaymentRequestStatus, Option<PaymentError>) {
    while let Some(event) = handle.next_event().await {
        if let SessionEvent::Completed { status, error } = event {
            return (status, error);
        }
    }
    panic!("session ended without a terminal event");
}
