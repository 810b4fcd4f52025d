mod common;

use common::*;
use payflow::application::session::SessionEvent;
use payflow::domain::interaction::{CorrelationToken, InteractionRequest};
use payflow::domain::payment::PaymentRequestStatus;
use payflow::error::PaymentError;
use std::time::Duration;
use url::Url;

#[tokio::test]
async fn test_external_redirect_round_trip() {
    let (service, gateway) = build_service(vec![redirect("t-1"), success()]);
    let mut handle = service.submit(sample_request()).await;

    match handle.next_event().await {
        Some(SessionEvent::Interaction(InteractionRequest::ExternalRedirect { target })) => {
            assert_eq!(target.as_str(), "https://bank.example/3ds");
        }
        other => panic!("expected an external redirect, got {other:?}"),
    }

    assert!(service.handle_external_callback(&callback_url("t-1")));

    let (status, error) = wait_for_completion(&mut handle).await;
    assert_eq!(status, PaymentRequestStatus::Success);
    assert!(error.is_none());

    // The continuation carried the token and the parsed query fields.
    let continuations = gateway.received_continuations();
    assert_eq!(continuations.len(), 1);
    assert_eq!(
        continuations[0].token,
        Some(CorrelationToken::new("t-1"))
    );
    assert_eq!(
        continuations[0].fields.get("authStatus").map(String::as_str),
        Some("ok")
    );
}

#[tokio::test]
async fn test_unrelated_url_is_not_consumed() {
    let (service, _gateway) = build_service(vec![redirect("t-1"), success()]);
    let mut handle = service.submit(sample_request()).await;
    assert!(matches!(
        handle.next_event().await,
        Some(SessionEvent::Interaction(_))
    ));

    let unrelated: Url = "merchantapp://share?item=42".parse().unwrap();
    assert!(!service.handle_external_callback(&unrelated));

    let wrong_token = callback_url("someone-elses-token");
    assert!(!service.handle_external_callback(&wrong_token));

    // The session is still resolvable afterwards.
    assert!(service.handle_external_callback(&callback_url("t-1")));
    let (status, _) = wait_for_completion(&mut handle).await;
    assert_eq!(status, PaymentRequestStatus::Success);
}

#[tokio::test]
async fn test_token_is_matched_at_most_once() {
    let (service, _gateway) = build_service(vec![redirect("t-1"), success()]);
    let mut handle = service.submit(sample_request()).await;
    assert!(matches!(
        handle.next_event().await,
        Some(SessionEvent::Interaction(_))
    ));

    assert!(service.handle_external_callback(&callback_url("t-1")));
    assert!(!service.handle_external_callback(&callback_url("t-1")));

    let (status, _) = wait_for_completion(&mut handle).await;
    assert_eq!(status, PaymentRequestStatus::Success);
}

#[tokio::test]
async fn test_concurrent_sessions_never_cross_match() {
    let (service, _gateway) = build_service(vec![
        redirect("t-a"),
        redirect("t-b"),
        success(),
        success(),
    ]);

    let mut session_a = service.submit(sample_request()).await;
    assert!(matches!(
        session_a.next_event().await,
        Some(SessionEvent::Interaction(InteractionRequest::ExternalRedirect { .. }))
    ));

    let mut session_b = service.submit(sample_request()).await;
    assert!(matches!(
        session_b.next_event().await,
        Some(SessionEvent::Interaction(InteractionRequest::ExternalRedirect { .. }))
    ));

    // Firing B's callback must resolve B and leave A untouched.
    assert!(service.handle_external_callback(&callback_url("t-b")));
    let (status, _) = wait_for_completion(&mut session_b).await;
    assert_eq!(status, PaymentRequestStatus::Success);

    let still_pending =
        tokio::time::timeout(Duration::from_millis(50), session_a.next_event()).await;
    assert!(still_pending.is_err(), "session A must not have resolved");

    assert!(service.handle_external_callback(&callback_url("t-a")));
    let (status, _) = wait_for_completion(&mut session_a).await;
    assert_eq!(status, PaymentRequestStatus::Success);
}

#[tokio::test]
async fn test_stale_callback_after_cancellation_is_unhandled() {
    let (service, _gateway) = build_service(vec![redirect("t-1")]);
    let mut handle = service.submit(sample_request()).await;
    assert!(matches!(
        handle.next_event().await,
        Some(SessionEvent::Interaction(_))
    ));

    handle.cancel();
    let (status, error) = wait_for_completion(&mut handle).await;
    assert_eq!(status, PaymentRequestStatus::Failure);
    assert_eq!(error, Some(PaymentError::CancelledByHost));

    // The external app fired its redirect after the host gave up.
    assert!(!service.handle_external_callback(&callback_url("t-1")));
}

#[tokio::test]
async fn test_token_is_stale_after_normal_completion() {
    let (service, _gateway) = build_service(vec![redirect("t-1"), success()]);
    let mut handle = service.submit(sample_request()).await;
    assert!(matches!(
        handle.next_event().await,
        Some(SessionEvent::Interaction(_))
    ));

    assert!(service.handle_external_callback(&callback_url("t-1")));
    let (status, _) = wait_for_completion(&mut handle).await;
    assert_eq!(status, PaymentRequestStatus::Success);

    assert!(!service.handle_external_callback(&callback_url("t-1")));
}
