use crate::application::broker::{Classified, InteractionBroker, PresentationContext};
use crate::application::correlator::CallbackCorrelator;
use crate::domain::interaction::{ContinuationData, CorrelationToken, InteractionRequest};
use crate::domain::payment::{PaymentRequest, PaymentRequestStatus};
use crate::domain::ports::{AuthorizationDataSourceHandle, GatewayClientHandle};
use crate::error::{GatewayError, PaymentError};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-session policy knobs. The round cap and the interaction wait are
/// deliberately configurable rather than hard-coded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interaction rounds allowed before the session gives up with a
    /// retryable error.
    pub max_interaction_rounds: usize,
    /// How long an `AwaitingInteraction` state may remain unresolved.
    pub interaction_timeout_secs: u64,
    /// Rendering context the host registered; drives presentation style.
    pub presentation_context: PresentationContext,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_interaction_rounds: 10,
            interaction_timeout_secs: 300,
            presentation_context: PresentationContext::default(),
        }
    }
}

impl SessionConfig {
    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }
}

/// Identifier of one submitted request's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Events delivered to the host: zero or more interaction requests,
/// then exactly one `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Interaction(InteractionRequest),
    Completed {
        status: PaymentRequestStatus,
        error: Option<PaymentError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CancelReason {
    Host,
    ContextCleared,
}

impl CancelReason {
    fn into_error(self) -> PaymentError {
        match self {
            CancelReason::Host => PaymentError::CancelledByHost,
            CancelReason::ContextCleared => PaymentError::ContextCleared,
        }
    }
}

#[derive(Debug)]
enum ControlState {
    Running,
    Awaiting(oneshot::Sender<ContinuationData>),
    Terminal,
}

/// State shared between the session task, its handle, and the service
/// registry. All transitions go through the mutex; the watch channel
/// carries the first cancellation reason, later cancels are no-ops.
pub(crate) struct SessionControl {
    state: Mutex<ControlState>,
    cancel: watch::Sender<Option<CancelReason>>,
}

impl SessionControl {
    fn new() -> Self {
        let (cancel, _) = watch::channel(None);
        Self {
            state: Mutex::new(ControlState::Running),
            cancel,
        }
    }

    pub(crate) fn cancel(&self, reason: CancelReason) {
        self.cancel.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(reason);
                true
            } else {
                false
            }
        });
    }

    fn subscribe_cancel(&self) -> watch::Receiver<Option<CancelReason>> {
        self.cancel.subscribe()
    }

    /// Host-reported completion of the pending interaction step.
    ///
    /// Completing with no interaction pending, or after the session has
    /// reached a terminal status, indicates a host bug and is rejected.
    pub(crate) fn complete_interaction(
        &self,
        data: ContinuationData,
    ) -> Result<(), PaymentError> {
        let mut state = self.state.lock().unwrap();
        match std::mem::replace(&mut *state, ControlState::Running) {
            ControlState::Awaiting(tx) => {
                // A failed send means the session resolved concurrently
                // (cancel or timeout won the race); the completion is a no-op.
                let _ = tx.send(data);
                Ok(())
            }
            ControlState::Running => Err(PaymentError::ProtocolViolation(
                "no interaction is pending for this session".to_string(),
            )),
            ControlState::Terminal => {
                *state = ControlState::Terminal;
                Err(PaymentError::ProtocolViolation(
                    "session has already reached a terminal status".to_string(),
                ))
            }
        }
    }

    fn begin_awaiting(&self) -> oneshot::Receiver<ContinuationData> {
        let (tx, rx) = oneshot::channel();
        *self.state.lock().unwrap() = ControlState::Awaiting(tx);
        rx
    }

    fn end_awaiting(&self) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, ControlState::Awaiting(_)) {
            *state = ControlState::Running;
        }
    }

    fn set_terminal(&self) {
        *self.state.lock().unwrap() = ControlState::Terminal;
    }
}

/// Host-side handle for one submitted request.
///
/// The handle is the host's event stream plus the two inbound operations:
/// completing an in-process interaction and cancelling the session. Dropping
/// the handle does not cancel the session; events are simply discarded.
pub struct SessionHandle {
    id: SessionId,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    control: Arc<SessionControl>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Next event, or `None` once the session has terminated and the
    /// terminal event was consumed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Reports that the user finished the in-process interaction step.
    pub fn complete_interaction(&self, data: ContinuationData) -> Result<(), PaymentError> {
        self.control.complete_interaction(data)
    }

    /// Cancels the session. A no-op if it already reached a terminal
    /// status; otherwise resolves to `Failure` with `CancelledByHost`.
    pub fn cancel(&self) {
        self.control.cancel(CancelReason::Host);
    }
}

enum Resolution {
    Continue(ContinuationData),
    Cancelled(CancelReason),
    TimedOut,
}

/// The per-request state machine instance.
///
/// Runs as a single task so all transitions for one session are serialized:
/// no two gateway calls for the same session ever overlap. The lifecycle is
/// `Created -> Submitting -> (AwaitingInteraction -> Resubmitting)* ->
/// Terminal`, and the terminal event is emitted exactly once on every path.
pub(crate) struct SubmissionSession {
    id: SessionId,
    gateway: GatewayClientHandle,
    auth_source: AuthorizationDataSourceHandle,
    broker: InteractionBroker,
    correlator: Arc<CallbackCorrelator>,
    control: Arc<SessionControl>,
    events: mpsc::UnboundedSender<SessionEvent>,
    config: SessionConfig,
}

impl SubmissionSession {
    pub(crate) fn new(
        gateway: GatewayClientHandle,
        auth_source: AuthorizationDataSourceHandle,
        correlator: Arc<CallbackCorrelator>,
        config: SessionConfig,
    ) -> (Self, SessionHandle) {
        let id = SessionId::new();
        let control = Arc::new(SessionControl::new());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            id,
            gateway,
            auth_source,
            broker: InteractionBroker::new(config.presentation_context),
            correlator,
            control: control.clone(),
            events: events_tx,
            config,
        };
        let handle = SessionHandle {
            id,
            events: events_rx,
            control,
        };
        (session, handle)
    }

    pub(crate) fn control(&self) -> Arc<SessionControl> {
        self.control.clone()
    }

    pub(crate) async fn run(self, request: PaymentRequest) {
        let mut cancel_rx = self.control.subscribe_cancel();

        let auth = tokio::select! {
            biased;
            auth = self.auth_source.authorization_data() => match auth {
                Ok(auth) => auth,
                Err(error) => {
                    return self.finish(PaymentRequestStatus::Retry, Some(error));
                }
            },
            reason = cancelled(&mut cancel_rx) => return self.finish_cancelled(reason),
        };

        debug!(session = %self.id, order = %request.order_reference, "submitting payment request");
        let mut outcome = tokio::select! {
            biased;
            outcome = self.gateway.submit(&request, &auth) => outcome,
            reason = cancelled(&mut cancel_rx) => return self.finish_cancelled(reason),
        };

        let mut rounds = 0usize;
        loop {
            let classified = match outcome {
                Ok(outcome) => self.broker.classify(outcome),
                Err(GatewayError::Transport(message)) => {
                    return self.finish(
                        PaymentRequestStatus::Retry,
                        Some(PaymentError::Transport(message)),
                    );
                }
                Err(GatewayError::Rejected(message)) => {
                    return self.finish(
                        PaymentRequestStatus::Failure,
                        Some(PaymentError::GatewayRejected(message)),
                    );
                }
            };

            let (interaction, correlation) = match classified {
                Classified::Terminal(status) => return self.finish(status, None),
                Classified::Present { payload, style } => (
                    InteractionRequest::PresentController { payload, style },
                    None,
                ),
                Classified::Redirect { target, token } => {
                    let rx = match self.correlator.register(token.clone()) {
                        Ok(rx) => rx,
                        Err(error) => {
                            return self.finish(PaymentRequestStatus::Retry, Some(error));
                        }
                    };
                    (InteractionRequest::ExternalRedirect { target }, Some((token, rx)))
                }
            };

            rounds += 1;
            if rounds > self.config.max_interaction_rounds {
                if let Some((token, _)) = &correlation {
                    self.correlator.deregister(token);
                }
                warn!(session = %self.id, rounds, "interaction round limit exceeded");
                return self.finish(
                    PaymentRequestStatus::Retry,
                    Some(PaymentError::InteractionLimitExceeded(
                        self.config.max_interaction_rounds,
                    )),
                );
            }

            // Register the host-completion channel before emitting the
            // interaction so the host can resolve it as soon as it sees it.
            let host_rx = self.control.begin_awaiting();
            debug!(session = %self.id, round = rounds, "awaiting user interaction");
            self.emit(SessionEvent::Interaction(interaction));

            let resolution = self
                .await_resolution(host_rx, correlation, &mut cancel_rx)
                .await;
            self.control.end_awaiting();

            let continuation = match resolution {
                Resolution::Continue(data) => data,
                Resolution::Cancelled(reason) => return self.finish_cancelled(reason),
                Resolution::TimedOut => {
                    return self.finish(
                        PaymentRequestStatus::Retry,
                        Some(PaymentError::InteractionTimeout),
                    );
                }
            };

            debug!(session = %self.id, "resuming authorization with continuation data");
            outcome = tokio::select! {
                biased;
                outcome = self.gateway.continue_authorization(&continuation, &auth) => outcome,
                reason = cancelled(&mut cancel_rx) => return self.finish_cancelled(reason),
            };
        }
    }

    /// Waits for whichever resolves first: the host completing the step,
    /// a correlated external callback, cancellation, or the timeout.
    /// The registered correlation token is deregistered on every exit path.
    async fn await_resolution(
        &self,
        host_rx: oneshot::Receiver<ContinuationData>,
        correlation: Option<(CorrelationToken, oneshot::Receiver<ContinuationData>)>,
        cancel_rx: &mut watch::Receiver<Option<CancelReason>>,
    ) -> Resolution {
        let (token, corr_rx) = match correlation {
            Some((token, rx)) => (Some(token), Some(rx)),
            None => (None, None),
        };

        let timeout = tokio::time::sleep(self.config.interaction_timeout());
        tokio::pin!(timeout);
        let host = recv_continuation(host_rx);
        tokio::pin!(host);
        let external = async {
            match corr_rx {
                Some(rx) => recv_continuation(rx).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(external);

        // Biased towards already-delivered continuations so a callback that
        // won the race against a near-simultaneous cancel is not lost.
        let resolution = tokio::select! {
            biased;
            data = &mut external => Resolution::Continue(data),
            data = &mut host => Resolution::Continue(data),
            reason = cancelled(cancel_rx) => Resolution::Cancelled(reason),
            _ = &mut timeout => Resolution::TimedOut,
        };

        if let Some(token) = token {
            self.correlator.deregister(&token);
        }
        resolution
    }

    fn finish(&self, status: PaymentRequestStatus, error: Option<PaymentError>) {
        self.control.set_terminal();
        info!(session = %self.id, ?status, "payment request reached terminal status");
        self.emit(SessionEvent::Completed { status, error });
    }

    fn finish_cancelled(&self, reason: CancelReason) {
        self.finish(PaymentRequestStatus::Failure, Some(reason.into_error()));
    }

    fn emit(&self, event: SessionEvent) {
        // The host may have dropped its handle; delivery is best effort,
        // the terminal transition itself already happened.
        let _ = self.events.send(event);
    }
}

async fn recv_continuation(rx: oneshot::Receiver<ContinuationData>) -> ContinuationData {
    match rx.await {
        Ok(data) => data,
        // Sender dropped without resolving; park until another branch wins.
        Err(_) => std::future::pending().await,
    }
}

async fn cancelled(rx: &mut watch::Receiver<Option<CancelReason>>) -> CancelReason {
    loop {
        if let Some(reason) = *rx.borrow_and_update() {
            return reason;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completing_without_pending_interaction_is_rejected() {
        let control = SessionControl::new();
        assert!(matches!(
            control.complete_interaction(ContinuationData::default()),
            Err(PaymentError::ProtocolViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_completing_pending_interaction_delivers_data() {
        let control = SessionControl::new();
        let rx = control.begin_awaiting();

        control
            .complete_interaction(ContinuationData::default())
            .unwrap();
        assert_eq!(rx.await.unwrap(), ContinuationData::default());

        // The pending slot is consumed; a second completion is a host bug.
        assert!(matches!(
            control.complete_interaction(ContinuationData::default()),
            Err(PaymentError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_terminal_state_is_absorbing() {
        let control = SessionControl::new();
        control.set_terminal();
        assert!(matches!(
            control.complete_interaction(ContinuationData::default()),
            Err(PaymentError::ProtocolViolation(_))
        ));
        // And it stays terminal after the failed call.
        assert!(matches!(
            control.complete_interaction(ContinuationData::default()),
            Err(PaymentError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_first_cancel_reason_wins() {
        let control = SessionControl::new();
        let rx = control.subscribe_cancel();

        control.cancel(CancelReason::Host);
        control.cancel(CancelReason::ContextCleared);
        assert_eq!(*rx.borrow(), Some(CancelReason::Host));
    }
}
