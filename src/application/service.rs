use crate::application::context::UserContext;
use crate::application::correlator::CallbackCorrelator;
use crate::application::session::{
    CancelReason, SessionConfig, SessionControl, SessionEvent, SessionHandle, SessionId,
    SubmissionSession,
};
use crate::domain::interaction::{ContinuationData, InteractionRequest};
use crate::domain::payment::{PaymentMethodDescription, PaymentRequest, PaymentRequestStatus};
use crate::domain::ports::{AuthorizationDataSourceHandle, GatewayClientHandle};
use crate::error::PaymentError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::info;
use url::Url;

/// Public entry point of the crate.
///
/// Creates one `SubmissionSession` per submitted request, wires it to the
/// shared `CallbackCorrelator` and the gateway collaborators, and relays
/// notifications outward. Multiple sessions run concurrently and
/// independently; each session's transitions stay serialized in its own
/// task.
pub struct PaymentService {
    gateway: GatewayClientHandle,
    auth_source: AuthorizationDataSourceHandle,
    correlator: Arc<CallbackCorrelator>,
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionControl>>>>,
    user_context: UserContext,
    config: SessionConfig,
}

impl PaymentService {
    pub fn new(gateway: GatewayClientHandle, auth_source: AuthorizationDataSourceHandle) -> Self {
        Self::with_config(gateway, auth_source, SessionConfig::default())
    }

    pub fn with_config(
        gateway: GatewayClientHandle,
        auth_source: AuthorizationDataSourceHandle,
        config: SessionConfig,
    ) -> Self {
        Self {
            gateway,
            auth_source,
            correlator: Arc::new(CallbackCorrelator::new()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            user_context: UserContext::new(),
            config,
        }
    }

    /// Submits a payment request.
    ///
    /// Returns immediately with a handle to the new session; all gateway
    /// traffic happens on the session's own task. The handle's event stream
    /// yields zero or more interaction requests followed by exactly one
    /// terminal status, regardless of how many interaction round-trips the
    /// gateway demands.
    pub async fn submit(&self, request: PaymentRequest) -> SessionHandle {
        let (session, handle) = SubmissionSession::new(
            self.gateway.clone(),
            self.auth_source.clone(),
            self.correlator.clone(),
            self.config.clone(),
        );
        let id = handle.id();
        self.sessions.write().await.insert(id, session.control());

        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            session.run(request).await;
            sessions.write().await.remove(&id);
        });
        handle
    }

    /// Legacy submission shape: delegate-style callbacks instead of an
    /// event stream. Relays from the same session type as [`submit`],
    /// so both entry points share one code path.
    #[deprecated(note = "use `submit` and consume the returned `SessionHandle`")]
    pub async fn submit_with_handlers<I, C>(
        &self,
        request: PaymentRequest,
        on_interaction: I,
        on_complete: C,
    ) -> SessionId
    where
        I: Fn(InteractionRequest) + Send + 'static,
        C: FnOnce(PaymentRequestStatus, Option<PaymentError>) + Send + 'static,
    {
        let mut handle = self.submit(request).await;
        let id = handle.id();
        tokio::spawn(async move {
            let mut on_complete = Some(on_complete);
            while let Some(event) = handle.next_event().await {
                match event {
                    SessionEvent::Interaction(interaction) => on_interaction(interaction),
                    SessionEvent::Completed { status, error } => {
                        if let Some(complete) = on_complete.take() {
                            complete(status, error);
                        }
                    }
                }
            }
        });
        id
    }

    /// Reports completion of an in-process interaction step by session id.
    /// Companion to the legacy submission shape; handle holders can call
    /// [`SessionHandle::complete_interaction`] directly.
    pub async fn complete_interaction(
        &self,
        id: SessionId,
        data: ContinuationData,
    ) -> Result<(), PaymentError> {
        match self.sessions.read().await.get(&id).cloned() {
            Some(control) => control.complete_interaction(data),
            None => Err(PaymentError::ProtocolViolation(format!(
                "session {id} is unknown or already terminal"
            ))),
        }
    }

    /// Cancels an in-flight session. No-op for unknown or terminal sessions.
    pub async fn cancel(&self, id: SessionId) {
        if let Some(control) = self.sessions.read().await.get(&id).cloned() {
            control.cancel(CancelReason::Host);
        }
    }

    /// Forwards an URL-open event from the host.
    ///
    /// Returns whether the URL was consumed by a pending transaction. Safe
    /// to call for URLs unrelated to payment: those return `false` with no
    /// side effects, so other handlers of the same event keep working.
    pub fn handle_external_callback(&self, url: &Url) -> bool {
        self.correlator.match_callback(url)
    }

    /// Tears down all state tied to the current logged-in user.
    ///
    /// Every session still in flight resolves to a terminal `Failure` with
    /// `ContextCleared`, exactly once each; their pending correlation
    /// tokens become stale and later callbacks for them are not matched.
    /// The selected payment method resets to `None`.
    pub async fn clear_user_context(&self) {
        self.user_context.clear_selection();
        let controls: Vec<_> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, control)| control).collect()
        };
        if !controls.is_empty() {
            info!(count = controls.len(), "clearing user context with sessions in flight");
        }
        for control in controls {
            control.cancel(CancelReason::ContextCleared);
        }
    }

    /// The UI layer reports that the user picked a payment method.
    pub fn select_payment_method(&self, method: PaymentMethodDescription) {
        self.user_context.select_method(method);
    }

    /// The UI layer reports that the user cleared the selection.
    pub fn clear_payment_method_selection(&self) {
        self.user_context.clear_selection();
    }

    /// Read-only observable of the selected payment method, for the widget.
    pub fn selected_payment_method(&self) -> watch::Receiver<Option<PaymentMethodDescription>> {
        self.user_context.selected_method()
    }

    /// Legacy one-shot accessor over the same selection state.
    #[deprecated(note = "observe `selected_payment_method` instead")]
    pub fn retrieve_selected_payment_method(&self) -> Option<PaymentMethodDescription> {
        self.user_context.current_selection()
    }
}
