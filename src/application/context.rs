use crate::domain::payment::PaymentMethodDescription;
use tokio::sync::watch;

/// Per-logged-in-user state: the currently selected payment method.
///
/// Observers subscribe through a `watch` channel; the value is replaced
/// wholesale on selection changes and reset to `None` when the user
/// context is cleared on logout or user switch.
pub struct UserContext {
    selected_method: watch::Sender<Option<PaymentMethodDescription>>,
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl UserContext {
    pub fn new() -> Self {
        let (selected_method, _) = watch::channel(None);
        Self { selected_method }
    }

    /// The user picked a payment method in the UI layer.
    pub fn select_method(&self, method: PaymentMethodDescription) {
        self.selected_method.send_replace(Some(method));
    }

    /// The user cleared the selection, or the context was torn down.
    pub fn clear_selection(&self) {
        self.selected_method.send_replace(None);
    }

    /// Read-only observable of the selected method for the UI layer.
    pub fn selected_method(&self) -> watch::Receiver<Option<PaymentMethodDescription>> {
        self.selected_method.subscribe()
    }

    pub fn current_selection(&self) -> Option<PaymentMethodDescription> {
        self.selected_method.borrow().clone()
    }
}
