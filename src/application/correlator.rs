use crate::domain::interaction::{ContinuationData, CorrelationToken};
use crate::error::PaymentError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Query parameter that carries the correlation token in callback URLs.
const TOKEN_PARAM: &str = "token";

/// Matches inbound external-redirect callbacks to the pending session that
/// initiated the redirect.
///
/// The token table is the only cross-session shared mutable state in the
/// crate. The mutex guards the table alone; no session work happens under
/// the lock. Each entry holds the `oneshot` sender the owning session is
/// awaiting on, so a match hands the parsed continuation data straight to
/// that session and consumes the entry in the same critical section.
#[derive(Default)]
pub struct CallbackCorrelator {
    pending: Mutex<HashMap<CorrelationToken, oneshot::Sender<ContinuationData>>>,
}

impl CallbackCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token and returns the receiver the owning session awaits.
    ///
    /// A token may be registered at most once across all sessions; a
    /// duplicate registration is a protocol violation.
    pub fn register(
        &self,
        token: CorrelationToken,
    ) -> Result<oneshot::Receiver<ContinuationData>, PaymentError> {
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(&token) {
            return Err(PaymentError::ProtocolViolation(format!(
                "correlation token {token} is already registered"
            )));
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(token, tx);
        Ok(rx)
    }

    /// Removes a token, if still present. Sessions call this on every
    /// terminal path so late callbacks become `NoMatch` rather than errors.
    pub fn deregister(&self, token: &CorrelationToken) {
        self.pending.lock().unwrap().remove(token);
    }

    /// Matches an inbound callback URL against the registered tokens.
    ///
    /// Returns `true` if the callback was consumed by a pending session.
    /// Unknown tokens, URLs without a token parameter, and repeats of an
    /// already-matched URL all return `false` with no side effects: the
    /// host may have other handlers for the same URL-open event.
    pub fn match_callback(&self, url: &url::Url) -> bool {
        let Some(continuation) = parse_callback(url) else {
            return false;
        };
        let Some(token) = continuation.token.clone() else {
            return false;
        };

        let sender = self.pending.lock().unwrap().remove(&token);
        match sender {
            Some(tx) => {
                debug!(%token, "external callback matched pending transaction");
                // A send error means the session terminated concurrently;
                // the cancel won the race and the callback is not ours.
                tx.send(continuation).is_ok()
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// Extracts the correlation token and continuation fields from a callback
/// URL. The token travels in the `token` query parameter; every other
/// query pair becomes a continuation field.
fn parse_callback(url: &url::Url) -> Option<ContinuationData> {
    let mut token = None;
    let mut fields = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        if key == TOKEN_PARAM {
            token = Some(CorrelationToken::new(value.into_owned()));
        } else {
            fields.insert(key.into_owned(), value.into_owned());
        }
    }
    token.map(|token| ContinuationData::with_token(token, fields))
}
