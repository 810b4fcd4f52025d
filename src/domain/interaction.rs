use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// How a surfaced screen must be presented by the host.
///
/// Both variants are modal: the surfaced view must never be pushed onto a
/// navigation stack. The distinction only tells the host whether its
/// rendering context already sits inside a navigation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStyle {
    ModalOverNavigation,
    ModalStandalone,
}

/// Opaque in-process challenge payload handed back by the gateway,
/// e.g. a CVV re-entry form or a 3-D Secure challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub body: serde_json::Value,
}

/// A user step required before the transaction can proceed.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionRequest {
    /// The host must show a screen built from `payload`, modally.
    PresentController {
        payload: ChallengePayload,
        style: PresentationStyle,
    },
    /// The host must hand `target` to the OS browser or external app.
    ExternalRedirect { target: Url },
}

/// Opaque token the gateway associates with a transaction while an
/// external redirect is outstanding. Binds the eventual callback URL
/// back to the session that initiated the redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data fed back into `continue_authorization` after an interaction step
/// resolves. Built by the host for in-process steps, or parsed from the
/// callback URL for external redirects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContinuationData {
    pub token: Option<CorrelationToken>,
    pub fields: BTreeMap<String, String>,
}

impl ContinuationData {
    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self {
            token: None,
            fields,
        }
    }

    pub fn with_token(token: CorrelationToken, fields: BTreeMap<String, String>) -> Self {
        Self {
            token: Some(token),
            fields,
        }
    }
}
