use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A positive monetary amount.
///
/// Wrapper around `rust_decimal::Decimal` that rejects zero and negative
/// values at construction time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self, PaymentError> {
        let code = code.into();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(PaymentError::Validation(format!(
                "invalid currency code: {code:?}"
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Terminal outcome of a submitted payment request.
///
/// Exactly one of these is delivered per submission. `Retry` marks a
/// transient failure that is safe for the host to resubmit; `Failure`
/// is non-retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRequestStatus {
    Success,
    Retry,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Card,
    BankTransfer,
    Wallet,
}

/// Display-safe description of a stored payment method.
///
/// Immutable value created by the gateway on load/selection and replaced
/// wholesale on change. It carries nothing sensitive: the identifier is
/// already masked by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodDescription {
    pub kind: PaymentMethodKind,
    pub masked_identifier: String,
    pub display_label: String,
}

/// The transaction to submit. Immutable once submitted; owned exclusively
/// by the session processing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Merchant-side order reference.
    pub order_reference: String,
    pub amount: Amount,
    pub currency: Currency,
    /// Reference to the stored payment method selected for this request.
    pub method_reference: String,
    /// Free-form merchant description shown on gateway-hosted screens.
    pub merchant_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(PaymentError::Validation(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-5.0)),
            Err(PaymentError::Validation(_))
        ));
    }

    #[test]
    fn test_currency_validation() {
        assert!(Currency::new("PLN").is_ok());
        assert!(Currency::new("EUR").is_ok());
        assert!(Currency::new("pln").is_err());
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("").is_err());
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{
            "order_reference": "ORDER-1",
            "amount": "12.50",
            "currency": "PLN",
            "method_reference": "card-1234",
            "merchant_description": null
        }"#;
        let request: PaymentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.amount.value(), dec!(12.50));
        assert_eq!(request.currency.code(), "PLN");
    }

    #[test]
    fn test_request_rejects_negative_amount() {
        let json = r#"{
            "order_reference": "ORDER-1",
            "amount": "-1",
            "currency": "PLN",
            "method_reference": "card-1234",
            "merchant_description": null
        }"#;
        assert!(serde_json::from_str::<PaymentRequest>(json).is_err());
    }
}
