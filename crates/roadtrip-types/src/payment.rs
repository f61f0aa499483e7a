//! Payment types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ParseError, SubscriptionId, UserId};

/// Default currency for payment entries
pub const DEFAULT_CURRENCY: &str = "EUR";

/// How a subscription is paid for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Paypal,
    Transfer,
    #[default]
    Free,
    Stripe,
}

impl PaymentMethod {
    /// Get the payment method identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Paypal => "paypal",
            Self::Transfer => "transfer",
            Self::Free => "free",
            Self::Stripe => "stripe",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::Paypal),
            "transfer" => Ok(Self::Transfer),
            "free" => Ok(Self::Free),
            "stripe" => Ok(Self::Stripe),
            _ => Err(ParseError::InvalidPaymentMethod(s.to_string())),
        }
    }
}

/// Payment method and processor identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub last_four_digits: Option<String>,
    pub card_brand: Option<String>,
    pub expiry_month: Option<u8>,
    pub expiry_year: Option<u16>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub paypal_subscription_id: Option<String>,
}

impl PaymentInfo {
    /// Payment info carrying only a method
    pub fn with_method(method: PaymentMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }
}

/// Outcome of a payment attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Success,
    Failed,
    Refunded,
    Pending,
}

impl PaymentStatus {
    /// Get the payment status identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Pending => "pending",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "pending" => Ok(Self::Pending),
            _ => Err(ParseError::InvalidPaymentStatus(s.to_string())),
        }
    }
}

/// Payment reported by the payment processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    /// Amount in minor units (cents)
    pub amount_cents: i64,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub invoice_id: Option<String>,
    /// When the payment happened; defaults to the time it is recorded
    pub date: Option<DateTime<Utc>>,
}

/// Immutable entry in a subscription's payment history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub date: DateTime<Utc>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub invoice_id: Option<String>,
}

impl PaymentEntry {
    /// Build a history entry, filling defaults from `now`
    pub fn from_event(event: PaymentEvent, now: DateTime<Utc>) -> Self {
        Self {
            date: event.date.unwrap_or(now),
            amount_cents: event.amount_cents,
            currency: event
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            status: event.status.unwrap_or_default(),
            transaction_id: event.transaction_id,
            invoice_id: event.invoice_id,
        }
    }
}

/// Payment ledger row, kept per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Ledger row mirroring a history entry
    pub fn from_entry(user_id: UserId, subscription_id: SubscriptionId, entry: &PaymentEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            subscription_id,
            amount_cents: entry.amount_cents,
            currency: entry.currency.clone(),
            status: entry.status,
            transaction_id: entry.transaction_id.clone(),
            created_at: entry.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_defaults() {
        let now = Utc::now();
        let entry = PaymentEntry::from_event(
            PaymentEvent {
                amount_cents: 1999,
                ..PaymentEvent::default()
            },
            now,
        );
        assert_eq!(entry.date, now);
        assert_eq!(entry.currency, "EUR");
        assert_eq!(entry.status, PaymentStatus::Success);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("Card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }
}
