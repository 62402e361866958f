use super::money::Amount;
use super::order::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Deposit,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentState {
    #[default]
    Pending,
    Confirmed,
}

/// A gateway transaction we initialized and are waiting to see paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub tx_ref: String,
    pub order: OrderId,
    pub amount: Amount,
    pub kind: PaymentKind,
    pub state: IntentState,
    pub created_at: DateTime<Utc>,
}

/// Builds a fresh transaction reference. Never reused across attempts.
pub fn new_tx_ref(kind: PaymentKind) -> String {
    let prefix = match kind {
        PaymentKind::Deposit => "dep",
        PaymentKind::Final => "fin",
    };
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub amount: Amount,
    pub currency: String,
    pub payer: Payer,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    pub checkout_url: String,
    pub tx_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayTxStatus {
    Success,
    Pending,
    Failed,
}

/// The gateway's own account of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub tx_ref: String,
    pub amount: Amount,
    pub status: GatewayTxStatus,
    pub method: String,
}
