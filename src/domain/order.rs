use super::cart::{CartItem, MenuItemId};
use super::money::{Amount, Money};
use super::role::UserId;
use crate::error::OrderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters, as printed in customer emails.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| OrderError::Validation(format!("malformed order id: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Urgent,
    Scheduled,
}

impl FromStr for OrderType {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(OrderType::Urgent),
            "scheduled" => Ok(OrderType::Scheduled),
            other => Err(OrderError::Validation(format!(
                "type of order must be urgent or scheduled, got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub text: String,
    pub location: Option<GeoPoint>,
}

/// A line item frozen at order time. Later menu price changes never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    pub total_price: Money,
    pub special_instructions: Option<String>,
}

impl From<&CartItem> for LineItem {
    fn from(line: &CartItem) -> Self {
        Self {
            item: line.menu_item.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.price,
            total_price: line.total_price,
            special_instructions: line.special_instructions.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Human-readable label used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Being Prepared",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// The forward chain plus cancellation from any non-terminal state.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Ready, Delivered)
                | (Pending | Confirmed | Preparing | Ready, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn derive(paid: Money, total: Money) -> Self {
        if paid >= total && paid.is_positive() {
            PaymentStatus::Paid
        } else if paid.is_positive() {
            PaymentStatus::PartiallyPaid
        } else {
            PaymentStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub updated_by: UserId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryStatus {
    Success,
}

/// Who put an entry in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedBy {
    Gateway,
    Settlement,
    Staff(UserId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: Amount,
    pub date: DateTime<Utc>,
    pub transaction_id: String,
    pub status: LedgerEntryStatus,
    pub method: String,
    pub recorded_by: RecordedBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Validated input for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer: UserId,
    pub order_type: OrderType,
    pub delivery_date: DateTime<Utc>,
    pub address: Address,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: UserId,
    pub order_type: OrderType,
    pub delivery_date: DateTime<Utc>,
    pub address: Address,
    pub menu_items: Vec<LineItem>,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub payment_history: Vec<PaymentRecord>,
    pub assigned_to_chef: Option<UserId>,
    /// Bumped by the store on every successful write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(new: NewOrder) -> Self {
        let total_amount = new.items.iter().map(|line| line.total_price).sum();
        Self {
            id: new.id,
            customer: new.customer,
            order_type: new.order_type,
            delivery_date: new.delivery_date,
            address: new.address,
            menu_items: new.items,
            total_amount,
            paid_amount: Money::ZERO,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            status_history: Vec::new(),
            payment_history: Vec::new(),
            assigned_to_chef: None,
            version: 0,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// Balance still owed. Never negative.
    pub fn outstanding(&self) -> Money {
        if self.paid_amount >= self.total_amount {
            Money::ZERO
        } else {
            self.total_amount - self.paid_amount
        }
    }

    /// Moves the order to `next` and appends the matching history entry.
    pub fn transition_to(
        &mut self,
        next: OrderStatus,
        updated_by: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.order_status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.order_status,
                to: next,
            });
        }
        self.order_status = next;
        self.updated_at = now;
        self.status_history.push(StatusChange {
            status: next,
            updated_by: updated_by.clone(),
            timestamp: now,
        });
        Ok(())
    }

    pub fn has_transaction(&self, transaction_id: &str) -> bool {
        self.payment_history
            .iter()
            .any(|entry| entry.transaction_id == transaction_id)
    }

    /// Appends a confirmed payment and updates the paid amount and status.
    ///
    /// A transaction id already in the ledger is ignored.
    pub fn record_payment(
        &mut self,
        amount: Amount,
        transaction_id: &str,
        method: &str,
        recorded_by: RecordedBy,
        now: DateTime<Utc>,
    ) -> LedgerOutcome {
        if self.has_transaction(transaction_id) {
            return LedgerOutcome::AlreadyRecorded;
        }
        self.payment_history.push(PaymentRecord {
            amount,
            date: now,
            transaction_id: transaction_id.to_string(),
            status: LedgerEntryStatus::Success,
            method: method.to_string(),
            recorded_by,
        });
        self.paid_amount += amount.into();
        self.payment_status = PaymentStatus::derive(self.paid_amount, self.total_amount);
        self.updated_at = now;
        LedgerOutcome::Recorded
    }

    /// Sum of successful ledger entries. Always equals `paid_amount`.
    pub fn ledger_total(&self) -> Money {
        self.payment_history
            .iter()
            .filter(|entry| entry.status == LedgerEntryStatus::Success)
            .map(|entry| Money::from(entry.amount))
            .sum()
    }

    pub fn ledger_summary(&self) -> LedgerSummary {
        LedgerSummary {
            order: self.id,
            total: self.total_amount,
            paid: self.paid_amount,
            outstanding: self.outstanding(),
            payment_status: self.payment_status,
            order_status: self.order_status,
        }
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            order: self.id,
            total_amount: self.total_amount,
            item_count: self
                .menu_items
                .iter()
                .fold(0, |count: u32, line| count.saturating_add(line.quantity)),
            delivery_date: self.delivery_date,
            placed_at: self.created_at,
        }
    }
}

/// Compact entry kept on the customer's record of previous orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order: OrderId,
    pub total_amount: Money,
    pub item_count: u32,
    pub delivery_date: DateTime<Utc>,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub order: OrderId,
    pub total: Money,
    pub paid: Money,
    pub outstanding: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}
