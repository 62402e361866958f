use super::cart::Cart;
use super::notification::{CustomerProfile, Email};
use super::order::{Order, OrderId, OrderStatus, OrderSummary};
use super::payment::{Checkout, CheckoutRequest, PaymentIntent, VerifiedPayment};
use super::role::UserId;
use super::schedule::Schedule;
use crate::error::{GatewayError, NotifyError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a brand new order at version 0.
    async fn insert(&self, order: Order) -> Result<()>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;
    /// Compare-and-swap on `order.version`. Returns the stored copy, with
    /// its version bumped, or `OrderError::Conflict` if someone else wrote first.
    async fn update(&self, order: Order) -> Result<Order>;
    async fn list_by_customer(&self, customer: &UserId) -> Result<Vec<Order>>;
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get(&self, customer: &UserId) -> Result<Option<Cart>>;
    async fn put(&self, cart: Cart) -> Result<()>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_by_order(&self, order: OrderId) -> Result<Option<Schedule>>;
    async fn put(&self, schedule: Schedule) -> Result<()>;
    async fn list_by_chef(&self, chef: &UserId) -> Result<Vec<Schedule>>;
}

#[async_trait]
pub trait PaymentIntentStore: Send + Sync {
    async fn put(&self, intent: PaymentIntent) -> Result<()>;
    async fn get(&self, tx_ref: &str) -> Result<Option<PaymentIntent>>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn get(&self, customer: &UserId) -> Result<Option<CustomerProfile>>;
    async fn upsert(&self, profile: CustomerProfile) -> Result<()>;
    /// Maintains the denormalized "previous orders" list. Not authoritative.
    async fn append_order_summary(&self, customer: &UserId, summary: OrderSummary) -> Result<()>;
    async fn order_summaries(&self, customer: &UserId) -> Result<Vec<OrderSummary>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: CheckoutRequest) -> std::result::Result<Checkout, GatewayError>;
    async fn verify(&self, tx_ref: &str) -> std::result::Result<VerifiedPayment, GatewayError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> std::result::Result<(), NotifyError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedOrderStore = Arc<dyn OrderStore>;
pub type SharedCartStore = Arc<dyn CartStore>;
pub type SharedScheduleStore = Arc<dyn ScheduleStore>;
pub type SharedPaymentIntentStore = Arc<dyn PaymentIntentStore>;
pub type SharedCustomerDirectory = Arc<dyn CustomerDirectory>;
pub type SharedPaymentGateway = Arc<dyn PaymentGateway>;
pub type SharedNotifier = Arc<dyn Notifier>;
pub type SharedClock = Arc<dyn Clock>;

/// Every persistence port the services need, bundled for wiring.
#[derive(Clone)]
pub struct Stores {
    pub orders: SharedOrderStore,
    pub carts: SharedCartStore,
    pub schedules: SharedScheduleStore,
    pub intents: SharedPaymentIntentStore,
    pub customers: SharedCustomerDirectory,
}
