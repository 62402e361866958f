use crate::domain::cart::Cart;
use crate::domain::notification::CustomerProfile;
use crate::domain::order::{Order, OrderId, OrderStatus, OrderSummary};
use crate::domain::payment::PaymentIntent;
use crate::domain::ports::{
    CartStore, CustomerDirectory, OrderStore, PaymentIntentStore, ScheduleStore, Stores,
};
use crate::domain::role::UserId;
use crate::domain::schedule::Schedule;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for orders.
///
/// Updates are compare-and-swap on `Order::version`, checked under the
/// write lock, so concurrent writers to one order are detected.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, mut order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(OrderError::Conflict(order.id));
        }
        order.version = 0;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn update(&self, mut order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get(&order.id)
            .ok_or_else(|| OrderError::not_found("Order", order.id))?;
        if stored.version != order.version {
            return Err(OrderError::Conflict(order.id));
        }
        order.version += 1;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn list_by_customer(&self, customer: &UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut found: Vec<Order> = orders
            .values()
            .filter(|order| &order.customer == customer)
            .cloned()
            .collect();
        found.sort_by_key(|order| order.created_at);
        Ok(found)
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut found: Vec<Order> = orders
            .values()
            .filter(|order| order.order_status == status)
            .cloned()
            .collect();
        found.sort_by_key(|order| order.created_at);
        Ok(found)
    }
}

/// Carts keyed by their owning customer: one cart per customer.
#[derive(Default, Clone)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get(&self, customer: &UserId) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts.get(customer).cloned())
    }

    async fn put(&self, cart: Cart) -> Result<()> {
        let mut carts = self.carts.write().await;
        carts.insert(cart.customer.clone(), cart);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryScheduleStore {
    schedules: Arc<RwLock<HashMap<OrderId, Schedule>>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get_by_order(&self, order: OrderId) -> Result<Option<Schedule>> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&order).cloned())
    }

    async fn put(&self, schedule: Schedule) -> Result<()> {
        let mut schedules = self.schedules.write().await;
        schedules.insert(schedule.order, schedule);
        Ok(())
    }

    async fn list_by_chef(&self, chef: &UserId) -> Result<Vec<Schedule>> {
        let schedules = self.schedules.read().await;
        let mut found: Vec<Schedule> = schedules
            .values()
            .filter(|schedule| &schedule.chef == chef)
            .cloned()
            .collect();
        found.sort_by_key(|schedule| schedule.date);
        Ok(found)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentIntentStore {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
}

impl InMemoryPaymentIntentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentIntentStore for InMemoryPaymentIntentStore {
    async fn put(&self, intent: PaymentIntent) -> Result<()> {
        let mut intents = self.intents.write().await;
        intents.insert(intent.tx_ref.clone(), intent);
        Ok(())
    }

    async fn get(&self, tx_ref: &str) -> Result<Option<PaymentIntent>> {
        let intents = self.intents.read().await;
        Ok(intents.get(tx_ref).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCustomerDirectory {
    profiles: Arc<RwLock<HashMap<UserId, CustomerProfile>>>,
    history: Arc<RwLock<HashMap<UserId, Vec<OrderSummary>>>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn get(&self, customer: &UserId) -> Result<Option<CustomerProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(customer).cloned())
    }

    async fn upsert(&self, profile: CustomerProfile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn append_order_summary(&self, customer: &UserId, summary: OrderSummary) -> Result<()> {
        let mut history = self.history.write().await;
        history.entry(customer.clone()).or_default().push(summary);
        Ok(())
    }

    async fn order_summaries(&self, customer: &UserId) -> Result<Vec<OrderSummary>> {
        let history = self.history.read().await;
        Ok(history.get(customer).cloned().unwrap_or_default())
    }
}

impl Stores {
    /// Fresh, empty in-memory adapters for every store port.
    pub fn in_memory() -> Self {
        Self {
            orders: Arc::new(InMemoryOrderStore::new()),
            carts: Arc::new(InMemoryCartStore::new()),
            schedules: Arc::new(InMemoryScheduleStore::new()),
            intents: Arc::new(InMemoryPaymentIntentStore::new()),
            customers: Arc::new(InMemoryCustomerDirectory::new()),
        }
    }
}
