mod common;

use async_trait::async_trait;
use catering_orders::application::orders::OrderService;
use catering_orders::config::PaymentSettings;
use catering_orders::domain::order::{Order, OrderId, OrderStatus};
use catering_orders::domain::ports::{OrderStore, Stores};
use catering_orders::domain::role::UserId;
use catering_orders::error::{OrderError, Result};
use catering_orders::infrastructure::in_memory::InMemoryOrderStore;
use common::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loses the next `conflicts` writes to an imaginary concurrent writer.
struct ContendedOrderStore {
    inner: InMemoryOrderStore,
    conflicts: AtomicUsize,
    updates: AtomicUsize,
}

#[async_trait]
impl OrderStore for ContendedOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        self.inner.insert(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.inner.get(id).await
    }

    async fn update(&self, order: Order) -> Result<Order> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(OrderError::Conflict(order.id));
        }
        self.inner.update(order).await
    }

    async fn list_by_customer(&self, customer: &UserId) -> Result<Vec<Order>> {
        self.inner.list_by_customer(customer).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.inner.list_by_status(status).await
    }
}

fn contended_harness() -> (Harness, Arc<ContendedOrderStore>) {
    let mut h = harness();
    let orders = Arc::new(ContendedOrderStore {
        inner: InMemoryOrderStore::new(),
        conflicts: AtomicUsize::new(0),
        updates: AtomicUsize::new(0),
    });
    let stores = Stores {
        orders: orders.clone(),
        ..h.stores.clone()
    };
    h.service = OrderService::new(
        stores.clone(),
        h.gateway.clone(),
        h.notifier.clone(),
        h.clock.clone(),
        PaymentSettings::default(),
    );
    h.stores = stores;
    (h, orders)
}

#[tokio::test]
async fn test_conflicting_write_is_retried() {
    let (h, orders) = contended_harness();
    let id = h.place(dec!(50), 2).await.order.id;
    orders.conflicts.store(2, Ordering::SeqCst);

    let update = h.service.update_status(&chef(), id, "confirmed").await.unwrap();
    assert_eq!(update.order.order_status, OrderStatus::Confirmed);
    assert_eq!(update.order.status_history.len(), 1);
    assert_eq!(orders.updates.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_conflict_is_surfaced() {
    let (h, orders) = contended_harness();
    let id = h.place(dec!(50), 2).await.order.id;
    orders.conflicts.store(10, Ordering::SeqCst);

    let err = h.service.update_status(&chef(), id, "confirmed").await.unwrap_err();
    assert!(matches!(err, OrderError::Conflict(conflicted) if conflicted == id));
    assert_eq!(
        h.service.get_order(id).await.unwrap().order_status,
        OrderStatus::Pending
    );
}
