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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CF_ORDERS: &str = "orders";
pub const CF_CARTS: &str = "carts";
pub const CF_SCHEDULES: &str = "schedules";
pub const CF_INTENTS: &str = "payment_intents";
pub const CF_CUSTOMERS: &str = "customers";
pub const CF_ORDER_HISTORY: &str = "order_history";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_ORDERS,
    CF_CARTS,
    CF_SCHEDULES,
    CF_INTENTS,
    CF_CUSTOMERS,
    CF_ORDER_HISTORY,
];

/// A persistent store implementation using RocksDB.
///
/// Each aggregate lives in its own column family, JSON encoded. Order
/// writes go through `write_lock` so the version check and the put are
/// one step.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Wires this one database behind every store port.
    pub fn into_stores(self) -> Stores {
        Stores {
            orders: Arc::new(self.clone()),
            carts: Arc::new(self.clone()),
            schedules: Arc::new(self.clone()),
            intents: Arc::new(self.clone()),
            customers: Arc::new(self),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| OrderError::internal(format!("column family {name} not found")))
    }
}

fn order_key(id: OrderId) -> [u8; 16] {
    *id.0.as_bytes()
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, mut order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = order_key(order.id);
        if self.get_json::<Order>(CF_ORDERS, &key)?.is_some() {
            return Err(OrderError::Conflict(order.id));
        }
        order.version = 0;
        self.put_json(CF_ORDERS, &key, &order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &order_key(id))
    }

    async fn update(&self, mut order: Order) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let key = order_key(order.id);
        let stored: Order = self
            .get_json(CF_ORDERS, &key)?
            .ok_or_else(|| OrderError::not_found("Order", order.id))?;
        if stored.version != order.version {
            return Err(OrderError::Conflict(order.id));
        }
        order.version += 1;
        self.put_json(CF_ORDERS, &key, &order)?;
        Ok(order)
    }

    async fn list_by_customer(&self, customer: &UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .scan_json::<Order>(CF_ORDERS)?
            .into_iter()
            .filter(|order| &order.customer == customer)
            .collect();
        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .scan_json::<Order>(CF_ORDERS)?
            .into_iter()
            .filter(|order| order.order_status == status)
            .collect();
        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }
}

#[async_trait]
impl CartStore for RocksDBStore {
    async fn get(&self, customer: &UserId) -> Result<Option<Cart>> {
        self.get_json(CF_CARTS, customer.as_str().as_bytes())
    }

    async fn put(&self, cart: Cart) -> Result<()> {
        self.put_json(CF_CARTS, cart.customer.as_str().as_bytes(), &cart)
    }
}

#[async_trait]
impl ScheduleStore for RocksDBStore {
    async fn get_by_order(&self, order: OrderId) -> Result<Option<Schedule>> {
        self.get_json(CF_SCHEDULES, &order_key(order))
    }

    async fn put(&self, schedule: Schedule) -> Result<()> {
        self.put_json(CF_SCHEDULES, &order_key(schedule.order), &schedule)
    }

    async fn list_by_chef(&self, chef: &UserId) -> Result<Vec<Schedule>> {
        let mut schedules: Vec<Schedule> = self
            .scan_json::<Schedule>(CF_SCHEDULES)?
            .into_iter()
            .filter(|schedule| &schedule.chef == chef)
            .collect();
        schedules.sort_by_key(|schedule| schedule.date);
        Ok(schedules)
    }
}

#[async_trait]
impl PaymentIntentStore for RocksDBStore {
    async fn put(&self, intent: PaymentIntent) -> Result<()> {
        self.put_json(CF_INTENTS, intent.tx_ref.as_bytes(), &intent)
    }

    async fn get(&self, tx_ref: &str) -> Result<Option<PaymentIntent>> {
        self.get_json(CF_INTENTS, tx_ref.as_bytes())
    }
}

#[async_trait]
impl CustomerDirectory for RocksDBStore {
    async fn get(&self, customer: &UserId) -> Result<Option<CustomerProfile>> {
        self.get_json(CF_CUSTOMERS, customer.as_str().as_bytes())
    }

    async fn upsert(&self, profile: CustomerProfile) -> Result<()> {
        self.put_json(CF_CUSTOMERS, profile.id.as_str().as_bytes(), &profile)
    }

    async fn append_order_summary(&self, customer: &UserId, summary: OrderSummary) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = customer.as_str().as_bytes();
        let mut history: Vec<OrderSummary> =
            self.get_json(CF_ORDER_HISTORY, key)?.unwrap_or_default();
        history.push(summary);
        self.put_json(CF_ORDER_HISTORY, key, &history)
    }

    async fn order_summaries(&self, customer: &UserId) -> Result<Vec<OrderSummary>> {
        Ok(self
            .get_json(CF_ORDER_HISTORY, customer.as_str().as_bytes())?
            .unwrap_or_default())
    }
}
