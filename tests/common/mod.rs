#![allow(dead_code)]

use async_trait::async_trait;
use catering_orders::application::cart::CartService;
use catering_orders::application::dispatch::NotificationDispatcher;
use catering_orders::application::orders::{OrderService, PlaceOrder, PlacedOrder};
use catering_orders::config::PaymentSettings;
use catering_orders::domain::cart::{MenuItemId, MenuItemSnapshot};
use catering_orders::domain::money::Amount;
use catering_orders::domain::notification::{CustomerProfile, Email};
use catering_orders::domain::order::{Address, OrderType};
use catering_orders::domain::payment::{
    Checkout, CheckoutRequest, GatewayTxStatus, VerifiedPayment,
};
use catering_orders::domain::ports::{Clock, Notifier, PaymentGateway, Stores};
use catering_orders::domain::role::{Principal, Role, UserId};
use catering_orders::error::{GatewayError, NotifyError};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Longer than any timeout the service applies.
pub const HANG: Duration = Duration::from_secs(3600);

pub const CUSTOMER: &str = "cust-1";
pub const CHEF: &str = "chef-1";
pub const MANAGER: &str = "manager-1";

/// Gateway double that remembers every checkout it was asked for.
#[derive(Default)]
pub struct RecordingGateway {
    pub requests: Mutex<Vec<CheckoutRequest>>,
    pub fail_initialize: AtomicBool,
    pub omit_checkout_url: AtomicBool,
    pub verify_status: Mutex<Option<GatewayTxStatus>>,
    pub initialize_delay: Mutex<Option<Duration>>,
}

impl RecordingGateway {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn amounts(&self) -> Vec<Decimal> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.amount.value())
            .collect()
    }

    pub fn fail(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    /// Makes `initialize` wait `delay` before answering.
    pub fn stall(&self, delay: Duration) {
        *self.initialize_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn initialize(&self, request: CheckoutRequest) -> Result<Checkout, GatewayError> {
        let tx_ref = request.tx_ref.clone();
        self.requests.lock().unwrap().push(request);
        let delay = *self.initialize_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("connection refused".into()));
        }
        let checkout_url = if self.omit_checkout_url.load(Ordering::SeqCst) {
            String::new()
        } else {
            format!("https://checkout.test/{tx_ref}")
        };
        Ok(Checkout {
            checkout_url,
            tx_ref,
        })
    }

    async fn verify(&self, tx_ref: &str) -> Result<VerifiedPayment, GatewayError> {
        let requests = self.requests.lock().unwrap();
        let request = requests
            .iter()
            .find(|request| request.tx_ref == tx_ref)
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: "Invalid transaction".into(),
            })?;
        let status = self
            .verify_status
            .lock()
            .unwrap()
            .unwrap_or(GatewayTxStatus::Success);
        Ok(VerifiedPayment {
            tx_ref: tx_ref.to_string(),
            amount: request.amount,
            status,
            method: "telebirr".into(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Email>>,
    pub fail: AtomicBool,
    pub hang: AtomicBool,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|email| email.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(HANG).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("smtp unavailable".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub service: OrderService,
    pub carts: CartService,
    pub stores: Stores,
    pub gateway: Arc<RecordingGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
}

pub fn harness() -> Harness {
    build_harness(|notifier| NotificationDispatcher::new(notifier))
}

/// Harness whose notifications give up after `send_timeout`.
pub fn harness_with_send_timeout(send_timeout: Duration) -> Harness {
    build_harness(|notifier| NotificationDispatcher::new(notifier).with_send_timeout(send_timeout))
}

fn build_harness(
    dispatcher: impl FnOnce(Arc<RecordingNotifier>) -> NotificationDispatcher,
) -> Harness {
    let stores = Stores::in_memory();
    let gateway = Arc::new(RecordingGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(FixedClock::at(start_time()));
    let service = OrderService::new(
        stores.clone(),
        gateway.clone(),
        notifier.clone(),
        clock.clone(),
        PaymentSettings::default(),
    )
    .with_dispatcher(dispatcher(notifier.clone()));
    let carts = CartService::new(stores.carts.clone(), clock.clone());
    Harness {
        service,
        carts,
        stores,
        gateway,
        notifier,
        clock,
    }
}

pub fn customer() -> Principal {
    Principal::new(CUSTOMER, Role::Customer)
}

pub fn chef() -> Principal {
    Principal::new(CHEF, Role::Chef)
}

pub fn manager() -> Principal {
    Principal::new(MANAGER, Role::CateringManager)
}

pub fn dish(id: &str, price: Decimal) -> MenuItemSnapshot {
    MenuItemSnapshot {
        id: MenuItemId::new(id),
        name: format!("Dish {id}"),
        unit_price: Amount::new(price).unwrap(),
    }
}

pub fn urgent_request(now: DateTime<Utc>) -> PlaceOrder {
    PlaceOrder {
        address: Some(Address {
            text: "Bole Road, Addis Ababa".into(),
            location: None,
        }),
        delivery_date: Some(now + TimeDelta::days(1)),
        order_type: Some(OrderType::Urgent),
    }
}

impl Harness {
    pub async fn seed_customer(&self, id: &str) {
        self.stores
            .customers
            .upsert(CustomerProfile {
                id: UserId::new(id),
                name: "Abebe Kebede".into(),
                email: format!("{id}@example.com"),
                phone: Some("+251911000000".into()),
            })
            .await
            .unwrap();
    }

    pub async fn fill_cart(&self, id: &str, unit_price: Decimal, quantity: u32) {
        self.carts
            .add_item(&UserId::new(id), dish("doro-wat", unit_price), quantity, None)
            .await
            .unwrap();
    }

    /// Seeds the default customer with a cart worth `unit_price * quantity`
    /// and places an urgent order for it.
    pub async fn place(&self, unit_price: Decimal, quantity: u32) -> PlacedOrder {
        self.seed_customer(CUSTOMER).await;
        self.fill_cart(CUSTOMER, unit_price, quantity).await;
        self.service
            .place_order(&customer(), urgent_request(self.clock.now()))
            .await
            .unwrap()
    }
}
