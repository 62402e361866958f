use crate::application::dispatch::NotificationDispatcher;
use crate::config::PaymentSettings;
use crate::domain::cart::CartStatus;
use crate::domain::money::{Amount, Money};
use crate::domain::notification::{self, CustomerProfile};
use crate::domain::order::{
    Address, LedgerOutcome, LineItem, NewOrder, Order, OrderId, OrderStatus, OrderType,
    RecordedBy,
};
use crate::domain::payment::{
    Checkout, CheckoutRequest, GatewayTxStatus, IntentState, Payer, PaymentIntent, PaymentKind,
    new_tx_ref,
};
use crate::domain::ports::{SharedClock, SharedNotifier, SharedPaymentGateway, Stores};
use crate::domain::role::{Principal, Role, UserId};
use crate::domain::schedule::{Schedule, ScheduleView};
use crate::error::{GatewayError, OrderError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

/// Minimum gap between placing a scheduled order and its delivery.
pub const SCHEDULED_LEAD_DAYS: i64 = 14;

/// Attempts for a read-modify-write on one order before giving up.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Checkout payload as submitted by a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceOrder {
    pub address: Option<Address>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub order_type: Option<OrderType>,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub deposit: Money,
    pub checkout_url: String,
    pub tx_ref: String,
}

/// What happened to the balance request issued on entering `ready`.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalPayment {
    NotRequired,
    Requested {
        amount: Money,
        checkout_url: String,
        tx_ref: String,
    },
    Failed {
        amount: Money,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order: Order,
    pub final_payment: FinalPayment,
}

/// A confirmed transaction to be written to an order's ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub order: OrderId,
    pub amount: Decimal,
    pub transaction_id: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    pub order: Order,
    pub outcome: LedgerOutcome,
}

/// One line of the gateway's settlement export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SettlementRow {
    pub tx_ref: String,
    pub amount: Decimal,
    pub method: String,
}

#[derive(Debug, Default)]
pub struct SettlementReport {
    pub applied: Vec<LedgerReceipt>,
    pub failures: Vec<(String, OrderError)>,
}

impl SettlementReport {
    /// The latest state of every order a row touched, in first-seen order.
    pub fn touched_orders(&self) -> Vec<&Order> {
        let mut seen: Vec<&Order> = Vec::new();
        for receipt in &self.applied {
            match seen.iter_mut().find(|order| order.id == receipt.order.id) {
                Some(slot) => {
                    if receipt.order.version >= slot.version {
                        *slot = &receipt.order;
                    }
                }
                None => seen.push(&receipt.order),
            }
        }
        seen
    }
}

enum Edit<T> {
    Changed(T),
    Unchanged(T),
}

/// The order lifecycle engine.
///
/// Owns order creation from a cart, the status state machine, the payment
/// ledger and schedule assignment. All I/O goes through the injected ports.
pub struct OrderService {
    stores: Stores,
    gateway: SharedPaymentGateway,
    dispatcher: NotificationDispatcher,
    clock: SharedClock,
    settings: PaymentSettings,
    placing: PlacementLocks,
}

/// Per-customer locks held while a cart is being turned into an order.
#[derive(Default)]
struct PlacementLocks {
    held: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl PlacementLocks {
    async fn acquire(&self, customer: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut held = self.held.lock().await;
            held.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(held.entry(customer.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

impl OrderService {
    pub fn new(
        stores: Stores,
        gateway: SharedPaymentGateway,
        notifier: SharedNotifier,
        clock: SharedClock,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            stores,
            gateway,
            dispatcher: NotificationDispatcher::new(notifier),
            clock,
            settings,
            placing: PlacementLocks::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Turns the customer's cart into an order and starts the deposit payment.
    ///
    /// Nothing is persisted unless the gateway hands back a checkout url.
    #[instrument(name = "place_order", skip(self, principal, request), fields(customer = %principal.id), err)]
    pub async fn place_order(&self, principal: &Principal, request: PlaceOrder) -> Result<PlacedOrder> {
        if principal.role != Role::Customer {
            return Err(OrderError::Forbidden(
                "only customers can place orders".to_string(),
            ));
        }
        let now = self.clock.now();
        let (address, delivery_date, order_type) = validate_request(request, now)?;

        let customer = &principal.id;
        // Held until the cart is handed off so one cart feeds one order.
        let _placing = self.placing.acquire(customer).await;
        let mut cart = self
            .stores
            .carts
            .get(customer)
            .await?
            .filter(|cart| cart.status == CartStatus::Active && !cart.is_empty())
            .ok_or(OrderError::EmptyCart)?;
        let profile = self.customer_profile(customer).await?;

        let items: Vec<LineItem> = cart.items.iter().map(LineItem::from).collect();
        let total = cart.subtotal;
        let deposit = total.deposit();
        let deposit_amount = deposit.to_amount()?;

        let order_id = OrderId::generate();
        let tx_ref = new_tx_ref(PaymentKind::Deposit);
        let checkout = self
            .initialize_checkout(&profile, deposit_amount, &tx_ref)
            .await
            .inspect_err(|e| {
                tracing::warn!(order = %order_id, error = %e, "deposit initialization failed");
            })?;

        self.stores
            .intents
            .put(PaymentIntent {
                tx_ref: tx_ref.clone(),
                order: order_id,
                amount: deposit_amount,
                kind: PaymentKind::Deposit,
                state: IntentState::Pending,
                created_at: now,
            })
            .await?;

        let order = Order::new(NewOrder {
            id: order_id,
            customer: customer.clone(),
            order_type,
            delivery_date,
            address,
            items,
            created_at: now,
        });
        // Order insert and cart hand-off are kept back to back.
        self.stores.orders.insert(order.clone()).await?;
        cart.mark_ordered(now);
        self.stores.carts.put(cart).await?;

        if let Err(e) = self
            .stores
            .customers
            .append_order_summary(customer, order.summary())
            .await
        {
            tracing::warn!(order = %order.id, error = %e, "previous-orders list not updated");
        }

        tracing::info!(
            target: "staff",
            order = %order.id,
            customer = %customer,
            total = %order.total_amount,
            order_type = ?order.order_type,
            "new order received"
        );

        Ok(PlacedOrder {
            order,
            deposit,
            checkout_url: checkout.checkout_url,
            tx_ref,
        })
    }

    /// Moves an order to the status named by `status` (case-insensitive).
    ///
    /// Entering `ready` with a balance outstanding also requests the final
    /// payment. That request may fail without undoing the transition.
    #[instrument(name = "update_status", skip(self, principal), fields(staff = %principal.id), err)]
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: OrderId,
        status: &str,
    ) -> Result<StatusUpdate> {
        if !principal.role.is_kitchen_staff() {
            return Err(OrderError::Forbidden(format!(
                "{} cannot change order status",
                principal.role
            )));
        }
        let next: OrderStatus = status.parse()?;

        let (order, ()) = self
            .mutate_order(order_id, |order| {
                order.transition_to(next, &principal.id, self.clock.now())?;
                Ok(Edit::Changed(()))
            })
            .await?;
        tracing::info!(order = %order.id, status = %next, "order status updated");

        let profile = self.notification_profile(&order).await;

        let final_payment = if next == OrderStatus::Ready && order.outstanding().is_positive() {
            self.request_final_payment(&order, profile.as_ref()).await
        } else {
            FinalPayment::NotRequired
        };

        if let Some(profile) = &profile {
            self.dispatcher
                .dispatch(order.id, notification::status_email(next, &order, profile))
                .await;
            if let FinalPayment::Requested {
                amount,
                checkout_url,
                ..
            } = &final_payment
            {
                let email = notification::final_payment_email(
                    &order,
                    profile,
                    *amount,
                    &self.settings.currency,
                    checkout_url,
                );
                self.dispatcher.dispatch(order.id, email).await;
            }
        }

        Ok(StatusUpdate {
            order,
            final_payment,
        })
    }

    /// Appends a confirmed payment to the order's ledger.
    ///
    /// A transaction id that is already in the ledger is acknowledged
    /// without counting it again.
    #[instrument(name = "record_payment", skip(self, confirmation), fields(order = %confirmation.order, tx = %confirmation.transaction_id), err)]
    pub async fn record_payment(
        &self,
        confirmation: PaymentConfirmation,
        recorded_by: RecordedBy,
    ) -> Result<LedgerReceipt> {
        let amount: Amount = confirmation.amount.try_into()?;
        if confirmation.transaction_id.trim().is_empty() {
            return Err(OrderError::Validation(
                "transaction id is required".to_string(),
            ));
        }

        let (order, outcome) = self
            .mutate_order(confirmation.order, |order| {
                let outcome = order.record_payment(
                    amount,
                    &confirmation.transaction_id,
                    &confirmation.method,
                    recorded_by.clone(),
                    self.clock.now(),
                );
                Ok(match outcome {
                    LedgerOutcome::Recorded => Edit::Changed(outcome),
                    LedgerOutcome::AlreadyRecorded => Edit::Unchanged(outcome),
                })
            })
            .await?;

        match outcome {
            LedgerOutcome::AlreadyRecorded => {
                tracing::info!(order = %order.id, tx = %confirmation.transaction_id, "payment already recorded");
            }
            LedgerOutcome::Recorded => {
                if order.paid_amount > order.total_amount {
                    tracing::warn!(
                        order = %order.id,
                        paid = %order.paid_amount,
                        total = %order.total_amount,
                        "order is overpaid"
                    );
                }
                self.mark_intent_confirmed(&confirmation.transaction_id).await;
                if let Some(profile) = self.notification_profile(&order).await {
                    let message = format!(
                        "We received your payment of {} {}. Paid so far: {} of {}.",
                        Money::from(amount),
                        self.settings.currency,
                        order.paid_amount,
                        order.total_amount
                    );
                    self.dispatcher
                        .dispatch(order.id, notification::custom_email(&order, &profile, &message))
                        .await;
                }
            }
        }

        Ok(LedgerReceipt { order, outcome })
    }

    /// Gateway callback: verifies `tx_ref` with the gateway and records it.
    #[instrument(name = "confirm_checkout", skip(self), err)]
    pub async fn confirm_checkout(&self, tx_ref: &str) -> Result<LedgerReceipt> {
        let intent = self
            .stores
            .intents
            .get(tx_ref)
            .await?
            .ok_or_else(|| OrderError::not_found("Payment", tx_ref))?;

        if intent.state == IntentState::Confirmed {
            let order = self.get_order(intent.order).await?;
            return Ok(LedgerReceipt {
                order,
                outcome: LedgerOutcome::AlreadyRecorded,
            });
        }

        let verified = self.bounded(self.gateway.verify(tx_ref)).await?;
        if verified.tx_ref != tx_ref {
            return Err(OrderError::Validation(format!(
                "gateway verified {} instead of {tx_ref}",
                verified.tx_ref
            )));
        }
        if verified.status != GatewayTxStatus::Success {
            return Err(OrderError::Validation(format!(
                "payment {tx_ref} is not complete ({:?})",
                verified.status
            )));
        }
        if verified.amount != intent.amount {
            tracing::warn!(
                tx = %tx_ref,
                expected = %intent.amount,
                verified = %verified.amount,
                "verified amount differs from requested amount"
            );
        }

        self.record_payment(
            PaymentConfirmation {
                order: intent.order,
                amount: verified.amount.value(),
                transaction_id: tx_ref.to_string(),
                method: verified.method,
            },
            RecordedBy::Gateway,
        )
        .await
    }

    /// Applies one settlement row through the ledger.
    pub async fn apply_settlement(&self, row: SettlementRow) -> Result<LedgerReceipt> {
        let intent = self
            .stores
            .intents
            .get(&row.tx_ref)
            .await?
            .ok_or_else(|| OrderError::not_found("Payment", &row.tx_ref))?;
        self.record_payment(
            PaymentConfirmation {
                order: intent.order,
                amount: row.amount,
                transaction_id: row.tx_ref,
                method: row.method,
            },
            RecordedBy::Settlement,
        )
        .await
    }

    /// Applies a settlement export. A failing row never stops the batch.
    pub async fn reconcile_settlement(
        &self,
        rows: impl IntoIterator<Item = SettlementRow>,
    ) -> SettlementReport {
        let mut report = SettlementReport::default();
        for row in rows {
            let tx_ref = row.tx_ref.clone();
            match self.apply_settlement(row).await {
                Ok(receipt) => report.applied.push(receipt),
                Err(e) => {
                    tracing::warn!(tx = %tx_ref, error = %e, "settlement row rejected");
                    report.failures.push((tx_ref, e));
                }
            }
        }
        report
    }

    /// Assigns an order to a chef for a date, creating or moving its schedule.
    #[instrument(name = "assign_schedule", skip(self, principal), fields(manager = %principal.id), err)]
    pub async fn assign_schedule(
        &self,
        principal: &Principal,
        order_id: OrderId,
        chef: UserId,
        date: DateTime<Utc>,
    ) -> Result<Schedule> {
        if !principal.role.can_assign_schedules() {
            return Err(OrderError::Forbidden(format!(
                "{} cannot assign schedules",
                principal.role
            )));
        }

        let (order, ()) = self
            .mutate_order(order_id, |order| {
                order.assigned_to_chef = Some(chef.clone());
                order.updated_at = self.clock.now();
                Ok(Edit::Changed(()))
            })
            .await?;

        let schedule = match self.stores.schedules.get_by_order(order.id).await? {
            Some(mut existing) => {
                existing.reassign(chef, date, principal.id.clone());
                existing
            }
            None => Schedule::new(chef, date, order.id, principal.id.clone()),
        };
        self.stores.schedules.put(schedule.clone()).await?;
        tracing::info!(order = %order.id, chef = %schedule.chef, date = %schedule.date, "order scheduled");
        Ok(schedule)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.stores
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("Order", order_id))
    }

    /// Authoritative list of a customer's orders, oldest first.
    pub async fn orders_for_customer(&self, customer: &UserId) -> Result<Vec<Order>> {
        self.stores.orders.list_by_customer(customer).await
    }

    pub async fn orders_by_status(
        &self,
        principal: &Principal,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        if !principal.role.is_kitchen_staff() {
            return Err(OrderError::Forbidden(format!(
                "{} cannot list orders by status",
                principal.role
            )));
        }
        self.stores.orders.list_by_status(status).await
    }

    pub async fn chef_schedule(&self, chef: &UserId) -> Result<Vec<ScheduleView>> {
        let mut views = Vec::new();
        for schedule in self.stores.schedules.list_by_chef(chef).await? {
            match self.stores.orders.get(schedule.order).await? {
                Some(order) => views.push(ScheduleView::new(schedule, order.order_status)),
                None => {
                    tracing::warn!(order = %schedule.order, "schedule points at a missing order");
                }
            }
        }
        Ok(views)
    }

    async fn request_final_payment(
        &self,
        order: &Order,
        profile: Option<&CustomerProfile>,
    ) -> FinalPayment {
        let amount = order.outstanding();
        let Some(profile) = profile else {
            tracing::warn!(order = %order.id, "no customer profile, final payment not requested");
            return FinalPayment::Failed {
                amount,
                reason: "customer profile not found".to_string(),
            };
        };

        let attempt = async {
            let payable = amount.to_amount()?;
            let tx_ref = new_tx_ref(PaymentKind::Final);
            let checkout = self.initialize_checkout(profile, payable, &tx_ref).await?;
            self.stores
                .intents
                .put(PaymentIntent {
                    tx_ref: tx_ref.clone(),
                    order: order.id,
                    amount: payable,
                    kind: PaymentKind::Final,
                    state: IntentState::Pending,
                    created_at: self.clock.now(),
                })
                .await?;
            Ok::<_, OrderError>(checkout)
        };

        match attempt.await {
            Ok(checkout) => {
                tracing::info!(order = %order.id, amount = %amount, tx = %checkout.tx_ref, "final payment requested");
                FinalPayment::Requested {
                    amount,
                    checkout_url: checkout.checkout_url,
                    tx_ref: checkout.tx_ref,
                }
            }
            Err(e) => {
                tracing::warn!(order = %order.id, amount = %amount, error = %e, "final payment request failed");
                FinalPayment::Failed {
                    amount,
                    reason: e.public_message(),
                }
            }
        }
    }

    async fn initialize_checkout(
        &self,
        profile: &CustomerProfile,
        amount: Amount,
        tx_ref: &str,
    ) -> Result<Checkout> {
        let (first_name, last_name) = profile.name_parts();
        let request = CheckoutRequest {
            amount,
            currency: self.settings.currency.clone(),
            payer: Payer {
                email: profile.email.clone(),
                first_name,
                last_name,
                phone: profile.phone.clone(),
            },
            tx_ref: tx_ref.to_string(),
            callback_url: self.settings.callback_url.clone(),
            return_url: self.settings.return_url.clone(),
        };
        let checkout = self.bounded(self.gateway.initialize(request)).await?;
        if checkout.checkout_url.trim().is_empty() {
            return Err(GatewayError::MissingCheckoutUrl.into());
        }
        Ok(checkout)
    }

    /// Runs a gateway call under the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, GatewayError>>,
    ) -> Result<T> {
        let limit = self.settings.gateway_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GatewayError::Timeout(limit).into()),
        }
    }

    async fn customer_profile(&self, customer: &UserId) -> Result<CustomerProfile> {
        self.stores
            .customers
            .get(customer)
            .await?
            .ok_or_else(|| OrderError::not_found("Customer", customer))
    }

    async fn notification_profile(&self, order: &Order) -> Option<CustomerProfile> {
        match self.stores.customers.get(&order.customer).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                tracing::warn!(order = %order.id, customer = %order.customer, "customer profile missing");
                None
            }
            Err(e) => {
                tracing::warn!(order = %order.id, error = %e, "customer lookup failed");
                None
            }
        }
    }

    async fn mark_intent_confirmed(&self, tx_ref: &str) {
        let result = async {
            if let Some(mut intent) = self.stores.intents.get(tx_ref).await? {
                intent.state = IntentState::Confirmed;
                self.stores.intents.put(intent).await?;
            }
            Ok::<_, OrderError>(())
        };
        if let Err(e) = result.await {
            tracing::warn!(tx = %tx_ref, error = %e, "payment intent not marked confirmed");
        }
    }

    /// Read-modify-write on one order, retried when another writer got in first.
    async fn mutate_order<T, F>(&self, order_id: OrderId, mut edit: F) -> Result<(Order, T)>
    where
        F: FnMut(&mut Order) -> Result<Edit<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut order = self.get_order(order_id).await?;
            match edit(&mut order)? {
                Edit::Unchanged(value) => return Ok((order, value)),
                Edit::Changed(value) => match self.stores.orders.update(order).await {
                    Ok(stored) => return Ok((stored, value)),
                    Err(OrderError::Conflict(id)) if attempt < MAX_WRITE_ATTEMPTS => {
                        tracing::warn!(order = %id, attempt, "concurrent order update, retrying");
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }
}

fn validate_request(
    request: PlaceOrder,
    now: DateTime<Utc>,
) -> Result<(Address, DateTime<Utc>, OrderType)> {
    let address = request
        .address
        .filter(|address| !address.text.trim().is_empty())
        .ok_or_else(|| OrderError::Validation("address is required".to_string()))?;
    let delivery_date = request
        .delivery_date
        .ok_or_else(|| OrderError::Validation("delivery date is required".to_string()))?;
    let order_type = request
        .order_type
        .ok_or_else(|| OrderError::Validation("type of order is required".to_string()))?;

    if order_type == OrderType::Scheduled
        && delivery_date <= now + TimeDelta::days(SCHEDULED_LEAD_DAYS)
    {
        return Err(OrderError::Validation(format!(
            "scheduled orders must be placed at least {SCHEDULED_LEAD_DAYS} days before delivery"
        )));
    }
    Ok((address, delivery_date, order_type))
}
