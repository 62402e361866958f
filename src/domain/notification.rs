//! Email content for order events.
//!
//! Everything here is pure: given an order and its customer it returns the
//! subject and HTML body. Delivery is the dispatcher's job.

use super::money::Money;
use super::order::{Order, OrderStatus};
use super::role::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl CustomerProfile {
    /// Splits the display name into the first/last pair gateways ask for.
    pub fn name_parts(&self) -> (String, String) {
        let mut parts = self.name.split_whitespace();
        let first = parts.next().unwrap_or_default().to_string();
        let last = parts.collect::<Vec<_>>().join(" ");
        (first, last)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Subject and body for the email sent when an order enters `status`.
pub fn status_email(status: OrderStatus, order: &Order, customer: &CustomerProfile) -> Email {
    let short = order.id.short();
    let (subject, message) = match status {
        OrderStatus::Pending => (
            format!("Order #{short} received"),
            "We have received your order and are waiting for your deposit to clear.".to_string(),
        ),
        OrderStatus::Confirmed => (
            format!("Order #{short} confirmed"),
            format!(
                "Your order has been accepted. It is scheduled for delivery on {}.",
                order.delivery_date.format("%B %-d, %Y")
            ),
        ),
        OrderStatus::Preparing => (
            format!("Order #{short} is being prepared"),
            "Our kitchen has started preparing your order.".to_string(),
        ),
        OrderStatus::Ready => (
            format!("Order #{short} is ready"),
            "Your order is ready and will be on its way shortly.".to_string(),
        ),
        OrderStatus::Delivered => (
            format!("Order #{short} delivered"),
            "Your order has been delivered. Thank you for choosing us!".to_string(),
        ),
        OrderStatus::Cancelled => (
            format!("Order #{short} cancelled"),
            "Your order has been cancelled. Contact us if this is unexpected.".to_string(),
        ),
    };
    render(customer, subject, &short, status.label(), &message)
}

/// Fallback for free-form messages about an order.
pub fn custom_email(order: &Order, customer: &CustomerProfile, message: &str) -> Email {
    let short = order.id.short();
    render(
        customer,
        format!("Update on order #{short}"),
        &short,
        order.order_status.label(),
        &escape_html(message),
    )
}

/// Asks the customer to settle the remaining balance.
pub fn final_payment_email(
    order: &Order,
    customer: &CustomerProfile,
    amount: Money,
    currency: &str,
    checkout_url: &str,
) -> Email {
    let short = order.id.short();
    let currency = escape_html(currency);
    let checkout_url = escape_html(checkout_url);
    let message = format!(
        "Your order is ready. Please pay the remaining balance of {amount} {currency} \
         to complete it: <a href=\"{checkout_url}\">{checkout_url}</a>"
    );
    render(
        customer,
        format!("Final payment for order #{short}"),
        &short,
        order.order_status.label(),
        &message,
    )
}

/// `message_html` is inserted as is; everything else is escaped.
fn render(
    customer: &CustomerProfile,
    subject: String,
    short_id: &str,
    status_label: &str,
    message_html: &str,
) -> Email {
    let html_body = format!(
        "<p>Hello {name},</p>\
         <p>{message_html}</p>\
         <p><strong>Order:</strong> #{short_id}<br/>\
         <strong>Status:</strong> {status_label}</p>",
        name = escape_html(&customer.name),
    );
    Email {
        to: customer.email.clone(),
        subject,
        html_body,
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
