use crate::domain::order::{OrderId, OrderStatus};
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a payment gateway adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("payment gateway returned no checkout url")]
    MissingCheckoutUrl,
    #[error("payment gateway timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

/// Failures raised by a notifier. Never surfaced past the dispatcher.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification transport failed: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Payment initialization failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Order {0} was modified concurrently")]
    Conflict(OrderId),
    #[error("Internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl OrderError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(Box::new(std::io::Error::other(message.into())))
    }

    /// True for errors caused by the caller's input (400/404 class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::EmptyCart
                | Self::InvalidStatus(_)
                | Self::InvalidTransition { .. }
                | Self::NotFound { .. }
                | Self::Forbidden(_)
        )
    }

    /// Message safe to hand back to an end user.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for OrderError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<csv::Error> for OrderError {
    fn from(err: csv::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for OrderError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
