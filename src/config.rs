use std::time::Duration;

pub const DEFAULT_CURRENCY: &str = "ETB";
pub const DEFAULT_GATEWAY_URL: &str = "https://api.chapa.co/v1";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(20);

const MIN_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for talking to the payment gateway on behalf of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    pub currency: String,
    pub callback_url: String,
    pub return_url: String,
    pub gateway_timeout: Duration,
}

impl PaymentSettings {
    pub fn new(
        currency: impl Into<String>,
        callback_url: impl Into<String>,
        return_url: impl Into<String>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            currency: currency.into(),
            callback_url: callback_url.into(),
            return_url: return_url.into(),
            gateway_timeout: clamp_timeout(gateway_timeout),
        }
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_CURRENCY,
            "http://localhost:8080/api/payments/callback",
            "http://localhost:3000/orders",
            DEFAULT_GATEWAY_TIMEOUT,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            secret_key: None,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

/// Keeps gateway calls bounded between 10 and 30 seconds.
pub fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.clamp(MIN_GATEWAY_TIMEOUT, MAX_GATEWAY_TIMEOUT)
}
