//! Hosted-checkout client for the Chapa payment API.

use crate::config::GatewayConfig;
use crate::domain::money::Amount;
use crate::domain::payment::{
    Checkout, CheckoutRequest, GatewayTxStatus, VerifiedPayment,
};
use crate::domain::ports::PaymentGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub struct ChapaGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    amount: Decimal,
    currency: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    tx_ref: &'a str,
    callback_url: &'a str,
    return_url: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: serde_json::Value,
    data: Option<T>,
}

#[derive(Deserialize)]
struct InitializeData {
    checkout_url: Option<String>,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
    amount: Decimal,
    tx_ref: String,
    #[serde(default, alias = "payment_method")]
    method: Option<String>,
}

impl ChapaGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let secret_key = config
            .secret_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(GatewayError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unreachable(format!("http client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("read body failed: {e}")))?;
        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }
        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if envelope.status != "success" {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: envelope.message.to_string(),
            });
        }
        Ok(envelope)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Unreachable(format!("request timed out: {err}"))
    } else {
        GatewayError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    #[instrument(name = "chapa_initialize", skip(self, request), fields(tx_ref = %request.tx_ref))]
    async fn initialize(&self, request: CheckoutRequest) -> Result<Checkout, GatewayError> {
        let body = InitializeBody {
            amount: request.amount.value(),
            currency: &request.currency,
            email: &request.payer.email,
            first_name: &request.payer.first_name,
            last_name: &request.payer.last_name,
            phone_number: request.payer.phone.as_deref(),
            tx_ref: &request.tx_ref,
            callback_url: &request.callback_url,
            return_url: &request.return_url,
        };
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: Envelope<InitializeData> = Self::read_envelope(response).await?;
        let checkout_url = envelope
            .data
            .and_then(|data| data.checkout_url)
            .filter(|url| !url.is_empty())
            .ok_or(GatewayError::MissingCheckoutUrl)?;

        Ok(Checkout {
            checkout_url,
            tx_ref: request.tx_ref,
        })
    }

    #[instrument(name = "chapa_verify", skip(self))]
    async fn verify(&self, tx_ref: &str) -> Result<VerifiedPayment, GatewayError> {
        let response = self
            .client
            .get(format!("{}/transaction/verify/{tx_ref}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        let envelope: Envelope<VerifyData> = Self::read_envelope(response).await?;
        let data = envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("verify response has no data".into()))?;
        let status = match data.status.to_ascii_lowercase().as_str() {
            "success" => GatewayTxStatus::Success,
            "pending" => GatewayTxStatus::Pending,
            _ => GatewayTxStatus::Failed,
        };
        let amount = Amount::new(data.amount)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(VerifiedPayment {
            tx_ref: data.tx_ref,
            amount,
            status,
            method: data.method.unwrap_or_else(|| "chapa".to_string()),
        })
    }
}

/// Stand-in used when no gateway credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn initialize(&self, _request: CheckoutRequest) -> Result<Checkout, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn verify(&self, _tx_ref: &str) -> Result<VerifiedPayment, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
