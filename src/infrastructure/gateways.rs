use crate::domain::clock::{SharedClock, system_clock};
use crate::domain::gateway::{Gateway, PaymentAdapter, PaymentResult};
use crate::domain::money::Amount;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Latency and failure characteristics of one simulated backend.
///
/// The stock profiles mirror the real gateways they stand in for: PayPal is
/// slow but reliable, Yape fast, Card slow with the highest decline rate.
#[derive(Debug, Clone)]
pub struct GatewayProfile {
    pub gateway: Gateway,
    pub process_latency: Duration,
    pub refund_latency: Duration,
    pub status_latency: Duration,
    /// Uniform random addition on top of each base latency.
    pub jitter: Duration,
    pub success_rate: f64,
    pub currency: &'static str,
    pub decline_message: &'static str,
}

impl GatewayProfile {
    pub fn paypal() -> Self {
        Self {
            gateway: Gateway::Paypal,
            process_latency: Duration::from_millis(1000),
            refund_latency: Duration::from_millis(800),
            status_latency: Duration::from_millis(500),
            jitter: Duration::from_millis(250),
            success_rate: 0.90,
            currency: "USD",
            decline_message: "PayPal authorization error",
        }
    }

    pub fn yape() -> Self {
        Self {
            gateway: Gateway::Yape,
            process_latency: Duration::from_millis(800),
            refund_latency: Duration::from_millis(700),
            status_latency: Duration::from_millis(400),
            jitter: Duration::from_millis(200),
            success_rate: 0.95,
            currency: "PEN",
            decline_message: "QR expired or insufficient funds",
        }
    }

    pub fn plin() -> Self {
        Self {
            gateway: Gateway::Plin,
            process_latency: Duration::from_millis(900),
            refund_latency: Duration::from_millis(750),
            status_latency: Duration::from_millis(450),
            jitter: Duration::from_millis(225),
            success_rate: 0.92,
            currency: "PEN",
            decline_message: "PLIN transfer error",
        }
    }

    pub fn card() -> Self {
        Self {
            gateway: Gateway::Card,
            process_latency: Duration::from_millis(1200),
            refund_latency: Duration::from_millis(1000),
            status_latency: Duration::from_millis(600),
            jitter: Duration::from_millis(300),
            success_rate: 0.85,
            currency: "USD",
            decline_message: "Card declined or insufficient funds",
        }
    }

    pub fn for_gateway(gateway: Gateway) -> Self {
        match gateway {
            Gateway::Paypal => Self::paypal(),
            Gateway::Yape => Self::yape(),
            Gateway::Plin => Self::plin(),
            Gateway::Card => Self::card(),
        }
    }

    /// Zeroes every latency so tests run without sleeping.
    pub fn instant(mut self) -> Self {
        self.process_latency = Duration::ZERO;
        self.refund_latency = Duration::ZERO;
        self.status_latency = Duration::ZERO;
        self.jitter = Duration::ZERO;
        self
    }

    /// Forces every call to succeed or decline deterministically.
    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = rate;
        self
    }
}

/// In-process stand-in for one settlement backend.
///
/// Each call sleeps for the profile latency plus a random jitter and then
/// rolls the profile's success probability. Randomness comes from an owned
/// RNG that tests can seed, and time from an injected clock.
pub struct SimulatedGateway {
    profile: GatewayProfile,
    rng: Mutex<StdRng>,
    clock: SharedClock,
}

impl SimulatedGateway {
    pub fn new(profile: GatewayProfile) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::from_entropy()),
            clock: system_clock(),
        }
    }

    pub fn seeded(profile: GatewayProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    async fn simulate_latency(&self, base: Duration) {
        let jitter_ms = self.profile.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.rng.lock().await.gen_range(0..=jitter_ms))
        };
        let delay = base + jitter;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn roll_success(&self) -> bool {
        self.rng.lock().await.r#gen::<f64>() < self.profile.success_rate
    }

    async fn new_transaction_id(&self, now: DateTime<Utc>) -> String {
        let mut rng = self.rng.lock().await;
        let suffix: String = std::iter::repeat_with(|| rng.sample(Alphanumeric))
            .take(9)
            .map(char::from)
            .collect();
        format!("{}_{}_{}", self.profile.gateway, now.timestamp_millis(), suffix)
    }
}

#[async_trait]
impl PaymentAdapter for SimulatedGateway {
    async fn process_payment(
        &self,
        amount: Amount,
        order_id: u32,
        metadata: Option<Value>,
    ) -> Result<PaymentResult> {
        self.simulate_latency(self.profile.process_latency).await;
        let now = self.clock.now();

        if self.roll_success().await {
            let currency = metadata
                .as_ref()
                .and_then(|m| m.get("currency"))
                .and_then(|c| c.as_str())
                .unwrap_or(self.profile.currency)
                .to_string();
            let transaction_id = self.new_transaction_id(now).await;
            debug!(
                gateway = %self.profile.gateway,
                order_id,
                %transaction_id,
                "payment authorized"
            );
            Ok(PaymentResult::approved(
                transaction_id,
                "COMPLETED",
                amount.value(),
                currency,
                now,
            ))
        } else {
            debug!(gateway = %self.profile.gateway, order_id, "payment declined");
            Ok(PaymentResult::failure(self.profile.decline_message, now))
        }
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: Option<Amount>,
    ) -> Result<PaymentResult> {
        self.simulate_latency(self.profile.refund_latency).await;
        let now = self.clock.now();
        Ok(PaymentResult {
            success: true,
            transaction_id: Some(format!("REFUND_{transaction_id}")),
            status: Some("REFUNDED".to_string()),
            amount: amount.map(|a| a.value()),
            currency: Some(self.profile.currency.to_string()),
            error: None,
            timestamp: now,
        })
    }

    async fn get_status(&self, transaction_id: &str) -> Result<PaymentResult> {
        self.simulate_latency(self.profile.status_latency).await;
        let now = self.clock.now();
        Ok(PaymentResult {
            success: true,
            transaction_id: Some(transaction_id.to_string()),
            status: Some("COMPLETED".to_string()),
            amount: None,
            currency: Some(self.profile.currency.to_string()),
            error: None,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount() -> Amount {
        Amount::new(dec!(100.00)).unwrap()
    }

    #[tokio::test]
    async fn test_always_successful_profile() {
        let gateway = SimulatedGateway::seeded(
            GatewayProfile::yape().instant().with_success_rate(1.0),
            42,
        );
        let result = gateway.process_payment(amount(), 1001, None).await.unwrap();

        assert!(result.success);
        assert_eq!(result.status.as_deref(), Some("COMPLETED"));
        assert_eq!(result.amount, Some(dec!(100.00)));
        assert_eq!(result.currency.as_deref(), Some("PEN"));
        assert!(result.transaction_id.unwrap().starts_with("YAPE_"));
    }

    #[tokio::test]
    async fn test_always_declining_profile() {
        let gateway = SimulatedGateway::seeded(
            GatewayProfile::card().instant().with_success_rate(0.0),
            42,
        );
        let result = gateway.process_payment(amount(), 1001, None).await.unwrap();

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Card declined or insufficient funds")
        );
        assert!(result.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_metadata_currency_override() {
        let gateway = SimulatedGateway::seeded(
            GatewayProfile::paypal().instant().with_success_rate(1.0),
            7,
        );
        let metadata = serde_json::json!({ "currency": "EUR" });
        let result = gateway
            .process_payment(amount(), 1001, Some(metadata))
            .await
            .unwrap();
        assert_eq!(result.currency.as_deref(), Some("EUR"));
    }

    #[tokio::test]
    async fn test_refund_always_succeeds() {
        let gateway = SimulatedGateway::seeded(
            GatewayProfile::plin().instant().with_success_rate(0.0),
            42,
        );
        let result = gateway
            .refund_payment("PLIN_123_abc", Some(amount()))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(
            result.transaction_id.as_deref(),
            Some("REFUND_PLIN_123_abc")
        );
        assert_eq!(result.status.as_deref(), Some("REFUNDED"));
    }

    #[tokio::test]
    async fn test_status_echoes_transaction() {
        let gateway =
            SimulatedGateway::seeded(GatewayProfile::yape().instant(), 42);
        let result = gateway.get_status("YAPE_123_abc").await.unwrap();
        assert!(result.success);
        assert_eq!(result.transaction_id.as_deref(), Some("YAPE_123_abc"));
    }
}
