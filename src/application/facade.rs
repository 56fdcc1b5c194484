use crate::domain::clock::{SharedClock, system_clock};
use crate::domain::gateway::{Gateway, PaymentAdapterBox, PaymentResult};
use crate::domain::money::{Amount, round2};
use crate::infrastructure::gateways::{GatewayProfile, SimulatedGateway};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::{error, info, warn};

/// Enablement and registration of one gateway, as seen by callers.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct GatewayStatus {
    pub enabled: bool,
    pub registered: bool,
}

/// Single uniform entry point over the settlement backends.
///
/// The registry is fixed at construction; the enabled-set is mutable and
/// independent of it. Adapter faults never propagate: every call returns a
/// normalized `PaymentResult`.
pub struct PaymentFacade {
    adapters: HashMap<Gateway, PaymentAdapterBox>,
    enabled: RwLock<HashSet<Gateway>>,
    clock: SharedClock,
}

impl Default for PaymentFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentFacade {
    /// Registers the four simulated backends with their stock profiles,
    /// all enabled.
    pub fn new() -> Self {
        let adapters: HashMap<Gateway, PaymentAdapterBox> = Gateway::ALL
            .into_iter()
            .map(|gateway| {
                let adapter: PaymentAdapterBox =
                    Box::new(SimulatedGateway::new(GatewayProfile::for_gateway(gateway)));
                (gateway, adapter)
            })
            .collect();
        Self::with_adapters(adapters)
    }

    /// Builds a facade over an explicit adapter registry. The enabled-set
    /// starts with every gateway identifier, registered or not; enablement
    /// and registration are independent. Tests use this to inject
    /// deterministic adapters.
    pub fn with_adapters(adapters: HashMap<Gateway, PaymentAdapterBox>) -> Self {
        let enabled = Gateway::ALL.into_iter().collect();
        Self {
            adapters,
            enabled: RwLock::new(enabled),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Dispatches a payment to the requested gateway.
    ///
    /// The enablement check happens exactly once, at admission: toggling the
    /// gateway afterwards does not affect a call already in flight. Disabled
    /// and unregistered gateways fail without the adapter being invoked.
    pub async fn process_payment(
        &self,
        gateway: Gateway,
        amount: Amount,
        order_id: u32,
        metadata: Option<Value>,
    ) -> PaymentResult {
        if !self.is_gateway_enabled(gateway) {
            warn!(%gateway, order_id, "payment rejected: gateway disabled");
            return PaymentResult::failure(
                format!("gateway {gateway} is disabled"),
                self.clock.now(),
            );
        }
        let Some(adapter) = self.adapters.get(&gateway) else {
            return PaymentResult::failure(
                format!("gateway {gateway} is not supported"),
                self.clock.now(),
            );
        };

        info!(%gateway, order_id, amount = %amount.value(), "processing payment");
        match adapter.process_payment(amount, order_id, metadata).await {
            Ok(result) => {
                if result.success {
                    info!(
                        %gateway,
                        order_id,
                        transaction_id = result.transaction_id.as_deref().unwrap_or(""),
                        "payment succeeded"
                    );
                } else {
                    warn!(
                        %gateway,
                        order_id,
                        error = result.error.as_deref().unwrap_or(""),
                        "payment declined"
                    );
                }
                result
            }
            Err(err) => {
                error!(%gateway, order_id, %err, "gateway fault");
                PaymentResult::failure(format!("connection error: {err}"), self.clock.now())
            }
        }
    }

    /// Refunds skip the enablement check: they reference a prior transaction
    /// and remain allowed after a gateway is disabled.
    pub async fn refund_payment(
        &self,
        gateway: Gateway,
        transaction_id: &str,
        amount: Option<Amount>,
    ) -> PaymentResult {
        let Some(adapter) = self.adapters.get(&gateway) else {
            return PaymentResult::failure(
                format!("gateway {gateway} is not supported"),
                self.clock.now(),
            );
        };

        info!(%gateway, transaction_id, "processing refund");
        match adapter.refund_payment(transaction_id, amount).await {
            Ok(result) => result,
            Err(err) => {
                error!(%gateway, transaction_id, %err, "gateway fault");
                PaymentResult::failure(format!("connection error: {err}"), self.clock.now())
            }
        }
    }

    /// Status checks skip the enablement check, like refunds.
    pub async fn get_status(&self, gateway: Gateway, transaction_id: &str) -> PaymentResult {
        let Some(adapter) = self.adapters.get(&gateway) else {
            return PaymentResult::failure(
                format!("gateway {gateway} is not supported"),
                self.clock.now(),
            );
        };

        match adapter.get_status(transaction_id).await {
            Ok(result) => result,
            Err(err) => {
                error!(%gateway, transaction_id, %err, "gateway fault");
                PaymentResult::failure(format!("connection error: {err}"), self.clock.now())
            }
        }
    }

    pub fn enable_gateway(&self, gateway: Gateway) {
        let mut enabled = self.enabled.write().unwrap_or_else(|e| e.into_inner());
        if enabled.insert(gateway) {
            info!(%gateway, "gateway enabled");
        }
    }

    pub fn disable_gateway(&self, gateway: Gateway) {
        let mut enabled = self.enabled.write().unwrap_or_else(|e| e.into_inner());
        if enabled.remove(&gateway) {
            info!(%gateway, "gateway disabled");
        }
    }

    pub fn is_gateway_enabled(&self, gateway: Gateway) -> bool {
        self.enabled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&gateway)
    }

    /// Registered gateways that are currently enabled, in declaration order.
    pub fn available_gateways(&self) -> Vec<Gateway> {
        Gateway::ALL
            .into_iter()
            .filter(|g| self.adapters.contains_key(g) && self.is_gateway_enabled(*g))
            .collect()
    }

    pub fn gateway_status(&self, gateway: Gateway) -> GatewayStatus {
        GatewayStatus {
            enabled: self.is_gateway_enabled(gateway),
            registered: self.adapters.contains_key(&gateway),
        }
    }

    /// Fixed per-gateway fee rate.
    pub fn fee_rate(&self, gateway: Gateway) -> Decimal {
        match gateway {
            Gateway::Paypal => Decimal::new(29, 3), // 2.9%
            Gateway::Yape => Decimal::new(10, 3),   // 1%
            Gateway::Plin => Decimal::new(15, 3),   // 1.5%
            Gateway::Card => Decimal::new(25, 3),   // 2.5%
        }
    }

    pub fn calculate_processing_fee(&self, gateway: Gateway, amount: Decimal) -> Decimal {
        round2(amount * self.fee_rate(gateway))
    }

    pub fn calculate_net_amount(&self, gateway: Gateway, amount: Decimal) -> Decimal {
        round2(amount - self.calculate_processing_fee(gateway, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::PaymentAdapter;
    use crate::error::{Result, WorkflowError};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter that counts invocations and always approves.
    struct CountingAdapter {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PaymentAdapter for CountingAdapter {
        async fn process_payment(
            &self,
            amount: Amount,
            _order_id: u32,
            _metadata: Option<Value>,
        ) -> Result<PaymentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentResult::approved(
                "TEST_1".to_string(),
                "COMPLETED",
                amount.value(),
                "USD".to_string(),
                Utc::now(),
            ))
        }

        async fn refund_payment(
            &self,
            transaction_id: &str,
            _amount: Option<Amount>,
        ) -> Result<PaymentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentResult {
                success: true,
                transaction_id: Some(format!("REFUND_{transaction_id}")),
                status: Some("REFUNDED".to_string()),
                amount: None,
                currency: None,
                error: None,
                timestamp: Utc::now(),
            })
        }

        async fn get_status(&self, transaction_id: &str) -> Result<PaymentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentResult {
                success: true,
                transaction_id: Some(transaction_id.to_string()),
                status: Some("COMPLETED".to_string()),
                amount: None,
                currency: None,
                error: None,
                timestamp: Utc::now(),
            })
        }
    }

    /// Adapter whose every call is a connection-level fault.
    struct FaultyAdapter;

    #[async_trait]
    impl PaymentAdapter for FaultyAdapter {
        async fn process_payment(
            &self,
            _amount: Amount,
            _order_id: u32,
            _metadata: Option<Value>,
        ) -> Result<PaymentResult> {
            Err(WorkflowError::Io(std::io::Error::other("socket reset")))
        }

        async fn refund_payment(
            &self,
            _transaction_id: &str,
            _amount: Option<Amount>,
        ) -> Result<PaymentResult> {
            Err(WorkflowError::Io(std::io::Error::other("socket reset")))
        }

        async fn get_status(&self, _transaction_id: &str) -> Result<PaymentResult> {
            Err(WorkflowError::Io(std::io::Error::other("socket reset")))
        }
    }

    fn counting_facade(gateway: Gateway) -> (PaymentFacade, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut adapters: HashMap<Gateway, PaymentAdapterBox> = HashMap::new();
        adapters.insert(
            gateway,
            Box::new(CountingAdapter {
                calls: calls.clone(),
            }),
        );
        (PaymentFacade::with_adapters(adapters), calls)
    }

    fn amount() -> Amount {
        Amount::new(dec!(100.00)).unwrap()
    }

    #[tokio::test]
    async fn test_disabled_gateway_short_circuits() {
        let (facade, calls) = counting_facade(Gateway::Paypal);
        facade.disable_gateway(Gateway::Paypal);

        let result = facade
            .process_payment(Gateway::Paypal, amount(), 1001, None)
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("gateway PAYPAL is disabled"));
        // The adapter was never invoked.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_gateway() {
        let (facade, _calls) = counting_facade(Gateway::Paypal);
        let result = facade
            .process_payment(Gateway::Yape, amount(), 1001, None)
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("gateway YAPE is not supported"));
    }

    #[tokio::test]
    async fn test_reenabled_gateway_processes_again() {
        let (facade, calls) = counting_facade(Gateway::Card);
        facade.disable_gateway(Gateway::Card);
        facade.enable_gateway(Gateway::Card);

        let result = facade
            .process_payment(Gateway::Card, amount(), 1001, None)
            .await;
        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fault_becomes_failure_result() {
        let mut adapters: HashMap<Gateway, PaymentAdapterBox> = HashMap::new();
        adapters.insert(Gateway::Plin, Box::new(FaultyAdapter));
        let facade = PaymentFacade::with_adapters(adapters);

        let result = facade
            .process_payment(Gateway::Plin, amount(), 1001, None)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("connection error:"));
    }

    #[tokio::test]
    async fn test_refund_ignores_enablement() {
        let (facade, calls) = counting_facade(Gateway::Yape);
        facade.disable_gateway(Gateway::Yape);

        let result = facade
            .refund_payment(Gateway::Yape, "YAPE_1_abc", Some(amount()))
            .await;
        assert!(result.success);
        assert_eq!(result.transaction_id.as_deref(), Some("REFUND_YAPE_1_abc"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_ignores_enablement() {
        let (facade, calls) = counting_facade(Gateway::Yape);
        facade.disable_gateway(Gateway::Yape);

        let result = facade.get_status(Gateway::Yape, "YAPE_1_abc").await;
        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fee_schedule() {
        let facade = PaymentFacade::new();
        assert_eq!(
            facade.calculate_processing_fee(Gateway::Yape, dec!(1000)),
            dec!(10.00)
        );
        assert_eq!(
            facade.calculate_net_amount(Gateway::Yape, dec!(1000)),
            dec!(990.00)
        );
        assert_eq!(
            facade.calculate_processing_fee(Gateway::Paypal, dec!(100)),
            dec!(2.90)
        );
        assert_eq!(
            facade.calculate_processing_fee(Gateway::Plin, dec!(100)),
            dec!(1.50)
        );
        assert_eq!(
            facade.calculate_processing_fee(Gateway::Card, dec!(100)),
            dec!(2.50)
        );
    }

    #[test]
    fn test_available_gateways_and_status() {
        let facade = PaymentFacade::new();
        assert_eq!(facade.available_gateways().len(), 4);

        facade.disable_gateway(Gateway::Plin);
        let available = facade.available_gateways();
        assert_eq!(available.len(), 3);
        assert!(!available.contains(&Gateway::Plin));

        assert_eq!(
            facade.gateway_status(Gateway::Plin),
            GatewayStatus {
                enabled: false,
                registered: true,
            }
        );
    }
}
