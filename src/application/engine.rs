use crate::application::facade::PaymentFacade;
use crate::application::invoker::CommandInvoker;
use crate::domain::clock::SharedClock;
use crate::domain::command::{
    AddItemCommand, ApplyDiscountCommand, CreateOrderCommand, RemoveOrderCommand,
    UpdateStatusCommand, WorkflowState,
};
use crate::domain::gateway::{Gateway, PaymentRecord, PaymentResult};
use crate::domain::money::Amount;
use crate::domain::observer::InventoryObserver;
use crate::domain::order::{Order, OrderItem, OrderStats, OrderStatus, PaymentStatus};
use crate::domain::pricing::PricingContext;
use crate::domain::product::Product;
use crate::error::{Result, WorkflowError};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Capacities for the bounded histories.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    pub history_limit: usize,
    pub snapshot_limit: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history_limit: CommandInvoker::DEFAULT_HISTORY_LIMIT,
            snapshot_limit: crate::domain::memento::OrderCaretaker::DEFAULT_LIMIT,
        }
    }
}

/// The main entry point for the order workflow.
///
/// Owns the mutable state, the command invoker, the pricing context, the
/// payment facade and the payment ledger. Every order mutation goes through
/// a reversible command; payments go through the facade and are recorded in
/// the ledger but are not undoable.
pub struct OrderWorkflow {
    state: WorkflowState,
    invoker: CommandInvoker,
    pricing: PricingContext,
    payments: PaymentFacade,
    ledger: Vec<PaymentRecord>,
    next_payment_id: u32,
}

impl Default for OrderWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderWorkflow {
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig::default())
    }

    pub fn with_config(config: WorkflowConfig) -> Self {
        Self {
            state: WorkflowState::with_snapshot_limit(config.snapshot_limit),
            invoker: CommandInvoker::with_limit(config.history_limit),
            pricing: PricingContext::new(),
            payments: PaymentFacade::new(),
            ledger: Vec::new(),
            next_payment_id: 0,
        }
    }

    pub fn with_payment_facade(mut self, facade: PaymentFacade) -> Self {
        self.payments = facade;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.state = self.state.with_clock(clock);
        self
    }

    pub fn add_product(&mut self, product: Product) {
        self.state.inventory.insert(product);
    }

    pub fn attach_low_stock_observer(&mut self, observer: Arc<dyn InventoryObserver>) {
        self.state.low_stock.attach(observer);
    }

    pub fn detach_low_stock_observer(&mut self, observer: &Arc<dyn InventoryObserver>) {
        self.state.low_stock.detach(observer);
    }

    /// Creates and executes an order from (product id, quantity) lines.
    ///
    /// The total is computed through the active pricing strategy once, here;
    /// later strategy changes never retroactively reprice the order.
    pub fn create_order(
        &mut self,
        customer_name: &str,
        customer_email: &str,
        lines: &[(u32, u32)],
    ) -> Result<u32> {
        if customer_name.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "customer name is required".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(WorkflowError::Validation(
                "an order needs at least one line".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(lines.len());
        for &(product_id, quantity) in lines {
            if quantity == 0 {
                return Err(WorkflowError::Validation(
                    "quantity must be at least 1".to_string(),
                ));
            }
            let product = self
                .state
                .inventory
                .get(product_id)
                .ok_or_else(|| WorkflowError::NotFound(format!("product #{product_id}")))?;
            items.push(OrderItem::new(
                product.id,
                product.name.clone(),
                quantity,
                product.price,
            ));
        }

        let id = self.state.orders.allocate_id();
        let now = self.state.clock.now();
        let mut order = Order::new(
            id,
            customer_name.to_string(),
            customer_email.to_string(),
            items,
            now,
        );
        let total = self.pricing.calculate_price(order.subtotal);
        order.discount = order.subtotal - total;
        order.total = total;

        let command = CreateOrderCommand::new(&self.state, order)?;
        self.invoker.execute(Box::new(command), &mut self.state)?;
        Ok(id)
    }

    pub fn add_item(&mut self, order_id: u32, product_id: u32, quantity: u32) -> Result<()> {
        let command = AddItemCommand::new(&self.state, order_id, product_id, quantity)?;
        self.invoker.execute(Box::new(command), &mut self.state)
    }

    pub fn update_status(&mut self, order_id: u32, status: OrderStatus) -> Result<()> {
        let command = UpdateStatusCommand::new(&self.state.orders, order_id, status)?;
        self.invoker.execute(Box::new(command), &mut self.state)
    }

    pub fn cancel_order(&mut self, order_id: u32) -> Result<()> {
        self.update_status(order_id, OrderStatus::Cancelled)
    }

    pub fn apply_discount(&mut self, order_id: u32, percentage: Decimal) -> Result<()> {
        let command = ApplyDiscountCommand::new(&self.state.orders, order_id, percentage)?;
        self.invoker.execute(Box::new(command), &mut self.state)
    }

    pub fn remove_order(&mut self, order_id: u32) -> Result<()> {
        let command = RemoveOrderCommand::new(&self.state.orders, order_id)?;
        self.invoker.execute(Box::new(command), &mut self.state)
    }

    pub fn undo(&mut self) -> Result<bool> {
        self.invoker.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.invoker.redo(&mut self.state)
    }

    pub fn can_undo(&self) -> bool {
        self.invoker.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.invoker.can_redo()
    }

    pub fn command_history(&self) -> Vec<String> {
        self.invoker.command_history()
    }

    /// Replaces the live order with the snapshot at `index`. The restore is
    /// not a command and does not enter the undo stack; the caretaker
    /// history itself is left untouched.
    pub fn restore_order(&mut self, order_id: u32, index: usize) -> Result<()> {
        let restored = self.state.caretaker.restore_state(order_id, index)?;
        let order = self
            .state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))?;
        *order = restored;
        info!(order_id, index, "order restored from snapshot");
        Ok(())
    }

    pub fn order_history_summary(&self, order_id: u32) -> Vec<String> {
        self.state.caretaker.history_summary(order_id)
    }

    /// Charges the order's current total through the facade. The outcome is
    /// recorded in the ledger with the fee figures, and the order's payment
    /// status becomes Paid or Failed.
    pub async fn pay_order(
        &mut self,
        order_id: u32,
        gateway: Gateway,
        metadata: Option<Value>,
    ) -> Result<PaymentResult> {
        let order = self
            .state
            .orders
            .get(order_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(WorkflowError::Validation(format!(
                "order #{order_id} is already paid"
            )));
        }
        let charged = order.total;
        let amount = Amount::new(charged)?;

        let result = self
            .payments
            .process_payment(gateway, amount, order_id, metadata)
            .await;

        self.next_payment_id += 1;
        self.ledger.push(PaymentRecord {
            id: self.next_payment_id,
            order_id,
            gateway,
            amount: charged,
            processing_fee: self.payments.calculate_processing_fee(gateway, charged),
            net_amount: self.payments.calculate_net_amount(gateway, charged),
            status: if result.success {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Failed
            },
            transaction_id: result.transaction_id.clone(),
            currency: result.currency.clone(),
            timestamp: result.timestamp,
        });

        let now = self.state.clock.now();
        if let Some(order) = self.state.orders.get_mut(order_id) {
            order.payment_status = if result.success {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Failed
            };
            order.touch(now);
        }
        Ok(result)
    }

    /// Refunds the most recent successful payment of the order through the
    /// gateway that took it.
    pub async fn refund_order(&mut self, order_id: u32) -> Result<PaymentResult> {
        let order = self
            .state
            .orders
            .get(order_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(WorkflowError::Validation(format!(
                "order #{order_id} has no payment to refund"
            )));
        }

        let record_index = self
            .ledger
            .iter()
            .rposition(|r| r.order_id == order_id && r.status == PaymentStatus::Paid)
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("payment record for order #{order_id}"))
            })?;
        let (gateway, transaction_id, amount) = {
            let record = &self.ledger[record_index];
            let transaction_id = record.transaction_id.clone().ok_or_else(|| {
                WorkflowError::NotFound(format!("transaction id for order #{order_id}"))
            })?;
            (record.gateway, transaction_id, record.amount)
        };

        let result = self
            .payments
            .refund_payment(gateway, &transaction_id, Amount::new(amount).ok())
            .await;

        if result.success {
            self.ledger[record_index].status = PaymentStatus::Refunded;
            let now = self.state.clock.now();
            if let Some(order) = self.state.orders.get_mut(order_id) {
                order.payment_status = PaymentStatus::Refunded;
                order.touch(now);
            }
        }
        Ok(result)
    }

    pub fn order(&self, order_id: u32) -> Option<&Order> {
        self.state.orders.get(order_id)
    }

    pub fn stats(&self) -> OrderStats {
        self.state.orders.stats()
    }

    pub fn payment_ledger(&self) -> &[PaymentRecord] {
        &self.ledger
    }

    pub fn pricing(&self) -> &PricingContext {
        &self.pricing
    }

    pub fn pricing_mut(&mut self) -> &mut PricingContext {
        &mut self.pricing
    }

    pub fn payments(&self) -> &PaymentFacade {
        &self.payments
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WorkflowState {
        &mut self.state
    }

    /// Consumes the workflow and returns the final orders, insertion order
    /// preserved.
    pub fn into_orders(self) -> Vec<Order> {
        self.state.orders.into_orders()
    }
}
