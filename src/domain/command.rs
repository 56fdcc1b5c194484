use crate::domain::clock::{SharedClock, system_clock};
use crate::domain::memento::OrderCaretaker;
use crate::domain::money::round2;
use crate::domain::observer::InventorySubject;
use crate::domain::order::{Order, OrderBook, OrderItem, OrderStatus};
use crate::domain::product::{ProductInventory, StockChange};
use crate::error::{Result, WorkflowError};
use rust_decimal::Decimal;

/// The mutable state every command runs against: the order book, the product
/// inventory, the snapshot caretaker and the low-stock subject.
///
/// Commands receive it by reference instead of closing over shared handles,
/// so there is exactly one owner and no hidden process-wide state.
pub struct WorkflowState {
    pub orders: OrderBook,
    pub inventory: ProductInventory,
    pub caretaker: OrderCaretaker,
    pub low_stock: InventorySubject,
    pub clock: SharedClock,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            orders: OrderBook::new(),
            inventory: ProductInventory::new(),
            caretaker: OrderCaretaker::new(),
            low_stock: InventorySubject::new(),
            clock: system_clock(),
        }
    }

    pub fn with_snapshot_limit(limit: usize) -> Self {
        Self {
            caretaker: OrderCaretaker::with_limit(limit),
            ..Self::new()
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.caretaker = self.caretaker.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    fn order_mut(&mut self, order_id: u32) -> Result<&mut Order> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))
    }

    fn take_stock_and_alert(&mut self, product_id: u32, quantity: u32) -> Result<StockChange> {
        let product = self
            .inventory
            .get_mut(product_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("product #{product_id}")))?;
        let change = product.take_stock(quantity)?;
        let (name, min_stock) = (product.name.clone(), product.min_stock);
        if change.crosses_below(min_stock) {
            self.low_stock
                .notify(product_id, &name, change.after, min_stock);
        }
        Ok(change)
    }

    fn restock(&mut self, product_id: u32, quantity: u32) {
        // Restocking never fires the threshold notification: only strictly
        // decreasing crossings alert.
        if let Some(product) = self.inventory.get_mut(product_id) {
            product.restock(quantity);
        }
    }

    fn snapshot(&mut self, order_id: u32, description: String) {
        if let Some(order) = self.orders.get(order_id) {
            self.caretaker.save_state(order, Some(description));
        }
    }
}

/// A reversible unit of order mutation.
///
/// The undo payload is captured at construction, before the forward mutation
/// runs. Each command does its own book-keeping (`updated_at`, snapshot
/// capture, threshold notification); the invoker only sequences commands.
pub trait OrderCommand: Send {
    fn execute(&mut self, state: &mut WorkflowState) -> Result<()>;
    fn undo(&mut self, state: &mut WorkflowState) -> Result<()>;
    fn description(&self) -> String;
}

/// Inserts a fully built order into the book and takes stock for its lines.
/// Undo removes the order and restocks every line.
pub struct CreateOrderCommand {
    order: Order,
}

impl CreateOrderCommand {
    /// The order must already be priced; stock sufficiency is checked here,
    /// before the command is handed to the invoker.
    pub fn new(state: &WorkflowState, order: Order) -> Result<Self> {
        for item in &order.items {
            let product = state.inventory.get(item.product_id).ok_or_else(|| {
                WorkflowError::NotFound(format!("product #{}", item.product_id))
            })?;
            if product.stock < item.quantity {
                return Err(WorkflowError::Validation(format!(
                    "insufficient stock for product #{}: {} requested, {} available",
                    product.id, item.quantity, product.stock
                )));
            }
        }
        Ok(Self { order })
    }
}

impl OrderCommand for CreateOrderCommand {
    fn execute(&mut self, state: &mut WorkflowState) -> Result<()> {
        state.orders.insert(self.order.clone());
        for item in &self.order.items {
            state.take_stock_and_alert(item.product_id, item.quantity)?;
        }
        state.snapshot(self.order.id, format!("order #{} created", self.order.id));
        Ok(())
    }

    fn undo(&mut self, state: &mut WorkflowState) -> Result<()> {
        for item in &self.order.items {
            state.restock(item.product_id, item.quantity);
        }
        state
            .orders
            .remove(self.order.id)
            .map(|_| ())
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{}", self.order.id)))
    }

    fn description(&self) -> String {
        format!(
            "create order #{} for {}",
            self.order.id, self.order.customer_name
        )
    }
}

/// Removes an order from the book; undo reinserts the captured copy.
/// Stock is left alone: removal is book-keeping, not a return.
pub struct RemoveOrderCommand {
    removed: Order,
}

impl RemoveOrderCommand {
    pub fn new(orders: &OrderBook, order_id: u32) -> Result<Self> {
        let removed = orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))?;
        Ok(Self { removed })
    }
}

impl OrderCommand for RemoveOrderCommand {
    fn execute(&mut self, state: &mut WorkflowState) -> Result<()> {
        state
            .orders
            .remove(self.removed.id)
            .map(|_| ())
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{}", self.removed.id)))
    }

    fn undo(&mut self, state: &mut WorkflowState) -> Result<()> {
        state.orders.insert(self.removed.clone());
        Ok(())
    }

    fn description(&self) -> String {
        format!("remove order #{}", self.removed.id)
    }
}

pub struct UpdateStatusCommand {
    order_id: u32,
    new_status: OrderStatus,
    old_status: OrderStatus,
}

impl UpdateStatusCommand {
    pub fn new(orders: &OrderBook, order_id: u32, new_status: OrderStatus) -> Result<Self> {
        let order = orders
            .get(order_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))?;
        Ok(Self {
            order_id,
            new_status,
            old_status: order.status,
        })
    }
}

impl OrderCommand for UpdateStatusCommand {
    fn execute(&mut self, state: &mut WorkflowState) -> Result<()> {
        let now = state.clock.now();
        let order = state.order_mut(self.order_id)?;
        order.status = self.new_status;
        order.touch(now);
        state.snapshot(
            self.order_id,
            format!("status changed to {}", self.new_status),
        );
        Ok(())
    }

    fn undo(&mut self, state: &mut WorkflowState) -> Result<()> {
        let now = state.clock.now();
        let order = state.order_mut(self.order_id)?;
        order.status = self.old_status;
        order.touch(now);
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "change order #{} status from \"{}\" to \"{}\"",
            self.order_id, self.old_status, self.new_status
        )
    }
}

pub struct ApplyDiscountCommand {
    order_id: u32,
    percentage: Decimal,
    old_total: Decimal,
    old_discount: Decimal,
}

impl ApplyDiscountCommand {
    pub fn new(orders: &OrderBook, order_id: u32, percentage: Decimal) -> Result<Self> {
        if percentage < Decimal::ZERO || percentage > Decimal::from(100) {
            return Err(WorkflowError::Validation(format!(
                "discount percentage must be between 0 and 100, got {percentage}"
            )));
        }
        let order = orders
            .get(order_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("order #{order_id}")))?;
        Ok(Self {
            order_id,
            percentage,
            old_total: order.total,
            old_discount: order.discount,
        })
    }
}

impl OrderCommand for ApplyDiscountCommand {
    fn execute(&mut self, state: &mut WorkflowState) -> Result<()> {
        let now = state.clock.now();
        let order = state.order_mut(self.order_id)?;
        order.discount = round2(order.subtotal * self.percentage / Decimal::from(100));
        order.total = order.subtotal - order.discount;
        order.touch(now);
        state.snapshot(
            self.order_id,
            format!("{}% discount applied", self.percentage),
        );
        Ok(())
    }

    fn undo(&mut self, state: &mut WorkflowState) -> Result<()> {
        let now = state.clock.now();
        let order = state.order_mut(self.order_id)?;
        order.discount = self.old_discount;
        order.total = self.old_total;
        order.touch(now);
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "apply {}% discount to order #{}",
            self.percentage, self.order_id
        )
    }
}

/// Appends a line item to an existing order and takes the stock for it.
/// Undo removes the line, restores the totals and restocks.
pub struct AddItemCommand {
    order_id: u32,
    item: OrderItem,
}

impl AddItemCommand {
    pub fn new(state: &WorkflowState, order_id: u32, product_id: u32, quantity: u32) -> Result<Self> {
        if quantity == 0 {
            return Err(WorkflowError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        if !state.orders.contains(order_id) {
            return Err(WorkflowError::NotFound(format!("order #{order_id}")));
        }
        let product = state
            .inventory
            .get(product_id)
            .ok_or_else(|| WorkflowError::NotFound(format!("product #{product_id}")))?;
        if product.stock < quantity {
            return Err(WorkflowError::Validation(format!(
                "insufficient stock for product #{}: {} requested, {} available",
                product.id, quantity, product.stock
            )));
        }
        Ok(Self {
            order_id,
            item: OrderItem::new(product.id, product.name.clone(), quantity, product.price),
        })
    }
}

impl OrderCommand for AddItemCommand {
    fn execute(&mut self, state: &mut WorkflowState) -> Result<()> {
        state.take_stock_and_alert(self.item.product_id, self.item.quantity)?;
        let now = state.clock.now();
        let order = state.order_mut(self.order_id)?;
        order.items.push(self.item.clone());
        order.recompute_totals();
        order.touch(now);
        state.snapshot(
            self.order_id,
            format!(
                "added {} x {}",
                self.item.quantity, self.item.product_name
            ),
        );
        Ok(())
    }

    fn undo(&mut self, state: &mut WorkflowState) -> Result<()> {
        let now = state.clock.now();
        let order = state.order_mut(self.order_id)?;
        let index = order
            .items
            .iter()
            .rposition(|item| *item == self.item)
            .ok_or_else(|| {
                WorkflowError::NotFound(format!(
                    "line for product #{} on order #{}",
                    self.item.product_id, self.order_id
                ))
            })?;
        order.items.remove(index);
        order.recompute_totals();
        order.touch(now);
        state.restock(self.item.product_id, self.item.quantity);
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "add {} x {} to order #{}",
            self.item.quantity, self.item.product_name, self.order_id
        )
    }
}
