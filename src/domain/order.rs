use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Completed and Cancelled orders are not re-entered by the normal flow;
    /// only a snapshot restore can move an order out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::error::WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(crate::error::WorkflowError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{name}")
    }
}

/// One order line. `total` is always `quantity × unit_price`; it is
/// recomputed on every mutation, never carried independently.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderItem {
    pub product_id: u32,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl OrderItem {
    pub fn new(product_id: u32, product_name: String, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            product_name,
            quantity,
            unit_price,
            total: unit_price * Decimal::from(quantity),
        }
    }
}

/// A business order under reversible mutation.
///
/// Invariant after every completed mutation: `total = subtotal - discount`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: u32,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: u32,
        customer_name: String,
        customer_email: String,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut order = Self {
            id,
            customer_name,
            customer_email,
            items,
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        order.recompute_totals();
        order
    }

    /// Recomputes line totals and the subtotal from the line items, keeping
    /// the current discount amount. Restores the `total = subtotal - discount`
    /// invariant.
    pub fn recompute_totals(&mut self) {
        for item in &mut self.items {
            item.total = item.unit_price * Decimal::from(item.quantity);
        }
        self.subtotal = self.items.iter().map(|item| item.total).sum();
        self.total = self.subtotal - self.discount;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Per-status counts and revenue figures over a whole order book.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OrderStats {
    pub total_orders: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
}

/// Insertion-ordered collection of orders with a monotonic id counter.
///
/// Ids are unique for the process lifetime: removing an order never frees
/// its id for reuse.
#[derive(Debug)]
pub struct OrderBook {
    orders: Vec<Order>,
    next_id: u32,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            orders: Vec::new(),
            next_id: 1000,
        }
    }

    /// Allocates the next order id. First allocation yields 1001.
    pub fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub fn remove(&mut self, order_id: u32) -> Option<Order> {
        let index = self.orders.iter().position(|o| o.id == order_id)?;
        Some(self.orders.remove(index))
    }

    pub fn get(&self, order_id: u32) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    pub fn get_mut(&mut self, order_id: u32) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == order_id)
    }

    pub fn contains(&self, order_id: u32) -> bool {
        self.orders.iter().any(|o| o.id == order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn by_status(&self, status: OrderStatus) -> Vec<&Order> {
        self.orders.iter().filter(|o| o.status == status).collect()
    }

    /// Matches the query against customer name, customer email and the
    /// decimal form of the order id, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<&Order> {
        let needle = query.to_lowercase();
        self.orders
            .iter()
            .filter(|o| {
                o.customer_name.to_lowercase().contains(&needle)
                    || o.customer_email.to_lowercase().contains(&needle)
                    || o.id.to_string().contains(&needle)
            })
            .collect()
    }

    pub fn stats(&self) -> OrderStats {
        let completed: Vec<&Order> = self.by_status(OrderStatus::Completed);
        let total_revenue: Decimal = completed.iter().map(|o| o.total).sum();
        let average_order_value = if completed.is_empty() {
            Decimal::ZERO
        } else {
            total_revenue / Decimal::from(completed.len() as u64)
        };

        OrderStats {
            total_orders: self.orders.len(),
            pending: self.by_status(OrderStatus::Pending).len(),
            processing: self.by_status(OrderStatus::Processing).len(),
            completed: completed.len(),
            cancelled: self.by_status(OrderStatus::Cancelled).len(),
            total_revenue,
            average_order_value,
        }
    }

    pub fn into_orders(self) -> Vec<Order> {
        self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap()
    }

    fn sample_order(id: u32) -> Order {
        Order::new(
            id,
            "Juan Perez".to_string(),
            "juan@empresa.com".to_string(),
            vec![
                OrderItem::new(1, "Laptop".to_string(), 1, dec!(2500.00)),
                OrderItem::new(2, "Mouse".to_string(), 2, dec!(89.00)),
            ],
            fixed_now(),
        )
    }

    #[test]
    fn test_line_totals_derived_from_inputs() {
        let order = sample_order(1001);
        assert_eq!(order.items[0].total, dec!(2500.00));
        assert_eq!(order.items[1].total, dec!(178.00));
        assert_eq!(order.subtotal, dec!(2678.00));
        assert_eq!(order.total, dec!(2678.00));
        assert_eq!(order.discount, dec!(0));
    }

    #[test]
    fn test_recompute_preserves_invariant() {
        let mut order = sample_order(1001);
        order.discount = dec!(267.80);
        order.items[1].quantity = 3;
        order.recompute_totals();

        assert_eq!(order.subtotal, dec!(2767.00));
        assert_eq!(order.total, order.subtotal - order.discount);
    }

    #[test]
    fn test_order_book_ids_are_monotonic() {
        let mut book = OrderBook::new();
        let first = book.allocate_id();
        let second = book.allocate_id();
        assert_eq!(first, 1001);
        assert_eq!(second, 1002);

        book.insert(sample_order(first));
        book.remove(first);
        // Removal never recycles ids.
        assert_eq!(book.allocate_id(), 1003);
    }

    #[test]
    fn test_order_book_search() {
        let mut book = OrderBook::new();
        let id = book.allocate_id();
        book.insert(sample_order(id));

        assert_eq!(book.search("juan").len(), 1);
        assert_eq!(book.search("EMPRESA").len(), 1);
        assert_eq!(book.search("1001").len(), 1);
        assert!(book.search("nadie").is_empty());
    }

    #[test]
    fn test_order_book_stats() {
        let mut book = OrderBook::new();
        for status in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let id = book.allocate_id();
            let mut order = sample_order(id);
            order.status = status;
            book.insert(order);
        }

        let stats = book.stats();
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_revenue, dec!(5356.00));
        assert_eq!(stats.average_order_value, dec!(2678.00));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }
}
