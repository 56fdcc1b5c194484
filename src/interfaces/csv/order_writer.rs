use crate::domain::order::Order;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Flat row shape for the final order report.
#[derive(Debug, Serialize)]
struct OrderRow {
    id: u32,
    customer: String,
    items: usize,
    subtotal: String,
    discount: String,
    total: String,
    status: String,
    payment_status: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer: order.customer_name.clone(),
            items: order.items.len(),
            subtotal: order.subtotal.to_string(),
            discount: order.discount.to_string(),
            total: order.total.to_string(),
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
        }
    }
}

/// Writes final order states as CSV to any `Write` sink.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: &[Order]) -> Result<()> {
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
