use crate::error::{Result, WorkflowError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
    pub min_stock: u32,
    pub category: String,
}

/// Before/after stock levels of a single adjustment, used to detect
/// threshold crossings.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StockChange {
    pub before: u32,
    pub after: u32,
}

impl StockChange {
    /// True only when the adjustment moved the stock strictly downwards
    /// through the minimum: above it before, at or below it after.
    pub fn crosses_below(&self, min_stock: u32) -> bool {
        self.before > min_stock && self.after <= min_stock
    }
}

impl Product {
    pub fn take_stock(&mut self, quantity: u32) -> Result<StockChange> {
        if self.stock < quantity {
            return Err(WorkflowError::Validation(format!(
                "insufficient stock for product #{}: {} requested, {} available",
                self.id, quantity, self.stock
            )));
        }
        let before = self.stock;
        self.stock -= quantity;
        Ok(StockChange {
            before,
            after: self.stock,
        })
    }

    pub fn restock(&mut self, quantity: u32) {
        self.stock += quantity;
    }
}

/// Insertion-ordered product collection keyed by id.
#[derive(Debug, Default)]
pub struct ProductInventory {
    products: Vec<Product>,
}

impl ProductInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product, replacing any existing product with the same id.
    pub fn insert(&mut self, product: Product) {
        if let Some(existing) = self.products.iter_mut().find(|p| p.id == product.id) {
            *existing = product;
        } else {
            self.products.push(product);
        }
    }

    pub fn get(&self, product_id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn get_mut(&mut self, product_id: u32) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.clone()
    }
}
