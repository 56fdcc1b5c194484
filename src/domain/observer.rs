use crate::error::{Result, WorkflowError};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Receives stock-threshold notifications.
///
/// A failing observer returns an error; the subject logs it and keeps
/// notifying the rest.
pub trait InventoryObserver: Send + Sync {
    fn update(
        &self,
        product_id: u32,
        product_name: &str,
        current_stock: u32,
        min_stock: u32,
    ) -> Result<()>;
}

/// Fans stock-threshold events out to attached observers, in attachment
/// order. Observers are tracked by identity (`Arc` allocation), so attaching
/// the same instance twice is a no-op.
#[derive(Default)]
pub struct InventorySubject {
    observers: Vec<Arc<dyn InventoryObserver>>,
}

impl InventorySubject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, observer: Arc<dyn InventoryObserver>) {
        let already_attached = self.observers.iter().any(|o| Arc::ptr_eq(o, &observer));
        if !already_attached {
            self.observers.push(observer);
            debug!(total = self.observers.len(), "inventory observer attached");
        }
    }

    pub fn detach(&mut self, observer: &Arc<dyn InventoryObserver>) {
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    pub fn notify(&self, product_id: u32, product_name: &str, current_stock: u32, min_stock: u32) {
        debug!(
            observers = self.observers.len(),
            product_id, "notifying low stock observers"
        );
        for observer in &self.observers {
            if let Err(err) = observer.update(product_id, product_name, current_stock, min_stock) {
                warn!(%err, product_id, "inventory observer failed");
            }
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

/// One recorded low-stock event.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StockAlert {
    pub product_id: u32,
    pub product_name: String,
    pub current_stock: u32,
    pub min_stock: u32,
}

/// Observer that records every low-stock event in memory and logs a warning.
#[derive(Default)]
pub struct LowStockAlerts {
    alerts: Mutex<Vec<StockAlert>>,
}

impl LowStockAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<StockAlert> {
        self.alerts
            .lock()
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|alerts| alerts.len()).unwrap_or(0)
    }
}

impl InventoryObserver for LowStockAlerts {
    fn update(
        &self,
        product_id: u32,
        product_name: &str,
        current_stock: u32,
        min_stock: u32,
    ) -> Result<()> {
        warn!(
            product_id,
            product = product_name,
            current_stock,
            min_stock,
            "low stock alert"
        );
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| WorkflowError::Validation("alert log poisoned".to_string()))?;
        alerts.push(StockAlert {
            product_id,
            product_name: product_name.to_string(),
            current_stock,
            min_stock,
        });
        Ok(())
    }
}
