use crate::domain::money::Amount;
use crate::domain::order::PaymentStatus;
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The closed set of settlement backends. Gateway identifiers are an enum
/// rather than free-form strings; only the CLI boundary parses names.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gateway {
    Paypal,
    Yape,
    Plin,
    Card,
}

impl Gateway {
    pub const ALL: [Gateway; 4] = [Gateway::Paypal, Gateway::Yape, Gateway::Plin, Gateway::Card];
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gateway::Paypal => "PAYPAL",
            Gateway::Yape => "YAPE",
            Gateway::Plin => "PLIN",
            Gateway::Card => "CARD",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Gateway {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PAYPAL" => Ok(Gateway::Paypal),
            "YAPE" => Ok(Gateway::Yape),
            "PLIN" => Ok(Gateway::Plin),
            "CARD" => Ok(Gateway::Card),
            other => Err(WorkflowError::Validation(format!(
                "unknown payment gateway: {other}"
            ))),
        }
    }
}

/// Normalized outcome of a single gateway call.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentResult {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PaymentResult {
    pub fn approved(
        transaction_id: String,
        status: &str,
        amount: Decimal,
        currency: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id),
            status: Some(status.to_string()),
            amount: Some(amount),
            currency: Some(currency),
            error: None,
            timestamp,
        }
    }

    pub fn failure(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            status: None,
            amount: None,
            currency: None,
            error: Some(error.into()),
            timestamp,
        }
    }
}

/// Uniform async interface over one settlement backend.
///
/// A returned `Err` models a connection-level fault; business declines come
/// back as `Ok` results with `success: false`. The facade converts faults
/// into failure results so callers never see a raw error.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    async fn process_payment(
        &self,
        amount: Amount,
        order_id: u32,
        metadata: Option<Value>,
    ) -> Result<PaymentResult>;

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: Option<Amount>,
    ) -> Result<PaymentResult>;

    async fn get_status(&self, transaction_id: &str) -> Result<PaymentResult>;
}

pub type PaymentAdapterBox = Box<dyn PaymentAdapter>;

/// Ledger entry for one attempted payment, fee figures included.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub id: u32,
    pub order_id: u32,
    pub gateway: Gateway,
    pub amount: Decimal,
    pub processing_fee: Decimal,
    pub net_amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub currency: Option<String>,
    pub timestamp: DateTime<Utc>,
}
