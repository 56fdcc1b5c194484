use crate::error::{Result, WorkflowError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the workflow operation script.
///
/// Unused columns are left empty; which columns an operation consumes is
/// documented on `OperationKind`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OperationKind,
    pub order: Option<u32>,
    pub product: Option<u32>,
    pub quantity: Option<u32>,
    pub price: Option<Decimal>,
    pub value: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// The operations the CSV script can drive.
///
/// - `product`: seed a product (`product` id, `quantity` stock, `price`,
///   `value` minimum stock, `name`)
/// - `create`: create an order (`product`, `quantity`, `name`, `email`)
/// - `add-item`: add a line (`order`, `product`, `quantity`)
/// - `status`: set order status (`order`, `value` status name)
/// - `cancel`, `remove`: (`order`)
/// - `discount`: apply a percentage (`order`, `value` percentage)
/// - `undo`, `redo`: no operands
/// - `restore`: restore a snapshot (`order`, `value` index)
/// - `pay`: charge the order (`order`, `value` gateway name)
/// - `refund`: refund the order (`order`)
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Product,
    Create,
    AddItem,
    Status,
    Cancel,
    Discount,
    Remove,
    Undo,
    Redo,
    Restore,
    Pay,
    Refund,
}

impl OperationRecord {
    pub fn order_id(&self) -> Result<u32> {
        self.order
            .ok_or_else(|| WorkflowError::Validation(format!("{:?}: missing order id", self.op)))
    }

    pub fn value(&self) -> Result<&str> {
        self.value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WorkflowError::Validation(format!("{:?}: missing value", self.op)))
    }
}

/// Streams operation records from a CSV source.
///
/// Wraps `csv::Reader` with trimming and flexible record lengths, yielding
/// one `Result` per row so a malformed line does not abort the stream.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<OperationRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WorkflowError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "op, order, product, quantity, price, value, name, email";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n\
             product, , 1, 10, 49.90, 3, Widget,\n\
             create, , 1, 2, , , Juan Perez, juan@empresa.com\n\
             status, 1001, , , , processing, ,"
        );
        let reader = OperationReader::new(data.as_bytes());
        let records: Vec<Result<OperationRecord>> = reader.operations().collect();

        assert_eq!(records.len(), 3);
        let seed = records[0].as_ref().unwrap();
        assert_eq!(seed.op, OperationKind::Product);
        assert_eq!(seed.product, Some(1));
        assert_eq!(seed.quantity, Some(10));
        assert_eq!(seed.price, Some(dec!(49.90)));

        let create = records[1].as_ref().unwrap();
        assert_eq!(create.op, OperationKind::Create);
        assert_eq!(create.name.as_deref(), Some("Juan Perez"));

        let status = records[2].as_ref().unwrap();
        assert_eq!(status.order, Some(1001));
        assert_eq!(status.value.as_deref(), Some("processing"));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\nteleport, 1001, , , , , ,");
        let reader = OperationReader::new(data.as_bytes());
        let records: Vec<Result<OperationRecord>> = reader.operations().collect();
        assert!(records[0].is_err());
    }

    #[test]
    fn test_missing_operand_accessors() {
        let data = format!("{HEADER}\nundo, , , , , , ,");
        let reader = OperationReader::new(data.as_bytes());
        let record = reader.operations().next().unwrap().unwrap();

        assert!(matches!(
            record.order_id(),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(record.value(), Err(WorkflowError::Validation(_))));
    }
}
