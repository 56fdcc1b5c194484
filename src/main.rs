use clap::Parser;
use miette::{IntoDiagnostic, Result};
use orderflow::application::engine::{OrderWorkflow, WorkflowConfig};
use orderflow::domain::gateway::Gateway;
use orderflow::domain::observer::LowStockAlerts;
use orderflow::domain::order::OrderStatus;
use orderflow::domain::product::Product;
use orderflow::error::WorkflowError;
use orderflow::interfaces::csv::operation_reader::{
    OperationKind, OperationReader, OperationRecord,
};
use orderflow::interfaces::csv::order_writer::OrderWriter;
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Undo-history capacity
    #[arg(long, default_value_t = 50)]
    history_limit: usize,

    /// Per-order snapshot capacity
    #[arg(long, default_value_t = 20)]
    snapshot_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut workflow = OrderWorkflow::with_config(WorkflowConfig {
        history_limit: cli.history_limit,
        snapshot_limit: cli.snapshot_limit,
    });
    workflow.attach_low_stock_observer(Arc::new(LowStockAlerts::new()));

    // Process operations
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for record_result in reader.operations() {
        match record_result {
            Ok(record) => {
                if let Err(e) = run_operation(&mut workflow, record).await {
                    eprintln!("Error running operation: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    // Output final state
    let orders = workflow.into_orders();
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(&orders).into_diagnostic()?;

    Ok(())
}

async fn run_operation(
    workflow: &mut OrderWorkflow,
    record: OperationRecord,
) -> orderflow::error::Result<()> {
    match record.op {
        OperationKind::Product => {
            let id = record.product.ok_or_else(|| {
                WorkflowError::Validation("product: missing product id".to_string())
            })?;
            let price = record
                .price
                .ok_or_else(|| WorkflowError::Validation("product: missing price".to_string()))?;
            let min_stock = record
                .value
                .as_deref()
                .unwrap_or("0")
                .parse::<u32>()
                .map_err(|_| WorkflowError::Validation("product: bad minimum stock".to_string()))?;
            workflow.add_product(Product {
                id,
                name: record
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Product {id}")),
                price,
                stock: record.quantity.unwrap_or(0),
                min_stock,
                category: "general".to_string(),
            });
            Ok(())
        }
        OperationKind::Create => {
            let product = record.product.ok_or_else(|| {
                WorkflowError::Validation("create: missing product id".to_string())
            })?;
            let quantity = record.quantity.unwrap_or(1);
            workflow
                .create_order(
                    record.name.as_deref().unwrap_or_default(),
                    record.email.as_deref().unwrap_or_default(),
                    &[(product, quantity)],
                )
                .map(|_| ())
        }
        OperationKind::AddItem => {
            let product = record.product.ok_or_else(|| {
                WorkflowError::Validation("add-item: missing product id".to_string())
            })?;
            workflow.add_item(record.order_id()?, product, record.quantity.unwrap_or(1))
        }
        OperationKind::Status => {
            let status: OrderStatus = record.value()?.parse()?;
            workflow.update_status(record.order_id()?, status)
        }
        OperationKind::Cancel => workflow.cancel_order(record.order_id()?),
        OperationKind::Discount => {
            let percentage: Decimal = record
                .value()?
                .parse()
                .map_err(|_| WorkflowError::Validation("discount: bad percentage".to_string()))?;
            workflow.apply_discount(record.order_id()?, percentage)
        }
        OperationKind::Remove => workflow.remove_order(record.order_id()?),
        OperationKind::Undo => workflow.undo().map(|_| ()),
        OperationKind::Redo => workflow.redo().map(|_| ()),
        OperationKind::Restore => {
            let index: usize = record
                .value()?
                .parse()
                .map_err(|_| WorkflowError::Validation("restore: bad snapshot index".to_string()))?;
            workflow.restore_order(record.order_id()?, index)
        }
        OperationKind::Pay => {
            let gateway: Gateway = record.value()?.parse()?;
            workflow
                .pay_order(record.order_id()?, gateway, None)
                .await
                .map(|_| ())
        }
        OperationKind::Refund => workflow.refund_order(record.order_id()?).await.map(|_| ()),
    }
}
