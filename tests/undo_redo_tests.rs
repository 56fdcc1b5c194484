use orderflow::application::engine::{OrderWorkflow, WorkflowConfig};
use orderflow::domain::order::{Order, OrderStatus};
use orderflow::domain::product::Product;
use rust_decimal_macros::dec;

fn workflow() -> OrderWorkflow {
    let mut workflow = OrderWorkflow::new();
    workflow.add_product(Product {
        id: 1,
        name: "Widget".to_string(),
        price: dec!(100.00),
        stock: 100,
        min_stock: 5,
        category: "general".to_string(),
    });
    workflow
}

/// Observable order state for bit-for-bit comparison: everything except the
/// audit timestamp, which moves on undo as well.
fn observable(order: &Order) -> Order {
    let mut order = order.clone();
    order.updated_at = order.created_at;
    order
}

#[test]
fn test_execute_then_undo_restores_observable_state() {
    let mut workflow = workflow();
    let id = workflow
        .create_order("Juan Perez", "juan@empresa.com", &[(1, 2)])
        .unwrap();
    let before = observable(workflow.order(id).unwrap());

    workflow.apply_discount(id, dec!(25)).unwrap();
    assert!(workflow.undo().unwrap());

    assert_eq!(observable(workflow.order(id).unwrap()), before);
}

#[test]
fn test_n_executes_n_undos_returns_to_original() {
    let mut workflow = workflow();
    let id = workflow
        .create_order("Juan Perez", "juan@empresa.com", &[(1, 1)])
        .unwrap();
    let original = observable(workflow.order(id).unwrap());
    let original_stock = workflow.state().inventory.get(1).unwrap().stock;

    workflow.update_status(id, OrderStatus::Processing).unwrap();
    workflow.add_item(id, 1, 3).unwrap();
    workflow.apply_discount(id, dec!(10)).unwrap();
    workflow.update_status(id, OrderStatus::Completed).unwrap();

    for _ in 0..4 {
        assert!(workflow.undo().unwrap());
    }

    assert_eq!(observable(workflow.order(id).unwrap()), original);
    assert_eq!(workflow.state().inventory.get(1).unwrap().stock, original_stock);
    // Only the creation itself remains undoable.
    assert!(workflow.can_undo());
    assert!(workflow.undo().unwrap());
    assert!(!workflow.can_undo());
    assert!(workflow.order(id).is_none());
}

#[test]
fn test_redo_reproduces_post_execute_state() {
    let mut workflow = workflow();
    let id = workflow
        .create_order("Juan Perez", "juan@empresa.com", &[(1, 2)])
        .unwrap();
    workflow.apply_discount(id, dec!(50)).unwrap();
    let after_discount = observable(workflow.order(id).unwrap());

    assert!(workflow.undo().unwrap());
    assert!(workflow.redo().unwrap());
    assert_eq!(observable(workflow.order(id).unwrap()), after_discount);
}

#[test]
fn test_new_execute_clears_redo_history() {
    let mut workflow = workflow();
    let id = workflow
        .create_order("Juan Perez", "juan@empresa.com", &[(1, 1)])
        .unwrap();
    workflow.update_status(id, OrderStatus::Processing).unwrap();

    workflow.undo().unwrap();
    assert!(workflow.can_redo());

    workflow.apply_discount(id, dec!(5)).unwrap();
    assert!(!workflow.can_redo());
    assert!(!workflow.redo().unwrap());
}

#[test]
fn test_history_cap_makes_oldest_unrecoverable() {
    let mut workflow = OrderWorkflow::with_config(WorkflowConfig {
        history_limit: 3,
        snapshot_limit: 20,
    });
    workflow.add_product(Product {
        id: 1,
        name: "Widget".to_string(),
        price: dec!(10.00),
        stock: 100,
        min_stock: 5,
        category: "general".to_string(),
    });

    let id = workflow
        .create_order("Juan Perez", "juan@empresa.com", &[(1, 1)])
        .unwrap();
    for status in [
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Pending,
    ] {
        workflow.update_status(id, status).unwrap();
    }

    // The creation command was evicted: three undos drain the stack and the
    // order itself can no longer be removed by undo.
    assert_eq!(workflow.command_history().len(), 3);
    while workflow.can_undo() {
        workflow.undo().unwrap();
    }
    assert!(workflow.order(id).is_some());
}

#[test]
fn test_interleaved_orders_share_one_stack() {
    let mut workflow = workflow();
    let first = workflow
        .create_order("Juan Perez", "juan@empresa.com", &[(1, 1)])
        .unwrap();
    let second = workflow
        .create_order("Ana Lopez", "ana@empresa.com", &[(1, 1)])
        .unwrap();

    workflow.update_status(first, OrderStatus::Processing).unwrap();
    workflow.update_status(second, OrderStatus::Cancelled).unwrap();

    // One global stack: the most recent command touched the second order.
    assert!(workflow.undo().unwrap());
    assert_eq!(workflow.order(second).unwrap().status, OrderStatus::Pending);
    assert_eq!(
        workflow.order(first).unwrap().status,
        OrderStatus::Processing
    );
}
