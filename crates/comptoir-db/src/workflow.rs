//! # Transaction Orchestrator
//!
//! Business workflows composed of ledger movements, each committed or
//! rolled back as one unit of work.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale(request)                                                          │
//! │       │                                                                 │
//! │       ├── validate              MissingStoreId, Validation              │
//! │       ├── begin()               writer lock, batch number               │
//! │       ├── INSERT sale           total 0                                 │
//! │       ├── for each line                                                 │
//! │       │     ├── product         ProductNotFound                         │
//! │       │     ├── INSERT item     unit price + unit cost frozen           │
//! │       │     └── for each component of resolve(product, qty)            │
//! │       │           └── stock OUT SALE  ─── InsufficientStock ──┐         │
//! │       ├── UPDATE sale total                                   │         │
//! │       ├── CASH ? cash IN SALE                                 │         │
//! │       └── commit()                                            ▼         │
//! │                                            rollback: header, items and  │
//! │                                            every movement disappear     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Other Workflows
//! | Workflow         | Stock                     | Cash                   | Records                  |
//! |------------------|---------------------------|------------------------|--------------------------|
//! | purchase         | IN PURCHASE per line      | OUT PURCHASE           | purchase, items, expense |
//! | expense          |                           | OUT EXPENSE            | expense                  |
//! | transfer         | OUT + IN TRANSFER         |                        | stock transfer           |
//! | staff_payment    |                           | OUT STAFF_PAYMENT      | salary payment, expense  |
//! | initialize_stock | difference, INITIAL       |                        |                          |
//!
//! Nothing is retried here. A `LockTimeout` can be retried by calling the
//! workflow again, which writes fresh header rows.

use chrono::Utc;
use comptoir_core::validation::{validate_id, validate_store_id};
use comptoir_core::{
    CashDirection, CashReason, Expense, ExpenseKind, ExpenseRequest, Money, NewCashMovement,
    NewStockMovement, PaymentMethod, Purchase, PurchaseItem, PurchaseRequest, PurchaseStatus,
    RecordedPurchase, RecordedSale, RecordedStaffPayment, RecordedTransfer, SalaryPayment, Sale,
    SaleItem, SaleRequest, SaleStatus, StaffPaymentRequest, StockPosition, StockReason,
    StockTransfer, TransferRequest, ValidationError,
};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::error::{DbError, DbResult};
use crate::ledger::{cash, stock};
use crate::repository::{expense, purchase, salary, sale, transfer};
use crate::unit_of_work::UnitOfWork;

/// Runs business workflows against the ledgers.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    pool: SqlitePool,
}

impl Orchestrator {
    pub fn new(pool: SqlitePool) -> Self {
        Orchestrator { pool }
    }

    // =========================================================================
    // Sale
    // =========================================================================

    /// Records a sale: stock out for every component, cash in when paid in
    /// cash.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let recorded = db.orchestrator().sale(SaleRequest {
    ///     store_id: "bar".into(),
    ///     items: vec![SaleLine::new("heineken", 2)],
    ///     payment_method: PaymentMethod::Cash,
    ///     actor_id: Some("cashier-1".into()),
    ///     notes: None,
    /// }).await?;
    /// ```
    pub async fn sale(&self, request: SaleRequest) -> DbResult<RecordedSale> {
        request.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match sale_in(&mut uow, &request).await {
            Ok(recorded) => {
                uow.commit().await?;
                info!(
                    sale_id = %recorded.sale.id,
                    store_id = %recorded.sale.store_id,
                    total = %recorded.sale.total_amount,
                    lines = recorded.items.len(),
                    "Sale recorded"
                );
                Ok(recorded)
            }
            Err(err) => {
                warn!(store_id = %request.store_id, error = %err, "Sale rolled back");
                uow.abort(err).await
            }
        }
    }

    /// Records several sales, each in its own unit of work.
    ///
    /// The result at index `i` belongs to `requests[i]`: the new sale id, or
    /// the error that rolled that sale back. One failure never affects
    /// another entry.
    pub async fn record_sales_bulk(&self, requests: Vec<SaleRequest>) -> Vec<DbResult<String>> {
        let total = requests.len();
        let mut results = Vec::with_capacity(total);

        for request in requests {
            results.push(self.sale(request).await.map(|recorded| recorded.sale.id));
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(total, failed, "Bulk sales processed");
        results
    }

    // =========================================================================
    // Purchase
    // =========================================================================

    /// Records a purchase: boxes become base units in stock, the cost leaves
    /// the register and is journaled as a PURCHASE expense.
    pub async fn purchase(&self, request: PurchaseRequest) -> DbResult<RecordedPurchase> {
        request.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match purchase_in(&mut uow, &request).await {
            Ok(recorded) => {
                uow.commit().await?;
                info!(
                    purchase_id = %recorded.purchase.id,
                    store_id = %recorded.purchase.store_id,
                    total = %recorded.purchase.total_cost,
                    lines = recorded.items.len(),
                    "Purchase recorded"
                );
                Ok(recorded)
            }
            Err(err) => {
                warn!(store_id = %request.store_id, error = %err, "Purchase rolled back");
                uow.abort(err).await
            }
        }
    }

    // =========================================================================
    // Expense
    // =========================================================================

    pub async fn expense(&self, request: ExpenseRequest) -> DbResult<Expense> {
        request.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match expense_in(&mut uow, &request).await {
            Ok(recorded) => {
                uow.commit().await?;
                info!(
                    expense_id = %recorded.id,
                    store_id = %recorded.store_id,
                    amount = %recorded.amount,
                    "Expense recorded"
                );
                Ok(recorded)
            }
            Err(err) => uow.abort(err).await,
        }
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    /// Moves stock between two stores. Both sides commit together or not at
    /// all.
    pub async fn transfer(&self, request: TransferRequest) -> DbResult<RecordedTransfer> {
        request.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match transfer_in(&mut uow, &request).await {
            Ok(recorded) => {
                uow.commit().await?;
                info!(
                    transfer_id = %recorded.transfer.id,
                    product_id = %request.product_id,
                    from = %request.from_store_id,
                    to = %request.to_store_id,
                    quantity = request.quantity,
                    "Stock transferred"
                );
                Ok(recorded)
            }
            Err(err) => uow.abort(err).await,
        }
    }

    // =========================================================================
    // Staff Payment
    // =========================================================================

    pub async fn staff_payment(
        &self,
        request: StaffPaymentRequest,
    ) -> DbResult<RecordedStaffPayment> {
        request.validate()?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match staff_payment_in(&mut uow, &request).await {
            Ok(recorded) => {
                uow.commit().await?;
                info!(
                    payment_id = %recorded.payment.id,
                    user_id = %request.user_id,
                    store_id = %request.store_id,
                    amount = %request.amount,
                    "Staff paid"
                );
                Ok(recorded)
            }
            Err(err) => uow.abort(err).await,
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Sets a position to `target` base units with one INITIAL movement for
    /// the difference. Writes nothing when already at target.
    pub async fn initialize_stock(
        &self,
        product_id: &str,
        store_id: &str,
        target: i64,
        actor_id: Option<&str>,
    ) -> DbResult<StockPosition> {
        validate_id("product_id", product_id)?;
        validate_store_id(store_id)?;
        if target < 0 {
            return Err(ValidationError::OutOfRange {
                field: "target".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match initialize_stock_in(&mut uow, product_id, store_id, target, actor_id).await {
            Ok(Some(position)) => {
                uow.commit().await?;
                info!(product_id, store_id, quantity = position.quantity, "Stock initialized");
                Ok(position)
            }
            Ok(None) => {
                let current = stock::read_position(uow.conn()?, product_id, store_id).await;
                uow.rollback().await?;
                debug!(product_id, store_id, "Stock already at target");
                current
            }
            Err(err) => uow.abort(err).await,
        }
    }
}

// =============================================================================
// Workflow bodies
// =============================================================================
//
// Each body runs inside a unit of work opened by its caller and returns on
// the first error. The caller commits or aborts.

async fn sale_in(uow: &mut UnitOfWork, request: &SaleRequest) -> DbResult<RecordedSale> {
    let now = Utc::now();
    let mut header = Sale {
        id: Uuid::new_v4().to_string(),
        store_id: request.store_id.clone(),
        user_id: request.actor_id.clone(),
        payment_method: request.payment_method,
        status: SaleStatus::Completed,
        total_amount: Money::zero(),
        notes: request.notes.clone(),
        created_at: now,
    };
    sale::insert_sale(uow.conn()?, &header).await?;

    let mut items = Vec::with_capacity(request.items.len());
    let mut total = Money::zero();

    for line in &request.items {
        let product = catalog::require_product(uow.conn()?, &line.product_id).await?;

        let sub_total = product
            .selling_price
            .checked_mul_quantity(line.quantity)
            .ok_or_else(total_overflow)?;
        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: header.id.clone(),
            product_id: product.id.clone(),
            quantity: line.quantity,
            unit_price: product.selling_price,
            sub_total,
            unit_cost_snapshot: product.unit_cost(),
            created_at: now,
        };
        sale::insert_item(uow.conn()?, &item).await?;
        total = total.checked_add(sub_total).ok_or_else(total_overflow)?;

        let consumption = catalog::resolve(uow.conn()?, &product.id, line.quantity).await?;
        for component in consumption {
            let movement = NewStockMovement::new(
                &component.product_id,
                &request.store_id,
                -component.quantity,
                StockReason::Sale,
            )
            .reference(&header.id)
            .description(format!("Sale: {} x{}", product.name, line.quantity));

            stock::apply_movement(uow, movement).await?;
        }

        items.push(item);
    }

    sale::set_total(uow.conn()?, &header.id, total).await?;
    header.total_amount = total;

    if request.payment_method == PaymentMethod::Cash && total.is_positive() {
        let movement =
            NewCashMovement::new(&request.store_id, CashDirection::In, total, CashReason::Sale)
                .reference(&header.id);
        cash::apply_movement(uow, movement).await?;
    }

    Ok(RecordedSale {
        sale: header,
        items,
    })
}

async fn purchase_in(
    uow: &mut UnitOfWork,
    request: &PurchaseRequest,
) -> DbResult<RecordedPurchase> {
    let now = Utc::now();
    let mut header = Purchase {
        id: Uuid::new_v4().to_string(),
        store_id: request.store_id.clone(),
        supplier_id: request.supplier_id.clone(),
        user_id: request.actor_id.clone(),
        status: PurchaseStatus::Completed,
        total_cost: Money::zero(),
        notes: request.notes.clone(),
        created_at: now,
    };
    purchase::insert_purchase(uow.conn()?, &header).await?;

    let mut items = Vec::with_capacity(request.items.len());
    let mut total = Money::zero();

    for line in &request.items {
        let product = catalog::require_product(uow.conn()?, &line.product_id).await?;

        let quantity_units = line
            .quantity_boxes
            .checked_mul(product.units_per_box)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "quantity_boxes".to_string(),
                min: 1,
                max: i64::MAX / product.units_per_box,
            })?;
        let line_total = line
            .unit_price_box
            .checked_mul_quantity(line.quantity_boxes)
            .ok_or_else(total_overflow)?;

        let item = PurchaseItem {
            id: Uuid::new_v4().to_string(),
            purchase_id: header.id.clone(),
            product_id: product.id.clone(),
            quantity_boxes: line.quantity_boxes,
            quantity_units,
            unit_price_box: line.unit_price_box,
            total_price: line_total,
            created_at: now,
        };
        purchase::insert_item(uow.conn()?, &item).await?;
        total = total.checked_add(line_total).ok_or_else(total_overflow)?;

        let movement = NewStockMovement::new(
            &product.id,
            &request.store_id,
            quantity_units,
            StockReason::Purchase,
        )
        .reference(&header.id)
        .description(format!("Purchase: {} x{} boxes", product.name, line.quantity_boxes));
        stock::apply_movement(uow, movement).await?;

        items.push(item);
    }

    purchase::set_total(uow.conn()?, &header.id, total).await?;
    header.total_cost = total;

    let journal = if total.is_positive() {
        let movement =
            NewCashMovement::new(&request.store_id, CashDirection::Out, total, CashReason::Purchase)
                .reference(&header.id);
        cash::apply_movement(uow, movement).await?;

        let row = Expense {
            id: Uuid::new_v4().to_string(),
            store_id: request.store_id.clone(),
            kind: ExpenseKind::Purchase,
            description: match &request.supplier_id {
                Some(supplier) => format!("Purchase from {supplier}"),
                None => "Purchase".to_string(),
            },
            amount: total,
            reference_id: Some(header.id.clone()),
            user_id: request.actor_id.clone(),
            created_at: now,
        };
        expense::insert_expense(uow.conn()?, &row).await?;
        Some(row)
    } else {
        None
    };

    Ok(RecordedPurchase {
        purchase: header,
        items,
        expense: journal,
    })
}

async fn expense_in(uow: &mut UnitOfWork, request: &ExpenseRequest) -> DbResult<Expense> {
    let row = Expense {
        id: Uuid::new_v4().to_string(),
        store_id: request.store_id.clone(),
        kind: ExpenseKind::General,
        description: request.description.trim().to_string(),
        amount: request.amount,
        reference_id: None,
        user_id: request.actor_id.clone(),
        created_at: Utc::now(),
    };
    expense::insert_expense(uow.conn()?, &row).await?;

    let movement = NewCashMovement::new(
        &request.store_id,
        CashDirection::Out,
        request.amount,
        CashReason::Expense,
    )
    .reference(&row.id)
    .description(&row.description);
    cash::apply_movement(uow, movement).await?;

    Ok(row)
}

async fn transfer_in(
    uow: &mut UnitOfWork,
    request: &TransferRequest,
) -> DbResult<RecordedTransfer> {
    let record = StockTransfer {
        id: Uuid::new_v4().to_string(),
        product_id: request.product_id.clone(),
        from_store_id: request.from_store_id.clone(),
        to_store_id: request.to_store_id.clone(),
        quantity: request.quantity,
        user_id: request.actor_id.clone(),
        notes: request.notes.clone(),
        created_at: Utc::now(),
    };

    let outgoing = NewStockMovement::new(
        &request.product_id,
        &request.from_store_id,
        -request.quantity,
        StockReason::Transfer,
    )
    .reference(&record.id)
    .description(format!("Transfer to {}", request.to_store_id));
    let from_position = stock::apply_movement(uow, outgoing).await?;

    let incoming = NewStockMovement::new(
        &request.product_id,
        &request.to_store_id,
        request.quantity,
        StockReason::Transfer,
    )
    .reference(&record.id)
    .description(format!("Transfer from {}", request.from_store_id));
    let to_position = stock::apply_movement(uow, incoming).await?;

    transfer::insert_transfer(uow.conn()?, &record).await?;

    Ok(RecordedTransfer {
        transfer: record,
        from_position,
        to_position,
    })
}

async fn staff_payment_in(
    uow: &mut UnitOfWork,
    request: &StaffPaymentRequest,
) -> DbResult<RecordedStaffPayment> {
    let now = Utc::now();
    let payment = SalaryPayment {
        id: Uuid::new_v4().to_string(),
        user_id: request.user_id.clone(),
        store_id: request.store_id.clone(),
        amount: request.amount,
        period: request.period.clone(),
        paid_by: request.actor_id.clone(),
        created_at: now,
    };

    let movement = NewCashMovement::new(
        &request.store_id,
        CashDirection::Out,
        request.amount,
        CashReason::StaffPayment,
    )
    .reference(&payment.id)
    .description(format!("Salary {} for {}", request.period, request.user_id));
    let cash_position = cash::apply_movement(uow, movement).await?;

    salary::insert_salary_payment(uow.conn()?, &payment).await?;

    let journal = Expense {
        id: Uuid::new_v4().to_string(),
        store_id: request.store_id.clone(),
        kind: ExpenseKind::Salary,
        description: format!("Salary {} for {}", request.period, request.user_id),
        amount: request.amount,
        reference_id: Some(payment.id.clone()),
        user_id: request.actor_id.clone(),
        created_at: now,
    };
    expense::insert_expense(uow.conn()?, &journal).await?;

    Ok(RecordedStaffPayment {
        payment,
        expense: journal,
        cash: cash_position,
    })
}

async fn initialize_stock_in(
    uow: &mut UnitOfWork,
    product_id: &str,
    store_id: &str,
    target: i64,
    actor_id: Option<&str>,
) -> DbResult<Option<StockPosition>> {
    let current = stock::read_position(uow.conn()?, product_id, store_id).await?;
    let difference = target - current.quantity;
    if difference == 0 {
        return Ok(None);
    }

    let mut movement = NewStockMovement::new(product_id, store_id, difference, StockReason::Initial)
        .description("Initial stock");
    if let Some(actor) = actor_id {
        movement = movement.reference(actor);
    }

    stock::apply_movement(uow, movement).await.map(Some)
}

fn total_overflow() -> DbError {
    ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        cash_in, file_db, memory_db, remove_db_files, seed_mojito, seed_product, stock_in,
    };
    use comptoir_core::{CoreError, MovementType, NewProduct, PurchaseLine, SaleLine};

    fn cash_sale(store_id: &str, items: Vec<SaleLine>) -> SaleRequest {
        SaleRequest {
            store_id: store_id.into(),
            items,
            payment_method: PaymentMethod::Cash,
            actor_id: Some("cashier-1".into()),
            notes: None,
        }
    }

    fn one_box_purchase(store_id: &str, product_id: &str, price_major: i64) -> PurchaseRequest {
        PurchaseRequest {
            store_id: store_id.into(),
            supplier_id: Some("brasserie".into()),
            items: vec![PurchaseLine::new(product_id, 1, Money::from_major(price_major))],
            notes: None,
            actor_id: Some("manager-1".into()),
        }
    }

    #[tokio::test]
    async fn test_purchase_then_sale_scenario() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        cash_in(&db, "bar", 30_000).await;

        // Purchase one box: 0 → 24
        let purchase = db
            .orchestrator()
            .purchase(one_box_purchase("bar", "heineken", 24_000))
            .await
            .unwrap();
        assert_eq!(purchase.purchase.total_cost, Money::from_major(24_000));
        assert_eq!(purchase.items[0].quantity_units, 24);
        let journal = purchase.expense.as_ref().unwrap();
        assert_eq!(journal.kind, ExpenseKind::Purchase);
        assert_eq!(journal.amount, Money::from_major(24_000));

        let history = db.stock().history("heineken", Some("bar"), None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement_type, MovementType::In);
        assert_eq!(history[0].reason, StockReason::Purchase);
        assert_eq!(history[0].quantity_change, 24);
        assert_eq!(db.cash().balance(Some("bar")).await.unwrap(), Money::from_major(6_000));

        // Sell two in cash: 24 → 22
        let sale = db
            .orchestrator()
            .sale(cash_sale("bar", vec![SaleLine::new("heineken", 2)]))
            .await
            .unwrap();
        assert_eq!(sale.sale.total_amount, Money::from_major(3_000));
        assert_eq!(sale.items[0].unit_cost_snapshot, Money::from_major(1_000));
        assert_eq!(sale.items[0].profit(), Some(Money::from_major(1_000)));

        let position = db.stock().position("heineken", "bar").await.unwrap();
        assert_eq!(position.quantity, 22);
        let history = db.stock().history("heineken", Some("bar"), Some(1)).await.unwrap();
        assert_eq!(history[0].movement_type, MovementType::Out);
        assert_eq!(history[0].reason, StockReason::Sale);
        assert_eq!(history[0].quantity_change, -2);
        assert_eq!(history[0].reference_id.as_deref(), Some(sale.sale.id.as_str()));
        assert_eq!(db.cash().balance(Some("bar")).await.unwrap(), Money::from_major(9_000));

        // Sell thirty against 22: rejected, nothing moves
        let err = db
            .orchestrator()
            .sale(cash_sale("bar", vec![SaleLine::new("heineken", 30)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 22, requested: 30, .. })
        ));
        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 22);
        assert_eq!(db.cash().balance(Some("bar")).await.unwrap(), Money::from_major(9_000));
    }

    #[tokio::test]
    async fn test_failed_second_line_leaves_nothing() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        seed_product(&db, "coke", 12, 6_000, 700).await;
        stock_in(&db, "heineken", "bar", 10).await;
        stock_in(&db, "coke", "bar", 1).await;

        let err = db
            .orchestrator()
            .sale(cash_sale(
                "bar",
                vec![SaleLine::new("heineken", 3), SaleLine::new("coke", 5)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { ref product_id, .. })
                if product_id == "coke"
        ));

        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 10);
        assert_eq!(db.stock().history("heineken", Some("bar"), None).await.unwrap().len(), 1);
        assert!(db.cash().history("bar", None).await.unwrap().is_empty());

        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!((sales, items), (0, 0));
    }

    #[tokio::test]
    async fn test_unknown_product_aborts_sale() {
        let db = memory_db().await;

        let err = db
            .orchestrator()
            .sale(cash_sale("bar", vec![SaleLine::new("ghost", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_sale_total_overflow_is_rejected() {
        let db = memory_db().await;
        db.catalog()
            .insert_product(
                NewProduct::new("Grand cru", 1, Money::zero(), Money::from_cents(i64::MAX / 2))
                    .with_id("grand-cru"),
            )
            .await
            .unwrap();
        stock_in(&db, "grand-cru", "bar", 10).await;

        let err = db
            .orchestrator()
            .sale(cash_sale("bar", vec![SaleLine::new("grand-cru", 3)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
                if field == "total"
        ));

        // Two lines that fit alone still overflow together.
        let err = db
            .orchestrator()
            .sale(cash_sale(
                "bar",
                vec![SaleLine::new("grand-cru", 1), SaleLine::new("grand-cru", 2)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        assert_eq!(db.stock().position("grand-cru", "bar").await.unwrap().quantity, 10);
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(sales, 0);
    }

    #[tokio::test]
    async fn test_purchase_total_overflow_is_rejected() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        cash_in(&db, "cellar", 10_000).await;

        let err = db
            .orchestrator()
            .purchase(PurchaseRequest {
                store_id: "cellar".into(),
                supplier_id: None,
                items: vec![PurchaseLine::new("heineken", 3, Money::from_cents(i64::MAX / 2))],
                notes: None,
                actor_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { ref field, .. }))
                if field == "total"
        ));

        assert!(!db.stock().position("heineken", "cellar").await.unwrap().is_materialized());
        assert_eq!(db.cash().balance(Some("cellar")).await.unwrap(), Money::from_major(10_000));
        let purchases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(purchases, 0);
    }

    #[tokio::test]
    async fn test_sale_without_store() {
        let db = memory_db().await;

        let err = db
            .orchestrator()
            .sale(cash_sale("", vec![SaleLine::new("heineken", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MissingStoreId)));
    }

    #[tokio::test]
    async fn test_mobile_money_sale_leaves_register_alone() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "bar", 5).await;

        let mut request = cash_sale("bar", vec![SaleLine::new("heineken", 1)]);
        request.payment_method = PaymentMethod::MobileMoney;
        db.orchestrator().sale(request).await.unwrap();

        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 4);
        assert!(db.cash().history("bar", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_composed_sale_consumes_components() {
        let db = memory_db().await;
        seed_mojito(&db).await;
        stock_in(&db, "rum", "bar", 2).await;
        stock_in(&db, "mint", "bar", 100).await;
        stock_in(&db, "lime", "bar", 10).await;

        let sale = db
            .orchestrator()
            .sale(cash_sale("bar", vec![SaleLine::new("mojito", 3)]))
            .await
            .unwrap();
        assert_eq!(sale.sale.total_amount, Money::from_major(9_000));

        assert_eq!(db.stock().position("rum", "bar").await.unwrap().quantity, 1);
        assert_eq!(db.stock().position("mint", "bar").await.unwrap().quantity, 94);
        assert_eq!(db.stock().position("lime", "bar").await.unwrap().quantity, 8);

        // The sold product has a recipe, so it is not consumed itself.
        let mojito = db.stock().position("mojito", "bar").await.unwrap();
        assert!(!mojito.is_materialized());

        let movements = db.stock().movements_for_reference(&sale.sale.id).await.unwrap();
        let keys: Vec<_> = movements.iter().map(|m| m.product_id.as_str()).collect();
        assert_eq!(keys, vec!["rum", "mint", "lime"]);
        assert!(movements.iter().all(|m| m.batch_no == movements[0].batch_no));
    }

    #[tokio::test]
    async fn test_composed_sale_missing_component_rolls_back() {
        let db = memory_db().await;
        seed_mojito(&db).await;
        stock_in(&db, "rum", "bar", 2).await;
        stock_in(&db, "mint", "bar", 100).await;

        let err = db
            .orchestrator()
            .sale(cash_sale("bar", vec![SaleLine::new("mojito", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                ref product_id,
                available: 0,
                requested: 1,
                ..
            })
                if product_id == "lime"
        ));
        assert_eq!(db.stock().position("rum", "bar").await.unwrap().quantity, 2);
        assert_eq!(db.stock().position("mint", "bar").await.unwrap().quantity, 100);
    }

    #[tokio::test]
    async fn test_purchase_without_cash_rolls_back() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        cash_in(&db, "bar", 1_000).await;

        let err = db
            .orchestrator()
            .purchase(one_box_purchase("bar", "heineken", 24_000))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientCash { .. })));

        assert!(!db.stock().position("heineken", "bar").await.unwrap().is_materialized());
        let purchases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(purchases, 0);
    }

    #[tokio::test]
    async fn test_free_purchase_skips_cash() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let recorded = db
            .orchestrator()
            .purchase(one_box_purchase("bar", "heineken", 0))
            .await
            .unwrap();
        assert!(recorded.expense.is_none());
        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 24);
        assert!(db.cash().history("bar", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expense_requires_cash() {
        let db = memory_db().await;
        cash_in(&db, "bar", 500).await;

        let expense = db
            .orchestrator()
            .expense(ExpenseRequest {
                store_id: "bar".into(),
                description: "Ice".into(),
                amount: Money::from_major(200),
                actor_id: None,
            })
            .await
            .unwrap();
        assert_eq!(expense.kind, ExpenseKind::General);

        let movements = db.cash().movements_for_reference(&expense.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].reason, CashReason::Expense);

        let err = db
            .orchestrator()
            .expense(ExpenseRequest {
                store_id: "bar".into(),
                description: "Generator".into(),
                amount: Money::from_major(400),
                actor_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientCash { .. })));

        let to = Utc::now() + chrono::Duration::seconds(1);
        let from = to - chrono::Duration::hours(1);
        let journal = db.records().expenses_between(Some("bar"), from, to).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(db.cash().balance(Some("bar")).await.unwrap(), Money::from_major(300));
    }

    #[tokio::test]
    async fn test_transfer_conserves_total() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "cellar", 48).await;

        let recorded = db
            .orchestrator()
            .transfer(TransferRequest {
                product_id: "heineken".into(),
                from_store_id: "cellar".into(),
                to_store_id: "bar".into(),
                quantity: 20,
                actor_id: None,
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(recorded.from_position.quantity, 28);
        assert_eq!(recorded.to_position.quantity, 20);
        assert_eq!(db.stock().total_quantity("heineken").await.unwrap(), 48);

        let movements = db.stock().movements_for_reference(&recorded.transfer.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements.iter().all(|m| m.reason == StockReason::Transfer));
        assert_eq!(movements.iter().map(|m| m.quantity_change).sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn test_transfer_never_half_applies() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "cellar", 5).await;

        let err = db
            .orchestrator()
            .transfer(TransferRequest {
                product_id: "heineken".into(),
                from_store_id: "cellar".into(),
                to_store_id: "bar".into(),
                quantity: 6,
                actor_id: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { available: 5, .. })));
        assert_eq!(db.stock().position("heineken", "cellar").await.unwrap().quantity, 5);
        assert!(!db.stock().position("heineken", "bar").await.unwrap().is_materialized());
        assert!(db.records().transfers("heineken").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_to_same_store_is_rejected() {
        let db = memory_db().await;

        let err = db
            .orchestrator()
            .transfer(TransferRequest {
                product_id: "heineken".into(),
                from_store_id: "bar".into(),
                to_store_id: "bar".into(),
                quantity: 1,
                actor_id: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_staff_payment_writes_all_records() {
        let db = memory_db().await;
        cash_in(&db, "bar", 100_000).await;

        let recorded = db
            .orchestrator()
            .staff_payment(StaffPaymentRequest {
                user_id: "waiter-7".into(),
                store_id: "bar".into(),
                amount: Money::from_major(60_000),
                period: "2026-09".into(),
                actor_id: Some("owner".into()),
            })
            .await
            .unwrap();

        assert_eq!(recorded.cash.balance, Money::from_major(40_000));
        assert_eq!(recorded.expense.kind, ExpenseKind::Salary);
        assert_eq!(recorded.expense.reference_id.as_deref(), Some(recorded.payment.id.as_str()));

        let payments = db.records().salary_payments("waiter-7").await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].paid_by.as_deref(), Some("owner"));

        let movements = db.cash().movements_for_reference(&recorded.payment.id).await.unwrap();
        assert_eq!(movements[0].reason, CashReason::StaffPayment);
    }

    #[tokio::test]
    async fn test_initialize_stock_sets_target() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;

        let position = db
            .orchestrator()
            .initialize_stock("heineken", "bar", 30, Some("owner"))
            .await
            .unwrap();
        assert_eq!(position.quantity, 30);

        let position = db
            .orchestrator()
            .initialize_stock("heineken", "bar", 12, None)
            .await
            .unwrap();
        assert_eq!(position.quantity, 12);

        let unchanged = db
            .orchestrator()
            .initialize_stock("heineken", "bar", 12, None)
            .await
            .unwrap();
        assert_eq!(unchanged.quantity, 12);

        let journal = db.stock().journal("heineken", "bar").await.unwrap();
        let changes: Vec<_> = journal.iter().map(|m| m.quantity_change).collect();
        assert_eq!(changes, vec![30, -18]);
        assert!(journal.iter().all(|m| m.reason == StockReason::Initial));
    }

    #[tokio::test]
    async fn test_bulk_sales_are_independent() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "bar", 3).await;

        let results = db
            .orchestrator()
            .record_sales_bulk(vec![
                cash_sale("bar", vec![SaleLine::new("heineken", 2)]),
                cash_sale("bar", vec![SaleLine::new("heineken", 2)]),
                cash_sale("bar", vec![SaleLine::new("heineken", 1)]),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(DbError::Domain(CoreError::InsufficientStock { available: 1, requested: 2, .. }))
        ));
        assert!(results[2].is_ok());
        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 0);

        let first = results[0].as_ref().unwrap();
        assert!(db.records().get_sale(first).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_journal_replays_to_position() {
        let db = memory_db().await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        cash_in(&db, "bar", 50_000).await;

        let orchestrator = db.orchestrator();
        orchestrator.purchase(one_box_purchase("bar", "heineken", 24_000)).await.unwrap();
        orchestrator
            .sale(cash_sale("bar", vec![SaleLine::new("heineken", 5)]))
            .await
            .unwrap();
        let _ = orchestrator
            .sale(cash_sale("bar", vec![SaleLine::new("heineken", 50)]))
            .await;
        orchestrator
            .transfer(TransferRequest {
                product_id: "heineken".into(),
                from_store_id: "bar".into(),
                to_store_id: "terrace".into(),
                quantity: 4,
                actor_id: None,
                notes: None,
            })
            .await
            .unwrap();

        for store in ["bar", "terrace"] {
            let journal = db.stock().journal("heineken", store).await.unwrap();
            let replayed = journal.iter().try_fold(0i64, |quantity, m| {
                (m.previous_quantity == quantity && m.is_consistent()).then_some(m.new_quantity)
            });
            let position = db.stock().position("heineken", store).await.unwrap();
            assert_eq!(replayed, Some(position.quantity));
            assert_eq!(journal.iter().map(|m| m.quantity_change).sum::<i64>(), position.quantity);
        }

        let cash = db.cash().history("bar", Some(100)).await.unwrap();
        let replayed: Money = cash.iter().map(|m| m.direction.signed(m.amount)).sum();
        assert_eq!(replayed, db.cash().balance(Some("bar")).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let (db, path) = file_db(4).await;
        seed_product(&db, "heineken", 24, 24_000, 1_500).await;
        stock_in(&db, "heineken", "bar", 10).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let orchestrator = db.orchestrator();
            handles.push(tokio::spawn(async move {
                orchestrator
                    .sale(cash_sale("bar", vec![SaleLine::new("heineken", 1)]))
                    .await
            }));
        }

        let mut sold = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { available: 0, .. })) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(sold, 10);
        assert_eq!(db.stock().position("heineken", "bar").await.unwrap().quantity, 0);

        // Each sale saw the quantity left by the one before it.
        let journal = db.stock().journal("heineken", "bar").await.unwrap();
        let previous: Vec<_> = journal.iter().skip(1).map(|m| m.previous_quantity).collect();
        assert_eq!(previous, (1..=10).rev().collect::<Vec<i64>>());
        assert_eq!(db.cash().balance(Some("bar")).await.unwrap(), Money::from_major(15_000));

        db.close().await;
        remove_db_files(&path);
    }
}
