//! # Ledgers
//!
//! Stock and cash positions and their append-only movement logs.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_movement(uow, movement)                                          │
//! │       │                                                                 │
//! │       ├── uow.conn()            NoActiveTransaction if closed          │
//! │       ├── lock position         create at 0 if absent                  │
//! │       ├── new = previous ± change                                      │
//! │       ├── new < 0 ?             Insufficient{Stock,Cash}, no write     │
//! │       ├── UPDATE position       one row                                │
//! │       └── INSERT movement       one row, prev/new snapshots            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Positions are never written anywhere else. The orchestrator only calls
//! `apply_movement` on a shared unit of work.

pub mod cash;
pub mod stock;

pub use cash::CashLedger;
pub use stock::StockLedger;
