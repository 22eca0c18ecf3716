// Obras Budget - Core Library
// Exposes all modules for use in the CLI, the TUI and tests

pub mod error;
pub mod models;
pub mod store;
pub mod db;
pub mod catalog;    // Catalog operations (ids, prices, CSV price lists)
pub mod budget;     // Budget Aggregate - the active project's bill of materials
pub mod pricing;    // Bulk Price Adjuster
pub mod report;     // Report Formatter
pub mod export;     // Report export to a chosen path
pub mod session;    // Command dispatch
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{
    LineItem, Material, Project, ProjectFields,
    parse_decimal, round2,
};
pub use store::{CatalogStore, ProjectStore, Store};
pub use db::{setup_database, SqliteStore};
pub use budget::{BudgetAggregate, BudgetRow, BudgetSnapshot, BudgetState, compute_totals};
pub use pricing::{CategoryFilter, ALL_CATEGORIES, apply_increase, parse_percent};
pub use report::{Report, ReportRow, format_money, report_filename, sanitize_filename};
pub use export::{DirectoryChooser, SavePathChooser, export_report};
pub use session::{Command, Dashboard, Outcome, Session};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
