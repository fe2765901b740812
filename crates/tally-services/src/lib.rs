//! Domain services: intent handling, duplicate resolution, and the
//! confirmation workflow shared by the sales and finance verticals.

pub mod classifier;
pub mod confirm;
pub mod finance;
pub mod history;
pub mod matcher;
pub mod merge;
pub mod pending;
pub mod sales;

pub use finance::FinanceService;
pub use sales::SalesService;
