pub mod api;
pub mod core;
pub mod error;
pub mod holdings_csv;
pub mod quotes;
