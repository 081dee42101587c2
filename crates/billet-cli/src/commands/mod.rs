//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, parse_range)
//! - `clients` - Client commands (list, add)
//! - `dashboard` - Analytics summary for a time range
//! - `export` - Detailed material CSV export
//! - `invoices` - Invoice commands (list, show, create, status, delete)
//! - `serve` - Web server command

pub mod clients;
pub mod core;
pub mod dashboard;
pub mod export;
pub mod invoices;
pub mod serve;

// Re-export command functions for main.rs
pub use clients::*;
pub use core::*;
pub use dashboard::*;
pub use export::*;
pub use invoices::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
