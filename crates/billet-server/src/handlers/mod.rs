//! API route handlers

pub mod audit;
pub mod clients;
pub mod dashboard;
pub mod export;
pub mod invoices;

pub use audit::*;
pub use clients::*;
pub use dashboard::*;
pub use export::*;
pub use invoices::*;
