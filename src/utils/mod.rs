//! Utility modules

pub mod mapping;

pub use mapping::LedgerAccountMap;
