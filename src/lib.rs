// src/lib.rs

pub mod core;
pub mod logging;

pub use crate::core::config::ScanOptions;
pub use crate::core::error::ScanError;
pub use crate::core::models::ScanResult;
pub use crate::core::scanner::{Scanner, scan};
