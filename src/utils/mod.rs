//! Utility modules

pub mod memory_storage;
pub mod sanitize;
pub mod validation;

pub use memory_storage::*;
pub use sanitize::*;
pub use validation::*;
