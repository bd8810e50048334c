//! crumblog/crates/cl-core/src/lib.rs
//!
//! The central domain logic and interface definitions for crumblog.

pub mod catalog;
pub mod error;
pub mod models;
pub mod services;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use catalog::*;
pub use error::*;
pub use models::*;
pub use services::*;
pub use traits::*;
