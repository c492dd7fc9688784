// ============================================================================
// Product Domain - Catalog records and the cached read path
// ============================================================================

pub mod models;
pub mod service;

pub use models::*;
pub use service::*;
