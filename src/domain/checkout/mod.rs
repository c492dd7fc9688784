// ============================================================================
// Checkout Domain - from a CheckoutRequest to a committed, announced Order
// ============================================================================

pub mod errors;
pub mod events;
pub mod history;
pub mod orchestrator;
pub mod summary;
pub mod validator;
pub mod value_objects;

pub use errors::*;
pub use events::*;
pub use history::OrderHistoryService;
pub use orchestrator::{CheckoutOrchestrator, CheckoutStage};
pub use summary::OrderSummary;
pub use validator::{check_line, check_unique_products, InventoryValidator, MAX_LINE_QUANTITY};
pub use value_objects::*;
