// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - product/  : catalog records and the cached product read path
// - checkout/ : the order-placement protocol (validation, summary,
//               persistence hand-off, event publication)
//
// Infrastructure adapters live in store/, cache/ and messaging/.
//
// ============================================================================

pub mod checkout;
pub mod product;
