//! ef-core: stable foundation for eqflow.
//!
//! Contains:
//! - units (runtime SI units + uom bridge)
//! - quantity (shared, unit-tagged model quantities)
//! - numeric (tolerances + float helpers)
//! - ids (quantity identities)
//! - named (insertion-ordered name maps)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod named;
pub mod numeric;
pub mod quantity;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::{QuantityId, next_quantity_id};
pub use named::NamedMap;
pub use numeric::*;
pub use quantity::{Quantity, QuantityKind, WeakQuantity};
pub use units::{Measure, Unit, si};
