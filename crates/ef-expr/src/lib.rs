//! ef-expr: symbolic expressions over quantity handles.
//!
//! Just enough algebra for equation blocks: building trees with operators,
//! walking them in a stable order, substituting leaves and evaluating. No
//! simplification and no symbolic differentiation; `d(y)/d(t)` is an opaque
//! unknown.

pub mod display;
pub mod error;
pub mod eval;
pub mod expr;
pub mod rewrite;
pub mod walk;

pub use error::{ExprError, ExprResult};
pub use eval::{Bindings, CurrentValues, SlotValues};
pub use expr::{BinaryOp, Derivative, Expr, Relation, Slot, Symbolic, UnaryOp};
pub use walk::Term;
