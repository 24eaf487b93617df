use core::num::NonZeroU32;
use std::cell::Cell;

/// Identity of a quantity. Never reused within a thread, and `Option`
/// of it is the same size as the id itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantityId(NonZeroU32);

thread_local! {
    static NEXT_QUANTITY: Cell<NonZeroU32> = const { Cell::new(NonZeroU32::MIN) };
}

/// Allocate a fresh quantity identity.
///
/// Quantity handles are `Rc`-based and stay on the thread that created them,
/// so a per-thread counter is enough to keep identities distinct.
pub fn next_quantity_id() -> QuantityId {
    NEXT_QUANTITY.with(|next| {
        let id = next.get();
        next.set(id.saturating_add(1));
        QuantityId(id)
    })
}
