//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and
//! compared without ceremony.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Identifier of a point-of-interest entity, unique within a dataset.
    pub struct EntityId(u32);
}

typed_id! {
    /// Monotonically increasing route-request counter.
    ///
    /// `RequestId(0)` means "nothing issued yet"; the first request is 1.
    /// Comparing a completed request's id against the current one is the
    /// stale-check that enforces latest-wins.
    pub struct RequestId(u64);
}

impl RequestId {
    /// The id following `self`.
    #[inline]
    pub fn next(self) -> RequestId {
        RequestId(self.0 + 1)
    }
}
