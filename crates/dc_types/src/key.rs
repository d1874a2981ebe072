use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

// -----------------------------------------------------------------------------
// TypeKey

/// Process-unique identity of a [`TypeDesc`](crate::TypeDesc).
///
/// Two descriptors describe the same type iff their keys are equal.
/// Keys are allocated from a global counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u64);

impl TypeKey {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw key value.
    #[inline(always)]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::TypeKey;

    #[test]
    fn keys_are_unique_and_increasing() {
        let a = TypeKey::next();
        let b = TypeKey::next();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
