use core::fmt::Debug;
use std::sync::{Mutex, OnceLock, PoisonError};

// -----------------------------------------------------------------------------
// TryOnceCell

/// A thread-safe cell written once by a fallible initializer.
///
/// Reads of an initialized cell are lock-free. The first reader of an empty
/// cell takes the cell's lock, checks again and runs the initializer; other
/// readers wait for it. A failed initializer publishes nothing, the next
/// reader runs it again.
///
/// The initializer must not read the same cell.
///
/// # Examples
///
/// ```
/// use dc_utils::TryOnceCell;
///
/// let cell = TryOnceCell::<u32>::new();
/// assert_eq!(cell.get_or_try_init(|| Err::<u32, _>("not yet")), Err("not yet"));
/// assert_eq!(cell.get_or_try_init(|| Ok::<_, &str>(7)), Ok(&7));
/// assert_eq!(cell.get_or_try_init(|| Ok::<_, &str>(8)), Ok(&7));
/// assert_eq!(cell.get(), Some(&7));
/// ```
pub struct TryOnceCell<T> {
    value: OnceLock<T>,
    init: Mutex<()>,
}

impl<T> TryOnceCell<T> {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Creates an initialized cell.
    pub fn with_value(value: T) -> Self {
        let cell = Self::new();
        let _ = cell.value.set(value);
        cell
    }

    /// The value, if initialized.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Initializes the cell with `value`.
    ///
    /// Returns the value back if the cell was already initialized.
    pub fn set(&self, value: T) -> Result<(), T> {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        self.value.set(value)
    }

    /// The value, running `f` first if the cell is empty.
    pub fn get_or_try_init<E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let value = f()?;
        Ok(self.value.get_or_init(|| value))
    }
}

impl<T> Default for TryOnceCell<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for TryOnceCell<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("TryOnceCell").field(value).finish(),
            None => f.write_str("TryOnceCell(<uninit>)"),
        }
    }
}
