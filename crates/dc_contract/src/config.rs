/// Runtime options of a [`ContractCache`](crate::ContractCache).
///
/// # Examples
///
/// ```
/// use dc_contract::CacheConfig;
///
/// let config = CacheConfig::new().validate_member_access(true);
/// assert!(config.constructor_required);
/// assert!(config.validate_member_access);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// A collection without a default constructor is read-only.
    ///
    /// When `false` the collection stays mutable and the host supplies
    /// instances.
    pub constructor_required: bool,
    /// Reject contracts that need non-public member access.
    pub validate_member_access: bool,
}

impl CacheConfig {
    pub const DEFAULT: Self = Self {
        constructor_required: true,
        validate_member_access: false,
    };

    #[inline]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    #[inline]
    pub const fn constructor_required(mut self, value: bool) -> Self {
        self.constructor_required = value;
        self
    }

    #[inline]
    pub const fn validate_member_access(mut self, value: bool) -> Self {
        self.validate_member_access = value;
        self
    }
}

impl Default for CacheConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}
