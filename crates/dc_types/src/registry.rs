use dc_utils::KeyMap;
use dc_utils::hash::{HashMap, HashSet};

use crate::desc::TypeRef;
use crate::key::TypeKey;
use crate::known::known;

// -----------------------------------------------------------------------------
// TypeRegistry

/// A registry of host type descriptors.
///
/// Types are stored by [`TypeKey`] with two secondary indices: the full
/// path (`System.Collections.Generic.List<T>`) and the short name
/// (`List<T>`). Short names registered by several types are ambiguous and
/// are no longer answered.
///
/// # Example
///
/// ```
/// use dc_types::{TypeBuilder, registry::TypeRegistry};
///
/// let mut registry = TypeRegistry::new();
/// registry.register(&TypeBuilder::class("Shop", "Order").build());
/// registry.register(&TypeBuilder::class("Billing", "Order").build());
///
/// assert!(registry.get_with_type_path("Shop.Order").is_some());
/// assert!(registry.get_with_type_name("Order").is_none());
/// assert!(registry.is_ambiguous("Order"));
/// assert!(registry.get_with_type_name("Int32").is_some());
/// ```
pub struct TypeRegistry {
    types: KeyMap<TypeKey, TypeRef>,
    type_path_to_key: HashMap<String, TypeKey>,
    type_name_to_key: HashMap<String, TypeKey>,
    ambiguous_names: HashSet<String>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`] .
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create an empty [`TypeRegistry`].
    #[inline]
    pub fn empty() -> Self {
        Self {
            types: KeyMap::new(),
            type_path_to_key: HashMap::default(),
            type_name_to_key: HashMap::default(),
            ambiguous_names: HashSet::default(),
        }
    }

    /// Create a type registry holding every [known](crate::known) type.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for ty in known().iter() {
            registry.register(ty);
        }
        registry
    }

    // # Validity
    // The type must **not** already exist.
    fn add_new_type_indices(
        ty: &TypeRef,
        type_path_to_key: &mut HashMap<String, TypeKey>,
        type_name_to_key: &mut HashMap<String, TypeKey>,
        ambiguous_names: &mut HashSet<String>,
    ) {
        let type_name = ty.short_name();

        if !ambiguous_names.contains(type_name) {
            if type_name_to_key.contains_key(type_name) {
                type_name_to_key.remove(type_name);
                ambiguous_names.insert(type_name.to_owned());
            } else {
                type_name_to_key.insert(type_name.to_owned(), ty.key());
            }
        }

        // Later registrations of an equal path win the path index.
        type_path_to_key.insert(ty.full_name().to_owned(), ty.key());
    }

    /// Registers `ty` if it was not registered yet.
    ///
    /// Returns `true` if the type was inserted.
    pub fn register(&mut self, ty: &TypeRef) -> bool {
        self.types.try_insert(ty.key(), || {
            Self::add_new_type_indices(
                ty,
                &mut self.type_path_to_key,
                &mut self.type_name_to_key,
                &mut self.ambiguous_names,
            );
            ty.clone()
        })
    }

    /// Registers every type submitted with [`submit_type!`](crate::submit_type).
    ///
    /// Repeated calls are cheap and will not insert duplicates.
    ///
    /// ## Return Value
    ///
    /// Returns `true` if automatic registration is available, that is if the
    /// `auto_register` feature is enabled. Otherwise it does nothing and
    /// returns `false`.
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            for entry in inventory::iter::<AutoRegistration> {
                self.register(&(entry.0)());
            }
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    /// Whether the type with given [`TypeKey`] has been registered.
    #[inline]
    pub fn contains(&self, key: TypeKey) -> bool {
        self.types.contains(&key)
    }

    #[inline]
    pub fn get(&self, key: TypeKey) -> Option<&TypeRef> {
        self.types.get(&key)
    }

    /// Returns the type registered under the given full path.
    pub fn get_with_type_path(&self, type_path: &str) -> Option<&TypeRef> {
        match self.type_path_to_key.get(type_path) {
            Some(key) => self.get(*key),
            None => None,
        }
    }

    /// Returns the type registered under the given short name.
    ///
    /// If the name is ambiguous, or no type has it, returns `None`.
    pub fn get_with_type_name(&self, type_name: &str) -> Option<&TypeRef> {
        match self.type_name_to_key.get(type_name) {
            Some(key) => self.get(*key),
            None => None,
        }
    }

    /// Returns `true` if the given short name matches multiple registered types.
    pub fn is_ambiguous(&self, type_name: &str) -> bool {
        self.ambiguous_names.contains(type_name)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeRef> {
        self.types.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }
}

// -----------------------------------------------------------------------------
// Auto registration

/// A type submitted for [`TypeRegistry::auto_register`].
#[cfg(feature = "auto_register")]
pub struct AutoRegistration(pub fn() -> TypeRef);

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

/// Submits a type constructor for [`TypeRegistry::auto_register`].
///
/// The argument is a path to a `fn() -> TypeRef`. Without the
/// `auto_register` feature the macro expands to nothing.
///
/// ```
/// use dc_types::{TypeBuilder, TypeRef, submit_type, registry::TypeRegistry};
///
/// fn invoice() -> TypeRef {
///     static TY: std::sync::LazyLock<TypeRef> =
///         std::sync::LazyLock::new(|| TypeBuilder::class("Billing", "Invoice").build());
///     TY.clone()
/// }
///
/// submit_type!(invoice);
///
/// fn main() {
///     let mut registry = TypeRegistry::empty();
///     if registry.auto_register() {
///         assert!(registry.get_with_type_path("Billing.Invoice").is_some());
///     }
/// }
/// ```
#[macro_export]
macro_rules! submit_type {
    ($ctor:path) => {
        $crate::__submit_type! { $ctor }
    };
}

#[cfg(feature = "auto_register")]
#[doc(hidden)]
#[macro_export]
macro_rules! __submit_type {
    ($ctor:path) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::AutoRegistration($ctor)
        }
    };
}

#[cfg(not(feature = "auto_register"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __submit_type {
    ($ctor:path) => {};
}

#[cfg(test)]
mod tests {
    use super::TypeRegistry;
    use crate::builder::TypeBuilder;
    use crate::known::known;

    #[test]
    fn register_is_idempotent() {
        let mut registry = TypeRegistry::empty();
        let ty = TypeBuilder::class("App", "Thing").build();
        assert!(registry.register(&ty));
        assert!(!registry.register(&ty));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(ty.key()));
    }

    #[test]
    fn new_holds_known_types() {
        let registry = TypeRegistry::new();
        let k = known();
        assert!(registry.contains(k.list.key()));
        assert_eq!(
            registry
                .get_with_type_path("System.Collections.Generic.List<T>")
                .map(|t| t.key()),
            Some(k.list.key())
        );
        // `IEnumerable<T>` and `IEnumerable` have different short names.
        assert!(registry.get_with_type_name("IEnumerable").is_some());
    }
}
