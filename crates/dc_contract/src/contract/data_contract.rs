use alloc::sync::{Arc, Weak};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use dc_types::xml::QualifiedName;
use dc_types::{PrimitiveKind, TypeKey, TypeRef, Visibility};
use dc_utils::TryOnceCell;
use dc_utils::hash::HashSet;
use serde::{Deserialize, Serialize};

use crate::cache::ContractCache;
use crate::contract::{ClassContract, CollectionContract, EnumContract, Mutability, XmlContract};
use crate::error::{ContractError, VisibilityIssue};

/// Shared handle of a contract.
pub type ContractRef = Arc<DataContract>;

// -----------------------------------------------------------------------------
// ContractId

/// Process-unique identity of a contract instance.
///
/// Bound contracts are new instances, so they get their own ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId(u64);

impl ContractId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

// -----------------------------------------------------------------------------
// Category

/// The category of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Primitive,
    Enum,
    Collection,
    Class,
    XmlSpecial,
    /// An unbound generic parameter of an open generic type.
    GenericParameter,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive => f.pad("Primitive"),
            Self::Enum => f.pad("Enum"),
            Self::Collection => f.pad("Collection"),
            Self::Class => f.pad("Class"),
            Self::XmlSpecial => f.pad("XmlSpecial"),
            Self::GenericParameter => f.pad("GenericParameter"),
        }
    }
}

// -----------------------------------------------------------------------------
// ContractKind

/// Payload of a primitive contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveContract {
    pub kind: PrimitiveKind,
}

/// The category-specific payload of a [`DataContract`].
#[derive(Debug)]
pub enum ContractKind {
    Primitive(PrimitiveContract),
    Enum(EnumContract),
    Collection(CollectionContract),
    Class(ClassContract),
    XmlSpecial(XmlContract),
    /// Replaced by the positional argument when the owning contract is bound.
    GenericParameter { position: usize },
}

impl ContractKind {
    pub const fn category(&self) -> Category {
        match self {
            Self::Primitive(_) => Category::Primitive,
            Self::Enum(_) => Category::Enum,
            Self::Collection(_) => Category::Collection,
            Self::Class(_) => Category::Class,
            Self::XmlSpecial(_) => Category::XmlSpecial,
            Self::GenericParameter { .. } => Category::GenericParameter,
        }
    }
}

// -----------------------------------------------------------------------------
// ContractLink

/// An edge from one contract to another.
///
/// Bound contracts refer back to a contract whose binding is still in
/// progress through a weak link, the binding cache owns the target.
#[derive(Debug, Clone)]
pub enum ContractLink {
    Strong(ContractRef),
    Back(Weak<DataContract>),
}

impl ContractLink {
    /// The target, `None` if a weak target was dropped.
    #[inline]
    pub fn upgrade(&self) -> Option<ContractRef> {
        match self {
            Self::Strong(contract) => Some(contract.clone()),
            Self::Back(weak) => weak.upgrade(),
        }
    }

    /// The target, or [`ContractError::Detached`] naming `ty`.
    pub(crate) fn resolve(&self, ty: &TypeRef) -> Result<ContractRef, ContractError> {
        self.upgrade().ok_or_else(|| ContractError::Detached {
            type_name: ty.full_name().to_owned(),
        })
    }
}

// -----------------------------------------------------------------------------
// DataContract

/// The complete wire-format knowledge of one type.
///
/// A contract is immutable once published. Fields that need other
/// contracts (collection items, class members, known types) are resolved
/// on first access through a compute-once cell.
pub struct DataContract {
    id: ContractId,
    ty: TypeRef,
    name: QualifiedName,
    is_reference: bool,
    kind: ContractKind,
    known: TryOnceCell<Vec<ContractRef>>,
}

// Helper macro that implements accessors like `as_enum`.
macro_rules! impl_cast_method {
    ($name:ident : $kind:ident => $payload:ident) => {
        /// The payload, if the contract is of this category.
        #[inline]
        pub const fn $name(&self) -> Option<&$payload> {
            match &self.kind {
                ContractKind::$kind(payload) => Some(payload),
                _ => None,
            }
        }
    };
}

impl DataContract {
    pub(crate) fn new(ty: TypeRef, name: QualifiedName, kind: ContractKind, is_reference: bool) -> Self {
        Self {
            id: ContractId::next(),
            ty,
            name,
            is_reference,
            kind,
            known: TryOnceCell::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ContractId {
        self.id
    }

    /// The described type.
    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The stable wire name.
    #[inline]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Reference tracking is requested for instances.
    #[inline]
    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    #[inline]
    pub fn is_value_type(&self) -> bool {
        self.ty.is_value_type()
    }

    #[inline]
    pub const fn category(&self) -> Category {
        self.kind.category()
    }

    #[inline]
    pub const fn kind(&self) -> &ContractKind {
        &self.kind
    }

    impl_cast_method!(as_primitive: Primitive => PrimitiveContract);
    impl_cast_method!(as_enum: Enum => EnumContract);
    impl_cast_method!(as_collection: Collection => CollectionContract);
    impl_cast_method!(as_class: Class => ClassContract);
    impl_cast_method!(as_xml: XmlSpecial => XmlContract);

    /// The position of a generic-parameter contract.
    #[inline]
    pub const fn generic_position(&self) -> Option<usize> {
        match self.kind {
            ContractKind::GenericParameter { position } => Some(position),
            _ => None,
        }
    }

    /// Contracts of the types declared with `KnownType` on the type and its
    /// base types, nearest first, without duplicates.
    pub fn known_contracts(&self, cache: &ContractCache) -> Result<&[ContractRef], ContractError> {
        let known = self.known.get_or_try_init(|| {
            let mut seen = HashSet::<TypeKey>::default();
            let mut out = Vec::new();
            let levels = core::iter::once(self.ty.clone()).chain(self.ty.base_chain());
            for level in levels {
                for known_ty in level.attributes().known_types() {
                    if seen.insert(known_ty.key()) {
                        out.push(cache.get_or_build(known_ty)?);
                    }
                }
            }
            Ok::<_, ContractError>(out)
        })?;
        Ok(known)
    }

    /// The namespace of item elements, when it differs from the collection's.
    ///
    /// `None` for non-collections, and for items that are primitive, enum
    /// or XML-special or live in the collection's own namespace.
    pub fn child_element_namespace(&self, cache: &ContractCache) -> Result<Option<&str>, ContractError> {
        let Some(collection) = self.as_collection() else {
            return Ok(None);
        };
        collection.child_element_namespace(&self.ty, &self.name, cache)
    }

    /// Fails with [`ContractError::ReadOnlyCollection`] if instances cannot
    /// be reconstructed from the wire.
    pub fn ensure_deserializable(&self) -> Result<(), ContractError> {
        match self.as_collection().and_then(CollectionContract::read_only_reason) {
            Some(reason) => Err(ContractError::ReadOnlyCollection {
                type_name: self.ty.full_name().to_owned(),
                reason: reason.to_owned(),
            }),
            None => Ok(()),
        }
    }

    /// Every contract built by this crate can be written.
    #[inline]
    pub fn ensure_serializable(&self) -> Result<(), ContractError> {
        Ok(())
    }

    /// Structural equality.
    ///
    /// Names, reference tracking and value-typeness must match, then the
    /// payloads. Collections compare item names, item nullability and item
    /// contracts, recursively; cycles compare equal.
    pub fn equivalent(&self, other: &DataContract) -> bool {
        Equivalence::default().eq(self, other)
    }
}

impl fmt::Debug for DataContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Lazy links may be cyclic.
        f.debug_struct("DataContract")
            .field("id", &self.id)
            .field("type", &self.ty.full_name())
            .field("name", &self.name)
            .field("category", &self.category())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DataContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} contract {} for `{}`", self.category(), self.name, self.ty)
    }
}

// -----------------------------------------------------------------------------
// Equivalence

/// Pairwise comparison state, pairs under comparison count as equal.
#[derive(Default)]
pub(crate) struct Equivalence {
    visiting: HashSet<(ContractId, ContractId)>,
}

impl Equivalence {
    pub(crate) fn eq(&mut self, a: &DataContract, b: &DataContract) -> bool {
        if a.id == b.id {
            return true;
        }
        if a.name != b.name
            || a.is_reference != b.is_reference
            || a.is_value_type() != b.is_value_type()
        {
            return false;
        }
        if !self.visiting.insert((a.id, b.id)) {
            return true;
        }
        let equal = match (&a.kind, &b.kind) {
            (ContractKind::Primitive(x), ContractKind::Primitive(y)) => x == y,
            (ContractKind::Enum(x), ContractKind::Enum(y)) => x.same_shape(y),
            (ContractKind::Collection(x), ContractKind::Collection(y)) => x.same_shape(y, self),
            (ContractKind::Class(x), ContractKind::Class(y)) => x.same_shape(y, self),
            (ContractKind::XmlSpecial(x), ContractKind::XmlSpecial(y)) => x == y,
            (
                ContractKind::GenericParameter { position: x },
                ContractKind::GenericParameter { position: y },
            ) => x == y,
            _ => false,
        };
        self.visiting.remove(&(a.id, b.id));
        equal
    }

    /// Compares two lazily resolved links. Unresolved links compare by type.
    pub(crate) fn links(
        &mut self,
        a: Option<&ContractLink>,
        a_ty: &TypeRef,
        b: Option<&ContractLink>,
        b_ty: &TypeRef,
    ) -> bool {
        match (a.and_then(ContractLink::upgrade), b.and_then(ContractLink::upgrade)) {
            (Some(x), Some(y)) => self.eq(&x, &y),
            _ => a_ty.key() == b_ty.key(),
        }
    }
}

// -----------------------------------------------------------------------------
// Member access

/// Checks that the contract can be used without non-public member access.
pub(crate) fn check_member_access(contract: &DataContract) -> Result<(), ContractError> {
    let ty = contract.ty();
    let fail = |issue| Err(ContractError::visibility(ty, issue));
    if !ty.is_public() {
        return fail(VisibilityIssue::TypeNotPublic);
    }
    match contract.kind() {
        ContractKind::Collection(collection) => {
            if !collection.item_type().is_public() {
                return fail(VisibilityIssue::ItemTypeNotPublic {
                    item_type: collection.item_type().full_name().to_owned(),
                });
            }
            if let Mutability::Mutable { add, constructor } = collection.mutability() {
                if constructor.as_ref().is_some_and(|c| c.visibility != Visibility::Public) {
                    return fail(VisibilityIssue::ConstructorNotPublic);
                }
                if add.as_ref().is_some_and(|a| a.method.visibility != Visibility::Public) {
                    return fail(VisibilityIssue::AddMethodNotPublic);
                }
            }
        }
        ContractKind::Class(class) => {
            if let Some(member) = class.members().iter().find(|m| !m.is_public()) {
                return fail(VisibilityIssue::MemberNotPublic {
                    member: member.name().to_owned(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}
