//! Known enumerable-shaped capability interfaces and the capability scan.

use core::fmt;

use dc_types::{TypeDesc, TypeRef, instantiate, known};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// CollectionKind

/// The shape of a collection contract.
///
/// The eight capability kinds are ordered by priority, highest first.
/// `Array` is not a capability, arrays are recognised structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollectionKind {
    GenericDictionary = 1,
    Dictionary = 2,
    GenericList = 3,
    GenericCollection = 4,
    List = 5,
    GenericEnumerable = 6,
    Collection = 7,
    Enumerable = 8,
    Array = 9,
}

impl CollectionKind {
    /// The capability kinds in priority order.
    pub const CAPABILITIES: [Self; 8] = [
        Self::GenericDictionary,
        Self::Dictionary,
        Self::GenericList,
        Self::GenericCollection,
        Self::List,
        Self::GenericEnumerable,
        Self::Collection,
        Self::Enumerable,
    ];

    /// Priority tier, `1` is the highest. `None` for arrays.
    #[inline]
    pub const fn priority(self) -> Option<u8> {
        match self {
            Self::Array => None,
            _ => Some(self as u8),
        }
    }

    /// The known interface of the capability.
    pub fn interface(self) -> Option<&'static TypeRef> {
        let k = known();
        Some(match self {
            Self::GenericDictionary => &k.idictionary_kv,
            Self::Dictionary => &k.idictionary,
            Self::GenericList => &k.ilist_t,
            Self::GenericCollection => &k.icollection_t,
            Self::List => &k.ilist,
            Self::GenericEnumerable => &k.ienumerable_t,
            Self::Collection => &k.icollection,
            Self::Enumerable => &k.ienumerable,
            Self::Array => return None,
        })
    }

    #[inline]
    pub const fn is_dictionary(self) -> bool {
        matches!(self, Self::GenericDictionary | Self::Dictionary)
    }

    /// Tiers 6 to 8 resolve an ambiguous match by falling back to
    /// `IEnumerable`; higher tiers reject it.
    #[inline]
    pub const fn tolerates_ambiguity(self) -> bool {
        matches!(
            self,
            Self::GenericEnumerable | Self::Collection | Self::Enumerable
        )
    }

    /// The capability `iface` stands for, matching generic definitions.
    pub fn of_interface(iface: &TypeDesc) -> Option<Self> {
        Self::CAPABILITIES.into_iter().find(|kind| {
            kind.interface()
                .is_some_and(|known_iface| iface.is_instance_of(known_iface))
        })
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// -----------------------------------------------------------------------------
// Scan

/// The outcome of a capability scan.
#[derive(Debug, Clone)]
pub struct CapabilityMatch {
    pub kind: CollectionKind,
    /// The implemented interface that matched.
    pub interface: TypeRef,
    /// Two unrelated interfaces matched at `kind`'s tier.
    pub multiple_definitions: bool,
}

/// Scans the interfaces implemented by `ty` for the highest-priority
/// capability.
///
/// `ty` itself is not considered, see [`CollectionKind::of_interface`].
pub fn scan(ty: &TypeDesc) -> Option<CapabilityMatch> {
    let mut best: Option<CapabilityMatch> = None;
    for iface in ty.all_interfaces() {
        let Some(kind) = CollectionKind::of_interface(&iface) else {
            continue;
        };
        let replace = match &mut best {
            Some(current) if kind > current.kind => false,
            Some(current) if kind == current.kind => {
                let related = iface.is_assignable_to(&current.interface)
                    || current.interface.is_assignable_to(&iface);
                if !related {
                    current.multiple_definitions = true;
                }
                false
            }
            _ => true,
        };
        if replace {
            best = Some(CapabilityMatch {
                kind,
                interface: iface,
                multiple_definitions: false,
            });
        }
    }
    best
}

/// Like [`scan`], but a capability interface matches itself first.
pub fn scan_with_self(ty: &TypeRef) -> Option<CapabilityMatch> {
    if ty.is_interface()
        && let Some(kind) = CollectionKind::of_interface(ty)
    {
        return Some(CapabilityMatch {
            kind,
            interface: ty.clone(),
            multiple_definitions: false,
        });
    }
    scan(ty)
}

/// The item type of a collection seen through `iface` of capability `kind`.
///
/// Dictionaries yield the synthetic `KeyValue<K, V>`; generic capabilities
/// their argument; the others `object`.
pub fn item_type(kind: CollectionKind, iface: &TypeDesc) -> TypeRef {
    let k = known();
    let args = iface.generic_args();
    match kind {
        CollectionKind::GenericDictionary if args.len() == 2 => {
            instantiate(&k.key_value, args).unwrap_or_else(|_| k.key_value.clone())
        }
        CollectionKind::Dictionary => {
            let object = [k.object.clone(), k.object.clone()];
            instantiate(&k.key_value, &object).unwrap_or_else(|_| k.key_value.clone())
        }
        CollectionKind::GenericList
        | CollectionKind::GenericCollection
        | CollectionKind::GenericEnumerable => {
            args.first().cloned().unwrap_or_else(|| k.object.clone())
        }
        _ => k.object.clone(),
    }
}

/// The item type of a collection-shaped type, for naming purposes.
///
/// Ambiguous low tiers fall back to `object`, as the builder does.
pub fn item_type_of(ty: &TypeRef) -> Option<TypeRef> {
    if let dc_types::TypeShape::Array { element, .. } = ty.shape() {
        return Some(element.clone());
    }
    let found = scan_with_self(ty)?;
    if found.multiple_definitions && found.kind.tolerates_ambiguity() {
        return Some(known().object.clone());
    }
    Some(item_type(found.kind, &found.interface))
}
