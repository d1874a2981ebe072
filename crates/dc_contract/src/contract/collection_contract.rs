use alloc::sync::Arc;

use dc_types::attrs::CollectionDataContractAttr;
use dc_types::xml::QualifiedName;
use dc_types::{CtorDesc, MethodDesc, TypeDesc, TypeRef, TypeShape, array_of, instantiate, known};
use dc_utils::TryOnceCell;

use crate::cache::ContractCache;
use crate::capability::{self, CollectionKind};
use crate::contract::data_contract::Equivalence;
use crate::contract::{Category, ContractKind, ContractLink, ContractRef, DataContract};
use crate::error::{CollectionContext, ContractError, DefinitionReason};
use crate::{names, primitive, resolver};

// -----------------------------------------------------------------------------
// Payload parts

/// A method together with the type that declares it.
#[derive(Debug, Clone)]
pub struct MethodSource {
    pub owner: TypeRef,
    pub method: MethodDesc,
}

impl MethodSource {
    fn substitute(&self, args: &[TypeRef]) -> Self {
        let sub = |t: &TypeRef| dc_types::substitute(t, args);
        Self {
            owner: sub(&self.owner),
            method: MethodDesc {
                params: self.method.params.iter().map(sub).collect(),
                returns: self.method.returns.as_ref().map(sub),
                implements: self.method.implements.as_ref().map(sub),
                ..self.method.clone()
            },
        }
    }
}

/// How instances are populated when read.
#[derive(Debug, Clone)]
pub enum Mutability {
    /// Items are added one by one.
    ///
    /// `add` is `None` for arrays and for interfaces without an `Add`, which
    /// are read through their stand-in. `constructor` is `None` for value
    /// types, arrays, interfaces, and when no constructor was required.
    Mutable {
        add: Option<MethodSource>,
        constructor: Option<CtorDesc>,
    },
    /// The collection can be written but never read back.
    ReadOnly { reason: String },
}

/// Element names of dictionary entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueNames {
    pub key: String,
    pub value: String,
}

impl KeyValueNames {
    pub const DEFAULT_KEY: &'static str = "Key";
    pub const DEFAULT_VALUE: &'static str = "Value";

    #[inline]
    pub fn is_default(&self) -> bool {
        self.key == Self::DEFAULT_KEY && self.value == Self::DEFAULT_VALUE
    }
}

// -----------------------------------------------------------------------------
// CollectionContract

/// The payload of a collection contract.
#[derive(Debug)]
pub struct CollectionContract {
    kind: CollectionKind,
    item_type: TypeRef,
    item_name: String,
    item_name_explicit: bool,
    key_value_names: Option<KeyValueNames>,
    item_nullable: bool,
    enumerator: Option<MethodSource>,
    mutability: Mutability,
    stand_in: Option<TypeRef>,
    explicit: bool,
    item: TryOnceCell<ContractLink>,
    child_ns: TryOnceCell<Option<String>>,
}

impl CollectionContract {
    #[inline]
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    #[inline]
    pub fn item_type(&self) -> &TypeRef {
        &self.item_type
    }

    /// The local name of item elements.
    #[inline]
    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    /// The item name comes from an explicit collection contract.
    #[inline]
    pub fn is_item_name_explicit(&self) -> bool {
        self.item_name_explicit
    }

    /// Present if and only if the collection is dictionary-shaped.
    #[inline]
    pub fn key_value_names(&self) -> Option<&KeyValueNames> {
        self.key_value_names.as_ref()
    }

    /// Items may be absent on the wire.
    #[inline]
    pub fn is_item_nullable(&self) -> bool {
        self.item_nullable
    }

    /// The `GetEnumerator` used when writing.
    #[inline]
    pub fn enumerator(&self) -> Option<&MethodSource> {
        self.enumerator.as_ref()
    }

    #[inline]
    pub fn mutability(&self) -> &Mutability {
        &self.mutability
    }

    /// The degradation reason of a read-only collection.
    pub fn read_only_reason(&self) -> Option<&str> {
        match &self.mutability {
            Mutability::ReadOnly { reason } => Some(reason),
            Mutability::Mutable { .. } => None,
        }
    }

    /// The concrete type instantiated when reading an interface-typed
    /// collection.
    #[inline]
    pub fn stand_in(&self) -> Option<&TypeRef> {
        self.stand_in.as_ref()
    }

    /// The type declares an explicit collection contract.
    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// The contract of the items.
    ///
    /// Dictionaries with renamed keys or values get a private copy of the
    /// entry contract using those names.
    pub fn item_contract(&self, cache: &ContractCache) -> Result<ContractRef, ContractError> {
        let link = self.item.get_or_try_init(|| {
            let item = cache.get_or_build(&self.item_type)?;
            let renamed = match (&self.key_value_names, item.as_class()) {
                (Some(names), Some(class)) if !names.is_default() => {
                    let class = class.renamed(&names.key, &names.value);
                    let contract = DataContract::new(
                        item.ty().clone(),
                        item.name().clone(),
                        ContractKind::Class(class),
                        item.is_reference(),
                    );
                    Arc::new(contract)
                }
                _ => item,
            };
            Ok::<_, ContractError>(ContractLink::Strong(renamed))
        })?;
        link.resolve(&self.item_type)
    }

    /// The item link, if resolved.
    pub(crate) fn item_link(&self) -> Option<&ContractLink> {
        self.item.get()
    }

    pub(crate) fn child_element_namespace(
        &self,
        ty: &TypeRef,
        name: &QualifiedName,
        cache: &ContractCache,
    ) -> Result<Option<&str>, ContractError> {
        let ns = self.child_ns.get_or_try_init(|| {
            let item = self.item_contract(cache)?;
            let plain = matches!(
                item.category(),
                Category::Primitive | Category::Enum | Category::XmlSpecial
            );
            let item_ns = item.name().namespace();
            let differs = !item_ns.is_empty() && item_ns != name.namespace();
            log::trace!("child namespace of `{ty}` resolved");
            Ok::<_, ContractError>((!plain && differs).then(|| item_ns.to_owned()))
        })?;
        Ok(ns.as_deref())
    }

    pub(crate) fn same_shape(&self, other: &Self, eq: &mut Equivalence) -> bool {
        self.item_name == other.item_name
            && self.item_nullable == other.item_nullable
            && eq.links(
                self.item_link(),
                &self.item_type,
                other.item_link(),
                &other.item_type,
            )
    }

    /// A copy for a bound contract: types substituted, item unresolved.
    pub(crate) fn rebind(&self, args: &[TypeRef], item_name: String) -> Self {
        let sub = |t: &TypeRef| dc_types::substitute(t, args);
        let item_type = sub(&self.item_type);
        let mutability = match &self.mutability {
            Mutability::Mutable { add, constructor } => Mutability::Mutable {
                add: add.as_ref().map(|a| a.substitute(args)),
                constructor: constructor.clone(),
            },
            read_only => read_only.clone(),
        };
        Self {
            kind: self.kind,
            item_nullable: is_nullable_item(&item_type),
            item_type,
            item_name,
            item_name_explicit: self.item_name_explicit,
            key_value_names: self.key_value_names.clone(),
            enumerator: self.enumerator.as_ref().map(|e| e.substitute(args)),
            mutability,
            stand_in: self.stand_in.as_ref().map(sub),
            explicit: self.explicit,
            item: TryOnceCell::new(),
            child_ns: TryOnceCell::new(),
        }
    }

    /// Sets the item link of a bound contract.
    pub(crate) fn link_item(&self, link: ContractLink) {
        let _ = self.item.set(link);
    }
}

fn is_nullable_item(item: &TypeRef) -> bool {
    !item.is_value_type() || names::unwrap_nullable(item).key() != item.key()
}

// -----------------------------------------------------------------------------
// Build

/// The outcome of a collection build.
pub(crate) enum CollectionBuild {
    Built(DataContract),
    /// The type is not a collection, classify it otherwise.
    NotCollection,
}

/// The shape found by the interface or concrete-type analysis.
struct Shape {
    kind: CollectionKind,
    item: TypeRef,
    enumerator: Option<MethodSource>,
    mutability: Mutability,
    stand_in: Option<TypeRef>,
}

/// Builds the contract of a collection type.
///
/// Without `constructor_required`, a missing default constructor does not
/// make the collection read-only.
pub(crate) fn build(ty: &TypeRef, constructor_required: bool) -> Result<CollectionBuild, ContractError> {
    let fail = |reason| Err(ContractError::definition(ty, reason));

    if let TypeShape::Array { element, rank } = ty.shape() {
        if *rank > 1 {
            return fail(DefinitionReason::ArrayRankUnsupported { rank: *rank });
        }
        let shape = Shape {
            kind: CollectionKind::Array,
            item: element.clone(),
            enumerator: find_enumerator(ty, None),
            mutability: Mutability::Mutable {
                add: None,
                constructor: None,
            },
            stand_in: None,
        };
        return finish(ty, None, shape).map(CollectionBuild::Built);
    }

    let attrs = ty.attributes();
    let explicit = attrs.collection_data_contract();

    // 1. Built-in types.
    if primitive::lookup(ty).is_some() {
        if explicit.is_some() {
            return fail(DefinitionReason::CollectionIsBuiltIn);
        }
        return Ok(CollectionBuild::NotCollection);
    }

    // 2. Error context.
    let context = if explicit.is_some() {
        CollectionContext::ExplicitContract
    } else if base_is_collection(ty) {
        CollectionContext::CollectionBase
    } else {
        CollectionContext::Plain
    };

    // 3. Conflicting class contract.
    if attrs.data_contract().is_some() {
        return fail(DefinitionReason::CollectionHasDataContract { context });
    }

    // 4. Self-describing XML.
    if resolver::is_self_describing_xml(ty) {
        return Ok(CollectionBuild::NotCollection);
    }

    // 5. Not enumerable.
    let k = known();
    if !ty.is_assignable_to(&k.ienumerable) {
        if explicit.is_some() {
            return fail(DefinitionReason::NotEnumerable { context });
        }
        return Ok(CollectionBuild::NotCollection);
    }

    let shape = match interface_shape(ty) {
        // 6. Capability interfaces.
        Some(shape) => shape,
        // 7. Concrete types.
        None => concrete_shape(ty, constructor_required, context)?,
    };

    // 8, 9.
    finish(ty, explicit, shape).map(CollectionBuild::Built)
}

// Whether the nearest non-trivial base type is itself a collection.
fn base_is_collection(ty: &TypeDesc) -> bool {
    let k = known();
    ty.base()
        .filter(|base| base.key() != k.object.key())
        .is_some_and(|base| {
            base.attributes().collection_data_contract().is_some()
                || base.is_array()
                || capability::scan(base).is_some()
        })
}

fn interface_shape(ty: &TypeRef) -> Option<Shape> {
    if !ty.is_interface() {
        return None;
    }
    let kind = CollectionKind::of_interface(ty)?;
    let item = capability::item_type(kind, ty);
    let add_params = if kind.is_dictionary() { 2 } else { 1 };
    let add = find_interface_method(ty, "Add", add_params);
    Some(Shape {
        kind,
        stand_in: stand_in(kind, ty, &item),
        item,
        enumerator: find_enumerator(ty, Some(ty)),
        mutability: Mutability::Mutable {
            add,
            constructor: None,
        },
    })
}

fn concrete_shape(
    ty: &TypeRef,
    constructor_required: bool,
    context: CollectionContext,
) -> Result<Shape, ContractError> {
    let attrs = ty.attributes();
    let serializable = attrs.is_serializable();
    let fail = |reason| ContractError::definition(ty, reason);

    // 7a. Default constructor.
    let constructor = ty.default_constructor().cloned();
    let mut read_only = None;
    if constructor.is_none() && !ty.is_value_type() && constructor_required {
        if serializable {
            return Err(fail(DefinitionReason::MissingDefaultConstructor { context }));
        }
        read_only = Some(format!(
            "`{}` has no default constructor",
            ty.full_name()
        ));
    }

    // 7b. Highest-priority capability.
    let Some(found) = capability::scan(ty) else {
        return Err(fail(DefinitionReason::NotEnumerable { context }));
    };

    let k = known();
    let (kind, iface, add) = if found.kind.tolerates_ambiguity() {
        // 7c. Ambiguity falls back to the plain enumerable.
        let (kind, iface) = if found.multiple_definitions {
            log::debug!(
                "`{ty}` implements `{}` more than once, using IEnumerable",
                found.interface
            );
            (CollectionKind::Enumerable, k.ienumerable.clone())
        } else {
            (found.kind, found.interface)
        };
        let item = capability::item_type(kind, &iface);
        let add = find_own_method(ty, |m| {
            m.name == "Add"
                && !m.is_static
                && m.visibility == dc_types::Visibility::Public
                && m.params.len() == 1
                && m.params[0].key() == item.key()
        });
        (kind, iface, add)
    } else {
        // 7d. Higher tiers must be unambiguous.
        if found.multiple_definitions {
            let reason = DefinitionReason::AmbiguousCapability {
                interface: found.interface.full_name().to_owned(),
                context,
            };
            return Err(fail(reason));
        }
        let add = find_add(ty, found.kind, &found.interface);
        (found.kind, found.interface, add)
    };

    let item = capability::item_type(kind, &iface);
    if add.is_none() {
        if serializable {
            let reason = DefinitionReason::MissingAddMethod {
                item_type: item.full_name().to_owned(),
                context,
            };
            return Err(fail(reason));
        }
        read_only.get_or_insert_with(|| {
            format!(
                "`{}` has no Add method accepting `{}`",
                ty.full_name(),
                item.full_name()
            )
        });
    }

    let mutability = match read_only {
        Some(reason) => {
            log::debug!("collection `{ty}` is read-only: {reason}");
            Mutability::ReadOnly { reason }
        }
        None => Mutability::Mutable {
            add,
            constructor: constructor.filter(|_| !ty.is_value_type()),
        },
    };
    Ok(Shape {
        kind,
        enumerator: find_enumerator(ty, Some(&iface)),
        item,
        mutability,
        stand_in: None,
    })
}

// Naming and reference tracking.
fn finish(
    ty: &TypeRef,
    explicit: Option<&CollectionDataContractAttr>,
    shape: Shape,
) -> Result<DataContract, ContractError> {
    let fail = |reason| Err(ContractError::definition(ty, reason));

    let explicit_item_name = explicit.and_then(|a| a.item_name.clone());
    let item_name_explicit = explicit_item_name.is_some();
    let item_name = match explicit_item_name {
        Some(name) => name,
        None => resolver::resolve(names::unwrap_nullable(&shape.item))?
            .name()
            .to_owned(),
    };

    let key_name = explicit.and_then(|a| a.key_name.clone());
    let value_name = explicit.and_then(|a| a.value_name.clone());
    let key_value_names = if shape.kind.is_dictionary() {
        let names = KeyValueNames {
            key: key_name.unwrap_or_else(|| KeyValueNames::DEFAULT_KEY.to_owned()),
            value: value_name.unwrap_or_else(|| KeyValueNames::DEFAULT_VALUE.to_owned()),
        };
        if names.key == names.value {
            return fail(DefinitionReason::DuplicateKeyValueNames { name: names.key });
        }
        Some(names)
    } else {
        if key_name.is_some() || value_name.is_some() {
            return fail(DefinitionReason::KeyValueNamesOnNonDictionary);
        }
        None
    };

    let name = resolver::resolve(ty)?;
    let contract = CollectionContract {
        kind: shape.kind,
        item_nullable: is_nullable_item(&shape.item),
        item_type: shape.item,
        item_name,
        item_name_explicit,
        key_value_names,
        enumerator: shape.enumerator,
        mutability: shape.mutability,
        stand_in: shape.stand_in,
        explicit: explicit.is_some(),
        item: TryOnceCell::new(),
        child_ns: TryOnceCell::new(),
    };
    let is_reference = explicit.is_some_and(|a| a.is_reference);
    Ok(DataContract::new(
        ty.clone(),
        name,
        ContractKind::Collection(contract),
        is_reference,
    ))
}

// -----------------------------------------------------------------------------
// Method lookup

// Methods of `ty` and its base types, nearest first.
fn find_own_method(ty: &TypeRef, pred: impl Fn(&MethodDesc) -> bool) -> Option<MethodSource> {
    core::iter::once(ty.clone())
        .chain(ty.base_chain())
        .find_map(|owner| {
            let method = owner.methods().iter().find(|m| pred(m))?.clone();
            Some(MethodSource { owner, method })
        })
}

// Methods of an interface and the interfaces it extends.
fn find_interface_method(iface: &TypeRef, name: &str, params: usize) -> Option<MethodSource> {
    core::iter::once(iface.clone())
        .chain(iface.all_interfaces())
        .find_map(|owner| {
            let method = owner
                .methods()
                .iter()
                .find(|m| m.name == name && m.params.len() == params)?
                .clone();
            Some(MethodSource { owner, method })
        })
}

// The `Add` of a tier 1 to 5 collection: a public `Add` whose first
// parameter is exactly the expected one, an explicit implementation, or the
// capability interface's own `Add`.
fn find_add(ty: &TypeRef, kind: CollectionKind, iface: &TypeRef) -> Option<MethodSource> {
    let k = known();
    let args = iface.generic_args();
    let (first, count) = match kind {
        CollectionKind::GenericDictionary => (args.first().cloned(), 2),
        CollectionKind::Dictionary => (Some(k.object.clone()), 2),
        CollectionKind::List => (Some(k.object.clone()), 1),
        _ => (args.first().cloned(), 1),
    };
    let first = first.unwrap_or_else(|| k.object.clone());

    let public = find_own_method(ty, |m| {
        m.name == "Add"
            && !m.is_static
            && m.visibility == dc_types::Visibility::Public
            && m.params.len() == count
            && m.params[0].key() == first.key()
    });
    if public.is_some() {
        return public;
    }

    let mut ancestors = vec![iface.clone()];
    ancestors.extend(iface.all_interfaces());
    let explicit = find_own_method(ty, |m| {
        m.name == "Add"
            && m.params.len() == count
            && m
                .implements
                .as_ref()
                .is_some_and(|i| ancestors.iter().any(|a| a.key() == i.key()))
    });
    if explicit.is_some() {
        return explicit;
    }

    find_interface_method(iface, "Add", count)
}

fn find_enumerator(ty: &TypeRef, iface: Option<&TypeRef>) -> Option<MethodSource> {
    let own = find_own_method(ty, |m| {
        m.name == "GetEnumerator"
            && !m.is_static
            && m.visibility == dc_types::Visibility::Public
            && m.params.is_empty()
    });
    if own.is_some() {
        return own;
    }
    let iface = match iface {
        Some(iface) => iface.clone(),
        None => ty.all_interfaces().into_iter().find(|i| CollectionKind::of_interface(i).is_some())?,
    };
    find_interface_method(&iface, "GetEnumerator", 0)
}

// The concrete type read in place of a collection interface.
fn stand_in(kind: CollectionKind, iface: &TypeRef, item: &TypeRef) -> Option<TypeRef> {
    let k = known();
    let object = || k.object.clone();
    match kind {
        CollectionKind::GenericDictionary => {
            let args = iface.generic_args();
            instantiate(&k.dictionary, args).ok()
        }
        CollectionKind::Dictionary => instantiate(&k.dictionary, &[object(), object()]).ok(),
        CollectionKind::GenericList | CollectionKind::GenericCollection => {
            instantiate(&k.list, core::slice::from_ref(item)).ok()
        }
        CollectionKind::GenericEnumerable => Some(array_of(item, 1)),
        CollectionKind::List | CollectionKind::Collection | CollectionKind::Enumerable => {
            Some(array_of(&k.object, 1))
        }
        CollectionKind::Array => None,
    }
}
