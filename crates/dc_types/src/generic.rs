use std::sync::{LazyLock, Mutex, PoisonError};

use dc_utils::hash::HashMap;

use crate::desc::{FieldDesc, Generic, Members, MethodDesc, CtorDesc};
use crate::desc::{TypeDesc, TypeParts, TypeRef, TypeShape, Visibility};
use crate::key::TypeKey;
use crate::known;

// -----------------------------------------------------------------------------
// TypeError

/// Errors of generic instantiation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("`{type_name}` is not a generic type definition")]
    NotGenericDefinition { type_name: String },
    #[error("`{type_name}` expects {expected} type arguments, {found} were given")]
    ArgumentCount {
        type_name: String,
        expected: usize,
        found: usize,
    },
}

// -----------------------------------------------------------------------------
// Interner

#[derive(PartialEq, Eq, Hash)]
enum InternKey {
    Instance(TypeKey, Vec<TypeKey>),
    Array(TypeKey, u32),
}

static INTERNED: LazyLock<Mutex<HashMap<InternKey, TypeRef>>> =
    LazyLock::new(|| Mutex::new(HashMap::default()));

fn lookup(key: &InternKey) -> Option<TypeRef> {
    let guard = INTERNED.lock().unwrap_or_else(PoisonError::into_inner);
    guard.get(key).cloned()
}

// The lock is not held while `make` runs, it may instantiate other types.
// If another thread won the race, its descriptor is returned.
fn intern(key: InternKey, make: impl FnOnce() -> TypeRef) -> TypeRef {
    if let Some(ty) = lookup(&key) {
        return ty;
    }
    let ty = make();
    let mut guard = INTERNED.lock().unwrap_or_else(PoisonError::into_inner);
    guard.entry(key).or_insert(ty).clone()
}

/// Instantiates the generic definition `definition` with `args`.
///
/// Identical instantiations return the same descriptor. Instantiating a
/// definition with its own parameters returns the definition.
///
/// # Examples
///
/// ```
/// use dc_types::{instantiate, known};
///
/// let k = known();
/// let a = instantiate(&k.list, &[k.int32.clone()]).unwrap();
/// let b = instantiate(&k.list, &[k.int32.clone()]).unwrap();
/// assert_eq!(a.key(), b.key());
/// assert!(instantiate(&k.int32, &[]).is_err());
/// ```
pub fn instantiate(definition: &TypeRef, args: &[TypeRef]) -> Result<TypeRef, TypeError> {
    let Generic::Definition { params } = definition.generic() else {
        return Err(TypeError::NotGenericDefinition {
            type_name: definition.full_name().to_owned(),
        });
    };
    if params.len() != args.len() {
        return Err(TypeError::ArgumentCount {
            type_name: definition.full_name().to_owned(),
            expected: params.len(),
            found: args.len(),
        });
    }
    if params.iter().zip(args).all(|(p, a)| p.key() == a.key()) {
        return Ok(definition.clone());
    }

    let key = InternKey::Instance(definition.key(), args.iter().map(|a| a.key()).collect());
    Ok(intern(key, || {
        TypeDesc::from_parts(TypeParts {
            name: definition.name().to_owned(),
            namespace: definition.namespace().map(str::to_owned),
            declaring: definition.declaring().cloned(),
            visibility: definition.visibility(),
            is_value_type: definition.is_value_type(),
            shape: definition.shape().clone(),
            generic: Generic::Instance {
                definition: definition.clone(),
                args: args.to_vec(),
            },
            attributes: definition
                .attributes()
                .map_types(|t| substitute(t, args)),
        })
    }))
}

/// The array type of `element` with `rank` dimensions.
///
/// `byte[]` is the primitive byte array.
pub fn array_of(element: &TypeRef, rank: u32) -> TypeRef {
    let k = known::known();
    let rank = rank.max(1);
    if rank == 1 && element.key() == k.byte.key() {
        return k.byte_array.clone();
    }
    intern_array(element, rank)
}

pub(crate) fn intern_array(element: &TypeRef, rank: u32) -> TypeRef {
    intern(InternKey::Array(element.key(), rank), || {
        TypeDesc::from_parts(TypeParts {
            name: format!("{}[]", element.name()),
            namespace: element.namespace().map(str::to_owned),
            declaring: None,
            visibility: Visibility::Public,
            is_value_type: false,
            shape: TypeShape::Array {
                element: element.clone(),
                rank,
            },
            generic: Generic::NonGeneric,
            attributes: Default::default(),
        })
    })
}

// -----------------------------------------------------------------------------
// Substitution

/// Replaces generic parameters in `ty` by the positional `args`.
///
/// Parameters without a matching argument are kept.
pub fn substitute(ty: &TypeRef, args: &[TypeRef]) -> TypeRef {
    if !ty.contains_generic_parameters() {
        return ty.clone();
    }
    match ty.shape() {
        TypeShape::GenericParameter { position } => {
            return args.get(*position).cloned().unwrap_or_else(|| ty.clone());
        }
        TypeShape::Array { element, rank } => {
            return array_of(&substitute(element, args), *rank);
        }
        _ => {}
    }
    let (definition, inner) = match ty.generic() {
        Generic::Instance { definition, args } => (definition, args.as_slice()),
        Generic::Definition { params } => (ty, params.as_slice()),
        Generic::NonGeneric => return ty.clone(),
    };
    let bound: Vec<TypeRef> = inner.iter().map(|a| substitute(a, args)).collect();
    instantiate(definition, &bound).unwrap_or_else(|_| ty.clone())
}

pub(crate) fn substitute_members(members: &Members, args: &[TypeRef]) -> Members {
    let sub = |t: &TypeRef| substitute(t, args);
    Members {
        base: members.base.as_ref().map(sub),
        interfaces: members.interfaces.iter().map(sub).collect(),
        fields: members
            .fields
            .iter()
            .map(|f| FieldDesc {
                field_type: sub(&f.field_type),
                attributes: f.attributes.map_types(sub),
                ..f.clone()
            })
            .collect(),
        methods: members
            .methods
            .iter()
            .map(|m| MethodDesc {
                params: m.params.iter().map(sub).collect(),
                returns: m.returns.as_ref().map(sub),
                implements: m.implements.as_ref().map(sub),
                ..m.clone()
            })
            .collect(),
        constructors: members
            .constructors
            .iter()
            .map(|c| CtorDesc {
                params: c.params.iter().map(sub).collect(),
                visibility: c.visibility,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{TypeError, array_of, instantiate};
    use crate::builder::TypeBuilder;
    use crate::desc::{FieldDesc, TypeDesc};
    use crate::known::known;

    #[test]
    fn instance_members_are_substituted() {
        let k = known();
        let t = TypeDesc::generic_param("T", 0);
        let boxed = TypeBuilder::class("Store", "Box")
            .generic(&[&t])
            .field(FieldDesc::new("Items", &array_of(&t, 1)))
            .build();

        let closed = instantiate(&boxed, &[k.string.clone()]).unwrap();
        assert!(!closed.contains_generic_parameters());
        assert!(boxed.contains_generic_parameters());

        let items = closed.field("Items").unwrap();
        assert_eq!(items.field_type.key(), array_of(&k.string, 1).key());
    }

    #[test]
    fn own_parameters_give_back_the_definition() {
        let k = known();
        let params = k.list.generic_args().to_vec();
        let same = instantiate(&k.list, &params).unwrap();
        assert_eq!(same.key(), k.list.key());
    }

    #[test]
    fn argument_count_is_checked() {
        let k = known();
        let err = instantiate(&k.dictionary, &[k.int32.clone()]).unwrap_err();
        assert!(matches!(err, TypeError::ArgumentCount { expected: 2, found: 1, .. }));
    }

    #[test]
    fn byte_array_is_primitive() {
        let k = known();
        assert_eq!(array_of(&k.byte, 1).key(), k.byte_array.key());
        assert!(array_of(&k.byte, 1).primitive_kind().is_some());
        assert!(array_of(&k.int32, 1).is_array());
    }
}
