use crate::desc::TypeRef;

// -----------------------------------------------------------------------------
// Attribute payloads

/// Explicit class contract, optionally overriding the wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataContractAttr {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub is_reference: bool,
}

/// Explicit collection contract.
///
/// `key_name` and `value_name` only apply to dictionary-shaped collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionDataContractAttr {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub item_name: Option<String>,
    pub key_name: Option<String>,
    pub value_name: Option<String>,
    pub is_reference: bool,
}

/// A serialized member of a class contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataMemberAttr {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub is_required: bool,
}

/// Explicit enum member, optionally overriding the wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumMemberAttr {
    pub value: Option<String>,
}

/// Names the static method that supplies the type's schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlSchemaProviderAttr {
    pub method_name: Option<String>,
    pub is_any: bool,
}

/// Overrides the top-level element of an XML-special type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlRootAttr {
    pub element_name: Option<String>,
    pub namespace: Option<String>,
}

// -----------------------------------------------------------------------------
// Attribute

/// A contract attribute attached to a type or a field.
///
/// Attributes are read-only input to the contract engine.
#[derive(Debug, Clone)]
pub enum Attribute {
    DataContract(DataContractAttr),
    CollectionDataContract(CollectionDataContractAttr),
    DataMember(DataMemberAttr),
    EnumMember(EnumMemberAttr),
    XmlSchemaProvider(XmlSchemaProviderAttr),
    XmlRoot(XmlRootAttr),
    KnownType(TypeRef),
    NonSerialized,
    Serializable,
    Flags,
}

macro_rules! impl_from_payload {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Attribute {
                #[inline]
                fn from(value: $payload) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_payload! {
    DataContractAttr => DataContract,
    CollectionDataContractAttr => CollectionDataContract,
    DataMemberAttr => DataMember,
    EnumMemberAttr => EnumMember,
    XmlSchemaProviderAttr => XmlSchemaProvider,
    XmlRootAttr => XmlRoot,
}

// -----------------------------------------------------------------------------
// Attributes

/// The attribute list of a type or field.
///
/// Unlike a keyed map, the same attribute kind may appear several times,
/// which the engine needs to detect (e.g. two `EnumMember` on one field).
///
/// # Examples
///
/// ```
/// use dc_types::attrs::{Attribute, Attributes, DataContractAttr};
///
/// let attrs = Attributes::new()
///     .with(DataContractAttr { name: Some("Point".into()), ..Default::default() })
///     .with(Attribute::Serializable);
///
/// assert_eq!(attrs.data_contract().and_then(|a| a.name.as_deref()), Some("Point"));
/// assert!(attrs.is_serializable());
/// assert!(attrs.collection_data_contract().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Attributes(Vec<Attribute>);

macro_rules! impl_find {
    ($($(#[$meta:meta])* $fn_name:ident -> $variant:ident($payload:ty);)*) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $fn_name(&self) -> Option<&$payload> {
                self.0.iter().find_map(|attr| match attr {
                    Attribute::$variant(value) => Some(value),
                    _ => None,
                })
            }
        )*
    };
}

macro_rules! impl_flag {
    ($($(#[$meta:meta])* $fn_name:ident -> $variant:ident;)*) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $fn_name(&self) -> bool {
                self.0.iter().any(|attr| matches!(attr, Attribute::$variant))
            }
        )*
    };
}

impl Attributes {
    /// An empty attribute list.
    pub const EMPTY: &'static Self = &Self::new();

    #[inline]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an attribute.
    #[inline]
    pub fn with(mut self, attr: impl Into<Attribute>) -> Self {
        self.0.push(attr.into());
        self
    }

    #[inline]
    pub fn push(&mut self, attr: impl Into<Attribute>) {
        self.0.push(attr.into());
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Attribute> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    impl_find! {
        /// The explicit class contract, if any.
        data_contract -> DataContract(DataContractAttr);
        /// The explicit collection contract, if any.
        collection_data_contract -> CollectionDataContract(CollectionDataContractAttr);
        /// The first `DataMember` attribute, if any.
        data_member -> DataMember(DataMemberAttr);
        /// The first `EnumMember` attribute, if any.
        enum_member -> EnumMember(EnumMemberAttr);
        /// The schema-provider declaration, if any.
        schema_provider -> XmlSchemaProvider(XmlSchemaProviderAttr);
        /// The XML root override, if any.
        xml_root -> XmlRoot(XmlRootAttr);
    }

    impl_flag! {
        /// Legacy-serializable marker.
        is_serializable -> Serializable;
        /// Field excluded from serialization.
        is_non_serialized -> NonSerialized;
        /// Enum whose values combine as a bitmask.
        is_flags -> Flags;
    }

    /// Number of `EnumMember` attributes.
    pub fn enum_member_count(&self) -> usize {
        self.0
            .iter()
            .filter(|attr| matches!(attr, Attribute::EnumMember(_)))
            .count()
    }

    /// Types declared with `KnownType`.
    pub fn known_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.0.iter().filter_map(|attr| match attr {
            Attribute::KnownType(ty) => Some(ty),
            _ => None,
        })
    }

    /// Rewrites every type reference carried by the attributes.
    pub(crate) fn map_types(&self, mut f: impl FnMut(&TypeRef) -> TypeRef) -> Self {
        Self(
            self.0
                .iter()
                .map(|attr| match attr {
                    Attribute::KnownType(ty) => Attribute::KnownType(f(ty)),
                    other => other.clone(),
                })
                .collect(),
        )
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Attribute, Attributes, EnumMemberAttr};

    #[test]
    fn counts_repeated_enum_members() {
        let attrs = Attributes::new()
            .with(EnumMemberAttr::default())
            .with(EnumMemberAttr {
                value: Some("on".into()),
            })
            .with(Attribute::NonSerialized);

        assert_eq!(attrs.enum_member_count(), 2);
        assert_eq!(attrs.enum_member().map(|a| a.value.is_none()), Some(true));
        assert!(attrs.is_non_serialized());
        assert!(!attrs.is_flags());
        assert!(Attributes::EMPTY.is_empty());
    }
}
