use core::fmt;

use dc_types::TypeDesc;
use thiserror::Error;

// -----------------------------------------------------------------------------
// CollectionContext

/// Why a type was expected to be a collection.
///
/// Only used to specialise error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionContext {
    /// Nothing marks the type as a collection.
    Plain,
    /// The type has an explicit collection contract.
    ExplicitContract,
    /// The base type is a collection.
    CollectionBase,
}

impl fmt::Display for CollectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => Ok(()),
            Self::ExplicitContract => f.write_str(" (the type has a CollectionDataContract attribute)"),
            Self::CollectionBase => f.write_str(" (the base type is a collection)"),
        }
    }
}

// -----------------------------------------------------------------------------
// DefinitionReason

/// Why a type's shape cannot be serialized as defined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DefinitionReason {
    #[error("arrays of rank {rank} are not supported")]
    ArrayRankUnsupported { rank: u32 },

    #[error("the type implements `{interface}` more than once{context}")]
    AmbiguousCapability {
        interface: String,
        context: CollectionContext,
    },

    #[error("key and value names are both `{name}`")]
    DuplicateKeyValueNames { name: String },

    #[error("key or value names are only allowed on dictionary collections")]
    KeyValueNamesOnNonDictionary,

    #[error("a built-in type cannot be a collection contract")]
    CollectionIsBuiltIn,

    #[error("a collection type cannot have a DataContract attribute{context}")]
    CollectionHasDataContract { context: CollectionContext },

    #[error("the type does not implement IEnumerable{context}")]
    NotEnumerable { context: CollectionContext },

    #[error("a legacy-serializable collection must have a default constructor{context}")]
    MissingDefaultConstructor { context: CollectionContext },

    #[error("no Add method accepting `{item_type}` was found{context}")]
    MissingAddMethod {
        item_type: String,
        context: CollectionContext,
    },

    #[error("`{underlying}` cannot underlie an enum contract")]
    UnsupportedEnumUnderlying { underlying: String },

    #[error("enum field `{field}` has more than one EnumMember attribute")]
    TooManyEnumMemberTraits { field: String },

    #[error("enum field `{field}` has an empty EnumMember value")]
    EmptyEnumMemberValue { field: String },

    #[error("enum field `{field}` has a DataMember attribute, use EnumMember instead")]
    DataMemberOnEnumField { field: String },

    #[error("more than one member is named `{name}`")]
    DuplicateMemberName { name: String },

    #[error("an enum cannot be a reference type contract")]
    EnumIsReference,

    #[error("the resolved local name is empty")]
    EmptyLocalName,

    #[error("the XmlSchemaProvider method `{method}` was not found")]
    MissingSchemaProviderMethod { method: String },

    #[error("the XmlSchemaProvider method `{method}` must return a qualified name or a schema type")]
    InvalidSchemaProviderReturn { method: String },

    #[error("the XmlSchemaProvider attribute names no method and is not IsAny")]
    InvalidSchemaProvider,

    #[error("the XmlSchemaProvider method `{method}` must return null when IsAny is set")]
    NonNullReturnForAnyProvider { method: String },

    #[error("the schema type `{name}` returned by the schema provider is not in the schema set")]
    MissingSchemaType { name: String },

    #[error("the contract is already being derived on this thread")]
    RecursiveDerivation,

    #[error("the collection type's name depends on itself")]
    RecursiveCollectionType,

    #[error("expected {expected} generic arguments, {found} were given")]
    ArgumentCountMismatch { expected: usize, found: usize },
}

// -----------------------------------------------------------------------------
// VisibilityIssue

/// What member-access validation rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VisibilityIssue {
    #[error("the type is not public")]
    TypeNotPublic,

    #[error("the item type `{item_type}` is not public")]
    ItemTypeNotPublic { item_type: String },

    #[error("the default constructor is not public")]
    ConstructorNotPublic,

    #[error("the Add method is not public")]
    AddMethodNotPublic,

    #[error("the member `{member}` is not public")]
    MemberNotPublic { member: String },
}

// -----------------------------------------------------------------------------
// ContractError

/// Errors of contract derivation and use.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContractError {
    /// The type's shape is incompatible with serialization. Never retried.
    #[error("invalid data contract for `{type_name}`: {reason}")]
    Definition {
        type_name: String,
        reason: DefinitionReason,
    },

    /// Deserialization of a read-only collection was attempted.
    #[error("collection `{type_name}` cannot be deserialized: {reason}")]
    ReadOnlyCollection { type_name: String, reason: String },

    /// Member-access validation failed.
    #[error("`{type_name}` cannot be serialized without member access: {issue}")]
    Visibility {
        type_name: String,
        issue: VisibilityIssue,
    },

    /// A weak link of a bound contract outlived its binding cache.
    #[error("bound contract `{type_name}` refers to a dropped binding cache")]
    Detached { type_name: String },

    /// A value has no textual form in an enum contract, or the reverse.
    #[error("`{value}` is not a valid value of enum `{type_name}`")]
    InvalidEnumValue { type_name: String, value: String },
}

impl ContractError {
    #[inline]
    pub(crate) fn definition(ty: &TypeDesc, reason: DefinitionReason) -> Self {
        Self::Definition {
            type_name: ty.full_name().to_owned(),
            reason,
        }
    }

    #[inline]
    pub(crate) fn visibility(ty: &TypeDesc, issue: VisibilityIssue) -> Self {
        Self::Visibility {
            type_name: ty.full_name().to_owned(),
            issue,
        }
    }

    /// The reason of a definition error.
    pub fn definition_reason(&self) -> Option<&DefinitionReason> {
        match self {
            Self::Definition { reason, .. } => Some(reason),
            _ => None,
        }
    }

    #[inline]
    pub fn is_definition(&self) -> bool {
        matches!(self, Self::Definition { .. })
    }
}
