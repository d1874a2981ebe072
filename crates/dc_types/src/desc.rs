use alloc::sync::Arc;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::OnceLock;

use dc_utils::hash::HashSet;

use crate::attrs::Attributes;
use crate::key::TypeKey;
use crate::xml::SchemaProviderFn;
use crate::{generic, known};

/// Shared handle of a type descriptor.
pub type TypeRef = Arc<TypeDesc>;

// -----------------------------------------------------------------------------
// Visibility

/// Declared accessibility of a type or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Private,
}

// -----------------------------------------------------------------------------
// PrimitiveKind

/// The built-in types that map directly to a wire primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    Char,
    String,
    ByteArray,
    Guid,
    Uri,
    TimeSpan,
    DateTime,
    QualifiedName,
    Object,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::Boolean,
        Self::SByte,
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Single,
        Self::Double,
        Self::Decimal,
        Self::Char,
        Self::String,
        Self::ByteArray,
        Self::Guid,
        Self::Uri,
        Self::TimeSpan,
        Self::DateTime,
        Self::QualifiedName,
        Self::Object,
    ];

    /// The host type name of the primitive.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Decimal => "Decimal",
            Self::Char => "Char",
            Self::String => "String",
            Self::ByteArray => "Byte[]",
            Self::Guid => "Guid",
            Self::Uri => "Uri",
            Self::TimeSpan => "TimeSpan",
            Self::DateTime => "DateTime",
            Self::QualifiedName => "XmlQualifiedName",
            Self::Object => "Object",
        }
    }

    /// The host namespace of the primitive.
    pub const fn type_namespace(self) -> &'static str {
        match self {
            Self::QualifiedName => "System.Xml",
            _ => "System",
        }
    }

    /// Integral kinds may underlie an enum.
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    pub const fn is_value_type(self) -> bool {
        !matches!(
            self,
            Self::String | Self::ByteArray | Self::Uri | Self::QualifiedName | Self::Object
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.type_name())
    }
}

// -----------------------------------------------------------------------------
// TypeShape & Generic

/// The structural shape of a type.
#[derive(Debug, Clone)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    Enum { underlying: TypeRef },
    Array { element: TypeRef, rank: u32 },
    Class,
    Interface,
    GenericParameter { position: usize },
}

/// Generic information of a type.
#[derive(Debug, Clone, Default)]
pub enum Generic {
    #[default]
    NonGeneric,
    /// An open definition such as `List<T>`; `params` are generic parameters.
    Definition { params: Vec<TypeRef> },
    /// An instantiation such as `List<int>` (or a partially open `List<U>`).
    Instance {
        definition: TypeRef,
        args: Vec<TypeRef>,
    },
}

// -----------------------------------------------------------------------------
// Members

/// A field of a type. Enum members are static constant fields.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub field_type: TypeRef,
    pub visibility: Visibility,
    pub is_static: bool,
    pub constant: Option<i64>,
    pub attributes: Attributes,
}

impl FieldDesc {
    /// A public instance field.
    pub fn new(name: impl Into<String>, field_type: &TypeRef) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.clone(),
            visibility: Visibility::Public,
            is_static: false,
            constant: None,
            attributes: Attributes::new(),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with(mut self, attr: impl Into<crate::attrs::Attribute>) -> Self {
        self.attributes.push(attr);
        self
    }
}

/// A method of a type.
#[derive(Debug, Clone)]
pub struct MethodDesc {
    pub name: String,
    pub params: Vec<TypeRef>,
    pub returns: Option<TypeRef>,
    pub visibility: Visibility,
    pub is_static: bool,
    /// The interface this method explicitly implements, if any.
    pub implements: Option<TypeRef>,
    /// The callable body of a schema-provider method.
    pub schema_provider: Option<SchemaProviderFn>,
}

impl MethodDesc {
    /// A public instance method returning nothing.
    pub fn new(name: impl Into<String>, params: &[&TypeRef]) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| (*p).clone()).collect(),
            returns: None,
            visibility: Visibility::Public,
            is_static: false,
            implements: None,
            schema_provider: None,
        }
    }

    /// A public static schema-provider method returning `returns`.
    pub fn provider(name: impl Into<String>, returns: &TypeRef, body: SchemaProviderFn) -> Self {
        Self {
            params: vec![known::known().xml_schema_set.clone()],
            returns: Some(returns.clone()),
            is_static: true,
            schema_provider: Some(body),
            ..Self::new(name, &[])
        }
    }

    pub fn returning(mut self, returns: &TypeRef) -> Self {
        self.returns = Some(returns.clone());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the method as an explicit implementation of `iface`.
    pub fn implementing(mut self, iface: &TypeRef) -> Self {
        self.implements = Some(iface.clone());
        self.visibility = Visibility::Private;
        self
    }
}

/// An instance constructor.
#[derive(Debug, Clone)]
pub struct CtorDesc {
    pub params: Vec<TypeRef>,
    pub visibility: Visibility,
}

impl CtorDesc {
    /// A public parameterless constructor.
    pub const fn default_ctor() -> Self {
        Self {
            params: Vec::new(),
            visibility: Visibility::Public,
        }
    }
}

/// The relational part of a type, defined once.
#[derive(Debug, Clone, Default)]
pub struct Members {
    pub base: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldDesc>,
    pub methods: Vec<MethodDesc>,
    pub constructors: Vec<CtorDesc>,
}

impl Members {
    pub const EMPTY: &'static Self = &Self {
        base: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        constructors: Vec::new(),
    };
}

// -----------------------------------------------------------------------------
// TypeDesc

/// An immutable description of one host type.
///
/// Identity fields are fixed at construction. [`Members`] live in a set-once
/// cell: a type may be created first and defined afterwards, which is how
/// self-referential types such as `class Node : List<Node>` are expressed.
///
/// Instances of generic definitions and array types derive their members
/// on first access, so a definition must be defined before its instances'
/// members are read.
pub struct TypeDesc {
    key: TypeKey,
    name: Box<str>,
    namespace: Option<Box<str>>,
    declaring: Option<TypeRef>,
    visibility: Visibility,
    is_value_type: bool,
    shape: TypeShape,
    generic: Generic,
    attributes: Attributes,
    full_name: Box<str>,
    short_name: Box<str>,
    open: bool,
    members: OnceLock<Members>,
}

/// Construction input of a [`TypeDesc`].
pub(crate) struct TypeParts {
    pub name: String,
    pub namespace: Option<String>,
    pub declaring: Option<TypeRef>,
    pub visibility: Visibility,
    pub is_value_type: bool,
    pub shape: TypeShape,
    pub generic: Generic,
    pub attributes: Attributes,
}

impl TypeDesc {
    pub(crate) fn from_parts(parts: TypeParts) -> TypeRef {
        let (full_name, short_name) = display_names(&parts);
        let open = match (&parts.shape, &parts.generic) {
            (TypeShape::GenericParameter { .. }, _) => true,
            (_, Generic::Definition { .. }) => true,
            (TypeShape::Array { element, .. }, _) => element.open,
            (_, Generic::Instance { args, .. }) => args.iter().any(|a| a.open),
            _ => false,
        };
        Arc::new(Self {
            key: TypeKey::next(),
            name: parts.name.into_boxed_str(),
            namespace: parts.namespace.map(String::into_boxed_str),
            declaring: parts.declaring,
            visibility: parts.visibility,
            is_value_type: parts.is_value_type,
            shape: parts.shape,
            generic: parts.generic,
            attributes: parts.attributes,
            full_name: full_name.into_boxed_str(),
            short_name: short_name.into_boxed_str(),
            open,
            members: OnceLock::new(),
        })
    }

    /// Creates a generic parameter named `name` at `position`.
    pub fn generic_param(name: &str, position: usize) -> TypeRef {
        Self::from_parts(TypeParts {
            name: name.to_owned(),
            namespace: None,
            declaring: None,
            visibility: Visibility::Public,
            is_value_type: false,
            shape: TypeShape::GenericParameter { position },
            generic: Generic::NonGeneric,
            attributes: Attributes::new(),
        })
    }

    #[inline(always)]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The identifier, without namespace or generic arguments.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The enclosing type of a nested type.
    #[inline]
    pub fn declaring(&self) -> Option<&TypeRef> {
        self.declaring.as_ref()
    }

    /// e.g. `System.Collections.Generic.List<System.Int32>`.
    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// e.g. `List<Int32>`, `Outer.Inner`.
    #[inline]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Returns `true` if the type and everything its name refers to is public.
    pub fn is_public(&self) -> bool {
        if self.visibility != Visibility::Public {
            return false;
        }
        if self.declaring.as_ref().is_some_and(|d| !d.is_public()) {
            return false;
        }
        match (&self.shape, &self.generic) {
            (TypeShape::Array { element, .. }, _) => element.is_public(),
            (_, Generic::Instance { args, .. }) => args.iter().all(|a| a.is_public()),
            _ => true,
        }
    }

    #[inline]
    pub fn is_value_type(&self) -> bool {
        self.is_value_type
    }

    #[inline]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    #[inline]
    pub fn generic(&self) -> &Generic {
        &self.generic
    }

    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[inline]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.shape {
            TypeShape::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        matches!(self.shape, TypeShape::Interface)
    }

    #[inline]
    pub fn is_enum(&self) -> bool {
        matches!(self.shape, TypeShape::Enum { .. })
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.shape, TypeShape::Array { .. })
    }

    /// The position of a generic parameter.
    #[inline]
    pub fn generic_position(&self) -> Option<usize> {
        match self.shape {
            TypeShape::GenericParameter { position } => Some(position),
            _ => None,
        }
    }

    #[inline]
    pub fn is_generic_definition(&self) -> bool {
        matches!(self.generic, Generic::Definition { .. })
    }

    /// The definition of a generic instance.
    #[inline]
    pub fn definition(&self) -> Option<&TypeRef> {
        match &self.generic {
            Generic::Instance { definition, .. } => Some(definition),
            _ => None,
        }
    }

    /// Instance arguments, or the parameters of a definition.
    #[inline]
    pub fn generic_args(&self) -> &[TypeRef] {
        match &self.generic {
            Generic::Instance { args, .. } => args,
            Generic::Definition { params } => params,
            Generic::NonGeneric => &[],
        }
    }

    /// Returns `true` if the type is, or refers to, an unbound generic parameter.
    #[inline]
    pub fn contains_generic_parameters(&self) -> bool {
        self.open
    }

    /// Returns `true` if `self` is `def` or an instance of `def`.
    pub fn is_instance_of(&self, def: &TypeDesc) -> bool {
        self.key == def.key || self.definition().is_some_and(|d| d.key == def.key)
    }

    // -------------------------------------------------------------------------
    // Members

    /// Defines the members of the type.
    ///
    /// Returns the members back if the type was already defined.
    pub fn define(&self, members: Members) -> Result<(), Members> {
        self.members.set(members)
    }

    /// The members of the type.
    ///
    /// Members of generic instances and arrays are derived on first access.
    pub fn members(&self) -> &Members {
        if let Some(members) = self.members.get() {
            return members;
        }
        match (&self.shape, &self.generic) {
            (_, Generic::Instance { definition, args }) => self
                .members
                .get_or_init(|| generic::substitute_members(definition.members(), args)),
            (TypeShape::Array { element, rank }, _) => self
                .members
                .get_or_init(|| known::array_members(element, *rank)),
            _ => Members::EMPTY,
        }
    }

    #[inline]
    pub fn base(&self) -> Option<&TypeRef> {
        self.members().base.as_ref()
    }

    /// Directly declared interfaces.
    #[inline]
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.members().interfaces
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDesc] {
        &self.members().fields
    }

    #[inline]
    pub fn methods(&self) -> &[MethodDesc] {
        &self.members().methods
    }

    #[inline]
    pub fn constructors(&self) -> &[CtorDesc] {
        &self.members().constructors
    }

    /// The parameterless constructor, of any visibility.
    pub fn default_constructor(&self) -> Option<&CtorDesc> {
        self.constructors().iter().find(|c| c.params.is_empty())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// The base types, nearest first.
    pub fn base_chain(&self) -> impl Iterator<Item = TypeRef> + '_ {
        core::iter::successors(self.base().cloned(), |t| t.base().cloned())
    }

    /// Every interface implemented by the type, its base types and its interfaces.
    ///
    /// Interfaces are reported once, in discovery order. An interface type
    /// does not report itself.
    pub fn all_interfaces(&self) -> Vec<TypeRef> {
        let mut seen = HashSet::<TypeKey>::default();
        let mut out = Vec::new();
        let mut stack: Vec<TypeRef> = Vec::new();

        fn push_all(ty: &TypeDesc, stack: &mut Vec<TypeRef>) {
            stack.extend(ty.interfaces().iter().rev().cloned());
        }

        push_all(self, &mut stack);
        for base in self.base_chain() {
            push_all(&base, &mut stack);
        }

        while let Some(iface) = stack.pop() {
            if iface.key == self.key || !seen.insert(iface.key) {
                continue;
            }
            push_all(&iface, &mut stack);
            out.push(iface);
        }
        out
    }

    /// Returns `true` if a value of `self` is also a `target`.
    pub fn is_assignable_to(&self, target: &TypeDesc) -> bool {
        if self.key == target.key || target.key == known::known().object.key {
            return true;
        }
        if self.base_chain().any(|b| b.key == target.key) {
            return true;
        }
        target.is_interface() && self.all_interfaces().iter().any(|i| i.key == target.key)
    }
}

fn display_names(parts: &TypeParts) -> (String, String) {
    if let TypeShape::Array { element, rank } = &parts.shape {
        let dims = ",".repeat((*rank as usize).saturating_sub(1));
        return (
            format!("{}[{dims}]", element.full_name),
            format!("{}[{dims}]", element.short_name),
        );
    }
    if let TypeShape::GenericParameter { .. } = &parts.shape {
        return (parts.name.clone(), parts.name.clone());
    }

    let (mut full, mut short) = match (&parts.declaring, &parts.namespace) {
        (Some(outer), _) => (
            format!("{}.{}", outer.full_name, parts.name),
            format!("{}.{}", outer.short_name, parts.name),
        ),
        (None, Some(ns)) if !ns.is_empty() => (format!("{ns}.{}", parts.name), parts.name.clone()),
        _ => (parts.name.clone(), parts.name.clone()),
    };

    let args: &[TypeRef] = match &parts.generic {
        Generic::Definition { params } => params,
        Generic::Instance { args, .. } => args,
        Generic::NonGeneric => &[],
    };
    if !args.is_empty() {
        let join = |f: fn(&TypeDesc) -> &str| {
            args.iter().map(|a| f(a)).collect::<Vec<_>>().join(",")
        };
        full = format!("{full}<{}>", join(TypeDesc::full_name));
        short = format!("{short}<{}>", join(TypeDesc::short_name));
    }
    (full, short)
}

impl PartialEq for TypeDesc {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Members are skipped, they may refer back to this type.
        f.debug_struct("TypeDesc")
            .field("key", &self.key)
            .field("name", &self.full_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.full_name)
    }
}
