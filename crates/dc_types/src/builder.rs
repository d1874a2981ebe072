use crate::attrs::{Attribute, Attributes};
use crate::desc::{CtorDesc, FieldDesc, Generic, Members, MethodDesc};
use crate::desc::{TypeDesc, TypeParts, TypeRef, TypeShape, Visibility};

// -----------------------------------------------------------------------------
// TypeBuilder

/// Fluent construction of a [`TypeDesc`].
///
/// # Examples
///
/// A plain class:
///
/// ```
/// use dc_types::{TypeBuilder, FieldDesc, known};
///
/// let k = known();
/// let point = TypeBuilder::class("Geometry", "Point")
///     .field(FieldDesc::new("X", &k.int32))
///     .field(FieldDesc::new("Y", &k.int32))
///     .default_constructor()
///     .build();
///
/// assert_eq!(point.full_name(), "Geometry.Point");
/// assert_eq!(point.fields().len(), 2);
/// ```
///
/// A self-referential type, `class Node : List<Node>`:
///
/// ```
/// use dc_types::{TypeBuilder, instantiate, known};
///
/// let k = known();
/// let node = TypeBuilder::class("Tree", "Node")
///     .default_constructor()
///     .build_with(|this, members| {
///         members.base = Some(instantiate(&k.list, &[this.clone()]).unwrap());
///     });
///
/// let base = node.base().unwrap();
/// assert_eq!(base.generic_args()[0].key(), node.key());
/// ```
pub struct TypeBuilder {
    parts: TypeParts,
    members: Members,
}

impl TypeBuilder {
    fn with_shape(namespace: &str, name: &str, shape: TypeShape, is_value_type: bool) -> Self {
        Self {
            parts: TypeParts {
                name: name.to_owned(),
                namespace: (!namespace.is_empty()).then(|| namespace.to_owned()),
                declaring: None,
                visibility: Visibility::Public,
                is_value_type,
                shape,
                generic: Generic::NonGeneric,
                attributes: Attributes::new(),
            },
            members: Members::default(),
        }
    }

    /// A reference type. An empty `namespace` means none.
    pub fn class(namespace: &str, name: &str) -> Self {
        Self::with_shape(namespace, name, TypeShape::Class, false)
    }

    /// A value type.
    pub fn structure(namespace: &str, name: &str) -> Self {
        Self::with_shape(namespace, name, TypeShape::Class, true)
    }

    pub fn interface(namespace: &str, name: &str) -> Self {
        Self::with_shape(namespace, name, TypeShape::Interface, false)
    }

    /// An enum over `underlying`. Members are added with [`variant`](Self::variant).
    pub fn enumeration(namespace: &str, name: &str, underlying: &TypeRef) -> Self {
        let shape = TypeShape::Enum {
            underlying: underlying.clone(),
        };
        Self::with_shape(namespace, name, shape, true)
    }

    pub(crate) fn primitive(namespace: &str, name: &str, shape: TypeShape, is_value_type: bool) -> Self {
        Self::with_shape(namespace, name, shape, is_value_type)
    }

    /// Nests the type inside `outer`, inheriting its namespace.
    pub fn nested_in(mut self, outer: &TypeRef) -> Self {
        self.parts.namespace = outer.namespace().map(str::to_owned);
        self.parts.declaring = Some(outer.clone());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.parts.visibility = visibility;
        self
    }

    /// Shorthand for `visibility(Visibility::Internal)`.
    pub fn internal(self) -> Self {
        self.visibility(Visibility::Internal)
    }

    /// Makes the type a generic definition over `params`.
    ///
    /// Parameters are created with [`TypeDesc::generic_param`].
    pub fn generic(mut self, params: &[&TypeRef]) -> Self {
        self.parts.generic = Generic::Definition {
            params: params.iter().map(|p| (*p).clone()).collect(),
        };
        self
    }

    pub fn attribute(mut self, attr: impl Into<Attribute>) -> Self {
        self.parts.attributes.push(attr);
        self
    }

    pub fn base(mut self, base: &TypeRef) -> Self {
        self.members.base = Some(base.clone());
        self
    }

    /// Declares an implemented interface.
    pub fn implements(mut self, iface: &TypeRef) -> Self {
        self.members.interfaces.push(iface.clone());
        self
    }

    pub fn field(mut self, field: FieldDesc) -> Self {
        self.members.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDesc) -> Self {
        self.members.methods.push(method);
        self
    }

    pub fn constructor(mut self, ctor: CtorDesc) -> Self {
        self.members.constructors.push(ctor);
        self
    }

    /// Adds a public parameterless constructor.
    pub fn default_constructor(self) -> Self {
        self.constructor(CtorDesc::default_ctor())
    }

    /// Adds an enum member.
    pub fn variant(self, name: &str, value: i64) -> Self {
        self.variant_with(name, value, Attributes::new())
    }

    /// Adds an enum member carrying attributes.
    pub fn variant_with(mut self, name: &str, value: i64, attributes: Attributes) -> Self {
        let underlying = match &self.parts.shape {
            TypeShape::Enum { underlying } => underlying.clone(),
            _ => crate::known::known().int32.clone(),
        };
        self.members.fields.push(FieldDesc {
            name: name.to_owned(),
            field_type: underlying,
            visibility: Visibility::Public,
            is_static: true,
            constant: Some(value),
            attributes,
        });
        self
    }

    /// Creates the type without defining its members.
    ///
    /// Members collected so far are discarded; define them later with
    /// [`TypeDesc::define`].
    pub fn declare(self) -> TypeRef {
        TypeDesc::from_parts(self.parts)
    }

    /// Creates and defines the type.
    pub fn build(self) -> TypeRef {
        self.build_with(|_, _| {})
    }

    /// Creates the type, then lets `f` complete its members with access to
    /// the type's own handle.
    pub fn build_with(self, f: impl FnOnce(&TypeRef, &mut Members)) -> TypeRef {
        let Self { parts, mut members } = self;
        let ty = TypeDesc::from_parts(parts);
        f(&ty, &mut members);
        // Freshly created, nobody else can have defined it.
        let _ = ty.define(members);
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::TypeBuilder;
    use crate::desc::{Members, TypeShape};
    use crate::known::known;

    #[test]
    fn enum_variants_are_static_constants() {
        let k = known();
        let color = TypeBuilder::enumeration("Paint", "Color", &k.byte)
            .variant("Red", 0)
            .variant("Green", 1)
            .build();

        assert!(color.is_enum());
        assert!(color.is_value_type());
        let green = color.field("Green").unwrap();
        assert!(green.is_static);
        assert_eq!(green.constant, Some(1));
        assert!(matches!(color.shape(), TypeShape::Enum { underlying } if underlying.key() == k.byte.key()));
    }

    #[test]
    fn declared_types_are_defined_once() {
        let k = known();
        let ty = TypeBuilder::class("App", "Later").declare();
        assert!(ty.fields().is_empty());

        let members = Members {
            base: Some(k.object.clone()),
            ..Members::default()
        };
        assert!(ty.define(members).is_ok());
        assert!(ty.define(Members::default()).is_err());
        assert_eq!(ty.base().map(|b| b.key()), Some(k.object.key()));
    }
}
