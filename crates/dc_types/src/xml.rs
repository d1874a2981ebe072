use core::fmt;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Wire namespaces

/// The XML Schema namespace.
pub const SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// The serialization namespace, also the legacy namespace of the primitive types.
pub const SERIALIZATION_NS: &str = "http://schemas.microsoft.com/2003/10/Serialization/";

/// Namespace of collections whose items come from a built-in namespace.
pub const ARRAYS_NS: &str = "http://schemas.microsoft.com/2003/10/Serialization/Arrays";

/// Prefix of every namespace derived from a type's declared namespace.
pub const CONTRACT_NS_BASE: &str = "http://schemas.datacontract.org/2004/07/";

// -----------------------------------------------------------------------------
// QualifiedName

/// A wire name: local name plus namespace.
///
/// An empty namespace is allowed; an empty local name never leaves
/// the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    name: String,
    namespace: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    ///
    /// # Examples
    ///
    /// ```
    /// use dc_types::xml::QualifiedName;
    ///
    /// let q = QualifiedName::new("int", "http://www.w3.org/2001/XMLSchema");
    /// assert_eq!(q.name(), "int");
    /// assert_eq!(q.to_string(), "http://www.w3.org/2001/XMLSchema:int");
    /// ```
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns `true` if the local name is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.namespace, self.name)
        }
    }
}

// -----------------------------------------------------------------------------
// Schema model

/// A schema-type fragment returned by a schema provider.
///
/// `name` is `None` for anonymous types, which are inlined into the
/// contract instead of being referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaType {
    name: Option<String>,
    definition: String,
}

impl SchemaType {
    /// A named schema type.
    pub fn named(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            definition: definition.into(),
        }
    }

    /// An anonymous schema type.
    pub fn anonymous(definition: impl Into<String>) -> Self {
        Self {
            name: None,
            definition: definition.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn definition(&self) -> &str {
        &self.definition
    }
}

/// The schema types declared for one target namespace.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    target_namespace: String,
    types: Vec<SchemaType>,
}

impl Schema {
    #[inline]
    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    #[inline]
    pub fn types(&self) -> &[SchemaType] {
        &self.types
    }
}

/// The schemas accumulated while schema providers run.
///
/// Providers add the types they reference, the resolver then looks up the
/// owning namespace of a returned named fragment here.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: Vec<Schema>,
}

impl SchemaSet {
    /// Creates an empty schema set.
    #[inline]
    pub const fn new() -> Self {
        Self {
            schemas: Vec::new(),
        }
    }

    /// Adds a schema type under `target_namespace`, creating the schema if needed.
    ///
    /// Adding the same fragment twice to one namespace is a no-op.
    pub fn add(&mut self, target_namespace: &str, ty: SchemaType) {
        match self
            .schemas
            .iter_mut()
            .find(|s| s.target_namespace == target_namespace)
        {
            Some(schema) => {
                if !schema.types.contains(&ty) {
                    schema.types.push(ty);
                }
            }
            None => self.schemas.push(Schema {
                target_namespace: target_namespace.to_owned(),
                types: vec![ty],
            }),
        }
    }

    /// Adds every schema type of `other`.
    pub fn merge(&mut self, other: &SchemaSet) {
        for schema in &other.schemas {
            for ty in &schema.types {
                self.add(&schema.target_namespace, ty.clone());
            }
        }
    }

    /// Returns the target namespace of the schema declaring `ty`.
    pub fn namespace_of(&self, ty: &SchemaType) -> Option<&str> {
        self.schemas
            .iter()
            .find(|s| s.types.contains(ty))
            .map(|s| s.target_namespace.as_str())
    }

    /// Returns the schema for `target_namespace`.
    pub fn schema(&self, target_namespace: &str) -> Option<&Schema> {
        self.schemas
            .iter()
            .find(|s| s.target_namespace == target_namespace)
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Schema> {
        self.schemas.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Schema providers

/// What a schema-provider accessor hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderValue {
    /// The wire name of the type.
    Name(QualifiedName),
    /// A full schema-type fragment.
    Type(SchemaType),
}

/// Signature of a schema-provider accessor.
///
/// Returning `None` is the "null" result: the type is emitted without a
/// top-level element under its default name.
pub type SchemaProviderFn = fn(&mut SchemaSet) -> Option<ProviderValue>;
