//! Descriptors of the built-in host types.
//!
//! The table is built on first use and lives for the whole process.

use std::sync::LazyLock;

use crate::attrs::{DataContractAttr, DataMemberAttr};
use crate::builder::TypeBuilder;
use crate::desc::{FieldDesc, Members, MethodDesc, PrimitiveKind, TypeDesc, TypeRef, TypeShape};
use crate::generic::{instantiate, intern_array};
use crate::xml::ARRAYS_NS;

// -----------------------------------------------------------------------------
// KnownTypes

/// The built-in host types.
///
/// Generic definitions (`list`, `dictionary`, `ilist_t`, ...) are open; use
/// [`instantiate`](crate::instantiate) to close them.
pub struct KnownTypes {
    pub object: TypeRef,
    pub boolean: TypeRef,
    pub sbyte: TypeRef,
    pub byte: TypeRef,
    pub int16: TypeRef,
    pub uint16: TypeRef,
    pub int32: TypeRef,
    pub uint32: TypeRef,
    pub int64: TypeRef,
    pub uint64: TypeRef,
    pub single: TypeRef,
    pub double: TypeRef,
    pub decimal: TypeRef,
    pub char: TypeRef,
    pub string: TypeRef,
    pub byte_array: TypeRef,
    pub guid: TypeRef,
    pub uri: TypeRef,
    pub time_span: TypeRef,
    pub date_time: TypeRef,
    pub qualified_name: TypeRef,

    /// `IEnumerable`
    pub ienumerable: TypeRef,
    /// `ICollection`
    pub icollection: TypeRef,
    /// `IList`
    pub ilist: TypeRef,
    /// `IDictionary`
    pub idictionary: TypeRef,
    /// `IEnumerable<T>`
    pub ienumerable_t: TypeRef,
    /// `ICollection<T>`
    pub icollection_t: TypeRef,
    /// `IList<T>`
    pub ilist_t: TypeRef,
    /// `IDictionary<K, V>`
    pub idictionary_kv: TypeRef,
    /// `IXmlSerializable`
    pub ixml_serializable: TypeRef,

    /// `List<T>`
    pub list: TypeRef,
    /// `Dictionary<K, V>`
    pub dictionary: TypeRef,
    /// `KeyValuePair<K, V>`
    pub key_value_pair: TypeRef,
    /// `KeyValue<K, V>`, the item type of dictionary contracts.
    pub key_value: TypeRef,
    /// `Nullable<T>`
    pub nullable: TypeRef,

    pub xml_node: TypeRef,
    pub xml_element: TypeRef,
    /// `XmlNode[]`
    pub xml_node_array: TypeRef,
    pub xml_schema_type: TypeRef,
    pub xml_schema_set: TypeRef,
}

impl KnownTypes {
    /// The descriptor of a primitive kind.
    pub fn primitive(&self, kind: PrimitiveKind) -> &TypeRef {
        match kind {
            PrimitiveKind::Boolean => &self.boolean,
            PrimitiveKind::SByte => &self.sbyte,
            PrimitiveKind::Byte => &self.byte,
            PrimitiveKind::Int16 => &self.int16,
            PrimitiveKind::UInt16 => &self.uint16,
            PrimitiveKind::Int32 => &self.int32,
            PrimitiveKind::UInt32 => &self.uint32,
            PrimitiveKind::Int64 => &self.int64,
            PrimitiveKind::UInt64 => &self.uint64,
            PrimitiveKind::Single => &self.single,
            PrimitiveKind::Double => &self.double,
            PrimitiveKind::Decimal => &self.decimal,
            PrimitiveKind::Char => &self.char,
            PrimitiveKind::String => &self.string,
            PrimitiveKind::ByteArray => &self.byte_array,
            PrimitiveKind::Guid => &self.guid,
            PrimitiveKind::Uri => &self.uri,
            PrimitiveKind::TimeSpan => &self.time_span,
            PrimitiveKind::DateTime => &self.date_time,
            PrimitiveKind::QualifiedName => &self.qualified_name,
            PrimitiveKind::Object => &self.object,
        }
    }

    /// Every descriptor of the table, for registration.
    pub fn iter(&self) -> impl Iterator<Item = &TypeRef> {
        PrimitiveKind::ALL
            .into_iter()
            .map(|kind| self.primitive(kind))
            .chain([
                &self.ienumerable,
                &self.icollection,
                &self.ilist,
                &self.idictionary,
                &self.ienumerable_t,
                &self.icollection_t,
                &self.ilist_t,
                &self.idictionary_kv,
                &self.ixml_serializable,
                &self.list,
                &self.dictionary,
                &self.key_value_pair,
                &self.key_value,
                &self.nullable,
                &self.xml_node,
                &self.xml_element,
                &self.xml_node_array,
                &self.xml_schema_type,
                &self.xml_schema_set,
            ])
    }
}

static KNOWN: LazyLock<KnownTypes> = LazyLock::new(KnownTypes::build);

/// The process-wide table of built-in types.
#[inline]
pub fn known() -> &'static KnownTypes {
    &KNOWN
}

const SYSTEM: &str = "System";
const COLLECTIONS: &str = "System.Collections";
const GENERIC: &str = "System.Collections.Generic";

// Table construction only instantiates definitions with matching arity.
fn inst(definition: &TypeRef, args: &[&TypeRef]) -> TypeRef {
    let args: Vec<TypeRef> = args.iter().map(|a| (*a).clone()).collect();
    instantiate(definition, &args).unwrap_or_else(|_| definition.clone())
}

fn primitive(object: &TypeRef, kind: PrimitiveKind) -> TypeRef {
    TypeBuilder::primitive(
        kind.type_namespace(),
        kind.type_name(),
        TypeShape::Primitive(kind),
        kind.is_value_type(),
    )
    .base(object)
    .build()
}

impl KnownTypes {
    fn build() -> Self {
        let object = TypeBuilder::primitive(
            SYSTEM,
            "Object",
            TypeShape::Primitive(PrimitiveKind::Object),
            false,
        )
        .build();
        let p = |kind| primitive(&object, kind);

        // Non-generic capability interfaces.
        let ienumerable = TypeBuilder::interface(COLLECTIONS, "IEnumerable")
            .method(MethodDesc::new("GetEnumerator", &[]))
            .build();
        let icollection = TypeBuilder::interface(COLLECTIONS, "ICollection")
            .implements(&ienumerable)
            .build();
        let int32 = p(PrimitiveKind::Int32);
        let ilist = TypeBuilder::interface(COLLECTIONS, "IList")
            .implements(&icollection)
            .implements(&ienumerable)
            .method(MethodDesc::new("Add", &[&object]).returning(&int32))
            .build();
        let idictionary = TypeBuilder::interface(COLLECTIONS, "IDictionary")
            .implements(&icollection)
            .implements(&ienumerable)
            .method(MethodDesc::new("Add", &[&object, &object]))
            .build();

        // Generic capability interfaces.
        let t = TypeDesc::generic_param("T", 0);
        let ienumerable_t = TypeBuilder::interface(GENERIC, "IEnumerable")
            .generic(&[&t])
            .implements(&ienumerable)
            .method(MethodDesc::new("GetEnumerator", &[]))
            .build();

        let t = TypeDesc::generic_param("T", 0);
        let icollection_t = TypeBuilder::interface(GENERIC, "ICollection")
            .generic(&[&t])
            .implements(&inst(&ienumerable_t, &[&t]))
            .implements(&ienumerable)
            .method(MethodDesc::new("Add", &[&t]))
            .build();

        let t = TypeDesc::generic_param("T", 0);
        let ilist_t = TypeBuilder::interface(GENERIC, "IList")
            .generic(&[&t])
            .implements(&inst(&icollection_t, &[&t]))
            .implements(&inst(&ienumerable_t, &[&t]))
            .implements(&ienumerable)
            .build();

        let (k, v) = (TypeDesc::generic_param("K", 0), TypeDesc::generic_param("V", 1));
        let key_value_pair = TypeBuilder::structure(GENERIC, "KeyValuePair")
            .generic(&[&k, &v])
            .field(FieldDesc::new("Key", &k))
            .field(FieldDesc::new("Value", &v))
            .build();

        let (k, v) = (TypeDesc::generic_param("K", 0), TypeDesc::generic_param("V", 1));
        let pair = inst(&key_value_pair, &[&k, &v]);
        let idictionary_kv = TypeBuilder::interface(GENERIC, "IDictionary")
            .generic(&[&k, &v])
            .implements(&inst(&icollection_t, &[&pair]))
            .implements(&inst(&ienumerable_t, &[&pair]))
            .implements(&ienumerable)
            .method(MethodDesc::new("Add", &[&k, &v]))
            .build();

        let ixml_serializable =
            TypeBuilder::interface("System.Xml.Serialization", "IXmlSerializable").build();

        // Concrete collections.
        let t = TypeDesc::generic_param("T", 0);
        let list = TypeBuilder::class(GENERIC, "List")
            .generic(&[&t])
            .base(&object)
            .implements(&inst(&ilist_t, &[&t]))
            .implements(&ilist)
            .method(MethodDesc::new("Add", &[&t]))
            .default_constructor()
            .build();

        let (k, v) = (TypeDesc::generic_param("K", 0), TypeDesc::generic_param("V", 1));
        let dictionary = TypeBuilder::class(GENERIC, "Dictionary")
            .generic(&[&k, &v])
            .base(&object)
            .implements(&inst(&idictionary_kv, &[&k, &v]))
            .implements(&idictionary)
            .method(MethodDesc::new("Add", &[&k, &v]))
            .default_constructor()
            .build();

        let (k, v) = (TypeDesc::generic_param("K", 0), TypeDesc::generic_param("V", 1));
        let required = || DataMemberAttr {
            is_required: true,
            ..Default::default()
        };
        let key_value = TypeBuilder::structure("System.Runtime.Serialization", "KeyValue")
            .generic(&[&k, &v])
            .attribute(DataContractAttr {
                namespace: Some(ARRAYS_NS.to_owned()),
                ..Default::default()
            })
            .field(FieldDesc::new("Key", &k).with(required()))
            .field(FieldDesc::new("Value", &v).with(required()))
            .default_constructor()
            .build();

        let t = TypeDesc::generic_param("T", 0);
        let nullable = TypeBuilder::structure(SYSTEM, "Nullable")
            .generic(&[&t])
            .field(FieldDesc::new("Value", &t))
            .build();

        // XML types.
        let xml_node = TypeBuilder::class("System.Xml", "XmlNode").base(&object).build();
        let xml_element = TypeBuilder::class("System.Xml", "XmlElement")
            .base(&xml_node)
            .build();
        let xml_node_array = intern_array(&xml_node, 1);
        let xml_schema_type = TypeBuilder::class("System.Xml.Schema", "XmlSchemaType")
            .base(&object)
            .build();
        let xml_schema_set = TypeBuilder::class("System.Xml.Schema", "XmlSchemaSet")
            .base(&object)
            .default_constructor()
            .build();

        // `string` enumerates its chars, `byte[]` is a list of bytes.
        let char = p(PrimitiveKind::Char);
        let string = TypeBuilder::primitive(
            SYSTEM,
            PrimitiveKind::String.type_name(),
            TypeShape::Primitive(PrimitiveKind::String),
            false,
        )
        .base(&object)
        .implements(&inst(&ienumerable_t, &[&char]))
        .implements(&ienumerable)
        .build();

        let byte = p(PrimitiveKind::Byte);
        let byte_array = TypeBuilder::primitive(
            SYSTEM,
            PrimitiveKind::ByteArray.type_name(),
            TypeShape::Primitive(PrimitiveKind::ByteArray),
            false,
        )
        .build_with(|_, members| {
            *members = Members {
                base: Some(object.clone()),
                interfaces: array_interfaces(&byte, &ilist_t, &ilist),
                ..Members::default()
            };
        });

        Self {
            boolean: p(PrimitiveKind::Boolean),
            sbyte: p(PrimitiveKind::SByte),
            byte,
            int16: p(PrimitiveKind::Int16),
            uint16: p(PrimitiveKind::UInt16),
            int32,
            uint32: p(PrimitiveKind::UInt32),
            int64: p(PrimitiveKind::Int64),
            uint64: p(PrimitiveKind::UInt64),
            single: p(PrimitiveKind::Single),
            double: p(PrimitiveKind::Double),
            decimal: p(PrimitiveKind::Decimal),
            char,
            string,
            byte_array,
            guid: p(PrimitiveKind::Guid),
            uri: p(PrimitiveKind::Uri),
            time_span: p(PrimitiveKind::TimeSpan),
            date_time: p(PrimitiveKind::DateTime),
            qualified_name: p(PrimitiveKind::QualifiedName),
            object,
            ienumerable,
            icollection,
            ilist,
            idictionary,
            ienumerable_t,
            icollection_t,
            ilist_t,
            idictionary_kv,
            ixml_serializable,
            list,
            dictionary,
            key_value_pair,
            key_value,
            nullable,
            xml_node,
            xml_element,
            xml_node_array,
            xml_schema_type,
            xml_schema_set,
        }
    }
}

fn array_interfaces(element: &TypeRef, ilist_t: &TypeRef, ilist: &TypeRef) -> Vec<TypeRef> {
    vec![inst(ilist_t, &[element]), ilist.clone()]
}

/// Members of an array type: single-dimension arrays are generic lists of
/// their element, multi-dimension arrays only non-generic lists.
pub(crate) fn array_members(element: &TypeRef, rank: u32) -> Members {
    let k = known();
    let interfaces = if rank == 1 {
        array_interfaces(element, &k.ilist_t, &k.ilist)
    } else {
        vec![k.ilist.clone()]
    };
    Members {
        base: Some(k.object.clone()),
        interfaces,
        ..Members::default()
    }
}
