//! The primitive contract table.
//!
//! A flat list of `(local name, namespace, kind, alias)` rows. Exactly one
//! non-alias row exists per [`PrimitiveKind`]; alias rows only answer
//! [`lookup_by_name`]. Rows in the XML Schema namespace also answer to the
//! legacy serialization namespace.

use std::sync::LazyLock;

use dc_types::xml::{QualifiedName, SCHEMA_NS, SERIALIZATION_NS};
use dc_types::{PrimitiveKind, TypeDesc, known};
use dc_utils::hash::HashMap;

use crate::contract::{ContractKind, ContractRef, DataContract, PrimitiveContract};

struct Row {
    name: &'static str,
    ns: &'static str,
    kind: PrimitiveKind,
    alias: bool,
}

const fn row(name: &'static str, ns: &'static str, kind: PrimitiveKind) -> Row {
    Row { name, ns, kind, alias: false }
}

const fn alias(name: &'static str, ns: &'static str, kind: PrimitiveKind) -> Row {
    Row { name, ns, kind, alias: true }
}

use PrimitiveKind as P;

#[rustfmt::skip]
const ROWS: &[Row] = &[
    row("boolean", SCHEMA_NS, P::Boolean),
    row("byte", SCHEMA_NS, P::SByte),
    row("unsignedByte", SCHEMA_NS, P::Byte),
    row("short", SCHEMA_NS, P::Int16),
    row("unsignedShort", SCHEMA_NS, P::UInt16),
    row("int", SCHEMA_NS, P::Int32),
    row("unsignedInt", SCHEMA_NS, P::UInt32),
    row("long", SCHEMA_NS, P::Int64),
    row("unsignedLong", SCHEMA_NS, P::UInt64),
    row("float", SCHEMA_NS, P::Single),
    row("double", SCHEMA_NS, P::Double),
    row("decimal", SCHEMA_NS, P::Decimal),
    row("char", SERIALIZATION_NS, P::Char),
    row("string", SCHEMA_NS, P::String),
    row("base64Binary", SCHEMA_NS, P::ByteArray),
    row("guid", SERIALIZATION_NS, P::Guid),
    row("anyURI", SCHEMA_NS, P::Uri),
    row("duration", SERIALIZATION_NS, P::TimeSpan),
    row("dateTime", SCHEMA_NS, P::DateTime),
    row("QName", SCHEMA_NS, P::QualifiedName),
    row("anyType", SCHEMA_NS, P::Object),
    // Textual XSD types.
    alias("normalizedString", SCHEMA_NS, P::String),
    alias("token", SCHEMA_NS, P::String),
    alias("language", SCHEMA_NS, P::String),
    alias("Name", SCHEMA_NS, P::String),
    alias("NCName", SCHEMA_NS, P::String),
    alias("ID", SCHEMA_NS, P::String),
    alias("IDREF", SCHEMA_NS, P::String),
    alias("IDREFS", SCHEMA_NS, P::String),
    alias("ENTITY", SCHEMA_NS, P::String),
    alias("ENTITIES", SCHEMA_NS, P::String),
    alias("NMTOKEN", SCHEMA_NS, P::String),
    alias("NMTOKENS", SCHEMA_NS, P::String),
    alias("date", SCHEMA_NS, P::String),
    alias("time", SCHEMA_NS, P::String),
    alias("gYearMonth", SCHEMA_NS, P::String),
    alias("gYear", SCHEMA_NS, P::String),
    alias("gMonthDay", SCHEMA_NS, P::String),
    alias("gDay", SCHEMA_NS, P::String),
    alias("gMonth", SCHEMA_NS, P::String),
    // Integer XSD types.
    alias("integer", SCHEMA_NS, P::Int64),
    alias("positiveInteger", SCHEMA_NS, P::Int64),
    alias("negativeInteger", SCHEMA_NS, P::Int64),
    alias("nonPositiveInteger", SCHEMA_NS, P::Int64),
    alias("nonNegativeInteger", SCHEMA_NS, P::Int64),
    // Binary and duration variants.
    alias("hexBinary", SCHEMA_NS, P::ByteArray),
    alias("duration", SCHEMA_NS, P::TimeSpan),
];

struct PrimitiveTable {
    by_kind: HashMap<PrimitiveKind, ContractRef>,
    // namespace -> local name -> contract
    by_name: HashMap<&'static str, HashMap<&'static str, ContractRef>>,
}

static TABLE: LazyLock<PrimitiveTable> = LazyLock::new(|| {
    let k = known();
    let mut by_kind = HashMap::default();
    let mut by_name: HashMap<&'static str, HashMap<&'static str, ContractRef>> =
        HashMap::default();

    for row in ROWS {
        let ty = k.primitive(row.kind);
        let contract = ContractRef::new(DataContract::new(
            ty.clone(),
            QualifiedName::new(row.name, row.ns),
            ContractKind::Primitive(PrimitiveContract { kind: row.kind }),
            false,
        ));
        if !row.alias {
            by_kind.insert(row.kind, contract.clone());
        }
        by_name.entry(row.ns).or_default().insert(row.name, contract);
    }

    // Legacy namespace, without shadowing its own rows.
    for row in ROWS.iter().filter(|r| r.ns == SCHEMA_NS) {
        let contract = by_name[SCHEMA_NS][row.name].clone();
        by_name
            .entry(SERIALIZATION_NS)
            .or_default()
            .entry(row.name)
            .or_insert(contract);
    }

    PrimitiveTable { by_kind, by_name }
});

/// The primitive contract of `ty`, if it is a primitive type.
pub fn lookup(ty: &TypeDesc) -> Option<ContractRef> {
    let kind = ty.primitive_kind()?;
    // Only the known descriptor is primitive, not a look-alike.
    if known().primitive(kind).key() != ty.key() {
        return None;
    }
    TABLE.by_kind.get(&kind).cloned()
}

/// The primitive contract answering to a wire name, aliases included.
///
/// # Examples
///
/// ```
/// use dc_contract::primitive::lookup_by_name;
/// use dc_types::PrimitiveKind;
/// use dc_types::xml::{SCHEMA_NS, SERIALIZATION_NS};
///
/// let token = lookup_by_name("token", SCHEMA_NS).unwrap();
/// assert_eq!(token.as_primitive().map(|p| p.kind), Some(PrimitiveKind::String));
///
/// // Legacy namespace.
/// assert!(lookup_by_name("int", SERIALIZATION_NS).is_some());
/// assert!(lookup_by_name("int", "urn:elsewhere").is_none());
/// ```
pub fn lookup_by_name(local: &str, namespace: &str) -> Option<ContractRef> {
    TABLE.by_name.get(namespace)?.get(local).cloned()
}

#[cfg(test)]
mod tests {
    use dc_types::xml::{SCHEMA_NS, SERIALIZATION_NS};
    use dc_types::{PrimitiveKind, TypeBuilder, known};

    use super::{lookup, lookup_by_name};

    #[test]
    fn every_kind_has_one_contract() {
        let k = known();
        for kind in PrimitiveKind::ALL {
            let contract = lookup(k.primitive(kind)).unwrap();
            assert_eq!(contract.ty().key(), k.primitive(kind).key());
        }
        assert_eq!(lookup(&k.int32).unwrap().name().name(), "int");
        assert_eq!(lookup(&k.byte_array).unwrap().name().name(), "base64Binary");
    }

    #[test]
    fn aliases_do_not_answer_type_lookup() {
        let k = known();
        let string = lookup(&k.string).unwrap();
        assert_eq!(string.name().name(), "string");

        let xs_duration = lookup_by_name("duration", SCHEMA_NS).unwrap();
        let ser_duration = lookup_by_name("duration", SERIALIZATION_NS).unwrap();
        assert_eq!(xs_duration.ty().key(), k.time_span.key());
        assert_eq!(ser_duration.name().namespace(), SERIALIZATION_NS);
        assert!(lookup_by_name("hexBinary", SCHEMA_NS).is_some());
    }

    #[test]
    fn look_alikes_are_not_primitive() {
        let fake = TypeBuilder::class("App", "Int32").build();
        assert!(lookup(&fake).is_none());
    }
}
