//! Wire-name conventions shared by the resolver and the binder.

use dc_types::xml::{ARRAYS_NS, CONTRACT_NS_BASE, QualifiedName, SCHEMA_NS, SERIALIZATION_NS};
use dc_types::{TypeDesc, TypeRef};
use sha2::{Digest, Sha256};

/// Namespace of unbound generic parameters.
pub const GENERIC_PARAM_NS: &str = "{ns}";

/// Placeholder replaced by the digest of the generic arguments' namespaces.
pub const DIGEST_PLACEHOLDER: &str = "{#}";

/// Returns `true` for the namespaces the primitive types live in.
#[inline]
pub fn is_builtin_ns(ns: &str) -> bool {
    ns == SCHEMA_NS || ns == SERIALIZATION_NS
}

/// The namespace of a collection whose items live in `item_ns`.
#[inline]
pub fn collection_ns(item_ns: &str) -> &str {
    if is_builtin_ns(item_ns) { ARRAYS_NS } else { item_ns }
}

/// `ArrayOf{item}` in the item's collection namespace.
pub fn array_of_name(item: &QualifiedName) -> QualifiedName {
    QualifiedName::new(
        format!("ArrayOf{}", item.name()),
        collection_ns(item.namespace()),
    )
}

/// The default namespace of a type: the contract base URI plus the
/// namespace of its outermost declaring type.
pub fn default_ns(ty: &TypeDesc) -> String {
    let mut outer = ty;
    while let Some(d) = outer.declaring() {
        outer = d;
    }
    match outer.namespace() {
        Some(ns) => format!("{CONTRACT_NS_BASE}{ns}"),
        None => CONTRACT_NS_BASE.to_owned(),
    }
}

/// The declared name of a type including its declaring types, `Outer.Inner`,
/// encoded as an XML local name.
pub fn nested_local_name(ty: &TypeDesc) -> String {
    let mut parts = vec![ty.name()];
    let mut outer = ty.declaring();
    while let Some(d) = outer {
        parts.push(d.name());
        outer = d.declaring();
    }
    parts.reverse();
    encode_local_name(&parts.join("."))
}

/// Escapes characters that are not valid in an XML local name as `_xHHHH_`.
///
/// # Examples
///
/// ```
/// use dc_contract::names::encode_local_name;
///
/// assert_eq!(encode_local_name("Order.Line"), "Order.Line");
/// assert_eq!(encode_local_name("List`1"), "List_x0060_1");
/// assert_eq!(encode_local_name("1st"), "_x0031_st");
/// ```
pub fn encode_local_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        let valid = if i == 0 {
            ch.is_alphabetic() || ch == '_'
        } else {
            ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
        };
        if valid {
            out.push(ch);
        } else {
            let mut buf = [0u16; 2];
            for unit in ch.encode_utf16(&mut buf) {
                out.push_str(&format!("_x{unit:04X}_"));
            }
        }
    }
    out
}

const DIGEST_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// A short stable digest of a namespace list.
///
/// The first 8 bytes of the SHA-256 of the space-joined namespaces, read
/// big-endian and written in base 62, least significant digit first.
pub fn namespaces_digest<'a>(namespaces: impl IntoIterator<Item = &'a str>) -> String {
    let joined = namespaces.into_iter().collect::<Vec<_>>().join(" ");
    let digest = Sha256::digest(joined.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let mut hash = u64::from_be_bytes(prefix);
    let mut out = Vec::with_capacity(11);
    loop {
        out.push(DIGEST_ALPHABET[(hash % 62) as usize]);
        hash /= 62;
        if hash == 0 {
            break;
        }
    }
    out.into_iter().map(char::from).collect()
}

/// One generic argument as seen by name templates.
#[derive(Debug, Clone)]
pub struct TemplateArg {
    pub name: QualifiedName,
    pub open: bool,
}

impl TemplateArg {
    pub fn new(name: QualifiedName, open: bool) -> Self {
        Self { name, open }
    }
}

/// The digest appended to generic names, empty when every argument comes
/// from a built-in namespace. An open argument keeps the placeholder.
pub fn generic_digest(args: &[TemplateArg]) -> String {
    if args.iter().any(|a| a.open) {
        return DIGEST_PLACEHOLDER.to_owned();
    }
    if args.iter().all(|a| is_builtin_ns(a.name.namespace())) {
        return String::new();
    }
    namespaces_digest(args.iter().map(|a| a.name.namespace()))
}

/// Substitutes `{i}` by the local name of argument `i` and `{#}` by the
/// namespace digest. Other braces are kept verbatim.
///
/// # Examples
///
/// ```
/// use dc_contract::names::{TemplateArg, expand_template};
/// use dc_types::xml::{QualifiedName, SCHEMA_NS};
///
/// let args = [
///     TemplateArg::new(QualifiedName::new("int", SCHEMA_NS), false),
///     TemplateArg::new(QualifiedName::new("string", SCHEMA_NS), false),
/// ];
/// assert_eq!(expand_template("PairOf{0}And{1}{#}", &args), "PairOfintAndstring");
/// assert_eq!(expand_template("Odd{x}", &args), "Odd{x}");
/// ```
pub fn expand_template(template: &str, args: &[TemplateArg]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let inner = &tail[1..close];
        match inner {
            "#" => out.push_str(&generic_digest(args)),
            _ => match inner.parse::<usize>().ok().and_then(|i| args.get(i)) {
                Some(arg) => out.push_str(arg.name.name()),
                None => out.push_str(&tail[..=close]),
            },
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Returns the argument of `Nullable<T>`, or the type itself.
pub fn unwrap_nullable(ty: &TypeRef) -> &TypeRef {
    let k = dc_types::known();
    match ty.definition() {
        Some(def) if def.key() == k.nullable.key() => ty.generic_args().first().unwrap_or(ty),
        _ => ty,
    }
}
