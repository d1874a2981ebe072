use serde::{Deserialize, Serialize};

use dc_types::xml::QualifiedName;

use crate::capability::CollectionKind;
use crate::contract::{Category, ContractKind, DataContract};

/// Collection-specific part of a [`ContractSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub kind: CollectionKind,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
    pub item_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_reason: Option<String>,
}

/// A serializable snapshot of a contract's own data.
///
/// Linked contracts are not followed, so cyclic graphs summarize fine.
///
/// # Examples
///
/// ```
/// use dc_contract::ContractCache;
/// use dc_types::{instantiate, known};
///
/// let k = known();
/// let cache = ContractCache::new();
/// let ints = instantiate(&k.list, &[k.int32.clone()]).unwrap();
/// let summary = cache.get_or_build(&ints).unwrap().summary();
///
/// assert_eq!(summary.name.name(), "ArrayOfint");
/// assert_eq!(summary.collection.unwrap().item_name, "int");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub type_name: String,
    pub name: QualifiedName,
    pub category: Category,
    pub is_reference: bool,
    pub is_value_type: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_members: Vec<(String, i64)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl DataContract {
    /// A snapshot of the contract.
    pub fn summary(&self) -> ContractSummary {
        let mut summary = ContractSummary {
            type_name: self.ty().full_name().to_owned(),
            name: self.name().clone(),
            category: self.category(),
            is_reference: self.is_reference(),
            is_value_type: self.is_value_type(),
            collection: None,
            enum_members: Vec::new(),
            members: Vec::new(),
        };
        match self.kind() {
            ContractKind::Collection(c) => {
                let names = c.key_value_names();
                summary.collection = Some(CollectionSummary {
                    kind: c.kind(),
                    item_name: c.item_name().to_owned(),
                    key_name: names.map(|n| n.key.clone()),
                    value_name: names.map(|n| n.value.clone()),
                    item_nullable: c.is_item_nullable(),
                    read_only_reason: c.read_only_reason().map(str::to_owned),
                });
            }
            ContractKind::Enum(e) => {
                summary.enum_members = e.members().iter().map(|m| (m.name.clone(), m.value)).collect();
            }
            ContractKind::Class(c) => {
                summary.members = c.members().iter().map(|m| m.name().to_owned()).collect();
            }
            _ => {}
        }
        summary
    }
}
