use dc_types::{FieldDesc, TypeRef, Visibility, known};
use dc_utils::TryOnceCell;
use dc_utils::hash::HashSet;

use crate::cache::ContractCache;
use crate::contract::data_contract::Equivalence;
use crate::contract::{ContractKind, ContractLink, ContractRef, DataContract};
use crate::error::{ContractError, DefinitionReason};
use crate::{names, resolver};

// -----------------------------------------------------------------------------
// DataMember

/// A serialized field of a class contract.
#[derive(Debug)]
pub struct DataMember {
    name: String,
    member_type: TypeRef,
    declaring: TypeRef,
    order: i32,
    is_required: bool,
    is_public: bool,
    is_nullable: bool,
    contract: TryOnceCell<ContractLink>,
}

impl DataMember {
    /// Order of members without an explicit one.
    pub const DEFAULT_ORDER: i32 = -1;

    /// The element name on the wire.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn member_type(&self) -> &TypeRef {
        &self.member_type
    }

    /// The type declaring the field.
    #[inline]
    pub fn declaring(&self) -> &TypeRef {
        &self.declaring
    }

    #[inline]
    pub fn order(&self) -> i32 {
        self.order
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// The field is publicly accessible.
    #[inline]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// The member may be absent on the wire.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// The contract of the member type.
    pub fn contract(&self, cache: &ContractCache) -> Result<ContractRef, ContractError> {
        let link = self.contract.get_or_try_init(|| {
            cache.get_or_build(&self.member_type).map(ContractLink::Strong)
        })?;
        link.resolve(&self.member_type)
    }

    pub(crate) fn link(&self) -> Option<&ContractLink> {
        self.contract.get()
    }

    pub(crate) fn set_link(&self, link: ContractLink) {
        let _ = self.contract.set(link);
    }

    fn from_field(declaring: &TypeRef, field: &FieldDesc, name: String, order: i32, is_required: bool) -> Self {
        Self {
            name,
            is_nullable: is_nullable(&field.field_type),
            member_type: field.field_type.clone(),
            declaring: declaring.clone(),
            order,
            is_required,
            is_public: field.visibility == Visibility::Public,
            contract: TryOnceCell::new(),
        }
    }

    // Same member under another name, resolved link kept.
    fn copy_as(&self, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            member_type: self.member_type.clone(),
            declaring: self.declaring.clone(),
            order: self.order,
            is_required: self.is_required,
            is_public: self.is_public,
            is_nullable: self.is_nullable,
            contract: match self.contract.get() {
                Some(link) => TryOnceCell::with_value(link.clone()),
                None => TryOnceCell::new(),
            },
        }
    }

    fn rebind(&self, args: &[TypeRef]) -> Self {
        let member_type = dc_types::substitute(&self.member_type, args);
        Self {
            name: self.name.clone(),
            is_nullable: is_nullable(&member_type),
            member_type,
            declaring: dc_types::substitute(&self.declaring, args),
            order: self.order,
            is_required: self.is_required,
            is_public: self.is_public,
            contract: TryOnceCell::new(),
        }
    }
}

fn is_nullable(ty: &TypeRef) -> bool {
    !ty.is_value_type() || names::unwrap_nullable(ty).key() != ty.key()
}

// -----------------------------------------------------------------------------
// ClassContract

/// The payload of a class contract.
#[derive(Debug)]
pub struct ClassContract {
    members: Vec<DataMember>,
    explicit: bool,
}

impl ClassContract {
    /// Members in wire order: base types first, then by order and name.
    #[inline]
    pub fn members(&self) -> &[DataMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&DataMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// The type declares an explicit class contract.
    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// A copy whose first two members are named `key` and `value`.
    pub(crate) fn renamed(&self, key: &str, value: &str) -> Self {
        let members = self
            .members
            .iter()
            .enumerate()
            .map(|(index, m)| match index {
                0 => m.copy_as(key),
                1 => m.copy_as(value),
                _ => m.copy_as(&m.name),
            })
            .collect();
        Self {
            members,
            explicit: self.explicit,
        }
    }

    /// A copy for a bound contract: types substituted, links unresolved.
    pub(crate) fn rebind(&self, args: &[TypeRef]) -> Self {
        Self {
            members: self.members.iter().map(|m| m.rebind(args)).collect(),
            explicit: self.explicit,
        }
    }

    pub(crate) fn same_shape(&self, other: &Self, eq: &mut Equivalence) -> bool {
        self.members.len() == other.members.len()
            && self.members.iter().zip(&other.members).all(|(a, b)| {
                a.name == b.name
                    && a.order == b.order
                    && a.is_required == b.is_required
                    && eq.links(a.link(), &a.member_type, b.link(), &b.member_type)
            })
    }
}

// -----------------------------------------------------------------------------
// Build

/// Builds the contract of a class or struct.
///
/// Each level of the hierarchy, base first, contributes its own fields:
/// `DataMember` fields of an explicit contract, every non-`NonSerialized`
/// instance field of a legacy-serializable type, or else the public
/// instance fields.
pub(crate) fn build(ty: &TypeRef) -> Result<DataContract, ContractError> {
    let k = known();
    let mut levels: Vec<TypeRef> = ty
        .base_chain()
        .filter(|base| base.key() != k.object.key())
        .collect();
    levels.reverse();
    levels.push(ty.clone());

    let mut members = Vec::new();
    for level in &levels {
        let start = members.len();
        collect_level(level, &mut members)?;
        members[start..].sort_by(|a: &DataMember, b: &DataMember| {
            a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name))
        });
    }

    let duplicate = {
        let mut seen = HashSet::<&str>::default();
        members
            .iter()
            .find(|m| !seen.insert(m.name.as_str()))
            .map(|m| m.name.clone())
    };
    if let Some(name) = duplicate {
        let reason = DefinitionReason::DuplicateMemberName { name };
        return Err(ContractError::definition(ty, reason));
    }

    let attr = ty.attributes().data_contract();
    let class = ClassContract {
        members,
        explicit: attr.is_some(),
    };
    let name = resolver::resolve(ty)?;
    Ok(DataContract::new(
        ty.clone(),
        name,
        ContractKind::Class(class),
        attr.is_some_and(|a| a.is_reference),
    ))
}

fn collect_level(level: &TypeRef, out: &mut Vec<DataMember>) -> Result<(), ContractError> {
    let attrs = level.attributes();
    let instance = level.fields().iter().filter(|f| !f.is_static);

    if attrs.data_contract().is_some() {
        for field in instance {
            let Some(member) = field.attributes.data_member() else {
                continue;
            };
            let name = member.name.clone().unwrap_or_else(|| field.name.clone());
            if name.is_empty() {
                return Err(ContractError::definition(level, DefinitionReason::EmptyLocalName));
            }
            let order = member.order.unwrap_or(DataMember::DEFAULT_ORDER);
            out.push(DataMember::from_field(level, field, name, order, member.is_required));
        }
        return Ok(());
    }

    let serializable = attrs.is_serializable();
    let included = instance.filter(|f| {
        !f.attributes.is_non_serialized() && (serializable || f.visibility == Visibility::Public)
    });
    for field in included {
        let member = DataMember::from_field(level, field, field.name.clone(), DataMember::DEFAULT_ORDER, false);
        out.push(member);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use dc_types::attrs::{Attribute, DataContractAttr, DataMemberAttr};
    use dc_types::{FieldDesc, TypeBuilder, Visibility, instantiate, known};

    use super::build;
    use crate::error::DefinitionReason;

    fn member(name: Option<&str>, order: Option<i32>) -> DataMemberAttr {
        DataMemberAttr {
            name: name.map(str::to_owned),
            order,
            is_required: false,
        }
    }

    fn names(contract: &crate::contract::DataContract) -> Vec<&str> {
        contract
            .as_class()
            .unwrap()
            .members()
            .iter()
            .map(|m| m.name())
            .collect()
    }

    #[test]
    fn public_fields_by_default() {
        let k = known();
        let point = TypeBuilder::structure("Geo", "Point")
            .field(FieldDesc::new("Y", &k.int32))
            .field(FieldDesc::new("X", &k.int32))
            .field(FieldDesc::new("cache", &k.string).visibility(Visibility::Private))
            .field(FieldDesc::new("Skip", &k.int32).with(Attribute::NonSerialized))
            .build();
        let contract = build(&point).unwrap();
        assert_eq!(names(&contract), ["X", "Y"]);
        assert!(!contract.as_class().unwrap().is_explicit());
        assert!(!contract.as_class().unwrap().member("X").unwrap().is_nullable());
    }

    #[test]
    fn explicit_members_order_and_rename() {
        let k = known();
        let order = TypeBuilder::class("Shop", "Order")
            .base(&k.object)
            .attribute(DataContractAttr {
                is_reference: true,
                ..Default::default()
            })
            .field(FieldDesc::new("id", &k.int32).visibility(Visibility::Private).with(member(Some("Id"), Some(0))))
            .field(FieldDesc::new("Total", &k.decimal).with(member(None, Some(1))))
            .field(FieldDesc::new("Note", &k.string).with(member(None, None)))
            .field(FieldDesc::new("Ignored", &k.string))
            .build();
        let contract = build(&order).unwrap();
        assert_eq!(names(&contract), ["Note", "Id", "Total"]);
        assert!(contract.is_reference());

        let class = contract.as_class().unwrap();
        assert!(class.is_explicit());
        let id = class.member("Id").unwrap();
        assert!(!id.is_public());
        assert_eq!(id.order(), 0);
        assert!(class.member("Note").unwrap().is_nullable());
    }

    #[test]
    fn base_members_come_first() {
        let k = known();
        let animal = TypeBuilder::class("Zoo", "Animal")
            .base(&k.object)
            .field(FieldDesc::new("Name", &k.string))
            .build();
        let dog = TypeBuilder::class("Zoo", "Dog")
            .base(&animal)
            .field(FieldDesc::new("Breed", &k.string))
            .field(FieldDesc::new("Age", &k.int32))
            .build();
        let contract = build(&dog).unwrap();
        assert_eq!(names(&contract), ["Name", "Age", "Breed"]);
        let name = contract.as_class().unwrap().member("Name").unwrap();
        assert_eq!(name.declaring().key(), animal.key());
    }

    #[test]
    fn legacy_serializable_includes_private_fields() {
        let k = known();
        let legacy = TypeBuilder::class("Old", "Record")
            .attribute(Attribute::Serializable)
            .field(FieldDesc::new("secret", &k.string).visibility(Visibility::Private))
            .field(FieldDesc::new("transient", &k.string).with(Attribute::NonSerialized))
            .build();
        let contract = build(&legacy).unwrap();
        assert_eq!(names(&contract), ["secret"]);
    }

    #[test]
    fn duplicate_and_empty_names() {
        let k = known();
        let base = TypeBuilder::class("Zoo", "Base")
            .field(FieldDesc::new("Name", &k.string))
            .build();
        let clash = TypeBuilder::class("Zoo", "Clash")
            .base(&base)
            .field(FieldDesc::new("Name", &k.string))
            .build();
        let err = build(&clash).unwrap_err();
        assert_eq!(
            err.definition_reason(),
            Some(&DefinitionReason::DuplicateMemberName { name: "Name".into() })
        );

        let empty = TypeBuilder::class("Zoo", "Empty")
            .attribute(DataContractAttr::default())
            .field(FieldDesc::new("X", &k.int32).with(member(Some(""), None)))
            .build();
        let err = build(&empty).unwrap_err();
        assert_eq!(err.definition_reason(), Some(&DefinitionReason::EmptyLocalName));
    }

    #[test]
    fn key_value_entries() {
        let k = known();
        let entry = instantiate(&k.key_value, &[k.string.clone(), k.int32.clone()]).unwrap();
        let contract = build(&entry).unwrap();
        assert_eq!(names(&contract), ["Key", "Value"]);
        assert!(contract.as_class().unwrap().members().iter().all(|m| m.is_required()));

        let renamed = contract.as_class().unwrap().renamed("Name", "Count");
        let renamed: Vec<_> = renamed.members().iter().map(|m| m.name()).collect();
        assert_eq!(renamed, ["Name", "Count"]);
    }
}
