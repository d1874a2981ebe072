use dc_types::{PrimitiveKind, TypeRef, TypeShape};
use dc_utils::hash::HashSet;

use crate::contract::{ContractKind, DataContract};
use crate::error::{ContractError, DefinitionReason};
use crate::{primitive, resolver};

// -----------------------------------------------------------------------------
// EnumContract

/// A named value of an enum contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    /// The value; `u64` enums store the bit pattern.
    pub value: i64,
}

/// The payload of an enum contract.
///
/// Members keep declaration order. Values need not be unique, names must be.
#[derive(Debug, Clone)]
pub struct EnumContract {
    underlying: PrimitiveKind,
    base_name: String,
    is_flags: bool,
    members: Vec<EnumMember>,
    type_name: Box<str>,
}

impl EnumContract {
    /// The integral kind underlying the enum.
    #[inline]
    pub fn underlying(&self) -> PrimitiveKind {
        self.underlying
    }

    /// The wire name of the underlying primitive, e.g. `int`.
    #[inline]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// `u64` values compare and print unsigned.
    #[inline]
    pub fn is_unsigned64(&self) -> bool {
        self.underlying == PrimitiveKind::UInt64
    }

    #[inline]
    pub fn is_flags(&self) -> bool {
        self.is_flags
    }

    #[inline]
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Equal flags semantics and the same member names, in any order.
    pub(crate) fn same_shape(&self, other: &Self) -> bool {
        if self.is_flags != other.is_flags || self.members.len() != other.members.len() {
            return false;
        }
        fn sorted(members: &[EnumMember]) -> Vec<&str> {
            let mut names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
            names.sort_unstable();
            names
        }
        sorted(&self.members) == sorted(&other.members)
    }

    fn invalid(&self, value: impl ToString) -> ContractError {
        ContractError::InvalidEnumValue {
            type_name: self.type_name.to_string(),
            value: value.to_string(),
        }
    }

    fn display_value(&self, value: i64) -> String {
        if self.is_unsigned64() {
            (value as u64).to_string()
        } else {
            value.to_string()
        }
    }

    /// The wire text of `value`.
    ///
    /// A flags value equal to a member's value is that member's name.
    /// Otherwise it is the space-separated names of the members whose bits
    /// compose it, in declaration order; an unnamed zero is the empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// use dc_contract::ContractCache;
    /// use dc_types::attrs::Attribute;
    /// use dc_types::{TypeBuilder, known};
    ///
    /// let access = TypeBuilder::enumeration("Fs", "Access", &known().int32)
    ///     .attribute(Attribute::Flags)
    ///     .variant("None", 0)
    ///     .variant("Read", 1)
    ///     .variant("Write", 2)
    ///     .build();
    ///
    /// let cache = ContractCache::new();
    /// let contract = cache.get_or_build(&access).unwrap();
    /// let access = contract.as_enum().unwrap();
    ///
    /// assert_eq!(access.value_to_text(3).unwrap(), "Read Write");
    /// assert_eq!(access.value_to_text(0).unwrap(), "None");
    /// assert_eq!(access.text_to_value("Write Read").unwrap(), 3);
    /// assert!(access.value_to_text(4).is_err());
    /// ```
    pub fn value_to_text(&self, value: i64) -> Result<String, ContractError> {
        if !self.is_flags {
            return self
                .members
                .iter()
                .find(|m| m.value == value)
                .map(|m| m.name.clone())
                .ok_or_else(|| self.invalid(self.display_value(value)));
        }

        if let Some(exact) = self.members.iter().find(|m| m.value == value) {
            return Ok(exact.name.clone());
        }
        if value == 0 {
            return Ok(String::new());
        }
        // Later members win, so composites declared after their parts are taken whole.
        let mut remaining = value;
        let mut names = Vec::new();
        for member in self.members.iter().rev() {
            if member.value != 0 && remaining & member.value == member.value {
                names.push(member.name.as_str());
                remaining &= !member.value;
            }
        }
        if remaining != 0 {
            return Err(self.invalid(self.display_value(value)));
        }
        names.reverse();
        Ok(names.join(" "))
    }

    /// The value of wire text produced by [`value_to_text`](Self::value_to_text).
    pub fn text_to_value(&self, text: &str) -> Result<i64, ContractError> {
        let lookup = |name: &str| {
            self.member(name)
                .map(|m| m.value)
                .ok_or_else(|| self.invalid(text))
        };
        if !self.is_flags {
            return lookup(text.trim());
        }
        text.split_whitespace()
            .try_fold(0i64, |acc, name| Ok(acc | lookup(name)?))
    }
}

// -----------------------------------------------------------------------------
// Build

/// Builds the contract of an enum type.
pub(crate) fn build(ty: &TypeRef) -> Result<DataContract, ContractError> {
    let fail = |reason| ContractError::definition(ty, reason);
    let TypeShape::Enum { underlying } = ty.shape() else {
        let reason = DefinitionReason::UnsupportedEnumUnderlying {
            underlying: ty.full_name().to_owned(),
        };
        return Err(fail(reason));
    };

    let unsupported = || {
        fail(DefinitionReason::UnsupportedEnumUnderlying {
            underlying: underlying.full_name().to_owned(),
        })
    };
    let kind = underlying
        .primitive_kind()
        .filter(|kind| kind.is_integral())
        .ok_or_else(unsupported)?;
    let base = primitive::lookup(underlying).ok_or_else(unsupported)?;

    let attrs = ty.attributes();
    let explicit = attrs.data_contract();
    if explicit.is_some_and(|a| a.is_reference) {
        return Err(fail(DefinitionReason::EnumIsReference));
    }

    let mut members = Vec::new();
    let mut seen = HashSet::<String>::default();
    for field in ty.fields().iter().filter(|f| f.is_static) {
        let name = if explicit.is_some() {
            if field.attributes.data_member().is_some() {
                let reason = DefinitionReason::DataMemberOnEnumField {
                    field: field.name.clone(),
                };
                return Err(fail(reason));
            }
            match field.attributes.enum_member_count() {
                0 => continue,
                1 => {}
                _ => {
                    let reason = DefinitionReason::TooManyEnumMemberTraits {
                        field: field.name.clone(),
                    };
                    return Err(fail(reason));
                }
            }
            match field.attributes.enum_member().and_then(|a| a.value.as_deref()) {
                Some("") => {
                    let reason = DefinitionReason::EmptyEnumMemberValue {
                        field: field.name.clone(),
                    };
                    return Err(fail(reason));
                }
                Some(value) => value.to_owned(),
                None => field.name.clone(),
            }
        } else if field.attributes.is_non_serialized() {
            continue;
        } else {
            field.name.clone()
        };

        if !seen.insert(name.clone()) {
            return Err(fail(DefinitionReason::DuplicateMemberName { name }));
        }
        members.push(EnumMember {
            name,
            value: field.constant.unwrap_or_default(),
        });
    }

    let contract = EnumContract {
        underlying: kind,
        base_name: base.name().name().to_owned(),
        is_flags: attrs.is_flags(),
        members,
        type_name: ty.full_name().into(),
    };
    let name = resolver::resolve(ty)?;
    Ok(DataContract::new(ty.clone(), name, ContractKind::Enum(contract), false))
}

#[cfg(test)]
mod tests {
    use dc_types::attrs::{Attribute, Attributes, DataContractAttr, DataMemberAttr, EnumMemberAttr};
    use dc_types::{TypeBuilder, known};

    use super::build;
    use crate::error::DefinitionReason;

    fn reason(result: Result<crate::contract::DataContract, crate::error::ContractError>) -> DefinitionReason {
        result.unwrap_err().definition_reason().unwrap().clone()
    }

    #[test]
    fn implicit_members_keep_declaration_order() {
        let k = known();
        let color = TypeBuilder::enumeration("Paint", "Color", &k.int32)
            .variant("Red", 0)
            .variant("Green", 1)
            .variant("Blue", 2)
            .variant_with("Hidden", 3, Attributes::new().with(Attribute::NonSerialized))
            .build();

        let contract = build(&color).unwrap();
        let color = contract.as_enum().unwrap();
        let members: Vec<_> = color.members().iter().map(|m| (m.name.as_str(), m.value)).collect();
        assert_eq!(members, [("Red", 0), ("Green", 1), ("Blue", 2)]);
        assert!(!color.is_flags());
        assert_eq!(color.base_name(), "int");
        assert_eq!(color.value_to_text(1).unwrap(), "Green");
        assert!(color.text_to_value("Purple").is_err());
    }

    #[test]
    fn explicit_members_need_exactly_one_trait() {
        let k = known();
        let member = |value: Option<&str>| {
            Attributes::new().with(EnumMemberAttr {
                value: value.map(str::to_owned),
            })
        };
        let status = TypeBuilder::enumeration("Jobs", "Status", &k.byte)
            .attribute(DataContractAttr::default())
            .variant_with("Running", 0, member(Some("run")))
            .variant_with("Done", 1, member(None))
            .variant("Internal", 2)
            .build();
        let contract = build(&status).unwrap();
        let names: Vec<_> = contract.as_enum().unwrap().members().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, ["run", "Done"]);

        let twice = TypeBuilder::enumeration("Jobs", "Twice", &k.int32)
            .attribute(DataContractAttr::default())
            .variant_with(
                "A",
                0,
                Attributes::new().with(EnumMemberAttr::default()).with(EnumMemberAttr::default()),
            )
            .build();
        assert!(matches!(reason(build(&twice)), DefinitionReason::TooManyEnumMemberTraits { .. }));

        let empty = TypeBuilder::enumeration("Jobs", "Empty", &k.int32)
            .attribute(DataContractAttr::default())
            .variant_with("A", 0, member(Some("")))
            .build();
        assert!(matches!(reason(build(&empty)), DefinitionReason::EmptyEnumMemberValue { .. }));

        let data_member = TypeBuilder::enumeration("Jobs", "Mixed", &k.int32)
            .attribute(DataContractAttr::default())
            .variant_with("A", 0, Attributes::new().with(DataMemberAttr::default()))
            .build();
        assert!(matches!(reason(build(&data_member)), DefinitionReason::DataMemberOnEnumField { .. }));
    }

    #[test]
    fn names_must_be_unique_values_need_not() {
        let k = known();
        let clash = TypeBuilder::enumeration("Users", "State", &k.int32)
            .attribute(DataContractAttr::default())
            .variant_with("On", 0, Attributes::new().with(EnumMemberAttr { value: Some("Active".into()) }))
            .variant_with("Yes", 1, Attributes::new().with(EnumMemberAttr { value: Some("Active".into()) }))
            .build();
        assert_eq!(
            reason(build(&clash)),
            DefinitionReason::DuplicateMemberName { name: "Active".into() }
        );

        let aliases = TypeBuilder::enumeration("Users", "Level", &k.int32)
            .variant("Low", 1)
            .variant("Minimum", 1)
            .build();
        assert_eq!(build(&aliases).unwrap().as_enum().unwrap().members().len(), 2);
    }

    #[test]
    fn invalid_underlying_and_reference_tracking() {
        let k = known();
        let float = TypeBuilder::enumeration("Bad", "Ratio", &k.double).variant("Half", 0).build();
        assert!(matches!(reason(build(&float)), DefinitionReason::UnsupportedEnumUnderlying { .. }));

        let tracked = TypeBuilder::enumeration("Bad", "Tracked", &k.int32)
            .attribute(DataContractAttr {
                is_reference: true,
                ..Default::default()
            })
            .build();
        assert_eq!(reason(build(&tracked)), DefinitionReason::EnumIsReference);
    }

    #[test]
    fn equality_ignores_order_but_not_flags() {
        let k = known();
        let a = TypeBuilder::enumeration("Cmp", "A", &k.int32).variant("X", 0).variant("Y", 1).build();
        let b = TypeBuilder::enumeration("Cmp", "B", &k.int32).variant("Y", 0).variant("X", 1).build();
        let c = TypeBuilder::enumeration("Cmp", "C", &k.int32)
            .attribute(Attribute::Flags)
            .variant("X", 1)
            .variant("Y", 2)
            .build();

        let (a, b, c) = (build(&a).unwrap(), build(&b).unwrap(), build(&c).unwrap());
        let (a, b, c) = (a.as_enum().unwrap(), b.as_enum().unwrap(), c.as_enum().unwrap());
        assert!(a.same_shape(b));
        assert!(!a.same_shape(c));
    }

    #[test]
    fn flags_prefer_declared_composites() {
        let k = known();
        let perm = TypeBuilder::enumeration("Fs", "Perm", &k.int32)
            .attribute(Attribute::Flags)
            .variant("Read", 1)
            .variant("Write", 2)
            .variant("ReadWrite", 3)
            .variant("Exec", 4)
            .build();
        let contract = build(&perm).unwrap();
        let perm = contract.as_enum().unwrap();

        assert_eq!(perm.value_to_text(3).unwrap(), "ReadWrite");
        assert_eq!(perm.value_to_text(7).unwrap(), "ReadWrite Exec");
        assert_eq!(perm.value_to_text(5).unwrap(), "Read Exec");
        assert_eq!(perm.value_to_text(0).unwrap(), "");
        for value in [1, 3, 5, 7] {
            let text = perm.value_to_text(value).unwrap();
            assert_eq!(perm.text_to_value(&text).unwrap(), value);
        }
        assert!(perm.value_to_text(8).is_err());
    }

    #[test]
    fn unsigned_values_print_unsigned() {
        let k = known();
        let big = TypeBuilder::enumeration("Big", "Mask", &k.uint64).variant("Top", i64::MIN).build();
        let contract = build(&big).unwrap();
        let mask = contract.as_enum().unwrap();
        assert!(mask.is_unsigned64());
        assert_eq!(mask.value_to_text(i64::MIN).unwrap(), "Top");
        let err = mask.value_to_text(-1).unwrap_err();
        assert!(err.to_string().contains(&u64::MAX.to_string()));
    }
}
