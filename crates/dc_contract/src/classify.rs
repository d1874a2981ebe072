//! The type classifier.

use dc_types::{TypeRef, TypeShape, known};

use crate::capability;
use crate::contract::Category;
use crate::error::{CollectionContext, ContractError, DefinitionReason};
use crate::{names, primitive, resolver};

/// Picks the contract category of `ty`. The first matching rule wins:
///
/// 1. a generic parameter,
/// 2. the primitive table (after unwrapping `Nullable<T>`),
/// 3. the raw XML shapes `XmlElement` and `XmlNode[]`,
/// 4. enums,
/// 5. arrays, only of rank one,
/// 6. an explicit collection contract,
/// 7. schema providers and self-describing XML types,
/// 8. an explicit class contract,
/// 9. a capability interface, unambiguous at tiers 1 to 5,
/// 10. anything else is a class.
///
/// Classification reads the type only, it never builds contracts.
///
/// # Examples
///
/// ```
/// use dc_contract::classify::classify;
/// use dc_contract::contract::Category;
/// use dc_types::{TypeBuilder, array_of, instantiate, known};
///
/// let k = known();
/// let ints = instantiate(&k.list, &[k.int32.clone()]).unwrap();
/// assert_eq!(classify(&ints).unwrap(), Category::Collection);
/// assert_eq!(classify(&k.string).unwrap(), Category::Primitive);
/// assert_eq!(classify(&k.xml_element).unwrap(), Category::XmlSpecial);
///
/// let point = TypeBuilder::class("Geo", "Point").build();
/// assert_eq!(classify(&point).unwrap(), Category::Class);
/// assert!(classify(&array_of(&k.int32, 2)).is_err());
/// ```
pub fn classify(ty: &TypeRef) -> Result<Category, ContractError> {
    if ty.generic_position().is_some() {
        return Ok(Category::GenericParameter);
    }
    let ty = names::unwrap_nullable(ty);
    let k = known();

    if primitive::lookup(ty).is_some() {
        return Ok(Category::Primitive);
    }
    if ty.key() == k.xml_element.key() || ty.key() == k.xml_node_array.key() {
        return Ok(Category::XmlSpecial);
    }
    if ty.is_enum() {
        return Ok(Category::Enum);
    }
    if let TypeShape::Array { rank, .. } = ty.shape() {
        if *rank > 1 {
            let reason = DefinitionReason::ArrayRankUnsupported { rank: *rank };
            return Err(ContractError::definition(ty, reason));
        }
        return Ok(Category::Collection);
    }

    let attrs = ty.attributes();
    if attrs.collection_data_contract().is_some() {
        return Ok(Category::Collection);
    }
    if resolver::is_self_describing_xml(ty) {
        return Ok(Category::XmlSpecial);
    }
    if attrs.data_contract().is_some() {
        return Ok(Category::Class);
    }

    match capability::scan_with_self(ty) {
        Some(found) if found.multiple_definitions && !found.kind.tolerates_ambiguity() => {
            let reason = DefinitionReason::AmbiguousCapability {
                interface: found.interface.full_name().to_owned(),
                context: CollectionContext::Plain,
            };
            Err(ContractError::definition(ty, reason))
        }
        Some(_) => Ok(Category::Collection),
        None => Ok(Category::Class),
    }
}

#[cfg(test)]
mod tests {
    use dc_types::attrs::{CollectionDataContractAttr, DataContractAttr, XmlSchemaProviderAttr};
    use dc_types::{TypeBuilder, TypeDesc, instantiate, known};

    use super::classify;
    use crate::contract::Category;
    use crate::error::DefinitionReason;

    #[test]
    fn precedence() {
        let k = known();
        let t = TypeDesc::generic_param("T", 0);
        assert_eq!(classify(&t).unwrap(), Category::GenericParameter);

        let maybe = instantiate(&k.nullable, &[k.int32.clone()]).unwrap();
        assert_eq!(classify(&maybe).unwrap(), Category::Primitive);
        assert_eq!(classify(&k.byte_array).unwrap(), Category::Primitive);
        assert_eq!(classify(&k.xml_node_array).unwrap(), Category::XmlSpecial);

        let color = TypeBuilder::enumeration("Paint", "Color", &k.int32).build();
        assert_eq!(classify(&color).unwrap(), Category::Enum);

        // Explicit contracts beat the capability scan.
        let list = instantiate(&k.list, &[k.int32.clone()]).unwrap();
        let tagged = TypeBuilder::class("App", "Tagged")
            .base(&list)
            .attribute(DataContractAttr::default())
            .build();
        assert_eq!(classify(&tagged).unwrap(), Category::Class);

        let bag = TypeBuilder::class("App", "Bag")
            .attribute(CollectionDataContractAttr::default())
            .build();
        assert_eq!(classify(&bag).unwrap(), Category::Collection);

        let provided = TypeBuilder::class("App", "Provided")
            .base(&list)
            .attribute(XmlSchemaProviderAttr {
                method_name: None,
                is_any: true,
            })
            .build();
        assert_eq!(classify(&provided).unwrap(), Category::XmlSpecial);

        let ilist = instantiate(&k.ilist_t, &[k.string.clone()]).unwrap();
        assert_eq!(classify(&ilist).unwrap(), Category::Collection);
    }

    #[test]
    fn ambiguity_by_tier() {
        let k = known();
        let ints = instantiate(&k.idictionary_kv, &[k.int32.clone(), k.int32.clone()]).unwrap();
        let strings = instantiate(&k.idictionary_kv, &[k.string.clone(), k.string.clone()]).unwrap();
        let both = TypeBuilder::class("App", "TwoMaps")
            .implements(&ints)
            .implements(&strings)
            .build();
        let err = classify(&both).unwrap_err();
        assert!(matches!(
            err.definition_reason(),
            Some(DefinitionReason::AmbiguousCapability { .. })
        ));

        let a = instantiate(&k.ienumerable_t, &[k.int32.clone()]).unwrap();
        let b = instantiate(&k.ienumerable_t, &[k.string.clone()]).unwrap();
        let seq = TypeBuilder::class("App", "TwoSeqs")
            .implements(&a)
            .implements(&b)
            .build();
        assert_eq!(classify(&seq).unwrap(), Category::Collection);
    }
}
