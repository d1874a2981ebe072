use dc_types::TypeRef;
use dc_types::xml::{QualifiedName, SchemaSet, SchemaType};

use crate::contract::{ContractKind, DataContract};
use crate::error::ContractError;
use crate::resolver;

/// The payload of a self-describing XML contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlContract {
    has_root: bool,
    top_level_element: Option<QualifiedName>,
    schema_type: Option<SchemaType>,
    is_any: bool,
}

impl XmlContract {
    /// A top-level wrapper element is emitted.
    #[inline]
    pub fn has_root(&self) -> bool {
        self.has_root
    }

    /// The wrapper element, `XmlRoot` first, else the contract name.
    ///
    /// `None` for rootless types.
    #[inline]
    pub fn top_level_element(&self) -> Option<&QualifiedName> {
        self.top_level_element.as_ref()
    }

    /// Inline schema of an anonymous provider type.
    #[inline]
    pub fn schema_type(&self) -> Option<&SchemaType> {
        self.schema_type.as_ref()
    }

    /// The type accepts any XML content.
    #[inline]
    pub fn is_any(&self) -> bool {
        self.is_any
    }
}

/// Builds the contract of an XML-special type, returning the schemas its
/// provider added.
pub(crate) fn build(ty: &TypeRef) -> Result<(DataContract, SchemaSet), ContractError> {
    let info = resolver::xml_type_info(ty)?;
    let attrs = ty.attributes();
    let is_any = attrs.schema_provider().is_some_and(|p| p.is_any);

    let top_level_element = info.has_root.then(|| match attrs.xml_root() {
        Some(root) => QualifiedName::new(
            root.element_name.clone().unwrap_or_else(|| info.name.name().to_owned()),
            root.namespace.clone().unwrap_or_default(),
        ),
        None => info.name.clone(),
    });
    let xml = XmlContract {
        has_root: info.has_root,
        top_level_element,
        schema_type: info.schema_type,
        is_any,
    };
    let contract = DataContract::new(ty.clone(), info.name, ContractKind::XmlSpecial(xml), false);
    Ok((contract, info.schemas))
}
