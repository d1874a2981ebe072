//! Stable wire names of types.
//!
//! Resolution order: `Nullable<T>` is unwrapped, then primitives, the raw
//! XML shapes, generic parameters, enums, arrays, explicit collection
//! contracts, schema providers and self-describing XML types, explicit
//! class contracts, capability collections, and finally the default
//! convention derived from the type's declared identity.

use dc_types::attrs::CollectionDataContractAttr;
use dc_types::xml::{ProviderValue, QualifiedName, SchemaSet, SchemaType};
use dc_types::{TypeKey, TypeRef, TypeShape, known};

use crate::capability;
use crate::error::{ContractError, DefinitionReason};
use crate::names::{self, GENERIC_PARAM_NS, TemplateArg};
use crate::primitive;

// -----------------------------------------------------------------------------
// XmlTypeInfo

/// Naming information of an XML-special type.
#[derive(Debug, Clone)]
pub struct XmlTypeInfo {
    pub name: QualifiedName,
    /// Inline schema-type fragment of an anonymous provider type.
    pub schema_type: Option<SchemaType>,
    /// `false` when no top-level wrapper element is emitted.
    pub has_root: bool,
    /// Schemas added by the provider while it ran.
    pub schemas: SchemaSet,
}

/// Resolves the stable wire name of `ty`.
///
/// # Examples
///
/// ```
/// use dc_contract::resolver::resolve;
/// use dc_types::xml::ARRAYS_NS;
/// use dc_types::{TypeBuilder, instantiate, known};
///
/// let k = known();
/// let ints = instantiate(&k.list, &[k.int32.clone()]).unwrap();
/// let name = resolve(&ints).unwrap();
/// assert_eq!((name.name(), name.namespace()), ("ArrayOfint", ARRAYS_NS));
///
/// let order = TypeBuilder::class("Shop", "Order").build();
/// let name = resolve(&order).unwrap();
/// assert_eq!(name.name(), "Order");
/// assert_eq!(name.namespace(), "http://schemas.datacontract.org/2004/07/Shop");
/// ```
pub fn resolve(ty: &TypeRef) -> Result<QualifiedName, ContractError> {
    Resolver::default().resolve(ty)
}

/// Resolves the name, root and schema of a type classified as XML-special.
pub fn xml_type_info(ty: &TypeRef) -> Result<XmlTypeInfo, ContractError> {
    Resolver::default().xml_type_info(ty)
}

/// Returns `true` if the type describes its own XML shape.
pub fn is_self_describing_xml(ty: &TypeRef) -> bool {
    ty.attributes().schema_provider().is_some()
        || ty.is_assignable_to(&known().ixml_serializable)
}

/// The default name of `ty`, ignoring contract attributes.
pub fn default_name(ty: &TypeRef) -> Result<QualifiedName, ContractError> {
    Resolver::default().default_name(ty)
}

#[derive(Default)]
struct Resolver {
    // Collections whose name is being resolved.
    visiting: Vec<TypeKey>,
}

impl Resolver {
    fn resolve(&mut self, ty: &TypeRef) -> Result<QualifiedName, ContractError> {
        let ty = names::unwrap_nullable(ty);
        let attrs = ty.attributes();

        if let Some(contract) = primitive::lookup(ty) {
            return Ok(contract.name().clone());
        }
        if let Some(info) = special_xml(ty) {
            return Ok(info.name);
        }
        if let Some(position) = ty.generic_position() {
            return Ok(QualifiedName::new(format!("{{{position}}}"), GENERIC_PARAM_NS));
        }
        if ty.is_enum() {
            return self.declared_name(ty);
        }
        if let TypeShape::Array { element, rank } = ty.shape() {
            if *rank > 1 {
                let reason = DefinitionReason::ArrayRankUnsupported { rank: *rank };
                return Err(ContractError::definition(ty, reason));
            }
            return self.guarded(ty, |this| Ok(names::array_of_name(&this.resolve(element)?)));
        }
        if let Some(attr) = attrs.collection_data_contract() {
            return self.guarded(ty, |this| this.explicit_collection_name(ty, attr));
        }
        if is_self_describing_xml(ty) {
            return Ok(self.xml_type_info(ty)?.name);
        }
        if attrs.data_contract().is_some() {
            return self.declared_name(ty);
        }
        if let Some(item) = capability::item_type_of(ty) {
            return self.guarded(ty, |this| Ok(names::array_of_name(&this.resolve(&item)?)));
        }
        self.default_name(ty)
    }

    // Naming a collection after its item must not come back to the collection.
    fn guarded(
        &mut self,
        ty: &TypeRef,
        f: impl FnOnce(&mut Self) -> Result<QualifiedName, ContractError>,
    ) -> Result<QualifiedName, ContractError> {
        if self.visiting.contains(&ty.key()) {
            return Err(ContractError::definition(ty, DefinitionReason::RecursiveCollectionType));
        }
        self.visiting.push(ty.key());
        let result = f(self);
        self.visiting.pop();
        result
    }

    fn template_args(&mut self, ty: &TypeRef) -> Result<Vec<TemplateArg>, ContractError> {
        ty.generic_args()
            .iter()
            .map(|arg| {
                let name = self.resolve(arg)?;
                Ok(TemplateArg::new(name, arg.contains_generic_parameters()))
            })
            .collect()
    }

    fn checked(ty: &TypeRef, local: String, ns: String) -> Result<QualifiedName, ContractError> {
        if local.is_empty() {
            return Err(ContractError::definition(ty, DefinitionReason::EmptyLocalName));
        }
        Ok(QualifiedName::new(local, ns))
    }

    fn explicit_collection_name(
        &mut self,
        ty: &TypeRef,
        attr: &CollectionDataContractAttr,
    ) -> Result<QualifiedName, ContractError> {
        let local = match &attr.name {
            Some(template) => {
                let args = self.template_args(ty)?;
                names::expand_template(template, &args)
            }
            None => match capability::item_type_of(ty) {
                Some(item) => format!("ArrayOf{}", self.resolve(&item)?.name()),
                None => names::nested_local_name(ty),
            },
        };
        let ns = attr.namespace.clone().unwrap_or_else(|| names::default_ns(ty));
        Self::checked(ty, local, ns)
    }

    fn declared_name(&mut self, ty: &TypeRef) -> Result<QualifiedName, ContractError> {
        let Some(attr) = ty.attributes().data_contract() else {
            return self.default_name(ty);
        };
        let local = match &attr.name {
            Some(template) => {
                let args = self.template_args(ty)?;
                names::expand_template(template, &args)
            }
            None => self.default_local_name(ty)?,
        };
        let ns = attr.namespace.clone().unwrap_or_else(|| names::default_ns(ty));
        Self::checked(ty, local, ns)
    }

    fn default_name(&mut self, ty: &TypeRef) -> Result<QualifiedName, ContractError> {
        let local = self.default_local_name(ty)?;
        Self::checked(ty, local, names::default_ns(ty))
    }

    // `NameOf{args}` for generic types, with the namespace digest or `{#}`.
    fn default_local_name(&mut self, ty: &TypeRef) -> Result<String, ContractError> {
        let mut local = names::nested_local_name(ty);
        if ty.generic_args().is_empty() {
            return Ok(local);
        }
        let args = self.template_args(ty)?;
        local.push_str("Of");
        for arg in &args {
            local.push_str(arg.name.name());
        }
        local.push_str(&names::generic_digest(&args));
        Ok(local)
    }

    fn xml_type_info(&mut self, ty: &TypeRef) -> Result<XmlTypeInfo, ContractError> {
        if let Some(info) = special_xml(ty) {
            return Ok(info);
        }
        let mut info = XmlTypeInfo {
            name: QualifiedName::new("", ""),
            schema_type: None,
            has_root: true,
            schemas: SchemaSet::new(),
        };

        let Some(provider) = ty.attributes().schema_provider() else {
            info.name = self.default_name(ty)?;
            return Ok(info);
        };
        if provider.is_any {
            info.has_root = false;
        }

        let method_name = provider.method_name.as_deref().filter(|m| !m.is_empty());
        let Some(method_name) = method_name else {
            if !provider.is_any {
                return Err(ContractError::definition(ty, DefinitionReason::InvalidSchemaProvider));
            }
            info.name = self.default_name(ty)?;
            return Ok(info);
        };

        let k = known();
        let missing = || {
            let reason = DefinitionReason::MissingSchemaProviderMethod {
                method: method_name.to_owned(),
            };
            ContractError::definition(ty, reason)
        };
        let method = ty
            .methods()
            .iter()
            .find(|m| {
                m.name == method_name
                    && m.is_static
                    && m.visibility == dc_types::Visibility::Public
                    && m.params.len() == 1
                    && m.params[0].key() == k.xml_schema_set.key()
            })
            .ok_or_else(missing)?;

        let returns_name = method
            .returns
            .as_ref()
            .is_some_and(|r| r.is_assignable_to(&k.qualified_name));
        let returns_type = method
            .returns
            .as_ref()
            .is_some_and(|r| r.is_assignable_to(&k.xml_schema_type));
        if !returns_name && !returns_type {
            let reason = DefinitionReason::InvalidSchemaProviderReturn {
                method: method_name.to_owned(),
            };
            return Err(ContractError::definition(ty, reason));
        }
        let body = method.schema_provider.ok_or_else(missing)?;

        log::trace!("invoking schema provider {}::{method_name}", ty.full_name());
        let value = body(&mut info.schemas);
        if provider.is_any {
            if value.is_some() {
                let reason = DefinitionReason::NonNullReturnForAnyProvider {
                    method: method_name.to_owned(),
                };
                return Err(ContractError::definition(ty, reason));
            }
            info.name = self.default_name(ty)?;
            return Ok(info);
        }

        match value {
            None => {
                info.has_root = false;
                info.name = self.default_name(ty)?;
            }
            Some(ProviderValue::Name(name)) => info.name = name,
            Some(ProviderValue::Type(schema_type)) => match schema_type.name() {
                None => {
                    info.name = self.default_name(ty)?;
                    info.schema_type = Some(schema_type);
                }
                Some(type_name) => {
                    let Some(ns) = info.schemas.namespace_of(&schema_type) else {
                        let reason = DefinitionReason::MissingSchemaType {
                            name: type_name.to_owned(),
                        };
                        return Err(ContractError::definition(ty, reason));
                    };
                    info.name = QualifiedName::new(type_name, ns);
                }
            },
        }

        if info.name.is_empty() {
            return Err(ContractError::definition(ty, DefinitionReason::EmptyLocalName));
        }
        Ok(info)
    }
}

// `XmlElement` is rootless, `XmlNode[]` has a root.
fn special_xml(ty: &TypeRef) -> Option<XmlTypeInfo> {
    let k = known();
    let (local, has_root) = if ty.key() == k.xml_element.key() {
        ("XmlElement", false)
    } else if ty.key() == k.xml_node_array.key() {
        ("ArrayOfXmlNode", true)
    } else {
        return None;
    };
    Some(XmlTypeInfo {
        name: QualifiedName::new(local, names::default_ns(ty)),
        schema_type: None,
        has_root,
        schemas: SchemaSet::new(),
    })
}

#[cfg(test)]
mod tests {
    use dc_types::attrs::{CollectionDataContractAttr, DataContractAttr, XmlSchemaProviderAttr};
    use dc_types::xml::{ARRAYS_NS, CONTRACT_NS_BASE, ProviderValue, QualifiedName};
    use dc_types::xml::{SchemaSet, SchemaType};
    use dc_types::{MethodDesc, TypeBuilder, TypeDesc, array_of, instantiate, known};

    use super::{resolve, xml_type_info};
    use crate::error::DefinitionReason;

    fn reason_of(ty: &dc_types::TypeRef) -> DefinitionReason {
        resolve(ty).unwrap_err().definition_reason().unwrap().clone()
    }

    #[test]
    fn generic_names_list_their_arguments() {
        let k = known();
        let t = TypeDesc::generic_param("T", 0);
        let pair = TypeBuilder::class("Shop", "Pair").generic(&[&t]).build();

        let ints = instantiate(&pair, &[k.int32.clone()]).unwrap();
        assert_eq!(resolve(&ints).unwrap().name(), "PairOfint");
        assert_eq!(resolve(&pair).unwrap().name(), "PairOf{0}{#}");

        let order = TypeBuilder::class("Shop", "Order").build();
        let orders = instantiate(&pair, &[order]).unwrap();
        let name = resolve(&orders).unwrap();
        assert!(name.name().starts_with("PairOfOrder"));
        assert!(name.name().len() > "PairOfOrder".len());
    }

    #[test]
    fn explicit_names_and_nesting() {
        let outer = TypeBuilder::class("Shop", "Order").build();
        let line = TypeBuilder::class("Shop", "Line").nested_in(&outer).build();
        assert_eq!(resolve(&line).unwrap().name(), "Order.Line");

        let renamed = TypeBuilder::class("Shop", "Customer")
            .attribute(DataContractAttr {
                name: Some("Client".into()),
                namespace: Some("urn:crm".into()),
                ..Default::default()
            })
            .build();
        assert_eq!(resolve(&renamed).unwrap(), QualifiedName::new("Client", "urn:crm"));

        let empty = TypeBuilder::class("Shop", "Nameless")
            .attribute(DataContractAttr {
                name: Some(String::new()),
                ..Default::default()
            })
            .build();
        assert_eq!(reason_of(&empty), DefinitionReason::EmptyLocalName);
    }

    #[test]
    fn collections_are_named_after_items() {
        let k = known();
        let nested = instantiate(&k.list, &[array_of(&k.string, 1)]).unwrap();
        assert_eq!(
            resolve(&nested).unwrap(),
            QualifiedName::new("ArrayOfArrayOfstring", ARRAYS_NS)
        );

        let dict = instantiate(&k.dictionary, &[k.int32.clone(), k.string.clone()]).unwrap();
        assert_eq!(resolve(&dict).unwrap().name(), "ArrayOfKeyValueOfintstring");

        assert_eq!(
            reason_of(&array_of(&k.int32, 2)),
            DefinitionReason::ArrayRankUnsupported { rank: 2 }
        );
    }

    #[test]
    fn self_containing_collections_need_an_explicit_name() {
        let k = known();
        let node = TypeBuilder::class("Tree", "Node")
            .build_with(|this, m| m.base = Some(instantiate(&k.list, &[this.clone()]).unwrap()));
        assert_eq!(reason_of(&node), DefinitionReason::RecursiveCollectionType);

        let named = TypeBuilder::class("Tree", "Branch")
            .attribute(CollectionDataContractAttr {
                name: Some("Branches".into()),
                ..Default::default()
            })
            .build_with(|this, m| m.base = Some(instantiate(&k.list, &[this.clone()]).unwrap()));
        let name = resolve(&named).unwrap();
        assert_eq!(name.name(), "Branches");
        assert_eq!(name.namespace(), format!("{CONTRACT_NS_BASE}Tree"));
    }

    fn provider_type(name: &str, attr: XmlSchemaProviderAttr, method: Option<MethodDesc>) -> dc_types::TypeRef {
        let mut builder = TypeBuilder::class("Geo", name).attribute(attr);
        if let Some(method) = method {
            builder = builder.method(method);
        }
        builder.build()
    }

    fn provider(method: &str, is_any: bool) -> XmlSchemaProviderAttr {
        XmlSchemaProviderAttr {
            method_name: Some(method.into()),
            is_any,
        }
    }

    #[test]
    fn provider_names_and_fragments() {
        let k = known();
        fn by_name(_: &mut SchemaSet) -> Option<ProviderValue> {
            Some(ProviderValue::Name(QualifiedName::new("Pt", "urn:geo")))
        }
        fn by_type(set: &mut SchemaSet) -> Option<ProviderValue> {
            let ty = SchemaType::named("Area", "<complexType/>");
            set.add("urn:geo", ty.clone());
            Some(ProviderValue::Type(ty))
        }
        fn anonymous(_: &mut SchemaSet) -> Option<ProviderValue> {
            Some(ProviderValue::Type(SchemaType::anonymous("<complexType/>")))
        }
        fn nothing(_: &mut SchemaSet) -> Option<ProviderValue> {
            None
        }

        let named = provider_type(
            "Point",
            provider("Schema", false),
            Some(MethodDesc::provider("Schema", &k.qualified_name, by_name)),
        );
        assert_eq!(resolve(&named).unwrap(), QualifiedName::new("Pt", "urn:geo"));

        let typed = provider_type(
            "Region",
            provider("Schema", false),
            Some(MethodDesc::provider("Schema", &k.xml_schema_type, by_type)),
        );
        let info = xml_type_info(&typed).unwrap();
        assert_eq!(info.name, QualifiedName::new("Area", "urn:geo"));
        assert!(info.has_root);
        assert_eq!(info.schemas.len(), 1);

        let inline = provider_type(
            "Shape",
            provider("Schema", false),
            Some(MethodDesc::provider("Schema", &k.xml_schema_type, anonymous)),
        );
        let info = xml_type_info(&inline).unwrap();
        assert_eq!(info.name.name(), "Shape");
        assert!(info.schema_type.is_some());

        let rootless = provider_type(
            "Blob",
            provider("Schema", false),
            Some(MethodDesc::provider("Schema", &k.qualified_name, nothing)),
        );
        assert!(!xml_type_info(&rootless).unwrap().has_root);
    }

    #[test]
    fn provider_errors() {
        let k = known();
        fn lost(_: &mut SchemaSet) -> Option<ProviderValue> {
            Some(ProviderValue::Type(SchemaType::named("Lost", "<complexType/>")))
        }
        fn named(_: &mut SchemaSet) -> Option<ProviderValue> {
            Some(ProviderValue::Name(QualifiedName::new("Any", "urn:any")))
        }

        let missing = provider_type("A", provider("Schema", false), None);
        assert!(matches!(
            reason_of(&missing),
            DefinitionReason::MissingSchemaProviderMethod { .. }
        ));

        let wrong_return = provider_type(
            "B",
            provider("Schema", false),
            Some(MethodDesc::provider("Schema", &k.string, named)),
        );
        assert!(matches!(
            reason_of(&wrong_return),
            DefinitionReason::InvalidSchemaProviderReturn { .. }
        ));

        let no_method = provider_type("C", XmlSchemaProviderAttr::default(), None);
        assert_eq!(reason_of(&no_method), DefinitionReason::InvalidSchemaProvider);

        let any_non_null = provider_type(
            "D",
            provider("Schema", true),
            Some(MethodDesc::provider("Schema", &k.qualified_name, named)),
        );
        assert!(matches!(
            reason_of(&any_non_null),
            DefinitionReason::NonNullReturnForAnyProvider { .. }
        ));

        let unlisted = provider_type(
            "E",
            provider("Schema", false),
            Some(MethodDesc::provider("Schema", &k.xml_schema_type, lost)),
        );
        assert_eq!(
            reason_of(&unlisted),
            DefinitionReason::MissingSchemaType { name: "Lost".into() }
        );

        let any = provider_type(
            "F",
            XmlSchemaProviderAttr {
                method_name: None,
                is_any: true,
            },
            None,
        );
        let info = xml_type_info(&any).unwrap();
        assert!(!info.has_root);
        assert_eq!(info.name.name(), "F");
    }

    #[test]
    fn raw_xml_shapes_have_fixed_names() {
        let k = known();
        let element = xml_type_info(&k.xml_element).unwrap();
        assert_eq!(element.name.name(), "XmlElement");
        assert!(!element.has_root);
        assert_eq!(resolve(&k.xml_node_array).unwrap().name(), "ArrayOfXmlNode");
        assert_eq!(
            resolve(&k.xml_node_array).unwrap().namespace(),
            format!("{CONTRACT_NS_BASE}System.Xml")
        );
    }
}
