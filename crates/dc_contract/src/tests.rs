use alloc::sync::Arc;
use std::sync::Barrier;
use std::thread;

use dc_types::attrs::{Attribute, CollectionDataContractAttr, DataContractAttr};
use dc_types::registry::TypeRegistry;
use dc_types::xml::QualifiedName;
use dc_types::{CtorDesc, FieldDesc, Members, TypeBuilder, TypeDesc, TypeRef, Visibility, instantiate, known};

use crate::capability::CollectionKind;
use crate::contract::{Category, Mutability};
use crate::{CacheConfig, ContractCache, ContractError, DefinitionReason, VisibilityIssue};

fn list_of(item: &TypeRef) -> TypeRef {
    instantiate(&known().list, core::slice::from_ref(item)).unwrap()
}

#[test]
fn builds_are_idempotent() {
    let k = known();
    let cache = ContractCache::new();
    let order = TypeBuilder::class("Shop", "Order")
        .field(FieldDesc::new("Id", &k.int32))
        .build();

    let first = cache.get_or_build(&order).unwrap();
    let second = cache.get_or_build(&order).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &cache.get_if_present(&order).unwrap()));

    let stats = cache.stats();
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.contracts, 1);
}

#[test]
fn concurrent_requests_share_one_build() {
    const THREADS: usize = 8;
    let k = known();
    let cache = ContractCache::new();
    let entries = instantiate(&k.dictionary, &[k.guid.clone(), k.string.clone()]).unwrap();
    let barrier = Barrier::new(THREADS);

    let contracts: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.get_or_build(&entries).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(contracts.iter().all(|c| Arc::ptr_eq(c, &contracts[0])));
    assert_eq!(cache.stats().builds, 1);
}

#[test]
fn failed_builds_are_not_cached() {
    let k = known();
    let cache = ContractCache::new();
    let fine = TypeBuilder::enumeration("App", "Fine", &k.int32).variant("A", 0).build();
    assert!(cache.get_or_build(&fine).is_ok());

    let bad = TypeBuilder::class("App", "Bad")
        .attribute(CollectionDataContractAttr::default())
        .build();
    for _ in 0..2 {
        let err = cache.get_or_build(&bad).unwrap_err();
        assert!(err.is_definition());
    }
    assert!(cache.get_if_present(&bad).is_none());
    assert_eq!(cache.stats().builds, 3);
    assert_eq!(cache.stats().contracts, 1);
}

#[test]
fn dictionary_tier_beats_enumerable() {
    let k = known();
    let cache = ContractCache::new();
    let pairs = instantiate(&k.key_value_pair, &[k.string.clone(), k.int32.clone()]).unwrap();
    let seq = instantiate(&k.ienumerable_t, &[pairs]).unwrap();
    let map = instantiate(&k.idictionary_kv, &[k.string.clone(), k.int32.clone()]).unwrap();
    let lookup = TypeBuilder::class("App", "Lookup")
        .base(&k.object)
        .implements(&seq)
        .implements(&map)
        .default_constructor()
        .build();

    let contract = cache.get_or_build(&lookup).unwrap();
    let collection = contract.as_collection().unwrap();
    assert_eq!(collection.kind(), CollectionKind::GenericDictionary);
    assert!(collection.key_value_names().is_some());
}

#[test]
fn list_of_strings() {
    let k = known();
    let cache = ContractCache::new();
    let contract = cache.get_or_build(&list_of(&k.string)).unwrap();

    assert_eq!(contract.category(), Category::Collection);
    let list = contract.as_collection().unwrap();
    assert_eq!(list.kind(), CollectionKind::GenericList);
    assert_eq!(list.item_name(), "string");
    assert!(list.key_value_names().is_none());
    assert!(matches!(
        list.mutability(),
        Mutability::Mutable { add: Some(_), constructor: Some(_) }
    ));
    assert!(contract.ensure_deserializable().is_ok());

    let item = list.item_contract(&cache).unwrap();
    assert_eq!(item.category(), Category::Primitive);
    assert_eq!(item.name().name(), list.item_name());
    assert_eq!(contract.child_element_namespace(&cache).unwrap(), None);
}

#[test]
fn dictionary_of_int_to_string() {
    let k = known();
    let cache = ContractCache::new();
    let dict = instantiate(&k.dictionary, &[k.int32.clone(), k.string.clone()]).unwrap();
    let contract = cache.get_or_build(&dict).unwrap();

    let collection = contract.as_collection().unwrap();
    assert_eq!(collection.kind(), CollectionKind::GenericDictionary);
    let names = collection.key_value_names().unwrap();
    assert_eq!((names.key.as_str(), names.value.as_str()), ("Key", "Value"));

    let entry = collection.item_contract(&cache).unwrap();
    assert_eq!(entry.category(), Category::Class);
    let members = entry.as_class().unwrap().members();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].name(), "Key");
    assert_eq!(members[0].member_type().key(), k.int32.key());
    assert_eq!(members[1].name(), "Value");
    assert_eq!(members[1].member_type().key(), k.string.key());
}

#[test]
fn renamed_dictionary_entries() {
    let k = known();
    let cache = ContractCache::new();
    let base = instantiate(&k.dictionary, &[k.string.clone(), k.string.clone()]).unwrap();
    let settings = TypeBuilder::class("Cfg", "Settings")
        .base(&base)
        .default_constructor()
        .attribute(CollectionDataContractAttr {
            name: Some("Settings".into()),
            item_name: Some("Setting".into()),
            key_name: Some("Name".into()),
            value_name: Some("Text".into()),
            ..Default::default()
        })
        .build();

    let contract = cache.get_or_build(&settings).unwrap();
    assert_eq!(contract.name().name(), "Settings");
    let collection = contract.as_collection().unwrap();
    assert_eq!(collection.item_name(), "Setting");

    let entry = collection.item_contract(&cache).unwrap();
    let names: Vec<_> = entry.as_class().unwrap().members().iter().map(|m| m.name()).collect();
    assert_eq!(names, ["Name", "Text"]);

    // The shared entry contract keeps its own names.
    let shared = cache.get_or_build(collection.item_type()).unwrap();
    let names: Vec<_> = shared.as_class().unwrap().members().iter().map(|m| m.name()).collect();
    assert_eq!(names, ["Key", "Value"]);
}

#[test]
fn color_enum() {
    let k = known();
    let cache = ContractCache::new();
    let color = TypeBuilder::enumeration("Paint", "Color", &k.int32)
        .variant("Red", 0)
        .variant("Green", 1)
        .variant("Blue", 2)
        .build();

    let contract = cache.get_or_build(&color).unwrap();
    let colors = contract.as_enum().unwrap();
    let members: Vec<_> = colors.members().iter().map(|m| (m.name.as_str(), m.value)).collect();
    assert_eq!(members, [("Red", 0), ("Green", 1), ("Blue", 2)]);
    assert!(!colors.is_flags());
    assert_eq!(contract.name().name(), "Color");
}

#[test]
fn read_only_collections_serialize_but_do_not_deserialize() {
    let k = known();
    let cache = ContractCache::new();
    let ints = instantiate(&k.ienumerable_t, &[k.int32.clone()]).unwrap();
    let view = TypeBuilder::class("App", "View")
        .base(&k.object)
        .implements(&ints)
        .constructor(CtorDesc {
            params: vec![k.int32.clone()],
            visibility: Visibility::Public,
        })
        .build();

    let contract = cache.get_or_build(&view).unwrap();
    let reason = contract.as_collection().unwrap().read_only_reason();
    assert!(reason.is_some_and(|r| !r.is_empty()));
    assert!(contract.ensure_serializable().is_ok());
    assert!(matches!(
        contract.ensure_deserializable(),
        Err(ContractError::ReadOnlyCollection { .. })
    ));

    let lenient = ContractCache::with_config(CacheConfig::new().constructor_required(false));
    let contract = lenient.get_or_build(&view).unwrap();
    // Still read-only: there is no Add(int).
    assert!(contract.ensure_deserializable().is_err());
}

#[test]
fn duplicate_enum_wire_names() {
    use dc_types::attrs::{Attributes, EnumMemberAttr};

    let k = known();
    let cache = ContractCache::new();
    let active = || Attributes::new().with(EnumMemberAttr { value: Some("Active".into()) });
    let state = TypeBuilder::enumeration("App", "State", &k.int32)
        .variant_with("On", 0, active())
        .variant_with("Enabled", 1, active())
        .attribute(DataContractAttr::default())
        .build();
    let err = cache.get_or_build(&state).unwrap_err();
    assert_eq!(
        err.definition_reason(),
        Some(&DefinitionReason::DuplicateMemberName { name: "Active".into() })
    );

    let alias = TypeBuilder::enumeration("App", "Alias", &k.int32)
        .variant("On", 1)
        .variant("Enabled", 1)
        .build();
    assert!(cache.get_or_build(&alias).is_ok());
}

#[test]
fn nested_generic_binding() {
    let k = known();
    let cache = ContractCache::new();

    // class Box<T> : List<T>
    let t = TypeDesc::generic_param("T", 0);
    let boxed = TypeBuilder::class("Store", "Box")
        .generic(&[&t])
        .default_constructor()
        .build_with(|_, members| members.base = Some(list_of(&t)));

    let u = TypeDesc::generic_param("U", 0);
    let inner = instantiate(&boxed, &[u]).unwrap();
    let outer = instantiate(&boxed, &[inner]).unwrap();
    let open = cache.get_or_build(&outer).unwrap();
    assert_eq!(open.name().name(), "ArrayOfArrayOf{0}");

    let bound = cache.bind_generic(&open, &[k.int32.clone()]).unwrap();
    assert_eq!(bound.name().name(), "ArrayOfArrayOfint");
    let closed = instantiate(&boxed, &[instantiate(&boxed, &[k.int32.clone()]).unwrap()]).unwrap();
    assert_eq!(bound.ty().key(), closed.key());
    assert_eq!(bound.name(), cache.get_or_build(&closed).unwrap().name());

    let middle = bound.as_collection().unwrap().item_contract(&cache).unwrap();
    assert_eq!(middle.name().name(), "ArrayOfint");
    let leaf = middle.as_collection().unwrap().item_contract(&cache).unwrap();
    assert!(Arc::ptr_eq(&leaf, &cache.get_or_build(&k.int32).unwrap()));
    assert_eq!(cache.stats().bound, 2);
}

#[test]
fn self_referential_collections() {
    let cache = ContractCache::new();

    // [CollectionDataContract(Name = "Branches")] class Node : List<Node>
    let node = TypeBuilder::class("Tree", "Node")
        .attribute(CollectionDataContractAttr {
            name: Some("Branches".into()),
            ..Default::default()
        })
        .declare();
    let members = Members {
        base: Some(list_of(&node)),
        constructors: vec![CtorDesc::default_ctor()],
        ..Members::default()
    };
    node.define(members).unwrap();

    let contract = cache.get_or_build(&node).unwrap();
    let nodes = contract.as_collection().unwrap();
    assert_eq!(nodes.item_name(), "Branches");
    assert!(Arc::ptr_eq(&nodes.item_contract(&cache).unwrap(), &contract));
    assert!(contract.equivalent(&contract));
}

#[test]
fn item_namespaces() {
    let cache = ContractCache::new();
    let line = TypeBuilder::class("Shop", "Line")
        .attribute(DataContractAttr {
            namespace: Some("urn:shop".into()),
            ..Default::default()
        })
        .build();
    let lines = TypeBuilder::class("Shop", "Lines")
        .base(&list_of(&line))
        .default_constructor()
        .attribute(CollectionDataContractAttr {
            namespace: Some("urn:orders".into()),
            ..Default::default()
        })
        .build();

    let contract = cache.get_or_build(&lines).unwrap();
    assert_eq!(contract.name(), &QualifiedName::new("ArrayOfLine", "urn:orders"));
    assert_eq!(contract.child_element_namespace(&cache).unwrap(), Some("urn:shop"));

    let plain = cache.get_or_build(&list_of(&line)).unwrap();
    assert_eq!(plain.name().namespace(), "urn:shop");
    assert_eq!(plain.child_element_namespace(&cache).unwrap(), None);
}

#[test]
fn lookup_by_name() {
    let k = known();
    let cache = ContractCache::new();
    let order = TypeBuilder::class("Shop", "Order").build();
    let name = QualifiedName::new("Order", "http://schemas.datacontract.org/2004/07/Shop");
    assert!(cache.get_by_name(&name).is_none());

    let contract = cache.get_or_build(&order).unwrap();
    assert!(Arc::ptr_eq(&cache.get_by_name(&name).unwrap(), &contract));

    let int = cache.get_by_name(&QualifiedName::new("int", dc_types::xml::SCHEMA_NS)).unwrap();
    assert_eq!(int.ty().key(), k.int32.key());
}

#[test]
fn registered_types_build_by_path() {
    let k = known();
    let cache = ContractCache::new();
    let mut registry = TypeRegistry::empty();
    let invoice = TypeBuilder::class("Billing", "Invoice")
        .field(FieldDesc::new("Lines", &list_of(&k.string)))
        .build();
    assert!(registry.register(&invoice));
    assert!(!registry.register(&invoice));

    let ty = registry.get_with_type_path("Billing.Invoice").unwrap();
    let contract = cache.get_or_build(ty).unwrap();
    assert_eq!(contract.name().name(), "Invoice");
    let lines = &contract.as_class().unwrap().members()[0];
    assert_eq!(lines.contract(&cache).unwrap().name().name(), "ArrayOfstring");
}

#[test]
fn known_contracts_follow_the_hierarchy() {
    let cache = ContractCache::new();
    let circle = TypeBuilder::class("Geo", "Circle").build();
    let square = TypeBuilder::class("Geo", "Square").build();
    let shape = TypeBuilder::class("Geo", "Shape")
        .attribute(Attribute::KnownType(circle.clone()))
        .build();
    let canvas = TypeBuilder::class("Geo", "Canvas")
        .base(&shape)
        .attribute(Attribute::KnownType(square.clone()))
        .attribute(Attribute::KnownType(circle.clone()))
        .build();

    let contract = cache.get_or_build(&canvas).unwrap();
    let known: Vec<_> = contract
        .known_contracts(&cache)
        .unwrap()
        .iter()
        .map(|c| c.name().name())
        .collect();
    assert_eq!(known, ["Square", "Circle"]);
}

#[test]
fn member_access_validation() {
    let k = known();
    let strict = ContractCache::with_config(CacheConfig::new().validate_member_access(true));

    let hidden = TypeBuilder::class("App", "Hidden").internal().build();
    let err = strict.get_or_build(&hidden).unwrap_err();
    assert_eq!(
        err,
        ContractError::Visibility {
            type_name: "App.Hidden".into(),
            issue: VisibilityIssue::TypeNotPublic,
        }
    );

    let secret = TypeBuilder::class("App", "Secret")
        .attribute(DataContractAttr::default())
        .field(
            FieldDesc::new("key", &k.string)
                .visibility(Visibility::Private)
                .with(dc_types::attrs::DataMemberAttr::default()),
        )
        .build();
    let err = strict.get_or_build(&secret).unwrap_err();
    assert!(matches!(
        err,
        ContractError::Visibility {
            issue: VisibilityIssue::MemberNotPublic { .. },
            ..
        }
    ));
    assert!(ContractCache::new().get_or_build(&secret).is_ok());
}
