//! Binding of open generic contracts to argument contracts.

use alloc::sync::Arc;

use dc_types::TypeRef;
use dc_types::xml::QualifiedName;
use dc_utils::hash::{HashMap, HashSet};

use crate::cache::ContractCache;
use crate::contract::{ContractId, ContractKind, ContractLink, ContractRef, DataContract};
use crate::error::{ContractError, DefinitionReason};
use crate::names::{self, TemplateArg};

type BindKey = (ContractId, Vec<ContractId>);

/// Bound contracts, owned by the cache that requested them.
///
/// Slots are registered before their children are bound, so a cyclic
/// contract graph finds its own slot and links back to it weakly.
#[derive(Default)]
pub(crate) struct BoundContracts {
    slots: HashMap<BindKey, ContractRef>,
    in_progress: HashSet<BindKey>,
}

impl BoundContracts {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Substitutes `args` for the generic parameters of `contract`.
pub(crate) fn bind(
    contract: &ContractRef,
    args: &[ContractRef],
    bound: &mut BoundContracts,
    cache: &ContractCache,
) -> Result<ContractRef, ContractError> {
    let mut binder = Binder {
        arg_types: args.iter().map(|a| a.ty().clone()).collect(),
        template_args: args
            .iter()
            .map(|a| TemplateArg::new(a.name().clone(), a.ty().contains_generic_parameters()))
            .collect(),
        args,
        bound,
        cache,
        inserted: Vec::new(),
        naming: Vec::new(),
    };
    match binder.link(contract) {
        Ok(link) => link.resolve(contract.ty()),
        Err(err) => {
            // Nothing half-bound stays behind.
            for key in &binder.inserted {
                binder.bound.slots.remove(key);
                binder.bound.in_progress.remove(key);
            }
            Err(err)
        }
    }
}

struct Binder<'a> {
    args: &'a [ContractRef],
    arg_types: Vec<TypeRef>,
    template_args: Vec<TemplateArg>,
    bound: &'a mut BoundContracts,
    cache: &'a ContractCache,
    inserted: Vec<BindKey>,
    // Contracts whose bound name is being computed.
    naming: Vec<ContractId>,
}

impl Binder<'_> {
    fn argument(&self, position: usize) -> Result<&ContractRef, ContractError> {
        self.args.get(position).ok_or_else(|| ContractError::Definition {
            type_name: format!("{{{position}}}"),
            reason: DefinitionReason::ArgumentCountMismatch {
                expected: position + 1,
                found: self.args.len(),
            },
        })
    }

    fn is_open(contract: &DataContract) -> bool {
        matches!(contract.kind(), ContractKind::Collection(_) | ContractKind::Class(_))
            && contract.ty().contains_generic_parameters()
    }

    fn link(&mut self, contract: &ContractRef) -> Result<ContractLink, ContractError> {
        if let Some(position) = contract.generic_position() {
            return Ok(ContractLink::Strong(self.argument(position)?.clone()));
        }
        if !Self::is_open(contract) {
            return Ok(ContractLink::Strong(contract.clone()));
        }

        let key: BindKey = (contract.id(), self.args.iter().map(|a| a.id()).collect());
        if let Some(existing) = self.bound.slots.get(&key) {
            if self.bound.in_progress.contains(&key) {
                return Ok(ContractLink::Back(Arc::downgrade(existing)));
            }
            return Ok(ContractLink::Strong(existing.clone()));
        }

        let ty = dc_types::substitute(contract.ty(), &self.arg_types);
        let name = self.bound_name(contract)?;
        let kind = match contract.kind() {
            ContractKind::Collection(collection) => {
                let item_name = if collection.is_item_name_explicit() {
                    collection.item_name().to_owned()
                } else {
                    let item = collection.item_contract(self.cache)?;
                    self.bound_name(&item)?.name().to_owned()
                };
                ContractKind::Collection(collection.rebind(&self.arg_types, item_name))
            }
            ContractKind::Class(class) => ContractKind::Class(class.rebind(&self.arg_types)),
            _ => return Ok(ContractLink::Strong(contract.clone())),
        };
        let shell = Arc::new(DataContract::new(ty, name, kind, contract.is_reference()));

        self.bound.slots.insert(key.clone(), shell.clone());
        self.bound.in_progress.insert(key.clone());
        self.inserted.push(key.clone());
        let children = self.link_children(contract, &shell);
        self.bound.in_progress.remove(&key);
        children?;

        log::trace!("bound {contract} as {}", shell.name());
        Ok(ContractLink::Strong(shell))
    }

    fn link_children(&mut self, open: &DataContract, shell: &DataContract) -> Result<(), ContractError> {
        match (open.kind(), shell.kind()) {
            (ContractKind::Collection(open), ContractKind::Collection(bound)) => {
                let item = open.item_contract(self.cache)?;
                bound.link_item(self.link(&item)?);
            }
            (ContractKind::Class(open), ContractKind::Class(bound)) => {
                for (member, target) in open.members().iter().zip(bound.members()) {
                    let contract = member.contract(self.cache)?;
                    target.set_link(self.link(&contract)?);
                }
            }
            _ => {}
        }
        Ok(())
    }

    // The name a contract takes once bound, without binding it.
    fn bound_name(&mut self, contract: &DataContract) -> Result<QualifiedName, ContractError> {
        if let Some(position) = contract.generic_position() {
            return Ok(self.argument(position)?.name().clone());
        }
        if !Self::is_open(contract) {
            return Ok(contract.name().clone());
        }
        if self.naming.contains(&contract.id()) {
            let reason = DefinitionReason::RecursiveCollectionType;
            return Err(ContractError::definition(contract.ty(), reason));
        }

        let local = names::expand_template(contract.name().name(), &self.template_args);
        let namespace = match contract.as_collection() {
            Some(collection) if !collection.is_explicit() => {
                self.naming.push(contract.id());
                let item = collection
                    .item_contract(self.cache)
                    .and_then(|item| self.bound_name(&item));
                self.naming.pop();
                names::collection_ns(item?.namespace()).to_owned()
            }
            _ => contract.name().namespace().to_owned(),
        };
        Ok(QualifiedName::new(local, namespace))
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use dc_types::attrs::CollectionDataContractAttr;
    use dc_types::{CtorDesc, Members, TypeBuilder, TypeDesc, instantiate, known};

    use crate::ContractCache;
    use crate::contract::{Category, ContractLink};
    use crate::error::{ContractError, DefinitionReason};

    #[test]
    fn closed_contracts_are_returned_unchanged() {
        let k = known();
        let cache = ContractCache::new();
        let ints = cache.get_or_build(&instantiate(&k.list, &[k.int32.clone()]).unwrap()).unwrap();
        let same = cache.bind_generic(&ints, &[k.string.clone()]).unwrap();
        assert!(Arc::ptr_eq(&ints, &same));
    }

    #[test]
    fn dictionaries_bind_their_entries() {
        let k = known();
        let cache = ContractCache::new();
        let (kp, vp) = (TypeDesc::generic_param("K", 0), TypeDesc::generic_param("V", 1));
        let open = instantiate(&k.dictionary, &[kp, vp]).unwrap();
        let open = cache.get_or_build(&open).unwrap();

        let bound = cache.bind_generic(&open, &[k.int32.clone(), k.string.clone()]).unwrap();
        let closed = cache
            .get_or_build(&instantiate(&k.dictionary, &[k.int32.clone(), k.string.clone()]).unwrap())
            .unwrap();
        assert_eq!(bound.name(), closed.name());
        assert_eq!(bound.ty().key(), closed.ty().key());

        let dict = bound.as_collection().unwrap();
        assert_eq!(dict.item_name(), "KeyValueOfintstring");
        let entry = dict.item_contract(&cache).unwrap();
        assert_eq!(entry.category(), Category::Class);
        let members = entry.as_class().unwrap().members();
        let key = members[0].contract(&cache).unwrap();
        let value = members[1].contract(&cache).unwrap();
        assert_eq!(key.ty().key(), k.int32.key());
        assert_eq!(value.ty().key(), k.string.key());
        assert!(bound.equivalent(&closed));
    }

    #[test]
    fn missing_arguments_fail_without_leftovers() {
        let k = known();
        let cache = ContractCache::new();
        let (kp, vp) = (TypeDesc::generic_param("K", 0), TypeDesc::generic_param("V", 1));
        let open = cache.get_or_build(&instantiate(&k.dictionary, &[kp, vp]).unwrap()).unwrap();

        let err = cache.bind_generic(&open, &[k.int32.clone()]).unwrap_err();
        assert!(matches!(
            err,
            ContractError::Definition {
                reason: DefinitionReason::ArgumentCountMismatch { expected: 2, found: 1 },
                ..
            }
        ));
        assert_eq!(cache.stats().bound, 0);
    }

    #[test]
    fn self_referential_bindings_link_back() {
        let k = known();
        let cache = ContractCache::new();
        let t = TypeDesc::generic_param("T", 0);
        let node = TypeBuilder::class("Tree", "Node")
            .generic(&[&t])
            .attribute(CollectionDataContractAttr {
                name: Some("NodeOf{0}".into()),
                ..Default::default()
            })
            .declare();
        let members = Members {
            base: Some(instantiate(&k.list, &[node.clone()]).unwrap()),
            constructors: vec![CtorDesc::default_ctor()],
            ..Members::default()
        };
        node.define(members).unwrap();

        let open = cache.get_or_build(&node).unwrap();
        let bound = cache.bind_generic(&open, &[k.int32.clone()]).unwrap();
        assert_eq!(bound.name().name(), "NodeOfint");

        let nodes = bound.as_collection().unwrap();
        assert_eq!(nodes.item_name(), "NodeOfint");
        assert!(matches!(nodes.item_link(), Some(ContractLink::Back(_))));
        let item = nodes.item_contract(&cache).unwrap();
        assert!(Arc::ptr_eq(&item, &bound));

        // The bound graph survives its cache while held.
        drop(cache);
        let cache = ContractCache::new();
        assert!(Arc::ptr_eq(&nodes.item_contract(&cache).unwrap(), &bound));
    }
}
