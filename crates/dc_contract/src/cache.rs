use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};

use dc_types::xml::{QualifiedName, SchemaSet};
use dc_types::{TypeKey, TypeRef};
use dc_utils::KeyMap;
use dc_utils::hash::HashMap;

use crate::binder::{self, BoundContracts};
use crate::classify::classify;
use crate::config::CacheConfig;
use crate::contract::{self, Category, CollectionBuild, ContractKind, ContractRef, DataContract};
use crate::error::{ContractError, DefinitionReason};
use crate::{names, primitive, resolver};

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// -----------------------------------------------------------------------------
// BuildSlot

/// A build in progress. Waiters block until the owner releases it.
struct BuildSlot {
    owner: ThreadId,
    done: Mutex<bool>,
    signal: Condvar,
}

impl BuildSlot {
    fn new() -> Self {
        Self {
            owner: thread::current().id(),
            done: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut done = lock(&self.done);
        while !*done {
            done = self.signal.wait(done).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self) {
        *lock(&self.done) = true;
        self.signal.notify_all();
    }
}

/// Releases a claimed slot, whatever the build outcome.
struct SlotGuard<'a> {
    building: &'a Mutex<KeyMap<TypeKey, Arc<BuildSlot>>>,
    key: TypeKey,
    slot: Arc<BuildSlot>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        lock(self.building).remove(&self.key);
        self.slot.release();
    }
}

enum Claim {
    Ready(ContractRef),
    Owned(Arc<BuildSlot>),
    Wait(Arc<BuildSlot>),
}

// -----------------------------------------------------------------------------
// ContractCache

/// Counters of a [`ContractCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Builds started, failed ones included.
    pub builds: u64,
    /// Requests answered from the cache.
    pub hits: u64,
    /// Published contracts.
    pub contracts: usize,
    /// Contracts produced by [`ContractCache::bind_generic`].
    pub bound: usize,
}

/// The process-lifetime store of derived contracts.
///
/// Contracts are built on first request and kept until the cache is
/// dropped. Concurrent requests for the same type share one build: the
/// first caller builds, the others wait and receive the same instance.
/// Failed builds are not cached, the next request builds again.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use dc_contract::ContractCache;
/// use dc_contract::contract::Category;
/// use dc_types::{instantiate, known};
///
/// let k = known();
/// let cache = ContractCache::new();
/// let strings = instantiate(&k.list, &[k.string.clone()]).unwrap();
///
/// let first = cache.get_or_build(&strings).unwrap();
/// let again = cache.get_or_build(&strings).unwrap();
/// assert!(Arc::ptr_eq(&first, &again));
/// assert_eq!(first.category(), Category::Collection);
///
/// let by_name = cache.get_by_name(first.name()).unwrap();
/// assert!(Arc::ptr_eq(&first, &by_name));
/// ```
pub struct ContractCache {
    config: CacheConfig,
    ready: RwLock<KeyMap<TypeKey, ContractRef>>,
    building: Mutex<KeyMap<TypeKey, Arc<BuildSlot>>>,
    by_name: RwLock<HashMap<QualifiedName, TypeRef>>,
    bound: Mutex<BoundContracts>,
    schemas: Mutex<SchemaSet>,
    builds: AtomicU64,
    hits: AtomicU64,
}

impl ContractCache {
    /// Creates an empty cache with the default configuration.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::DEFAULT)
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            ready: RwLock::new(KeyMap::new()),
            building: Mutex::new(KeyMap::new()),
            by_name: RwLock::new(HashMap::default()),
            bound: Mutex::new(BoundContracts::default()),
            schemas: Mutex::new(SchemaSet::new()),
            builds: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the contract of `ty`, building it on first request.
    ///
    /// `Nullable<T>` shares the contract of `T`. A request made while the
    /// same thread is building `ty` fails with
    /// [`DefinitionReason::RecursiveDerivation`].
    pub fn get_or_build(&self, ty: &TypeRef) -> Result<ContractRef, ContractError> {
        let contract = self.get_or_build_unchecked(ty)?;
        if self.config.validate_member_access {
            contract::check_member_access(&contract)?;
        }
        Ok(contract)
    }

    fn get_or_build_unchecked(&self, ty: &TypeRef) -> Result<ContractRef, ContractError> {
        let ty = names::unwrap_nullable(ty);
        if let Some(contract) = primitive::lookup(ty) {
            return Ok(contract);
        }
        if let Some(contract) = read(&self.ready).get(&ty.key()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(contract.clone());
        }

        let key = ty.key();
        loop {
            let claim = {
                let mut building = lock(&self.building);
                // Publication happens before the slot is removed.
                if let Some(contract) = read(&self.ready).get(&key) {
                    Claim::Ready(contract.clone())
                } else if let Some(slot) = building.get(&key) {
                    if slot.owner == thread::current().id() {
                        let reason = DefinitionReason::RecursiveDerivation;
                        return Err(ContractError::definition(ty, reason));
                    }
                    Claim::Wait(slot.clone())
                } else {
                    let slot = Arc::new(BuildSlot::new());
                    building.insert(key, slot.clone());
                    Claim::Owned(slot)
                }
            };

            match claim {
                Claim::Ready(contract) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(contract);
                }
                Claim::Wait(slot) => slot.wait(),
                Claim::Owned(slot) => {
                    let _guard = SlotGuard {
                        building: &self.building,
                        key,
                        slot,
                    };
                    self.builds.fetch_add(1, Ordering::Relaxed);
                    let contract = Arc::new(self.build(ty)?);
                    self.publish(&contract);
                    log::trace!("built {contract}");
                    return Ok(contract);
                }
            }
        }
    }

    fn build(&self, ty: &TypeRef) -> Result<DataContract, ContractError> {
        let contract = match classify(ty)? {
            Category::Enum => contract::build_enum(ty)?,
            Category::Collection => {
                match contract::build_collection(ty, self.config.constructor_required)? {
                    CollectionBuild::Built(contract) => contract,
                    CollectionBuild::NotCollection if resolver::is_self_describing_xml(ty) => {
                        self.build_xml(ty)?
                    }
                    CollectionBuild::NotCollection => contract::build_class(ty)?,
                }
            }
            Category::XmlSpecial => self.build_xml(ty)?,
            Category::GenericParameter => {
                let position = ty.generic_position().unwrap_or_default();
                let name = resolver::resolve(ty)?;
                let kind = ContractKind::GenericParameter { position };
                DataContract::new(ty.clone(), name, kind, false)
            }
            // Primitives are answered by the table before a build starts.
            Category::Class | Category::Primitive => contract::build_class(ty)?,
        };
        Ok(contract)
    }

    fn build_xml(&self, ty: &TypeRef) -> Result<DataContract, ContractError> {
        let (contract, schemas) = contract::build_xml(ty)?;
        lock(&self.schemas).merge(&schemas);
        Ok(contract)
    }

    fn publish(&self, contract: &ContractRef) {
        write(&self.ready).insert(contract.ty().key(), contract.clone());
        write(&self.by_name)
            .entry(contract.name().clone())
            .or_insert_with(|| contract.ty().clone());
    }

    /// Returns the contract of `ty` if it was already built.
    pub fn get_if_present(&self, ty: &TypeRef) -> Option<ContractRef> {
        let ty = names::unwrap_nullable(ty);
        primitive::lookup(ty).or_else(|| read(&self.ready).get(&ty.key()).cloned())
    }

    /// Returns the contract published under `name`.
    ///
    /// When several types share a name, the first one built wins.
    pub fn get_by_name(&self, name: &QualifiedName) -> Option<ContractRef> {
        if let Some(contract) = primitive::lookup_by_name(name.name(), name.namespace()) {
            return Some(contract);
        }
        let ty = read(&self.by_name).get(name).cloned()?;
        self.get_if_present(&ty)
    }

    /// Binds the generic parameters of an open contract to `type_args`.
    ///
    /// Results are kept per (contract, arguments) by this cache. Closed
    /// contracts are returned as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use dc_contract::ContractCache;
    /// use dc_types::{TypeDesc, instantiate, known};
    ///
    /// let k = known();
    /// let cache = ContractCache::new();
    /// let t = TypeDesc::generic_param("T", 0);
    /// let open = cache.get_or_build(&instantiate(&k.list, &[t]).unwrap()).unwrap();
    ///
    /// let ints = cache.bind_generic(&open, &[k.int32.clone()]).unwrap();
    /// assert_eq!(ints.name().name(), "ArrayOfint");
    /// let item = ints.as_collection().unwrap().item_contract(&cache).unwrap();
    /// assert_eq!(item.ty().key(), k.int32.key());
    /// ```
    pub fn bind_generic(&self, contract: &ContractRef, type_args: &[TypeRef]) -> Result<ContractRef, ContractError> {
        let args = type_args
            .iter()
            .map(|ty| self.get_or_build(ty))
            .collect::<Result<Vec<_>, _>>()?;
        binder::bind(contract, &args, &mut lock(&self.bound), self)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            builds: self.builds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            contracts: read(&self.ready).len(),
            bound: lock(&self.bound).len(),
        }
    }

    /// A snapshot of the schemas added by schema providers so far.
    pub fn schemas(&self) -> SchemaSet {
        lock(&self.schemas).clone()
    }
}

impl Default for ContractCache {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ContractCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContractCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
