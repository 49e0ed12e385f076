use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use log::{debug, trace, warn};
use parking_lot::RwLock;

use crate::accessor::Accessor;
use crate::error::AtticError;
use crate::name::VarName;
use crate::object::AtticObject;
use crate::store::VarValue;

/// A shared, per-type attic value.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// Per-type registry record: declared names, the accessor table, and the
/// type-level store.
struct TypeEntry {
    type_name: &'static str,
    vars: Vec<VarName>,
    accessors: Vec<(VarName, Accessor)>,
    type_vars: Vec<(VarName, SharedValue)>,
}

impl TypeEntry {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            vars: Vec::new(),
            accessors: Vec::new(),
            type_vars: Vec::new(),
        }
    }

    fn is_declared(&self, name: &VarName) -> bool {
        self.vars.contains(name)
    }

    /// Append `name` unless already declared. Returns whether it was new.
    fn declare(&mut self, name: VarName) -> bool {
        if self.is_declared(&name) {
            return false;
        }
        self.vars.push(name);
        true
    }

    fn accessor(&self, name: &VarName) -> Option<&Accessor> {
        self.accessors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// First writer wins: an accessor already registered under the same
    /// name is kept and the new one dropped, with a warning.
    fn add_accessor(&mut self, accessor: Accessor) -> bool {
        let name = accessor.name().clone();
        if self.accessor(&name).is_some() {
            warn!(
                "skipping accessor `{}` on `{}`: one is already defined",
                name, self.type_name
            );
            return false;
        }
        self.accessors.push((name, accessor));
        true
    }
}

struct RegistryImpl {
    types: HashMap<TypeId, TypeEntry>,
    no_singleton: HashSet<TypeId>,
    construct_all: bool,
}

impl RegistryImpl {
    fn new() -> Self {
        Self {
            types: HashMap::new(),
            no_singleton: HashSet::new(),
            construct_all: false,
        }
    }

    /// Install-or-fetch. Installing evicts a stale no-singleton mark so a
    /// late opt-in is not shadowed by an old failed probe.
    fn entry_mut(&mut self, id: TypeId, type_name: &'static str) -> &mut TypeEntry {
        self.no_singleton.remove(&id);
        self.types
            .entry(id)
            .or_insert_with(|| TypeEntry::new(type_name))
    }

    /// The mutating entry point for declared-name and accessor changes:
    /// the type must be installed, unless construct-all mode admits
    /// everyone.
    fn require_mut(
        &mut self,
        id: TypeId,
        type_name: &'static str,
    ) -> Result<&mut TypeEntry, AtticError> {
        if self.types.contains_key(&id) || self.construct_all {
            Ok(self.entry_mut(id, type_name))
        } else {
            Err(AtticError::WrongMixinUsage { type_name })
        }
    }
}

/// The capability registry: which types carry attics, the variable names
/// each has declared, the accessor table for those names, and the cache of
/// types known to be attic-incapable.
///
/// Most callers use [`global()`]; tests and embedders can hold their own.
/// One lock guards the whole registry; contention here is a few writes at
/// startup.
pub struct Registry(RwLock<RegistryImpl>);

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self(RwLock::new(RegistryImpl::new()))
    }

    /// Opt `T` in. Returns `false` when `T` was already installed, which
    /// is a no-op, not an error.
    pub fn install<T: AtticObject>(&self) -> bool {
        let mut inner = self.0.write();
        let id = TypeId::of::<T>();
        if inner.types.contains_key(&id) {
            return false;
        }
        inner.entry_mut(id, type_name::<T>());
        trace!("installed attic for `{}`", type_name::<T>());
        true
    }

    pub fn is_installed<T: AtticObject>(&self) -> bool {
        self.0.read().types.contains_key(&TypeId::of::<T>())
    }

    /// Declare attic variables on `T`, generating an accessor for each
    /// newly declared name. Redeclaring a name is a no-op. Returns the full
    /// declared list in declaration order.
    ///
    /// Fails with [`AtticError::WrongMixinUsage`] when `T` was never
    /// [`install`](Self::install)ed (unless [`construct_all`](Self::construct_all)
    /// mode is on, which admits unknown types).
    pub fn declare<T: AtticObject>(&self, names: &[&str]) -> Result<Vec<VarName>, AtticError> {
        let mut inner = self.0.write();
        let entry = inner.require_mut(TypeId::of::<T>(), type_name::<T>())?;
        for raw in names {
            let name = VarName::new(raw);
            if entry.declare(name.clone()) {
                trace!("declared `{}` on `{}`", name, entry.type_name);
                entry.add_accessor(Accessor::for_var(name));
            }
        }
        Ok(entry.vars.clone())
    }

    /// The query form of [`declare`](Self::declare): the declared names for
    /// `T`, in declaration order. Empty when `T` is not installed.
    pub fn variables<T: AtticObject>(&self) -> Vec<VarName> {
        self.0
            .read()
            .types
            .get(&TypeId::of::<T>())
            .map(|e| e.vars.clone())
            .unwrap_or_default()
    }

    pub fn is_declared<T: AtticObject>(&self, name: &str) -> bool {
        let name = VarName::new(name);
        self.0
            .read()
            .types
            .get(&TypeId::of::<T>())
            .is_some_and(|e| e.is_declared(&name))
    }

    /// Copy `Base`'s declared names onto `Sub`, installing `Sub` if needed
    /// and regenerating accessors for the copied names.
    ///
    /// The copy is a snapshot taken now: names declared on `Base` later do
    /// not propagate. Names `Sub` already declared are kept.
    pub fn derive<Base: AtticObject, Sub: AtticObject>(
        &self,
    ) -> Result<Vec<VarName>, AtticError> {
        let mut inner = self.0.write();
        let base = inner
            .types
            .get(&TypeId::of::<Base>())
            .ok_or(AtticError::WrongMixinUsage {
                type_name: type_name::<Base>(),
            })?;
        let inherited = base.vars.clone();

        let entry = inner.entry_mut(TypeId::of::<Sub>(), type_name::<Sub>());
        for name in inherited {
            if entry.declare(name.clone()) {
                entry.add_accessor(Accessor::for_var(name));
            }
        }
        Ok(entry.vars.clone())
    }

    /// Admit every type: from here on, unknown types are auto-installed on
    /// their first declaration or write. A process-wide mutation with no
    /// undo, the `construct(Object)` affordance of old.
    pub fn construct_all(&self) {
        self.0.write().construct_all = true;
        debug!("attic construct-all enabled");
    }

    // ── Explicit access, bypassing accessors ───────────────────────

    /// Explicit write path. Auto-registers the normalized name on `T`
    /// (without generating an accessor), then writes the instance store.
    /// Returns the previous value, if any.
    pub fn set<T: AtticObject>(
        &self,
        obj: &mut T,
        name: &str,
        value: VarValue,
    ) -> Result<Option<VarValue>, AtticError> {
        let name = VarName::new(name);
        {
            let mut inner = self.0.write();
            let entry = inner.require_mut(TypeId::of::<T>(), type_name::<T>())?;
            entry.declare(name.clone());
        }
        Ok(obj.attic_mut().set(name, value))
    }

    /// Explicit read path: the raw stored value, `None` when unset.
    pub fn get<'a, T: AtticObject>(
        &self,
        obj: &'a T,
        name: &str,
    ) -> Option<&'a (dyn Any + Send)> {
        obj.attic().get(&VarName::new(name))
    }

    // ── Accessor table ─────────────────────────────────────────────

    /// Look up the accessor registered for `name` on `T`.
    pub fn accessor<T: AtticObject>(&self, name: &str) -> Option<Accessor> {
        let name = VarName::new(name);
        self.0
            .read()
            .types
            .get(&TypeId::of::<T>())?
            .accessor(&name)
            .cloned()
    }

    /// Register a custom accessor for `T`. First writer wins: returns
    /// `Ok(false)` (and warns) when the name already has one, so a custom
    /// accessor registered before [`declare`](Self::declare) survives it.
    pub fn define_accessor<T: AtticObject>(
        &self,
        accessor: Accessor,
    ) -> Result<bool, AtticError> {
        let mut inner = self.0.write();
        let entry = inner.require_mut(TypeId::of::<T>(), type_name::<T>())?;
        Ok(entry.add_accessor(accessor))
    }

    // ── Type-level variables ───────────────────────────────────────

    /// Write a per-type attic variable, shared by all instances of `T`.
    /// The name is auto-registered, as with instance writes.
    pub fn type_variable_set<T: AtticObject>(
        &self,
        name: &str,
        value: SharedValue,
    ) -> Result<(), AtticError> {
        let name = VarName::new(name);
        let mut inner = self.0.write();
        let entry = inner.require_mut(TypeId::of::<T>(), type_name::<T>())?;
        entry.declare(name.clone());
        match entry.type_vars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => entry.type_vars.push((name, value)),
        }
        Ok(())
    }

    /// Read a per-type attic variable.
    pub fn type_variable<T: AtticObject>(&self, name: &str) -> Option<SharedValue> {
        let name = VarName::new(name);
        self.0
            .read()
            .types
            .get(&TypeId::of::<T>())?
            .type_vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
    }

    // ── Eligibility ────────────────────────────────────────────────

    /// Whether `value` can carry per-instance attic state.
    ///
    /// Only installed types demonstrably embed a store; anything else is
    /// the immediate-value case. Failed probes are cached, so the second
    /// call short-circuits with the same outward result.
    pub fn supports_attic<V: Any>(&self, value: &V) -> bool {
        self.require_attic(value).is_ok()
    }

    /// The erroring form of [`supports_attic`](Self::supports_attic).
    pub fn require_attic<V: Any>(&self, _value: &V) -> Result<(), AtticError> {
        let id = TypeId::of::<V>();
        {
            let inner = self.0.read();
            if inner.no_singleton.contains(&id) {
                debug!("`{}` has no attic (cached)", type_name::<V>());
                return Err(AtticError::NoSingleton {
                    type_name: type_name::<V>(),
                });
            }
            if inner.types.contains_key(&id) {
                return Ok(());
            }
        }

        let mut inner = self.0.write();
        // Re-check: the type may have installed between the locks.
        if inner.types.contains_key(&id) {
            return Ok(());
        }
        inner.no_singleton.insert(id);
        debug!("`{}` has no attic; caching the miss", type_name::<V>());
        Err(AtticError::NoSingleton {
            type_name: type_name::<V>(),
        })
    }

    /// Whether `value`'s type sits in the no-singleton cache.
    pub fn marked_no_singleton<V: Any>(&self, _value: &V) -> bool {
        self.0.read().no_singleton.contains(&TypeId::of::<V>())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry.
pub fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::new)
}
