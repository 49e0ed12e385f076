use std::any::Any;
use std::fmt;
use std::mem;

use crate::name::VarName;

/// A boxed attic value.
pub type VarValue = Box<dyn Any + Send>;

/// The hidden per-instance store.
///
/// Variables live in an inline list in first-write order and are looked up
/// by a linear scan; an attic holds a handful of variables, not hundreds.
/// A fresh store allocates nothing until the first write.
#[derive(Default)]
pub struct Attic {
    vars: Vec<(VarName, VarValue)>,
}

impl Attic {
    #[must_use]
    pub const fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// The raw stored value, `None` when unset.
    pub fn get(&self, name: &VarName) -> Option<&(dyn Any + Send)> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_ref())
    }

    /// Downcasting read.
    pub fn get_as<V: Any>(&self, name: &VarName) -> Option<&V> {
        self.get(name)?.downcast_ref()
    }

    pub fn get_mut_as<V: Any>(&mut self, name: &VarName) -> Option<&mut V> {
        self.vars
            .iter_mut()
            .find(|(n, _)| *n == *name)?
            .1
            .downcast_mut()
    }

    /// Write a variable. Returns the previous value, if any; the slot keeps
    /// its first-write position.
    pub fn set(&mut self, name: VarName, value: VarValue) -> Option<VarValue> {
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(mem::replace(slot, value)),
            None => {
                self.vars.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &VarName) -> Option<VarValue> {
        let index = self.vars.iter().position(|(n, _)| n == name)?;
        Some(self.vars.remove(index).1)
    }

    pub fn contains(&self, name: &VarName) -> bool {
        self.vars.iter().any(|(n, _)| n == name)
    }

    /// Names with a stored value, in first-write order.
    pub fn names(&self) -> impl Iterator<Item = &VarName> {
        self.vars.iter().map(|(n, _)| n)
    }

    /// The prefixed storage keys, as they appear in the unfiltered
    /// introspection listing.
    pub fn storage_keys(&self) -> Vec<String> {
        self.vars.iter().map(|(n, _)| n.storage_key()).collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for Attic {
    // Values are type-erased; show the names only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attic")
            .field("vars", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
