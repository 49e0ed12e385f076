use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::name::VarName;
use crate::object::AtticObject;
use crate::store::VarValue;

type GetterFn =
    dyn for<'a> Fn(&'a dyn AtticObject) -> Option<&'a (dyn Any + Send)> + Send + Sync;
type SetterFn = dyn Fn(&mut dyn AtticObject, VarValue) -> Option<VarValue> + Send + Sync;

/// A get/set pair for one attic variable, dispatchable over any
/// [`AtticObject`].
///
/// Generated accessors delegate straight to the instance store; custom ones
/// wrap caller-supplied behavior. Handles are `Arc`-shared, so registry
/// lookups hand out cheap clones.
#[derive(Clone)]
pub struct Accessor {
    name: VarName,
    getter: Arc<GetterFn>,
    setter: Arc<SetterFn>,
}

impl Accessor {
    /// The generated accessor for `name`: a plain store read and write.
    pub fn for_var(name: VarName) -> Self {
        let get_name = name.clone();
        let set_name = name.clone();
        Self {
            name,
            getter: Arc::new(move |obj: &dyn AtticObject| obj.attic().get(&get_name)),
            setter: Arc::new(move |obj: &mut dyn AtticObject, value: VarValue| {
                obj.attic_mut().set(set_name.clone(), value)
            }),
        }
    }

    /// A custom accessor with caller-supplied read and write behavior.
    pub fn with_fns(
        name: VarName,
        getter: impl for<'a> Fn(&'a dyn AtticObject) -> Option<&'a (dyn Any + Send)>
        + Send
        + Sync
        + 'static,
        setter: impl Fn(&mut dyn AtticObject, VarValue) -> Option<VarValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            getter: Arc::new(getter),
            setter: Arc::new(setter),
        }
    }

    pub fn name(&self) -> &VarName {
        &self.name
    }

    pub fn get<'a>(&self, obj: &'a dyn AtticObject) -> Option<&'a (dyn Any + Send)> {
        (self.getter)(obj)
    }

    pub fn get_as<'a, V: Any>(&self, obj: &'a dyn AtticObject) -> Option<&'a V> {
        self.get(obj)?.downcast_ref()
    }

    /// Returns the previous value, if any.
    pub fn set(&self, obj: &mut dyn AtticObject, value: VarValue) -> Option<VarValue> {
        (self.setter)(obj, value)
    }

    pub fn set_value<V: Any + Send>(&self, obj: &mut dyn AtticObject, value: V) -> Option<VarValue> {
        self.set(obj, Box::new(value))
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
