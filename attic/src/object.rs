use std::any::Any;

use crate::error::AtticError;
use crate::name::{self, VarName};
use crate::registry::global;
use crate::store::{Attic, VarValue};

/// An object that carries an attic.
///
/// Types opt in by embedding an [`Attic`] as a regular (private) field and
/// exposing it here, usually via [`attic_object!`](crate::attic_object).
/// The store is part of the value itself; no runtime type machinery is
/// involved.
pub trait AtticObject: Any {
    /// The instance's hidden store.
    fn attic(&self) -> &Attic;

    fn attic_mut(&mut self) -> &mut Attic;

    /// Names of the type's regular, visible fields. Feeds the introspection
    /// listings; the default is an opaque type with no visible fields.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Read an attic variable directly, bypassing any accessor.
    fn attic_variable_get<V: Any>(&self, name: &str) -> Option<&V>
    where
        Self: Sized,
    {
        self.attic().get_as(&VarName::new(name))
    }

    /// Write an attic variable through the [`global`] registry, bypassing
    /// any accessor. The name is auto-registered for the type; no accessor
    /// is generated for it.
    fn attic_variable_set<V: Any + Send>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<(), AtticError>
    where
        Self: Sized,
    {
        global()
            .set(self, name, Box::new(value) as VarValue)
            .map(|_| ())
    }
}

/// All attributes of `obj`: native fields first, then the attic storage
/// keys in their prefixed form. The diagnostic, unfiltered listing.
pub fn all_variables(obj: &dyn AtticObject) -> Vec<String> {
    let mut out = obj.field_names();
    out.extend(obj.attic().storage_keys());
    out
}

/// The visible attributes of `obj`: everything in [`all_variables`] that
/// does not follow the attic key convention. A native field named like a
/// storage key is filtered too; the convention is what is matched, not the
/// origin.
pub fn visible_variables(obj: &dyn AtticObject) -> Vec<String> {
    let mut out = all_variables(obj);
    out.retain(|key| !name::is_shadow_key(key));
    out
}

/// Implement [`AtticObject`] for a struct with an embedded [`Attic`] field.
///
/// ```
/// use attic::{Attic, AtticObject, attic_object};
///
/// struct Worker {
///     name: String,
///     attic: Attic,
/// }
///
/// attic_object!(Worker { attic }, fields ["name"]);
///
/// let w = Worker { name: "kiln".into(), attic: Attic::new() };
/// assert_eq!(w.field_names(), ["name"]);
/// ```
#[macro_export]
macro_rules! attic_object {
    ($ty:ty { $attic:ident }) => {
        $crate::attic_object!($ty { $attic }, fields []);
    };
    ($ty:ty { $attic:ident }, fields [$($field:literal),* $(,)?]) => {
        impl $crate::AtticObject for $ty {
            fn attic(&self) -> &$crate::Attic {
                &self.$attic
            }

            fn attic_mut(&mut self) -> &mut $crate::Attic {
                &mut self.$attic
            }

            fn field_names(&self) -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![$(::std::string::String::from($field)),*]
            }
        }
    };
}
