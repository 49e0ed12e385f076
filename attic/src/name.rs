use std::fmt;

/// Prefix for per-instance storage keys.
pub const INSTANCE_PREFIX: &str = "___attic_";
/// Prefix for per-type storage keys.
pub const TYPE_PREFIX: &str = "__attic_";

/// A normalized attic variable name.
///
/// A trailing accessor suffix (`?`, `!` or `=`) is replaced with `_` before
/// the name is used as a storage key, so `size?` and `size_` address the
/// same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarName(Box<str>);

impl VarName {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw).into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which an instance stores this variable.
    pub fn storage_key(&self) -> String {
        format!("{INSTANCE_PREFIX}{}", self.0)
    }

    /// Key under which a type stores this variable.
    pub fn type_storage_key(&self) -> String {
        format!("{TYPE_PREFIX}{}", self.0)
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for VarName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn normalize(raw: &str) -> String {
    match raw.strip_suffix(['?', '!', '=']) {
        Some(stem) => format!("{stem}_"),
        None => raw.to_owned(),
    }
}

/// Whether `key` follows the attic storage-key convention (two or three
/// leading underscores before `attic`).
pub fn is_shadow_key(key: &str) -> bool {
    key.starts_with(TYPE_PREFIX) || key.starts_with(INSTANCE_PREFIX)
}
