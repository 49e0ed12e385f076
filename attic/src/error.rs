use thiserror::Error;

/// Errors raised by the attic capability surface.
///
/// Reading an unset variable and redeclaring an existing name are not
/// errors; they are a `None` and a no-op respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtticError {
    /// The value's type cannot carry per-instance attic state. Recoverable:
    /// the miss is cached, so later probes on the same type short-circuit.
    #[error("`{type_name}` has no attic: the type cannot carry per-instance hidden state")]
    NoSingleton { type_name: &'static str },

    /// Attic was used on a type before it was installed. A usage-contract
    /// violation at declaration time, not a runtime condition.
    #[error("attic is not installed for `{type_name}`; did you mean to call `Registry::install` first?")]
    WrongMixinUsage { type_name: &'static str },
}
