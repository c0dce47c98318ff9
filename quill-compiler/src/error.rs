use thiserror::Error;

/// Defects that stop compilation outright. Everything recoverable is a
/// [`Notice`](crate::value::Notice) in the value graph instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("lookup of '{name}' fell off a scope chain with no root")]
    DetachedScope { name: String },
}
