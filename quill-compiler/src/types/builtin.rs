use std::fmt;
use std::sync::OnceLock;

use super::{Type, TypeKind};
use crate::pure::Pure;

/// Names every host root scope binds before compilation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Any,
    Void,
    Unknown,
    String,
    Number,
    Boolean,
    Object,
    Array,
    Function,
    Type,
}

impl Builtin {
    pub const ALL: [Builtin; 10] = [
        Builtin::Any,
        Builtin::Void,
        Builtin::Unknown,
        Builtin::String,
        Builtin::Number,
        Builtin::Boolean,
        Builtin::Object,
        Builtin::Array,
        Builtin::Function,
        Builtin::Type,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Any => "any",
            Builtin::Void => "void",
            Builtin::Unknown => "unknown",
            Builtin::String => "string",
            Builtin::Number => "number",
            Builtin::Boolean => "boolean",
            Builtin::Object => "object",
            Builtin::Array => "array",
            Builtin::Function => "function",
            Builtin::Type => "type",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|&builtin| builtin == self)
            .unwrap_or_default()
    }

    pub(super) fn generalizes(self, other: &Type) -> bool {
        match (self, other.kind()) {
            (Builtin::Any, _) => true,
            (_, TypeKind::Builtin(other)) => self == *other,
            (Builtin::Void, TypeKind::Literal(Pure::Null)) => true,
            (Builtin::Number | Builtin::String | Builtin::Boolean, TypeKind::Literal(value)) => {
                value.tag() == self
            }
            (Builtin::Number | Builtin::String | Builtin::Boolean, TypeKind::Domain(domain)) => {
                domain.values().all(|value| value.tag() == self)
            }
            (Builtin::Object, TypeKind::Contract(_) | TypeKind::Class(_)) => true,
            (Builtin::Array, TypeKind::Tuple(_)) => true,
            (Builtin::Function, TypeKind::Product(_) | TypeKind::Function(_)) => true,
            _ => false,
        }
    }

    pub(super) fn categorizes_pure(self, pure: &Pure) -> bool {
        match self {
            Builtin::Any => true,
            Builtin::Unknown | Builtin::Function => false,
            tag => pure.tag() == tag,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static SINGLETONS: OnceLock<Vec<Type>> = OnceLock::new();

/// Process-wide builtin types, created on first use and never mutated.
pub(super) fn singleton(builtin: Builtin) -> Type {
    let singletons = SINGLETONS.get_or_init(|| {
        Builtin::ALL
            .into_iter()
            .map(|builtin| Type::new(TypeKind::Builtin(builtin)))
            .collect()
    });
    singletons[builtin.position()].clone()
}
