use super::{Class, Contract, Tuple, Type, TypeKind};
use crate::value::Value;

/// Mutable staging area for a contract. `build` freezes it into a [`Type`].
#[derive(Debug, Default)]
pub struct ContractBuilder {
    name: Option<String>,
    members: Vec<(String, Value)>,
}

impl ContractBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Replaces an existing member in place, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.members.iter_mut().find(|(member, _)| *member == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.members.push((name, value));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn build(self) -> Type {
        Type::new(TypeKind::Contract(self.finish()))
    }

    fn finish(self) -> Contract {
        Contract {
            name: self.name,
            members: self.members,
        }
    }
}

#[derive(Debug, Default)]
pub struct ClassBuilder {
    contract: ContractBuilder,
    supertype: Option<Type>,
    implements: Vec<Type>,
}

impl ClassBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            contract: ContractBuilder::named(name),
            ..Self::default()
        }
    }

    pub fn extends(mut self, supertype: Type) -> Self {
        self.supertype = Some(supertype);
        self
    }

    pub fn implements(mut self, contract: Type) -> Self {
        self.implements.push(contract);
        self
    }

    pub fn member(mut self, name: impl Into<String>, value: Value) -> Self {
        self.contract.insert(name, value);
        self
    }

    pub fn build(self) -> Type {
        Type::new(TypeKind::Class(Class {
            contract: self.contract.finish(),
            supertype: self.supertype,
            implements: self.implements,
        }))
    }
}

#[derive(Debug, Default)]
pub struct TupleBuilder {
    name: Option<String>,
    members: Vec<(Option<String>, Type)>,
}

impl TupleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            members: Vec::new(),
        }
    }

    pub fn push(mut self, ty: Type) -> Self {
        self.members.push((None, ty));
        self
    }

    /// Positional member that can also be reached by `name`.
    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.members.push((Some(name.into()), ty));
        self
    }

    pub fn build(self) -> Type {
        Type::new(TypeKind::Tuple(Tuple {
            name: self.name,
            members: self.members,
        }))
    }
}
