//! Structural type system.
//!
//! Every type answers three questions:
//!
//! - [`Type::at`]: which value sits under a member name;
//! - [`Type::generalizes`]: whether it is at least as general as another
//!   type (the subtyping relation);
//! - [`Type::categorizes`]: whether a value is an instance of it.
//!
//! Types are immutable once built. Mutable construction goes through the
//! builders in [`builders`], which are consumed by `build`.

mod builders;
mod builtin;

use std::fmt;
use std::sync::Arc;

use crate::pure::Pure;
use crate::value::Value;

pub use builders::{ClassBuilder, ContractBuilder, TupleBuilder};
pub use builtin::Builtin;

#[derive(Clone)]
pub struct Type(Arc<TypeKind>);

#[derive(Debug)]
pub enum TypeKind {
    Builtin(Builtin),
    /// Structural record of named member values.
    Contract(Contract),
    /// A contract with a nominal supertype link and implemented contracts.
    Class(Class),
    Tuple(Tuple),
    /// Callable shape with an arbitrary input type.
    Product(Signature),
    /// Callable shape whose input is always a tuple.
    Function(Signature),
    Union(Vec<Type>),
    Domain(Domain),
    /// Singleton type of one constant.
    Literal(Pure),
}

#[derive(Debug, Default)]
pub struct Contract {
    name: Option<String>,
    members: Vec<(String, Value)>,
}

impl Contract {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn members(&self) -> &[(String, Value)] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug)]
pub struct Class {
    contract: Contract,
    supertype: Option<Type>,
    implements: Vec<Type>,
}

impl Class {
    pub fn name(&self) -> Option<&str> {
        self.contract.name()
    }

    pub fn supertype(&self) -> Option<&Type> {
        self.supertype.as_ref()
    }

    pub fn implements(&self) -> &[Type] {
        &self.implements
    }

    /// Own member, else the nearest inherited one.
    pub fn member(&self, name: &str) -> Option<Value> {
        self.contract
            .member(name)
            .cloned()
            .or_else(|| self.supertype.as_ref().and_then(|sup| sup.at(name)))
    }

    /// Own members followed by inherited members they do not shadow.
    pub fn all_members(&self) -> Vec<(String, Value)> {
        let mut members = self.contract.members.clone();
        let mut ancestor = self.supertype.clone();
        while let Some(current) = ancestor {
            let next = match current.kind() {
                TypeKind::Class(class) => {
                    for (name, value) in class.contract.members() {
                        if !members.iter().any(|(existing, _)| existing == name) {
                            members.push((name.clone(), value.clone()));
                        }
                    }
                    class.supertype.clone()
                }
                TypeKind::Contract(contract) => {
                    for (name, value) in contract.members() {
                        if !members.iter().any(|(existing, _)| existing == name) {
                            members.push((name.clone(), value.clone()));
                        }
                    }
                    None
                }
                _ => None,
            };
            ancestor = next;
        }
        members
    }

    fn descends_from(&self, ancestor: &Type) -> bool {
        let mut current = self.supertype.clone();
        while let Some(candidate) = current {
            if candidate.same(ancestor) {
                return true;
            }
            current = match candidate.kind() {
                TypeKind::Class(class) => class.supertype.clone(),
                _ => None,
            };
        }
        false
    }
}

#[derive(Debug, Default)]
pub struct Tuple {
    name: Option<String>,
    members: Vec<(Option<String>, Type)>,
}

impl Tuple {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Type> {
        self.members.get(index).map(|(_, ty)| ty)
    }

    pub fn named(&self, name: &str) -> Option<&Type> {
        self.members
            .iter()
            .find(|(member, _)| member.as_deref() == Some(name))
            .map(|(_, ty)| ty)
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.members.iter().map(|(_, ty)| ty)
    }
}

#[derive(Debug)]
pub struct Signature {
    contract: Contract,
    input: Type,
    output: Type,
}

impl Signature {
    pub fn input(&self) -> &Type {
        &self.input
    }

    pub fn output(&self) -> &Type {
        &self.output
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }
}

/// Finite enumeration of constants, each with its own literal type.
#[derive(Debug)]
pub struct Domain {
    members: Vec<(Pure, Type)>,
}

impl Domain {
    pub fn values(&self) -> impl Iterator<Item = &Pure> {
        self.members.iter().map(|(value, _)| value)
    }

    pub fn contains(&self, value: &Pure) -> bool {
        self.members.iter().any(|(member, _)| member == value)
    }

    /// Literal type of the member keyed by `name`.
    pub fn instance(&self, name: &str) -> Option<&Type> {
        self.members
            .iter()
            .find(|(value, _)| value.key() == name)
            .map(|(_, ty)| ty)
    }
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn builtin(builtin: Builtin) -> Self {
        builtin::singleton(builtin)
    }

    pub fn any() -> Self {
        Self::builtin(Builtin::Any)
    }

    /// The type of types.
    pub fn of_types() -> Self {
        Self::builtin(Builtin::Type)
    }

    pub fn tuple(types: Vec<Type>) -> Self {
        types
            .into_iter()
            .fold(TupleBuilder::new(), TupleBuilder::push)
            .build()
    }

    pub fn signature(input: Type, output: Type) -> Self {
        Self::new(TypeKind::Product(Signature {
            contract: Contract::default(),
            input,
            output,
        }))
    }

    pub fn function(parameters: Vec<Type>, output: Type) -> Self {
        Self::new(TypeKind::Function(Signature {
            contract: Contract::default(),
            input: Self::tuple(parameters),
            output,
        }))
    }

    pub fn union(alternatives: Vec<Type>) -> Self {
        Self::new(TypeKind::Union(alternatives))
    }

    /// Duplicate constants collapse into one member.
    pub fn domain(values: impl IntoIterator<Item = Pure>) -> Self {
        let mut members: Vec<(Pure, Type)> = Vec::new();
        for value in values {
            if !members.iter().any(|(existing, _)| *existing == value) {
                let literal = Self::literal(value.clone());
                members.push((value, literal));
            }
        }
        Self::new(TypeKind::Domain(Domain { members }))
    }

    pub fn literal(value: Pure) -> Self {
        Self::new(TypeKind::Literal(value))
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// Identity, not structure.
    pub fn same(&self, other: &Type) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_builtin(&self) -> Option<Builtin> {
        match self.kind() {
            TypeKind::Builtin(builtin) => Some(*builtin),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self.kind() {
            TypeKind::Product(signature) | TypeKind::Function(signature) => Some(signature),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self.kind() {
            TypeKind::Tuple(tuple) => Some(tuple),
            _ => None,
        }
    }

    pub fn as_domain(&self) -> Option<&Domain> {
        match self.kind() {
            TypeKind::Domain(domain) => Some(domain),
            _ => None,
        }
    }

    /// Literal type of a domain member.
    pub fn instance(&self, name: &str) -> Option<&Type> {
        self.as_domain().and_then(|domain| domain.instance(name))
    }

    /// The value under `name` when this type is read as a contract.
    pub fn at(&self, name: &str) -> Option<Value> {
        match self.kind() {
            TypeKind::Contract(contract) => contract.member(name).cloned(),
            TypeKind::Class(class) => class.member(name),
            TypeKind::Tuple(tuple) => tuple
                .named(name)
                .or_else(|| name.parse::<usize>().ok().and_then(|i| tuple.get(i)))
                .cloned()
                .map(Value::slot),
            TypeKind::Product(signature) | TypeKind::Function(signature) => {
                signature.contract.member(name).cloned()
            }
            TypeKind::Domain(domain) => domain
                .members
                .iter()
                .find(|(value, _)| value.key() == name)
                .map(|(value, ty)| Value::literal(Some(ty.clone()), value.clone())),
            TypeKind::Builtin(_) | TypeKind::Union(_) | TypeKind::Literal(_) => None,
        }
    }

    /// Positional member of a tuple.
    pub fn at_index(&self, index: usize) -> Option<Value> {
        self.as_tuple()
            .and_then(|tuple| tuple.get(index))
            .cloned()
            .map(Value::slot)
    }

    pub fn generalizes(&self, other: &Type) -> bool {
        if self.same(other) {
            return true;
        }
        if let TypeKind::Union(alternatives) = other.kind() {
            return alternatives
                .iter()
                .all(|alternative| self.generalizes(alternative));
        }

        match self.kind() {
            TypeKind::Builtin(builtin) => builtin.generalizes(other),
            TypeKind::Contract(contract) => {
                if let TypeKind::Class(class) = other.kind() {
                    if class.implements.iter().any(|implemented| implemented.same(self)) {
                        return true;
                    }
                }
                is_record(other) && members_generalize(contract.members(), other)
            }
            TypeKind::Class(class) => match other.kind() {
                TypeKind::Class(candidate) => {
                    candidate.descends_from(self)
                        || members_generalize(&class.all_members(), other)
                }
                _ => false,
            },
            TypeKind::Tuple(tuple) => match other.kind() {
                TypeKind::Tuple(candidate) => {
                    tuple.len() <= candidate.len()
                        && tuple
                            .types()
                            .zip(candidate.types())
                            .all(|(mine, theirs)| mine.generalizes(theirs))
                }
                _ => false,
            },
            // Parameters are contravariant, results covariant.
            TypeKind::Product(signature) | TypeKind::Function(signature) => {
                match other.as_signature() {
                    Some(candidate) => {
                        members_generalize(signature.contract.members(), other)
                            && candidate.input.generalizes(&signature.input)
                            && signature.output.generalizes(&candidate.output)
                    }
                    None => false,
                }
            }
            TypeKind::Union(alternatives) => alternatives
                .iter()
                .any(|alternative| alternative.generalizes(other)),
            TypeKind::Domain(domain) => match other.kind() {
                TypeKind::Literal(value) => domain.contains(value),
                TypeKind::Domain(candidate) => candidate.values().all(|value| domain.contains(value)),
                _ => false,
            },
            TypeKind::Literal(value) => {
                matches!(other.kind(), TypeKind::Literal(candidate) if candidate == value)
            }
        }
    }

    /// Instance check. A typed value is judged by its type alone; an untyped
    /// one by its constant content. Untyped dynamic values only fit `any`.
    pub fn categorizes(&self, value: &Value) -> bool {
        match (value.ty(), value.pure()) {
            (Some(ty), _) => self.generalizes(&ty),
            (None, Some(pure)) => self.categorizes_pure(&pure),
            (None, None) => self.as_builtin() == Some(Builtin::Any),
        }
    }

    pub fn categorizes_pure(&self, pure: &Pure) -> bool {
        match self.kind() {
            TypeKind::Builtin(builtin) => builtin.categorizes_pure(pure),
            TypeKind::Contract(contract) => members_categorize(contract.members(), pure),
            TypeKind::Class(class) => members_categorize(&class.all_members(), pure),
            TypeKind::Tuple(tuple) => match pure {
                Pure::Array(items) => {
                    items.len() >= tuple.len()
                        && tuple
                            .types()
                            .zip(items)
                            .all(|(ty, item)| ty.categorizes_pure(item))
                }
                _ => false,
            },
            TypeKind::Product(_) | TypeKind::Function(_) => false,
            TypeKind::Union(alternatives) => alternatives
                .iter()
                .any(|alternative| alternative.categorizes_pure(pure)),
            TypeKind::Domain(domain) => domain.contains(pure),
            TypeKind::Literal(value) => value == pure,
        }
    }

    pub fn describe(&self) -> String {
        match self.kind() {
            TypeKind::Builtin(builtin) => builtin.name().to_string(),
            TypeKind::Contract(contract) => contract
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| describe_members(contract.members())),
            TypeKind::Class(class) => class
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("class {}", describe_members(&class.all_members()))),
            TypeKind::Tuple(tuple) => tuple.name().map(str::to_string).unwrap_or_else(|| {
                let parts = tuple
                    .members
                    .iter()
                    .map(|(name, ty)| match name {
                        Some(name) => format!("{name}: {}", ty.describe()),
                        None => ty.describe(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({parts})")
            }),
            TypeKind::Product(signature) | TypeKind::Function(signature) => format!(
                "{}^{}",
                signature.input.describe(),
                signature.output.describe()
            ),
            TypeKind::Union(alternatives) => alternatives
                .iter()
                .map(Type::describe)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::Domain(domain) => {
                let values = domain
                    .values()
                    .map(Pure::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({values})")
            }
            TypeKind::Literal(value) => value.to_string(),
        }
    }
}

fn is_record(ty: &Type) -> bool {
    matches!(
        ty.kind(),
        TypeKind::Contract(_)
            | TypeKind::Class(_)
            | TypeKind::Tuple(_)
            | TypeKind::Product(_)
            | TypeKind::Function(_)
    )
}

/// Every member must exist in `other` with a type the member's type
/// generalizes. Untyped members only require presence; an untyped candidate
/// only satisfies an untyped or `any` member.
fn members_generalize(members: &[(String, Value)], other: &Type) -> bool {
    members.iter().all(|(name, member)| match other.at(name) {
        Some(candidate) => match (member.ty(), candidate.ty()) {
            (None, _) => true,
            (Some(expected), Some(actual)) => expected.generalizes(&actual),
            (Some(expected), None) => expected.as_builtin() == Some(Builtin::Any),
        },
        None => false,
    })
}

fn members_categorize(members: &[(String, Value)], pure: &Pure) -> bool {
    if !matches!(pure, Pure::Object(_)) {
        return false;
    }
    members.iter().all(|(name, member)| match pure.field(name) {
        Some(field) => member
            .ty()
            .map_or(true, |expected| expected.categorizes_pure(field)),
        None => false,
    })
}

fn describe_members(members: &[(String, Value)]) -> String {
    let parts = members
        .iter()
        .map(|(name, value)| match value.ty() {
            Some(ty) => format!("{name}: {}", ty.describe()),
            None => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{parts}}}")
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if self.same(other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (TypeKind::Builtin(a), TypeKind::Builtin(b)) => a == b,
            (TypeKind::Literal(a), TypeKind::Literal(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.describe())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
