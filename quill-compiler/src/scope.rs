use std::sync::Arc;

use crate::error::CompileError;
use crate::pure::Pure;
use crate::types::{Builtin, Type};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    /// Reserved bindings cannot be redefined by any scope below them.
    pub reserved: bool,
}

/// Frozen name table. Build one with [`ScopeBuilder`].
#[derive(Debug)]
pub struct Scope {
    bindings: Vec<(String, Binding)>,
    parent: Option<Arc<Scope>>,
    root: bool,
}

impl Scope {
    /// Host root with every builtin type name reserved.
    pub fn builtins() -> Arc<Scope> {
        let mut builder = ScopeBuilder::root();
        for builtin in Builtin::ALL {
            let ty = Type::builtin(builtin);
            let value = Value::literal(Some(Type::of_types()), Pure::Type(ty));
            builder.reserve(builtin.name(), value);
        }
        builder.close()
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    fn local(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, binding)| binding)
    }

    /// Nearest binding of `name` along the parent chain.
    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(binding) = scope.local(name) {
                return Some(binding);
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Resolves `name`. A miss that reaches a root becomes an error value;
    /// a miss that runs out of parents without meeting a root is fatal.
    pub fn at(&self, name: &str) -> Result<Value, CompileError> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(binding) = scope.local(name) {
                return Ok(binding.value.clone());
            }
            if scope.root {
                return Ok(Value::error(
                    format!("{name} is not defined"),
                    Value::undefined(),
                ));
            }
            current = scope.parent.as_deref();
        }
        Err(CompileError::DetachedScope {
            name: name.to_string(),
        })
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|binding| binding.reserved)
    }

    /// Type bound under `name`, if that binding holds a type.
    pub fn get_type(&self, name: &str) -> Result<Option<Type>, CompileError> {
        let value = self.at(name)?;
        if value.is_error() {
            return Ok(None);
        }
        Ok(value.as_type())
    }

    /// Wraps a constant in a literal typed by the scope's binding of its
    /// builtin tag. A binding that rejects the constant is passed over for
    /// the builtin itself.
    pub fn create_pure(&self, pure: Pure) -> Result<Value, CompileError> {
        let tag = pure.tag();
        let ty = self
            .get_type(tag.name())?
            .filter(|ty| ty.categorizes_pure(&pure))
            .unwrap_or_else(|| Type::builtin(tag));
        Ok(Value::literal(Some(ty), pure))
    }
}

/// Mutable staging area for a [`Scope`].
#[derive(Debug)]
pub struct ScopeBuilder {
    bindings: Vec<(String, Binding)>,
    parent: Option<Arc<Scope>>,
    root: bool,
}

impl ScopeBuilder {
    /// A host scope: lookups that miss here produce error values.
    pub fn root() -> Self {
        Self {
            bindings: Vec::new(),
            parent: None,
            root: true,
        }
    }

    pub fn child(parent: Arc<Scope>) -> Self {
        Self {
            bindings: Vec::new(),
            parent: Some(parent),
            root: false,
        }
    }

    /// A nested scope with no parent.
    pub fn detached() -> Self {
        Self {
            bindings: Vec::new(),
            parent: None,
            root: false,
        }
    }

    /// Binds `name`, returning the stored value. Redefining a reserved name
    /// leaves the binding untouched and returns an error value instead.
    pub fn put(&mut self, name: impl Into<String>, value: Value) -> Value {
        let name = name.into();
        if self.is_reserved(&name) {
            return Value::error(format!("cannot redefine reserved name '{name}'"), value);
        }
        self.bind(name, value.clone(), false);
        value
    }

    pub fn reserve(&mut self, name: impl Into<String>, value: Value) {
        self.bind(name.into(), value, true);
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        let local = self
            .bindings
            .iter()
            .any(|(bound, binding)| bound == name && binding.reserved);
        local
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_reserved(name))
    }

    fn bind(&mut self, name: String, value: Value, reserved: bool) {
        let binding = Binding { value, reserved };
        match self.bindings.iter_mut().find(|(bound, _)| *bound == name) {
            Some((_, slot)) => *slot = binding,
            None => self.bindings.push((name, binding)),
        }
    }

    pub fn close(self) -> Arc<Scope> {
        Arc::new(Scope {
            bindings: self.bindings,
            parent: self.parent,
            root: self.root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_binding_shadows_parent() {
        let mut root = ScopeBuilder::root();
        root.put("x", Value::literal(None, Pure::Number(1.0)));
        let mut child = ScopeBuilder::child(root.close());
        child.put("x", Value::literal(None, Pure::Number(2.0)));
        let scope = child.close();

        let value = scope.at("x").expect("attached scope");
        assert_eq!(value.pure(), Some(Pure::Number(2.0)));
        assert_eq!(
            scope.parent().and_then(|p| p.at("x").ok()).and_then(|v| v.pure()),
            Some(Pure::Number(1.0))
        );
    }

    #[test]
    fn builtins_bind_types() {
        let scope = Scope::builtins();
        let number = scope.get_type("number").expect("root scope");
        assert_eq!(number, Some(Type::builtin(Builtin::Number)));
        assert!(scope.is_reserved("type"));
        assert!(!scope.is_reserved("x"));
    }
}
