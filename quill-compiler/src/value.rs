//! Compiled value graph.
//!
//! A [`Value`] is either a graph node or a [`Notice`] wrapping another value.
//! Nodes are shared through `Arc` and never change after construction, so a
//! compiled graph can be handed across threads and inspected freely.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::ast::Span;
use crate::diagnostics::DiagnosticLevel;
use crate::pure::Pure;
use crate::stack::ensure_sufficient_stack;
use crate::types::{Type, TypeKind};

#[derive(Debug, Clone)]
pub enum Value {
    Ok(Arc<Node>),
    Diagnostic(Arc<Notice>),
}

#[derive(Debug)]
pub enum Node {
    /// Placeholder for a value that could not be produced.
    Undefined,
    Literal { ty: Option<Type>, pure: Pure },
    /// A value known only by its type, such as a tuple slot.
    Slot(Type),
    /// Name resolved against the scope or an enclosing declaration block.
    Lookup { name: String, target: Value },
    /// Member read through the receiver's type.
    Get {
        receiver: Value,
        name: String,
        member: Value,
    },
    Access {
        receiver: Value,
        index: Value,
        member: Option<Value>,
    },
    ExprList { items: Vec<Value>, ty: Type },
    Call {
        callable: Value,
        arguments: Value,
        output: Type,
    },
    Cast { target: Type, expr: Value },
    Modify { target: Value, expr: Value },
    /// Declaration block compiled into a contract of its members.
    Aggregate {
        contract: Type,
        members: Vec<(String, Value)>,
        rejected: Vec<Value>,
    },
}

impl Node {
    pub fn ty(&self) -> Option<Type> {
        match self {
            Node::Undefined => None,
            Node::Literal { ty, .. } => ty.clone(),
            Node::Slot(ty) => Some(ty.clone()),
            Node::Lookup { target, .. } => target.ty(),
            Node::Get { member, .. } => member.ty(),
            Node::Access { member, .. } => member.as_ref().and_then(Value::ty),
            Node::ExprList { ty, .. } => Some(ty.clone()),
            Node::Call { output, .. } => Some(output.clone()),
            Node::Cast { target, .. } => Some(target.clone()),
            Node::Modify { target, .. } => target.ty(),
            Node::Aggregate { contract, .. } => Some(contract.clone()),
        }
    }

    pub fn pure(&self) -> Option<Pure> {
        match self {
            Node::Undefined | Node::Slot(_) | Node::Call { .. } | Node::Modify { .. } => None,
            Node::Literal { pure, .. } => Some(pure.clone()),
            Node::Lookup { target, .. } => target.pure(),
            Node::Get { member, .. } => member.pure(),
            Node::Access {
                receiver,
                index,
                member,
            } => {
                let indexed = match (receiver.pure(), index.pure()) {
                    (Some(container), Some(Pure::Number(position)))
                        if position >= 0.0 && position.fract() == 0.0 =>
                    {
                        container.element(position as usize).cloned()
                    }
                    (Some(container), Some(Pure::String(key))) => container.field(&key).cloned(),
                    _ => None,
                };
                indexed.or_else(|| member.as_ref().and_then(Value::pure))
            }
            Node::ExprList { items, .. } => items
                .iter()
                .map(Value::pure)
                .collect::<Option<Vec<_>>>()
                .map(Pure::Array),
            Node::Cast { target, expr } => expr.pure().filter(|pure| target.categorizes_pure(pure)),
            Node::Aggregate { members, .. } => members
                .iter()
                .map(|(name, value)| value.pure().map(|pure| (name.clone(), pure)))
                .collect::<Option<Vec<_>>>()
                .map(Pure::Object),
        }
    }

    /// Whether a cast narrows its operand: the operand's type generalizes
    /// the target. An operand with no known type counts as `any`.
    pub fn is_downcast(&self) -> bool {
        match self {
            Node::Cast { target, expr } => expr
                .ty()
                .map_or(true, |original| original.generalizes(target)),
            _ => false,
        }
    }

    /// Child values, in evaluation order.
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Node::Undefined | Node::Literal { .. } | Node::Slot(_) => Vec::new(),
            Node::Lookup { target, .. } => vec![target],
            Node::Get {
                receiver, member, ..
            } => vec![receiver, member],
            Node::Access {
                receiver,
                index,
                member,
            } => {
                let mut operands = vec![receiver, index];
                operands.extend(member.as_ref());
                operands
            }
            Node::ExprList { items, .. } => items.iter().collect(),
            Node::Call {
                callable,
                arguments,
                ..
            } => vec![callable, arguments],
            Node::Cast { expr, .. } => vec![expr],
            Node::Modify { target, expr } => vec![target, expr],
            Node::Aggregate {
                members, rejected, ..
            } => members
                .iter()
                .map(|(_, value)| value)
                .chain(rejected.iter())
                .collect(),
        }
    }
}

impl Value {
    pub fn node(node: Node) -> Self {
        Value::Ok(Arc::new(node))
    }

    pub fn undefined() -> Self {
        Self::node(Node::Undefined)
    }

    pub fn literal(ty: Option<Type>, pure: Pure) -> Self {
        Self::node(Node::Literal { ty, pure })
    }

    pub fn slot(ty: Type) -> Self {
        Self::node(Node::Slot(ty))
    }

    /// Items that have no known type occupy an `any` slot in the list type.
    pub fn expr_list(items: Vec<Value>) -> Self {
        let ty = Type::tuple(
            items
                .iter()
                .map(|item| item.ty().unwrap_or_else(Type::any))
                .collect(),
        );
        Self::node(Node::ExprList { items, ty })
    }

    pub fn notice(level: DiagnosticLevel, message: impl Into<String>, value: Value) -> Self {
        Value::Diagnostic(Arc::new(Notice::new(level, message, value, None)))
    }

    pub fn error(message: impl Into<String>, value: Value) -> Self {
        Self::notice(DiagnosticLevel::Error, message, value)
    }

    pub fn warn(message: impl Into<String>, value: Value) -> Self {
        Self::notice(DiagnosticLevel::Warning, message, value)
    }

    pub(crate) fn syntax_error(message: impl Into<String>, span: Span) -> Self {
        Value::Diagnostic(Arc::new(Notice::new(
            DiagnosticLevel::Error,
            message,
            Self::undefined(),
            Some(span),
        )))
    }

    /// Type of the value; notices are transparent.
    pub fn ty(&self) -> Option<Type> {
        self.inner().ty()
    }

    pub fn pure(&self) -> Option<Pure> {
        self.inner().pure()
    }

    /// The node under any wrapping notices.
    pub fn inner(&self) -> &Node {
        let mut current = self;
        loop {
            match current {
                Value::Ok(node) => return node,
                Value::Diagnostic(notice) => current = &notice.value,
            }
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Ok(node) => Some(node),
            Value::Diagnostic(_) => None,
        }
    }

    pub fn as_notice(&self) -> Option<&Notice> {
        match self {
            Value::Ok(_) => None,
            Value::Diagnostic(notice) => Some(notice),
        }
    }

    pub fn as_type(&self) -> Option<Type> {
        self.pure().and_then(|pure| pure.as_type().cloned())
    }

    pub fn is_error(&self) -> bool {
        self.as_notice()
            .is_some_and(|notice| notice.level == DiagnosticLevel::Error)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.inner(), Node::Undefined)
    }

    /// Lookups and member reads can be assigned to.
    pub fn is_lval(&self) -> bool {
        matches!(self.as_node(), Some(Node::Lookup { .. } | Node::Get { .. }))
    }

    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Ok(a), Value::Ok(b)) => Arc::ptr_eq(a, b),
            (Value::Diagnostic(a), Value::Diagnostic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Every notice reachable from this value, outermost first. Shared
    /// subgraphs are visited once.
    pub fn notices(&self) -> Vec<Arc<Notice>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        self.collect_notices(&mut seen, &mut found);
        found
    }

    fn collect_notices(&self, seen: &mut HashSet<*const ()>, found: &mut Vec<Arc<Notice>>) {
        let key = match self {
            Value::Ok(node) => Arc::as_ptr(node) as *const (),
            Value::Diagnostic(notice) => Arc::as_ptr(notice) as *const (),
        };
        if !seen.insert(key) {
            return;
        }
        ensure_sufficient_stack(|| match self {
            Value::Ok(node) => {
                for operand in node.operands() {
                    operand.collect_notices(seen, found);
                }
            }
            Value::Diagnostic(notice) => {
                found.push(Arc::clone(notice));
                notice.value.collect_notices(seen, found);
            }
        })
    }
}

/// A diagnostic attached to the value it concerns.
#[derive(Debug)]
pub struct Notice {
    pub level: DiagnosticLevel,
    pub message: String,
    pub value: Value,
    /// Source location, present for errors lifted from the parse tree.
    pub span: Option<Span>,
}

impl Notice {
    pub fn new(
        level: DiagnosticLevel,
        message: impl Into<String>,
        value: Value,
        span: Option<Span>,
    ) -> Self {
        let notice = Self {
            level,
            message: message.into(),
            value,
            span,
        };
        notice.emit();
        notice
    }

    /// The message, when this notice is an error.
    pub fn error(&self) -> Option<&str> {
        (self.level == DiagnosticLevel::Error).then_some(self.message.as_str())
    }

    fn emit(&self) {
        let message = self.message.as_str();
        let value = &self.value;
        match self.level {
            DiagnosticLevel::Error => tracing::error!(%value, "{message}"),
            DiagnosticLevel::Warning => tracing::warn!(%value, "{message}"),
            DiagnosticLevel::Info => tracing::info!(%value, "{message}"),
            DiagnosticLevel::Debug => tracing::debug!(%value, "{message}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Diagnostic(notice) => {
                write!(f, "{}({:?}", notice.level, notice.message)?;
                if !notice.value.is_undefined() {
                    write!(f, ", {}", notice.value)?;
                }
                f.write_str(")")
            }
            Value::Ok(node) => write!(f, "{node}"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Undefined => f.write_str("undefined"),
            Node::Literal { pure, .. } => write!(f, "{pure}"),
            Node::Slot(ty) => write!(f, "<{ty}>"),
            Node::Lookup { name, .. } => f.write_str(name),
            Node::Get { receiver, name, .. } => write!(f, "{receiver}.{name}"),
            Node::Access {
                receiver, index, ..
            } => write!(f, "{receiver}[{index}]"),
            Node::ExprList { items, .. } => {
                f.write_str("(")?;
                for (position, item) in items.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Node::Call {
                callable,
                arguments,
                ..
            } => write!(f, "{callable}{arguments}"),
            Node::Cast { target, expr } => match target.kind() {
                TypeKind::Builtin(_) => write!(f, "{expr}^{target}"),
                _ => write!(f, "{expr}^({target})"),
            },
            Node::Modify { target, expr } => write!(f, "{target} = {expr}"),
            Node::Aggregate { members, .. } => {
                f.write_str("(")?;
                for (position, (name, value)) in members.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(")")
            }
        }
    }
}
