//! Compiles translated syntax into the value graph.
//!
//! Names resolve first against the declaration frames currently open, from
//! the innermost outwards, and then against the scope. Declarations are
//! compiled lazily: a block binds every name to its pending syntax before
//! compiling any of them, so members can refer to each other in any order.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::CompileError;
use crate::pure::Pure;
use crate::scope::Scope;
use crate::stack::ensure_sufficient_stack;
use crate::syntax::{Syntax, TypeSyntax};
use crate::types::{ContractBuilder, Type};
use crate::value::{Node, Value};

enum Slot<'s> {
    Pending(&'s Syntax),
    Compiling,
    Done(Value),
}

#[derive(Default)]
struct Frame<'s> {
    slots: Vec<(String, Slot<'s>)>,
}

impl Frame<'_> {
    fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|(bound, _)| bound == name)
    }
}

type Members = Vec<(String, Value)>;

/// Outcome of compiling a type expression.
enum Resolved {
    Type(Type),
    /// A notice explaining why no type was produced.
    Failed(Value),
}

pub struct GraphBuilder<'s> {
    scope: Arc<Scope>,
    frames: Vec<Frame<'s>>,
}

impl<'s> GraphBuilder<'s> {
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            scope,
            frames: Vec::new(),
        }
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// Compiles `syntax` with no receiver.
    pub fn compile(&mut self, syntax: &'s Syntax) -> Result<Value, CompileError> {
        self.compile_term(syntax, None)
    }

    fn compile_term(
        &mut self,
        syntax: &'s Syntax,
        receiver: Option<Value>,
    ) -> Result<Value, CompileError> {
        ensure_sufficient_stack(|| self.compile_variant(syntax, receiver))
    }

    fn compile_variant(
        &mut self,
        syntax: &'s Syntax,
        receiver: Option<Value>,
    ) -> Result<Value, CompileError> {
        match syntax {
            Syntax::Literal(literal) => self.scope.create_pure(literal.to_pure()),
            Syntax::Message(name) => match receiver {
                None => self.lookup(name),
                Some(receiver) => Ok(get(receiver, name)),
            },
            Syntax::Index(index) => match receiver {
                None => Ok(Value::error("index requires a receiver", Value::undefined())),
                Some(receiver) => self.access(receiver, index),
            },
            Syntax::Arguments(items) => match receiver {
                None if items.iter().any(is_declaration) => self.compile_declarations(items),
                None => Ok(Value::expr_list(self.compile_items(items)?)),
                Some(receiver) => self.call(receiver, items),
            },
            Syntax::Cast(ty) => self.cast(receiver, ty),
            Syntax::Put(expr) => self.put(receiver, expr),
            Syntax::Declaration(declaration) => {
                let value = self.compile(&declaration.value)?;
                Ok(Value::error(
                    "declaration is only allowed in a declaration block",
                    value,
                ))
            }
            Syntax::Sequence(terms) => self.compile_sequence(terms),
            Syntax::Block(entries) => self.compile_block(entries),
            Syntax::Error { message, span } => Ok(Value::syntax_error(message.clone(), *span)),
        }
    }

    /// A single entry compiles as itself; several become an expression list,
    /// and any declaration turns the whole block into a declaration block.
    #[tracing::instrument(level = "debug", skip_all, fields(entries = entries.len()))]
    fn compile_block(&mut self, entries: &'s [Syntax]) -> Result<Value, CompileError> {
        if entries.iter().any(is_declaration) {
            return self.compile_declarations(entries);
        }
        match entries {
            [single] => self.compile(single),
            _ => Ok(Value::expr_list(self.compile_items(entries)?)),
        }
    }

    fn compile_items(&mut self, items: &'s [Syntax]) -> Result<Vec<Value>, CompileError> {
        items.iter().map(|item| self.compile(item)).collect()
    }

    fn compile_sequence(&mut self, terms: &'s [Syntax]) -> Result<Value, CompileError> {
        let Some((first, rest)) = terms.split_first() else {
            return self.scope.create_pure(Pure::Null);
        };

        let mut current = self.compile(first)?;
        for term in rest {
            if current.is_error() {
                break;
            }
            if !term.is_receivable() {
                current = Value::error(
                    format!("{} cannot follow an expression", term.kind_name()),
                    current,
                );
                break;
            }
            current = self.compile_term(term, Some(current))?;
        }
        Ok(current)
    }

    fn lookup(&mut self, name: &str) -> Result<Value, CompileError> {
        for depth in (0..self.frames.len()).rev() {
            if let Some(position) = self.frames[depth].position(name) {
                let target = self.resolve_slot(depth, position)?;
                if target.is_error() && target.is_undefined() {
                    return Ok(target);
                }
                return Ok(Value::node(Node::Lookup {
                    name: name.to_string(),
                    target,
                }));
            }
        }

        let target = self.scope.at(name)?;
        if target.is_error() {
            return Ok(target);
        }
        Ok(Value::node(Node::Lookup {
            name: name.to_string(),
            target,
        }))
    }

    /// Compiles a pending declaration on first use. Only the frames up to
    /// and including the declaring one are visible while it compiles.
    fn resolve_slot(&mut self, depth: usize, position: usize) -> Result<Value, CompileError> {
        let (name, slot) = &mut self.frames[depth].slots[position];
        let syntax = match std::mem::replace(slot, Slot::Compiling) {
            Slot::Pending(syntax) => syntax,
            Slot::Done(value) => {
                *slot = Slot::Done(value.clone());
                return Ok(value);
            }
            Slot::Compiling => {
                trace!(%name, "declaration cycle");
                return Ok(Value::error(
                    format!("compilation cycle through '{name}'"),
                    Value::undefined(),
                ));
            }
        };

        let hidden = self.frames.split_off(depth + 1);
        let compiled = self.compile(syntax);
        self.frames.extend(hidden);
        let value = compiled?;

        self.frames[depth].slots[position].1 = Slot::Done(value.clone());
        Ok(value)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(entries = entries.len()))]
    fn compile_declarations(&mut self, entries: &'s [Syntax]) -> Result<Value, CompileError> {
        let mut frame = Frame::default();
        let mut rejected = Vec::new();
        let mut others = Vec::new();

        for entry in entries {
            match entry {
                Syntax::Declaration(declaration) => {
                    let name = &declaration.name;
                    if frame.position(name).is_some() {
                        rejected.push(Value::error(
                            format!("duplicate declaration of '{name}'"),
                            Value::undefined(),
                        ));
                    } else if self.scope.is_reserved(name) {
                        rejected.push(Value::error(
                            format!("cannot redefine reserved name '{name}'"),
                            Value::undefined(),
                        ));
                    } else {
                        frame
                            .slots
                            .push((name.clone(), Slot::Pending(&declaration.value)));
                    }
                }
                other => others.push(other),
            }
        }

        self.frames.push(frame);
        let depth = self.frames.len() - 1;
        let compiled = self.compile_frame(depth, &others);
        self.frames.pop();
        let (members, mut invalid) = compiled?;
        rejected.append(&mut invalid);
        debug!(
            members = members.len(),
            rejected = rejected.len(),
            "declaration block compiled"
        );

        let contract = members
            .iter()
            .fold(ContractBuilder::new(), |builder, (name, value)| {
                builder.member(name.clone(), value.clone())
            })
            .build();
        Ok(Value::node(Node::Aggregate {
            contract,
            members,
            rejected,
        }))
    }

    /// Compiles every declaration in the frame, then the entries that were
    /// not declarations.
    fn compile_frame(
        &mut self,
        depth: usize,
        others: &[&'s Syntax],
    ) -> Result<(Members, Vec<Value>), CompileError> {
        let mut members = Vec::new();
        for position in 0..self.frames[depth].slots.len() {
            let value = self.resolve_slot(depth, position)?;
            let name = self.frames[depth].slots[position].0.clone();
            members.push((name, value));
        }

        let mut invalid = Vec::new();
        for &entry in others {
            let value = self.compile(entry)?;
            invalid.push(if value.is_error() {
                value
            } else {
                Value::error("expected a declaration", value)
            });
        }
        Ok((members, invalid))
    }

    fn access(&mut self, receiver: Value, index: &'s Syntax) -> Result<Value, CompileError> {
        let index = self.compile(index)?;
        let member = match index.pure() {
            Some(Pure::Number(position)) if position >= 0.0 && position.fract() == 0.0 => receiver
                .ty()
                .and_then(|ty| ty.at_index(position as usize)),
            Some(Pure::String(key)) => member_of(&receiver, &key),
            _ => None,
        };
        Ok(Value::node(Node::Access {
            receiver,
            index,
            member,
        }))
    }

    fn call(&mut self, receiver: Value, items: &'s [Syntax]) -> Result<Value, CompileError> {
        let arguments = self.compile_items(items)?;
        let callee = receiver.ty();
        let Some(signature) = callee.as_ref().and_then(Type::as_signature) else {
            return Ok(Value::error("receiver is not callable", receiver));
        };

        let known = arguments.iter().all(|argument| argument.ty().is_some());
        let arguments = Value::expr_list(arguments);
        let accepted = !known
            || arguments
                .ty()
                .map_or(true, |given| signature.input().generalizes(&given));

        let call = Value::node(Node::Call {
            callable: receiver,
            arguments,
            output: signature.output().clone(),
        });
        if accepted {
            Ok(call)
        } else {
            let message = format!(
                "arguments do not match {}^{}",
                signature.input(),
                signature.output()
            );
            Ok(Value::warn(message, call))
        }
    }

    fn cast(&mut self, receiver: Option<Value>, ty: &'s TypeSyntax) -> Result<Value, CompileError> {
        let target = match self.resolve_type(ty)? {
            Resolved::Type(target) => target,
            Resolved::Failed(notice) => return Ok(notice),
        };
        match receiver {
            None => self.scope.create_pure(Pure::Type(target)),
            Some(expr) => Ok(Value::node(Node::Cast { target, expr })),
        }
    }

    fn resolve_type(&mut self, ty: &'s TypeSyntax) -> Result<Resolved, CompileError> {
        let resolved = match ty {
            TypeSyntax::Path(segments) => self.resolve_path(segments)?,
            TypeSyntax::Group(members) => {
                if !members.is_empty()
                    && members
                        .iter()
                        .all(|member| matches!(member, TypeSyntax::Literal(_)))
                {
                    let values = members.iter().filter_map(|member| match member {
                        TypeSyntax::Literal(literal) => Some(literal.to_pure()),
                        _ => None,
                    });
                    Resolved::Type(Type::domain(values))
                } else {
                    match self.resolve_types(members)? {
                        Ok(types) => Resolved::Type(Type::tuple(types)),
                        Err(notice) => Resolved::Failed(notice),
                    }
                }
            }
            TypeSyntax::Function { input, output } => {
                let parameters = match self.resolve_types(input)? {
                    Ok(types) => types,
                    Err(notice) => return Ok(Resolved::Failed(notice)),
                };
                match self.resolve_type(output)? {
                    Resolved::Type(output) => Resolved::Type(Type::function(parameters, output)),
                    failed => failed,
                }
            }
            TypeSyntax::Literal(literal) => Resolved::Type(Type::literal(literal.to_pure())),
            TypeSyntax::Nested(inner) => match self.resolve_type(inner)? {
                Resolved::Type(inner) => Resolved::Type(Type::literal(Pure::Type(inner))),
                failed => failed,
            },
            TypeSyntax::Error { message, span } => {
                Resolved::Failed(Value::syntax_error(message.clone(), *span))
            }
        };
        Ok(resolved)
    }

    fn resolve_types(
        &mut self,
        members: &'s [TypeSyntax],
    ) -> Result<Result<Vec<Type>, Value>, CompileError> {
        let mut types = Vec::with_capacity(members.len());
        for member in members {
            match self.resolve_type(member)? {
                Resolved::Type(ty) => types.push(ty),
                Resolved::Failed(notice) => return Ok(Err(notice)),
            }
        }
        Ok(Ok(types))
    }

    /// `a.b.c` in type position. A segment naming a domain member resolves
    /// to that member's literal type.
    fn resolve_path(&mut self, segments: &[String]) -> Result<Resolved, CompileError> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(Resolved::Failed(Value::error(
                "empty type path",
                Value::undefined(),
            )));
        };

        let mut current = self.lookup(first)?;
        for segment in rest {
            if current.as_notice().is_some() {
                break;
            }
            let instance = current
                .as_type()
                .and_then(|ty| ty.instance(segment).cloned());
            current = match instance {
                Some(literal) => self.scope.create_pure(Pure::Type(literal))?,
                None => get(current, segment),
            };
        }

        if current.as_notice().is_some() {
            return Ok(Resolved::Failed(current));
        }
        match current.as_type() {
            Some(ty) => Ok(Resolved::Type(ty)),
            None => Ok(Resolved::Failed(Value::error(
                format!("{} is not a type", segments.join(".")),
                current,
            ))),
        }
    }

    fn put(&mut self, receiver: Option<Value>, expr: &'s Syntax) -> Result<Value, CompileError> {
        let value = self.compile(expr)?;
        let Some(target) = receiver.filter(Value::is_lval) else {
            return Ok(Value::error("expression is not assignable", value));
        };

        let mismatch = match (target.ty(), value.ty()) {
            (Some(expected), Some(given)) if !expected.generalizes(&given) => {
                Some(format!("cannot assign {given} to {expected}"))
            }
            _ => None,
        };
        let modify = Value::node(Node::Modify {
            target,
            expr: value,
        });
        Ok(match mismatch {
            Some(message) => Value::warn(message, modify),
            None => modify,
        })
    }
}

fn is_declaration(syntax: &Syntax) -> bool {
    matches!(syntax, Syntax::Declaration(_))
}

/// Member of the receiver's type, falling back to the type the receiver
/// holds as its constant.
fn member_of(receiver: &Value, name: &str) -> Option<Value> {
    receiver
        .ty()
        .and_then(|ty| ty.at(name))
        .or_else(|| receiver.as_type().and_then(|ty| ty.at(name)))
}

fn get(receiver: Value, name: &str) -> Value {
    match member_of(&receiver, name) {
        Some(member) => Value::node(Node::Get {
            receiver,
            name: name.to_string(),
            member,
        }),
        None => Value::error(format!("{name} is not defined"), receiver),
    }
}
