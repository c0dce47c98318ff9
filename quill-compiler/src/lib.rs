mod ast;
mod compiler;
mod diagnostics;
mod error;
mod graph;
mod lexer;
mod parser;
mod pure;
mod scope;
mod source;
mod stack;
mod syntax;
mod value;

pub mod types;

pub use crate::ast::{NodeId, NodeTag, ParseNode, ParseTree, Span};
pub use crate::compiler::{Compilation, CompileOptions, Compiler};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use crate::error::CompileError;
pub use crate::graph::GraphBuilder;
pub use crate::lexer::{classify, CharClass, Lexer, LexerError};
pub use crate::parser::{parse, ParseOutcome, Parser, MAX_NESTING};
pub use crate::pure::Pure;
pub use crate::scope::{Binding, Scope, ScopeBuilder};
pub use crate::source::{SourceFile, SourceId};
pub use crate::syntax::{translate, Declaration, Literal, Syntax, TypeSyntax};
pub use crate::types::{Builtin, Type};
pub use crate::value::{Node, Notice, Value};
