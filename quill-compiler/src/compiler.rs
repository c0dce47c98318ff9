use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::ast::ParseTree;
use crate::diagnostics::Diagnostics;
use crate::graph::GraphBuilder;
use crate::parser::parse;
use crate::scope::{Scope, ScopeBuilder};
use crate::source::SourceFile;
use crate::syntax::{translate, Syntax};
use crate::value::{Node, Value};

#[derive(Debug, Default, Clone)]
pub struct CompileOptions {
    /// Log the parse tree markup at debug level.
    pub dump_tree: bool,
    /// Fail the compilation when any error diagnostic was recorded.
    pub strict: bool,
}

#[derive(Debug)]
pub struct Compilation {
    pub tree: ParseTree,
    pub syntax: Syntax,
    pub value: Value,
    pub diagnostics: Diagnostics,
    /// Child of the host scope holding the root-level declarations.
    pub scope: Arc<Scope>,
}

pub struct Compiler {
    scope: Arc<Scope>,
    diagnostics: Diagnostics,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self::with_scope(Scope::builtins(), options)
    }

    pub fn with_scope(scope: Arc<Scope>, options: CompileOptions) -> Self {
        Self {
            scope,
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[tracing::instrument(level = "debug", skip_all, fields(source = %source.name()))]
    pub fn compile(&mut self, source: &SourceFile) -> Result<Compilation> {
        self.diagnostics.clear();

        let tree = parse(&source.contents);
        if self.options.dump_tree {
            debug!(markup = %tree.to_markup(tree.root()), "parse tree");
        }
        for id in tree.errors() {
            let node = tree.node(id);
            let message = node.error.clone().unwrap_or_default();
            self.diagnostics.push_error_with_span(message, Some(node.span));
        }

        let syntax = translate(&tree, tree.root());
        let value = GraphBuilder::new(Arc::clone(&self.scope)).compile(&syntax)?;

        // Notices carrying a span repeat parse errors already recorded above.
        for notice in value.notices() {
            if notice.span.is_none() {
                self.diagnostics
                    .push(notice.level, notice.message.clone());
            }
        }

        let scope = self.declared_scope(&value);
        debug!(
            diagnostics = self.diagnostics.entries().len(),
            errors = self.diagnostics.error_count(),
            "compilation finished"
        );

        if self.options.strict && self.diagnostics.has_errors() {
            bail!(
                "compilation failed with {} error(s)",
                self.diagnostics.error_count()
            );
        }

        Ok(Compilation {
            tree,
            syntax,
            value,
            diagnostics: self.diagnostics.clone(),
            scope,
        })
    }

    fn declared_scope(&self, value: &Value) -> Arc<Scope> {
        let mut builder = ScopeBuilder::child(Arc::clone(&self.scope));
        if let Node::Aggregate { members, .. } = value.inner() {
            for (name, member) in members {
                builder.put(name.clone(), member.clone());
            }
        }
        builder.close()
    }
}
