use tracing::trace;

use crate::ast::{NodeId, NodeTag, ParseTree, Span};
use crate::lexer::{classify, CharClass, Lexer};
use crate::stack::ensure_sufficient_stack;

/// Deepest nesting of groups, indexes and types the parser accepts.
pub const MAX_NESTING: usize = 256;

/// Where an expression sits; decides which characters end it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Context {
    Block,
    Group,
    Index,
}

impl Context {
    fn terminates(self, ch: char) -> bool {
        match self {
            Context::Block => ch == ',' || ch == '\n',
            Context::Group => ch == ',' || ch == ')',
            Context::Index => ch == ']',
        }
    }

    fn newlines_are_whitespace(self) -> bool {
        !matches!(self, Context::Block)
    }
}

/// Result of a parse: the tree and the offset parsing stopped at. The offset
/// is never before the starting offset, and is the end of input whenever the
/// tree carries an error node.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub tree: ParseTree,
    pub end: usize,
}

/// Parses a whole block of source text.
pub fn parse(input: &str) -> ParseTree {
    Parser::new(input).parse_block().tree
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    tree: ParseTree,
    halted: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::starting_at(input, 0)
    }

    pub fn starting_at(input: &'a str, start: usize) -> Self {
        Self {
            lexer: Lexer::starting_at(input, start),
            tree: ParseTree::new(),
            halted: false,
            depth: 0,
        }
    }

    /// `block := expr ((',' | '\n') expr)*`
    pub fn parse_block(mut self) -> ParseOutcome {
        let start = self.lexer.position();
        let block = self.tree.alloc(NodeTag::Block, Span::new(start, start), String::new());
        // Leading blank lines add no entries either.
        self.lexer.skip_whitespace(true);

        loop {
            let expr = self.parse_expr(Context::Block);
            self.tree.attach(block, expr);
            if self.halted {
                break;
            }
            match self.lexer.peek_char() {
                Some(',') => {
                    self.lexer.advance_char();
                }
                Some('\n') => {
                    self.lexer.advance_char();
                    // Blank lines and a trailing newline add no entries.
                    self.lexer.skip_whitespace(true);
                    if self.lexer.is_at_end() {
                        break;
                    }
                }
                None => break,
                Some(found) => {
                    let message = format!("unexpected character '{found}'");
                    self.fail(block, message);
                    break;
                }
            }
        }

        self.finish(block)
    }

    /// Parses a single expression, stopping at a top-level `,` or newline.
    pub fn parse_expression(mut self) -> ParseOutcome {
        let expr = self.parse_expr(Context::Block);
        self.finish(expr)
    }

    fn finish(mut self, root: NodeId) -> ParseOutcome {
        let end = self.lexer.position();
        self.tree.set_end(root, end);
        self.tree.set_root(root);
        trace!(nodes = self.tree.len(), end, halted = self.halted, "parse finished");
        ParseOutcome {
            tree: self.tree,
            end,
        }
    }

    fn parse_expr(&mut self, context: Context) -> NodeId {
        self.depth += 1;
        let expr = ensure_sufficient_stack(|| self.parse_expr_terms(context));
        self.depth -= 1;
        expr
    }

    fn parse_expr_terms(&mut self, context: Context) -> NodeId {
        self.lexer.skip_whitespace(context.newlines_are_whitespace());
        let start = self.lexer.position();
        let expr = self.tree.alloc(NodeTag::Expr, Span::new(start, start), String::new());
        if self.exceeds_nesting(expr) {
            return expr;
        }

        loop {
            self.lexer.skip_whitespace(context.newlines_are_whitespace());
            let Some(ch) = self.lexer.peek_char() else {
                break;
            };
            // A stray closer ends the expression; the enclosing level reports it.
            if context.terminates(ch) || ch == ')' || ch == ']' {
                break;
            }

            match ch {
                '(' => {
                    let group = self.parse_group();
                    self.tree.attach(expr, group);
                }
                '[' => {
                    let index = self.parse_index();
                    self.tree.attach(expr, index);
                }
                '"' => {
                    let string = self.parse_string();
                    self.tree.attach(expr, string);
                }
                ':' => {
                    self.lexer.advance_char();
                    self.split_declaration(expr);
                }
                '^' => {
                    let caret = self.lexer.position();
                    self.lexer.advance_char();
                    let ty = self.parse_type(caret);
                    self.tree.attach(expr, ty);
                }
                '=' => {
                    let start = self.lexer.position();
                    self.lexer.advance_char();
                    let sym = self.leaf(NodeTag::Sym, start);
                    self.tree.attach(expr, sym);
                }
                '.' => {
                    self.lexer.advance_char(); // member separator
                }
                '-' => {
                    let number = self.parse_number();
                    self.tree.attach(expr, number);
                }
                _ => match classify(ch) {
                    CharClass::Letter => {
                        let id = self.parse_identifier();
                        self.tree.attach(expr, id);
                    }
                    CharClass::Digit => {
                        let number = self.parse_number();
                        self.tree.attach(expr, number);
                    }
                    _ => {
                        self.fail(expr, format!("unexpected character '{ch}'"));
                    }
                },
            }

            if self.halted {
                break;
            }
        }

        let end = self.lexer.position();
        self.tree.set_end(expr, end);
        expr
    }

    /// Wraps every term collected so far into a declaration head.
    fn split_declaration(&mut self, expr: NodeId) {
        let start = self.tree.node(expr).span.start;
        let end = self.lexer.position();
        let declaration =
            self.tree
                .alloc(NodeTag::Declaration, Span::new(start, end), String::new());
        self.tree.adopt_children(expr, declaration);
        self.tree.attach(expr, declaration);
    }

    /// `'(' (expr (',' expr)*)? ')'`
    fn parse_group(&mut self) -> NodeId {
        let start = self.lexer.position();
        let group = self.tree.alloc(NodeTag::Exprs, Span::new(start, start), String::new());
        self.lexer.advance_char(); // consume '('

        self.lexer.skip_whitespace(true);
        if self.lexer.peek_char() == Some(')') {
            self.lexer.advance_char();
            self.tree.set_end(group, self.lexer.position());
            return group;
        }

        loop {
            let member = self.parse_expr(Context::Group);
            self.tree.attach(group, member);
            if self.halted {
                break;
            }
            match self.lexer.peek_char() {
                Some(',') => {
                    self.lexer.advance_char();
                }
                Some(')') => {
                    self.lexer.advance_char();
                    break;
                }
                found => {
                    self.fail(group, expected_message("\",\" or \")\"", found));
                    break;
                }
            }
        }

        self.tree.set_end(group, self.lexer.position());
        group
    }

    /// `'[' expr ']'`
    fn parse_index(&mut self) -> NodeId {
        let start = self.lexer.position();
        let index = self.tree.alloc(NodeTag::Index, Span::new(start, start), String::new());
        self.lexer.advance_char(); // consume '['

        let expr = self.parse_expr(Context::Index);
        self.tree.attach(index, expr);
        if !self.halted {
            match self.lexer.peek_char() {
                Some(']') => {
                    self.lexer.advance_char();
                }
                found => self.fail(index, expected_message("\"]\"", found)),
            }
        }

        self.tree.set_end(index, self.lexer.position());
        index
    }

    /// The type grammar after a `^`: a dotted path, a parenthesised group of
    /// types optionally followed by `^output`, a literal, or a nested `^type`.
    fn parse_type(&mut self, start: usize) -> NodeId {
        self.depth += 1;
        let ty = ensure_sufficient_stack(|| self.parse_type_terms(start));
        self.depth -= 1;
        ty
    }

    fn parse_type_terms(&mut self, start: usize) -> NodeId {
        let ty = self.tree.alloc(NodeTag::Type, Span::new(start, start), String::new());
        if self.exceeds_nesting(ty) {
            return ty;
        }
        self.lexer.skip_whitespace(false);

        match self.lexer.peek_char() {
            Some('^') => {
                let caret = self.lexer.position();
                self.lexer.advance_char();
                let nested = self.parse_type(caret);
                self.tree.attach(ty, nested);
            }
            Some('(') => {
                let group = self.parse_type_group();
                self.tree.attach(ty, group);
                if !self.halted && self.lexer.peek_char() == Some('^') {
                    let caret = self.lexer.position();
                    self.lexer.advance_char();
                    let output = self.parse_type(caret);
                    self.tree.attach(ty, output);
                }
            }
            Some('"') => {
                let string = self.parse_string();
                self.tree.attach(ty, string);
            }
            Some(ch) if ch == '-' || classify(ch) == CharClass::Digit => {
                let number = self.parse_number();
                self.tree.attach(ty, number);
            }
            Some(ch) if classify(ch) == CharClass::Letter => loop {
                let id = self.parse_identifier();
                self.tree.attach(ty, id);
                let continues_path = self.lexer.peek_char() == Some('.')
                    && self
                        .lexer
                        .peek_next_char()
                        .is_some_and(|next| classify(next) == CharClass::Letter);
                if !continues_path {
                    break;
                }
                self.lexer.advance_char(); // consume '.'
            },
            found => self.fail(ty, expected_message("a type", found)),
        }

        self.tree.set_end(ty, self.lexer.position());
        ty
    }

    fn parse_type_group(&mut self) -> NodeId {
        let start = self.lexer.position();
        let group = self.tree.alloc(NodeTag::Exprs, Span::new(start, start), String::new());
        self.lexer.advance_char(); // consume '('

        self.lexer.skip_whitespace(true);
        if self.lexer.peek_char() == Some(')') {
            self.lexer.advance_char();
            self.tree.set_end(group, self.lexer.position());
            return group;
        }

        loop {
            self.lexer.skip_whitespace(true);
            let member_start = self.lexer.position();
            let member = self.parse_type(member_start);
            self.tree.attach(group, member);
            if self.halted {
                break;
            }
            self.lexer.skip_whitespace(true);
            match self.lexer.peek_char() {
                Some(',') => {
                    self.lexer.advance_char();
                }
                Some(')') => {
                    self.lexer.advance_char();
                    break;
                }
                found => {
                    self.fail(group, expected_message("\",\" or \")\"", found));
                    break;
                }
            }
        }

        self.tree.set_end(group, self.lexer.position());
        group
    }

    fn parse_identifier(&mut self) -> NodeId {
        let span = self.lexer.lex_identifier();
        self.tree
            .alloc(NodeTag::Id, span, self.lexer.slice(span).to_string())
    }

    fn parse_number(&mut self) -> NodeId {
        let span = self.lexer.lex_number();
        self.tree
            .alloc(NodeTag::Number, span, self.lexer.slice(span).to_string())
    }

    fn parse_string(&mut self) -> NodeId {
        let start = self.lexer.position();
        match self.lexer.lex_string() {
            Ok(span) => self
                .tree
                .alloc(NodeTag::String, span, self.lexer.slice(span).to_string()),
            Err(err) => {
                let end = self.lexer.position();
                let text = format!("{}\"", self.lexer.slice(Span::new(start, end)));
                self.halted = true;
                self.tree.alloc_error(err.to_string(), Span::new(start, end), text)
            }
        }
    }

    fn leaf(&mut self, tag: NodeTag, start: usize) -> NodeId {
        let span = Span::new(start, self.lexer.position());
        self.tree.alloc(tag, span, self.lexer.slice(span).to_string())
    }

    /// Fails `node` once the nesting limit is passed.
    fn exceeds_nesting(&mut self, node: NodeId) -> bool {
        if self.depth <= MAX_NESTING {
            return false;
        }
        self.fail(node, format!("nesting deeper than {MAX_NESTING} levels"));
        self.tree.set_end(node, self.lexer.position());
        true
    }

    /// Records an error node holding the unconsumed remainder and stops all
    /// further parsing.
    fn fail(&mut self, parent: NodeId, message: String) {
        let start = self.lexer.position();
        let remainder = self.lexer.remainder().to_string();
        self.lexer.seek_end();
        let end = self.lexer.position();
        trace!(%message, start, "syntax error");
        let error = self
            .tree
            .alloc_error(message, Span::new(start, end), remainder);
        self.tree.attach(parent, error);
        self.halted = true;
    }
}

fn expected_message(expected: &str, found: Option<char>) -> String {
    match found {
        Some(ch) => format!("expected {expected} but found '{ch}'"),
        None => format!("expected {expected} but reached end of input"),
    }
}
