//! Generic parse tree produced by the parser.
//!
//! Nodes live in a single arena owned by [`ParseTree`] and refer to their
//! children and parent through [`NodeId`] indices. A node's subtree is never
//! mutated once the parser has closed it.

use std::fmt;

use serde::Serialize;

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Index into a [`ParseTree`] arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    /// Root list of entries separated by `,` or newlines.
    Block,
    /// A run of terms.
    Expr,
    /// Parenthesised, comma-separated group.
    Exprs,
    /// Bracketed index expression.
    Index,
    /// Terms collected before a `:`.
    Declaration,
    /// Type expression introduced by `^`.
    Type,
    Id,
    Sym,
    Number,
    String,
    Error,
}

impl NodeTag {
    pub fn name(self) -> &'static str {
        match self {
            NodeTag::Block => "block",
            NodeTag::Expr => "expr",
            NodeTag::Exprs => "exprs",
            NodeTag::Index => "index",
            NodeTag::Declaration => "declaration",
            NodeTag::Type => "type",
            NodeTag::Id => "id",
            NodeTag::Sym => "sym",
            NodeTag::Number => "number",
            NodeTag::String => "string",
            NodeTag::Error => "error",
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeTag::Id | NodeTag::Sym | NodeTag::Number | NodeTag::String | NodeTag::Error
        )
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct ParseNode {
    pub tag: NodeTag,
    pub span: Span,
    /// Source text of a leaf; for error nodes, the unconsumed remainder.
    pub text: String,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    root: Option<NodeId>,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, tag: NodeTag, span: Span, text: String) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ParseNode {
            tag,
            span,
            text,
            children: Vec::new(),
            parent: None,
            error: None,
        });
        id
    }

    pub(crate) fn alloc_error(&mut self, message: String, span: Span, text: String) -> NodeId {
        let id = self.alloc(NodeTag::Error, span, text);
        self.nodes[id.index()].error = Some(message);
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Moves every child of `from` under `to`, leaving `from` empty.
    pub(crate) fn adopt_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.index()].children);
        for child in children {
            self.attach(to, child);
        }
    }

    pub(crate) fn set_end(&mut self, id: NodeId, end: usize) {
        self.nodes[id.index()].span.end = end;
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// The outermost node. Parsed trees always have one; until a root is
    /// set this is the first allocated node, so on an empty tree the id is
    /// not valid for [`ParseTree::node`].
    pub fn root(&self) -> NodeId {
        self.root.unwrap_or(NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id.index()]
    }

    pub fn tag(&self, id: NodeId) -> NodeTag {
        self.node(id).tag
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Error nodes in document order.
    pub fn errors(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        if self.root.is_some() {
            self.collect_errors(self.root(), &mut found);
        }
        found
    }

    fn collect_errors(&self, id: NodeId, found: &mut Vec<NodeId>) {
        if self.tag(id) == NodeTag::Error {
            found.push(id);
        }
        for &child in self.children(id) {
            self.collect_errors(child, found);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.nodes.iter().any(|node| node.tag == NodeTag::Error)
    }

    /// Reconstructs normalised source text for a subtree. Structural
    /// delimiters are synthesised; whitespace collapses to single spaces
    /// between terms.
    pub fn text_content(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.tag {
            NodeTag::Id | NodeTag::Sym | NodeTag::Number | NodeTag::String | NodeTag::Error => {
                node.text.clone()
            }
            NodeTag::Block => self.join_children(id, ", "),
            NodeTag::Expr => self.join_children(id, " "),
            NodeTag::Declaration => format!("{}:", self.join_children(id, " ")),
            NodeTag::Exprs => self.delimited(id, '(', ')'),
            NodeTag::Index => self.delimited(id, '[', ']'),
            NodeTag::Type => {
                let body = self.type_body(id);
                if self.is_type_group_member(id) {
                    body
                } else {
                    format!("^{body}")
                }
            }
        }
    }

    fn join_children(&self, id: NodeId, separator: &str) -> String {
        self.children(id)
            .iter()
            .map(|&child| self.text_content(child))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn delimited(&self, id: NodeId, open: char, close: char) -> String {
        let mut members = Vec::new();
        let mut trailing_error = None;
        for &child in self.children(id) {
            if self.tag(child) == NodeTag::Error {
                trailing_error = Some(self.text_content(child));
            } else {
                members.push(self.text_content(child));
            }
        }
        let mut out = String::new();
        out.push(open);
        out.push_str(&members.join(","));
        match trailing_error {
            Some(remainder) => out.push_str(&remainder),
            None => out.push(close),
        }
        out
    }

    fn type_body(&self, id: NodeId) -> String {
        let children = self.children(id);
        if !children.is_empty() && children.iter().all(|&c| self.tag(c) == NodeTag::Id) {
            return children
                .iter()
                .map(|&c| self.node(c).text.as_str())
                .collect::<Vec<_>>()
                .join(".");
        }
        children
            .iter()
            .map(|&child| self.text_content(child))
            .collect()
    }

    fn is_type_group_member(&self, id: NodeId) -> bool {
        self.parent(id)
            .filter(|&group| self.tag(group) == NodeTag::Exprs)
            .and_then(|group| self.parent(group))
            .is_some_and(|owner| self.tag(owner) == NodeTag::Type)
    }

    /// Serialises a subtree as markup: `<tag>children</tag>`, with `<`, `>`
    /// and `&` escaped in leaf text. Error nodes carry their message as an
    /// attribute.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        let tag = node.tag.name();
        out.push('<');
        out.push_str(tag);
        if let Some(message) = &node.error {
            out.push_str(" message=\"");
            out.push_str(&escape_markup(message).replace('"', "&quot;"));
            out.push('"');
        }
        out.push('>');
        if node.tag.is_leaf() {
            out.push_str(&escape_markup(&node.text));
        } else {
            for &child in &node.children {
                self.write_markup(child, out);
            }
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            other => escaped.push(other),
        }
    }
    escaped
}
