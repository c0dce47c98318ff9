//! Syntax-directed translation from the generic parse tree into compilable
//! syntax nodes.

use crate::ast::{NodeId, NodeTag, ParseTree, Span};
use crate::pure::Pure;
use crate::stack::ensure_sufficient_stack;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

impl Literal {
    pub fn to_pure(&self) -> Pure {
        match self {
            Literal::Number(value) => Pure::Number(*value),
            Literal::String(value) => Pure::String(value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: Box<Syntax>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    Literal(Literal),
    /// An identifier or operator sent to the scope or to a receiver.
    Message(String),
    Index(Box<Syntax>),
    Arguments(Vec<Syntax>),
    Cast(TypeSyntax),
    /// Assignment of the wrapped expression to the receiver.
    Put(Box<Syntax>),
    Declaration(Declaration),
    Sequence(Vec<Syntax>),
    Block(Vec<Syntax>),
    Error { message: String, span: Span },
}

impl Syntax {
    /// Whether the node can take the result of the previous term as its
    /// receiver.
    pub fn is_receivable(&self) -> bool {
        matches!(
            self,
            Syntax::Message(_)
                | Syntax::Index(_)
                | Syntax::Arguments(_)
                | Syntax::Cast(_)
                | Syntax::Put(_)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Syntax::Literal(_) => "literal",
            Syntax::Message(_) => "message",
            Syntax::Index(_) => "index",
            Syntax::Arguments(_) => "argument list",
            Syntax::Cast(_) => "cast",
            Syntax::Put(_) => "assignment",
            Syntax::Declaration(_) => "declaration",
            Syntax::Sequence(_) => "sequence",
            Syntax::Block(_) => "block",
            Syntax::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSyntax {
    /// `a.b.c`
    Path(Vec<String>),
    /// `(T, U)`: a tuple, or a domain when every member is a literal.
    Group(Vec<TypeSyntax>),
    /// `(T, U)^R`
    Function {
        input: Vec<TypeSyntax>,
        output: Box<TypeSyntax>,
    },
    Literal(Literal),
    Nested(Box<TypeSyntax>),
    Error { message: String, span: Span },
}

pub fn translate(tree: &ParseTree, id: NodeId) -> Syntax {
    ensure_sufficient_stack(|| translate_node(tree, id))
}

fn translate_node(tree: &ParseTree, id: NodeId) -> Syntax {
    let node = tree.node(id);
    match node.tag {
        NodeTag::Block => Syntax::Block(
            tree.children(id)
                .iter()
                .map(|&child| translate(tree, child))
                .collect(),
        ),
        NodeTag::Expr => translate_expr(tree, id),
        NodeTag::Index => {
            let children = tree.children(id);
            let inner = match children {
                [single] => translate(tree, *single),
                _ => Syntax::Sequence(
                    children
                        .iter()
                        .map(|&child| translate(tree, child))
                        .collect(),
                ),
            };
            Syntax::Index(Box::new(inner))
        }
        NodeTag::Exprs => Syntax::Arguments(
            tree.children(id)
                .iter()
                .map(|&child| translate(tree, child))
                .collect(),
        ),
        NodeTag::Id | NodeTag::Sym => Syntax::Message(node.text.clone()),
        NodeTag::Number => match parse_number(&node.text) {
            Some(value) => Syntax::Literal(Literal::Number(value)),
            None => Syntax::Error {
                message: format!("invalid number literal '{}'", node.text),
                span: node.span,
            },
        },
        NodeTag::String => match serde_json::from_str::<String>(&node.text) {
            Ok(value) => Syntax::Literal(Literal::String(value)),
            Err(err) => Syntax::Error {
                message: format!("invalid string literal {}: {err}", node.text),
                span: node.span,
            },
        },
        NodeTag::Type => Syntax::Cast(translate_type(tree, id)),
        NodeTag::Error => Syntax::Error {
            message: node.error.clone().unwrap_or_default(),
            span: node.span,
        },
        NodeTag::Declaration => misplaced(tree, id),
    }
}

fn translate_expr(tree: &ParseTree, id: NodeId) -> Syntax {
    let children = tree.children(id);
    match children.split_first() {
        Some((&head, rest)) if tree.tag(head) == NodeTag::Declaration => {
            let value = Syntax::Sequence(translate_terms(tree, rest));
            match declared_name(tree, head) {
                Ok(name) => Syntax::Declaration(Declaration {
                    name,
                    value: Box::new(value),
                }),
                Err(message) => Syntax::Error {
                    message,
                    span: tree.node(head).span,
                },
            }
        }
        _ => Syntax::Sequence(translate_terms(tree, children)),
    }
}

/// Translates a run of terms; a `=` symbol turns the rest of the run into
/// the assigned expression.
fn translate_terms(tree: &ParseTree, nodes: &[NodeId]) -> Vec<Syntax> {
    let mut terms = Vec::with_capacity(nodes.len());
    for (position, &node) in nodes.iter().enumerate() {
        let parse_node = tree.node(node);
        if parse_node.tag == NodeTag::Sym && parse_node.text == "=" {
            let value = Syntax::Sequence(translate_terms(tree, &nodes[position + 1..]));
            terms.push(Syntax::Put(Box::new(value)));
            break;
        }
        terms.push(translate(tree, node));
    }
    terms
}

fn declared_name(tree: &ParseTree, head: NodeId) -> Result<String, String> {
    match tree.children(head) {
        [single] => {
            let node = tree.node(*single);
            match node.tag {
                NodeTag::Id => Ok(node.text.clone()),
                NodeTag::String => serde_json::from_str::<String>(&node.text)
                    .map_err(|err| format!("invalid declaration name {}: {err}", node.text)),
                other => Err(format!("a {other} cannot name a declaration")),
            }
        }
        [] => Err("declaration requires a name".to_string()),
        _ => Err(format!(
            "declaration requires a single name, found '{}'",
            tree.text_content(head)
        )),
    }
}

fn translate_type(tree: &ParseTree, id: NodeId) -> TypeSyntax {
    ensure_sufficient_stack(|| translate_type_node(tree, id))
}

fn translate_type_node(tree: &ParseTree, id: NodeId) -> TypeSyntax {
    let children = tree.children(id);

    if let Some(&error) = children.iter().find(|&&c| tree.tag(c) == NodeTag::Error) {
        let node = tree.node(error);
        return TypeSyntax::Error {
            message: node.error.clone().unwrap_or_default(),
            span: node.span,
        };
    }

    if !children.is_empty() && children.iter().all(|&c| tree.tag(c) == NodeTag::Id) {
        return TypeSyntax::Path(
            children
                .iter()
                .map(|&c| tree.node(c).text.clone())
                .collect(),
        );
    }

    match children {
        [single] => match tree.tag(*single) {
            NodeTag::Type => TypeSyntax::Nested(Box::new(translate_type(tree, *single))),
            NodeTag::Exprs => TypeSyntax::Group(translate_type_members(tree, *single)),
            NodeTag::Number | NodeTag::String => match translate(tree, *single) {
                Syntax::Literal(literal) => TypeSyntax::Literal(literal),
                Syntax::Error { message, span } => TypeSyntax::Error { message, span },
                _ => malformed_type(tree, id),
            },
            _ => malformed_type(tree, id),
        },
        [group, output]
            if tree.tag(*group) == NodeTag::Exprs && tree.tag(*output) == NodeTag::Type =>
        {
            TypeSyntax::Function {
                input: translate_type_members(tree, *group),
                output: Box::new(translate_type(tree, *output)),
            }
        }
        _ => malformed_type(tree, id),
    }
}

fn translate_type_members(tree: &ParseTree, group: NodeId) -> Vec<TypeSyntax> {
    tree.children(group)
        .iter()
        .map(|&member| match tree.tag(member) {
            NodeTag::Type => translate_type(tree, member),
            NodeTag::Error => {
                let node = tree.node(member);
                TypeSyntax::Error {
                    message: node.error.clone().unwrap_or_default(),
                    span: node.span,
                }
            }
            _ => malformed_type(tree, member),
        })
        .collect()
}

fn malformed_type(tree: &ParseTree, id: NodeId) -> TypeSyntax {
    TypeSyntax::Error {
        message: format!("malformed type '{}'", tree.text_content(id)),
        span: tree.node(id).span,
    }
}

fn misplaced(tree: &ParseTree, id: NodeId) -> Syntax {
    let node = tree.node(id);
    Syntax::Error {
        message: format!("unexpected {} node", node.tag),
        span: node.span,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn translate_source(source: &str) -> Syntax {
        let tree = parse(source);
        translate(&tree, tree.root())
    }

    fn single_entry(source: &str) -> Syntax {
        match translate_source(source) {
            Syntax::Block(mut entries) if entries.len() == 1 => entries.remove(0),
            other => panic!("expected a single block entry, got {other:?}"),
        }
    }

    #[test]
    fn message_chain_becomes_sequence() {
        let syntax = single_entry("a.b");
        assert_eq!(
            syntax,
            Syntax::Sequence(vec![
                Syntax::Message("a".into()),
                Syntax::Message("b".into())
            ])
        );
    }

    #[test]
    fn equals_turns_rest_into_put() {
        let syntax = single_entry("a = 1 b");
        let Syntax::Sequence(terms) = syntax else {
            panic!("expected sequence");
        };
        assert_eq!(terms.len(), 2);
        assert_eq!(
            terms[1],
            Syntax::Put(Box::new(Syntax::Sequence(vec![
                Syntax::Literal(Literal::Number(1.0)),
                Syntax::Message("b".into()),
            ])))
        );
    }

    #[test]
    fn declaration_head_names_the_value() {
        let syntax = single_entry("size: 3");
        let Syntax::Declaration(declaration) = syntax else {
            panic!("expected declaration");
        };
        assert_eq!(declaration.name, "size");
        assert_eq!(
            *declaration.value,
            Syntax::Sequence(vec![Syntax::Literal(Literal::Number(3.0))])
        );
    }

    #[test]
    fn non_numeric_payload_is_an_error() {
        let syntax = single_entry("-");
        let Syntax::Sequence(terms) = syntax else {
            panic!("expected sequence");
        };
        assert!(matches!(
            &terms[0],
            Syntax::Error { message, .. } if message == "invalid number literal '-'"
        ));
    }

    #[test]
    fn string_literal_is_json_decoded() {
        let syntax = single_entry(r#""a\"b\n""#);
        assert_eq!(
            syntax,
            Syntax::Sequence(vec![Syntax::Literal(Literal::String("a\"b\n".into()))])
        );
    }

    #[test]
    fn function_type_has_input_and_output() {
        let syntax = single_entry("^(number, string)^boolean");
        let Syntax::Sequence(terms) = syntax else {
            panic!("expected sequence");
        };
        assert_eq!(
            terms[0],
            Syntax::Cast(TypeSyntax::Function {
                input: vec![
                    TypeSyntax::Path(vec!["number".into()]),
                    TypeSyntax::Path(vec!["string".into()]),
                ],
                output: Box::new(TypeSyntax::Path(vec!["boolean".into()])),
            })
        );
    }
}
