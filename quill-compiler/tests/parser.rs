use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quill_compiler::{parse, NodeTag, ParseTree, Parser, MAX_NESTING};

fn tags(tree: &ParseTree) -> Vec<NodeTag> {
    let mut out = Vec::new();
    collect_tags(tree, tree.root(), &mut out);
    out
}

fn collect_tags(tree: &ParseTree, id: quill_compiler::NodeId, out: &mut Vec<NodeTag>) {
    out.push(tree.tag(id));
    for &child in tree.children(id) {
        collect_tags(tree, child, out);
    }
}

#[test]
fn unterminated_group_reports_expected_delimiters() {
    let input = "(1,2";
    let outcome = Parser::new(input).parse_block();
    let tree = &outcome.tree;

    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    let error = tree.node(errors[0]);
    let message = error.error.as_deref().unwrap_or_default();
    assert!(
        message.contains("\",\" or \")\""),
        "unexpected message: {message}"
    );
    assert_eq!(error.span.end, input.len());
    assert_eq!(outcome.end, input.len());
}

#[test]
fn wrong_closing_delimiter_consumes_the_rest() {
    let input = "(a] b";
    let outcome = Parser::new(input).parse_block();
    let tree = &outcome.tree;

    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    let error = tree.node(errors[0]);
    assert_eq!(
        error.error.as_deref(),
        Some("expected \",\" or \")\" but found ']'")
    );
    assert_eq!(error.text, "] b");
    assert_eq!(outcome.end, input.len());
}

#[test]
fn missing_bracket_is_reported() {
    let tree = parse("a[1");
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        tree.node(errors[0]).error.as_deref(),
        Some("expected \"]\" but reached end of input")
    );
}

#[test]
fn unterminated_string_gets_a_closing_quote() {
    let tree = parse("a \"open");
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    let error = tree.node(errors[0]);
    assert_eq!(error.text, "\"open\"");
    assert!(error
        .error
        .as_deref()
        .is_some_and(|message| message.starts_with("unterminated string")));
}

#[test]
fn unexpected_character_halts_the_parse() {
    let tree = parse("a # b, c");
    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(tree.node(errors[0]).text, "# b, c");
    // Nothing after the error is parsed as a further block entry.
    assert_eq!(tree.children(tree.root()).len(), 1);
}

#[test]
fn colon_wraps_preceding_terms_into_a_declaration() {
    let tree = parse("size: 3");
    assert_eq!(
        tags(&tree),
        vec![
            NodeTag::Block,
            NodeTag::Expr,
            NodeTag::Declaration,
            NodeTag::Id,
            NodeTag::Number,
        ]
    );
    let expr = tree.children(tree.root())[0];
    let declaration = tree.children(expr)[0];
    assert_eq!(tree.text_content(declaration), "size:");
}

#[test]
fn caret_starts_a_type_subtree() {
    let tree = parse("x^(number, string)^boolean");
    assert_eq!(
        tags(&tree),
        vec![
            NodeTag::Block,
            NodeTag::Expr,
            NodeTag::Id,
            NodeTag::Type,
            NodeTag::Exprs,
            NodeTag::Type,
            NodeTag::Id,
            NodeTag::Type,
            NodeTag::Id,
            NodeTag::Type,
            NodeTag::Id,
        ]
    );
    assert_eq!(tree.text_content(tree.root()), "x ^(number,string)^boolean");
}

#[test]
fn dotted_type_path_is_one_type() {
    let tree = parse("v^shapes.Circle");
    assert_eq!(tree.text_content(tree.root()), "v ^shapes.Circle");
    assert!(!tree.has_errors());
}

#[test]
fn newlines_separate_entries_only_at_the_root() {
    let tree = parse("a\nb(1,\n 2)");
    assert!(!tree.has_errors());
    assert_eq!(tree.children(tree.root()).len(), 2);
    assert_eq!(tree.text_content(tree.root()), "a, b (1,2)");
}

#[test]
fn blank_lines_and_trailing_newline_add_no_entries() {
    let tree = parse("a: 1\n\n  \nb: a\n");
    assert!(!tree.has_errors());
    assert_eq!(tree.children(tree.root()).len(), 2);
    assert_eq!(tree.text_content(tree.root()), "a: 1, b: a");

    let leading = parse("\n\na: 1\nb: a\n");
    assert!(!leading.has_errors());
    assert_eq!(leading.children(leading.root()).len(), 2);
    assert_eq!(leading.text_content(leading.root()), "a: 1, b: a");
}

#[test]
fn nesting_past_the_limit_is_one_error() {
    let input = "(".repeat(20_000);
    let outcome = Parser::new(&input).parse_block();
    let tree = &outcome.tree;

    let errors = tree.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        tree.node(errors[0]).error.as_deref(),
        Some(format!("nesting deeper than {MAX_NESTING} levels").as_str())
    );
    assert_eq!(outcome.end, input.len());

    let types = format!("x{}number", "^".repeat(20_000));
    assert_eq!(parse(&types).errors().len(), 1);
}

#[test]
fn nesting_up_to_the_limit_parses() {
    let depth = MAX_NESTING - 1;
    let input = format!("{}1{}", "[".repeat(depth).replacen('[', "a[", 1), "]".repeat(depth));
    let tree = parse(&input);
    assert!(!tree.has_errors(), "{:?}", tree.errors());
}

#[test]
fn markup_escapes_leaf_text_and_carries_messages() {
    let tree = parse("\"<&>\"");
    assert_eq!(
        tree.to_markup(tree.root()),
        "<block><expr><string>\"&lt;&amp;&gt;\"</string></expr></block>"
    );

    let broken = parse("(");
    let markup = broken.to_markup(broken.root());
    assert!(
        markup.contains("<error message=\"expected &quot;,&quot; or &quot;)&quot; but reached end of input\">"),
        "unexpected markup: {markup}"
    );
}

#[test]
fn parse_expression_stops_at_a_block_separator() {
    let outcome = Parser::starting_at("a.b, c", 0).parse_expression();
    assert_eq!(outcome.end, 3);
    assert_eq!(outcome.tree.text_content(outcome.tree.root()), "a b");
}

#[test]
fn parse_resumes_from_an_offset() {
    let outcome = Parser::starting_at("ignored, x: 1", 8).parse_block();
    assert!(outcome.end >= 8);
    assert_eq!(outcome.tree.text_content(outcome.tree.root()), "x: 1");
}

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,3}"
}

fn type_expr() -> impl Strategy<Value = String> {
    let path = prop::collection::vec(ident(), 1..3).prop_map(|segments| segments.join("."));
    path.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3)
                .prop_map(|members| format!("({})", members.join(", "))),
            (prop::collection::vec(inner.clone(), 0..3), inner.clone())
                .prop_map(|(members, output)| format!("({})^{}", members.join(","), output)),
            inner.prop_map(|nested| format!("^{nested}")),
        ]
    })
}

fn term() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        ident(),
        "[0-9]{1,3}",
        "\"[a-z ]{0,4}\"",
        type_expr().prop_map(|ty| format!("^{ty}")),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        let expr = prop::collection::vec(inner, 1..3).prop_map(|terms| terms.join(" "));
        prop_oneof![
            prop::collection::vec(expr.clone(), 0..3)
                .prop_map(|members| format!("({})", members.join(", "))),
            expr.prop_map(|inner| format!("[{inner}]")),
        ]
    })
}

fn entry() -> impl Strategy<Value = String> {
    (
        prop::option::of(ident()),
        prop::collection::vec(term(), 1..4),
    )
        .prop_map(|(name, terms)| match name {
            Some(name) => format!("{name}: {}", terms.join(" ")),
            None => terms.join(" "),
        })
}

proptest! {
    #[test]
    fn text_content_reparses_to_the_same_text(
        entries in prop::collection::vec(entry(), 1..3)
    ) {
        let source = entries.join(", ");
        let tree = parse(&source);
        prop_assert!(!tree.has_errors(), "generated source did not parse: {source}");

        let text = tree.text_content(tree.root());
        let reparsed = parse(&text);
        prop_assert!(!reparsed.has_errors(), "rendered text did not parse: {text}");
        prop_assert_eq!(reparsed.text_content(reparsed.root()), text);
    }

    #[test]
    fn parse_end_never_precedes_start(source in "[a-z0-9 ,:^()\\[\\]\"=.]{0,24}", start in 0usize..8) {
        let start = start.min(source.len());
        let outcome = Parser::starting_at(&source, start).parse_block();
        prop_assert!(outcome.end >= start);
        if outcome.tree.has_errors() {
            prop_assert_eq!(outcome.end, source.len());
        }
    }
}
