use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use quill_compiler::{
    parse, CompileOptions, Compiler, Diagnostic, DiagnosticLevel, Diagnostics, SourceFile,
    SourceId, Value,
};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AFTER_HELP: &str = "\
Examples:
  quill parse 'a.b(1, \"x\")'
  quill check --file shapes.ql --strict

Set QUILL_LOG (e.g. QUILL_LOG=debug) to trace compilation.";

#[derive(Parser)]
#[command(
    name = "quill",
    version,
    about = "Parse and type-check quill expressions.",
    after_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parse tree of an expression.
    Parse(ParseArgs),
    /// Compile an expression and print its value, type and constant.
    Check(CheckArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Expression text.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    expr: Option<String>,

    /// Read the expression from a file instead.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ParseArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print the tree as tag markup instead of source text.
    #[arg(long)]
    markup: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Fail when the expression has errors.
    #[arg(long)]
    strict: bool,

    /// Print the parse tree markup to the log before compiling.
    #[arg(long)]
    markup: bool,

    /// Emit a JSON report instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    value: String,
    #[serde(rename = "type")]
    ty: Option<String>,
    pure: Option<serde_json::Value>,
    diagnostics: &'a [Diagnostic],
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Parse(args) => run_parse(&args),
        Command::Check(args) => run_check(&args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_source(input: &InputArgs) -> Result<SourceFile> {
    match (&input.expr, &input.file) {
        (_, Some(path)) => {
            let contents =
                fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
            Ok(SourceFile::new(SourceId(0), path.clone(), contents))
        }
        (Some(expr), None) => Ok(SourceFile::inline(expr.clone())),
        (None, None) => bail!("an expression or --file is required"),
    }
}

fn run_parse(args: &ParseArgs) -> Result<()> {
    let source = load_source(&args.input)?;
    let tree = parse(&source.contents);
    let root = tree.root();
    if args.markup {
        println!("{}", tree.to_markup(root));
    } else {
        println!("{}", tree.text_content(root));
    }

    if tree.has_errors() {
        let mut diagnostics = Diagnostics::new();
        for id in tree.errors() {
            let node = tree.node(id);
            let message = node.error.clone().unwrap_or_default();
            diagnostics.push_error_with_span(message, Some(node.span));
        }
        report_diagnostics(&source, &diagnostics);
        bail!("Parsing failed");
    }
    Ok(())
}

fn run_check(args: &CheckArgs) -> Result<()> {
    let source = load_source(&args.input)?;
    let mut compiler = Compiler::new(CompileOptions {
        dump_tree: args.markup,
        strict: args.strict,
    });

    let compilation = match compiler.compile(&source) {
        Ok(compilation) => compilation,
        Err(err) => {
            report_diagnostics(&source, compiler.diagnostics());
            return Err(err.context("Compilation failed"));
        }
    };

    if args.json {
        let report = build_report(&compilation.value, compilation.diagnostics.entries());
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{rendered}");
        return Ok(());
    }

    print_value(&compilation.value);
    report_diagnostics(&source, &compilation.diagnostics);
    Ok(())
}

fn build_report<'a>(value: &Value, diagnostics: &'a [Diagnostic]) -> Report<'a> {
    Report {
        value: value.to_string(),
        ty: value.ty().map(|ty| ty.describe()),
        pure: value.pure().map(|pure| pure.to_json()),
        diagnostics,
    }
}

fn print_value(value: &Value) {
    println!("value: {value}");
    match value.ty() {
        Some(ty) => println!("type:  {ty}"),
        None => println!("type:  (dynamic)"),
    }
    match value.pure() {
        Some(pure) => println!("pure:  {}", pure.to_json()),
        None => println!("pure:  (none)"),
    }
}

fn report_diagnostics(source: &SourceFile, diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    let lines: Vec<&str> = source.contents.lines().collect();
    eprintln!("Diagnostics:");
    for diagnostic in diagnostics.entries() {
        print_diagnostic(source, &lines, diagnostic);
    }
}

fn print_diagnostic(source: &SourceFile, lines: &[&str], diagnostic: &Diagnostic) {
    let (level_label, level_marker) = match diagnostic.level {
        DiagnosticLevel::Error => ("error", "  -"),
        DiagnosticLevel::Warning => ("warning", "  ~"),
        DiagnosticLevel::Info => ("info", "  *"),
        DiagnosticLevel::Debug => ("debug", "  ."),
    };
    eprintln!("{} {}: {}", level_marker, level_label, diagnostic.message);
    let Some(span) = diagnostic.span else {
        return;
    };

    let (line, column) = source.location(span.start);
    let (end_line, end_column) = source.location(span.end);
    eprintln!("     --> {}:{}:{}", source.name(), line, column);

    if let Some(raw_line) = lines.get(line.saturating_sub(1)) {
        let display_line = raw_line.replace('\t', "    ");
        eprintln!("      {}", display_line);

        let mut caret_line = String::from("      ");
        for ch in raw_line.chars().take(column.saturating_sub(1)) {
            match ch {
                '\t' => caret_line.push_str("    "),
                _ => caret_line.push(' '),
            }
        }

        let highlight_len = if end_line == line {
            end_column.saturating_sub(column)
        } else {
            display_line
                .chars()
                .count()
                .saturating_sub(column.saturating_sub(1))
        };
        caret_line.push_str(&"^".repeat(highlight_len.max(1)));
        eprintln!("{}", caret_line);
    }
}
