use std::fmt;

use serde::Serialize;

use crate::ast::Span;

/// Severity shared by diagnostics and value-graph notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    #[serde(rename = "warn")]
    Warning,
    Info,
    Debug,
}

impl DiagnosticLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warn",
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub level: DiagnosticLevel,
    pub span: Option<Span>,
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push<S: Into<String>>(&mut self, level: DiagnosticLevel, message: S) {
        self.push_with_span(level, message, None);
    }

    pub fn push_error_with_span<S: Into<String>>(&mut self, message: S, span: Option<Span>) {
        self.push_with_span(DiagnosticLevel::Error, message, span);
    }

    pub fn push_with_span<S: Into<String>>(
        &mut self,
        level: DiagnosticLevel,
        message: S,
        span: Option<Span>,
    ) {
        self.entries.push(Diagnostic {
            message: message.into(),
            level,
            span,
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
            .count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
