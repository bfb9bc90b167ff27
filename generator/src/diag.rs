// diag.rs — Error taxonomy and diagnostics model
//
// `GenError` is the single error type returned by every library entry point.
// Each variant carries a stable `DiagCode` and converts into a `Diagnostic`
// with a primary span, optional related spans and a hint, which is what the
// CLI prints.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use chumsky::span::Span as _;
use thiserror::Error;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `E0104`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // E00xx: syntax
    pub const E0001: DiagCode = DiagCode("E0001");

    // E01xx: interface resolution
    pub const E0100: DiagCode = DiagCode("E0100");
    pub const E0101: DiagCode = DiagCode("E0101");
    pub const E0102: DiagCode = DiagCode("E0102");
    pub const E0103: DiagCode = DiagCode("E0103");
    pub const E0104: DiagCode = DiagCode("E0104");
    pub const E0105: DiagCode = DiagCode("E0105");
    pub const E0106: DiagCode = DiagCode("E0106");

    // E02xx: record-based synthesis
    pub const E0200: DiagCode = DiagCode("E0200");
    pub const E0201: DiagCode = DiagCode("E0201");
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A rendered-ready error diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    /// `None` for errors that are not tied to a source location.
    pub span: Option<Span>,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    pub fn new(span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            code: None,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    /// Format with `line:col` locations resolved against `source`.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut out = self.to_string();
        if let Some(span) = self.span {
            let (line, col) = line_col(source, span.start());
            out = format!("{line}:{col}: {out}");
        }
        for related in &self.related_spans {
            let (line, col) = line_col(source, related.span.start());
            out.push_str(&format!("\n  note: {line}:{col}: {}", related.label));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "error[{}]: {}", code, self.message)?;
        } else {
            write!(f, "error: {}", self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// 1-based line and column of a byte offset. Offsets past the end clamp to
/// the last position.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let col = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, col)
}

// ── Error taxonomy ───────────────────────────────────────────────────────

/// One syntax error from the lexer or parser.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
}

/// Every way generation can fail on malformed input or configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenError {
    #[error("source does not parse: {}", .errors.first().map(|e| e.message.as_str()).unwrap_or("no output"))]
    Parse { errors: Vec<SyntaxError> },

    #[error("no interface name given")]
    MissingInterfaceName,

    #[error("interface '{name}' not found")]
    InterfaceNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("'{name}' is not an interface (it is {kind})")]
    NotAnInterface {
        name: String,
        kind: &'static str,
        span: Span,
    },

    #[error("cannot resolve embedded interface '{embed}' in '{interface}'")]
    UnresolvableEmbedding {
        interface: String,
        embed: String,
        span: Span,
    },

    #[error("cyclic embedding: {}", .path.join(" -> "))]
    CyclicEmbedding { path: Vec<String>, span: Span },

    #[error("method '{method}' reached twice with different signatures in '{interface}'")]
    DuplicateMethodName {
        interface: String,
        method: String,
        first: Span,
        second: Span,
    },

    #[error("type '{name}' declared more than once")]
    DuplicateDeclaration {
        name: String,
        first: Span,
        second: Span,
    },

    #[error("record type '{name}' not found")]
    RecordTypeNotFound { name: String },

    #[error("'{name}' is not a record type (it is {kind})")]
    NotARecordType {
        name: String,
        kind: &'static str,
        span: Span,
    },
}

impl GenError {
    pub fn code(&self) -> DiagCode {
        match self {
            GenError::Parse { .. } => codes::E0001,
            GenError::MissingInterfaceName => codes::E0100,
            GenError::InterfaceNotFound { .. } => codes::E0101,
            GenError::NotAnInterface { .. } => codes::E0102,
            GenError::UnresolvableEmbedding { .. } => codes::E0103,
            GenError::CyclicEmbedding { .. } => codes::E0104,
            GenError::DuplicateMethodName { .. } => codes::E0105,
            GenError::DuplicateDeclaration { .. } => codes::E0106,
            GenError::RecordTypeNotFound { .. } => codes::E0200,
            GenError::NotARecordType { .. } => codes::E0201,
        }
    }

    /// Convert into diagnostics. Parse failures yield one per syntax error;
    /// everything else yields exactly one.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        let base = |span: Option<Span>, message: String| {
            Diagnostic::new(span, message).with_code(self.code())
        };
        match self {
            GenError::Parse { errors } => errors
                .iter()
                .map(|e| base(Some(e.span), e.message.clone()))
                .collect(),
            GenError::MissingInterfaceName => vec![base(None, self.to_string())
                .with_hint("pass --interface <Name>, or --record <Struct> to fake a struct's methods")],
            GenError::InterfaceNotFound { available, .. } => {
                let d = base(None, self.to_string());
                let d = if available.is_empty() {
                    d.with_hint("the source declares no interface types")
                } else {
                    d.with_hint(format!("interfaces in this file: {}", available.join(", ")))
                };
                vec![d]
            }
            GenError::NotAnInterface { span, .. } => vec![base(Some(*span), self.to_string())],
            GenError::UnresolvableEmbedding { span, embed, .. } => {
                let d = base(Some(*span), self.to_string());
                let d = if embed.contains('.') {
                    d.with_hint("interfaces from other packages cannot be flattened; declare the methods inline")
                } else {
                    d
                };
                vec![d]
            }
            GenError::CyclicEmbedding { span, .. } => vec![base(Some(*span), self.to_string())],
            GenError::DuplicateMethodName { first, second, .. } => vec![base(Some(*second), self.to_string())
                .with_related(*first, "first declared here")],
            GenError::DuplicateDeclaration { first, second, .. } => vec![base(Some(*second), self.to_string())
                .with_related(*first, "first declared here")],
            GenError::RecordTypeNotFound { .. } => vec![base(None, self.to_string())],
            GenError::NotARecordType { span, .. } => vec![base(Some(*span), self.to_string())],
        }
    }
}
