//! Assembler errors and their rendering.

use std::ops::Range;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};
use runmod_bytecode::EmitError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsmErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),
    #[error("unknown instruction `{0}`")]
    UnknownMnemonic(String),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("invalid integer `{0}`")]
    InvalidInteger(String),
    #[error("invalid escape in string literal")]
    InvalidEscape,
    #[error("missing `.module` declaration")]
    MissingModule,
    #[error("`.module` declared twice")]
    DuplicateModule,
    #[error("`{0}` is only allowed inside a `.type` block")]
    OutsideType(&'static str),
    #[error("`{0}` is only allowed inside a `.routine` block")]
    OutsideRoutine(String),
    #[error("`{0}` is not allowed inside a `.routine` block")]
    InsideRoutine(&'static str),
    #[error("`.end` without an open block")]
    UnmatchedEnd,
    #[error("block is never closed with `.end`")]
    UnclosedBlock,
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("label `{0}` defined twice")]
    DuplicateLabel(String),
    #[error("unknown parameter `{0}`")]
    UnknownParam(String),
    #[error("call to unknown routine `{0}`")]
    UnresolvedCall(String),
    #[error("entry routine `{0}` is not declared")]
    UnresolvedEntry(String),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Assembler error, located in the source when possible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct AsmError {
    pub kind: AsmErrorKind,
    pub span: Option<Range<usize>>,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, span: Range<usize>) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    pub fn unlocated(kind: AsmErrorKind) -> Self {
        Self { kind, span: None }
    }

    /// Render against the source, annotating the offending span.
    pub fn render(&self, source: &str, path: Option<&str>, colored: bool) -> String {
        let message = self.kind.to_string();
        let Some(span) = &self.span else {
            return format!("error: {message}");
        };

        let renderer = if colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let range = adjust_range(span.clone(), source.len());
        let mut snippet = Snippet::source(source)
            .line_start(1)
            .annotation(AnnotationKind::Primary.span(range).label(&message));
        if let Some(p) = path {
            snippet = snippet.path(p);
        }

        let report = vec![Level::ERROR.primary_title(&message).element(snippet)];
        renderer.render(&report).to_string()
    }
}

impl From<EmitError> for AsmError {
    fn from(err: EmitError) -> Self {
        Self::unlocated(err.into())
    }
}

fn adjust_range(range: Range<usize>, limit: usize) -> Range<usize> {
    if range.start == range.end {
        return range.start..(range.start + 1).min(limit);
    }
    range
}
