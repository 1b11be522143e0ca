// diag.rs — Unified diagnostics model
//
// Provides the shared diagnostic types used by the loader, the IR validator,
// the expression parser and code generation.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::expr::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0110`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
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

    // Loading
    pub const E0001: DiagCode = DiagCode("E0001"); // IR document unreadable
    pub const E0002: DiagCode = DiagCode("E0002"); // IR document malformed

    // IR well-formedness
    pub const E0101: DiagCode = DiagCode("E0101"); // relation name is not an identifier
    pub const E0102: DiagCode = DiagCode("E0102"); // relation declared twice
    pub const E0103: DiagCode = DiagCode("E0103"); // scanner target not scannable
    pub const E0104: DiagCode = DiagCode("E0104"); // port outside owner's vocabulary
    pub const E0105: DiagCode = DiagCode("E0105"); // map arity is zero
    pub const E0106: DiagCode = DiagCode("E0106"); // parameter reference out of range
    pub const E0107: DiagCode = DiagCode("E0107"); // element missing from strata
    pub const E0108: DiagCode = DiagCode("E0108"); // element or stratum listed twice
    pub const E0109: DiagCode = DiagCode("E0109"); // malformed lookup table
    pub const W0110: DiagCode = DiagCode("W0110"); // edge sourced at a table
    pub const E0111: DiagCode = DiagCode("E0111"); // free name shadowed by a factory local

    // Expressions
    pub const E0201: DiagCode = DiagCode("E0201"); // expression syntax error

    // Code generation
    pub const E0701: DiagCode = DiagCode("E0701"); // element name collision
    pub const E0702: DiagCode = DiagCode("E0702"); // internal: port vocabulary violation
    pub const E0703: DiagCode = DiagCode("E0703"); // internal: dangling element reference
    pub const E0704: DiagCode = DiagCode("E0704"); // internal: scanner over non-scannable
    pub const E0705: DiagCode = DiagCode("E0705"); // factory name is not an identifier
    pub const E0706: DiagCode = DiagCode("E0706"); // internal: relation map points at wrong variant
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any phase.
///
/// `subject` names the element the diagnostic is about (its external name
/// when known). `span` is a byte range inside that element's expression
/// source, set only for expression diagnostics.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub subject: Option<String>,
    pub span: Option<Span>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, subject, span, or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            subject: None,
            span: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the element this diagnostic is about.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

/// True if any diagnostic in `diags` is error-level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        match &self.code {
            Some(code) => write!(f, "{}[{}]: ", level, code)?,
            None => write!(f, "{}: ", level)?,
        }
        if let Some(subject) = &self.subject {
            write!(f, "element {}: ", subject)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(span) = &self.span {
            write!(f, " (at {}..{})", span.start, span.end)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_code() {
        let d = Diagnostic::error("something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code_and_subject() {
        let d = Diagnostic::warning("edge is never subscribed")
            .with_code(codes::W0110)
            .with_subject("t");
        assert_eq!(
            format!("{d}"),
            "warning[W0110]: element t: edge is never subscribed"
        );
    }

    #[test]
    fn display_with_span_and_hint() {
        let span: Span = (2..4).into();
        let d = Diagnostic::error("unexpected token")
            .with_code(codes::E0201)
            .with_span(span)
            .with_hint("parameters are written $0, $1, ...");
        assert_eq!(
            format!("{d}"),
            "error[E0201]: unexpected token (at 2..4)\n  hint: parameters are written $0, $1, ..."
        );
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let diags = vec![Diagnostic::warning("w")];
        assert!(!has_errors(&diags));
        let diags = vec![Diagnostic::warning("w"), Diagnostic::error("e")];
        assert!(has_errors(&diags));
    }
}
