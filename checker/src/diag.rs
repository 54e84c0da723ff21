// diag.rs: Unified diagnostics model
//
// Provides the shared diagnostic types used across all checker passes, plus
// the stable diagnostic codes.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0200`).
///
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable diagnostic codes, grouped by the pass that emits them.
pub mod codes {
    use super::DiagCode;

    // ── Resolve: names ──
    pub const E0001: DiagCode = DiagCode("E0001"); // unknown type
    pub const E0002: DiagCode = DiagCode("E0002"); // unknown name or member
    pub const E0003: DiagCode = DiagCode("E0003"); // duplicate declaration
    pub const E0004: DiagCode = DiagCode("E0004"); // `self` outside a type

    // ── Resolve / classify: attributes and inheritance ──
    pub const E0100: DiagCode = DiagCode("E0100"); // attribute conflict (explicit)
    pub const E0101: DiagCode = DiagCode("E0101"); // attribute conflict (propagated)
    pub const E0102: DiagCode = DiagCode("E0102"); // inheritance mismatch
    pub const E0103: DiagCode = DiagCode("E0103"); // global actor without singleton

    // ── Check: isolation ──
    pub const E0200: DiagCode = DiagCode("E0200"); // isolation access violation
    pub const E0201: DiagCode = DiagCode("E0201"); // inout across suspension
    pub const E0202: DiagCode = DiagCode("E0202"); // invalid override isolation
    pub const E0203: DiagCode = DiagCode("E0203"); // invalid witness isolation

    /// Taxonomy name for a code, used in reports.
    pub fn kind_name(code: DiagCode) -> &'static str {
        match code.0 {
            "E0001" | "E0002" | "E0003" | "E0004" => "NameResolution",
            "E0100" | "E0101" | "E0103" => "AttributeConflict",
            "E0102" => "InheritanceMismatch",
            "E0200" => "IsolationAccessViolation",
            "E0201" => "InoutAcrossSuspension",
            "E0202" => "InvalidOverrideIsolation",
            "E0203" => "InvalidWitnessIsolation",
            _ => "Unknown",
        }
    }
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Cause record ─────────────────────────────────────────────────────────

/// One link in a cause chain explaining a propagated isolation failure.
#[derive(Debug, Clone)]
pub struct CauseRecord {
    pub message: String,
    pub span: Option<Span>,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A checker diagnostic emitted by any pass.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// Module (source file) the primary span belongs to.
    pub module: Option<String>,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
    pub cause_chain: Vec<CauseRecord>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, related spans, or causes.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            module: None,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
            cause_chain: Vec::new(),
        }
    }

    /// Shorthand for an error-level diagnostic with a code.
    pub fn error(code: DiagCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message).with_code(code)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the owning module name.
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    /// Attach a cause record to the chain.
    pub fn with_cause(mut self, message: impl Into<String>, span: Option<Span>) -> Self {
        self.cause_chain.push(CauseRecord {
            message: message.into(),
            span,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(module) = &self.module {
            write!(f, "\n  --> {}:{}", module, self.span.start)?;
        }
        for cause in &self.cause_chain {
            write!(f, "\n  note: {}", cause.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
