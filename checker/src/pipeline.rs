// pipeline.rs: Compilation state and pass orchestration
//
// Loads and parses module files, holds all pass artifacts, and runs the
// minimal set of passes for a given terminal PassId.
//
// Preconditions: modules are parsed before calling run_pipeline.
// Postconditions: all artifacts for required passes are populated, or has_error is set.
// Failure modes: I/O or syntax errors while loading (LoadError); any pass
//                emitting error-level diagnostics (PipelineError).
// Side effects: calls on_pass_complete callback after each pass for immediate display.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::check::ExecutorHop;
use crate::classify::Categories;
use crate::decl::DeclTable;
use crate::diag::Diagnostic;
use crate::escape::EscapeResult;
use crate::pass::{descriptor, required_passes, PassId};
use crate::registry::GlobalActorRegistry;
use crate::resolve::SourceModule;

/// Name of the one foreign class actors may inherit from, unless overridden.
pub const DEFAULT_FOREIGN_BASE: &str = "NSObject";

// ── Options ────────────────────────────────────────────────────────────────

/// Checker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// The single foreign base class an actor may inherit from.
    pub foreign_base: String,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            foreign_base: DEFAULT_FOREIGN_BASE.to_string(),
        }
    }
}

// ── Loading ────────────────────────────────────────────────────────────────

/// Errors that can occur while loading a module file.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        messages: Vec<String>,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            LoadError::Parse { path, messages } => {
                write!(f, "{}: {} syntax error(s)", path.display(), messages.len())?;
                for m in messages {
                    write!(f, "\n  {}", m)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { .. } => None,
        }
    }
}

/// Parse one module from source text. The `module` header names the module;
/// otherwise `default_name` is used.
pub fn parse_module(default_name: &str, source: &str) -> Result<SourceModule, Vec<String>> {
    let result = crate::parser::parse(source);
    if !result.errors.is_empty() {
        return Err(result.errors.iter().map(|e| e.to_string()).collect());
    }
    let program = result
        .program
        .ok_or_else(|| vec!["parse failed with no output".to_string()])?;
    let name = program
        .module
        .as_ref()
        .map(|m| m.name.clone())
        .unwrap_or_else(|| default_name.to_string());
    Ok(SourceModule { name, program })
}

/// Read and parse a module file. The default module name is the file stem.
pub fn load_module(path: &Path) -> Result<SourceModule, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let module = parse_module(&stem, &source).map_err(|messages| LoadError::Parse {
        path: path.to_path_buf(),
        messages,
    })?;
    tracing::debug!(path = %path.display(), module = %module.name, items = module.program.items.len(), "loaded module");
    Ok(module)
}

// ── Artifact storage ───────────────────────────────────────────────────────

/// Holds all checker artifacts and accumulated diagnostics.
pub struct CompilationState {
    pub modules: Vec<SourceModule>,
    pub table: Option<DeclTable>,
    pub registry: Option<GlobalActorRegistry>,
    pub categories: Option<Categories>,
    pub captures: Option<EscapeResult>,
    pub hops: Vec<ExecutorHop>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl CompilationState {
    pub fn new(modules: Vec<SourceModule>) -> Self {
        Self {
            modules,
            table: None,
            registry: None,
            categories: None,
            captures: None,
            hops: Vec::new(),
            diagnostics: Vec::new(),
            has_error: false,
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

// ── Error type ─────────────────────────────────────────────────────────────

/// Pipeline execution failed due to error-level diagnostics in a pass.
/// The specific diagnostics are available in `CompilationState.diagnostics`.
#[derive(Debug)]
pub struct PipelineError {
    /// The pass that produced the error.
    pub failing_pass: PassId,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reported errors", descriptor(self.failing_pass).name)
    }
}

impl std::error::Error for PipelineError {}

/// Per-pass post-processing: callback, accumulate, log, error check.
/// Returns whether the pass reported errors.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> bool {
    on_pass_complete(pass_id, &diags);
    let is_err = diags.iter().any(|d| d.is_error());
    tracing::debug!(
        pass = descriptor(pass_id).name,
        diagnostics = diags.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "pass complete"
    );
    state.diagnostics.extend(diags);
    if is_err {
        state.has_error = true;
    }
    is_err
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → log → error check.
/// A failing pass whose descriptor halts on error stops the run; otherwise
/// later passes still run so their diagnostics are collected too.
///
/// Preconditions: `state.modules` holds every parsed module.
/// Postconditions: artifacts for all passes in `required_passes(terminal)` are populated,
///   or `state.has_error` is true.
/// Failure modes: any pass producing error-level diagnostics; the error
///   names the first one.
/// Side effects: calls `on_pass_complete` after each pass.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    options: &CheckOptions,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    let mut first_failure = None;
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        let diags = match pass_id {
            PassId::Resolve => {
                let result = crate::resolve::resolve(&state.modules, options);
                state.table = Some(result.table);
                state.registry = Some(result.registry);
                result.diagnostics
            }
            PassId::Classify => {
                let Some(table) = state.table.as_ref() else {
                    unreachable!("classify runs after resolve");
                };
                let result = crate::classify::classify_all(table);
                state.categories = Some(result.categories);
                result.diagnostics
            }
            PassId::Escape => {
                let (Some(table), Some(categories)) =
                    (state.table.as_ref(), state.categories.as_ref())
                else {
                    unreachable!("escape runs after classify");
                };
                state.captures = Some(crate::escape::analyze_all(table, categories));
                Vec::new()
            }
            PassId::Check => {
                let (Some(table), Some(categories), Some(captures)) = (
                    state.table.as_ref(),
                    state.categories.as_ref(),
                    state.captures.as_ref(),
                ) else {
                    unreachable!("check runs after escape");
                };
                let result = crate::check::check(table, categories, captures);
                state.hops = result.hops;
                result.diagnostics
            }
        };
        if finish_pass(state, pass_id, diags, t.elapsed(), &mut on_pass_complete) {
            first_failure.get_or_insert(pass_id);
            if descriptor(pass_id).halts_on_error {
                break;
            }
        }
    }
    match first_failure {
        Some(failing_pass) => Err(PipelineError { failing_pass }),
        None => Ok(()),
    }
}

/// Run every pass over `modules` and return the final state.
pub fn check_modules(modules: Vec<SourceModule>, options: &CheckOptions) -> CompilationState {
    let mut state = CompilationState::new(modules);
    if let Err(e) = run_pipeline(&mut state, PassId::Check, options, |_, _| {}) {
        tracing::debug!(error = %e, "pipeline stopped");
    }
    state
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::codes;

    fn module(src: &str) -> SourceModule {
        parse_module("Main", src).expect("parse")
    }

    #[test]
    fn module_header_names_the_module() {
        let m = parse_module("file", "module Bank\nactor A { }").expect("parse");
        assert_eq!(m.name, "Bank");
        let m = parse_module("file", "actor A { }").expect("parse");
        assert_eq!(m.name, "file");
    }

    #[test]
    fn syntax_errors_are_reported() {
        let errors = parse_module("file", "actor { }").expect_err("should fail");
        assert!(!errors.is_empty());
    }

    #[test]
    fn pipeline_runs_all_passes_in_order() {
        let mut state = CompilationState::new(vec![module("actor A { var n: Int }")]);
        let mut seen = Vec::new();
        run_pipeline(&mut state, PassId::Check, &CheckOptions::default(), |p, _| {
            seen.push(p)
        })
        .expect("no errors");
        assert_eq!(
            seen,
            vec![PassId::Resolve, PassId::Classify, PassId::Escape, PassId::Check]
        );
        assert!(state.categories.is_some());
        assert!(state.captures.is_some());
    }

    #[test]
    fn pipeline_stops_at_first_failing_pass() {
        let mut state = CompilationState::new(vec![module("class C : Missing { }")]);
        let err = run_pipeline(&mut state, PassId::Check, &CheckOptions::default(), |_, _| {})
            .expect_err("resolve fails");
        assert_eq!(err.failing_pass, PassId::Resolve);
        assert!(state.has_error);
        assert!(state.categories.is_none());
    }

    #[test]
    fn classify_errors_do_not_hide_access_violations() {
        let mut state = CompilationState::new(vec![module(
            "global actor Red { static let shared: Red }\n\
             global actor Blue { static let shared: Blue }\n\
             @Red class Base { }\n\
             @Blue class Derived : Base { }\n\
             actor A { var n: Int }\n\
             func peek(a: A) { read a.n }",
        )]);
        let mut seen = Vec::new();
        let err = run_pipeline(&mut state, PassId::Check, &CheckOptions::default(), |p, _| {
            seen.push(p)
        })
        .expect_err("classify fails");
        assert_eq!(err.failing_pass, PassId::Classify);
        assert_eq!(seen.len(), 4);
        let found: Vec<_> = state.diagnostics.iter().filter_map(|d| d.code).collect();
        assert!(found.contains(&codes::E0101), "{found:?}");
        assert!(found.contains(&codes::E0200), "{found:?}");
    }

    #[test]
    fn classify_terminal_skips_check() {
        let mut state = CompilationState::new(vec![module("actor A { }")]);
        run_pipeline(&mut state, PassId::Classify, &CheckOptions::default(), |_, _| {})
            .expect("no errors");
        assert!(state.categories.is_some());
        assert!(state.captures.is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_module(Path::new("/nonexistent/file.adl")).expect_err("missing");
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
