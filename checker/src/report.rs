// report.rs: Serializable isolation report
//
// Flattens the checker's artifacts into a stable, name-based JSON document:
// every declaration with its category, every closure with its capture
// result, every executor hop, and every diagnostic.

use serde::Serialize;

use crate::check::{ExecutorHop, HopExecutor};
use crate::classify::Categories;
use crate::decl::{DeclKind, DeclTable};
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::escape::{CaptureResult, EscapeResult};

#[derive(Debug, Clone, Serialize)]
pub struct IsolationReport {
    pub modules: Vec<String>,
    pub declarations: Vec<DeclEntry>,
    pub closures: Vec<ClosureEntry>,
    pub hops: Vec<HopEntry>,
    pub diagnostics: Vec<DiagEntry>,
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclEntry {
    pub module: String,
    pub name: String,
    pub kind: DeclKind,
    #[serde(rename = "async")]
    pub is_async: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosureEntry {
    pub owner: String,
    pub offset: usize,
    pub escaping: bool,
    pub result: CaptureResult,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HopEntry {
    pub caller: String,
    pub target: String,
    pub executor: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagEntry {
    pub code: Option<String>,
    pub kind: &'static str,
    pub level: &'static str,
    pub module: Option<String>,
    pub offset: usize,
    pub message: String,
}

impl DiagEntry {
    pub fn from_diagnostic(d: &Diagnostic) -> Self {
        DiagEntry {
            code: d.code.map(|c| c.0.to_string()),
            kind: d.code.map(codes::kind_name).unwrap_or("Syntax"),
            level: match d.level {
                DiagLevel::Error => "error",
                DiagLevel::Warning => "warning",
            },
            module: d.module.clone(),
            offset: d.span.start,
            message: d.message.clone(),
        }
    }
}

/// Render a hop's executor, e.g. `BankAccount@to` or `UIActor.shared`.
pub fn executor_label(table: &DeclTable, hop: &ExecutorHop) -> String {
    match &hop.executor {
        HopExecutor::Instance { actor, receiver } => {
            format!("{}@{}", table.ty(*actor).name, receiver)
        }
        HopExecutor::Global { actor } => format!("{}.shared", table.ty(*actor).name),
    }
}

/// Build the report. `captures` may be absent when the pipeline stopped early.
pub fn build_report(
    table: &DeclTable,
    categories: &Categories,
    captures: Option<&EscapeResult>,
    hops: &[ExecutorHop],
    diagnostics: &[Diagnostic],
) -> IsolationReport {
    let declarations = categories
        .iter()
        .map(|(id, category)| {
            let decl = table.decl(id);
            DeclEntry {
                module: table.module_name(decl.module).to_string(),
                name: table.decl_path(id),
                kind: decl.kind,
                is_async: decl.is_async(),
                is_static: decl.is_static,
                category: table.category_tag(category),
            }
        })
        .collect();

    let closures = captures
        .map(|e| {
            e.captures()
                .iter()
                .map(|c| {
                    let info = table.closure(c.closure);
                    ClosureEntry {
                        owner: table.decl_path(info.owner),
                        offset: info.span.start,
                        escaping: c.escaping,
                        result: c.result(),
                        category: table.category_tag(c.isolation),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let hops = hops
        .iter()
        .map(|h| HopEntry {
            caller: table.decl_path(h.caller),
            target: table.decl_path(h.target),
            executor: executor_label(table, h),
            offset: h.span.start,
        })
        .collect();

    IsolationReport {
        modules: table.modules.iter().map(|m| m.name.clone()).collect(),
        declarations,
        closures,
        hops,
        diagnostics: diagnostics.iter().map(DiagEntry::from_diagnostic).collect(),
        accepted: !diagnostics.iter().any(|d| d.is_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{check_modules, parse_module, CheckOptions};

    #[test]
    fn report_lists_declarations_and_hops() {
        let module = parse_module(
            "Bank",
            "actor Account { var balance: Double\n\
               async func deposit() { write balance }\n\
               async func send(to: Account) { await to.deposit() } }",
        )
        .expect("parse");
        let state = check_modules(vec![module], &CheckOptions::default());
        let table = state.table.as_ref().expect("table");
        let report = build_report(
            table,
            state.categories.as_ref().expect("categories"),
            state.captures.as_ref(),
            &state.hops,
            &state.diagnostics,
        );
        assert!(report.accepted);
        assert_eq!(report.modules, vec!["Bank".to_string()]);
        assert_eq!(report.declarations.len(), 3);
        assert!(report
            .declarations
            .iter()
            .all(|d| d.category == "instance(Account)"));
        assert_eq!(report.hops.len(), 1);
        assert_eq!(report.hops[0].executor, "Account@to");

        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["declarations"][0]["name"], "Account.balance");
        assert_eq!(json["declarations"][1]["async"], true);
    }
}
