// isoc: actor isolation checker
//
// Library root. Front end (lexer, parser, ast), declaration model (resolve,
// decl, hir, registry), and the isolation passes (classify, escape, check).

pub mod ast;
pub mod check;
pub mod classify;
pub mod decl;
pub mod diag;
pub mod escape;
pub mod hir;
pub mod id;
pub mod isolation;
pub mod lexer;
pub mod parser;
pub mod pass;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod resolve;
