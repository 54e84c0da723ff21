use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use isoc::pass::PassId;
use isoc::pipeline::{self, CheckOptions, CompilationState, LoadError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    Diagnostics,
    Report,
    Ast,
    Hops,
}

#[derive(Parser, Debug)]
#[command(
    name = "isoc",
    version,
    about = "Actor isolation checker: classifies .adl declarations and validates actor isolation"
)]
struct Cli {
    /// Input .adl source file
    source: PathBuf,

    /// Imported module file (repeatable)
    #[arg(short = 'I', long = "import")]
    imports: Vec<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Diagnostics)]
    emit: EmitStage,

    /// The one foreign base class actors may inherit from
    #[arg(long, default_value = pipeline::DEFAULT_FOREIGN_BASE)]
    foreign_base: String,

    /// Print checker phases and timing
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "isoc=debug" } else { "isoc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!(source = %cli.source.display(), emit = ?cli.emit, "starting");

    // ── Load modules ──
    let mut modules = Vec::new();
    for path in std::iter::once(&cli.source).chain(&cli.imports) {
        match pipeline::load_module(path) {
            Ok(m) => modules.push(m),
            Err(e @ LoadError::Io { .. }) => {
                eprintln!("isoc: error: {}", e);
                return ExitCode::from(2);
            }
            Err(e @ LoadError::Parse { .. }) => {
                eprintln!("isoc: error: {}", e);
                return ExitCode::from(1);
            }
        }
    }

    if cli.emit == EmitStage::Ast {
        for m in &modules {
            println!("// module {}\n{:#?}", m.name, m.program);
        }
        return ExitCode::SUCCESS;
    }

    // ── Check ──
    let options = CheckOptions {
        foreign_base: cli.foreign_base.clone(),
    };
    let mut state = CompilationState::new(modules);
    let print_diags = cli.emit == EmitStage::Diagnostics;
    let outcome = pipeline::run_pipeline(&mut state, PassId::Check, &options, |_, diags| {
        if print_diags {
            for d in diags {
                eprintln!("{}", d);
            }
        }
    });
    if let Err(e) = &outcome {
        tracing::debug!(error = %e, "pipeline stopped");
    }

    match cli.emit {
        EmitStage::Diagnostics => {
            let errors = state.error_count();
            let warnings = state.diagnostics.len() - errors;
            if errors > 0 || warnings > 0 {
                eprintln!("isoc: {} error(s), {} warning(s)", errors, warnings);
            }
        }
        EmitStage::Report => {
            let (Some(table), Some(categories)) = (state.table.as_ref(), state.categories.as_ref())
            else {
                for d in &state.diagnostics {
                    eprintln!("{}", d);
                }
                return ExitCode::from(1);
            };
            let report = isoc::report::build_report(
                table,
                categories,
                state.captures.as_ref(),
                &state.hops,
                &state.diagnostics,
            );
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("isoc: error: {}", e);
                    return ExitCode::from(2);
                }
            }
        }
        EmitStage::Hops => {
            for d in state.diagnostics.iter().filter(|d| d.is_error()) {
                eprintln!("{}", d);
            }
            if let Some(table) = state.table.as_ref() {
                for hop in &state.hops {
                    println!(
                        "{} -> {} on {}",
                        table.decl_path(hop.caller),
                        table.decl_path(hop.target),
                        isoc::report::executor_label(table, hop)
                    );
                }
            }
        }
        EmitStage::Ast => unreachable!("handled before checking"),
    }

    if state.has_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
