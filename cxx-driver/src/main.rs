use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;

#[derive(Parser)]
#[command(name = "cxxc")]
#[command(version)]
#[command(about = "A C++20 subset compiler core: parses, instantiates templates, lowers to IR, and emits a relocatable object file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a translation unit to a relocatable object file
    Compile {
        /// Input source file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output object file (defaults to INPUT with its extension replaced by .o/.obj)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Target triple; only the x86-64 Windows/MSVC and x86-64 Linux/SysV
        /// pairs are understood, everything else falls back to the host
        #[arg(long, value_name = "TRIPLE")]
        target: Option<String>,

        /// Emit debug-friendly, unoptimized code paths
        #[arg(short = 'g', long)]
        debug: bool,

        /// Additional include search paths (accepted for CLI compatibility; this
        /// core does not resolve #include directives)
        #[arg(short = 'I', long = "include", value_name = "PATH")]
        include_paths: Vec<PathBuf>,
    },
    /// Lower a translation unit's functions to IR and print them
    EmitIr {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Parse a translation unit and print its AST
    EmitAst {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print as JSON instead of the debug representation
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Compile { input, output, target, debug, include_paths } => {
            if !include_paths.is_empty() {
                debug!("ignoring {} include path(s); this core does not resolve #include", include_paths.len());
            }
            cxx_driver::compile(input, output.as_deref(), target.as_deref(), *debug).map(|_| ())
        }
        Commands::EmitIr { input } => cxx_driver::emit_ir(input),
        Commands::EmitAst { input, json } => cxx_driver::emit_ast(input, *json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err:#}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}
