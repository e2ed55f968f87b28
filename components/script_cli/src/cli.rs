//! Command-line argument definitions.

use clap::Parser;

/// Loomscript runtime command line.
#[derive(Debug, Parser)]
#[command(name = "loomscript", version, about = "Loomscript runtime")]
pub struct Cli {
    /// Script file to execute.
    #[arg(long, short = 'f')]
    pub file: Option<String>,

    /// Inline source to evaluate.
    #[arg(long, short = 'e')]
    pub eval: Option<String>,

    /// Start an interactive REPL.
    #[arg(long)]
    pub repl: bool,

    /// Print compiled bytecode before executing.
    #[arg(long)]
    pub print_bytecode: bool,
}
