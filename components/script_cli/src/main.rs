//! Loomscript runtime CLI.
//!
//! Entry point for the script runtime. Parses CLI arguments and delegates
//! to the Runtime for execution.

use clap::Parser;
use script_cli::{repl, Cli, CliError, Runtime};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut runtime = Runtime::new().with_print_bytecode(cli.print_bytecode);

    if let Some(file) = cli.file {
        match runtime.execute_file(&file) {
            Ok(result) => {
                if !matches!(result, core_types::Value::Empty) {
                    println!("{}", result);
                }
            }
            Err(CliError::Io(e)) => {
                eprintln!("Error: could not read file '{}': {}", file, e);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else if let Some(code) = cli.eval {
        match runtime.execute_string(&code) {
            Ok(result) => {
                if !matches!(result, core_types::Value::Empty) {
                    println!("{}", result);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else if cli.repl {
        repl::run_repl(&mut runtime)?;
    } else {
        println!("Loomscript runtime v0.1.0");
        println!();
        println!("Usage:");
        println!("  loomscript --file <FILE>    Execute a script file");
        println!("  loomscript --eval <CODE>    Evaluate inline script code");
        println!("  loomscript --repl           Start interactive REPL");
        println!();
        println!("Run 'loomscript --help' for more options.");
    }

    Ok(())
}
