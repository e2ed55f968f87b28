//! REPL (Read-Eval-Print Loop) implementation.

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use core_types::Value;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive REPL.
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Repl(format!("failed to initialize editor: {}", e)))?;

    println!("Loomscript runtime v0.1.0");
    println!("Type script code, or 'exit' to quit.");
    println!();

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "... " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() && (trimmed == "exit" || trimmed == "quit") {
                    break;
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if !is_input_complete(&buffer) {
                    continue;
                }

                let source = std::mem::take(&mut buffer);
                let _ = editor.add_history_entry(&source);

                match runtime.execute_string(&source) {
                    Ok(Value::Empty) => {}
                    Ok(value) => println!("{}", value),
                    Err(err) => eprintln!("{}", err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                return Err(CliError::Repl(format!("readline failed: {}", err)));
            }
        }
    }

    Ok(())
}

/// Heuristic: input is complete once braces and parentheses balance outside
/// of string literals.
fn is_input_complete(source: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in source.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    depth <= 0 && !in_string
}
