//! Default native functions for the Loomscript runtime.
//!
//! Console output plus the small string and math helpers scripts lean on.
//! Everything here goes through the interpreter's native registry; nothing
//! in this crate touches engine internals.
//!
//! # Example
//!
//! ```
//! use interpreter::Vm;
//!
//! let mut vm = Vm::new();
//! builtins::install(&mut vm);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use core_types::Value;
use interpreter::{NativeOutcome, Vm};

/// Register the default natives onto a VM.
pub fn install(vm: &mut Vm) {
    vm.register_native("echo", |vm, args| {
        let mut line = String::new();
        for value in args {
            line.push_str(&value.to_string());
        }
        vm.echo(&line);
        Ok(NativeOutcome::Value(Value::Empty))
    });

    vm.register_native("strLen", |_vm, args| {
        let s = arg_string(args, 0);
        Ok(NativeOutcome::Value(Value::Number(s.chars().count() as f64)))
    });

    vm.register_native("getSubStr", |_vm, args| {
        let s = arg_string(args, 0);
        let start = arg_number(args, 1).max(0.0) as usize;
        let len = arg_number(args, 2).max(0.0) as usize;
        let out: String = s.chars().skip(start).take(len).collect();
        Ok(NativeOutcome::Value(Value::String(out)))
    });

    vm.register_native("strUpr", |_vm, args| {
        Ok(NativeOutcome::Value(Value::String(
            arg_string(args, 0).to_uppercase(),
        )))
    });

    vm.register_native("strLwr", |_vm, args| {
        Ok(NativeOutcome::Value(Value::String(
            arg_string(args, 0).to_lowercase(),
        )))
    });

    vm.register_native("mAbs", |_vm, args| {
        Ok(NativeOutcome::Value(Value::Number(arg_number(args, 0).abs())))
    });

    vm.register_native("mFloor", |_vm, args| {
        Ok(NativeOutcome::Value(Value::Number(
            arg_number(args, 0).floor(),
        )))
    });

    vm.register_native("mCeil", |_vm, args| {
        Ok(NativeOutcome::Value(Value::Number(
            arg_number(args, 0).ceil(),
        )))
    });
}

fn arg_string(args: &[Value], index: usize) -> String {
    args.get(index).map(|v| v.to_string()).unwrap_or_default()
}

fn arg_number(args: &[Value], index: usize) -> f64 {
    args.get(index).map(|v| v.to_number()).unwrap_or(0.0)
}
