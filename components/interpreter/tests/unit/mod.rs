//! Unit tests for the execution engine: dispatch, frames, calls.

use bytecode_system::{BytecodeChunk, FunctionProto, Opcode};
use core_types::{ScriptError, Value};
use interpreter::Vm;

// ============================================================================
// Arithmetic and value handling
// ============================================================================

#[test]
fn test_execute_constant() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let idx = chunk.add_constant(Value::Number(3.25));
    chunk.emit(Opcode::LoadConstant(idx));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(3.25));
}

#[test]
fn test_execute_arithmetic() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let seven = chunk.add_constant(Value::Number(7.0));
    let four = chunk.add_constant(Value::Number(4.0));
    chunk.emit(Opcode::LoadConstant(seven));
    chunk.emit(Opcode::LoadConstant(four));
    chunk.emit(Opcode::Add);
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(11.0));
}

#[test]
fn test_string_arithmetic_coerces() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let s = chunk.add_constant(Value::String("7".to_string()));
    let four = chunk.add_constant(Value::Number(4.0));
    chunk.emit(Opcode::LoadConstant(s));
    chunk.emit(Opcode::LoadConstant(four));
    chunk.emit(Opcode::Add);
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(11.0));
}

#[test]
fn test_concat_uses_display_form() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let eleven = chunk.add_constant(Value::Number(11.0));
    let tag = chunk.add_constant(Value::String("R1".to_string()));
    chunk.emit(Opcode::LoadConstant(eleven));
    chunk.emit(Opcode::LoadConstant(tag));
    chunk.emit(Opcode::Concat);
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::String("11R1".to_string()));
}

#[test]
fn test_bitwise_or() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let four = chunk.add_constant(Value::Number(4.0));
    let eight = chunk.add_constant(Value::Number(8.0));
    chunk.emit(Opcode::LoadConstant(four));
    chunk.emit(Opcode::LoadConstant(eight));
    chunk.emit(Opcode::BitOr);
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(12.0));
}

#[test]
fn test_string_equality_is_exact() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let a = chunk.add_constant(Value::String("TEN".to_string()));
    let b = chunk.add_constant(Value::String("TEN".to_string()));
    chunk.emit(Opcode::LoadConstant(a));
    chunk.emit(Opcode::LoadConstant(b));
    chunk.emit(Opcode::StrEqual);
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Boolean(true));
}

// ============================================================================
// Locals and globals
// ============================================================================

#[test]
fn test_store_and_load_local() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let value = chunk.add_constant(Value::Number(7.0));
    let vc = chunk.add_name("%vc");
    chunk.emit(Opcode::LoadConstant(value));
    chunk.emit(Opcode::StoreLocal(vc));
    chunk.emit(Opcode::LoadLocal(vc));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(7.0));
}

#[test]
fn test_unset_local_reads_empty() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let missing = chunk.add_name("%missing");
    chunk.emit(Opcode::LoadLocal(missing));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Empty);
}

#[test]
fn test_globals_persist_across_executions() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let one = chunk.add_constant(Value::Number(1.0));
    let g = chunk.add_name("$FIBFIN");
    chunk.emit(Opcode::LoadConstant(one));
    chunk.emit(Opcode::StoreGlobal(g));
    chunk.emit(Opcode::LoadEmpty);
    chunk.emit(Opcode::Return);

    vm.execute(&chunk).unwrap();
    assert_eq!(vm.global("$FIBFIN"), Value::Number(1.0));

    let mut reader = BytecodeChunk::new();
    let g = reader.add_name("$FIBFIN");
    reader.emit(Opcode::LoadGlobal(g));
    reader.emit(Opcode::Return);
    assert_eq!(vm.execute(&reader).unwrap(), Value::Number(1.0));
}

#[test]
fn test_indexed_globals_mangle_names() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let a = chunk.add_constant(Value::String("A".to_string()));
    let two = chunk.add_constant(Value::Number(2.0));
    let log = chunk.add_name("$fiberLog");
    // $fiberLog[2] = "A";
    chunk.emit(Opcode::LoadConstant(a));
    chunk.emit(Opcode::LoadConstant(two));
    chunk.emit(Opcode::StoreGlobalIndexed(log));
    // read it back
    chunk.emit(Opcode::LoadConstant(two));
    chunk.emit(Opcode::LoadGlobalIndexed(log));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::String("A".to_string()));
    assert_eq!(vm.global("$fiberLog2"), Value::String("A".to_string()));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_jump_if_false_skips() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let zero = chunk.add_constant(Value::Number(0.0));
    let yes = chunk.add_constant(Value::String("yes".to_string()));
    let no = chunk.add_constant(Value::String("no".to_string()));
    chunk.emit(Opcode::LoadConstant(zero));
    chunk.emit(Opcode::JumpIfFalse(4));
    chunk.emit(Opcode::LoadConstant(yes));
    chunk.emit(Opcode::Return);
    chunk.emit(Opcode::LoadConstant(no));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::String("no".to_string()));
}

#[test]
fn test_sticky_result_survives_assignments() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let three = chunk.add_constant(Value::Number(3.0));
    let nine = chunk.add_constant(Value::Number(9.0));
    let g = chunk.add_name("$g");
    // expression statement: 3;
    chunk.emit(Opcode::LoadConstant(three));
    chunk.emit(Opcode::SetResult);
    // assignment after it: $g = 9;
    chunk.emit(Opcode::LoadConstant(nine));
    chunk.emit(Opcode::StoreGlobal(g));
    // program epilogue
    chunk.emit(Opcode::LoadResult);
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(3.0));
    assert_eq!(vm.global("$g"), Value::Number(9.0));
}

// ============================================================================
// Calls
// ============================================================================

fn double_proto() -> FunctionProto {
    let mut body = BytecodeChunk::new();
    let x = body.add_name("%x");
    let two = body.add_constant(Value::Number(2.0));
    body.emit(Opcode::LoadLocal(x));
    body.emit(Opcode::LoadConstant(two));
    body.emit(Opcode::Mul);
    body.emit(Opcode::Return);
    FunctionProto {
        name: "double".to_string(),
        params: vec!["%x".to_string()],
        chunk: body,
    }
}

#[test]
fn test_define_and_call_function() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    chunk.add_function(double_proto());
    let five = chunk.add_constant(Value::Number(5.0));
    let name = chunk.add_name("double");
    chunk.emit(Opcode::DefineFunction(0));
    chunk.emit(Opcode::LoadConstant(five));
    chunk.emit(Opcode::Call(name, 1));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(10.0));
    assert!(vm.has_function("double"));
}

#[test]
fn test_function_locals_are_frame_scoped() {
    // The callee writes %x; the caller's %x is untouched.
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    chunk.add_function(double_proto());
    let seven = chunk.add_constant(Value::Number(7.0));
    let three = chunk.add_constant(Value::Number(3.0));
    let x = chunk.add_name("%x");
    let name = chunk.add_name("double");
    chunk.emit(Opcode::DefineFunction(0));
    chunk.emit(Opcode::LoadConstant(seven));
    chunk.emit(Opcode::StoreLocal(x));
    chunk.emit(Opcode::LoadConstant(three));
    chunk.emit(Opcode::Call(name, 1));
    chunk.emit(Opcode::Pop);
    chunk.emit(Opcode::LoadLocal(x));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(7.0));
}

#[test]
fn test_missing_argument_reads_empty() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    chunk.add_function(double_proto());
    let name = chunk.add_name("double");
    chunk.emit(Opcode::DefineFunction(0));
    chunk.emit(Opcode::Call(name, 0));
    chunk.emit(Opcode::Return);

    // Empty coerces to 0, doubled is 0.
    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(0.0));
}

#[test]
fn test_unknown_function_warns_and_returns_empty() {
    let mut vm = Vm::new();
    let warnings = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = warnings.clone();
    vm.add_consumer(move |line| sink.lock().unwrap().push(line.to_string()));

    let mut chunk = BytecodeChunk::new();
    let name = chunk.add_name("noSuchFunction");
    chunk.emit(Opcode::Call(name, 0));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Empty);
    let warnings = warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("noSuchFunction"));
}

#[test]
fn test_native_registration() {
    let mut vm = Vm::new();
    vm.register_native("answer", |_vm, _args| {
        Ok(interpreter::NativeOutcome::Value(Value::Number(42.0)))
    });

    let mut chunk = BytecodeChunk::new();
    let name = chunk.add_name("answer");
    chunk.emit(Opcode::Call(name, 0));
    chunk.emit(Opcode::Return);

    assert_eq!(vm.execute(&chunk).unwrap(), Value::Number(42.0));
}

#[test]
fn test_yield_outside_fiber_is_error() {
    let mut vm = Vm::new();
    let mut chunk = BytecodeChunk::new();
    let v = chunk.add_constant(Value::Number(1.0));
    let name = chunk.add_name("yieldFiber");
    chunk.emit(Opcode::LoadConstant(v));
    chunk.emit(Opcode::Call(name, 1));
    chunk.emit(Opcode::Return);

    assert!(matches!(
        vm.execute(&chunk),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
}
