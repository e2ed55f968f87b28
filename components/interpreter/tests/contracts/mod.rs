//! Contract tests: the fiber lifecycle state machine and the failure
//! guarantees of the host-facing API.

use bytecode_system::{BytecodeChunk, Opcode};
use core_types::{ScriptError, Value};
use interpreter::{FiberState, Vm};

fn yield_once_program() -> BytecodeChunk {
    let mut chunk = BytecodeChunk::new();
    let one = chunk.add_constant(Value::Number(1.0));
    let yield_name = chunk.add_name("yieldFiber");
    chunk.emit(Opcode::LoadConstant(one));
    chunk.emit(Opcode::Call(yield_name, 1));
    chunk.emit(Opcode::Return);
    chunk
}

fn vm_with_program(chunk: BytecodeChunk) -> Vm {
    let mut vm = Vm::new();
    vm.set_compiler(move |_source| Ok(chunk.clone()));
    vm
}

// ============================================================================
// Lifecycle state machine
// ============================================================================

#[test]
fn contract_created_to_suspended_to_finished() {
    let mut vm = vm_with_program(yield_once_program());
    let id = vm.create_fiber();
    assert_eq!(vm.fiber_state(id), Some(FiberState::Created));

    vm.eval_in_fiber(id, "x").unwrap();
    assert_eq!(vm.fiber_state(id), Some(FiberState::Suspended));

    vm.resume_fiber(id, Value::Number(9.0)).unwrap();
    assert_eq!(vm.fiber_state(id), Some(FiberState::Finished));
}

#[test]
fn contract_finished_fiber_keeps_result() {
    let mut vm = vm_with_program(yield_once_program());
    let id = vm.create_fiber();
    vm.eval_in_fiber(id, "x").unwrap();
    let result = vm.resume_fiber(id, Value::Number(9.0)).unwrap();
    assert_eq!(result, Value::Number(9.0));
    assert_eq!(vm.fiber_result(id), Some(Value::Number(9.0)));
    // The record survives; the stack does not.
    assert_eq!(vm.read_fiber_local(id, "%anything"), Value::Empty);
}

#[test]
fn contract_eval_requires_idle_fiber() {
    let mut vm = vm_with_program(yield_once_program());
    let id = vm.create_fiber();
    vm.eval_in_fiber(id, "x").unwrap();
    // Suspended with pending work: no new program may start.
    assert!(matches!(
        vm.eval_in_fiber(id, "x"),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
}

#[test]
fn contract_resume_requires_suspended() {
    let mut vm = vm_with_program(yield_once_program());
    let id = vm.create_fiber();
    // Created
    assert!(matches!(
        vm.resume_fiber(id, Value::Empty),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
    vm.eval_in_fiber(id, "x").unwrap();
    vm.resume_fiber(id, Value::Empty).unwrap();
    // Finished
    assert!(matches!(
        vm.resume_fiber(id, Value::Empty),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
}

#[test]
fn contract_operations_on_unknown_id_fail() {
    let mut vm = Vm::new();
    let ghost = interpreter::FiberId(999);
    assert!(matches!(
        vm.resume_fiber(ghost, Value::Empty),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
    assert!(matches!(
        vm.stop_fiber(ghost),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
    assert!(matches!(
        vm.save_fibers(&[ghost], "unused.snap"),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
    assert_eq!(vm.fiber_state(ghost), None);
    assert_eq!(vm.read_fiber_local(ghost, "%x"), Value::Empty);
}

#[test]
fn contract_stop_works_in_any_state() {
    let mut vm = vm_with_program(yield_once_program());

    let created = vm.create_fiber();
    vm.stop_fiber(created).unwrap();

    let suspended = vm.create_fiber();
    vm.eval_in_fiber(suspended, "x").unwrap();
    vm.stop_fiber(suspended).unwrap();

    let finished = vm.create_fiber();
    vm.eval_in_fiber(finished, "x").unwrap();
    vm.resume_fiber(finished, Value::Empty).unwrap();
    vm.stop_fiber(finished).unwrap();

    assert_eq!(vm.fiber_count(), 0);
}

// ============================================================================
// Serialization guarantees
// ============================================================================

#[test]
fn contract_only_suspended_fibers_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fibers.snap");

    let mut vm = vm_with_program(yield_once_program());

    let created = vm.create_fiber();
    assert!(vm.save_fibers(&[created], &path).is_err());

    let finished = vm.create_fiber();
    vm.eval_in_fiber(finished, "x").unwrap();
    vm.resume_fiber(finished, Value::Empty).unwrap();
    assert!(vm.save_fibers(&[finished], &path).is_err());
}

#[test]
fn contract_group_save_is_rejected_if_any_fiber_not_suspended() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fibers.snap");

    let mut vm = vm_with_program(yield_once_program());
    let good = vm.create_fiber();
    vm.eval_in_fiber(good, "x").unwrap();
    let bad = vm.create_fiber();

    assert!(vm.save_fibers(&[good, bad], &path).is_err());
    assert!(!path.exists(), "rejected save must not write the file");
}

#[test]
fn contract_restore_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fibers.snap");
    std::fs::write(&path, b"{ definitely not a snapshot").unwrap();

    let mut vm = Vm::new();
    assert!(matches!(
        vm.restore_fibers(&path),
        Err(ScriptError::Snapshot(_))
    ));
    assert_eq!(vm.fiber_count(), 0);
}

#[test]
fn contract_group_save_restores_every_fiber() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fibers.snap");

    let mut vm = vm_with_program(yield_once_program());
    let a = vm.create_fiber();
    let b = vm.create_fiber();
    vm.eval_in_fiber(a, "x").unwrap();
    vm.eval_in_fiber(b, "x").unwrap();

    vm.save_fibers(&[a, b], &path).unwrap();
    vm.stop_fiber(a).unwrap();
    vm.stop_fiber(b).unwrap();

    let restored = vm.restore_fibers(&path).unwrap();
    assert_eq!(restored.len(), 2);
    for id in restored {
        assert_eq!(vm.fiber_state(id), Some(FiberState::Suspended));
        assert_eq!(vm.resume_fiber(id, Value::Number(5.0)).unwrap(), Value::Number(5.0));
    }
}

// ============================================================================
// Yield placement
// ============================================================================

#[test]
fn contract_yield_is_rejected_outside_fibers() {
    let mut vm = Vm::new();
    let chunk = yield_once_program();
    assert!(matches!(
        vm.execute(&chunk),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
}

#[test]
fn contract_yield_is_rejected_across_native_boundary() {
    // eval() inside a fiber starts an independent nested evaluation; a
    // yield in there has no suspension point to bind to.
    let mut program = BytecodeChunk::new();
    let code = program.add_constant(Value::String("nested".to_string()));
    let eval_name = program.add_name("eval");
    program.emit(Opcode::LoadConstant(code));
    program.emit(Opcode::Call(eval_name, 1));
    program.emit(Opcode::Return);

    let nested = yield_once_program();
    let mut vm = Vm::new();
    vm.set_compiler(move |source| {
        if source == "nested" {
            Ok(nested.clone())
        } else {
            Ok(program.clone())
        }
    });

    let id = vm.create_fiber();
    assert!(matches!(
        vm.eval_in_fiber(id, "outer"),
        Err(ScriptError::InvalidFiberOperation(_))
    ));
}
