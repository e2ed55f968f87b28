//! Source-to-result pipeline tests: parser, code generator, and
//! interpreter working together on ordinary language constructs.

use core_types::Value;
use integration_tests::test_vm;

fn eval(source: &str) -> Value {
    let (mut vm, _lines) = test_vm();
    vm.evaluate(source).expect("evaluation failed")
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3;"), Value::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3;"), Value::Number(9.0));
    assert_eq!(eval("10 % 4;"), Value::Number(2.0));
    assert_eq!(eval("-4 + 1;"), Value::Number(-3.0));
}

#[test]
fn test_concat_and_numeric_display() {
    assert_eq!(eval("7 + 4 @ \"R1\";"), Value::String("11R1".to_string()));
    assert_eq!(eval("\"a\" @ \"b\" @ \"c\";"), Value::String("abc".to_string()));
}

#[test]
fn test_comparison_operators() {
    assert_eq!(eval("3 < 4;"), Value::Boolean(true));
    assert_eq!(eval("\"7\" == 7;"), Value::Boolean(true));
    assert_eq!(eval("\"TEN\" $= \"TEN\";"), Value::Boolean(true));
    assert_eq!(eval("\"TEN\" !$= \"ten\";"), Value::Boolean(true));
}

#[test]
fn test_local_and_global_assignment() {
    let (mut vm, _lines) = test_vm();
    let result = vm.evaluate("%x = 5; $g = %x * 2; $g + 1;").unwrap();
    assert_eq!(result, Value::Number(11.0));
    assert_eq!(vm.global("$g"), Value::Number(10.0));
}

#[test]
fn test_indexed_globals() {
    let (mut vm, _lines) = test_vm();
    vm.evaluate("%i = 3; $log[%i] = \"A\"; $log[%i] = $log[%i] @ \"B\";")
        .unwrap();
    assert_eq!(vm.global("$log3"), Value::String("AB".to_string()));
}

#[test]
fn test_if_else_chain() {
    let source = r#"
%n = 2;
if (%n == 1) { %r = "one"; }
else if (%n == 2) { %r = "two"; }
else { %r = "many"; }
%r;
"#;
    assert_eq!(eval(source), Value::String("two".to_string()));
}

#[test]
fn test_while_loop_sum() {
    let source = r#"
%sum = 0;
%i = 1;
while (%i <= 4)
{
   %sum = %sum + %i;
   %i = %i + 1;
}
%sum;
"#;
    assert_eq!(eval(source), Value::Number(10.0));
}

#[test]
fn test_function_definition_and_call() {
    let source = r#"
function add(%a, %b)
{
   return %a + %b;
}
add(3, 4);
"#;
    assert_eq!(eval(source), Value::Number(7.0));
}

#[test]
fn test_recursive_function() {
    let source = r#"
function fact(%n)
{
   if (%n <= 1) { return 1; }
   return %n * fact(%n - 1);
}
fact(5);
"#;
    assert_eq!(eval(source), Value::Number(120.0));
}

#[test]
fn test_function_redefinition_last_wins() {
    let source = r#"
function tag() { return "old"; }
function tag() { return "new"; }
tag();
"#;
    assert_eq!(eval(source), Value::String("new".to_string()));
}

#[test]
fn test_builtin_natives_from_script() {
    assert_eq!(eval("strLen(\"TENRET\");"), Value::Number(6.0));
    assert_eq!(eval("strUpr(\"ten\");"), Value::String("TEN".to_string()));
    assert_eq!(eval("mFloor(3.9) + mCeil(0.1);"), Value::Number(4.0));
    assert_eq!(
        eval("getSubStr(\"TENRET\", 3, 3);"),
        Value::String("RET".to_string())
    );
}

#[test]
fn test_echo_output_capture() {
    let (mut vm, lines) = test_vm();
    vm.evaluate("echo(\"hello \" @ 7 + 4);").unwrap();
    assert_eq!(*lines.lock().unwrap(), vec!["hello 11".to_string()]);
}

#[test]
fn test_unknown_function_warns() {
    let (mut vm, lines) = test_vm();
    let result = vm.evaluate("%x = noSuchThing(1); %x;").unwrap();
    assert_eq!(result, Value::Empty);
    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|l| l.contains("noSuchThing")));
}

#[test]
fn test_eval_shares_globals_with_caller() {
    let (mut vm, _lines) = test_vm();
    let result = vm
        .evaluate("$shared = 1; eval(\"$shared = $shared + 9;\"); $shared;")
        .unwrap();
    assert_eq!(result, Value::Number(10.0));
}

#[test]
fn test_program_value_is_last_expression_statement() {
    // Assignments after the last expression statement don't disturb the
    // program's value.
    assert_eq!(eval("1 + 1; $g = 5;"), Value::Number(2.0));
}

#[test]
fn test_syntax_error_reports_line() {
    let (mut vm, _lines) = test_vm();
    let err = vm.evaluate("%x = 1;\n%y = ;\n").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("syntax error"));
    assert!(message.contains("line 2"));
}
