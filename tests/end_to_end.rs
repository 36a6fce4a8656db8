//! End-to-end scenarios run through the public `ReplSession` surface,
//! one session per statement group unless persistence across groups is
//! the point of the scenario.

use kestrel::ReplSession;
use pretty_assertions::assert_eq;

fn run(src: &str) -> String {
    let session = ReplSession::new();
    session.execute(src, "<test>").unwrap().render()
}

#[test]
fn simple_arithmetic() {
    assert_eq!(run("1 + 2 * 3;"), "IntType(7)");
}

#[test]
fn recursive_factorial() {
    let src = "def rec fact = fn n -> if n <= 1 then 1 else n * fact(n - 1); fact(5);";
    assert_eq!(run(src), "IntType(120)");
}

#[test]
fn let_binding_sum() {
    assert_eq!(run("let x = 3, y = 4 in x + y;"), "IntType(7)");
}

#[test]
fn curried_multiply_via_two_calls() {
    let src = "def mul = fn a, b -> a * b; mul(6)(7);";
    assert_eq!(run(src), "IntType(42)");
}

#[test]
fn curried_multiply_via_one_call() {
    let src = "def mul = fn a, b -> a * b; mul(6, 7);";
    assert_eq!(run(src), "IntType(42)");
}

#[test]
fn multi_arg_params_bind_in_declaration_order_not_reversed() {
    // Non-commutative subtraction: a regressed argument order would yield
    // IntType(-7) instead.
    let src = "def sub = fn a, b -> a - b; sub(10, 3);";
    assert_eq!(run(src), "IntType(7)");
}

#[test]
fn curried_non_commutative_call_binds_in_declaration_order() {
    let src = "def sub = fn a, b -> a - b; sub(10)(3);";
    assert_eq!(run(src), "IntType(7)");
}

#[test]
fn zero_arg_call_on_wildcard_param_reads_closure() {
    assert_eq!(run("let x = 10 in (fn _ -> x)();"), "IntType(10)");
}

#[test]
fn list_concatenation() {
    assert_eq!(run("[1, 2] ++ [3];"), "ListObject(IntType(1), IntType(2), IntType(3))");
}

#[test]
fn list_indexing_out_of_range_poisons() {
    let rendered = run("[1, 2, 3]!!5;");
    assert!(rendered.starts_with("RuntimeError:"));
    assert!(rendered.contains("out of range"));
}

#[test]
fn power_is_right_associative() {
    // 2 ** (3 ** 2) = 2 ** 9 = 512, not (2 ** 3) ** 2 = 64.
    assert_eq!(run("2 ** 3 ** 2;"), "IntType(512)");
}

#[test]
fn division_by_zero_poisons_not_panics() {
    let rendered = run("1 / 0;");
    assert!(rendered.starts_with("RuntimeError: division by zero"));
}

#[test]
fn undefined_name_yields_traceback() {
    let rendered = run("undefined_name;");
    assert!(rendered.starts_with("RuntimeError: undefined_name not defined in scope"));
    assert!(rendered.contains("Traceback (most recent call last):"));
}

#[test]
fn closure_captures_definition_time_binding_not_call_time() {
    let src = "def make = fn x -> fn y -> x + y; def add5 = make(5); let x = 999 in add5(2);";
    assert_eq!(run(src), "IntType(7)");
}

#[test]
fn mixed_int_real_promotes_to_real() {
    assert_eq!(run("1 + 2.5;"), "RealType(3.5)");
}

#[test]
fn complex_literal_round_trips_through_addition() {
    assert_eq!(run("1 + 2i;"), "ComplexType(1+2i)");
}

#[test]
fn bindings_from_earlier_defs_are_visible_to_later_ones() {
    let session = ReplSession::new();
    session.execute("def a = 1;", "<test>").unwrap();
    session.execute("def b = a + 1;", "<test>").unwrap();
    let outcome = session.execute("a + b;", "<test>").unwrap();
    assert_eq!(outcome.render(), "IntType(3)");
}
