//! AST → value dispatch.
//!
//! Most expression variants evaluate to a [`Value::Thunk`] wrapping a
//! suspended computation (forced the first time any operation touches it);
//! `Fun` evaluates eagerly to a closure value directly. Function application
//! pushes argument values onto the call frame's shared argument stack in
//! reverse source order, so that the LIFO pops `apply_fun` performs come
//! back out in source order; under-supplying arguments curries rather than
//! erroring.

use std::rc::Rc;

use crate::ast::{Expr, FunExpr, Stmt};
use crate::frame::FrameRef;
use crate::source::SourcePos;
use crate::tracer::{TraceEvent, Tracer};
use crate::value::{FunVal, Value};

/// Evaluates a single expression against `frame`. Every variant except
/// `Fun` is wrapped in a thunk; forcing it runs the matching arm of
/// [`force_expr`].
pub fn eval_expr(expr: &Expr, frame: &FrameRef) -> Value {
    if let Expr::Fun(fun_expr) = expr {
        return make_fun(fun_expr, frame);
    }
    let owned = expr.clone();
    let frame = Rc::clone(frame);
    Value::thunk(move || force_expr(&owned, &frame))
}

fn make_fun(fun_expr: &FunExpr, frame: &FrameRef) -> Value {
    Value::Fun(Rc::new(FunVal {
        arg_names: fun_expr.arg_names.clone(),
        body: Rc::new((*fun_expr.body).clone()),
        captured_frame: Rc::clone(frame),
        partial_args: Vec::new(),
    }))
}

/// The eager evaluation logic a thunk runs on first force.
fn force_expr(expr: &Expr, frame: &FrameRef) -> Value {
    match expr {
        Expr::Fun(fun_expr) => make_fun(fun_expr, frame),

        Expr::Atomic(atom) => eval_atomic(atom, frame),

        Expr::List(list) => {
            let items: Vec<Value> = list.items.iter().map(|item| eval_expr(item, frame).force()).collect();
            Value::List(Rc::new(items))
        }

        Expr::Unary(unary) => {
            let operand = eval_expr(&unary.expr, frame);
            match unary.op.kind {
                crate::token::TokenKind::Not => operand.lnot(frame),
                crate::token::TokenKind::BNot => operand.bnot(frame),
                crate::token::TokenKind::Plus => operand,
                crate::token::TokenKind::Minus => negate(operand, frame),
                other => unreachable!("unary operator {other:?} not in the closed unary set"),
            }
        }

        Expr::Binary(binary) => {
            let lhs = eval_expr(&binary.lhs, frame);
            let rhs = eval_expr(&binary.rhs, frame);
            dispatch_binary(binary.op.kind, lhs, rhs, frame)
        }

        Expr::Conditional(cond) => {
            let condition = eval_expr(&cond.cond, frame).as_bool(frame);
            match condition {
                Value::Poison(_) => condition,
                Value::Bool(true) => eval_expr(&cond.consequent, frame).force(),
                Value::Bool(false) => match &cond.alternative {
                    Some(alt) => eval_expr(alt, frame).force(),
                    None => Value::Nil,
                },
                _ => unreachable!("AsBool only returns Bool or Poison"),
            }
        }

        Expr::Application(app) => {
            let callee = eval_expr(&app.func, frame).force();
            for arg_expr in app.args.iter().rev() {
                let arg_value = eval_expr(arg_expr, frame);
                frame.arg_stack().push(arg_value);
            }
            callee.apply(frame, app.pos)
        }

        Expr::Let(let_expr) => {
            let child = frame.new_child(format!("{}: __Let(...)", let_expr.pos));
            if let_expr.is_rec {
                for (name, init) in let_expr.init_names.iter().zip(&let_expr.init_exprs) {
                    let value = eval_expr(init, &child);
                    child.bind(name.clone(), value);
                }
            } else {
                for (name, init) in let_expr.init_names.iter().zip(&let_expr.init_exprs) {
                    let snapshot = child.copy_shallow();
                    let value = eval_expr(init, &snapshot);
                    child.bind(name.clone(), value);
                }
            }
            eval_expr(&let_expr.body, &child).force()
        }
    }
}

fn negate(operand: Value, frame: &FrameRef) -> Value {
    let v = operand.force();
    match v {
        Value::Poison(_) => v,
        Value::Int(i) => Value::Int(-i),
        Value::Real(r) => Value::Real(-r),
        Value::Complex(c) => Value::Complex(-c),
        other => Value::poison_not_defined("Neg", other.type_name(), frame),
    }
}

fn eval_atomic(atom: &crate::ast::AtomicExpr, frame: &FrameRef) -> Value {
    use crate::token::TokenKind;
    match atom.kind {
        TokenKind::Boolean => Value::Bool(atom.raw == "True"),
        TokenKind::Integer => Value::Int(atom.raw.parse().unwrap_or(0)),
        TokenKind::Real => Value::Real(atom.raw.trim_end_matches('i').parse().unwrap_or(0.0)),
        TokenKind::Complex => {
            let imag_part = atom.raw.trim_end_matches('i');
            let imag: f64 = imag_part.parse().unwrap_or(0.0);
            Value::Complex(num_complex::Complex64::new(0.0, imag))
        }
        TokenKind::Ident => match frame.lookup(&atom.raw) {
            Some(v) => v,
            None => Value::poison(format!("{} not defined in scope", atom.raw), frame.clone()),
        },
        other => unreachable!("atomic literal of non-literal kind {other:?}"),
    }
}

fn dispatch_binary(kind: crate::token::TokenKind, lhs: Value, rhs: Value, frame: &FrameRef) -> Value {
    use crate::token::TokenKind as K;
    match kind {
        K::Xor => lhs.lxor(rhs, frame),
        K::Or => lhs.lor(rhs, frame),
        K::And => lhs.land(rhs, frame),
        K::DoubleEqual => lhs.equal(rhs, frame),
        K::ExclamationEqual => lhs.not_equal(rhs, frame),
        K::Greater => lhs.greater(rhs, frame),
        K::GreaterEqual => lhs.greater_equal(rhs, frame),
        K::Less => lhs.less(rhs, frame),
        K::LessEqual => lhs.less_equal(rhs, frame),
        K::DoublePlus => lhs.concatenate(rhs, frame),
        K::Plus => lhs.add(rhs, frame),
        K::Minus => lhs.sub(rhs, frame),
        K::Star => lhs.mul(rhs, frame),
        K::Slash => lhs.div(rhs, frame),
        K::DoubleSlash => lhs.floor_div(rhs, frame),
        K::Percent => lhs.modulo(rhs, frame),
        K::SlashPercent => lhs.modulo(rhs, frame),
        K::DoubleStar => lhs.pow(rhs, frame),
        K::DoubleExclamation => lhs.get_item(rhs, frame),
        K::BAnd => lhs.band(rhs, frame),
        K::BOr => lhs.bor(rhs, frame),
        K::BXor => lhs.bxor(rhs, frame),
        other => unreachable!("binary operator {other:?} not in the closed binary set"),
    }
}

/// Applies a (possibly partially-applied) function to whatever arguments
/// are currently on `call_frame`'s shared stack. Pops at most `arity -
/// partial_args.len()` values; if fewer are available, returns a new,
/// more-fully-applied `Fun` instead of invoking the body (currying). `pos`
/// is the application expression's source position, used to label the
/// body frame's traceback description with the call site.
pub fn apply_fun(fun: &Rc<FunVal>, call_frame: &FrameRef, pos: SourcePos) -> Value {
    let arity = fun.arity();
    let needed = arity - fun.partial_args.len();
    let available = call_frame.arg_stack().len();

    if available < needed {
        // `Application` pushed these in reverse source order, so popping
        // them back off here already yields declaration order.
        let mut newly_supplied = Vec::with_capacity(available);
        for _ in 0..available {
            newly_supplied.push(call_frame.arg_stack().pop().expect("available just checked"));
        }
        let mut partial_args = fun.partial_args.clone();
        partial_args.extend(newly_supplied);
        return Value::Fun(Rc::new(FunVal {
            arg_names: fun.arg_names.clone(),
            body: Rc::clone(&fun.body),
            captured_frame: Rc::clone(&fun.captured_frame),
            partial_args,
        }));
    }

    let mut newly_supplied = Vec::with_capacity(needed);
    for _ in 0..needed {
        newly_supplied.push(call_frame.arg_stack().pop().expect("available >= needed just checked"));
    }
    let mut all_args = fun.partial_args.clone();
    all_args.extend(newly_supplied);

    let body_frame = fun.captured_frame.new_child(describe_call(pos));
    for (name, value) in fun.arg_names.iter().zip(all_args) {
        body_frame.bind(name.clone(), value);
    }
    let result = eval_expr(&fun.body, &body_frame).force();
    // A function returning a function immediately consumes any arguments
    // still pending on the shared stack (chained application), at the same
    // call site.
    result.apply(call_frame, pos)
}

fn describe_call(pos: SourcePos) -> String {
    format!("{pos}: __FunctionApplication")
}

/// Runs one statement, writing `Def` bindings into `frame` and returning the
/// evaluated value for an expression statement (`Nil` otherwise).
///
/// Implementation bugs that would otherwise be an unreachable-pattern panic
/// are trapped at this boundary: one bad statement must not prevent
/// subsequent statements from running.
pub fn eval_stmt(stmt: &Stmt, frame: &FrameRef, tracer: &dyn Tracer) -> Value {
    tracer.on_event(TraceEvent::StmtStart { pos: stmt_pos(stmt) });
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| eval_stmt_inner(stmt, frame)));
    let value = match outcome {
        Ok(value) => value,
        Err(_) => Value::Nil,
    };
    if let Value::Poison(p) = &value {
        tracer.on_event(TraceEvent::Poisoned { message: p.message.clone() });
    }
    tracer.on_event(TraceEvent::StmtEnd { pos: stmt_pos(stmt) });
    value
}

fn stmt_pos(stmt: &Stmt) -> crate::source::SourcePos {
    use crate::ast::Node;
    stmt.pos()
}

fn eval_stmt_inner(stmt: &Stmt, frame: &FrameRef) -> Value {
    match stmt {
        Stmt::Def(def) => {
            if def.is_rec {
                for (name, init) in def.names.iter().zip(&def.exprs) {
                    let value = eval_expr(init, frame);
                    frame.bind(name.clone(), value);
                }
            } else {
                for (name, init) in def.names.iter().zip(&def.exprs) {
                    let snapshot = frame.copy_shallow();
                    let value = eval_expr(init, &snapshot);
                    frame.bind(name.clone(), value);
                }
            }
            Value::Nil
        }
        Stmt::ModuleDecl(_) | Stmt::Load(_) => Value::Nil,
        Stmt::Expr(expr) => eval_expr(expr, frame).force(),
    }
}

/// Runs every statement of a program in order against `frame`, then returns
/// the value bound to `Main` if present, else `Nil`.
pub fn eval_program(stmts: &[Stmt], frame: &FrameRef, tracer: &dyn Tracer) -> Value {
    for stmt in stmts {
        eval_stmt(stmt, frame, tracer);
    }
    frame.lookup("Main").map(Value::force).unwrap_or(Value::Nil)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::tracer::NoopTracer;

    fn run(src: &str) -> Value {
        let (tokens, lex_errors) = tokenize(src, "<test>");
        assert!(lex_errors.is_empty(), "unexpected lex errors: {lex_errors:?}");
        let (stmts, parse_errors) = Parser::new(tokens).parse_program();
        assert!(parse_errors.is_empty(), "unexpected parse errors: {parse_errors:?}");
        let root = Frame::new_root();
        let tracer = NoopTracer;
        let mut last = Value::Nil;
        for stmt in &stmts {
            last = eval_stmt(stmt, &root, &tracer);
        }
        last
    }

    #[test]
    fn simple_def_and_use() {
        let v = run("def x = 5; x + 2;");
        assert!(matches!(v, Value::Int(7)));
    }

    #[test]
    fn recursive_factorial() {
        let v = run("def rec fact = fn n -> if n == 0 then 1 else n * fact(n - 1); fact(5);");
        assert!(matches!(v, Value::Int(120)));
    }

    #[test]
    fn let_binding_sum() {
        let v = run("let x = 1, y = 2 in x + y;");
        assert!(matches!(v, Value::Int(3)));
    }

    #[test]
    fn traceback_names_the_call_site_of_the_poisoning_application() {
        let v = run("def f = fn x -> undefined_name; f(1);");
        let Value::Poison(poison) = v else { panic!("expected poison, got a non-poison value") };
        let traceback = poison.release_frame.build_traceback();
        assert!(
            traceback.contains(": __FunctionApplication"),
            "traceback did not name the call site: {traceback}"
        );
    }

    #[test]
    fn curried_multiply_via_two_calls() {
        let v = run("(fn x, y -> x * y)(3)(4);");
        assert!(matches!(v, Value::Int(12)));
    }

    #[test]
    fn curried_multiply_via_one_call() {
        let v = run("(fn x, y -> x * y)(3, 4);");
        assert!(matches!(v, Value::Int(12)));
    }

    #[test]
    fn multi_arg_call_binds_params_in_declaration_order() {
        // Subtraction isn't commutative, so a swapped-argument regression
        // would show up here as -7 instead of 7.
        let v = run("(fn a, b -> a - b)(10, 3);");
        assert!(matches!(v, Value::Int(7)));
    }

    #[test]
    fn curried_call_binds_params_in_declaration_order() {
        let v = run("(fn a, b -> a - b)(10)(3);");
        assert!(matches!(v, Value::Int(7)));
    }

    #[test]
    fn list_concatenation() {
        let v = run("[1,2,3] ++ [4,5];");
        let Value::List(items) = v else { panic!("expected list") };
        let ints: Vec<i64> = items.iter().map(|x| match x.clone().force() {
            Value::Int(i) => i,
            other => panic!("expected int, got {:?}", other.type_name()),
        }).collect();
        assert_eq!(ints, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn undefined_name_poisons() {
        let v = run("undefined_name + 1;");
        assert!(matches!(v, Value::Poison(_)));
    }

    #[test]
    fn power_is_right_associative() {
        let v = run("2 ** 3 ** 2;");
        assert!(matches!(v, Value::Int(512)));
    }

    #[test]
    fn closure_captures_definition_time_binding() {
        let v = run("let x = 10 in (fn _ -> x)();");
        assert!(matches!(v, Value::Int(10)));
    }

    #[test]
    fn list_indexing_in_range_and_out_of_range() {
        let v = run("[10, 20, 30] !! 1;");
        assert!(matches!(v, Value::Int(20)));
        let v = run("[10, 20, 30] !! 5;");
        assert!(matches!(v, Value::Poison(_)));
    }
}
