//! The tagged value hierarchy and its uniform operator surface.
//!
//! Every operation is defined on every variant (`Value::add`, `Value::equal`,
//! ...); unsupported combinations return a [`PoisonVal`] rather than
//! panicking, and `Poison` returns itself from every operation it receives.
//! Numeric promotion never reorders operands — see `promote` below — so
//! non-commutative operators (`Sub`, `Div`, `Mod`, `FloorDiv`, `Pow`) stay
//! correct once one operand is widened to match the other.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_complex::Complex64;

use crate::ast::Expr;
use crate::frame::FrameRef;
use crate::source::SourcePos;

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Real(f64),
    Complex(Complex64),
    List(Rc<Vec<Value>>),
    Fun(Rc<FunVal>),
    Thunk(Rc<ThunkVal>),
    Poison(Rc<PoisonVal>),
}

/// A runtime error carrier. Propagates through every operation unchanged;
/// `release_frame` gives the traceback via [`crate::frame::Frame::build_traceback`].
pub struct PoisonVal {
    pub message: String,
    pub release_frame: FrameRef,
}

impl fmt::Debug for PoisonVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoisonVal({:?})", self.message)
    }
}

/// A compiled user function, possibly partially applied.
pub struct FunVal {
    pub arg_names: Vec<String>,
    pub body: Rc<Expr>,
    /// The frame visible at the `fn` expression's definition site.
    pub captured_frame: FrameRef,
    /// Arguments already bound by a previous, incomplete call (currying).
    pub partial_args: Vec<Value>,
}

impl FunVal {
    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }
}

impl fmt::Debug for FunVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunVal(arity={})", self.arity())
    }
}

enum ThunkState {
    Pending(Box<dyn FnOnce() -> Value>),
    Forced(Value),
}

/// A lazily-evaluated, memoizing wrapper around a suspended computation.
/// Forces exactly once: the first [`ThunkVal::force`] call runs the
/// closure and caches the result; every subsequent call (and every other
/// operation performed on the `Value::Thunk`, via `Value::force`) returns
/// the cached value.
pub struct ThunkVal {
    state: RefCell<ThunkState>,
}

impl fmt::Debug for ThunkVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThunkVal(..)")
    }
}

impl ThunkVal {
    pub fn new(evaluator: impl FnOnce() -> Value + 'static) -> Rc<Self> {
        Rc::new(Self { state: RefCell::new(ThunkState::Pending(Box::new(evaluator))) })
    }

    pub fn force(&self) -> Value {
        if let ThunkState::Forced(v) = &*self.state.borrow() {
            return v.clone();
        }
        let pending = self.state.replace(ThunkState::Forced(Value::Nil));
        let value = match pending {
            ThunkState::Pending(f) => f(),
            ThunkState::Forced(v) => v,
        };
        *self.state.borrow_mut() = ThunkState::Forced(value.clone());
        value
    }
}

impl Value {
    pub fn thunk(evaluator: impl FnOnce() -> Value + 'static) -> Self {
        Self::Thunk(ThunkVal::new(evaluator))
    }

    pub fn poison(message: impl Into<String>, release_frame: FrameRef) -> Self {
        Self::Poison(Rc::new(PoisonVal { message: message.into(), release_frame }))
    }

    pub fn poison_not_defined(op: &str, ty: &str, frame: &FrameRef) -> Self {
        Self::poison(format!("{op} not defined for {ty}"), frame.clone())
    }

    pub fn poison_not_defined2(op: &str, lhs: &str, rhs: &str, frame: &FrameRef) -> Self {
        Self::poison(format!("{op} not defined for {lhs} and {rhs}"), frame.clone())
    }

    /// Forces a value through any number of nested `Thunk` wrappers,
    /// returning the first non-thunk value. `Poison` and ordinary values
    /// are returned unchanged.
    pub fn force(self) -> Self {
        match self {
            Self::Thunk(t) => t.force().force(),
            other => other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "NilType",
            Self::Bool(_) => "BoolType",
            Self::Int(_) => "IntType",
            Self::Real(_) => "RealType",
            Self::Complex(_) => "ComplexType",
            Self::List(_) => "ListType",
            Self::Fun(_) => "FunType",
            Self::Thunk(_) => "ThunkType",
            Self::Poison(_) => "PoisonType",
        }
    }

    /// The textual representation used by the REPL to print a result.
    pub fn repr(&self) -> String {
        match self {
            Self::Nil => "NilType".to_string(),
            Self::Bool(b) => format!("BoolType({b})"),
            Self::Int(i) => format!("IntType({i})"),
            Self::Real(r) => format!("RealType({r})"),
            Self::Complex(c) => format!("ComplexType({}+{}i)", c.re, c.im),
            Self::List(items) => {
                format!("ListObject({})", items.iter().map(Value::repr).collect::<Vec<_>>().join(", "))
            }
            Self::Fun(f) => format!("FunType(arity={})", f.arity()),
            Self::Thunk(_) => "ThunkType(..)".to_string(),
            Self::Poison(p) => format!("PoisonType({:?})", p.message),
        }
    }

    fn poison_of(&self) -> Option<Self> {
        match self {
            Self::Poison(_) => Some(self.clone()),
            _ => None,
        }
    }

    // ---------------------------------------------------------------
    // conversions
    // ---------------------------------------------------------------

    pub fn as_bool(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Bool(b) => Self::Bool(b),
            Self::Int(i) => Self::Bool(i != 0),
            Self::Real(r) => Self::Bool(r != 0.0),
            Self::Nil => Self::Bool(false),
            Self::Fun(_) => Self::Bool(true),
            Self::List(items) => Self::Bool(!items.is_empty()),
            other => Self::poison_not_defined("AsBool", other.type_name(), frame),
        }
    }

    pub fn as_int(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Int(i) => Self::Int(i),
            Self::Real(r) => Self::Int(r as i64),
            other => Self::poison_not_defined("AsInt", other.type_name(), frame),
        }
    }

    pub fn as_real(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Int(i) => Self::Real(i as f64),
            Self::Real(r) => Self::Real(r),
            other => Self::poison_not_defined("AsReal", other.type_name(), frame),
        }
    }

    pub fn as_complex(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Int(i) => Self::Complex(Complex64::new(i as f64, 0.0)),
            Self::Real(r) => Self::Complex(Complex64::new(r, 0.0)),
            Self::Complex(c) => Self::Complex(c),
            other => Self::poison_not_defined("AsComplex", other.type_name(), frame),
        }
    }

    pub fn as_list(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::List(items) => Self::List(items),
            other => Self::poison_not_defined("AsList", other.type_name(), frame),
        }
    }

    pub fn as_fun(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Fun(f) => Self::Fun(f),
            other => Self::poison_not_defined("AsFun", other.type_name(), frame),
        }
    }

    // ---------------------------------------------------------------
    // comparisons
    // ---------------------------------------------------------------

    pub fn equal(self, other: Self, frame: &FrameRef) -> Self {
        let (a, b) = (self.force(), other.force());
        if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
            return p;
        }
        Self::Bool(Self::structurally_equal(&a, &b, frame))
    }

    fn structurally_equal(a: &Self, b: &Self, frame: &FrameRef) -> bool {
        match (a, b) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(x), Self::Bool(y)) => x == y,
            (Self::Int(_) | Self::Real(_) | Self::Complex(_), Self::Int(_) | Self::Real(_) | Self::Complex(_)) => {
                match promote(a.clone(), b.clone(), frame) {
                    Promoted::Int(x, y) => x == y,
                    Promoted::Real(x, y) => (x - y).abs() == 0.0,
                    Promoted::Complex(x, y) => x == y,
                    Promoted::Poison(_) => false,
                }
            }
            (Self::List(x), Self::List(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| Self::structurally_equal(p, q, frame))
            }
            (Self::Fun(x), Self::Fun(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    pub fn not_equal(self, other: Self, frame: &FrameRef) -> Self {
        match self.equal(other, frame) {
            Self::Bool(b) => Self::Bool(!b),
            other => other,
        }
    }

    pub fn less(self, other: Self, frame: &FrameRef) -> Self {
        ordered_compare(self, other, frame, "Less", |o| o == std::cmp::Ordering::Less)
    }

    pub fn less_equal(self, other: Self, frame: &FrameRef) -> Self {
        ordered_compare(self, other, frame, "LessEqual", |o| o != std::cmp::Ordering::Greater)
    }

    pub fn greater(self, other: Self, frame: &FrameRef) -> Self {
        ordered_compare(self, other, frame, "Greater", |o| o == std::cmp::Ordering::Greater)
    }

    pub fn greater_equal(self, other: Self, frame: &FrameRef) -> Self {
        ordered_compare(self, other, frame, "GreaterEqual", |o| o != std::cmp::Ordering::Less)
    }

    // ---------------------------------------------------------------
    // logical
    // ---------------------------------------------------------------

    pub fn lnot(self, frame: &FrameRef) -> Self {
        match self.as_bool(frame) {
            Self::Bool(b) => Self::Bool(!b),
            other => other,
        }
    }

    pub fn land(self, other: Self, frame: &FrameRef) -> Self {
        logical_binop(self, other, frame, |a, b| a && b)
    }

    pub fn lor(self, other: Self, frame: &FrameRef) -> Self {
        logical_binop(self, other, frame, |a, b| a || b)
    }

    pub fn lxor(self, other: Self, frame: &FrameRef) -> Self {
        logical_binop(self, other, frame, |a, b| a != b)
    }

    // ---------------------------------------------------------------
    // bitwise (Int only)
    // ---------------------------------------------------------------

    pub fn bnot(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Int(i) => Self::Int(!i),
            other => Self::poison_not_defined("BNot", other.type_name(), frame),
        }
    }

    pub fn band(self, other: Self, frame: &FrameRef) -> Self {
        bitwise_binop(self, other, frame, "BAnd", |a, b| a & b)
    }

    pub fn bor(self, other: Self, frame: &FrameRef) -> Self {
        bitwise_binop(self, other, frame, "BOr", |a, b| a | b)
    }

    pub fn bxor(self, other: Self, frame: &FrameRef) -> Self {
        bitwise_binop(self, other, frame, "BXor", |a, b| a ^ b)
    }

    // ---------------------------------------------------------------
    // arithmetic
    // ---------------------------------------------------------------

    pub fn add(self, other: Self, frame: &FrameRef) -> Self {
        arith(self, other, frame, "Add", |a, b| a.wrapping_add(b), |a, b| a + b, |a, b| a + b)
    }

    pub fn sub(self, other: Self, frame: &FrameRef) -> Self {
        arith(self, other, frame, "Sub", |a, b| a.wrapping_sub(b), |a, b| a - b, |a, b| a - b)
    }

    pub fn mul(self, other: Self, frame: &FrameRef) -> Self {
        arith(self, other, frame, "Mul", |a, b| a.wrapping_mul(b), |a, b| a * b, |a, b| a * b)
    }

    pub fn div(self, other: Self, frame: &FrameRef) -> Self {
        let (a, b) = (self.force(), other.force());
        if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
            return p;
        }
        match promote(a.clone(), b.clone(), frame) {
            Promoted::Int(x, y) => {
                if y == 0 {
                    Self::poison("division by zero", frame.clone())
                } else {
                    Self::Int(x / y)
                }
            }
            Promoted::Real(x, y) => Self::Real(x / y),
            Promoted::Complex(x, y) => Self::Complex(x / y),
            Promoted::Poison(p) => p,
        }
    }

    pub fn modulo(self, other: Self, frame: &FrameRef) -> Self {
        let (a, b) = (self.force(), other.force());
        if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
            return p;
        }
        match promote(a.clone(), b.clone(), frame) {
            Promoted::Int(x, y) => {
                if y == 0 {
                    Self::poison("modulo by zero", frame.clone())
                } else {
                    Self::Int(x % y)
                }
            }
            Promoted::Real(x, y) => Self::Real(x % y),
            Promoted::Complex(_, _) => Self::poison_not_defined2("Mod", a.type_name(), b.type_name(), frame),
            Promoted::Poison(p) => p,
        }
    }

    /// Floored division. Integers use genuine integer floor division
    /// rather than a round trip through `f64` (see SPEC_FULL.md design
    /// decision 3).
    pub fn floor_div(self, other: Self, frame: &FrameRef) -> Self {
        let (a, b) = (self.force(), other.force());
        if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
            return p;
        }
        match promote(a.clone(), b.clone(), frame) {
            Promoted::Int(x, y) => match floor_div_i64(x, y) {
                Some(q) => Self::Int(q),
                None => Self::poison("floor division by zero", frame.clone()),
            },
            Promoted::Real(x, y) => Self::Real((x / y).floor()),
            Promoted::Complex(_, _) => Self::poison_not_defined2("FloorDiv", a.type_name(), b.type_name(), frame),
            Promoted::Poison(p) => p,
        }
    }

    pub fn pow(self, other: Self, frame: &FrameRef) -> Self {
        let (a, b) = (self.force(), other.force());
        if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
            return p;
        }
        match promote(a.clone(), b.clone(), frame) {
            Promoted::Int(x, y) => Self::Int((x as f64).powf(y as f64) as i64),
            Promoted::Real(x, y) => Self::Real(x.powf(y)),
            Promoted::Complex(x, y) => Self::Complex(x.powc(y)),
            Promoted::Poison(p) => p,
        }
    }

    pub fn abs(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::Int(i) => Self::Int(i.abs()),
            Self::Real(r) => Self::Real(r.abs()),
            Self::Complex(c) => Self::Real(c.norm()),
            other => Self::poison_not_defined("Abs", other.type_name(), frame),
        }
    }

    // ---------------------------------------------------------------
    // sequence
    // ---------------------------------------------------------------

    pub fn length(self, frame: &FrameRef) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        match v {
            Self::List(items) => Self::Int(items.len() as i64),
            other => Self::poison_not_defined("Length", other.type_name(), frame),
        }
    }

    pub fn get_item(self, index: Self, frame: &FrameRef) -> Self {
        let (list, idx) = (self.force(), index.force());
        if let Some(p) = list.poison_of().or_else(|| idx.poison_of()) {
            return p;
        }
        let Self::List(items) = &list else {
            return Self::poison_not_defined("GetItem", list.type_name(), frame);
        };
        let Self::Int(i) = idx else {
            return Self::poison_not_defined2("GetItem", list.type_name(), idx.type_name(), frame);
        };
        if i < 0 || i as usize >= items.len() {
            return Self::poison(format!("index {i} out of range"), frame.clone());
        }
        items[i as usize].clone()
    }

    pub fn concatenate(self, other: Self, frame: &FrameRef) -> Self {
        let (a, b) = (self.force(), other.force());
        if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
            return p;
        }
        match (&a, &b) {
            (Self::List(x), Self::List(y)) => {
                let mut merged = (**x).clone();
                merged.extend(y.iter().cloned());
                Self::List(Rc::new(merged))
            }
            _ => Self::poison_not_defined2("Concatenate", a.type_name(), b.type_name(), frame),
        }
    }

    // ---------------------------------------------------------------
    // callable
    // ---------------------------------------------------------------

    /// Applies `self` to the arguments currently sitting on `call_frame`'s
    /// shared argument stack. Non-function values return themselves
    /// unchanged — this is what lets a fully-applied function's result
    /// "fall through" any leftover arguments in a chained application.
    /// `pos` is the source position of the application expression that
    /// triggered this call, threaded through so the body frame's traceback
    /// description names the call site.
    pub fn apply(self, call_frame: &FrameRef, pos: SourcePos) -> Self {
        let v = self.force();
        if let Some(p) = v.poison_of() {
            return p;
        }
        let Self::Fun(fun) = v else {
            return v;
        };
        crate::evaluator::apply_fun(&fun, call_frame, pos)
    }
}

fn ordered_compare(
    a: Value,
    b: Value,
    frame: &FrameRef,
    op: &str,
    pred: impl Fn(std::cmp::Ordering) -> bool,
) -> Value {
    let (a, b) = (a.force(), b.force());
    if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
        return p;
    }
    match promote(a.clone(), b.clone(), frame) {
        Promoted::Int(x, y) => Value::Bool(pred(x.cmp(&y))),
        Promoted::Real(x, y) => match x.partial_cmp(&y) {
            Some(o) => Value::Bool(pred(o)),
            None => Value::poison(format!("{op} not defined for NaN"), frame.clone()),
        },
        Promoted::Complex(_, _) => Value::poison_not_defined2(op, a.type_name(), b.type_name(), frame),
        Promoted::Poison(p) => p,
    }
}

fn logical_binop(a: Value, b: Value, frame: &FrameRef, f: impl Fn(bool, bool) -> bool) -> Value {
    let a = a.as_bool(frame);
    if let Value::Poison(_) = a {
        return a;
    }
    let b = b.as_bool(frame);
    if let Value::Poison(_) = b {
        return b;
    }
    let (Value::Bool(x), Value::Bool(y)) = (a, b) else {
        unreachable!("as_bool only returns Bool or Poison");
    };
    Value::Bool(f(x, y))
}

fn bitwise_binop(a: Value, b: Value, frame: &FrameRef, op: &str, f: impl Fn(i64, i64) -> i64) -> Value {
    let (a, b) = (a.force(), b.force());
    if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
        return p;
    }
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Value::Int(f(*x, *y)),
        _ => Value::poison_not_defined2(op, a.type_name(), b.type_name(), frame),
    }
}

fn arith(
    a: Value,
    b: Value,
    frame: &FrameRef,
    op: &str,
    int_op: impl Fn(i64, i64) -> i64,
    real_op: impl Fn(f64, f64) -> f64,
    complex_op: impl Fn(Complex64, Complex64) -> Complex64,
) -> Value {
    let (a, b) = (a.force(), b.force());
    if let Some(p) = a.poison_of().or_else(|| b.poison_of()) {
        return p;
    }
    match promote(a.clone(), b.clone(), frame) {
        Promoted::Int(x, y) => Value::Int(int_op(x, y)),
        Promoted::Real(x, y) => Value::Real(real_op(x, y)),
        Promoted::Complex(x, y) => Value::Complex(complex_op(x, y)),
        Promoted::Poison(_) => Value::poison_not_defined2(op, a.type_name(), b.type_name(), frame),
    }
}

enum Promoted {
    Int(i64, i64),
    Real(f64, f64),
    Complex(Complex64, Complex64),
    Poison(Value),
}

/// Numeric promotion. Operand order is always preserved: neither operand is
/// ever swapped to reuse the "wider" type's implementation, which keeps
/// non-commutative operators correct.
fn promote(a: Value, b: Value, frame: &FrameRef) -> Promoted {
    let a_type_name = a.type_name();
    let b_type_name = b.type_name();
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Promoted::Int(*x, *y),
        (Value::Complex(_), _) | (_, Value::Complex(_)) => match (a.as_complex(frame), b.as_complex(frame)) {
            (Value::Complex(x), Value::Complex(y)) => Promoted::Complex(x, y),
            (Value::Poison(_), _) | (_, Value::Poison(_)) => Promoted::Poison(Value::poison_not_defined2(
                "promote",
                a_type_name,
                b_type_name,
                frame,
            )),
            _ => unreachable!("as_complex returns Complex or Poison"),
        },
        (Value::Real(_), Value::Real(_) | Value::Int(_)) | (Value::Int(_), Value::Real(_)) => {
            match (a.as_real(frame), b.as_real(frame)) {
                (Value::Real(x), Value::Real(y)) => Promoted::Real(x, y),
                _ => Promoted::Poison(Value::poison_not_defined2("promote", a_type_name, b_type_name, frame)),
            }
        }
        _ => Promoted::Poison(Value::poison_not_defined2("promote", a_type_name, b_type_name, frame)),
    }
}

fn floor_div_i64(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) { Some(q - 1) } else { Some(q) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn root() -> FrameRef {
        Frame::new_root()
    }

    #[test]
    fn poison_propagates_through_add_not_and_index() {
        let frame = root();
        let poison = Value::poison("boom", frame.clone());
        let sum = poison.clone().add(Value::Int(1), &frame);
        assert!(matches!(sum, Value::Poison(_)));

        let negated = poison.clone().lnot(&frame);
        assert!(matches!(negated, Value::Poison(_)));

        let list = Value::List(Rc::new(vec![poison]));
        let indexed = list.get_item(Value::Int(0), &frame);
        assert!(matches!(indexed, Value::Poison(_)));
    }

    #[test]
    fn int_floor_div_floors_toward_negative_infinity() {
        let frame = root();
        let result = Value::Int(-7).floor_div(Value::Int(2), &frame);
        assert!(matches!(result, Value::Int(-4)));
    }

    #[test]
    fn division_by_zero_poisons_instead_of_panicking() {
        let frame = root();
        let result = Value::Int(1).div(Value::Int(0), &frame);
        assert!(matches!(result, Value::Poison(_)));
    }

    #[test]
    fn list_equality_is_pairwise_and_length_checked() {
        let frame = root();
        let a = Value::List(Rc::new(vec![Value::Int(1), Value::Int(2)]));
        let b = Value::List(Rc::new(vec![Value::Int(1), Value::Int(2)]));
        let c = Value::List(Rc::new(vec![Value::Int(1)]));
        assert!(matches!(a.clone().equal(b, &frame), Value::Bool(true)));
        assert!(matches!(a.equal(c, &frame), Value::Bool(false)));
    }

    #[test]
    fn list_concatenation_builds_new_list() {
        let frame = root();
        let a = Value::List(Rc::new(vec![Value::Int(1), Value::Int(2)]));
        let b = Value::List(Rc::new(vec![Value::Int(3)]));
        let Value::List(merged) = a.concatenate(b, &frame) else { panic!("expected list") };
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn out_of_range_index_poisons() {
        let frame = root();
        let list = Value::List(Rc::new(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        let result = list.get_item(Value::Int(5), &frame);
        assert!(matches!(result, Value::Poison(_)));
    }

    #[test]
    fn bitwise_ops_operate_on_int_only() {
        let frame = root();
        assert!(matches!(Value::Int(5).band(Value::Int(3), &frame), Value::Int(1)));
        assert!(matches!(Value::Int(5).bor(Value::Int(2), &frame), Value::Int(7)));
        assert!(matches!(Value::Int(5).bxor(Value::Int(1), &frame), Value::Int(4)));
        assert!(matches!(Value::Int(5).bnot(&frame), Value::Int(-6)));
        assert!(matches!(Value::Real(1.0).band(Value::Int(1), &frame), Value::Poison(_)));
    }

    #[test]
    fn as_int_converts_numerics_but_poisons_on_bool() {
        let frame = root();
        assert!(matches!(Value::Int(5).as_int(&frame), Value::Int(5)));
        assert!(matches!(Value::Real(3.9).as_int(&frame), Value::Int(3)));
        assert!(matches!(Value::Bool(true).as_int(&frame), Value::Poison(_)));
    }

    #[test]
    fn as_list_passes_lists_through_and_poisons_otherwise() {
        let frame = root();
        let list = Value::List(Rc::new(vec![Value::Int(1)]));
        assert!(matches!(list.as_list(&frame), Value::List(_)));
        assert!(matches!(Value::Int(1).as_list(&frame), Value::Poison(_)));
    }

    #[test]
    fn as_fun_passes_funs_through_and_poisons_otherwise() {
        let frame = root();
        let fun = Value::Fun(Rc::new(FunVal {
            arg_names: vec!["%0".to_string()],
            body: Rc::new(crate::ast::Expr::Atomic(crate::ast::AtomicExpr {
                pos: crate::source::SourcePos::start("<test>"),
                raw: "%0".to_string(),
                kind: crate::token::TokenKind::Ident,
            })),
            captured_frame: frame.clone(),
            partial_args: Vec::new(),
        }));
        assert!(matches!(fun.as_fun(&frame), Value::Fun(_)));
        assert!(matches!(Value::Int(1).as_fun(&frame), Value::Poison(_)));
    }

    #[test]
    fn fun_repr_matches_fixed_format() {
        let frame = root();
        let fun = Value::Fun(Rc::new(FunVal {
            arg_names: vec!["%0".to_string(), "%1".to_string()],
            body: Rc::new(crate::ast::Expr::Atomic(crate::ast::AtomicExpr {
                pos: crate::source::SourcePos::start("<test>"),
                raw: "%0".to_string(),
                kind: crate::token::TokenKind::Ident,
            })),
            captured_frame: frame,
            partial_args: Vec::new(),
        }));
        assert_eq!(fun.repr(), "FunType(arity=2)");
    }

    #[test]
    fn thunk_memoizes_and_runs_its_evaluator_exactly_once() {
        let calls = Rc::new(RefCell::new(0));
        let calls2 = Rc::clone(&calls);
        let thunk = Value::thunk(move || {
            *calls2.borrow_mut() += 1;
            Value::Int(42)
        });
        assert!(matches!(thunk.clone().force(), Value::Int(42)));
        assert!(matches!(thunk.force(), Value::Int(42)));
        assert_eq!(*calls.borrow(), 1);
    }
}
