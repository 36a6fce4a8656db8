//! The closed expression/statement variant set, plus the read-only `Node`
//! interface (string-repr, JSON-repr, and the three variable-name sets)
//! every variant implements.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::source::SourcePos;
use crate::token::Token;

/// A set of identifier names. A plain `BTreeSet` gives deterministic
/// iteration order, which keeps string-repr output and tests stable.
pub type VarSet = BTreeSet<String>;

/// The read-only interface every AST node exposes: its position, a
/// human-readable repr, a JSON repr, and its three variable-name sets.
pub trait Node {
    fn pos(&self) -> SourcePos;
    fn string_repr(&self) -> String;
    fn json_repr(&self) -> serde_json::Value;

    /// All identifier names occurring anywhere in this node.
    fn vars(&self) -> VarSet;
    /// Identifier names that occur free (not bound by an enclosing binder
    /// within this node).
    fn free_vars(&self) -> VarSet;
    /// Identifier names that occur bound by a binder within this node.
    fn bound_vars(&self) -> VarSet;
}

#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Atomic(AtomicExpr),
    List(ListExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Application(ApplicationExpr),
    Conditional(ConditionalExpr),
    Fun(FunExpr),
    Let(LetExpr),
}

#[derive(Debug, Clone, Serialize)]
pub struct AtomicExpr {
    pub pos: SourcePos,
    pub raw: String,
    pub kind: crate::token::TokenKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListExpr {
    pub pos: SourcePos,
    pub items: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnaryExpr {
    pub pos: SourcePos,
    pub op: Token,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryExpr {
    pub pos: SourcePos,
    pub lhs: Box<Expr>,
    pub op: Token,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationExpr {
    pub pos: SourcePos,
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionalExpr {
    pub pos: SourcePos,
    pub cond: Box<Expr>,
    pub consequent: Box<Expr>,
    pub alternative: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunExpr {
    pub pos: SourcePos,
    /// Parameter names *after* parse-time alpha-renaming (`%<counter>`).
    pub arg_names: Vec<String>,
    pub body: Box<Expr>,
}

impl FunExpr {
    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LetExpr {
    pub pos: SourcePos,
    pub init_names: Vec<String>,
    pub init_exprs: Vec<Expr>,
    pub body: Box<Expr>,
    pub is_rec: bool,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Def(DefStmt),
    ModuleDecl(ModuleDeclStmt),
    Load(LoadStmt),
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize)]
pub struct DefStmt {
    pub pos: SourcePos,
    pub names: Vec<String>,
    pub exprs: Vec<Expr>,
    pub is_rec: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDeclStmt {
    pub pos: SourcePos,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadStmt {
    pub pos: SourcePos,
    pub name: String,
}

fn union_all<'a>(sets: impl IntoIterator<Item = &'a VarSet>) -> VarSet {
    let mut out = VarSet::new();
    for s in sets {
        out.extend(s.iter().cloned());
    }
    out
}

fn difference(a: &VarSet, b: &VarSet) -> VarSet {
    a.difference(b).cloned().collect()
}

fn intersection(a: &VarSet, b: &VarSet) -> VarSet {
    a.intersection(b).cloned().collect()
}

impl Node for Expr {
    fn pos(&self) -> SourcePos {
        match self {
            Self::Atomic(e) => e.pos,
            Self::List(e) => e.pos,
            Self::Unary(e) => e.pos,
            Self::Binary(e) => e.pos,
            Self::Application(e) => e.pos,
            Self::Conditional(e) => e.pos,
            Self::Fun(e) => e.pos,
            Self::Let(e) => e.pos,
        }
    }

    fn string_repr(&self) -> String {
        match self {
            Self::Atomic(e) => e.raw.clone(),
            Self::List(e) => {
                format!("[{}]", e.items.iter().map(Node::string_repr).collect::<Vec<_>>().join(", "))
            }
            Self::Unary(e) => format!("({}{})", e.op.raw, e.expr.string_repr()),
            Self::Binary(e) => format!("({} {} {})", e.lhs.string_repr(), e.op.raw, e.rhs.string_repr()),
            Self::Application(e) => {
                format!(
                    "{}({})",
                    e.func.string_repr(),
                    e.args.iter().map(Node::string_repr).collect::<Vec<_>>().join(", ")
                )
            }
            Self::Conditional(e) => match &e.alternative {
                Some(alt) => format!(
                    "(if {} then {} else {})",
                    e.cond.string_repr(),
                    e.consequent.string_repr(),
                    alt.string_repr()
                ),
                None => format!("(if {} then {})", e.cond.string_repr(), e.consequent.string_repr()),
            },
            Self::Fun(e) => format!("(fn {} -> {})", e.arg_names.join(", "), e.body.string_repr()),
            Self::Let(e) => {
                let binds = e
                    .init_names
                    .iter()
                    .zip(&e.init_exprs)
                    .map(|(n, x)| format!("{n} = {}", x.string_repr()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let kw = if e.is_rec { "let rec" } else { "let" };
                format!("({kw} {binds} in {})", e.body.string_repr())
            }
        }
    }

    fn json_repr(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn vars(&self) -> VarSet {
        match self {
            Self::Atomic(e) => e.vars(),
            Self::List(e) => union_all(e.items.iter().map(Node::vars).collect::<Vec<_>>().iter()),
            Self::Unary(e) => e.expr.vars(),
            Self::Binary(e) => union_all([e.lhs.vars(), e.rhs.vars()].iter()),
            Self::Application(e) => {
                let mut sets = vec![e.func.vars()];
                sets.extend(e.args.iter().map(Node::vars));
                union_all(sets.iter())
            }
            Self::Conditional(e) => {
                let mut sets = vec![e.cond.vars(), e.consequent.vars()];
                if let Some(alt) = &e.alternative {
                    sets.push(alt.vars());
                }
                union_all(sets.iter())
            }
            Self::Fun(e) => e.body.vars(),
            Self::Let(e) => {
                let mut sets: Vec<VarSet> = e.init_exprs.iter().map(Node::vars).collect();
                sets.push(e.body.vars());
                union_all(sets.iter())
            }
        }
    }

    fn free_vars(&self) -> VarSet {
        match self {
            Self::Atomic(e) => e.free_vars(),
            Self::List(e) => union_all(e.items.iter().map(Node::free_vars).collect::<Vec<_>>().iter()),
            Self::Unary(e) => e.expr.free_vars(),
            Self::Binary(e) => union_all([e.lhs.free_vars(), e.rhs.free_vars()].iter()),
            Self::Application(e) => {
                let mut sets = vec![e.func.free_vars()];
                sets.extend(e.args.iter().map(Node::free_vars));
                union_all(sets.iter())
            }
            Self::Conditional(e) => {
                let mut sets = vec![e.cond.free_vars(), e.consequent.free_vars()];
                if let Some(alt) = &e.alternative {
                    sets.push(alt.free_vars());
                }
                union_all(sets.iter())
            }
            Self::Fun(e) => {
                let arg_names: VarSet = e.arg_names.iter().cloned().collect();
                difference(&e.body.free_vars(), &arg_names)
            }
            Self::Let(e) => {
                let init_names: VarSet = e.init_names.iter().cloned().collect();
                if e.is_rec {
                    let mut sets: Vec<VarSet> =
                        e.init_exprs.iter().map(|x| difference(&x.free_vars(), &init_names)).collect();
                    sets.push(difference(&e.body.free_vars(), &init_names));
                    union_all(sets.iter())
                } else {
                    let mut sets: Vec<VarSet> = e.init_exprs.iter().map(Node::vars).collect();
                    sets.push(e.body.free_vars());
                    difference(&union_all(sets.iter()), &init_names)
                }
            }
        }
    }

    fn bound_vars(&self) -> VarSet {
        match self {
            Self::Atomic(e) => e.bound_vars(),
            Self::List(e) => union_all(e.items.iter().map(Node::bound_vars).collect::<Vec<_>>().iter()),
            Self::Unary(e) => e.expr.bound_vars(),
            Self::Binary(e) => union_all([e.lhs.bound_vars(), e.rhs.bound_vars()].iter()),
            Self::Application(e) => {
                let mut sets = vec![e.func.bound_vars()];
                sets.extend(e.args.iter().map(Node::bound_vars));
                union_all(sets.iter())
            }
            Self::Conditional(e) => {
                let mut sets = vec![e.cond.bound_vars(), e.consequent.bound_vars()];
                if let Some(alt) = &e.alternative {
                    sets.push(alt.bound_vars());
                }
                union_all(sets.iter())
            }
            Self::Fun(e) => {
                let arg_names: VarSet = e.arg_names.iter().cloned().collect();
                intersection(&arg_names, &e.body.free_vars())
            }
            Self::Let(e) => {
                let init_names: VarSet = e.init_names.iter().cloned().collect();
                let mut sets: Vec<VarSet> = e.init_exprs.iter().map(Node::vars).collect();
                sets.push(e.body.bound_vars());
                intersection(&init_names, &union_all(sets.iter()))
            }
        }
    }
}

impl Node for AtomicExpr {
    fn pos(&self) -> SourcePos {
        self.pos
    }

    fn string_repr(&self) -> String {
        self.raw.clone()
    }

    fn json_repr(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn vars(&self) -> VarSet {
        self.free_vars()
    }

    fn free_vars(&self) -> VarSet {
        if self.kind == crate::token::TokenKind::Ident {
            VarSet::from([self.raw.clone()])
        } else {
            VarSet::new()
        }
    }

    fn bound_vars(&self) -> VarSet {
        VarSet::new()
    }
}

impl Node for Stmt {
    fn pos(&self) -> SourcePos {
        match self {
            Self::Def(s) => s.pos,
            Self::ModuleDecl(s) => s.pos,
            Self::Load(s) => s.pos,
            Self::Expr(e) => e.pos(),
        }
    }

    fn string_repr(&self) -> String {
        match self {
            Self::Def(s) => {
                let binds = s
                    .names
                    .iter()
                    .zip(&s.exprs)
                    .map(|(n, x)| format!("{n} = {}", x.string_repr()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let kw = if s.is_rec { "def rec" } else { "def" };
                format!("{kw} {binds};")
            }
            Self::ModuleDecl(s) => format!("module {};", s.name),
            Self::Load(s) => format!("using {};", s.name),
            Self::Expr(e) => format!("{};", e.string_repr()),
        }
    }

    fn json_repr(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn vars(&self) -> VarSet {
        match self {
            Self::Def(s) => {
                let mut out = union_all(s.exprs.iter().map(Node::vars).collect::<Vec<_>>().iter());
                out.extend(s.names.iter().cloned());
                out
            }
            Self::ModuleDecl(_) | Self::Load(_) => VarSet::new(),
            Self::Expr(e) => e.vars(),
        }
    }

    fn free_vars(&self) -> VarSet {
        match self {
            Self::Def(s) => {
                let names: VarSet = s.names.iter().cloned().collect();
                if s.is_rec {
                    difference(&union_all(s.exprs.iter().map(Node::free_vars).collect::<Vec<_>>().iter()), &names)
                } else {
                    difference(&union_all(s.exprs.iter().map(Node::vars).collect::<Vec<_>>().iter()), &names)
                }
            }
            Self::ModuleDecl(_) | Self::Load(_) => VarSet::new(),
            Self::Expr(e) => e.free_vars(),
        }
    }

    fn bound_vars(&self) -> VarSet {
        match self {
            Self::Def(s) => {
                let names: VarSet = s.names.iter().cloned().collect();
                intersection(&names, &union_all(s.exprs.iter().map(Node::vars).collect::<Vec<_>>().iter()))
            }
            Self::ModuleDecl(_) | Self::Load(_) => VarSet::new(),
            Self::Expr(e) => e.bound_vars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn ident(name: &str) -> Expr {
        Expr::Atomic(AtomicExpr { pos: SourcePos::start("<test>"), raw: name.to_string(), kind: TokenKind::Ident })
    }

    #[test]
    fn fun_free_excludes_arg_names() {
        let fun = FunExpr {
            pos: SourcePos::start("<test>"),
            arg_names: vec!["%0".to_string()],
            body: Box::new(ident("%0")),
        };
        let e = Expr::Fun(fun);
        assert!(e.free_vars().is_empty());
    }

    #[test]
    fn fun_free_keeps_outer_names() {
        let fun = FunExpr {
            pos: SourcePos::start("<test>"),
            arg_names: vec!["%0".to_string()],
            body: Box::new(ident("outer")),
        };
        let e = Expr::Fun(fun);
        assert_eq!(e.free_vars(), VarSet::from(["outer".to_string()]));
    }

    #[test]
    fn fun_vars_excludes_unused_arg_names() {
        let fun = FunExpr {
            pos: SourcePos::start("<test>"),
            arg_names: vec!["x".to_string()],
            body: Box::new(Expr::Atomic(AtomicExpr {
                pos: SourcePos::start("<test>"),
                raw: "5".to_string(),
                kind: TokenKind::Integer,
            })),
        };
        let e = Expr::Fun(fun);
        assert!(e.vars().is_empty());
    }

    #[test]
    fn let_vars_excludes_unused_init_names() {
        let let_expr = LetExpr {
            pos: SourcePos::start("<test>"),
            is_rec: false,
            init_names: vec!["x".to_string()],
            init_exprs: vec![ident("y")],
            body: Box::new(Expr::Atomic(AtomicExpr {
                pos: SourcePos::start("<test>"),
                raw: "5".to_string(),
                kind: TokenKind::Integer,
            })),
        };
        let e = Expr::Let(let_expr);
        assert_eq!(e.vars(), VarSet::from(["y".to_string()]));
    }

    #[test]
    fn variable_set_laws_hold_for_atomic() {
        let e = ident("x");
        assert!(e.free_vars().is_subset(&e.vars()));
        assert!(e.bound_vars().is_subset(&e.vars()));
    }
}
