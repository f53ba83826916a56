//! Abstract syntax tree for the analyzable function language.
//!
//! The language supports:
//! - Numeric, string, boolean and `none` literals
//! - Arithmetic (`+ - * / // %`) and unary negation
//! - Chained comparisons (`0 <= x < 100`)
//! - Boolean connectives (`and`, `or`, `not`)
//! - Calls (`abs(x)`, user-defined functions)
//! - `let`, assignment, `if`/`else if`/`else`, `while`, `return`, `raise`
//! - Nested function definitions

use std::fmt;
use std::rc::Rc;

use crate::number::Number;

/// Variable name
pub type Name = String;

/// Comparison operator
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// Arithmetic operator
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// True division (`/`)
    Div,
    /// Floor division (`//`)
    FloorDiv,
    Rem,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Rem => "%",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Short-circuiting boolean connective
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Num(Number),
    Str(String),
    Bool(bool),
    None,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Variable reference
    Var(Name),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Logic(LogicOp, Box<Expr>, Box<Expr>),
    /// Comparison chain: `left op1 c1 op2 c2 ...`.
    ///
    /// `0 <= x < 100` is `Compare { left: 0, rest: [(Le, x), (Lt, 100)] }`.
    /// Each `ci` is a right-hand comparator.
    Compare { left: Box<Expr>, rest: Vec<(CmpOp, Expr)> },
    Call { callee: Name, args: Vec<Expr> },
}

// Constructors
impl Expr {
    pub fn num(value: impl Into<Number>) -> Self {
        Expr::Literal(Literal::Num(value.into()))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(value.into()))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn compare(lhs: Expr, op: CmpOp, rhs: Expr) -> Self {
        Expr::Compare {
            left: Box::new(lhs),
            rest: vec![(op, rhs)],
        }
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            args,
        }
    }

    /// Returns the numeric value if this expression is a numeric literal.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Expr::Literal(Literal::Num(n)) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Num(n) => write!(f, "{}", n),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::None => write!(f, "none"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Var(v) => write!(f, "{}", v),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-({})", e),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "not ({})", e),
            Expr::Binary(op, l, r) => write!(f, "({} {} {})", l, op.symbol(), r),
            Expr::Logic(LogicOp::And, l, r) => write!(f, "({} and {})", l, r),
            Expr::Logic(LogicOp::Or, l, r) => write!(f, "({} or {})", l, r),
            Expr::Compare { left, rest } => {
                write!(f, "({}", left)?;
                for (op, e) in rest {
                    write!(f, " {} {}", op.symbol(), e)?;
                }
                write!(f, ")")
            }
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Binding: let var = expr
    Let(Name, Expr),
    /// Assignment to an existing binding: var = expr
    Assign(Name, Expr),
    /// Conditional. `else if` chains nest in `else_body`.
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While { condition: Expr, body: Vec<Stmt> },
    Return(Option<Expr>),
    /// Abort the call with an error built from the expression
    Raise(Expr),
    /// Nested function definition
    Def(Rc<FunctionDef>),
    Expr(Expr),
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

impl Stmt {
    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let ind = "    ".repeat(indent);
        match self {
            Stmt::Let(v, e) => writeln!(f, "{}let {} = {};", ind, v, e),
            Stmt::Assign(v, e) => writeln!(f, "{}{} = {};", ind, v, e),
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                writeln!(f, "{}if {} {{", ind, condition)?;
                for stmt in then_body {
                    stmt.fmt_indent(f, indent + 1)?;
                }
                if !else_body.is_empty() {
                    writeln!(f, "{}}} else {{", ind)?;
                    for stmt in else_body {
                        stmt.fmt_indent(f, indent + 1)?;
                    }
                }
                writeln!(f, "{}}}", ind)
            }
            Stmt::While { condition, body } => {
                writeln!(f, "{}while {} {{", ind, condition)?;
                for stmt in body {
                    stmt.fmt_indent(f, indent + 1)?;
                }
                writeln!(f, "{}}}", ind)
            }
            Stmt::Return(Some(e)) => writeln!(f, "{}return {};", ind, e),
            Stmt::Return(None) => writeln!(f, "{}return;", ind),
            Stmt::Raise(e) => writeln!(f, "{}raise {};", ind, e),
            Stmt::Def(def) => def.fmt_indent(f, indent),
            Stmt::Expr(e) => writeln!(f, "{}{};", ind, e),
        }
    }
}

/// A named function with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<Name>,
    pub body: Vec<Stmt>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, params: Vec<Name>, body: Vec<Stmt>) -> Self {
        FunctionDef {
            name: name.into(),
            params,
            body,
        }
    }

    /// The parameter used to label partitions, i.e. the first one.
    pub fn primary_param(&self) -> Option<&str> {
        self.params.first().map(|p| p.as_str())
    }

    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let ind = "    ".repeat(indent);
        writeln!(f, "{}fn {}({}) {{", ind, self.name, self.params.join(", "))?;
        for stmt in &self.body {
            stmt.fmt_indent(f, indent + 1)?;
        }
        writeln!(f, "{}}}", ind)
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

/// All top-level definitions parsed from one source text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceUnit {
    pub functions: Vec<Rc<FunctionDef>>,
}

impl SourceUnit {
    pub fn function(&self, name: &str) -> Option<&Rc<FunctionDef>> {
        self.functions.iter().find(|def| def.name == name)
    }

    pub fn first(&self) -> Option<&Rc<FunctionDef>> {
        self.functions.first()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|def| def.name.as_str())
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, def) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", def)?;
        }
        Ok(())
    }
}
