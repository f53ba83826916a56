//! Tree-walking interpreter for the function language.
//!
//! Used by the driver to run an analyzed function on each representative
//! input. Every call starts from a fresh [`Interpreter`], so one failing input
//! never leaks state into the next.
//!
//! # Semantics
//!
//! - Integer arithmetic is exact and overflow is an error; any float operand promotes.
//! - `/` is true division, `//` and `%` round toward negative infinity.
//! - Division or remainder by zero is an error, for floats too.
//! - `none`, `false`, `0`, `0.0` and `""` are falsy.
//! - A function that falls off its end returns `none`.
//! - Nested functions capture the bindings visible at their definition and
//!   may call themselves.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::ast::{BinOp, CmpOp, Expr, FunctionDef, Literal, LogicOp, Name, SourceUnit, Stmt, UnaryOp};
use crate::number::Number;

/// Variable bindings of one call frame.
pub type Env = HashMap<Name, Value>;

/// A function value together with the bindings it closes over.
#[derive(Debug)]
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub captured: Env,
}

/// Runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Num(Number),
    Str(Rc<str>),
    Func(Rc<Closure>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Num(Number::Int(_)) => "int",
            Value::Num(Number::Float(_)) => "float",
            Value::Str(_) => "str",
            Value::Func(_) => "fn",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Num(n) => !n.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::Func(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Func(c) => write!(f, "<fn {}>", c.def.name),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Num(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(Name),
    #[error("unknown function `{0}`")]
    UnknownFunction(Name),
    #[error("`{0}` is not callable")]
    NotCallable(Name),
    #[error("`{name}` expects {expected} argument(s), got {found}")]
    Arity {
        name: Name,
        expected: String,
        found: usize,
    },
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("arithmetic produced a non-finite float")]
    NonFinite,
    #[error("{0}")]
    Raised(String),
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),
    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Budget of statement and expression evaluations per top-level call.
    pub step_limit: u64,
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            step_limit: 1_000_000,
            max_call_depth: 128,
        }
    }
}

impl InterpreterConfig {
    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

/// Control flow out of a block.
enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    config: InterpreterConfig,
    globals: Env,
    steps: u64,
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter whose globals are the top-level functions of `unit`.
    pub fn new(unit: &SourceUnit, config: InterpreterConfig) -> Self {
        let globals = unit
            .functions
            .iter()
            .map(|def| {
                let closure = Closure {
                    def: Rc::clone(def),
                    captured: Env::new(),
                };
                (def.name.clone(), Value::Func(Rc::new(closure)))
            })
            .collect();
        Self {
            config,
            globals,
            steps: 0,
            depth: 0,
        }
    }

    /// Number of evaluation steps consumed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Calls a top-level function by name.
    pub fn call_global(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match self.globals.get(name).cloned() {
            Some(Value::Func(closure)) => self.call_closure(&closure, args),
            Some(_) => Err(RuntimeError::NotCallable(name.to_string())),
            None => Err(RuntimeError::UnknownFunction(name.to_string())),
        }
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let def = &closure.def;
        if args.len() != def.params.len() {
            return Err(RuntimeError::Arity {
                name: def.name.clone(),
                expected: def.params.len().to_string(),
                found: args.len(),
            });
        }
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded(self.config.max_call_depth));
        }
        trace!("call {}({} args)", def.name, args.len());

        let mut env = closure.captured.clone();
        env.insert(def.name.clone(), Value::Func(Rc::clone(closure)));
        for (param, arg) in def.params.iter().zip(args) {
            env.insert(param.clone(), arg);
        }

        self.depth += 1;
        let flow = self.exec_block(&def.body, &mut env);
        self.depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > self.config.step_limit {
            return Err(RuntimeError::StepLimitExceeded(self.config.step_limit));
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &mut Env) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec_stmt(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &mut Env) -> Result<Flow, RuntimeError> {
        self.tick()?;
        match stmt {
            Stmt::Let(name, expr) => {
                let value = self.eval(expr, env)?;
                env.insert(name.clone(), value);
            }
            Stmt::Assign(name, expr) => {
                let value = self.eval(expr, env)?;
                match env.get_mut(name) {
                    Some(slot) => *slot = value,
                    None => return Err(RuntimeError::UndefinedVariable(name.clone())),
                }
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                let branch = if self.eval(condition, env)?.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                return self.exec_block(branch, env);
            }
            Stmt::While { condition, body } => {
                while self.eval(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Raise(expr) => {
                let value = self.eval(expr, env)?;
                return Err(RuntimeError::Raised(value.to_string()));
            }
            Stmt::Def(def) => {
                let closure = Closure {
                    def: Rc::clone(def),
                    captured: env.clone(),
                };
                env.insert(def.name.clone(), Value::Func(Rc::new(closure)));
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &Expr, env: &mut Env) -> Result<Value, RuntimeError> {
        self.tick()?;
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Num(n) => Value::Num(*n),
                Literal::Str(s) => Value::str(s),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::None => Value::None,
            }),
            Expr::Var(name) => env
                .get(name)
                .or_else(|| self.globals.get(name))
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
            Expr::Unary(UnaryOp::Not, e) => Ok(Value::Bool(!self.eval(e, env)?.is_truthy())),
            Expr::Unary(UnaryOp::Neg, e) => match self.eval(e, env)? {
                Value::Num(n) => n.checked_neg().map(Value::Num).ok_or(RuntimeError::IntegerOverflow),
                other => Err(RuntimeError::Type(format!("cannot negate {}", other.type_name()))),
            },
            Expr::Binary(op, l, r) => {
                let lhs = self.eval(l, env)?;
                let rhs = self.eval(r, env)?;
                binary(*op, lhs, rhs)
            }
            Expr::Logic(op, l, r) => {
                let lhs = self.eval(l, env)?;
                match (op, lhs.is_truthy()) {
                    (LogicOp::And, false) | (LogicOp::Or, true) => Ok(lhs),
                    _ => self.eval(r, env),
                }
            }
            Expr::Compare { left, rest } => {
                let mut lhs = self.eval(left, env)?;
                for (op, e) in rest {
                    let rhs = self.eval(e, env)?;
                    if !compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call { callee, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, env)?);
                }
                match env.get(callee).or_else(|| self.globals.get(callee)).cloned() {
                    Some(Value::Func(closure)) => self.call_closure(&closure, values),
                    Some(_) => Err(RuntimeError::NotCallable(callee.clone())),
                    None => builtin(callee, values),
                }
            }
        }
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    let (a, b) = match (&lhs, &rhs) {
        (Value::Num(a), Value::Num(b)) => (*a, *b),
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            return Ok(Value::str(format!("{}{}", a, b)));
        }
        _ => {
            return Err(RuntimeError::Type(format!(
                "unsupported operands for `{}`: {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            )))
        }
    };
    if matches!(op, BinOp::Div | BinOp::FloorDiv | BinOp::Rem) && b.is_zero() {
        return Err(RuntimeError::DivisionByZero);
    }
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => a.checked_div(b),
        BinOp::FloorDiv => a.checked_floor_div(b),
        BinOp::Rem => a.checked_rem(b),
    }
    .ok_or(RuntimeError::IntegerOverflow)?;
    if !result.is_finite() {
        return Err(RuntimeError::NonFinite);
    }
    Ok(Value::Num(result))
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, RuntimeError> {
    if matches!(op, CmpOp::Eq | CmpOp::Ne) {
        return Ok((lhs == rhs) == (op == CmpOp::Eq));
    }
    let ordering = match (lhs, rhs) {
        (Value::Num(a), Value::Num(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            return Err(RuntimeError::Type(format!(
                "cannot compare {} {} {}",
                lhs.type_name(),
                op.symbol(),
                rhs.type_name()
            )))
        }
    };
    Ok(match op {
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::Ne => ordering.is_ne(),
    })
}

fn expect_args(name: &str, args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::Arity {
            name: name.to_string(),
            expected: expected.to_string(),
            found: args.len(),
        })
    }
}

fn numeric_arg(name: &str, value: &Value) -> Result<Number, RuntimeError> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::Type(format!("`{}` expects a number, got {}", name, value.type_name())))
}

fn builtin(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match name {
        "abs" => {
            expect_args(name, &args, 1)?;
            let n = numeric_arg(name, &args[0])?;
            n.abs().map(Value::Num).ok_or(RuntimeError::IntegerOverflow)
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(RuntimeError::Arity {
                    name: name.to_string(),
                    expected: "at least 1".to_string(),
                    found: 0,
                });
            }
            let mut best = numeric_arg(name, &args[0])?;
            for arg in &args[1..] {
                let n = numeric_arg(name, arg)?;
                if (name == "min" && n < best) || (name == "max" && n > best) {
                    best = n;
                }
            }
            Ok(Value::Num(best))
        }
        "int" => {
            expect_args(name, &args, 1)?;
            match &args[0] {
                Value::Num(Number::Int(n)) => Ok(Value::Num(Number::Int(*n))),
                Value::Num(Number::Float(x)) => {
                    let t = x.trunc();
                    if t >= -9_223_372_036_854_775_808.0 && t < 9_223_372_036_854_775_808.0 {
                        Ok(Value::Num(Number::Int(t as i64)))
                    } else {
                        Err(RuntimeError::IntegerOverflow)
                    }
                }
                Value::Bool(b) => Ok(Value::Num(Number::Int(i64::from(*b)))),
                Value::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|n| Value::Num(Number::Int(n)))
                    .map_err(|_| RuntimeError::Type(format!("invalid literal for int(): {:?}", s))),
                other => Err(RuntimeError::Type(format!("int() does not accept {}", other.type_name()))),
            }
        }
        "float" => {
            expect_args(name, &args, 1)?;
            match &args[0] {
                Value::Num(n) => Ok(Value::Num(Number::Float(n.as_f64()))),
                Value::Bool(b) => Ok(Value::Num(Number::Float(if *b { 1.0 } else { 0.0 }))),
                Value::Str(s) => match s.trim().parse::<f64>() {
                    Ok(x) if x.is_finite() => Ok(Value::Num(Number::Float(x))),
                    _ => Err(RuntimeError::Type(format!("invalid literal for float(): {:?}", s))),
                },
                other => Err(RuntimeError::Type(format!("float() does not accept {}", other.type_name()))),
            }
        }
        "str" => {
            expect_args(name, &args, 1)?;
            Ok(Value::str(args[0].to_string()))
        }
        "len" => {
            expect_args(name, &args, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Num(Number::Int(s.chars().count() as i64))),
                other => Err(RuntimeError::Type(format!("len() does not accept {}", other.type_name()))),
            }
        }
        _ => Err(RuntimeError::UnknownFunction(name.to_string())),
    }
}
