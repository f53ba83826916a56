//! Unary functions under analysis.
//!
//! A [`TargetFunction`] receives one representative value per partition. The
//! two implementations are [`ScriptFunction`], which runs a parsed definition
//! in the [interpreter](crate::interp), and [`NativeFunction`], which wraps a
//! Rust closure.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::ast::SourceUnit;
use crate::interp::{Interpreter, InterpreterConfig, RuntimeError, Value};
use crate::number::Number;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("{0}")]
    Native(String),
}

pub trait TargetFunction {
    fn name(&self) -> &str;

    fn call(&self, input: Number) -> Result<Value, InvocationError>;
}

/// A function defined in a parsed source unit.
///
/// Each call runs on a fresh interpreter, so calls are isolated.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
    unit: Rc<SourceUnit>,
    name: String,
    config: InterpreterConfig,
}

impl ScriptFunction {
    pub fn new(unit: Rc<SourceUnit>, name: impl Into<String>, config: InterpreterConfig) -> Self {
        Self {
            unit,
            name: name.into(),
            config,
        }
    }
}

impl TargetFunction for ScriptFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, input: Number) -> Result<Value, InvocationError> {
        let mut interpreter = Interpreter::new(&self.unit, self.config.clone());
        let result = interpreter.call_global(&self.name, vec![Value::Num(input)]);
        trace!("{}({}) took {} steps", self.name, input, interpreter.steps());
        Ok(result?)
    }
}

/// A Rust closure standing in for the analyzed function.
pub struct NativeFunction<F> {
    name: String,
    func: F,
}

impl<F> NativeFunction<F>
where
    F: Fn(Number) -> Result<Value, String>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self { name: name.into(), func }
    }
}

impl<F> fmt::Debug for NativeFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> TargetFunction for NativeFunction<F>
where
    F: Fn(Number) -> Result<Value, String>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, input: Number) -> Result<Value, InvocationError> {
        (self.func)(input).map_err(InvocationError::Native)
    }
}

/// Native targets keyed by function name.
#[derive(Default)]
pub struct TargetRegistry {
    targets: HashMap<String, Box<dyn TargetFunction>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `target` under its own name, replacing any previous entry.
    pub fn register<T>(&mut self, target: T)
    where
        T: TargetFunction + 'static,
    {
        self.targets.insert(target.name().to_string(), Box::new(target));
    }

    pub fn get(&self, name: &str) -> Option<&dyn TargetFunction> {
        self.targets.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TargetRegistry").field("targets", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::parser::parse_source;

    fn script(src: &str, name: &str) -> ScriptFunction {
        ScriptFunction::new(Rc::new(parse_source(src).unwrap()), name, InterpreterConfig::default())
    }

    #[test]
    fn test_script_function_calls_are_isolated() {
        let f = script("fn twice(x) { let y = x * 2; return y; }", "twice");
        assert_eq!(f.name(), "twice");
        assert_eq!(f.call(Number::Int(4)).unwrap(), Value::Num(Number::Int(8)));
        assert_eq!(f.call(Number::Float(1.5)).unwrap(), Value::Num(Number::Float(3.0)));
    }

    #[test]
    fn test_script_function_errors_are_wrapped() {
        let f = script(r#"fn f(x) { if x < 0 { raise "negative"; } return 1 // x; }"#, "f");
        assert_eq!(
            f.call(Number::Int(-1)),
            Err(InvocationError::Runtime(RuntimeError::Raised("negative".to_string())))
        );
        assert_eq!(
            f.call(Number::Int(0)),
            Err(InvocationError::Runtime(RuntimeError::DivisionByZero))
        );
        assert_eq!(f.call(Number::Int(0)).unwrap_err().to_string(), "division by zero");
    }

    #[test]
    fn test_script_function_respects_step_limit() {
        let unit = Rc::new(parse_source("fn spin(x) { while true { x = x + 1; } }").unwrap());
        let f = ScriptFunction::new(unit, "spin", InterpreterConfig::default().with_step_limit(100));
        assert_eq!(
            f.call(Number::Int(0)),
            Err(InvocationError::Runtime(RuntimeError::StepLimitExceeded(100)))
        );
    }

    #[test]
    fn test_native_function() {
        let sign = NativeFunction::new("sign", |n: Number| {
            if n.is_zero() {
                Err("zero has no sign".to_string())
            } else {
                Ok(Value::Bool(n.is_positive()))
            }
        });
        assert_eq!(sign.call(Number::Int(3)).unwrap(), Value::Bool(true));
        assert_eq!(sign.call(Number::Float(-0.5)).unwrap(), Value::Bool(false));
        assert_eq!(
            sign.call(Number::Int(0)),
            Err(InvocationError::Native("zero has no sign".to_string()))
        );
    }

    #[test]
    fn test_registry() {
        let mut registry = TargetRegistry::new();
        assert!(registry.is_empty());
        registry.register(NativeFunction::new("one", |_: Number| Ok(Value::from(Number::Int(1)))));
        registry.register(script("fn two(x) { return 2; }", "two"));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("one"));
        assert_eq!(registry.get("two").unwrap().call(Number::Int(0)).unwrap(), Value::Num(Number::Int(2)));
        assert!(registry.get("three").is_none());
        assert_eq!(format!("{:?}", registry), r#"TargetRegistry { targets: ["one", "two"] }"#);
    }
}
