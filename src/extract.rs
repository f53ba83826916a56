//! Boundary extraction.
//!
//! Walks a parsed function and collects every distinct numeric literal that
//! appears as a right-hand comparator of a comparison. For `0 <= x < 100` the
//! comparators are `x` and `100`, so only `100` is a boundary: the tested
//! variable is assumed to sit on the left.
//!
//! Identifiers, arithmetic and non-numeric literals in comparator position are
//! skipped. The traversal reaches every expression in the body, including
//! nested conditionals, loops, call arguments and nested function bodies.
//!
//! # Example
//!
//! ```rust
//! use eqclass::extract::extract_boundaries;
//! use eqclass::number::Number;
//! use eqclass::parser::parse_function;
//!
//! let def = parse_function("fn f(x) { if x < 18 { return 1; } return 0; }").unwrap();
//! let boundaries = extract_boundaries(&def);
//! assert_eq!(boundaries.as_slice(), &[Number::Int(18)]);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, trace};

use crate::ast::{Expr, FunctionDef, Stmt};
use crate::number::Number;

/// Sorted, deduplicated boundaries of one function.
///
/// # Invariants
///
/// - Values are strictly ascending (hence distinct).
/// - `Int(3)` and `Float(3.0)` are the same boundary; the first one seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundarySet {
    values: Vec<Number>,
}

impl BoundarySet {
    /// Builds a set from arbitrary values, sorting and collapsing duplicates.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Number>,
    {
        let mut set = BTreeSet::new();
        for value in values {
            set.insert(value);
        }
        BoundarySet {
            values: set.into_iter().collect(),
        }
    }

    pub fn as_slice(&self) -> &[Number] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Number> + '_ {
        self.values.iter().copied()
    }

    pub fn min(&self) -> Option<Number> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<Number> {
        self.values.last().copied()
    }

    /// Consecutive `(low, high)` pairs.
    pub fn windows(&self) -> impl Iterator<Item = (Number, Number)> + '_ {
        self.values.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn into_vec(self) -> Vec<Number> {
        self.values
    }
}

impl fmt::Display for BoundarySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

/// Collects boundaries over one traversal.
#[derive(Debug, Default)]
pub struct BoundaryExtractor {
    found: BTreeSet<Number>,
    comparisons: usize,
}

impl BoundaryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit_function(&mut self, def: &FunctionDef) {
        trace!("visit fn {}", def.name);
        self.visit_block(&def.body);
    }

    pub fn visit_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    pub fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let(_, e) | Stmt::Assign(_, e) | Stmt::Raise(e) | Stmt::Expr(e) => self.visit_expr(e),
            Stmt::Return(value) => {
                if let Some(e) = value {
                    self.visit_expr(e);
                }
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                self.visit_expr(condition);
                self.visit_block(then_body);
                self.visit_block(else_body);
            }
            Stmt::While { condition, body } => {
                self.visit_expr(condition);
                self.visit_block(body);
            }
            Stmt::Def(def) => self.visit_function(def),
        }
    }

    pub fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::Var(_) => {}
            Expr::Unary(_, e) => self.visit_expr(e),
            Expr::Binary(_, l, r) | Expr::Logic(_, l, r) => {
                self.visit_expr(l);
                self.visit_expr(r);
            }
            Expr::Compare { left, rest } => {
                self.comparisons += 1;
                self.visit_expr(left);
                for (op, comparator) in rest {
                    if let Some(n) = comparator.as_number() {
                        trace!("boundary {} via `{}`", n, op.symbol());
                        self.found.insert(n);
                    } else {
                        self.visit_expr(comparator);
                    }
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    self.visit_expr(arg);
                }
            }
        }
    }

    /// Number of comparison nodes visited so far.
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    pub fn finish(self) -> BoundarySet {
        debug!(
            "extracted {} boundaries from {} comparisons",
            self.found.len(),
            self.comparisons
        );
        BoundarySet {
            values: self.found.into_iter().collect(),
        }
    }
}

/// Collects the boundaries of a single function.
pub fn extract_boundaries(def: &FunctionDef) -> BoundarySet {
    let mut extractor = BoundaryExtractor::new();
    extractor.visit_function(def);
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::parser::parse_function;

    fn boundaries(src: &str) -> Vec<Number> {
        extract_boundaries(&parse_function(src).unwrap()).into_vec()
    }

    fn ints(values: &[i64]) -> Vec<Number> {
        values.iter().copied().map(Number::Int).collect()
    }

    #[test]
    fn test_sample_pricing_function() {
        let src = r#"
            fn determine_price(age) {
                if age < 0 {
                    return "Invalid Age";
                } else if age < 3 {
                    return "Free (Infant)";
                } else if age < 13 {
                    return "Child Price";
                } else if age < 60 {
                    return "Adult Price";
                } else {
                    return "Senior Price";
                }
            }
        "#;
        assert_eq!(boundaries(src), ints(&[0, 3, 13, 60]));
    }

    #[test]
    fn test_duplicates_collapse_and_sort() {
        let src = "fn f(x) { if x > 10 { return 1; } if x >= 10.0 { return 2; } if x < 2 { return 3; } return 0; }";
        let found = boundaries(src);
        assert_eq!(found, ints(&[2, 10]));
        // The first spelling seen wins.
        assert!(found[1].is_int());
    }

    #[test]
    fn test_mixed_int_and_float() {
        let src = "fn f(x) { if x < 2.5 { return 1; } if x >= 7 { return 2; } return 0; }";
        assert_eq!(boundaries(src), vec![Number::Float(2.5), Number::Int(7)]);
    }

    #[test]
    fn test_left_operands_are_ignored() {
        let src = "fn f(x) { if 5 < x { return 1; } if 0 <= x < 100 { return 2; } return 0; }";
        assert_eq!(boundaries(src), ints(&[100]));
    }

    #[test]
    fn test_non_comparison_constants_are_ignored() {
        let src = r#"
            fn f(x) {
                let y = x * 42 + 7;
                if y < x + 3 { return "a"; }
                if x == "text" { return "b"; }
                if x != true { return "c"; }
                return y - 1;
            }
        "#;
        assert!(boundaries(src).is_empty());
    }

    #[test]
    fn test_nested_constructs_are_visited() {
        let src = r#"
            fn f(x) {
                while x > 1 {
                    if x % 2 == 0 {
                        x = x // 2;
                    } else {
                        x = abs(x - 50 < 7);
                    }
                }
                fn inner(v) {
                    return v >= 1000 or not (v < -20);
                }
                raise inner(x > 3);
            }
        "#;
        assert_eq!(boundaries(src), ints(&[-20, 0, 1, 3, 7, 1000]));
    }

    #[test]
    fn test_comparison_inside_left_operand() {
        // The left operand is traversed even though it is never a boundary.
        let src = "fn f(x) { return (x < 4) == true; }";
        assert_eq!(boundaries(src), ints(&[4]));
    }

    #[test]
    fn test_no_comparisons_gives_empty_set() {
        let set = extract_boundaries(&parse_function("fn f(x) { return x * 2; }").unwrap());
        assert!(set.is_empty());
        assert_eq!(set.min(), None);
        assert_eq!(set.to_string(), "[]");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let src = "fn f(x) { if x < 9 { return 1; } if x > 4 { return 2; } return 3; }";
        let first = extract_boundaries(&parse_function(src).unwrap());
        let second = extract_boundaries(&parse_function(src).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "[4, 9]");
    }

    #[test]
    fn test_counts_comparisons() {
        let def = parse_function("fn f(x) { return x < 1 and x == y and 2 > x; }").unwrap();
        let mut extractor = BoundaryExtractor::new();
        extractor.visit_function(&def);
        assert_eq!(extractor.comparisons(), 3);
        assert_eq!(extractor.finish().into_vec(), ints(&[1]));
    }
}
