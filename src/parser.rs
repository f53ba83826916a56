//! Recursive-descent parser for the function language.
//!
//! ### Grammar (informal)
//!
//! ```text
//! unit     := function*
//! function := "fn" IDENT "(" params? ")" block
//! block    := "{" stmt* "}"
//! stmt     := "let" IDENT "=" expr ";"
//!           | IDENT "=" expr ";"
//!           | "if" expr block ("else" (block | if-stmt))?
//!           | "while" expr block
//!           | "return" expr? ";"
//!           | "raise" expr ";"
//!           | function
//!           | expr ";"
//! expr     := or
//! or       := and (("or" | "||") and)*
//! and      := not (("and" | "&&") not)*
//! not      := ("not" | "!") not | compare
//! compare  := sum (CMP sum)*
//! sum      := term (("+" | "-") term)*
//! term     := unary (("*" | "/" | "//" | "%") unary)*
//! unary    := "-" unary | primary
//! primary  := NUMBER | STRING | "true" | "false" | "none"
//!           | IDENT ("(" args? ")")? | "(" expr ")"
//! ```
//!
//! A `-` applied directly to a numeric literal is folded into a negative
//! literal, so `x < -5` compares against the constant `-5`.

use std::rc::Rc;

use log::debug;

use crate::ast::{BinOp, CmpOp, Expr, FunctionDef, Literal, LogicOp, Name, SourceUnit, Stmt, UnaryOp};
use crate::lexer::{Lexer, SpannedToken, Token};

/// Maximum nesting depth for blocks and parenthesized expressions.
const MAX_NESTING: usize = 128;

/// Errors produced while tokenizing or parsing source text.
///
/// Every positional variant carries a byte offset into the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("source contains no function definitions")]
    EmptyInput,
    #[error("unexpected character `{found}` at {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("unterminated string literal starting at {position}")]
    UnterminatedString { position: usize },
    #[error("invalid escape `\\{found}` at {position}")]
    InvalidEscape { found: char, position: usize },
    #[error("invalid number `{raw}` at {position}")]
    InvalidNumber { raw: String, position: usize },
    #[error("unexpected token `{found}` at {position}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },
    #[error("nesting exceeds {max_depth} levels at {position}")]
    NestingTooDeep { max_depth: usize, position: usize },
}

/// Parses every top-level function definition in `input`.
pub fn parse_source(input: &str) -> Result<SourceUnit, ParseError> {
    let tokens = Lexer::new(input).lex()?;
    let mut parser = Parser::new(tokens);
    let unit = parser.parse_unit()?;
    if unit.functions.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    debug!("parsed {} function(s): {:?}", unit.functions.len(), unit.names().collect::<Vec<_>>());
    Ok(unit)
}

/// Parses source text that must contain exactly one function definition.
pub fn parse_function(input: &str) -> Result<Rc<FunctionDef>, ParseError> {
    let tokens = Lexer::new(input).lex()?;
    let mut parser = Parser::new(tokens);
    let def = parser.parse_function()?;
    parser.expect(Token::Eof, "end of input")?;
    Ok(def)
}

struct Parser<'a> {
    tokens: Vec<SpannedToken<'a>>,
    index: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<SpannedToken<'a>>) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
        }
    }

    fn parse_unit(&mut self) -> Result<SourceUnit, ParseError> {
        let mut unit = SourceUnit::default();
        while !self.check(&Token::Eof) {
            unit.functions.push(self.parse_function()?);
        }
        Ok(unit)
    }

    fn parse_function(&mut self) -> Result<Rc<FunctionDef>, ParseError> {
        self.expect(Token::Fn, "`fn`")?;
        let name = self.expect_ident("function name")?;
        self.expect(Token::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if !self.matches(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "`)`")?;
        let body = self.parse_block()?;
        Ok(Rc::new(FunctionDef::new(name, params, body)))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(Token::LBrace, "`{`")?;
        self.enter()?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.leave();
        self.expect(Token::RBrace, "`}`")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.current().token {
            Token::Let => {
                self.advance();
                let name = self.expect_ident("variable name")?;
                self.expect(Token::Assign, "`=`")?;
                let value = self.parse_expr()?;
                self.expect(Token::Semi, "`;`")?;
                Ok(Stmt::Let(name, value))
            }
            Token::If => self.parse_if(),
            Token::While => {
                self.advance();
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::While { condition, body })
            }
            Token::Return => {
                self.advance();
                if self.matches(&Token::Semi) {
                    return Ok(Stmt::Return(None));
                }
                let value = self.parse_expr()?;
                self.expect(Token::Semi, "`;`")?;
                Ok(Stmt::Return(Some(value)))
            }
            Token::Raise => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(Token::Semi, "`;`")?;
                Ok(Stmt::Raise(value))
            }
            Token::Fn => Ok(Stmt::Def(self.parse_function()?)),
            Token::Ident(name) if self.peek_token() == Some(&Token::Assign) => {
                self.advance();
                self.advance();
                let value = self.parse_expr()?;
                self.expect(Token::Semi, "`;`")?;
                Ok(Stmt::Assign(name.to_string(), value))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(Token::Semi, "`;`")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::If, "`if`")?;
        let condition = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.matches(&Token::Else) {
            if self.check(&Token::If) {
                self.enter()?;
                let nested = self.parse_if()?;
                self.leave();
                vec![nested]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        let mut chain = 0;
        while self.matches(&Token::Or) {
            self.enter()?;
            chain += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Logic(LogicOp::Or, Box::new(lhs), Box::new(rhs));
        }
        self.leave_by(chain);
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_not()?;
        let mut chain = 0;
        while self.matches(&Token::And) {
            self.enter()?;
            chain += 1;
            let rhs = self.parse_not()?;
            lhs = Expr::Logic(LogicOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.leave_by(chain);
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&Token::Not) {
            self.enter()?;
            let inner = self.parse_not()?;
            self.leave();
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.cmp_op() {
            self.advance();
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                rest,
            })
        }
    }

    fn cmp_op(&self) -> Option<CmpOp> {
        match self.current().token {
            Token::Lt => Some(CmpOp::Lt),
            Token::Le => Some(CmpOp::Le),
            Token::Gt => Some(CmpOp::Gt),
            Token::Ge => Some(CmpOp::Ge),
            Token::EqEq => Some(CmpOp::Eq),
            Token::Ne => Some(CmpOp::Ne),
            _ => None,
        }
    }

    // Operator chains build left-deep trees, so every operator counts as one
    // level of nesting until the chain ends.
    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        let mut chain = 0;
        loop {
            let op = match self.current().token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chain += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.leave_by(chain);
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        let mut chain = 0;
        loop {
            let op = match self.current().token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::SlashSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            self.enter()?;
            chain += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.leave_by(chain);
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            let position = self.current().position;
            self.advance();
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave();
            return match operand {
                Expr::Literal(Literal::Num(n)) => match n.checked_neg() {
                    Some(neg) => Ok(Expr::num(neg)),
                    None => Err(ParseError::InvalidNumber {
                        raw: format!("-{}", n),
                        position,
                    }),
                },
                other => Ok(Expr::Unary(UnaryOp::Neg, Box::new(other))),
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let SpannedToken { token, position } = self.current().clone();
        match token {
            Token::Int(raw) => {
                self.advance();
                let digits = raw.replace('_', "");
                digits.parse::<i64>().map(Expr::num).map_err(|_| ParseError::InvalidNumber {
                    raw: raw.to_string(),
                    position,
                })
            }
            Token::Float(raw) => {
                self.advance();
                let digits = raw.replace('_', "");
                match digits.parse::<f64>() {
                    Ok(x) if x.is_finite() => Ok(Expr::num(x)),
                    _ => Err(ParseError::InvalidNumber {
                        raw: raw.to_string(),
                        position,
                    }),
                }
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Token::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Token::None => {
                self.advance();
                Ok(Expr::Literal(Literal::None))
            }
            Token::Ident(name) => {
                self.advance();
                if self.matches(&Token::LParen) {
                    self.enter()?;
                    let args = self.parse_args()?;
                    self.leave();
                    Ok(Expr::call(name, args))
                } else {
                    Ok(Expr::var(name))
                }
            }
            Token::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_expr()?;
                self.leave();
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "expression",
                found: other.describe(),
                position,
            }),
        }
    }

    /// Parses call arguments after the opening parenthesis.
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.matches(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "`)`")?;
        Ok(args)
    }

    fn current(&self) -> &SpannedToken<'a> {
        // The token stream always ends with Eof, and `advance` never moves past it.
        &self.tokens[self.index]
    }

    fn peek_token(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.index + 1).map(|t| &t.token)
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    fn check(&self, token: &Token<'_>) -> bool {
        &self.current().token == token
    }

    fn matches(&mut self, token: &Token<'_>) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token<'_>, expected: &'static str) -> Result<(), ParseError> {
        if self.matches(&token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<Name, ParseError> {
        match self.current().token {
            Token::Ident(name) => {
                self.advance();
                Ok(name.to_string())
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let current = self.current();
        ParseError::UnexpectedToken {
            expected,
            found: current.token.describe(),
            position: current.position,
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                max_depth: MAX_NESTING,
                position: self.current().position,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.leave_by(1);
    }

    fn leave_by(&mut self, levels: usize) {
        self.nesting = self.nesting.saturating_sub(levels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::number::Number;

    fn literal(value: impl Into<Number>) -> Expr {
        Expr::num(value)
    }

    fn parse_expr(src: &str) -> Expr {
        let def = parse_function(&format!("fn t(x) {{ return {}; }}", src)).unwrap();
        match &def.body[0] {
            Stmt::Return(Some(e)) => e.clone(),
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sample_function() {
        let src = r#"
            fn determine_price(age) {
                if age < 0 {
                    return "Invalid Age";
                } else if age < 3 {
                    return "Free (Infant)";
                } else {
                    return "Senior Price";
                }
            }
        "#;
        let def = parse_function(src).unwrap();
        assert_eq!(def.name, "determine_price");
        assert_eq!(def.params, vec!["age".to_string()]);
        assert_eq!(def.body.len(), 1);
        let Stmt::If { condition, else_body, .. } = &def.body[0] else {
            panic!("expected if statement");
        };
        assert_eq!(condition, &Expr::compare(Expr::var("age"), CmpOp::Lt, literal(0)));
        assert!(matches!(else_body.as_slice(), [Stmt::If { .. }]));
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_expr("0 <= x < 100");
        assert_eq!(
            expr,
            Expr::Compare {
                left: Box::new(literal(0)),
                rest: vec![(CmpOp::Le, Expr::var("x")), (CmpOp::Lt, literal(100))],
            }
        );
    }

    #[test]
    fn test_precedence() {
        // not binds looser than comparison; arithmetic binds tighter.
        let expr = parse_expr("not x + 1 * 2 > 3 and x != 4");
        let expected = Expr::Logic(
            LogicOp::And,
            Box::new(Expr::Unary(
                UnaryOp::Not,
                Box::new(Expr::compare(
                    Expr::binary(BinOp::Add, Expr::var("x"), Expr::binary(BinOp::Mul, literal(1), literal(2))),
                    CmpOp::Gt,
                    literal(3),
                )),
            )),
            Box::new(Expr::compare(Expr::var("x"), CmpOp::Ne, literal(4))),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_negative_literal_folding() {
        assert_eq!(parse_expr("x < -5"), Expr::compare(Expr::var("x"), CmpOp::Lt, literal(-5)));
        assert_eq!(parse_expr("-2.5"), literal(-2.5));
        assert_eq!(
            parse_expr("-x"),
            Expr::Unary(UnaryOp::Neg, Box::new(Expr::var("x")))
        );
    }

    #[test]
    fn test_statements() {
        let src = r#"
            fn f(n) {
                let total = 0;
                while n > 0 {
                    total = total + n;
                    n = n - 1;
                }
                fn helper(v) { return v // 2; }
                if total == 0 { raise "empty"; }
                print(total);
                return helper(total);
            }
        "#;
        let def = parse_function(src).unwrap();
        assert_eq!(def.body.len(), 6);
        assert!(matches!(def.body[0], Stmt::Let(ref name, _) if name == "total"));
        assert!(matches!(def.body[1], Stmt::While { .. }));
        assert!(matches!(def.body[2], Stmt::Def(ref d) if d.name == "helper"));
        assert!(matches!(def.body[3], Stmt::If { .. }));
        assert!(matches!(def.body[4], Stmt::Expr(Expr::Call { .. })));
        assert!(matches!(def.body[5], Stmt::Return(Some(_))));
    }

    #[test]
    fn test_source_unit_with_several_functions() {
        let unit = parse_source("fn a() { return 1; }\n# comment\nfn b(x, y) { return x; }").unwrap();
        assert_eq!(unit.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(unit.function("b").unwrap().params.len(), 2);
        assert!(unit.function("c").is_none());
    }

    #[test]
    fn test_errors_carry_positions() {
        assert_eq!(parse_source("   "), Err(ParseError::EmptyInput));
        assert_eq!(
            parse_function("fn f(x) { return x < ; }"),
            Err(ParseError::UnexpectedToken {
                expected: "expression",
                found: ";".to_string(),
                position: 21,
            })
        );
        assert_eq!(
            parse_function("fn f(x) { return 99999999999999999999; }"),
            Err(ParseError::InvalidNumber {
                raw: "99999999999999999999".to_string(),
                position: 17,
            })
        );
        assert!(matches!(
            parse_function("fn f() { } fn g() { }"),
            Err(ParseError::UnexpectedToken { position: 11, .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let src = format!("fn f(x) {{ return {}x{}; }}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(parse_function(&src), Err(ParseError::NestingTooDeep { .. })));
    }

    #[test]
    fn test_nesting_limit_counts_calls() {
        let src = format!("fn f(x) {{ return {}x{} < 3; }}", "abs(".repeat(3000), ")".repeat(3000));
        assert!(matches!(parse_function(&src), Err(ParseError::NestingTooDeep { .. })));

        let shallow = format!("fn f(x) {{ return {}x{} < 3; }}", "abs(".repeat(20), ")".repeat(20));
        assert!(parse_function(&shallow).is_ok());
    }

    #[test]
    fn test_nesting_limit_counts_operator_chains() {
        for op in [" + 1", " * 2", " and x", " or x"] {
            let src = format!("fn f(x) {{ return x{} < 3; }}", op.repeat(20_000));
            assert!(
                matches!(parse_function(&src), Err(ParseError::NestingTooDeep { .. })),
                "chain of `{}`",
                op
            );
        }

        let short = format!("fn f(x) {{ return x{} < 3; }}", " + 1".repeat(100));
        assert!(parse_function(&short).is_ok());
        // The counter is released once a chain ends.
        let siblings = format!(
            "fn f(x) {{ let a = x{0}; let b = x{0}; return (x{0}) * (x{0}); }}",
            " - 1".repeat(100)
        );
        assert!(parse_function(&siblings).is_ok());
    }

    #[test]
    fn test_display_reparses() {
        let src = "fn f(x) { if 0 <= x < 10 and not x == 3 { return x * 2; } else { return -x; } }";
        let def = parse_function(src).unwrap();
        let again = parse_function(&def.to_string()).unwrap();
        assert_eq!(def, again);

        let big = parse_function("fn g(x) { return x < 1e20 or x > 2.0; }").unwrap();
        assert_eq!(parse_function(&big.to_string()).unwrap(), big);
    }
}
