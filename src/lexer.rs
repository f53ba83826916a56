//! Tokenizer for the function language.
//!
//! Operates on bytes; identifiers and numbers are ASCII, string literals may
//! contain arbitrary UTF-8 and are sliced on char boundaries.

use crate::parser::ParseError;

/// Lexer token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Ident(&'a str),
    /// Integer literal, digits only (underscores stripped at parse time).
    Int(&'a str),
    /// Float literal: has a fractional part or an exponent.
    Float(&'a str),
    /// String literal with escapes already processed.
    Str(String),

    // Keywords
    Fn,
    Let,
    If,
    Else,
    While,
    Return,
    Raise,
    True,
    False,
    None,
    And,
    Or,
    Not,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Assign,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,

    Eof,
}

impl Token<'_> {
    /// Short human-readable rendering for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) | Token::Int(s) | Token::Float(s) => s.to_string(),
            Token::Str(s) => format!("{:?}", s),
            Token::Fn => "fn".into(),
            Token::Let => "let".into(),
            Token::If => "if".into(),
            Token::Else => "else".into(),
            Token::While => "while".into(),
            Token::Return => "return".into(),
            Token::Raise => "raise".into(),
            Token::True => "true".into(),
            Token::False => "false".into(),
            Token::None => "none".into(),
            Token::And => "and".into(),
            Token::Or => "or".into(),
            Token::Not => "not".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBrace => "{".into(),
            Token::RBrace => "}".into(),
            Token::Comma => ",".into(),
            Token::Semi => ";".into(),
            Token::Assign => "=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::SlashSlash => "//".into(),
            Token::Percent => "%".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
            Token::EqEq => "==".into(),
            Token::Ne => "!=".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

/// Token paired with its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'a> {
    pub token: Token<'a>,
    pub position: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    /// Tokenizes the whole input. The last token is always [`Token::Eof`].
    pub fn lex(mut self) -> Result<Vec<SpannedToken<'a>>, ParseError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let ch = bytes[self.offset];
            let start = self.offset;
            let token = match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                    continue;
                }
                b'#' => {
                    self.consume_while(bytes, |b| b != b'\n');
                    continue;
                }
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b'{' => self.single(Token::LBrace),
                b'}' => self.single(Token::RBrace),
                b',' => self.single(Token::Comma),
                b';' => self.single(Token::Semi),
                b'+' => self.single(Token::Plus),
                b'-' => self.single(Token::Minus),
                b'*' => self.single(Token::Star),
                b'%' => self.single(Token::Percent),
                b'/' => self.one_or_two(bytes, b'/', Token::Slash, Token::SlashSlash),
                b'<' => self.one_or_two(bytes, b'=', Token::Lt, Token::Le),
                b'>' => self.one_or_two(bytes, b'=', Token::Gt, Token::Ge),
                b'=' => self.one_or_two(bytes, b'=', Token::Assign, Token::EqEq),
                b'!' => self.one_or_two(bytes, b'=', Token::Not, Token::Ne),
                b'&' => self.pair(bytes, b'&', Token::And)?,
                b'|' => self.pair(bytes, b'|', Token::Or)?,
                b'"' => self.string()?,
                b'0'..=b'9' => self.number(bytes),
                b'.' if bytes.get(self.offset + 1).is_some_and(u8::is_ascii_digit) => self.number(bytes),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_');
                    keyword_or_ident(&self.input[start..self.offset])
                }
                _ => {
                    let found = self.input[start..].chars().next().unwrap_or('\u{fffd}');
                    return Err(ParseError::UnexpectedChar { found, position: start });
                }
            };
            tokens.push(SpannedToken { token, position: start });
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.offset += 1;
        token
    }

    fn one_or_two(&mut self, bytes: &[u8], next: u8, one: Token<'a>, two: Token<'a>) -> Token<'a> {
        if bytes.get(self.offset + 1) == Some(&next) {
            self.offset += 2;
            two
        } else {
            self.offset += 1;
            one
        }
    }

    /// Doubled operators like `&&` which are invalid on their own.
    fn pair(&mut self, bytes: &[u8], ch: u8, token: Token<'a>) -> Result<Token<'a>, ParseError> {
        if bytes.get(self.offset + 1) == Some(&ch) {
            self.offset += 2;
            Ok(token)
        } else {
            Err(ParseError::UnexpectedChar {
                found: char::from(ch),
                position: self.offset,
            })
        }
    }

    fn number(&mut self, bytes: &[u8]) -> Token<'a> {
        let start = self.offset;
        let mut is_float = false;
        self.consume_while(bytes, |b| b.is_ascii_digit() || b == b'_');
        if bytes.get(self.offset) == Some(&b'.') && bytes.get(self.offset + 1).is_some_and(u8::is_ascii_digit) {
            is_float = true;
            self.offset += 1;
            self.consume_while(bytes, |b| b.is_ascii_digit() || b == b'_');
        }
        if matches!(bytes.get(self.offset), Some(b'e' | b'E')) {
            let mut look = self.offset + 1;
            if matches!(bytes.get(look), Some(b'+' | b'-')) {
                look += 1;
            }
            if bytes.get(look).is_some_and(u8::is_ascii_digit) {
                is_float = true;
                self.offset = look;
                self.consume_while(bytes, |b| b.is_ascii_digit());
            }
        }
        let slice = &self.input[start..self.offset];
        if is_float {
            Token::Float(slice)
        } else {
            Token::Int(slice)
        }
    }

    fn string(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.offset;
        self.offset += 1; // opening quote
        let mut value = String::new();
        let mut chars = self.input[self.offset..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.offset += i + 1;
                    return Ok(Token::Str(value));
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, 'r')) => '\r',
                        Some((_, '0')) => '\0',
                        Some((_, '"')) => '"',
                        Some((_, '\\')) => '\\',
                        Some((j, other)) => {
                            return Err(ParseError::InvalidEscape {
                                found: other,
                                position: self.offset + j,
                            })
                        }
                        None => break,
                    };
                    value.push(escaped);
                }
                _ => value.push(c),
            }
        }
        Err(ParseError::UnterminatedString { position: start })
    }

    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }
}

fn keyword_or_ident(slice: &str) -> Token<'_> {
    match slice {
        "fn" => Token::Fn,
        "let" => Token::Let,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "return" => Token::Return,
        "raise" => Token::Raise,
        "true" => Token::True,
        "false" => Token::False,
        "none" => Token::None,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        _ => Token::Ident(slice),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        Lexer::new(input).lex().unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("a <= b >= c == d != e < f > g"),
            vec![
                Token::Ident("a"),
                Token::Le,
                Token::Ident("b"),
                Token::Ge,
                Token::Ident("c"),
                Token::EqEq,
                Token::Ident("d"),
                Token::Ne,
                Token::Ident("e"),
                Token::Lt,
                Token::Ident("f"),
                Token::Gt,
                Token::Ident("g"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("18 2.5 1e3 .5 1_000 7 x"),
            vec![
                Token::Int("18"),
                Token::Float("2.5"),
                Token::Float("1e3"),
                Token::Float(".5"),
                Token::Int("1_000"),
                Token::Int("7"),
                Token::Ident("x"),
                Token::Eof,
            ]
        );
        // `7.x` is not a float: the dot is left over.
        let err = Lexer::new("7.x").lex().unwrap_err();
        assert_eq!(err, ParseError::UnexpectedChar { found: '.', position: 1 });
    }

    #[test]
    fn test_comments_and_keywords() {
        assert_eq!(
            kinds("# header\nfn f(x) { return not x; } # trailing"),
            vec![
                Token::Fn,
                Token::Ident("f"),
                Token::LParen,
                Token::Ident("x"),
                Token::RParen,
                Token::LBrace,
                Token::Return,
                Token::Not,
                Token::Ident("x"),
                Token::Semi,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a\"b\n""#), vec![Token::Str("a\"b\n".into()), Token::Eof]);
        assert_eq!(
            Lexer::new(r#""oops"#).lex().unwrap_err(),
            ParseError::UnterminatedString { position: 0 }
        );
        assert_eq!(
            Lexer::new(r#""\q""#).lex().unwrap_err(),
            ParseError::InvalidEscape { found: 'q', position: 2 }
        );
    }

    #[test]
    fn test_lone_ampersand_is_rejected() {
        let err = Lexer::new("a & b").lex().unwrap_err();
        assert_eq!(err, ParseError::UnexpectedChar { found: '&', position: 2 });
    }
}
