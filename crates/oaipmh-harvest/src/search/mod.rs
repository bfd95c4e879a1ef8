//! The record search expression language.
//!
//! A small prefix-expression language evaluated against a record's raw
//! metadata XML. The grammar:
//!
//! ```text
//! expr   = fncall | atom
//! fncall = IDENT '(' (expr (',' expr)*)? ')'
//! atom   = STRING            (double-quoted or backtick-raw)
//! ```
//!
//! The built-in functions form a closed set; naming anything else is a
//! parse error. `xp(path)` compiles its path at evaluation time, because
//! the path string may itself be computed, and XPath problems should
//! surface per record with context.

mod xmlpath;

pub use xmlpath::XmlPath;

use oaipmh_core::RecordResult;

/// Errors from parsing or evaluating a search expression.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The expression does not parse.
    #[error("parse error: {0}")]
    Parse(String),

    /// A path handed to `xp` does not compile.
    #[error("invalid path '{path}': {reason}")]
    Path { path: String, reason: String },

    /// The record's metadata is not well-formed XML.
    #[error("record XML: {0}")]
    Xml(String),
}

/// The outcome of matching one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub matched: bool,
    /// The expression's value. Empty for non-matches.
    pub value: String,
}

impl Match {
    /// Negate the match, dropping the value: there is no meaningful
    /// value for a non-match.
    pub fn invert(self) -> Match {
        Match {
            matched: !self.matched,
            value: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Values

/// Runtime values. Booleans coerce from strings via non-emptiness and
/// render back as `"true"`/`"false"`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(String),
    #[allow(dead_code)]
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// AST

/// The closed set of built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    /// `xp(path)`: first match of the path over the record XML,
    /// whitespace-trimmed; empty string when nothing matches.
    Xp,
    /// `startsWith(s, prefix)`: `s` unchanged when it has the prefix,
    /// empty string otherwise.
    StartsWith,
}

impl Builtin {
    fn resolve(name: &str) -> Option<(Builtin, usize)> {
        match name {
            "xp" => Some((Builtin::Xp, 1)),
            "startsWith" => Some((Builtin::StartsWith, 2)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(String),
    Call { func: Builtin, args: Vec<Expr> },
}

// ---------------------------------------------------------------------------
// Tokenizer

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, SearchError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) => {
                                return Err(SearchError::Parse(format!(
                                    "invalid escape '\\{}'",
                                    other
                                )))
                            }
                            None => {
                                return Err(SearchError::Parse(
                                    "unterminated string".to_string(),
                                ))
                            }
                        },
                        Some(c) => s.push(c),
                        None => {
                            return Err(SearchError::Parse(
                                "unterminated string".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            '`' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('`') => break,
                        Some(c) => s.push(c),
                        None => {
                            return Err(SearchError::Parse(
                                "unterminated raw string".to_string(),
                            ))
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(SearchError::Parse(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token: Token) -> Result<(), SearchError> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            Some(t) => Err(SearchError::Parse(format!(
                "expected {:?} but got {:?}",
                token, t
            ))),
            None => Err(SearchError::Parse(format!(
                "expected {:?} but got end of expression",
                token
            ))),
        }
    }

    /// expr = fncall | atom
    fn expr(&mut self) -> Result<Expr, SearchError> {
        match self.peek() {
            Some(Token::Ident(_)) => self.fncall(),
            _ => self.atom(),
        }
    }

    /// atom = STRING
    fn atom(&mut self) -> Result<Expr, SearchError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(s)),
            Some(t) => Err(SearchError::Parse(format!(
                "expected string but got {:?}",
                t
            ))),
            None => Err(SearchError::Parse(
                "expected string but got end of expression".to_string(),
            )),
        }
    }

    /// fncall = IDENT '(' (expr (',' expr)*)? ')'
    fn fncall(&mut self) -> Result<Expr, SearchError> {
        let Some(Token::Ident(name)) = self.next() else {
            return Err(SearchError::Parse("expected function name".to_string()));
        };

        let Some((func, arity)) = Builtin::resolve(&name) else {
            return Err(SearchError::Parse(format!("no such function: {}", name)));
        };

        self.expect(Token::LParen)?;

        let mut args = Vec::new();
        while self.peek() != Some(&Token::RParen) {
            if !args.is_empty() {
                self.expect(Token::Comma)?;
            }
            args.push(self.expr()?);
        }
        self.expect(Token::RParen)?;

        if args.len() != arity {
            return Err(SearchError::Parse(format!(
                "{}() expects exactly {} argument{}",
                name,
                arity,
                if arity == 1 { "" } else { "s" }
            )));
        }

        Ok(Expr::Call { func, args })
    }
}

// ---------------------------------------------------------------------------
// Evaluation

/// A parsed search expression, evaluated per record.
#[derive(Debug, Clone)]
pub struct SearchExpr {
    root: Expr,
}

impl SearchExpr {
    /// Parse an expression.
    pub fn parse(input: &str) -> Result<SearchExpr, SearchError> {
        let mut parser = Parser {
            tokens: tokenize(input)?,
            pos: 0,
        };

        let root = parser.expr()?;
        if parser.peek().is_some() {
            return Err(SearchError::Parse(
                "trailing input after expression".to_string(),
            ));
        }

        Ok(SearchExpr { root })
    }

    /// Evaluate the expression against a record.
    pub fn search(&self, record: &RecordResult) -> Result<Match, SearchError> {
        let value = eval(&self.root, record)?;
        Ok(Match {
            matched: value.truthy(),
            value: value.render(),
        })
    }
}

fn eval(expr: &Expr, record: &RecordResult) -> Result<Value, SearchError> {
    match expr {
        Expr::Literal(s) => Ok(Value::Str(s.clone())),
        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, record))
                .collect::<Result<Vec<_>, _>>()?;

            match func {
                Builtin::Xp => {
                    let path = values[0].render();
                    let compiled = XmlPath::compile(&path)?;
                    let found = compiled.first_match(&record.content)?;
                    Ok(Value::Str(
                        found.map(|s| s.trim().to_string()).unwrap_or_default(),
                    ))
                }
                Builtin::StartsWith => {
                    let s = values[0].render();
                    let prefix = values[1].render();
                    if s.starts_with(&prefix) {
                        Ok(Value::Str(s))
                    } else {
                        Ok(Value::Str(String::new()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use oaipmh_core::wire::Header;

    fn record(content: &str) -> RecordResult {
        RecordResult::new(
            Header {
                identifier: "urn:test".to_string(),
                datestamp: DateTime::<Utc>::UNIX_EPOCH,
                set_spec: vec![],
                status: None,
            },
            content.to_string(),
        )
    }

    fn assert_search(expr: &str, xml: &str, matched: bool, value: &str) {
        let search = SearchExpr::parse(expr).unwrap();
        let result = search.search(&record(xml)).unwrap();
        assert_eq!(result.matched, matched, "match for {} on {}", expr, xml);
        assert_eq!(result.value, value, "value for {} on {}", expr, xml);
    }

    #[test]
    fn xpath_expression_parses() {
        assert!(SearchExpr::parse(r#"xp("/a/b/c")"#).is_ok());
    }

    #[test]
    fn xp_matches_record_content() {
        let xml = r#"<gmd:a xmlns:gmd="something"><val>Some value</val><b><d>Something</d><c>I've got C</c></b></gmd:a>"#;
        assert_search(r#"xp("/a/b/c")"#, xml, true, "I've got C");

        let xml = r#"<gmd:a xmlns:gmd="something"><val>Some value</val><b><d>No C Here</d></b></gmd:a>"#;
        assert_search(r#"xp("/a/b/c")"#, xml, false, "");
    }

    #[test]
    fn starts_with_passes_the_value_through() {
        let xml = r#"<a><val>Some value</val></a>"#;
        assert_search(r#"startsWith(xp("/a/val"), "Some")"#, xml, true, "Some value");

        let xml = r#"<a><val>Another</val></a>"#;
        assert_search(r#"startsWith(xp("/a/val"), "Some")"#, xml, false, "");
    }

    #[test]
    fn values_coerce_via_non_emptiness() {
        assert_search(r#""This is not empty""#, "<xml></xml>", true, "This is not empty");
        assert_search(r#""""#, "<xml></xml>", false, "");
        assert_search(
            r#"xp("/xml/value")"#,
            "<xml>This has<value>a value</value> set</xml>",
            true,
            "a value",
        );
        assert_search(
            r#"xp("/xml/missing")"#,
            "<xml>This has<value>a value</value> set</xml>",
            false,
            "",
        );
        assert_search(
            r#"xp("/xml/value")"#,
            r#"<xml>This has<value attr="some attribute" /> set</xml>"#,
            false,
            "",
        );
        assert_search(
            r#"xp("/xml/value/@attr")"#,
            r#"<xml>This has<value attr="some attribute" /> set</xml>"#,
            true,
            "some attribute",
        );
    }

    #[test]
    fn xp_result_is_trimmed() {
        assert_search(
            r#"xp("/a/val")"#,
            "<a><val>\n   padded   \n</val></a>",
            true,
            "padded",
        );
    }

    #[test]
    fn raw_strings_skip_escaping() {
        assert_search(r#"xp(`/a/val`)"#, "<a><val>x</val></a>", true, "x");
    }

    #[test]
    fn invert_drops_the_value() {
        let search = SearchExpr::parse(r#"xp("/a/val")"#).unwrap();
        let result = search
            .search(&record("<a><val>hit</val></a>"))
            .unwrap()
            .invert();
        assert!(!result.matched);
        assert_eq!(result.value, "");
    }

    #[test]
    fn unknown_function_is_a_parse_error() {
        assert!(matches!(
            SearchExpr::parse(r#"frob("/a")"#),
            Err(SearchError::Parse(_))
        ));
    }

    #[test]
    fn arity_is_checked_at_parse_time() {
        assert!(SearchExpr::parse(r#"xp("/a", "/b")"#).is_err());
        assert!(SearchExpr::parse(r#"startsWith("x")"#).is_err());
    }

    #[test]
    fn malformed_expressions_fail_to_parse() {
        assert!(SearchExpr::parse(r#"xp("/a""#).is_err());
        assert!(SearchExpr::parse(r#"xp "/a")"#).is_err());
        assert!(SearchExpr::parse(r#""a" "b""#).is_err());
        assert!(SearchExpr::parse("").is_err());
    }

    #[test]
    fn bad_path_surfaces_at_evaluation_time() {
        // The path is only a string until evaluation.
        let search = SearchExpr::parse(r#"xp("not-absolute")"#).unwrap();
        assert!(matches!(
            search.search(&record("<a/>")),
            Err(SearchError::Path { .. })
        ));
    }

    #[test]
    fn computed_paths_are_supported() {
        // The argument to xp may itself be an expression.
        let search = SearchExpr::parse(r#"xp(startsWith("/a/val", "/a"))"#).unwrap();
        let result = search.search(&record("<a><val>deep</val></a>")).unwrap();
        assert!(result.matched);
        assert_eq!(result.value, "deep");
    }
}
