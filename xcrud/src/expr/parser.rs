//! Expression text parser.
//!
//! Operator precedence, loosest first:
//!
//! - `||`, `OR`
//! - `&&`, `AND`
//! - `NOT`
//! - `==`, `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`, `[NOT] LIKE`, `[NOT] IN`, `IS [NOT]`
//! - `+`, `-`
//! - `*`, `/`, `%`
//! - unary `-`, `+`, `!`
use std::{borrow::Cow, fmt};

use super::{
    ColumnRef, DataModel, Direction, Expr, FieldPath, OrderTerm, PathElement, ProjectionItem,
};
use crate::value::Value;

/// Parse expression text.
pub fn parse(text: &str, model: DataModel) -> Result<Expr, ParseError> {
    let mut p = Parser::new(text, model)?;
    let expr = p.expr()?;
    p.finish()?;
    Ok(expr)
}

/// Parse an order term, `<expr> [ASC|DESC]`.
pub fn parse_order(text: &str, model: DataModel) -> Result<OrderTerm, ParseError> {
    let mut p = Parser::new(text, model)?;
    let expr = p.expr()?;
    let direction = if p.eat_keyword("DESC") {
        Direction::Desc
    } else {
        p.eat_keyword("ASC");
        Direction::Asc
    };
    p.finish()?;
    Ok(OrderTerm { expr, direction })
}

/// Parse a projection element, `<expr> [AS <alias>]`.
pub fn parse_projection(text: &str, model: DataModel) -> Result<ProjectionItem, ParseError> {
    let mut p = Parser::new(text, model)?;
    let expr = p.expr()?;
    let alias = match p.eat_keyword("AS") {
        true => Some(p.identifier()?),
        false => None,
    };
    p.finish()?;
    Ok(ProjectionItem { expr, alias })
}

/// Parse a column reference, `[[schema.]table.]column[->$.path]`.
pub fn parse_column_ref(text: &str) -> Result<ColumnRef, ParseError> {
    let mut p = Parser::new(text, DataModel::Table)?;
    let col = p.column_ref()?;
    p.finish()?;
    Ok(col)
}

/// Parse a document field path, `$.a.b[0]`, the leading `$.` is optional.
pub fn parse_field_path(text: &str) -> Result<FieldPath, ParseError> {
    let mut p = Parser::new(text, DataModel::Document)?;
    let path = p.field_path()?;
    p.finish()?;
    Ok(path)
}

// ===== Tokenizer =====

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Bare identifier, may be a keyword.
    Ident(String),
    /// Backtick quoted identifier, never a keyword.
    Quoted(String),
    Str(String),
    Int(String),
    Float(String),
    Placeholder(String),
    Symbol(&'static str),
}

const SYMBOLS: [&str; 25] = [
    "->", "&&", "||", "==", "!=", "<>", "<=", ">=",
    "(", ")", "[", "]", "{", "}", ",", ".", ":", "*", "+", "-", "/", "%", "<", ">", "=",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = vec![];
    let mut iter = text.char_indices().peekable();

    while let Some(&(start, ch)) = iter.peek() {
        let rest = &text[start..];

        if ch.is_whitespace() {
            iter.next();
            continue;
        }

        macro_rules! take_while {
            ($pred:expr) => {{
                let mut end = text.len();
                while let Some(&(i, c)) = iter.peek() {
                    if !$pred(c) {
                        end = i;
                        break;
                    }
                    iter.next();
                }
                end
            }};
        }

        let token = if is_ident_start(ch) {
            let end = take_while!(is_ident_char);
            Token::Ident(text[start..end].to_owned())
        } else if ch.is_ascii_digit() {
            let mut end = take_while!(|c: char| c.is_ascii_digit());
            let mut float = false;
            if text[end..].starts_with('.') && text[end + 1..].starts_with(|c: char| c.is_ascii_digit()) {
                iter.next();
                end = take_while!(|c: char| c.is_ascii_digit());
                float = true;
            }
            // exponent, `e` or `E`, optional sign, then digits
            let exp = text[end..].as_bytes();
            if matches!(exp.first(), Some(b'e' | b'E')) {
                let sign = matches!(exp.get(1), Some(b'+' | b'-')) as usize;
                if exp.get(1 + sign).is_some_and(u8::is_ascii_digit) {
                    for _ in 0..1 + sign {
                        iter.next();
                    }
                    end = take_while!(|c: char| c.is_ascii_digit());
                    float = true;
                }
            }
            match float {
                true => Token::Float(text[start..end].to_owned()),
                false => Token::Int(text[start..end].to_owned()),
            }
        } else if ch == ':' && rest[1..].starts_with(is_ident_start) {
            iter.next();
            let end = take_while!(is_ident_char);
            Token::Placeholder(text[start + 1..end].to_owned())
        } else if ch == '`' {
            iter.next();
            let mut name = String::new();
            loop {
                match iter.next() {
                    Some((_, '`')) => match iter.peek() {
                        Some((_, '`')) => {
                            iter.next();
                            name.push('`');
                        }
                        _ => break,
                    },
                    Some((_, c)) => name.push(c),
                    None => return Err(ParseError::new(start, "unterminated quoted identifier")),
                }
            }
            Token::Quoted(name)
        } else if ch == '\'' || ch == '"' {
            iter.next();
            let mut string = String::new();
            loop {
                match iter.next() {
                    Some((_, c)) if c == ch => break,
                    Some((i, '\\')) => match iter.next() {
                        Some((_, 'n')) => string.push('\n'),
                        Some((_, 't')) => string.push('\t'),
                        Some((_, 'r')) => string.push('\r'),
                        Some((_, '0')) => string.push('\0'),
                        Some((_, c @ ('\\' | '\'' | '"' | '%' | '_'))) => string.push(c),
                        Some((_, _)) => return Err(ParseError::new(i, "invalid escape sequence")),
                        None => return Err(ParseError::new(start, "unterminated string")),
                    },
                    Some((_, c)) => string.push(c),
                    None => return Err(ParseError::new(start, "unterminated string")),
                }
            }
            Token::Str(string)
        } else if ch == '!' && !rest.starts_with("!=") {
            iter.next();
            Token::Symbol("!")
        } else if ch == '$' {
            iter.next();
            Token::Symbol("$")
        } else {
            let Some(sym) = SYMBOLS.iter().find(|s| rest.starts_with(**s)) else {
                return Err(ParseError::new(start, format!("unexpected character `{ch}`")));
            };
            for _ in 0..sym.len() {
                iter.next();
            }
            Token::Symbol(*sym)
        };

        tokens.push((start, token));
    }

    Ok(tokens)
}

// ===== Parser =====

const RESERVED: [&str; 9] = ["AND", "OR", "NOT", "IN", "LIKE", "IS", "AS", "ASC", "DESC"];

/// Maximum nesting of brackets and prefix operators.
const MAX_DEPTH: usize = 128;

/// Maximum binary operators in one expression, each one deepens the tree.
const MAX_BINARY: usize = 4096;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
    model: DataModel,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn new(text: &str, model: DataModel) -> Result<Self, ParseError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ParseError::new(0, "empty expression"));
        }
        Ok(Self { tokens, pos: 0, len: text.len(), model, depth: 0, operators: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.len, |(i, _)| *i)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn err<T>(&self, reason: impl Into<Cow<'static, str>>) -> Result<T, ParseError> {
        Err(ParseError::new(self.offset(), reason))
    }

    fn is_symbol(&self, sym: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == sym)
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        let found = self.is_symbol(sym);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_symbol(&mut self, sym: &'static str) -> Result<(), ParseError> {
        match self.eat_symbol(sym) {
            true => Ok(()),
            false => self.err(format!("expected `{sym}`")),
        }
    }

    fn is_keyword_at(&self, n: usize, kw: &str) -> bool {
        matches!(self.peek_nth(n), Some(Token::Ident(id)) if id.eq_ignore_ascii_case(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        let found = self.is_keyword_at(0, kw);
        if found {
            self.pos += 1;
        }
        found
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return self.err("expression nested too deeply");
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn binary(&mut self, name: &'static str, lhs: Expr, rhs: Expr) -> Result<Expr, ParseError> {
        self.operators += 1;
        if self.operators > MAX_BINARY {
            return self.err("expression has too many operators");
        }
        Ok(operator(name, vec![lhs, rhs]))
    }

    fn finish(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(Token::Symbol(")")) => self.err("unbalanced `)`"),
            Some(_) => self.err("unexpected trailing input"),
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Quoted(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(Token::Ident(name)) if !is_reserved(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => self.err("expected identifier"),
        }
    }

    // ===== Expression =====

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::or)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and()?;
        while self.eat_symbol("||") || self.eat_keyword("OR") {
            let rhs = self.and()?;
            lhs = self.binary("||", lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.not()?;
        while self.eat_symbol("&&") || self.eat_keyword("AND") {
            let rhs = self.not()?;
            lhs = self.binary("&&", lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword("NOT") {
            let arg = self.nested(Self::not)?;
            return Ok(operator("not", vec![arg]));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.additive()?;

        static CMP: [(&str, &str); 8] = [
            ("==", "=="), ("=", "=="), ("!=", "!="), ("<>", "!="),
            ("<=", "<="), (">=", ">="), ("<", "<"), (">", ">"),
        ];

        let cmp = match self.peek() {
            Some(Token::Symbol(sym)) => CMP.iter().find(|(s, _)| s == sym).map(|&(_, name)| name),
            _ => None,
        };
        if let Some(name) = cmp {
            self.pos += 1;
            let rhs = self.additive()?;
            return Ok(operator(name, vec![lhs, rhs]));
        }

        let negated = self.is_keyword_at(0, "NOT")
            && (self.is_keyword_at(1, "IN") || self.is_keyword_at(1, "LIKE"));
        if negated {
            self.pos += 1;
        }

        if self.eat_keyword("IN") {
            let mut args = vec![lhs];
            match self.eat_symbol("(") {
                true => {
                    args.extend(self.list(")")?);
                }
                false => args.push(self.additive()?),
            }
            let name = if negated { "not_in" } else { "in" };
            return Ok(operator(name, args));
        }

        if self.eat_keyword("LIKE") {
            let rhs = self.additive()?;
            let like = operator("like", vec![lhs, rhs]);
            return Ok(match negated {
                true => operator("not", vec![like]),
                false => like,
            });
        }

        if self.eat_keyword("IS") {
            let name = if self.eat_keyword("NOT") { "is_not" } else { "is" };
            let rhs = self.additive()?;
            return Ok(operator(name, vec![lhs, rhs]));
        }

        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let name = match self.peek() {
                Some(Token::Symbol("+")) => "+",
                Some(Token::Symbol("-")) => "-",
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = self.binary(name, lhs, rhs)?;
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let name = match self.peek() {
                Some(Token::Symbol("*")) => "*",
                Some(Token::Symbol("/")) => "/",
                Some(Token::Symbol("%")) => "%",
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = self.binary(name, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat_symbol("-") {
            return Ok(match self.nested(Self::unary)? {
                Expr::Literal(Value::Int(i)) => Expr::Literal(Value::Int(-i)),
                Expr::Literal(Value::Double(d)) => Expr::Literal(Value::Double(-d)),
                arg => operator("sign_minus", vec![arg]),
            });
        }
        if self.eat_symbol("+") {
            let arg = self.nested(Self::unary)?;
            return Ok(operator("sign_plus", vec![arg]));
        }
        if self.eat_symbol("!") {
            let arg = self.nested(Self::unary)?;
            return Ok(operator("not", vec![arg]));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        let Some(token) = self.peek().cloned() else {
            return self.err("unexpected end of expression");
        };

        match token {
            Token::Int(text) => {
                self.pos += 1;
                if let Ok(i) = text.parse::<i64>() {
                    return Ok(Expr::Literal(Value::Int(i)));
                }
                match text.parse::<u64>() {
                    Ok(u) => Ok(Expr::Literal(Value::UInt(u))),
                    Err(_) => Err(ParseError::new(offset, "integer literal out of range")),
                }
            }
            Token::Float(text) => {
                self.pos += 1;
                match text.parse::<f64>() {
                    Ok(d) => Ok(Expr::Literal(Value::Double(d))),
                    Err(_) => Err(ParseError::new(offset, "invalid number literal")),
                }
            }
            Token::Str(string) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::String(string)))
            }
            Token::Placeholder(name) => {
                self.pos += 1;
                Ok(Expr::Param(name))
            }
            Token::Symbol("(") => {
                self.pos += 1;
                let expr = self.expr()?;
                self.expect_symbol(")")?;
                Ok(expr)
            }
            Token::Symbol("[") => {
                self.pos += 1;
                Ok(Expr::Array(self.list("]")?))
            }
            Token::Symbol("{") => {
                self.pos += 1;
                self.object()
            }
            Token::Symbol("$") if self.model == DataModel::Document => {
                Ok(Expr::Field(self.field_path()?))
            }
            Token::Ident(id) if id.eq_ignore_ascii_case("TRUE") => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Token::Ident(id) if id.eq_ignore_ascii_case("FALSE") => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Token::Ident(id) if id.eq_ignore_ascii_case("NULL") => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Null))
            }
            Token::Ident(id) if is_reserved(&id) => self.err(format!("unexpected keyword `{id}`")),
            Token::Ident(name) if matches!(self.peek_nth(1), Some(Token::Symbol("("))) => {
                self.pos += 2;
                let args = self.list(")")?;
                Ok(Expr::Call { name, args })
            }
            Token::Ident(_) | Token::Quoted(_) => match self.model {
                DataModel::Table => Ok(Expr::Column(self.column_ref()?)),
                DataModel::Document => Ok(Expr::Field(self.field_path()?)),
            },
            Token::Symbol(sym) => self.err(format!("unexpected `{sym}`")),
        }
    }

    /// Comma separated expressions until `close`, the opening bracket is already consumed.
    fn list(&mut self, close: &'static str) -> Result<Vec<Expr>, ParseError> {
        let mut items = vec![];
        if self.eat_symbol(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if self.eat_symbol(close) {
                return Ok(items);
            }
            if !self.eat_symbol(",") {
                return self.err(format!("expected `,` or `{close}`"));
            }
        }
    }

    fn object(&mut self) -> Result<Expr, ParseError> {
        let mut fields = vec![];
        if self.eat_symbol("}") {
            return Ok(Expr::Document(fields));
        }
        loop {
            let key = match self.peek() {
                Some(Token::Str(key)) => {
                    let key = key.clone();
                    self.pos += 1;
                    key
                }
                _ => self.identifier()?,
            };
            self.expect_symbol(":")?;
            fields.push((key, self.expr()?));
            if self.eat_symbol("}") {
                return Ok(Expr::Document(fields));
            }
            if !self.eat_symbol(",") {
                return self.err("expected `,` or `}`");
            }
        }
    }

    // ===== References =====

    fn column_ref(&mut self) -> Result<ColumnRef, ParseError> {
        let mut names = vec![self.identifier()?];
        while names.len() < 3 && self.eat_symbol(".") {
            names.push(self.identifier()?);
        }

        let path = match self.eat_symbol("->") {
            true => {
                if !self.is_symbol("$") {
                    return self.err("expected `$` after `->`");
                }
                Some(self.field_path()?)
            }
            false => None,
        };

        let name = names.pop().unwrap_or_default();
        let table = names.pop();
        let schema = names.pop();
        Ok(ColumnRef { schema, table, name, path })
    }

    fn field_path(&mut self) -> Result<FieldPath, ParseError> {
        let mut elements = vec![];

        if !self.eat_symbol("$") {
            elements.push(PathElement::Member(self.identifier()?));
        }

        loop {
            if self.eat_symbol(".") {
                if self.eat_symbol("*") {
                    elements.push(PathElement::MemberAsterisk);
                } else {
                    elements.push(PathElement::Member(self.identifier()?));
                }
            } else if self.eat_symbol("[") {
                if self.eat_symbol("*") {
                    elements.push(PathElement::ArrayIndexAsterisk);
                } else {
                    let offset = self.offset();
                    let Some(Token::Int(index)) = self.bump() else {
                        return Err(ParseError::new(offset, "expected array index"));
                    };
                    let Ok(index) = index.parse() else {
                        return Err(ParseError::new(offset, "array index out of range"));
                    };
                    elements.push(PathElement::ArrayIndex(index));
                }
                self.expect_symbol("]")?;
            } else if self.is_symbol("*") && matches!(self.peek_nth(1), Some(Token::Symbol("*"))) {
                self.pos += 2;
                elements.push(PathElement::DoubleAsterisk);
            } else {
                break;
            }
        }

        if let Some(PathElement::DoubleAsterisk) = elements.last() {
            return self.err("path must not end with `**`");
        }

        Ok(FieldPath { elements })
    }
}

fn is_reserved(id: &str) -> bool {
    RESERVED.iter().any(|kw| kw.eq_ignore_ascii_case(id))
}

fn operator(name: &'static str, args: Vec<Expr>) -> Expr {
    Expr::Operator { name: Cow::Borrowed(name), args }
}

// ===== Error =====

/// Error when parsing expression text.
pub struct ParseError {
    pos: usize,
    reason: Cow<'static, str>,
}

impl ParseError {
    fn new(pos: usize, reason: impl Into<Cow<'static, str>>) -> Self {
        Self { pos, reason: reason.into() }
    }

    /// Byte offset in the input where parsing failed.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl std::error::Error for ParseError { }

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.reason)
        }
        write!(f, "failed to parse expression at {}: {}", self.pos, self.reason)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn col(name: &str) -> Expr {
        Expr::Column(ColumnRef::new(name))
    }

    fn member(name: &str) -> PathElement {
        PathElement::Member(name.into())
    }

    #[test]
    fn precedence() {
        let expr = parse("a + b * 2 > 3 AND c", DataModel::Table).unwrap();
        let mul = operator("*", vec![col("b"), Expr::Literal(Value::Int(2))]);
        let add = operator("+", vec![col("a"), mul]);
        let gt = operator(">", vec![add, Expr::Literal(Value::Int(3))]);
        assert_eq!(expr, operator("&&", vec![gt, col("c")]));
    }

    #[test]
    fn literals() {
        assert_eq!(parse("-5", DataModel::Table).unwrap(), Expr::Literal(Value::Int(-5)));
        assert_eq!(parse("1.5", DataModel::Table).unwrap(), Expr::Literal(Value::Double(1.5)));
        assert_eq!(
            parse("18446744073709551615", DataModel::Table).unwrap(),
            Expr::Literal(Value::UInt(u64::MAX))
        );
        assert_eq!(
            parse("'it\\'s'", DataModel::Table).unwrap(),
            Expr::Literal(Value::String("it's".into()))
        );
        assert_eq!(parse("null", DataModel::Table).unwrap(), Expr::Literal(Value::Null));
    }

    #[test]
    fn placeholders_and_calls() {
        let expr = parse("concat(name, :suffix)", DataModel::Table).unwrap();
        assert_eq!(
            expr,
            Expr::Call { name: "concat".into(), args: vec![col("name"), Expr::param("suffix")] }
        );
    }

    #[test]
    fn membership() {
        let expr = parse("id not in (1, 2)", DataModel::Table).unwrap();
        assert_eq!(
            expr,
            operator("not_in", vec![
                col("id"),
                Expr::Literal(Value::Int(1)),
                Expr::Literal(Value::Int(2)),
            ])
        );
    }

    #[test]
    fn column_refs() {
        let c = parse_column_ref("db.t.`weird col`->$.a[2]").unwrap();
        assert_eq!(c.schema.as_deref(), Some("db"));
        assert_eq!(c.table.as_deref(), Some("t"));
        assert_eq!(c.name, "weird col");
        assert_eq!(
            c.path.unwrap().elements,
            [member("a"), PathElement::ArrayIndex(2)]
        );
        assert!(parse_column_ref("a.b.c.d").is_err());
        assert!(parse_column_ref("a->b").is_err());
    }

    #[test]
    fn field_paths() {
        assert_eq!(parse_field_path("a.b").unwrap().elements, [member("a"), member("b")]);
        assert_eq!(
            parse_field_path("$.a[*].*").unwrap().elements,
            [member("a"), PathElement::ArrayIndexAsterisk, PathElement::MemberAsterisk]
        );
        assert_eq!(
            parse_field_path("$**.x").unwrap().elements,
            [PathElement::DoubleAsterisk, member("x")]
        );
        assert!(parse_field_path("$").unwrap().is_root());
        assert!(parse_field_path("a.").is_err());
        assert!(parse_field_path("a[x]").is_err());
        assert!(parse_field_path("a**").is_err());
    }

    #[test]
    fn document_mode_identifiers() {
        let expr = parse("address.city == 'Oslo'", DataModel::Document).unwrap();
        let path = FieldPath { elements: vec![member("address"), member("city")] };
        assert_eq!(
            expr,
            operator("==", vec![Expr::Field(path), Expr::Literal(Value::String("Oslo".into()))])
        );
    }

    #[test]
    fn object_and_array_literals() {
        let expr = parse("{'a': [1, 2], b: {}}", DataModel::Document).unwrap();
        assert_eq!(
            expr,
            Expr::document([
                ("a", Expr::array([1, 2])),
                ("b", Expr::Document(vec![])),
            ])
        );
    }

    #[test]
    fn order_and_projection() {
        let order = parse_order("age desc", DataModel::Table).unwrap();
        assert_eq!(order.direction, Direction::Desc);
        assert_eq!(order.expr, col("age"));
        assert_eq!(parse_order("age", DataModel::Table).unwrap().direction, Direction::Asc);

        let proj = parse_projection("price * 2 AS double_price", DataModel::Table).unwrap();
        assert_eq!(proj.alias.as_deref(), Some("double_price"));
        assert!(parse_projection("price AS", DataModel::Table).is_err());
    }

    #[test]
    fn malformed() {
        let err = parse("(a > 1", DataModel::Table).unwrap_err();
        assert_eq!(err.reason(), "expected `)`");
        assert_eq!(err.position(), 6);

        let err = parse("a > 1)", DataModel::Table).unwrap_err();
        assert_eq!(err.reason(), "unbalanced `)`");

        assert!(parse("", DataModel::Table).is_err());
        assert!(parse("a >", DataModel::Table).is_err());
        assert!(parse("'open", DataModel::Table).is_err());
        assert!(parse("a # b", DataModel::Table).is_err());
        assert!(parse("a AND", DataModel::Table).is_err());
    }

    #[test]
    fn exponent() {
        assert_eq!(parse("1e5", DataModel::Table).unwrap(), Expr::Literal(Value::Double(1e5)));
        assert_eq!(parse("2.5E-3", DataModel::Table).unwrap(), Expr::Literal(Value::Double(2.5e-3)));
        assert_eq!(parse("-4e+2", DataModel::Table).unwrap(), Expr::Literal(Value::Double(-400.0)));

        // no digits after `e`, the `e` is not part of the number
        assert!(parse("1e", DataModel::Table).is_err());
    }

    #[test]
    fn deep_nesting() {
        let text = format!("{}a{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = parse(&text, DataModel::Table).unwrap_err();
        assert_eq!(err.reason(), "expression nested too deeply");

        let text = format!("{}1", "-".repeat(200_000));
        assert!(parse(&text, DataModel::Table).is_err());

        let text = format!("{}TRUE", "NOT ".repeat(200_000));
        assert!(parse(&text, DataModel::Document).is_err());

        let text = format!("{}1{}", "[".repeat(200_000), "]".repeat(200_000));
        assert!(parse(&text, DataModel::Table).is_err());

        let text = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&text, DataModel::Table).unwrap(), col("a"));
    }

    #[test]
    fn long_operator_chain() {
        let text = vec!["a"; 200_000].join(" + ");
        let err = parse(&text, DataModel::Table).unwrap_err();
        assert_eq!(err.reason(), "expression has too many operators");

        let text = vec!["a"; 1000].join(" AND ");
        assert!(parse(&text, DataModel::Table).is_ok());
    }
}
