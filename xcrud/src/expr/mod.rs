//! Value expression model.
//!
//! - [`Expr`], the expression tree
//! - [`ExprProcessor`], the visitor which expression emitted into
//! - [`ColumnRef`] and [`FieldPath`], structured field references
//!
//! Textual expressions are parsed at construction, see [`parse`].
use std::{borrow::Cow, fmt};

use crate::value::{Encode, Value};

#[cfg(feature = "json")]
mod json;
mod parser;

pub use parser::{
    ParseError, parse, parse_column_ref, parse_field_path, parse_order, parse_projection,
};

/// Data model of an operation target.
///
/// Also selects how identifiers in expression text are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataModel {
    /// Identifiers are column references.
    Table,
    /// Identifiers are document field paths.
    Document,
}

/// Expression node.
///
/// Nodes are immutable once constructed, emitting one through [`Expr::process`]
/// can be repeated any number of times.
#[derive(Clone, PartialEq)]
pub enum Expr {
    /// Literal scalar.
    Literal(Value),
    /// Named parameter placeholder, bound at execution.
    Param(String),
    /// Object literal, keys in given order.
    Document(Vec<(String, Expr)>),
    /// Array literal.
    Array(Vec<Expr>),
    /// Column reference, table data model.
    Column(ColumnRef),
    /// Document field reference, document data model.
    Field(FieldPath),
    /// Operator application, name is in canonical form.
    Operator { name: Cow<'static, str>, args: Vec<Expr> },
    /// Function call.
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Create literal expression.
    pub fn value(value: impl Encode) -> Expr {
        Expr::Literal(value.encode())
    }

    /// Create parameter placeholder.
    pub fn param(name: impl Into<String>) -> Expr {
        Expr::Param(name.into())
    }

    /// Create object literal.
    pub fn document<K, V, I>(fields: I) -> Expr
    where
        K: Into<String>,
        V: IntoExpr,
        I: IntoIterator<Item = (K, V)>,
    {
        Expr::Document(fields.into_iter().map(|(k, v)| (k.into(), v.into_expr())).collect())
    }

    /// Create array literal.
    pub fn array<V: IntoExpr>(items: impl IntoIterator<Item = V>) -> Expr {
        Expr::Array(items.into_iter().map(IntoExpr::into_expr).collect())
    }

    /// Parse expression text.
    ///
    /// Fails immediately when the text is malformed.
    pub fn parse(text: &str, model: DataModel) -> Result<Expr, ParseError> {
        parse(text, model)
    }

    /// Emit expression into processor.
    pub fn process(&self, prc: &mut dyn ExprProcessor) {
        match self {
            Expr::Literal(value) => prc.value(value),
            Expr::Param(name) => prc.param(name),
            Expr::Document(fields) => {
                prc.doc_begin();
                for (key, value) in fields {
                    prc.doc_key(key);
                    value.process(prc);
                }
                prc.doc_end();
            }
            Expr::Array(items) => {
                prc.list_begin();
                for item in items {
                    item.process(prc);
                }
                prc.list_end();
            }
            Expr::Column(col) => prc.column(col),
            Expr::Field(path) => prc.field(path),
            Expr::Operator { name, args } => {
                prc.operator_begin(name);
                for arg in args {
                    arg.process(prc);
                }
                prc.operator_end();
            }
            Expr::Call { name, args } => {
                prc.call_begin(name);
                for arg in args {
                    arg.process(prc);
                }
                prc.call_end();
            }
        }
    }
}

/// Visitor which an [`Expr`] is emitted into.
///
/// Composite nodes are bracketed by a begin/end pair, their children are
/// emitted in between.
pub trait ExprProcessor {
    fn value(&mut self, value: &Value);

    fn param(&mut self, name: &str);

    fn column(&mut self, column: &ColumnRef);

    fn field(&mut self, path: &FieldPath);

    fn list_begin(&mut self);

    fn list_end(&mut self);

    fn doc_begin(&mut self);

    /// Key of the next document field, followed by its value.
    fn doc_key(&mut self, key: &str);

    fn doc_end(&mut self);

    fn operator_begin(&mut self, name: &str);

    fn operator_end(&mut self);

    fn call_begin(&mut self, name: &str);

    fn call_end(&mut self);
}

/// Type that can be converted into [`Expr`].
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl<T: Encode> IntoExpr for T {
    fn into_expr(self) -> Expr {
        Expr::Literal(self.encode())
    }
}

/// Reference to a table column, optionally into a json path inside it.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ColumnRef {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub name: String,
    pub path: Option<FieldPath>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> ColumnRef {
        ColumnRef { name: name.into(), ..Default::default() }
    }
}

/// Path into a document.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FieldPath {
    pub elements: Vec<PathElement>,
}

impl FieldPath {
    /// Returns `true` if path points to the document itself.
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Single step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathElement {
    Member(String),
    MemberAsterisk,
    ArrayIndex(u32),
    ArrayIndexAsterisk,
    DoubleAsterisk,
}

/// Sort direction of an order term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Single term of an order clause.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderTerm {
    pub expr: Expr,
    pub direction: Direction,
}

/// Single element of a projection list.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

// ===== Display =====

fn ident(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let plain = name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    match plain {
        true => f.write_str(name),
        false => write!(f, "`{}`", name.replace('`', "``")),
    }
}

/// Surface syntax of a canonical operator name.
fn surface(name: &str) -> &str {
    match name {
        "like" => "LIKE",
        "in" => "IN",
        "not_in" => "NOT IN",
        "is" => "IS",
        "is_not" => "IS NOT",
        name => name,
    }
}

fn list(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Param(name) => write!(f, ":{name}"),
            Expr::Document(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
            Expr::Array(items) => {
                f.write_str("[")?;
                list(f, items)?;
                f.write_str("]")
            }
            Expr::Column(col) => write!(f, "{col}"),
            Expr::Field(path) => write!(f, "{path}"),
            Expr::Operator { name, args } => match (name.as_ref(), &args[..]) {
                ("sign_minus", [arg]) => write!(f, "-{arg}"),
                ("sign_plus", [arg]) => write!(f, "+{arg}"),
                ("not", [arg]) => write!(f, "NOT {arg}"),
                (op @ ("in" | "not_in"), [lhs, rest @ ..]) => {
                    write!(f, "({lhs} {} (", surface(op))?;
                    list(f, rest)?;
                    f.write_str("))")
                }
                (name, [lhs, rhs]) => write!(f, "({lhs} {} {rhs})", surface(name)),
                (name, args) => {
                    write!(f, "{name}(")?;
                    list(f, args)?;
                    f.write_str(")")
                }
            },
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({self})")
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            ident(f, schema)?;
            f.write_str(".")?;
        }
        if let Some(table) = &self.table {
            ident(f, table)?;
            f.write_str(".")?;
        }
        ident(f, &self.name)?;
        if let Some(path) = &self.path {
            write!(f, "->{path}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for el in &self.elements {
            match el {
                PathElement::Member(name) => {
                    f.write_str(".")?;
                    ident(f, name)?;
                }
                PathElement::MemberAsterisk => f.write_str(".*")?,
                PathElement::ArrayIndex(i) => write!(f, "[{i}]")?,
                PathElement::ArrayIndexAsterisk => f.write_str("[*]")?,
                PathElement::DoubleAsterisk => f.write_str("**")?,
            }
        }
        Ok(())
    }
}
