//! CRUD operation builders.
//!
//! - [`Insert`], rows or documents into a table or collection
//! - [`Select`], find rows or documents
//! - [`Update`], update rows or modify documents
//! - [`Remove`], delete rows or documents
//! - [`Sql`], raw sql text
//!
//! Filter, order, limit and parameters are shared through [`Clauses`].
//! Each builder has a single `send` entry point which hands the
//! accumulated state to a [`Session`][crate::Session] through the
//! [`protocol`][crate::protocol] cursors.
use std::{collections::BTreeMap, fmt};

use crate::{
    Result,
    error::{Clause, ConfigError},
    expr::{DataModel, Expr, OrderTerm, parse, parse_order},
    value::{Encode, Value},
};

mod insert;
mod remove;
mod select;
mod sql;
mod update;

pub use insert::Insert;
pub use remove::Remove;
pub use select::Select;
pub use sql::Sql;
pub use update::Update;

/// Table or collection an operation acts on.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Target {
    schema: String,
    name: String,
    model: DataModel,
}

impl Target {
    /// Target a table.
    pub fn table(schema: impl Into<String>, name: impl Into<String>) -> Target {
        Target { schema: schema.into(), name: name.into(), model: DataModel::Table }
    }

    /// Target a document collection.
    pub fn collection(schema: impl Into<String>, name: impl Into<String>) -> Target {
        Target { schema: schema.into(), name: name.into(), model: DataModel::Document }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> DataModel {
        self.model
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`.`{}`", self.schema, self.name)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Target").field(&format_args!("{self}")).field(&self.model).finish()
    }
}

/// Limit clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limit {
    pub row_count: u64,
    pub offset: u64,
}

/// Bound parameter values.
///
/// Crud operations bind by placeholder name, rebinding a name overwrites
/// the previous value. Sql statements bind positionally.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    named: BTreeMap<String, Value>,
    positional: Vec<Value>,
}

impl Params {
    pub fn new() -> Params {
        Params::default()
    }

    /// Bind value to placeholder `name`.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Encode) {
        self.named.insert(name.into(), value.encode());
    }

    /// Bind next positional value.
    pub fn push(&mut self, value: impl Encode) {
        self.positional.push(value.encode());
    }

    /// Named values, in name order.
    pub fn named(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.named.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }

    pub fn clear(&mut self) {
        self.named.clear();
        self.positional.clear();
    }
}

/// Filter, order, limit and parameter state shared by select, update and remove.
#[derive(Clone, Debug)]
pub struct Clauses {
    model: DataModel,
    filter: Option<Expr>,
    order: Vec<OrderTerm>,
    limit: Option<Limit>,
    params: Params,
}

impl Clauses {
    pub fn new(model: DataModel) -> Clauses {
        Clauses { model, filter: None, order: vec![], limit: None, params: Params::new() }
    }

    /// Parse and set the filter, replacing any previous one.
    ///
    /// On parse failure, the previous filter is kept.
    pub fn set_where(&mut self, text: &str) -> Result<()> {
        let expr = parse(text, self.model).map_err(|e| ConfigError::parse(Clause::Where, e))?;
        self.filter = Some(expr);
        Ok(())
    }

    /// Set an already built filter, replacing any previous one.
    pub fn set_filter(&mut self, expr: Expr) {
        self.filter = Some(expr);
    }

    /// Parse and append an order term.
    pub fn add_order_by(&mut self, text: &str) -> Result<()> {
        let term = parse_order(text, self.model)
            .map_err(|e| ConfigError::parse(Clause::OrderBy(self.order.len()), e))?;
        self.order.push(term);
        Ok(())
    }

    /// Replace the order list, all terms are parsed before any is applied.
    pub fn set_order_by<'a>(&mut self, terms: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let order = terms
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                parse_order(text, self.model).map_err(|e| ConfigError::parse(Clause::OrderBy(i), e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.order = order;
        Ok(())
    }

    pub fn clear_order_by(&mut self) {
        self.order.clear();
    }

    /// Set limit, replacing any previous one.
    pub fn set_limit(&mut self, row_count: u64, offset: u64) {
        self.limit = Some(Limit { row_count, offset });
    }

    /// Bind value to placeholder `name`.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Encode) {
        self.params.bind(name, value);
    }

    pub fn model(&self) -> DataModel {
        self.model
    }

    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    /// Order terms, `None` if no order is configured.
    pub fn order(&self) -> Option<&[OrderTerm]> {
        match self.order.is_empty() {
            true => None,
            false => Some(&self.order),
        }
    }

    pub fn limit(&self) -> Option<&Limit> {
        self.limit.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Reject offset for operations that only support a row count.
fn limit_without_offset(clauses: &mut Clauses, row_count: u64, offset: u64) -> Result<()> {
    if offset != 0 {
        return Err(ConfigError::new(Clause::Limit, "offset is not supported by this operation").into());
    }
    clauses.set_limit(row_count, 0);
    Ok(())
}

/// Delegate [`Clauses`] operations to the builder `clauses` field.
macro_rules! delegate_clauses {
    ($name:ident) => {
        impl $name {
            /// Parse and set the filter, replacing any previous one.
            pub fn set_where(&mut self, text: &str) -> $crate::Result<()> {
                self.clauses.set_where(text)
            }

            /// Set an already built filter, replacing any previous one.
            pub fn set_filter(&mut self, expr: $crate::expr::Expr) {
                self.clauses.set_filter(expr);
            }

            /// Parse and append an order term, `<expr> [ASC|DESC]`.
            pub fn add_order_by(&mut self, text: &str) -> $crate::Result<()> {
                self.clauses.add_order_by(text)
            }

            /// Replace the order list.
            pub fn set_order_by<'a>(
                &mut self,
                terms: impl IntoIterator<Item = &'a str>,
            ) -> $crate::Result<()> {
                self.clauses.set_order_by(terms)
            }

            pub fn clear_order_by(&mut self) {
                self.clauses.clear_order_by();
            }

            /// Bind value to placeholder `name`.
            pub fn bind(&mut self, name: impl Into<String>, value: impl $crate::Encode) {
                self.clauses.bind(name, value);
            }

            pub fn target(&self) -> &$crate::crud::Target {
                &self.target
            }

            pub fn clauses(&self) -> &$crate::crud::Clauses {
                &self.clauses
            }
        }
    };
}

pub(crate) use delegate_clauses;
