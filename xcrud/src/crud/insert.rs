use super::Target;
use crate::{
    Result,
    common::verbose,
    error::{Clause, ConfigError},
    expr::{DataModel, Expr},
    protocol::{ColumnList, Columns, RowCursor},
    row::{IntoRow, Row},
    session::Session,
};

/// Insert rows into a table, or add documents into a collection.
#[derive(Clone, Debug)]
pub struct Insert {
    target: Target,
    columns: Option<Vec<String>>,
    rows: Vec<Row>,
}

impl Insert {
    pub fn new(target: Target) -> Insert {
        Insert { target, columns: None, rows: vec![] }
    }

    /// Append column names.
    ///
    /// Once called, an explicit column list is sent even if it is empty.
    pub fn add_columns<I>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        if self.target.model() == DataModel::Document {
            return Err(ConfigError::new(
                Clause::Column(0),
                "collection does not have columns",
            )
            .into());
        }
        self.columns.get_or_insert_default().extend(columns.into_iter().map(Into::into));
        Ok(())
    }

    /// Append a row.
    pub fn add_row(&mut self, row: impl IntoRow) -> Result<()> {
        if self.target.model() == DataModel::Document {
            return Err(ConfigError::new(
                Clause::Row(self.rows.len()),
                "collection expects documents, not rows",
            )
            .into());
        }
        self.rows.push(row.into_row());
        Ok(())
    }

    /// Append a document.
    ///
    /// The document must be an object literal or a parameter placeholder.
    pub fn add_document(&mut self, document: Expr) -> Result<()> {
        let index = self.rows.len();
        if self.target.model() == DataModel::Table {
            return Err(ConfigError::new(
                Clause::Document(index),
                "table expects rows, not documents",
            )
            .into());
        }
        if !matches!(document, Expr::Document(_) | Expr::Param(_)) {
            return Err(ConfigError::new(Clause::Document(index), "expected an object").into());
        }
        self.rows.push(Row::from(vec![document]));
        Ok(())
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Send the command, returns `None` without contacting the session if
    /// there is no row to insert.
    pub fn send<S: Session>(&self, session: &mut S) -> Result<Option<S::Reply>> {
        if self.rows.is_empty() {
            verbose!(name = %self.target, "insert without rows, skipped");
            return Ok(None);
        }

        let mut rows = RowCursor::new(&self.rows);
        let columns = self.columns.as_deref().map(ColumnList);
        let columns = columns.as_ref().map(|c| c as &dyn Columns);

        verbose!(name = %self.target, rows = self.rows.len(), "send insert");
        session.send_insert(&self.target, &mut rows, columns).map(Some)
    }
}
