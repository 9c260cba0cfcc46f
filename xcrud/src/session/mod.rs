//! Session abstraction which commands are sent through.
//!
//! A [`Session`] receives each command as borrowed clause state plus the
//! pull cursors from [`protocol`][crate::protocol], and returns a
//! [`PendingReply`] which resolves once the server answered.
use std::task::{Context, Poll};

use crate::{
    Result,
    crud::{Limit, Params, Target},
    diagnostic::Completion,
    expr::{Expr, OrderTerm},
    protocol::{Columns, Projection, RowSource, UpdateSpec},
    value::Value,
};

#[cfg(feature = "tokio")]
mod pipeline;

#[cfg(feature = "tokio")]
pub use pipeline::{Pipeline, PipelineReply};

/// Connection-level contract consumed by statements.
///
/// Each method sends exactly one command, absent clauses are `None`, and
/// returns a handle for its eventual outcome.
pub trait Session {
    type Reply: PendingReply;

    /// Send an insert of every row pulled from `rows`.
    fn send_insert(
        &mut self,
        target: &Target,
        rows: &mut dyn RowSource,
        columns: Option<&dyn Columns>,
    ) -> Result<Self::Reply>;

    fn send_select(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        projection: Option<&dyn Projection>,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply>;

    fn send_update(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        set: &mut dyn UpdateSpec,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply>;

    fn send_delete(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply>;

    fn send_sql(&mut self, sql: &str, params: &[Value]) -> Result<Self::Reply>;
}

/// Outcome of a sent command which may not be available yet.
pub trait PendingReply: Unpin {
    /// Poll until the command completes.
    ///
    /// Once this returned `Ready`, it must not be polled again.
    fn poll_complete(&mut self, cx: &mut Context) -> Poll<Result<()>>;

    /// Completion info, available after a successful [`poll_complete`][PendingReply::poll_complete].
    fn completion(&self) -> Option<&Completion>;
}

impl<S> Session for &mut S where S: Session {
    type Reply = S::Reply;

    fn send_insert(
        &mut self,
        target: &Target,
        rows: &mut dyn RowSource,
        columns: Option<&dyn Columns>,
    ) -> Result<Self::Reply> {
        S::send_insert(self, target, rows, columns)
    }

    fn send_select(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        projection: Option<&dyn Projection>,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply> {
        S::send_select(self, target, filter, projection, order, limit, params)
    }

    fn send_update(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        set: &mut dyn UpdateSpec,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply> {
        S::send_update(self, target, filter, set, order, limit, params)
    }

    fn send_delete(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply> {
        S::send_delete(self, target, filter, order, limit, params)
    }

    fn send_sql(&mut self, sql: &str, params: &[Value]) -> Result<Self::Reply> {
        S::send_sql(self, sql, params)
    }
}

#[cfg(test)]
pub(crate) mod test {
    //! Session which renders every command into a line of text.
    use std::task::{Context, Poll};

    use super::*;
    use crate::{
        diagnostic::Diagnostic,
        error::ExecutionError,
        expr::Direction,
        protocol::{ColumnsProcessor, FieldRef, ModifyOp, ProjectionProcessor, RowProcessor, UpdateProcessor},
    };

    #[derive(Default)]
    pub struct Recorder {
        pub log: Vec<String>,
        /// Outcome of the next replies, `Ok(Completion::default())` when empty.
        pub outcomes: Vec<Result<Completion, Diagnostic>>,
    }

    #[derive(Debug)]
    pub struct ReadyReply {
        outcome: Option<Result<Completion, Diagnostic>>,
        completion: Option<Completion>,
    }

    impl PendingReply for ReadyReply {
        fn poll_complete(&mut self, _: &mut Context) -> Poll<Result<()>> {
            match self.outcome.take().expect("polled after ready") {
                Ok(completion) => {
                    self.completion = Some(completion);
                    Poll::Ready(Ok(()))
                }
                Err(diag) => Poll::Ready(Err(ExecutionError::new(diag).into())),
            }
        }

        fn completion(&self) -> Option<&Completion> {
            self.completion.as_ref()
        }
    }

    #[derive(Default)]
    struct Line(String);

    impl RowProcessor for Line {
        fn list_begin(&mut self) { self.0.push_str(" [") }
        fn element(&mut self, value: &Expr) {
            if !self.0.ends_with('[') {
                self.0.push_str(", ");
            }
            self.0.push_str(&value.to_string());
        }
        fn list_end(&mut self) { self.0.push(']') }
    }

    impl ColumnsProcessor for Line {
        fn list_begin(&mut self) { self.0.push_str(" columns [") }
        fn name(&mut self, name: &str) {
            if !self.0.ends_with('[') {
                self.0.push_str(", ");
            }
            self.0.push_str(name);
        }
        fn list_end(&mut self) { self.0.push(']') }
    }

    impl ProjectionProcessor for Line {
        fn list_begin(&mut self) { self.0.push_str(" fields [") }
        fn element(&mut self, expr: &Expr, alias: Option<&str>) {
            if !self.0.ends_with('[') {
                self.0.push_str(", ");
            }
            self.0.push_str(&expr.to_string());
            if let Some(alias) = alias {
                self.0.push_str(" as ");
                self.0.push_str(alias);
            }
        }
        fn list_end(&mut self) { self.0.push(']') }
    }

    impl UpdateProcessor for Line {
        fn assignment(&mut self, op: ModifyOp, field: &FieldRef, value: Option<&Expr>) {
            if !self.0.ends_with('[') {
                self.0.push_str(", ");
            }
            match field {
                FieldRef::Column(col) => self.0.push_str(&col.to_string()),
                FieldRef::Path(path) => self.0.push_str(&path.to_string()),
            }
            match op {
                ModifyOp::Set => self.0.push_str(" ="),
                op => {
                    self.0.push(' ');
                    self.0.push_str(op.as_str());
                }
            }
            if let Some(value) = value {
                self.0.push(' ');
                self.0.push_str(&value.to_string());
            }
        }
    }

    impl Line {
        fn clauses(
            &mut self,
            filter: Option<&Expr>,
            order: Option<&[OrderTerm]>,
            limit: Option<&Limit>,
            params: &Params,
        ) {
            if let Some(filter) = filter {
                self.0.push_str(&format!(" where {filter}"));
            }
            if let Some(order) = order {
                let terms = order
                    .iter()
                    .map(|t| match t.direction {
                        Direction::Asc => t.expr.to_string(),
                        Direction::Desc => format!("{} desc", t.expr),
                    })
                    .collect::<Vec<_>>();
                self.0.push_str(&format!(" order [{}]", terms.join(", ")));
            }
            if let Some(limit) = limit {
                self.0.push_str(&format!(" limit {}", limit.row_count));
                if limit.offset != 0 {
                    self.0.push_str(&format!(" offset {}", limit.offset));
                }
            }
            if !params.is_empty() {
                let params = params.named().map(|(k, v)| format!("{k} = {v}")).collect::<Vec<_>>();
                self.0.push_str(&format!(" params [{}]", params.join(", ")));
            }
        }
    }

    impl Recorder {
        fn reply(&mut self, line: Line) -> ReadyReply {
            self.log.push(line.0);
            let outcome = match self.outcomes.is_empty() {
                true => Ok(Completion::default()),
                false => self.outcomes.remove(0),
            };
            ReadyReply { outcome: Some(outcome), completion: None }
        }
    }

    impl Session for Recorder {
        type Reply = ReadyReply;

        fn send_insert(
            &mut self,
            target: &Target,
            rows: &mut dyn RowSource,
            columns: Option<&dyn Columns>,
        ) -> Result<Self::Reply> {
            let mut line = Line(format!("insert {target}"));
            if let Some(columns) = columns {
                columns.process(&mut line);
            }
            line.0.push_str(" rows");
            while rows.next() {
                rows.process(&mut line)?;
            }
            Ok(self.reply(line))
        }

        fn send_select(
            &mut self,
            target: &Target,
            filter: Option<&Expr>,
            projection: Option<&dyn Projection>,
            order: Option<&[OrderTerm]>,
            limit: Option<&Limit>,
            params: &Params,
        ) -> Result<Self::Reply> {
            let mut line = Line(format!("select {target}"));
            if let Some(projection) = projection {
                projection.process(&mut line);
            }
            line.clauses(filter, order, limit, params);
            Ok(self.reply(line))
        }

        fn send_update(
            &mut self,
            target: &Target,
            filter: Option<&Expr>,
            set: &mut dyn UpdateSpec,
            order: Option<&[OrderTerm]>,
            limit: Option<&Limit>,
            params: &Params,
        ) -> Result<Self::Reply> {
            let mut line = Line(format!("update {target} set ["));
            while set.next() {
                set.process(&mut line)?;
            }
            line.0.push(']');
            line.clauses(filter, order, limit, params);
            Ok(self.reply(line))
        }

        fn send_delete(
            &mut self,
            target: &Target,
            filter: Option<&Expr>,
            order: Option<&[OrderTerm]>,
            limit: Option<&Limit>,
            params: &Params,
        ) -> Result<Self::Reply> {
            let mut line = Line(format!("delete {target}"));
            line.clauses(filter, order, limit, params);
            Ok(self.reply(line))
        }

        fn send_sql(&mut self, sql: &str, params: &[Value]) -> Result<Self::Reply> {
            let mut line = Line(format!("sql {sql:?}"));
            if !params.is_empty() {
                let params = params.iter().map(ToString::to_string).collect::<Vec<_>>();
                line.0.push_str(&format!(" params [{}]", params.join(", ")));
            }
            Ok(self.reply(line))
        }
    }
}
